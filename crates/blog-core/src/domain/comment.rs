use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Visitor comment attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_id: Uuid, author: String, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            author,
            text,
            created_at: Utc::now(),
        }
    }
}

/// Visitor reply attached to a comment. The owning post is reached through
/// the comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Reply {
    pub fn new(comment_id: Uuid, author: String, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            comment_id,
            author,
            text,
            created_at: Utc::now(),
        }
    }
}

/// A comment with its replies, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Reply>,
}
