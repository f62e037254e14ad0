use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, Tag};

/// Post entity - a published article or a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post.
    pub fn new(category_id: Uuid, title: String, content: String, is_published: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            category_id,
            title,
            content,
            is_published,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`. Every edit goes through here before saving.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Unpublished posts are only visible to authenticated viewers.
    pub fn is_visible_to(&self, authenticated: bool) -> bool {
        self.is_published || authenticated
    }
}

/// A post together with its category and tags, as listed on pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    #[serde(flatten)]
    pub post: Post,
    pub category: Category,
    pub tags: Vec<Tag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpublished_post_hidden_from_anonymous() {
        let post = Post::new(Uuid::new_v4(), "Draft".into(), "...".into(), false);
        assert!(!post.is_visible_to(false));
        assert!(post.is_visible_to(true));
    }

    #[test]
    fn test_touch_moves_updated_at_forward() {
        let mut post = Post::new(Uuid::new_v4(), "Title".into(), "Body".into(), true);
        let before = post.updated_at;
        post.touch();
        assert!(post.updated_at >= before);
        assert_eq!(post.created_at, before);
    }
}
