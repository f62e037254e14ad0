//! In-memory store - used when no database is configured, and in tests.
//!
//! All tables sit behind one async `RwLock`, so each repository call sees a
//! consistent snapshot. Deletes follow the same rules as the SQL schema:
//! comments cascade to replies, posts cascade to comments and tag links, and
//! a category that still has posts cannot be deleted.
//! Note: Data is lost on process restart.

mod repos;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use blog_core::domain::{Category, Comment, Post, Reply, Tag, User};

pub use repos::{
    InMemoryCategoryRepository, InMemoryCommentRepository, InMemoryPostRepository,
    InMemoryReplyRepository, InMemoryTagRepository, InMemoryUserRepository,
};

#[derive(Default)]
pub(crate) struct Tables {
    pub(crate) users: HashMap<Uuid, User>,
    pub(crate) categories: HashMap<Uuid, Category>,
    pub(crate) tags: HashMap<Uuid, Tag>,
    pub(crate) posts: HashMap<Uuid, Post>,
    /// (post_id, tag_id)
    pub(crate) post_tags: BTreeSet<(Uuid, Uuid)>,
    pub(crate) comments: HashMap<Uuid, Comment>,
    pub(crate) replies: HashMap<Uuid, Reply>,
}

impl Tables {
    pub(crate) fn tag_ids_of(&self, post_id: Uuid) -> Vec<Uuid> {
        self.post_tags
            .range((post_id, Uuid::nil())..=(post_id, Uuid::from_u128(u128::MAX)))
            .map(|(_, tag_id)| *tag_id)
            .collect()
    }

    pub(crate) fn delete_comment(&mut self, id: Uuid) -> bool {
        let existed = self.comments.remove(&id).is_some();
        if existed {
            self.replies.retain(|_, r| r.comment_id != id);
        }
        existed
    }

    pub(crate) fn delete_post(&mut self, id: Uuid) -> bool {
        let existed = self.posts.remove(&id).is_some();
        if existed {
            self.post_tags.retain(|(post_id, _)| *post_id != id);
            let comment_ids: Vec<Uuid> = self
                .comments
                .values()
                .filter(|c| c.post_id == id)
                .map(|c| c.id)
                .collect();
            for comment_id in comment_ids {
                self.delete_comment(comment_id);
            }
        }
        existed
    }
}

/// Shared handle to the in-memory tables. Repositories created from the same
/// store see each other's writes.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository::new(self.tables.clone())
    }

    pub fn categories(&self) -> InMemoryCategoryRepository {
        InMemoryCategoryRepository::new(self.tables.clone())
    }

    pub fn tags(&self) -> InMemoryTagRepository {
        InMemoryTagRepository::new(self.tables.clone())
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository::new(self.tables.clone())
    }

    pub fn comments(&self) -> InMemoryCommentRepository {
        InMemoryCommentRepository::new(self.tables.clone())
    }

    pub fn replies(&self) -> InMemoryReplyRepository {
        InMemoryReplyRepository::new(self.tables.clone())
    }
}
