use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Category, CategoryWithCount, Comment, CommentThread, Post, PostSummary, Reply, Tag, User,
};
use crate::error::RepoError;
use crate::query::PostQuery;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID. Dependent rows follow the store's
    /// cascade rules.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
}

/// Category repository.
#[async_trait]
pub trait CategoryRepository: BaseRepository<Category, Uuid> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError>;

    /// All categories, ordered by name.
    async fn list(&self) -> Result<Vec<Category>, RepoError>;

    /// All categories with the number of their published posts, ordered by name.
    async fn list_with_published_counts(&self) -> Result<Vec<CategoryWithCount>, RepoError>;
}

/// Tag repository.
#[async_trait]
pub trait TagRepository: BaseRepository<Tag, Uuid> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError>;

    /// All tags, ordered by name.
    async fn list(&self) -> Result<Vec<Tag>, RepoError>;

    /// The tags among `ids` that exist.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tag>, RepoError>;
}

/// Post repository - the query layer over posts.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Number of posts matching the query.
    async fn count(&self, query: &PostQuery) -> Result<u64, RepoError>;

    /// Matching posts, most recently updated first.
    async fn list(
        &self,
        query: &PostQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostSummary>, RepoError>;

    /// A single post with its category and tags.
    async fn find_summary(&self, id: Uuid) -> Result<Option<PostSummary>, RepoError>;

    /// Save a post and replace its tag set in one atomic write. Nothing is
    /// stored when either half fails.
    async fn save_with_tags(&self, post: Post, tag_ids: &[Uuid]) -> Result<Post, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Comments of a post with their replies, oldest first.
    async fn threads_for_post(&self, post_id: Uuid) -> Result<Vec<CommentThread>, RepoError>;

    /// Every comment, newest first.
    async fn list(&self) -> Result<Vec<Comment>, RepoError>;
}

/// Reply repository.
#[async_trait]
pub trait ReplyRepository: BaseRepository<Reply, Uuid> {
    /// Every reply, newest first.
    async fn list(&self) -> Result<Vec<Reply>, RepoError>;
}
