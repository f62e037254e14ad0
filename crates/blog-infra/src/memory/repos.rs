use std::cmp::Reverse;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use blog_core::domain::{
    Category, CategoryWithCount, Comment, CommentThread, Post, PostSummary, Reply, Tag, User,
};
use blog_core::error::RepoError;
use blog_core::ports::{
    BaseRepository, CategoryRepository, CommentRepository, PostRepository, ReplyRepository,
    TagRepository, UserRepository,
};
use blog_core::query::PostQuery;

use super::Tables;

type SharedTables = Arc<RwLock<Tables>>;

/// In-memory user repository.
pub struct InMemoryUserRepository {
    tables: SharedTables,
}

impl InMemoryUserRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        match self.tables.write().await.users.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }
}

/// In-memory category repository.
pub struct InMemoryCategoryRepository {
    tables: SharedTables,
}

impl InMemoryCategoryRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl BaseRepository<Category, Uuid> for InMemoryCategoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn save(&self, category: Category) -> Result<Category, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .categories
            .values()
            .any(|c| c.slug == category.slug && c.id != category.id)
        {
            return Err(RepoError::Constraint(format!(
                "category slug '{}' is taken",
                category.slug
            )));
        }
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        if tables.posts.values().any(|p| p.category_id == id) {
            return Err(RepoError::Constraint(
                "category still has posts".to_string(),
            ));
        }
        tables.categories.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn list(&self) -> Result<Vec<Category>, RepoError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn list_with_published_counts(&self) -> Result<Vec<CategoryWithCount>, RepoError> {
        let tables = self.tables.read().await;
        let mut counted: Vec<CategoryWithCount> = tables
            .categories
            .values()
            .map(|category| CategoryWithCount {
                count: tables
                    .posts
                    .values()
                    .filter(|p| p.category_id == category.id && p.is_published)
                    .count() as u64,
                category: category.clone(),
            })
            .collect();
        counted.sort_by(|a, b| a.category.name.cmp(&b.category.name));
        Ok(counted)
    }
}

/// In-memory tag repository.
pub struct InMemoryTagRepository {
    tables: SharedTables,
}

impl InMemoryTagRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl BaseRepository<Tag, Uuid> for InMemoryTagRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tag>, RepoError> {
        Ok(self.tables.read().await.tags.get(&id).cloned())
    }

    async fn save(&self, tag: Tag) -> Result<Tag, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .tags
            .values()
            .any(|t| t.slug == tag.slug && t.id != tag.id)
        {
            return Err(RepoError::Constraint(format!(
                "tag slug '{}' is taken",
                tag.slug
            )));
        }
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.tags.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        tables.post_tags.retain(|(_, tag_id)| *tag_id != id);
        Ok(())
    }
}

#[async_trait]
impl TagRepository for InMemoryTagRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.tags.values().find(|t| t.slug == slug).cloned())
    }

    async fn list(&self) -> Result<Vec<Tag>, RepoError> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tag>, RepoError> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .tags
            .values()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }
}

/// In-memory post repository.
pub struct InMemoryPostRepository {
    tables: SharedTables,
}

impl InMemoryPostRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        Self { tables }
    }
}

fn summarize(tables: &Tables, post: &Post) -> Result<PostSummary, RepoError> {
    let category = tables
        .categories
        .get(&post.category_id)
        .cloned()
        .ok_or_else(|| RepoError::Query(format!("post {} has no category", post.id)))?;
    let mut tags: Vec<Tag> = tables
        .tag_ids_of(post.id)
        .iter()
        .filter_map(|id| tables.tags.get(id).cloned())
        .collect();
    tags.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(PostSummary {
        post: post.clone(),
        category,
        tags,
    })
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&post.category_id) {
            return Err(RepoError::Constraint(format!(
                "category {} does not exist",
                post.category_id
            )));
        }
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        if self.tables.write().await.delete_post(id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn count(&self, query: &PostQuery) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        let count = tables
            .posts
            .values()
            .filter(|p| query.matches(p, &tables.tag_ids_of(p.id)))
            .count();
        Ok(count as u64)
    }

    async fn list(
        &self,
        query: &PostQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostSummary>, RepoError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&Post> = tables
            .posts
            .values()
            .filter(|p| query.matches(p, &tables.tag_ids_of(p.id)))
            .collect();
        matching.sort_by_key(|p| Reverse((p.updated_at, p.id)));

        matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|p| summarize(&tables, p))
            .collect()
    }

    async fn find_summary(&self, id: Uuid) -> Result<Option<PostSummary>, RepoError> {
        let tables = self.tables.read().await;
        tables
            .posts
            .get(&id)
            .map(|p| summarize(&tables, p))
            .transpose()
    }

    async fn save_with_tags(&self, post: Post, tag_ids: &[Uuid]) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&post.category_id) {
            return Err(RepoError::Constraint(format!(
                "category {} does not exist",
                post.category_id
            )));
        }
        if let Some(missing) = tag_ids.iter().find(|id| !tables.tags.contains_key(*id)) {
            return Err(RepoError::Constraint(format!("tag {missing} does not exist")));
        }

        tables.posts.insert(post.id, post.clone());
        tables.post_tags.retain(|(id, _)| *id != post.id);
        tables
            .post_tags
            .extend(tag_ids.iter().map(|tag_id| (post.id, *tag_id)));
        Ok(post)
    }
}

/// In-memory comment repository.
pub struct InMemoryCommentRepository {
    tables: SharedTables,
}

impl InMemoryCommentRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn save(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(RepoError::Constraint(format!(
                "post {} does not exist",
                comment.post_id
            )));
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        if self.tables.write().await.delete_comment(id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn threads_for_post(&self, post_id: Uuid) -> Result<Vec<CommentThread>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<&Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));

        Ok(comments
            .into_iter()
            .map(|comment| {
                let mut replies: Vec<Reply> = tables
                    .replies
                    .values()
                    .filter(|r| r.comment_id == comment.id)
                    .cloned()
                    .collect();
                replies.sort_by_key(|r| (r.created_at, r.id));
                CommentThread {
                    comment: comment.clone(),
                    replies,
                }
            })
            .collect())
    }

    async fn list(&self) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables.comments.values().cloned().collect();
        comments.sort_by_key(|c| Reverse((c.created_at, c.id)));
        Ok(comments)
    }
}

/// In-memory reply repository.
pub struct InMemoryReplyRepository {
    tables: SharedTables,
}

impl InMemoryReplyRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl BaseRepository<Reply, Uuid> for InMemoryReplyRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reply>, RepoError> {
        Ok(self.tables.read().await.replies.get(&id).cloned())
    }

    async fn save(&self, reply: Reply) -> Result<Reply, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.comments.contains_key(&reply.comment_id) {
            return Err(RepoError::Constraint(format!(
                "comment {} does not exist",
                reply.comment_id
            )));
        }
        tables.replies.insert(reply.id, reply.clone());
        Ok(reply)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        match self.tables.write().await.replies.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl ReplyRepository for InMemoryReplyRepository {
    async fn list(&self) -> Result<Vec<Reply>, RepoError> {
        let tables = self.tables.read().await;
        let mut replies: Vec<Reply> = tables.replies.values().cloned().collect();
        replies.sort_by_key(|r| Reverse((r.created_at, r.id)));
        Ok(replies)
    }
}
