//! PostgreSQL repository implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, LikeExpr, Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use blog_core::domain::{
    Category, CategoryWithCount, Comment, CommentThread, Post, PostSummary, Reply, Tag, User,
};
use blog_core::error::RepoError;
use blog_core::ports::{
    CategoryRepository, CommentRepository, PostRepository, ReplyRepository, TagRepository,
    UserRepository,
};
use blog_core::query::PostQuery;

use super::entity::{category, comment, post, post_tag, reply, tag, user};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<user::Entity>;

/// PostgreSQL category repository.
pub type PostgresCategoryRepository = PostgresBaseRepository<category::Entity>;

/// PostgreSQL tag repository.
pub type PostgresTagRepository = PostgresBaseRepository<tag::Entity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<post::Entity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<comment::Entity>;

/// PostgreSQL reply repository.
pub type PostgresReplyRepository = PostgresBaseRepository<reply::Entity>;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }
}

/// Keep the first character and the domain, to avoid PII in logs.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if local.chars().count() > 1 => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{domain}")
        }
        Some((_, domain)) => format!("***@{domain}"),
        None => "***".to_string(),
    }
}

#[derive(Debug, FromQueryResult)]
struct CategoryCountRow {
    id: Uuid,
    name: String,
    slug: String,
    post_count: i64,
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let result = category::Entity::find()
            .filter(category::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Category>, RepoError> {
        let result = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn list_with_published_counts(&self) -> Result<Vec<CategoryWithCount>, RepoError> {
        // The published filter sits in the join condition so that categories
        // without published posts still come back with a zero count.
        let rows = category::Entity::find()
            .select_only()
            .column(category::Column::Id)
            .column(category::Column::Name)
            .column(category::Column::Slug)
            .column_as(
                Expr::col((post::Entity, post::Column::Id)).count(),
                "post_count",
            )
            .join(
                JoinType::LeftJoin,
                category::Relation::Post
                    .def()
                    .on_condition(|_left, right| {
                        Condition::all()
                            .add(Expr::col((right, post::Column::IsPublished)).eq(true))
                    }),
            )
            .group_by(category::Column::Id)
            .group_by(category::Column::Name)
            .group_by(category::Column::Slug)
            .order_by_asc(category::Column::Name)
            .into_model::<CategoryCountRow>()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .map(|row| CategoryWithCount {
                category: Category {
                    id: row.id,
                    name: row.name,
                    slug: row.slug,
                },
                count: u64::try_from(row.post_count).unwrap_or(0),
            })
            .collect())
    }
}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError> {
        let result = tag::Entity::find()
            .filter(tag::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Tag>, RepoError> {
        let result = tag::Entity::find()
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tag>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = tag::Entity::find()
            .filter(tag::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `lower(posts.<column>) LIKE '%term%'`
fn icontains(column: post::Column, term: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
    Expr::expr(Func::lower(Expr::col((post::Entity, column))))
        .like(LikeExpr::new(pattern).escape('\\'))
}

/// Translate a [`PostQuery`] into a SeaORM select. Nothing runs until the
/// select is counted or fetched.
fn filtered_posts(query: &PostQuery) -> Select<post::Entity> {
    let mut condition = Condition::all();

    if let Some(category_id) = query.category_id {
        condition = condition.add(post::Column::CategoryId.eq(category_id));
    }
    if let Some(tag_id) = query.tag_id {
        condition = condition.add(
            post::Column::Id.in_subquery(
                Query::select()
                    .column(post_tag::Column::PostId)
                    .from(post_tag::Entity)
                    .and_where(post_tag::Column::TagId.eq(tag_id))
                    .to_owned(),
            ),
        );
    }
    if query.published_only {
        condition = condition.add(post::Column::IsPublished.eq(true));
    }
    for term in &query.terms {
        condition = condition.add(
            Condition::any()
                .add(icontains(post::Column::Title, term))
                .add(icontains(post::Column::Content, term)),
        );
    }

    post::Entity::find().filter(condition)
}

impl PostgresPostRepository {
    async fn tags_by_post(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Tag>>, RepoError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = post_tag::Entity::find()
            .filter(post_tag::Column::PostId.is_in(post_ids.iter().copied()))
            .find_also_related(tag::Entity)
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for (link, tag) in rows {
            if let Some(tag) = tag {
                tags.entry(link.post_id).or_default().push(tag.into());
            }
        }
        Ok(tags)
    }

    async fn summarize(
        &self,
        rows: Vec<(post::Model, Option<category::Model>)>,
    ) -> Result<Vec<PostSummary>, RepoError> {
        let ids: Vec<Uuid> = rows.iter().map(|(post, _)| post.id).collect();
        let mut tags = self.tags_by_post(&ids).await?;

        rows.into_iter()
            .map(|(post, category)| {
                let category = category.ok_or_else(|| {
                    RepoError::Query(format!("post {} has no category", post.id))
                })?;
                Ok(PostSummary {
                    tags: tags.remove(&post.id).unwrap_or_default(),
                    post: post.into(),
                    category: category.into(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn count(&self, query: &PostQuery) -> Result<u64, RepoError> {
        filtered_posts(query)
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn list(
        &self,
        query: &PostQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostSummary>, RepoError> {
        let rows = filtered_posts(query)
            .order_by_desc(post::Column::UpdatedAt)
            .order_by_desc(post::Column::Id)
            .offset(offset)
            .limit(limit)
            .find_also_related(category::Entity)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        self.summarize(rows).await
    }

    async fn find_summary(&self, id: Uuid) -> Result<Option<PostSummary>, RepoError> {
        let row = post::Entity::find_by_id(id)
            .find_also_related(category::Entity)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        match row {
            Some(row) => Ok(self.summarize(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn save_with_tags(&self, post: Post, tag_ids: &[Uuid]) -> Result<Post, RepoError> {
        let mut tag_ids = tag_ids.to_vec();
        tag_ids.sort();
        tag_ids.dedup();

        let txn = self.db.begin().await.map_err(map_db_err)?;

        let active_model: post::ActiveModel = post.into();
        let saved = match active_model.clone().update(&txn).await {
            Ok(model) => model,
            Err(DbErr::RecordNotUpdated) => active_model.insert(&txn).await.map_err(map_db_err)?,
            Err(e) => return Err(map_db_err(e)),
        };

        post_tag::Entity::delete_many()
            .filter(post_tag::Column::PostId.eq(saved.id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        if !tag_ids.is_empty() {
            let links = tag_ids.iter().map(|tag_id| post_tag::ActiveModel {
                post_id: Set(saved.id),
                tag_id: Set(*tag_id),
            });
            post_tag::Entity::insert_many(links)
                .exec_without_returning(&txn)
                .await
                .map_err(map_db_err)?;
        }

        // Dropping an uncommitted transaction rolls it back.
        txn.commit().await.map_err(map_db_err)?;
        Ok(saved.into())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn threads_for_post(&self, post_id: Uuid) -> Result<Vec<CommentThread>, RepoError> {
        let comments = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let replies = reply::Entity::find()
            .filter(reply::Column::CommentId.is_in(comments.iter().map(|c| c.id)))
            .order_by_asc(reply::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        let mut by_comment: HashMap<Uuid, Vec<Reply>> = HashMap::new();
        for reply in replies {
            by_comment
                .entry(reply.comment_id)
                .or_default()
                .push(reply.into());
        }

        Ok(comments
            .into_iter()
            .map(|comment| CommentThread {
                replies: by_comment.remove(&comment.id).unwrap_or_default(),
                comment: comment.into(),
            })
            .collect())
    }

    async fn list(&self) -> Result<Vec<Comment>, RepoError> {
        let result = comment::Entity::find()
            .order_by_desc(comment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ReplyRepository for PostgresReplyRepository {
    async fn list(&self) -> Result<Vec<Reply>, RepoError> {
        let result = reply::Entity::find()
            .order_by_desc(reply::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}
