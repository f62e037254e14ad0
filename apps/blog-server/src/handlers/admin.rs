//! Staff moderation API: posts, categories, tags, comments and replies.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use blog_core::DomainError;
use blog_core::domain::{Category, Post, PostSummary, Tag};
use blog_core::query::{PageSelector, PostQuery, fetch_page};
use blog_shared::ApiResponse;
use blog_shared::FieldErrors;
use blog_shared::dto::{AdminPostRow, PostInput, TaxonomyInput};

use crate::handlers::forms::validate;
use crate::middleware::auth::StaffIdentity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const ADMIN_PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct PostListParams {
    /// Whitespace-separated words, each matched against title or content.
    pub q: Option<String>,
    pub category: Option<Uuid>,
    pub page: Option<String>,
}

fn row(summary: PostSummary) -> AdminPostRow {
    AdminPostRow {
        id: summary.post.id,
        title: summary.post.title,
        category: summary.category.name,
        created_at: summary.post.created_at,
        updated_at: summary.post.updated_at,
        is_published: summary.post.is_published,
    }
}

fn invalid_field(field: &str, message: &str) -> AppError {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), vec![message.to_string()]);
    AppError::validation(errors)
}

/// Check the input and its references. Returns the deduplicated tag ids.
async fn checked_post_input(state: &AppState, input: &PostInput) -> AppResult<Vec<Uuid>> {
    validate(input)?;

    if state.categories.find_by_id(input.category_id).await?.is_none() {
        return Err(invalid_field("category_id", "Select a valid category."));
    }

    let mut tag_ids = input.tag_ids.clone();
    tag_ids.sort();
    tag_ids.dedup();
    let found = state.tags.find_by_ids(&tag_ids).await?;
    if found.len() != tag_ids.len() {
        return Err(invalid_field("tag_ids", "Select valid tags."));
    }
    Ok(tag_ids)
}

async fn summary_of(state: &AppState, id: Uuid) -> AppResult<PostSummary> {
    Ok(state
        .posts
        .find_summary(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", id))?)
}

/// GET /admin/posts
pub async fn list_posts(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    params: web::Query<PostListParams>,
) -> AppResult<HttpResponse> {
    let params = params.into_inner();
    let mut query = PostQuery::default().containing_words(params.q.as_deref().unwrap_or_default());
    if let Some(category_id) = params.category {
        query = query.in_category(category_id);
    }

    let selector = PageSelector::parse(params.page.as_deref())?;
    let page = fetch_page(state.posts.as_ref(), &query, selector, ADMIN_PAGE_SIZE).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(page.map(row))))
}

/// POST /admin/posts
pub async fn create_post(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    body: web::Json<PostInput>,
) -> AppResult<HttpResponse> {
    let input = body.into_inner();
    let tag_ids = checked_post_input(&state, &input).await?;

    let post = Post::new(
        input.category_id,
        input.title,
        input.content,
        input.is_published,
    );
    let post = state.posts.save_with_tags(post, &tag_ids).await?;
    tracing::info!(post_id = %post.id, "Post created");

    let summary = summary_of(&state, post.id).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(summary)))
}

/// GET /admin/posts/{id}
pub async fn get_post(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let summary = summary_of(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(summary)))
}

/// PUT /admin/posts/{id}
pub async fn update_post(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<PostInput>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let mut post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", id))?;

    let input = body.into_inner();
    let tag_ids = checked_post_input(&state, &input).await?;

    post.title = input.title;
    post.content = input.content;
    post.category_id = input.category_id;
    post.is_published = input.is_published;
    post.touch();

    let post = state.posts.save_with_tags(post, &tag_ids).await?;
    tracing::info!(post_id = %post.id, "Post updated");

    let summary = summary_of(&state, post.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(summary)))
}

/// DELETE /admin/posts/{id}
pub async fn delete_post(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    state.posts.delete(id).await?;
    tracing::info!(post_id = %id, "Post deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// GET /admin/categories
pub async fn list_categories(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let categories = state.categories.list().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(categories)))
}

/// POST /admin/categories
pub async fn create_category(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    body: web::Json<TaxonomyInput>,
) -> AppResult<HttpResponse> {
    let input = body.into_inner();
    validate(&input)?;

    let category = state
        .categories
        .save(Category::new(input.name, input.slug))
        .await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok(HttpResponse::Created().json(ApiResponse::ok(category)))
}

/// PUT /admin/categories/{id}
pub async fn update_category(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<TaxonomyInput>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let mut category = state
        .categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Category", id))?;

    let input = body.into_inner();
    validate(&input)?;
    category.name = input.name;
    category.slug = input.slug;

    let category = state.categories.save(category).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(category)))
}

/// DELETE /admin/categories/{id}
///
/// Categories that still have posts are kept (409).
pub async fn delete_category(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    state.categories.delete(id).await?;
    tracing::info!(category_id = %id, "Category deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// GET /admin/tags
pub async fn list_tags(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let tags = state.tags.list().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tags)))
}

/// POST /admin/tags
pub async fn create_tag(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    body: web::Json<TaxonomyInput>,
) -> AppResult<HttpResponse> {
    let input = body.into_inner();
    validate(&input)?;

    let tag = state.tags.save(Tag::new(input.name, input.slug)).await?;
    tracing::info!(tag_id = %tag.id, slug = %tag.slug, "Tag created");
    Ok(HttpResponse::Created().json(ApiResponse::ok(tag)))
}

/// PUT /admin/tags/{id}
pub async fn update_tag(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<TaxonomyInput>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let mut tag = state
        .tags
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Tag", id))?;

    let input = body.into_inner();
    validate(&input)?;
    tag.name = input.name;
    tag.slug = input.slug;

    let tag = state.tags.save(tag).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tag)))
}

/// DELETE /admin/tags/{id}
pub async fn delete_tag(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    state.tags.delete(id).await?;
    tracing::info!(tag_id = %id, "Tag deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// GET /admin/comments
pub async fn list_comments(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let comments = state.comments.list().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(comments)))
}

/// DELETE /admin/comments/{id}
pub async fn delete_comment(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    state.comments.delete(id).await?;
    tracing::info!(comment_id = %id, "Comment removed by staff");
    Ok(HttpResponse::NoContent().finish())
}

/// GET /admin/replies
pub async fn list_replies(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let replies = state.replies.list().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(replies)))
}

/// DELETE /admin/replies/{id}
pub async fn delete_reply(
    _staff: StaffIdentity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    state.replies.delete(id).await?;
    tracing::info!(reply_id = %id, "Reply removed by staff");
    Ok(HttpResponse::NoContent().finish())
}
