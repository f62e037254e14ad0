//! Public post pages: listing, category, tag, search and detail.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use blog_core::DomainError;
use blog_core::domain::{Category, CommentThread, PostSummary, Tag};
use blog_core::query::{POSTS_PER_PAGE, Page, PageSelector, PostQuery, fetch_page};

use crate::handlers::context::render;
use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub page: Option<String>,
}

#[derive(Serialize)]
struct ListView {
    posts: Page<PostSummary>,
}

#[derive(Serialize)]
struct CategoryView {
    posts: Page<PostSummary>,
    category: Category,
}

#[derive(Serialize)]
struct TagView {
    posts: Page<PostSummary>,
    tag: Tag,
}

#[derive(Serialize)]
struct SearchView {
    posts: Page<PostSummary>,
    query: String,
    post_count: u64,
}

#[derive(Serialize)]
struct DetailView {
    post: PostSummary,
    comments: Vec<CommentThread>,
}

async fn page_of(
    state: &AppState,
    query: &PostQuery,
    page: Option<&str>,
) -> AppResult<Page<PostSummary>> {
    let selector = PageSelector::parse(page)?;
    Ok(fetch_page(state.posts.as_ref(), query, selector, POSTS_PER_PAGE).await?)
}

/// A post the viewer may see. Drafts are indistinguishable from missing
/// posts for anonymous viewers.
pub async fn visible_post(
    state: &AppState,
    post_id: Uuid,
    authenticated: bool,
) -> AppResult<PostSummary> {
    match state.posts.find_summary(post_id).await? {
        Some(summary) if summary.post.is_visible_to(authenticated) => Ok(summary),
        _ => Err(DomainError::not_found("Post", post_id).into()),
    }
}

/// GET /
pub async fn index(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    params: web::Query<PageParams>,
) -> AppResult<HttpResponse> {
    let query = PostQuery::visible_to(identity.is_authenticated());
    let posts = page_of(&state, &query, params.page.as_deref()).await?;
    render(&state, ListView { posts }).await
}

/// GET /post/{id}
pub async fn detail(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = visible_post(&state, path.into_inner(), identity.is_authenticated()).await?;
    let comments = state.comments.threads_for_post(post.post.id).await?;
    render(&state, DetailView { post, comments }).await
}

/// GET /category/{slug}
pub async fn by_category(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
    params: web::Query<PageParams>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let category = state
        .categories
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| DomainError::not_found("Category", &slug))?;

    let query = PostQuery::visible_to(identity.is_authenticated()).in_category(category.id);
    let posts = page_of(&state, &query, params.page.as_deref()).await?;
    render(&state, CategoryView { posts, category }).await
}

/// GET /tag/{slug}
pub async fn by_tag(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
    params: web::Query<PageParams>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let tag = state
        .tags
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| DomainError::not_found("Tag", &slug))?;

    let query = PostQuery::visible_to(identity.is_authenticated()).with_tag(tag.id);
    let posts = page_of(&state, &query, params.page.as_deref()).await?;
    render(&state, TagView { posts, tag }).await
}

/// GET /search?query=
pub async fn search(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    params: web::Query<SearchParams>,
) -> AppResult<HttpResponse> {
    let params = params.into_inner();
    let text = params.query.unwrap_or_default();

    let query = PostQuery::visible_to(identity.is_authenticated()).containing(&text);
    let posts = page_of(&state, &query, params.page.as_deref()).await?;
    tracing::debug!(query = %text, matches = posts.total_items, "Search");

    let post_count = posts.total_items;
    render(
        &state,
        SearchView {
            posts,
            query: text,
            post_count,
        },
    )
    .await
}
