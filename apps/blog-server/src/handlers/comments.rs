//! Visitor comments and replies: forms, creation and deletion.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use uuid::Uuid;

use blog_core::DomainError;
use blog_core::domain::{Comment, PostSummary, Reply};
use blog_shared::dto::CommentForm;

use crate::handlers::context::{post_detail_path, render, see_other};
use crate::handlers::forms::{FormOrJson, into_inner, validate};
use crate::handlers::posts::visible_post;
use crate::middleware::auth::{OptionalIdentity, login_redirect};
use crate::middleware::error::AppResult;
use crate::state::AppState;

#[derive(Serialize)]
struct CommentFormView {
    post: PostSummary,
}

#[derive(Serialize)]
struct CommentView {
    comment: Comment,
}

#[derive(Serialize)]
struct ReplyDeleteView {
    reply: Reply,
    comment: Comment,
}

async fn find_comment(state: &AppState, id: Uuid) -> AppResult<Comment> {
    Ok(state
        .comments
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Comment", id))?)
}

/// A comment whose post the caller may see.
async fn visible_comment(state: &AppState, id: Uuid, authenticated: bool) -> AppResult<Comment> {
    let comment = find_comment(state, id).await?;
    visible_post(state, comment.post_id, authenticated).await?;
    Ok(comment)
}

async fn find_reply(state: &AppState, id: Uuid) -> AppResult<Reply> {
    Ok(state
        .replies
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Reply", id))?)
}

/// Validate a visitor form, returning it trimmed.
fn checked(body: FormOrJson<CommentForm>, context: serde_json::Value) -> AppResult<CommentForm> {
    let form = into_inner(body).trimmed();
    validate(&form).map_err(|e| e.with_context(context))?;
    Ok(form)
}

/// GET /post/{post_id}/comment
pub async fn comment_form(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = visible_post(&state, path.into_inner(), identity.is_authenticated()).await?;
    render(&state, CommentFormView { post }).await
}

/// POST /post/{post_id}/comment
pub async fn create_comment(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
    body: FormOrJson<CommentForm>,
) -> AppResult<HttpResponse> {
    let post = visible_post(&state, path.into_inner(), identity.is_authenticated()).await?;
    let post_id = post.post.id;
    let form = checked(body, serde_json::json!({ "post": post }))?;

    let comment = state
        .comments
        .save(Comment::new(post_id, form.author, form.text))
        .await?;
    tracing::info!(comment_id = %comment.id, post_id = %post_id, "Comment created");

    Ok(see_other(post_detail_path(post_id)))
}

/// GET /comment/{comment_id}/reply
pub async fn reply_form(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let comment = visible_comment(&state, path.into_inner(), identity.is_authenticated()).await?;
    render(&state, CommentView { comment }).await
}

/// POST /comment/{comment_id}/reply
pub async fn create_reply(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
    body: FormOrJson<CommentForm>,
) -> AppResult<HttpResponse> {
    let comment = visible_comment(&state, path.into_inner(), identity.is_authenticated()).await?;
    let form = checked(body, serde_json::json!({ "comment": comment }))?;

    let reply = state
        .replies
        .save(Reply::new(comment.id, form.author, form.text))
        .await?;
    tracing::info!(reply_id = %reply.id, comment_id = %comment.id, "Reply created");

    Ok(see_other(post_detail_path(comment.post_id)))
}

/// GET /comment/{id}/delete
pub async fn confirm_delete_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    if !identity.is_authenticated() {
        return Ok(login_redirect(&state.login_url, req.path()));
    }
    let comment = find_comment(&state, path.into_inner()).await?;
    render(&state, CommentView { comment }).await
}

/// POST /comment/{id}/delete
pub async fn delete_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let Some(user) = identity.0 else {
        return Ok(login_redirect(&state.login_url, req.path()));
    };
    let comment = find_comment(&state, path.into_inner()).await?;

    state.comments.delete(comment.id).await?;
    tracing::info!(
        comment_id = %comment.id,
        user_id = %user.user_id,
        email = %user.email,
        "Comment deleted"
    );

    Ok(see_other(post_detail_path(comment.post_id)))
}

/// GET /reply/{id}/delete
pub async fn confirm_delete_reply(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    if !identity.is_authenticated() {
        return Ok(login_redirect(&state.login_url, req.path()));
    }
    let reply = find_reply(&state, path.into_inner()).await?;
    let comment = find_comment(&state, reply.comment_id).await?;
    render(&state, ReplyDeleteView { reply, comment }).await
}

/// POST /reply/{id}/delete
pub async fn delete_reply(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let Some(user) = identity.0 else {
        return Ok(login_redirect(&state.login_url, req.path()));
    };
    let reply = find_reply(&state, path.into_inner()).await?;
    let comment = find_comment(&state, reply.comment_id).await?;

    state.replies.delete(reply.id).await?;
    tracing::info!(
        reply_id = %reply.id,
        user_id = %user.user_id,
        email = %user.email,
        "Reply deleted"
    );

    Ok(see_other(post_detail_path(comment.post_id)))
}
