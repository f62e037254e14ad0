//! Login: issues bearer tokens for staff and registered users.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use blog_core::ports::{PasswordService, TokenService};
use blog_shared::dto::{AuthResponse, LoginRequest};

use crate::handlers::context::render;
use crate::handlers::forms::{FormOrJson, into_inner};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    pub next: Option<String>,
}

#[derive(Serialize)]
struct LoginView {
    next: Option<String>,
}

/// GET /accounts/login/
pub async fn login_form(
    state: web::Data<AppState>,
    params: web::Query<LoginParams>,
) -> AppResult<HttpResponse> {
    render(
        &state,
        LoginView {
            next: params.into_inner().next,
        },
    )
    .await
}

/// POST /accounts/login/
pub async fn login(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: FormOrJson<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = into_inner(body);

    let user = state
        .users
        .find_by_email(req.email.trim())
        .await?
        .ok_or(AppError::Unauthorized)?;

    let valid = password_service
        .verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(AppError::Unauthorized);
    }

    let token = token_service
        .generate_token(user.id, &user.email, user.roles())
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: token_service.expiration_seconds().max(0) as u64,
    }))
}
