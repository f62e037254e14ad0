//! Page rendering: every page context gets the site navigation merged in.

use actix_web::{HttpResponse, http::header};
use blog_core::domain::{CategoryWithCount, Tag};
use blog_shared::ApiResponse;
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// Navigation shown on every page.
#[derive(Debug, Serialize)]
pub struct SiteContext {
    /// Every category with its number of published posts.
    pub categories: Vec<CategoryWithCount>,
    pub tags: Vec<Tag>,
}

impl SiteContext {
    pub async fn load(state: &AppState) -> AppResult<Self> {
        Ok(Self {
            categories: state.categories.list_with_published_counts().await?,
            tags: state.tags.list().await?,
        })
    }
}

#[derive(Serialize)]
struct PageContext<T> {
    #[serde(flatten)]
    view: T,
    #[serde(flatten)]
    site: SiteContext,
}

/// Respond with the view's context plus the site navigation.
pub async fn render<T: Serialize>(state: &AppState, view: T) -> AppResult<HttpResponse> {
    let site = SiteContext::load(state).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(PageContext { view, site })))
}

pub fn post_detail_path(post_id: Uuid) -> String {
    format!("/post/{post_id}")
}

/// 303 after a successful write.
pub fn see_other(location: String) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}
