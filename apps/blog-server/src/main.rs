//! # Blog Server
//!
//! The main entry point for the Actix-web HTTP server.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use blog_core::ports::{PasswordService, RateLimiter, TokenService};
use blog_infra::{Argon2PasswordService, JwtConfig, JwtTokenService};
use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!("Starting Blog Server on {}:{}", config.host, config.port);

    let state = AppState::new(&config).await;

    let token_service: Arc<dyn TokenService> =
        Arc::new(JwtTokenService::new(JwtConfig::from_env()));
    let password_service: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

    if let Some(admin) = &config.admin {
        if let Err(e) = state::bootstrap_admin(&state, password_service.as_ref(), admin).await {
            tracing::error!("Failed to create admin account: {}", e);
        }
    }

    let rate_limiter = build_rate_limiter();

    HttpServer::new(move || {
        let limiter = rate_limiter.clone();
        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(token_service.clone()))
            .app_data(web::Data::new(password_service.clone()))
            .configure(move |cfg| handlers::configure_routes(cfg, limiter))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

#[cfg(feature = "rate-limit")]
fn build_rate_limiter() -> Option<Arc<dyn RateLimiter>> {
    use blog_infra::{InMemoryRateLimiter, RateLimitConfig};

    let config = RateLimitConfig::from_env();
    tracing::info!(
        max_requests = config.max_requests,
        window_secs = config.window.as_secs(),
        "Rate limiting enabled"
    );
    Some(Arc::new(InMemoryRateLimiter::new(config)))
}

#[cfg(not(feature = "rate-limit"))]
fn build_rate_limiter() -> Option<Arc<dyn RateLimiter>> {
    tracing::info!("Running without rate-limit feature");
    None
}
