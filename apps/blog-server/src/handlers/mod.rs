//! HTTP handlers and route configuration.

mod admin;
mod auth;
mod comments;
mod context;
mod forms;
mod health;
mod posts;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use actix_web::web;
use blog_core::ports::RateLimiter;

use crate::middleware::rate_limit::RateLimitMiddleware;

/// Configure all application routes. `limiter` throttles visitor writes.
pub fn configure_routes(cfg: &mut web::ServiceConfig, limiter: Option<Arc<dyn RateLimiter>>) {
    cfg.route("/", web::get().to(posts::index))
        .route("/health", web::get().to(health::health_check))
        .route("/post/{id}", web::get().to(posts::detail))
        .route("/category/{slug}", web::get().to(posts::by_category))
        .route("/tag/{slug}", web::get().to(posts::by_tag))
        .route("/search", web::get().to(posts::search))
        // Visitor writes
        .service(
            web::resource("/post/{post_id}/comment")
                .wrap(RateLimitMiddleware::new(limiter.clone()))
                .route(web::get().to(comments::comment_form))
                .route(web::post().to(comments::create_comment)),
        )
        .service(
            web::resource("/comment/{comment_id}/reply")
                .wrap(RateLimitMiddleware::new(limiter))
                .route(web::get().to(comments::reply_form))
                .route(web::post().to(comments::create_reply)),
        )
        // Deletion requires login
        .service(
            web::resource("/comment/{id}/delete")
                .route(web::get().to(comments::confirm_delete_comment))
                .route(web::post().to(comments::delete_comment)),
        )
        .service(
            web::resource("/reply/{id}/delete")
                .route(web::get().to(comments::confirm_delete_reply))
                .route(web::post().to(comments::delete_reply)),
        )
        .service(
            web::resource("/accounts/login/")
                .route(web::get().to(auth::login_form))
                .route(web::post().to(auth::login)),
        )
        .service(
            web::scope("/admin")
                .service(
                    web::resource("/posts")
                        .route(web::get().to(admin::list_posts))
                        .route(web::post().to(admin::create_post)),
                )
                .service(
                    web::resource("/posts/{id}")
                        .route(web::get().to(admin::get_post))
                        .route(web::put().to(admin::update_post))
                        .route(web::delete().to(admin::delete_post)),
                )
                .service(
                    web::resource("/categories")
                        .route(web::get().to(admin::list_categories))
                        .route(web::post().to(admin::create_category)),
                )
                .service(
                    web::resource("/categories/{id}")
                        .route(web::put().to(admin::update_category))
                        .route(web::delete().to(admin::delete_category)),
                )
                .service(
                    web::resource("/tags")
                        .route(web::get().to(admin::list_tags))
                        .route(web::post().to(admin::create_tag)),
                )
                .service(
                    web::resource("/tags/{id}")
                        .route(web::put().to(admin::update_tag))
                        .route(web::delete().to(admin::delete_tag)),
                )
                .route("/comments", web::get().to(admin::list_comments))
                .route("/comments/{id}", web::delete().to(admin::delete_comment))
                .route("/replies", web::get().to(admin::list_replies))
                .route("/replies/{id}", web::delete().to(admin::delete_reply)),
        );
}
