use std::sync::Arc;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use blog_core::domain::{Category, Comment, Post, Reply, Tag, User};
use blog_core::ports::{
    CommentRepository, PasswordService, PostRepository, ReplyRepository, TokenService,
};
use blog_infra::{Argon2PasswordService, InMemoryStore, JwtConfig, JwtTokenService};

use super::configure_routes;
use crate::observability::RequestIdMiddleware;
use crate::state::AppState;

struct Fixture {
    state: AppState,
    tokens: Arc<dyn TokenService>,
    passwords: Arc<dyn PasswordService>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            state: AppState::in_memory(&InMemoryStore::new(), "/accounts/login/"),
            tokens: Arc::new(JwtTokenService::new(JwtConfig::default())),
            passwords: Arc::new(Argon2PasswordService::new()),
        }
    }

    fn bearer(&self, roles: &[&str]) -> (header::HeaderName, String) {
        let token = self
            .tokens
            .generate_token(
                Uuid::new_v4(),
                "reader@example.com",
                roles.iter().map(|r| r.to_string()).collect(),
            )
            .unwrap();
        (header::AUTHORIZATION, format!("Bearer {token}"))
    }

    fn user(&self) -> (header::HeaderName, String) {
        self.bearer(&["user"])
    }

    fn staff(&self) -> (header::HeaderName, String) {
        self.bearer(&["user", "admin"])
    }

    async fn category(&self, name: &str, slug: &str) -> Category {
        self.state
            .categories
            .save(Category::new(name.into(), slug.into()))
            .await
            .unwrap()
    }

    async fn tag(&self, name: &str, slug: &str) -> Tag {
        self.state
            .tags
            .save(Tag::new(name.into(), slug.into()))
            .await
            .unwrap()
    }

    /// A post last updated `age_secs` seconds ago.
    async fn post(
        &self,
        category: &Category,
        title: &str,
        published: bool,
        tags: &[&Tag],
        age_secs: i64,
    ) -> Post {
        let mut post = Post::new(category.id, title.into(), "Some content".into(), published);
        post.updated_at = Utc::now() - Duration::seconds(age_secs);
        let tag_ids: Vec<Uuid> = tags.iter().map(|t| t.id).collect();
        self.state.posts.save_with_tags(post, &tag_ids).await.unwrap()
    }

    async fn comment(&self, post: &Post, author: &str) -> Comment {
        self.state
            .comments
            .save(Comment::new(post.id, author.into(), "Nice post".into()))
            .await
            .unwrap()
    }

    async fn reply(&self, comment: &Comment) -> Reply {
        self.state
            .replies
            .save(Reply::new(comment.id, "bob".into(), "Agreed".into()))
            .await
            .unwrap()
    }
}

macro_rules! app {
    ($fx:expr) => {
        test::init_service(
            App::new()
                .wrap(RequestIdMiddleware)
                .app_data(web::Data::new($fx.state.clone()))
                .app_data(web::Data::new($fx.tokens.clone()))
                .app_data(web::Data::new($fx.passwords.clone()))
                .configure(|cfg| configure_routes(cfg, None)),
        )
        .await
    };
}

fn titles(body: &Value) -> Vec<String> {
    body["data"]["posts"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap().to_string())
        .collect()
}

fn location<B>(res: &actix_web::dev::ServiceResponse<B>) -> String {
    res.headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[actix_web::test]
async fn test_health_check() {
    let fx = Fixture::new();
    let app = app!(fx);

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request())
            .await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn test_unpublished_post_detail_requires_login() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let draft = fx.post(&tech, "Draft", false, &[], 0).await;
    let app = app!(fx);

    let uri = format!("/post/{}", draft.id);
    let res = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(fx.user())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["post"]["title"], "Draft");
    assert_eq!(body["data"]["post"]["category"]["slug"], "tech");
}

#[actix_web::test]
async fn test_missing_post_is_not_found() {
    let fx = Fixture::new();
    let app = app!(fx);

    let uri = format!("/post/{}", Uuid::new_v4());
    let res = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_index_orders_by_update_and_hides_drafts() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    fx.post(&tech, "Older", true, &[], 100).await;
    fx.post(&tech, "Newer", true, &[], 10).await;
    fx.post(&tech, "Draft", false, &[], 0).await;
    let app = app!(fx);

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(titles(&body), vec!["Newer", "Older"]);

    let req = test::TestRequest::get()
        .uri("/")
        .insert_header(fx.user())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(titles(&body), vec!["Draft", "Newer", "Older"]);
}

#[actix_web::test]
async fn test_category_listing_respects_publication() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    fx.category("Life", "life").await;
    let python = fx.tag("Python", "python").await;
    fx.post(&tech, "A", true, &[&python], 10).await;
    fx.post(&tech, "B", false, &[], 0).await;
    let app = app!(fx);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/category/tech").to_request(),
    )
    .await;
    assert_eq!(titles(&body), vec!["A"]);
    assert_eq!(body["data"]["category"]["slug"], "tech");

    let req = test::TestRequest::get()
        .uri("/category/tech")
        .insert_header(fx.user())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(titles(&body), vec!["B", "A"]);
}

#[actix_web::test]
async fn test_site_context_counts_published_posts_only() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    fx.category("Life", "life").await;
    fx.tag("Python", "python").await;
    fx.post(&tech, "A", true, &[], 10).await;
    fx.post(&tech, "B", false, &[], 0).await;
    let app = app!(fx);

    let req = test::TestRequest::get()
        .uri("/")
        .insert_header(fx.user())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let categories = body["data"]["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0]["slug"], "life");
    assert_eq!(categories[0]["count"], 0);
    assert_eq!(categories[1]["slug"], "tech");
    assert_eq!(categories[1]["count"], 1);
    assert_eq!(body["data"]["tags"][0]["slug"], "python");
}

#[actix_web::test]
async fn test_tag_listing() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let python = fx.tag("Python", "python").await;
    fx.tag("Go", "go").await;
    fx.post(&tech, "A", true, &[&python], 10).await;
    fx.post(&tech, "C", true, &[], 0).await;
    let app = app!(fx);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/tag/python").to_request(),
    )
    .await;
    assert_eq!(titles(&body), vec!["A"]);
    assert_eq!(body["data"]["tag"]["name"], "Python");
    assert_eq!(body["data"]["posts"]["items"][0]["tags"][0]["slug"], "python");

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/tag/go").to_request())
            .await;
    assert!(titles(&body).is_empty());
}

#[actix_web::test]
async fn test_unknown_slugs_are_not_found() {
    let fx = Fixture::new();
    let app = app!(fx);

    for uri in ["/category/nope", "/tag/nope"] {
        let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_web::test]
async fn test_empty_search_matches_listing() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    fx.post(&tech, "One", true, &[], 20).await;
    fx.post(&tech, "Two", true, &[], 10).await;
    fx.post(&tech, "Hidden", false, &[], 0).await;
    let app = app!(fx);

    let listing: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    let search: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/search?query=").to_request(),
    )
    .await;
    assert_eq!(titles(&listing), titles(&search));
    assert_eq!(search["data"]["post_count"], 2);

    let bare: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/search").to_request())
            .await;
    assert_eq!(bare["data"]["query"], "");
    assert_eq!(titles(&bare), titles(&listing));
}

#[actix_web::test]
async fn test_search_is_case_insensitive() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    fx.post(&tech, "Hello World", true, &[], 10).await;
    fx.post(&tech, "Goodbye", true, &[], 0).await;
    let app = app!(fx);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/search?query=hello").to_request(),
    )
    .await;
    assert_eq!(titles(&body), vec!["Hello World"]);
    assert_eq!(body["data"]["query"], "hello");
    assert_eq!(body["data"]["post_count"], 1);
}

#[actix_web::test]
async fn test_search_without_matches() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    fx.post(&tech, "Hello World", true, &[], 0).await;
    let app = app!(fx);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/search?query=xyz123").to_request(),
    )
    .await;
    assert!(titles(&body).is_empty());
    assert_eq!(body["data"]["post_count"], 0);
}

#[actix_web::test]
async fn test_search_treats_wildcards_literally() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    fx.post(&tech, "100% Rust", true, &[], 10).await;
    fx.post(&tech, "Plain", true, &[], 0).await;
    let app = app!(fx);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/search?query=%25").to_request(),
    )
    .await;
    assert_eq!(titles(&body), vec!["100% Rust"]);
}

#[actix_web::test]
async fn test_search_count_covers_all_pages() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    for i in 0..7 {
        fx.post(&tech, &format!("Rust {i}"), true, &[], i).await;
    }
    let app = app!(fx);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/search?query=rust").to_request(),
    )
    .await;
    assert_eq!(titles(&body).len(), 5);
    assert_eq!(body["data"]["post_count"], 7);
}

#[actix_web::test]
async fn test_pagination() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    for i in 0..6 {
        fx.post(&tech, &format!("Post {i}"), true, &[], i).await;
    }
    let app = app!(fx);

    let first: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(titles(&first).len(), 5);
    assert_eq!(first["data"]["posts"]["total_pages"], 2);
    assert_eq!(first["data"]["posts"]["has_next"], true);
    assert_eq!(first["data"]["posts"]["has_previous"], false);

    let second: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/?page=2").to_request(),
    )
    .await;
    assert_eq!(titles(&second), vec!["Post 5"]);

    let last: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/?page=last").to_request(),
    )
    .await;
    assert_eq!(last["data"]["posts"]["number"], 2);

    for uri in ["/?page=3", "/?page=0", "/?page=abc"] {
        let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_web::test]
async fn test_first_page_of_empty_listing() {
    let fx = Fixture::new();
    let app = app!(fx);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/?page=1").to_request(),
    )
    .await;
    assert!(titles(&body).is_empty());
    assert_eq!(body["data"]["posts"]["total_pages"], 1);
}

#[actix_web::test]
async fn test_empty_page_param_means_first_page() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    for i in 0..6 {
        fx.post(&tech, &format!("P{i}"), true, &[], i).await;
    }
    let app = app!(fx);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/?page=").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["posts"]["number"], 1);
    assert_eq!(titles(&body).len(), 5);
}

#[actix_web::test]
async fn test_detail_shows_threads_oldest_first() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let post = fx.post(&tech, "A", true, &[], 0).await;

    let mut early = Comment::new(post.id, "alice".into(), "first".into());
    early.created_at = Utc::now() - Duration::minutes(5);
    let early = fx.state.comments.save(early).await.unwrap();
    fx.comment(&post, "carol").await;
    fx.reply(&early).await;
    let app = app!(fx);

    let uri = format!("/post/{}", post.id);
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;

    let comments = body["data"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["author"], "alice");
    assert_eq!(comments[0]["replies"][0]["author"], "bob");
    assert_eq!(comments[1]["author"], "carol");
    assert!(comments[1]["replies"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_comment_form_context() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let post = fx.post(&tech, "A", true, &[], 0).await;
    let app = app!(fx);

    let uri = format!("/post/{}/comment", post.id);
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(body["data"]["post"]["title"], "A");
    assert!(body["data"]["categories"].is_array());
}

#[actix_web::test]
async fn test_create_comment_redirects_to_post() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let post = fx.post(&tech, "A", true, &[], 0).await;
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/post/{}/comment", post.id))
        .set_form([("author", "alice"), ("text", "Great read")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), format!("/post/{}", post.id));

    let threads = fx.state.comments.threads_for_post(post.id).await.unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].comment.author, "alice");
}

#[actix_web::test]
async fn test_create_comment_accepts_json() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let post = fx.post(&tech, "A", true, &[], 0).await;
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/post/{}/comment", post.id))
        .set_json(json!({"author": "alice", "text": "Great read"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}

#[actix_web::test]
async fn test_invalid_comment_is_not_saved() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let post = fx.post(&tech, "A", true, &[], 0).await;
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/post/{}/comment", post.id))
        .set_form([("author", "  "), ("text", "Great read")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(res).await;
    assert!(body["errors"]["author"].is_array());
    assert!(body["errors"].get("text").is_none());
    assert_eq!(body["context"]["post"]["title"], "A");

    assert!(fx.state.comments.threads_for_post(post.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_comment_on_missing_post() {
    let fx = Fixture::new();
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/post/{}/comment", Uuid::new_v4()))
        .set_form([("author", "alice"), ("text", "Hi")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_reply_redirects_to_parent_post() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let post = fx.post(&tech, "A", true, &[], 0).await;
    let comment = fx.comment(&post, "alice").await;
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/comment/{}/reply", comment.id))
        .set_form([("author", "bob"), ("text", "Thanks")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), format!("/post/{}", post.id));

    let threads = fx.state.comments.threads_for_post(post.id).await.unwrap();
    assert_eq!(threads[0].replies.len(), 1);
    assert_eq!(threads[0].replies[0].author, "bob");
}

#[actix_web::test]
async fn test_reply_form_and_validation() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let post = fx.post(&tech, "A", true, &[], 0).await;
    let comment = fx.comment(&post, "alice").await;
    let app = app!(fx);

    let uri = format!("/comment/{}/reply", comment.id);
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(body["data"]["comment"]["author"], "alice");

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_form([("author", "bob"), ("text", "")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(res).await;
    assert!(body["errors"]["text"].is_array());
    assert_eq!(body["context"]["comment"]["author"], "alice");

    let missing = format!("/comment/{}/reply", Uuid::new_v4());
    let res = test::call_service(&app, test::TestRequest::get().uri(&missing).to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_reply_routes_hide_draft_posts() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let draft = fx.post(&tech, "Draft", false, &[], 0).await;
    let comment = fx.comment(&draft, "alice").await;
    let app = app!(fx);

    let uri = format!("/comment/{}/reply", comment.id);
    let res = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_form([("author", "bob"), ("text", "Hidden?")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.headers().get(header::LOCATION).is_none());
    assert!(fx.state.replies.list().await.unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(fx.user())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["comment"]["author"], "alice");

    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header(fx.user())
        .set_form([("author", "bob"), ("text", "Seen")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(fx.state.replies.list().await.unwrap().len(), 1);
}

#[actix_web::test]
async fn test_anonymous_comment_delete_redirects_to_login() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let post = fx.post(&tech, "A", true, &[], 0).await;
    let comment = fx.comment(&post, "alice").await;
    let reply = fx.reply(&comment).await;
    let app = app!(fx);

    let path = format!("/comment/{}/delete", comment.id);
    for req in [
        test::TestRequest::get().uri(&path).to_request(),
        test::TestRequest::post().uri(&path).to_request(),
    ] {
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(location(&res), format!("/accounts/login/?next={path}"));
    }

    assert!(fx.state.comments.find_by_id(comment.id).await.unwrap().is_some());
    assert!(fx.state.replies.find_by_id(reply.id).await.unwrap().is_some());
}

#[actix_web::test]
async fn test_anonymous_delete_of_missing_comment_still_redirects() {
    let fx = Fixture::new();
    let app = app!(fx);

    let path = format!("/reply/{}/delete", Uuid::new_v4());
    let res = test::call_service(&app, test::TestRequest::post().uri(&path).to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
}

#[actix_web::test]
async fn test_delete_comment_removes_replies() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let post = fx.post(&tech, "A", true, &[], 0).await;
    let comment = fx.comment(&post, "alice").await;
    let reply = fx.reply(&comment).await;
    let app = app!(fx);

    let path = format!("/comment/{}/delete", comment.id);
    let req = test::TestRequest::get()
        .uri(&path)
        .insert_header(fx.user())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["comment"]["author"], "alice");

    let req = test::TestRequest::post()
        .uri(&path)
        .insert_header(fx.user())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), format!("/post/{}", post.id));

    assert!(fx.state.comments.find_by_id(comment.id).await.unwrap().is_none());
    assert!(fx.state.replies.find_by_id(reply.id).await.unwrap().is_none());
}

#[actix_web::test]
async fn test_delete_reply_redirects_through_comment() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let post = fx.post(&tech, "A", true, &[], 0).await;
    let comment = fx.comment(&post, "alice").await;
    let reply = fx.reply(&comment).await;
    let app = app!(fx);

    let path = format!("/reply/{}/delete", reply.id);
    let req = test::TestRequest::get()
        .uri(&path)
        .insert_header(fx.user())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["reply"]["author"], "bob");

    let req = test::TestRequest::post()
        .uri(&path)
        .insert_header(fx.user())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), format!("/post/{}", post.id));

    assert!(fx.state.replies.find_by_id(reply.id).await.unwrap().is_none());
    assert!(fx.state.comments.find_by_id(comment.id).await.unwrap().is_some());
}

#[actix_web::test]
async fn test_delete_missing_comment_is_not_found() {
    let fx = Fixture::new();
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/comment/{}/delete", Uuid::new_v4()))
        .insert_header(fx.user())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_login_issues_token_with_roles() {
    let fx = Fixture::new();
    let hash = fx.passwords.hash("s3cret-pass").unwrap();
    fx.state
        .users
        .save(User::new("staff@example.com".into(), hash, true))
        .await
        .unwrap();
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri("/accounts/login/")
        .set_json(json!({"email": "staff@example.com", "password": "s3cret-pass"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["token_type"], "Bearer");

    let claims = fx
        .tokens
        .validate_token(body["access_token"].as_str().unwrap())
        .unwrap();
    assert!(claims.roles.contains(&"admin".to_string()));

    let req = test::TestRequest::post()
        .uri("/accounts/login/")
        .set_form([("email", "staff@example.com"), ("password", "wrong")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_login_form_echoes_next() {
    let fx = Fixture::new();
    let app = app!(fx);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/accounts/login/?next=/comment/x/delete")
            .to_request(),
    )
    .await;
    assert_eq!(body["data"]["next"], "/comment/x/delete");
}

#[actix_web::test]
async fn test_admin_requires_staff_token() {
    let fx = Fixture::new();
    let app = app!(fx);

    let res = test::call_service(
        &app,
        test::TestRequest::get().uri("/admin/posts").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/admin/posts")
        .insert_header(fx.user())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/admin/posts")
        .insert_header(fx.staff())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_admin_taxonomy_crud() {
    let fx = Fixture::new();
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri("/admin/categories")
        .insert_header(fx.staff())
        .set_json(json!({"name": "Tech", "slug": "tech"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/admin/categories")
        .insert_header(fx.staff())
        .set_json(json!({"name": "Tech again", "slug": "tech"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/admin/tags")
        .insert_header(fx.staff())
        .set_json(json!({"name": "Bad", "slug": "not a slug"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::put()
        .uri(&format!("/admin/categories/{id}"))
        .insert_header(fx.staff())
        .set_json(json!({"name": "Technology", "slug": "technology"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["slug"], "technology");

    let req = test::TestRequest::delete()
        .uri(&format!("/admin/categories/{id}"))
        .insert_header(fx.staff())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn test_admin_post_lifecycle() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let python = fx.tag("Python", "python").await;
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri("/admin/posts")
        .insert_header(fx.staff())
        .set_json(json!({
            "title": "Async Rust",
            "content": "tokio runtime",
            "category_id": Uuid::new_v4(),
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::post()
        .uri("/admin/posts")
        .insert_header(fx.staff())
        .set_json(json!({
            "title": "Async Rust",
            "content": "tokio runtime",
            "category_id": tech.id,
            "tag_ids": [python.id],
            "is_published": true,
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["tags"][0]["slug"], "python");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/admin/posts?q=rust%20tokio&category={}", tech.id))
        .insert_header(fx.staff())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["items"][0]["title"], "Async Rust");
    assert_eq!(body["data"]["items"][0]["category"], "Tech");

    let req = test::TestRequest::get()
        .uri("/admin/posts?q=rust%20python")
        .insert_header(fx.staff())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["total_items"], 0);

    // Category still referenced.
    let req = test::TestRequest::delete()
        .uri(&format!("/admin/categories/{}", tech.id))
        .insert_header(fx.staff())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::delete()
        .uri(&format!("/admin/posts/{id}"))
        .insert_header(fx.staff())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/admin/posts/{id}"))
        .insert_header(fx.staff())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_admin_update_post_refreshes_timestamp() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let post = fx.post(&tech, "Old title", false, &[], 3600).await;
    let app = app!(fx);

    let req = test::TestRequest::put()
        .uri(&format!("/admin/posts/{}", post.id))
        .insert_header(fx.staff())
        .set_json(json!({
            "title": "New title",
            "content": "Edited",
            "category_id": tech.id,
            "is_published": true,
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let saved = fx.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(saved.title, "New title");
    assert!(saved.is_published);
    assert!(saved.updated_at > post.updated_at);
    assert_eq!(saved.created_at, post.created_at);
}

#[actix_web::test]
async fn test_admin_moderates_comments() {
    let fx = Fixture::new();
    let tech = fx.category("Tech", "tech").await;
    let post = fx.post(&tech, "A", true, &[], 0).await;
    let comment = fx.comment(&post, "spammer").await;
    let reply = fx.reply(&comment).await;
    let app = app!(fx);

    let req = test::TestRequest::get()
        .uri("/admin/replies")
        .insert_header(fx.staff())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["id"], reply.id.to_string());

    let req = test::TestRequest::delete()
        .uri(&format!("/admin/comments/{}", comment.id))
        .insert_header(fx.staff())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/admin/comments")
        .insert_header(fx.staff())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    assert!(fx.state.replies.find_by_id(reply.id).await.unwrap().is_none());
}
