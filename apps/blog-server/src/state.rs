//! Application state - shared across all handlers.

use std::sync::Arc;

use blog_core::domain::User;
use blog_core::ports::{
    CategoryRepository, CommentRepository, PasswordService, PostRepository, ReplyRepository,
    TagRepository, UserRepository,
};
use blog_infra::InMemoryStore;

#[cfg(feature = "postgres")]
use blog_infra::database::{
    DatabaseConnections, PostgresCategoryRepository, PostgresCommentRepository,
    PostgresPostRepository, PostgresReplyRepository, PostgresTagRepository,
    PostgresUserRepository,
};

use crate::config::{AdminAccount, AppConfig};
use crate::middleware::error::{AppError, AppResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub replies: Arc<dyn ReplyRepository>,
    pub login_url: String,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        #[cfg(feature = "postgres")]
        let state = match &config.database {
            Some(db_config) => match DatabaseConnections::init(db_config).await {
                Ok(connections) => Self::postgres(&connections, &config.login_url),
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory fallback.",
                        e
                    );
                    Self::in_memory(&InMemoryStore::new(), &config.login_url)
                }
            },
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                Self::in_memory(&InMemoryStore::new(), &config.login_url)
            }
        };

        #[cfg(not(feature = "postgres"))]
        let state = {
            tracing::info!("Running without postgres feature - using in-memory store");
            Self::in_memory(&InMemoryStore::new(), &config.login_url)
        };

        tracing::info!("Application state initialized");
        state
    }

    /// State backed by a shared in-memory store.
    pub fn in_memory(store: &InMemoryStore, login_url: &str) -> Self {
        Self {
            users: Arc::new(store.users()),
            categories: Arc::new(store.categories()),
            tags: Arc::new(store.tags()),
            posts: Arc::new(store.posts()),
            comments: Arc::new(store.comments()),
            replies: Arc::new(store.replies()),
            login_url: login_url.to_string(),
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(connections: &DatabaseConnections, login_url: &str) -> Self {
        let db = &connections.main;
        Self {
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            categories: Arc::new(PostgresCategoryRepository::new(db.clone())),
            tags: Arc::new(PostgresTagRepository::new(db.clone())),
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            comments: Arc::new(PostgresCommentRepository::new(db.clone())),
            replies: Arc::new(PostgresReplyRepository::new(db.clone())),
            login_url: login_url.to_string(),
        }
    }
}

/// Create the configured staff account unless a user with that email exists.
/// Returns whether an account was created.
pub async fn bootstrap_admin(
    state: &AppState,
    password_service: &dyn PasswordService,
    admin: &AdminAccount,
) -> AppResult<bool> {
    if state.users.find_by_email(&admin.email).await?.is_some() {
        tracing::debug!("Admin account already present");
        return Ok(false);
    }

    let password_hash = password_service
        .hash(&admin.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let user = state
        .users
        .save(User::new(admin.email.clone(), password_hash, true))
        .await?;
    tracing::info!(user_id = %user.id, "Created admin account");
    Ok(true)
}
