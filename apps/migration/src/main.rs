//! Migration CLI for the blog schema.
//!
//! Reads `DATABASE_URL` (or `-u`) and runs `up`, `down`, `status`, `fresh`...

use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt().with_env_filter("info").init();
    tracing::info!("Running blog schema migrations");

    cli::run_cli(migration::Migrator).await;
}
