//! Storage layer: the SQLite move journal.
//!
//! Holds DB pool setup, the migration runner and journal queries.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub mod journal;
pub mod models;

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let options = if database_url.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(database_url)?
    } else {
        let path = std::path::PathBuf::from(database_url);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        SqliteConnectOptions::new().filename(path)
    };
    tracing::debug!(database = %database_url, "opening journal database");
    let mut pool = SqlitePoolOptions::new();
    if database_url.contains("memory") {
        pool = pool.max_connections(1);
    } else {
        pool = pool.max_connections(5);
    }
    Ok(pool
        .connect_with(options.create_if_missing(true))
        .await?)
}

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    // Applies SQLx migrations located in crates/storage/migrations.
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
