use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::warn;

use deskbot_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// Connection failure is a degraded mode, not a startup abort: the
/// structured-query subsystem falls back to mock translation and results.
pub async fn try_connect(config: &DatabaseConfig) -> Option<DbPool> {
    match connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await {
        Ok(pool) => Some(pool),
        Err(error) => {
            warn!(
                event_name = "database_unreachable",
                url = %config.url,
                %error,
                "structured queries will run in mock mode",
            );
            None
        }
    }
}
