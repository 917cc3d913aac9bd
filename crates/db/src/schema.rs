//! Schema context for the translator.
//!
//! Prefers live introspection of `sqlite_master`; falls back to the static
//! description from configuration when no connection exists or the catalog
//! read fails.

use tracing::warn;

use crate::connection::DbPool;

pub async fn table_info(pool: Option<&DbPool>, fallback: &str) -> String {
    let Some(pool) = pool else {
        return fallback.to_string();
    };

    let statements: Result<Vec<String>, sqlx::Error> = sqlx::query_scalar(
        "SELECT sql FROM sqlite_master
         WHERE type = 'table'
           AND sql IS NOT NULL
           AND name NOT LIKE 'sqlite_%'
           AND name NOT LIKE '_sqlx_%'
         ORDER BY name",
    )
    .fetch_all(pool)
    .await;

    match statements {
        Ok(statements) if !statements.is_empty() => statements.join("\n\n"),
        Ok(_) => fallback.to_string(),
        Err(error) => {
            warn!(event_name = "schema_introspection_failed", %error, "using static description");
            fallback.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::table_info;
    use crate::{connect_with_settings, migrations};

    const FALLBACK: &str = "Tables: contracts, modules, contract_modules.";

    #[tokio::test]
    async fn live_introspection_returns_create_statements() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");

        let info = table_info(Some(&pool), FALLBACK).await;
        assert!(info.contains("CREATE TABLE contracts"));
        assert!(info.contains("contract_modules"));
    }

    #[tokio::test]
    async fn no_pool_falls_back_to_static_description() {
        let info = table_info(None, FALLBACK).await;
        assert_eq!(info, FALLBACK);
    }

    #[tokio::test]
    async fn empty_database_falls_back_to_static_description() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        let info = table_info(Some(&pool), FALLBACK).await;
        assert_eq!(info, FALLBACK);
    }
}
