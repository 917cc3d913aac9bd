use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use deskbot_agent::SupportAgent;
use deskbot_db::DbPool;

#[derive(Clone)]
pub struct HealthState {
    agent: Arc<SupportAgent>,
    db_pool: Option<DbPool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub index: HealthCheck,
    pub database: HealthCheck,
    pub checked_at: String,
}

pub fn router(agent: Arc<SupportAgent>, db_pool: Option<DbPool>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { agent, db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let index = index_check(&state.agent).await;
    let database = database_check(state.db_pool.as_ref()).await;
    let ready = index.status == "ready" && database.status != "degraded";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "deskbot-server runtime initialized".to_string(),
        },
        index,
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn index_check(agent: &SupportAgent) -> HealthCheck {
    if agent.rag().is_ready().await {
        HealthCheck { status: "ready", detail: "vector index is populated".to_string() }
    } else {
        HealthCheck {
            status: "degraded",
            detail: "vector index is empty, guide retrieval is unavailable".to_string(),
        }
    }
}

async fn database_check(pool: Option<&DbPool>) -> HealthCheck {
    let Some(pool) = pool else {
        return HealthCheck {
            status: "mock",
            detail: "running without a live contract database".to_string(),
        };
    };

    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}
