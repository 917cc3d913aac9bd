use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::error;

use deskbot_agent::{ChatOutcome, ConversationTurn, SupportAgent, SystemStatus};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub use_model_classification: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub components: SystemStatus,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Internal failures surface as a 500 with a short detail string; the
/// full error chain stays in the logs.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(event_name = "request_failed", error = %self.0);
        let body = ErrorBody { detail: self.0.to_string() };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

pub fn router(agent: Arc<SupportAgent>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/history", get(history))
        .route("/api/clear", post(clear))
        .route("/api/status", get(status))
        .with_state(agent)
}

pub async fn chat(
    State(agent): State<Arc<SupportAgent>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatOutcome>, ApiError> {
    let outcome = agent.process(&request.message, request.use_model_classification).await?;
    Ok(Json(outcome))
}

pub async fn history(State(agent): State<Arc<SupportAgent>>) -> Json<Vec<ConversationTurn>> {
    Json(agent.history().await)
}

pub async fn clear(State(agent): State<Arc<SupportAgent>>) -> Json<ClearResponse> {
    agent.clear_history().await;
    Json(ClearResponse { status: "success", message: "Conversation history cleared" })
}

pub async fn status(State(agent): State<Arc<SupportAgent>>) -> Json<StatusResponse> {
    Json(StatusResponse { status: "operational", components: agent.status().await })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use axum::extract::State;
    use axum::Json;
    use tempfile::TempDir;

    use deskbot_agent::{Intent, IntentClassifier, SupportAgent};
    use deskbot_core::config::{
        ChatbotConfig, DocumentsConfig, IntentConfig, StoreKind, VectorStoreConfig,
    };
    use deskbot_core::{ChatMessage, ChatModel, Role};
    use deskbot_db::ContractQuerySystem;
    use deskbot_rag::{FlatStore, HashEmbedder, RagSystem};

    use super::{chat, clear, history, status, ChatRequest};

    struct ScriptedModel {
        reply: Result<String, String>,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(anyhow::anyhow!(message.clone())),
            }
        }
    }

    async fn agent(corpus: &TempDir, index: &TempDir, reply: Result<String, String>) -> Arc<SupportAgent> {
        fs::write(
            corpus.path().join("export.txt"),
            "To export a report, open the Reports page and press Export.",
        )
        .expect("write corpus file");

        let documents = DocumentsConfig {
            corpus_dir: corpus.path().to_path_buf(),
            allowed_extensions: vec![".txt".to_string()],
        };
        let vector_store = VectorStoreConfig {
            kind: StoreKind::Flat,
            persist_path: index.path().join("index.json"),
            chunk_size: 300,
            chunk_overlap: 50,
        };
        let rag = RagSystem::new(
            Box::new(HashEmbedder::new(128)),
            Box::new(FlatStore::new(index.path().join("index.json"))),
            &documents,
            &vector_store,
        );
        rag.initialize_or_load().await.expect("index build");

        Arc::new(SupportAgent::new(
            Arc::new(ScriptedModel { reply }),
            rag,
            ContractQuerySystem::mock("Tables: contracts, modules.".to_string()),
            IntentClassifier::new(&IntentConfig {
                user_guide_keywords: vec!["how".to_string(), "export".to_string()],
                contract_keywords: vec!["contract".to_string(), "expire".to_string()],
            }),
            &ChatbotConfig {
                system_prompt: "You are a helpful support assistant.".to_string(),
                enable_memory: true,
                memory_window: 10,
                retrieval_k: 3,
            },
            "openai",
        ))
    }

    #[tokio::test]
    async fn chat_returns_the_routed_outcome() {
        let corpus = TempDir::new().expect("tempdir");
        let index = TempDir::new().expect("tempdir");
        let agent = agent(&corpus, &index, Ok("Press the Export button.".to_string())).await;

        let request = ChatRequest {
            message: "How do I export a report?".to_string(),
            use_model_classification: false,
        };
        let Json(outcome) =
            chat(State(agent), Json(request)).await.expect("chat should succeed");

        assert_eq!(outcome.intent, Intent::UserGuide);
        assert_eq!(outcome.answer, "Press the Export button.");
        assert_eq!(outcome.query, "How do I export a report?");
    }

    #[tokio::test]
    async fn model_failure_on_a_guide_query_maps_to_an_error() {
        let corpus = TempDir::new().expect("tempdir");
        let index = TempDir::new().expect("tempdir");
        let agent = agent(&corpus, &index, Err("model offline".to_string())).await;

        let request = ChatRequest {
            message: "How do I export a report?".to_string(),
            use_model_classification: false,
        };
        assert!(chat(State(agent), Json(request)).await.is_err());
    }

    #[tokio::test]
    async fn history_reflects_exchanges_and_clear_empties_it() {
        let corpus = TempDir::new().expect("tempdir");
        let index = TempDir::new().expect("tempdir");
        let agent = agent(&corpus, &index, Ok("Hello!".to_string())).await;

        let request =
            ChatRequest { message: "Good morning".to_string(), use_model_classification: false };
        chat(State(agent.clone()), Json(request)).await.expect("chat should succeed");

        let Json(turns) = history(State(agent.clone())).await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "Good morning");

        let Json(cleared) = clear(State(agent.clone())).await;
        assert_eq!(cleared.status, "success");

        let Json(turns) = history(State(agent)).await;
        assert!(turns.is_empty());
    }

    #[tokio::test]
    async fn status_reports_operational_components() {
        let corpus = TempDir::new().expect("tempdir");
        let index = TempDir::new().expect("tempdir");
        let agent = agent(&corpus, &index, Ok("ok".to_string())).await;

        let Json(response) = status(State(agent)).await;
        assert_eq!(response.status, "operational");
        assert!(response.components.rag_index_ready);
        assert!(!response.components.sql_connection_active);
        assert_eq!(response.components.provider, "openai");
    }
}
