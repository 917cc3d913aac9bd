use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use deskbot_agent::{IntentClassifier, OpenAiCompatibleClient, SupportAgent};
use deskbot_core::config::{AppConfig, ConfigError, LoadOptions, StoreKind};
use deskbot_core::PipelineError;
use deskbot_db::{migrations, try_connect, ContractQuerySystem, DbPool};
use deskbot_rag::{build_embedder, FlatStore, IndexAction, RagSystem, SqliteStore, VectorStore};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: Option<DbPool>,
    pub agent: Arc<SupportAgent>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("chat client initialization failed: {0}")]
    ChatClient(#[source] anyhow::Error),
    #[error("vector store initialization failed: {0}")]
    VectorStore(#[source] PipelineError),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Assemble the full pipeline: chat client, contract database (live or
/// mock), vector index, and the routing agent on top of them. An
/// unreachable database or an empty corpus degrades the matching branch
/// instead of aborting startup.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "bootstrap_start", "starting application bootstrap");

    let model = OpenAiCompatibleClient::from_config(&config.llm)
        .map_err(BootstrapError::ChatClient)?;
    let provider_label = config.llm.provider.label();

    let db_pool = try_connect(&config.database).await;
    let sql = match &db_pool {
        Some(pool) => {
            migrations::run_pending(pool).await.map_err(BootstrapError::Migration)?;
            info!(event_name = "migrations_applied", "database migrations applied");
            ContractQuerySystem::from_pool(pool.clone(), config.database.schema_description.clone())
        }
        None => ContractQuerySystem::mock(config.database.schema_description.clone()),
    };

    let embedder = build_embedder(&config.embedding).map_err(BootstrapError::VectorStore)?;
    let store: Box<dyn VectorStore> = match (config.vector_store.kind, &db_pool) {
        (StoreKind::Flat, _) => {
            Box::new(FlatStore::new(config.vector_store.persist_path.clone()))
        }
        (StoreKind::Sqlite, Some(pool)) => Box::new(
            SqliteStore::new(pool.clone()).await.map_err(BootstrapError::VectorStore)?,
        ),
        (StoreKind::Sqlite, None) => {
            warn!(
                event_name = "vector_store_fallback",
                "sqlite vector store needs a live database, using the flat store",
            );
            Box::new(FlatStore::new(config.vector_store.persist_path.clone()))
        }
    };

    let rag = RagSystem::new(embedder, store, &config.documents, &config.vector_store);
    match rag.initialize_or_load().await {
        Ok(IndexAction::Attached { chunks }) => {
            info!(event_name = "index_attached", chunks, "reusing persisted vector index");
        }
        Ok(IndexAction::Built { documents, chunks }) => {
            info!(event_name = "index_built", documents, chunks, "vector index built from corpus");
        }
        Err(error) => {
            warn!(
                event_name = "index_unavailable",
                %error,
                "guide retrieval is degraded until documents are ingested",
            );
        }
    }

    let agent = SupportAgent::new(
        Arc::new(model),
        rag,
        sql,
        IntentClassifier::new(&config.intent),
        &config.chatbot,
        provider_label,
    );

    info!(event_name = "bootstrap_complete", provider = provider_label);
    Ok(Application { config, db_pool, agent: Arc::new(agent) })
}
