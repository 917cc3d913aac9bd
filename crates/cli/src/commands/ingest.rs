use crate::commands::CommandResult;
use deskbot_core::config::{AppConfig, LoadOptions, StoreKind};
use deskbot_db::connect_with_settings;
use deskbot_rag::{build_embedder, FlatStore, IndexAction, RagSystem, SqliteStore, VectorStore};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ingest",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ingest",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let embedder = build_embedder(&config.embedding)
            .map_err(|error| ("vector_store", error.to_string(), 6u8))?;

        let store: Box<dyn VectorStore> = match config.vector_store.kind {
            StoreKind::Flat => Box::new(FlatStore::new(config.vector_store.persist_path.clone())),
            StoreKind::Sqlite => {
                let pool = connect_with_settings(
                    &config.database.url,
                    config.database.max_connections,
                    config.database.timeout_secs,
                )
                .await
                .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
                Box::new(
                    SqliteStore::new(pool)
                        .await
                        .map_err(|error| ("vector_store", error.to_string(), 6u8))?,
                )
            }
        };

        let rag = RagSystem::new(embedder, store, &config.documents, &config.vector_store);
        rag.rebuild().await.map_err(|error| ("index_build", error.to_string(), 5u8))
    });

    match result {
        Ok(IndexAction::Built { documents, chunks }) => CommandResult::success(
            "ingest",
            format!("indexed {documents} documents into {chunks} chunks"),
        ),
        // rebuild never attaches, but keep the arm total
        Ok(IndexAction::Attached { chunks }) => {
            CommandResult::success("ingest", format!("attached existing index with {chunks} chunks"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("ingest", error_class, message, exit_code)
        }
    }
}
