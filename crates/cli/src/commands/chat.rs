use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::commands::CommandResult;
use deskbot_agent::{IntentClassifier, OpenAiCompatibleClient, SupportAgent};
use deskbot_core::config::{AppConfig, LoadOptions, StoreKind};
use deskbot_db::{migrations, try_connect, ContractQuerySystem};
use deskbot_rag::{build_embedder, FlatStore, RagSystem, SqliteStore, VectorStore};

pub fn run(model_classification: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
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
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let agent = assemble_agent(config).await?;
        chat_loop(&agent, model_classification).await;
        Ok::<(), (&'static str, String, u8)>(())
    });

    match result {
        Ok(()) => CommandResult::success("chat", "chat session ended"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("chat", error_class, message, exit_code)
        }
    }
}

async fn assemble_agent(config: AppConfig) -> Result<SupportAgent, (&'static str, String, u8)> {
    let model = OpenAiCompatibleClient::from_config(&config.llm)
        .map_err(|error| ("chat_client", error.to_string(), 4u8))?;
    let provider_label = config.llm.provider.label();

    let db_pool = try_connect(&config.database).await;
    let sql = match &db_pool {
        Some(pool) => {
            migrations::run_pending(pool)
                .await
                .map_err(|error| ("migration", error.to_string(), 5u8))?;
            ContractQuerySystem::from_pool(pool.clone(), config.database.schema_description.clone())
        }
        None => ContractQuerySystem::mock(config.database.schema_description.clone()),
    };

    let embedder = build_embedder(&config.embedding)
        .map_err(|error| ("vector_store", error.to_string(), 6u8))?;
    let store: Box<dyn VectorStore> = match (config.vector_store.kind, &db_pool) {
        (StoreKind::Sqlite, Some(pool)) => Box::new(
            SqliteStore::new(pool.clone())
                .await
                .map_err(|error| ("vector_store", error.to_string(), 6u8))?,
        ),
        _ => Box::new(FlatStore::new(config.vector_store.persist_path.clone())),
    };

    let rag = RagSystem::new(embedder, store, &config.documents, &config.vector_store);
    if let Err(error) = rag.initialize_or_load().await {
        println!("Note: guide retrieval is unavailable ({error}). Run `deskbot ingest` first.");
    }

    Ok(SupportAgent::new(
        Arc::new(model),
        rag,
        sql,
        IntentClassifier::new(&config.intent),
        &config.chatbot,
        provider_label,
    ))
}

async fn chat_loop(agent: &SupportAgent, model_classification: bool) {
    println!("Interactive support chat");
    println!("Type 'exit' or 'quit' to end the conversation");
    println!("Type 'history' to see conversation history");
    println!("Type 'clear' to clear conversation history");
    println!("Type 'status' to see system status");
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("You: ");
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "exit" | "quit" | "bye" => {
                println!("Thank you for using the support chatbot. Goodbye!");
                break;
            }
            "history" => {
                let history = agent.history().await;
                if history.is_empty() {
                    println!("No conversation history yet.\n");
                } else {
                    println!("\nConversation History:");
                    for turn in history {
                        println!("{}: {}", turn.role.as_str(), turn.content);
                    }
                    println!();
                }
            }
            "clear" => {
                agent.clear_history().await;
                println!("Conversation history cleared.\n");
            }
            "status" => {
                let status = agent.status().await;
                println!("\nSystem Status:");
                println!("  llm_initialized: {}", status.llm_initialized);
                println!("  rag_index_ready: {}", status.rag_index_ready);
                println!("  sql_system_initialized: {}", status.sql_system_initialized);
                println!("  sql_connection_active: {}", status.sql_connection_active);
                println!("  memory_enabled: {}", status.memory_enabled);
                println!("  provider: {}\n", status.provider);
            }
            _ => match agent.process(input, model_classification).await {
                Ok(outcome) => {
                    println!("\nAssistant: {}", outcome.answer);
                    println!("(Intent: {})\n", outcome.intent.label());
                }
                Err(error) => {
                    println!("\nError: {error}\n");
                }
            },
        }
    }
}
