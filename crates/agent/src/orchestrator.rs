//! The orchestrator: classify, route, answer, remember.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use deskbot_core::config::ChatbotConfig;
use deskbot_core::{ChatMessage, ChatModel};
use deskbot_db::ContractQuerySystem;
use deskbot_rag::RagSystem;

use crate::intent::{Intent, IntentClassifier};
use crate::memory::{ConversationMemory, ConversationTurn};

/// User-facing text for any failure inside the contract branch. Raw errors
/// stay in the logs.
const CONTRACT_ESCALATION_MESSAGE: &str =
    "I apologize, but I encountered an error while looking up your contract information. \
     Please contact our support team for assistance.";

#[derive(Clone, Debug, Serialize)]
pub struct ChatOutcome {
    pub query: String,
    pub intent: Intent,
    pub answer: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SystemStatus {
    pub llm_initialized: bool,
    pub rag_index_ready: bool,
    pub sql_system_initialized: bool,
    pub sql_connection_active: bool,
    pub memory_enabled: bool,
    pub provider: String,
}

pub struct SupportAgent {
    model: Arc<dyn ChatModel>,
    rag: RagSystem,
    sql: ContractQuerySystem,
    classifier: IntentClassifier,
    memory: Option<Mutex<ConversationMemory>>,
    system_prompt: String,
    retrieval_k: usize,
    provider_label: String,
}

impl SupportAgent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        rag: RagSystem,
        sql: ContractQuerySystem,
        classifier: IntentClassifier,
        chatbot: &ChatbotConfig,
        provider_label: impl Into<String>,
    ) -> Self {
        let memory = chatbot
            .enable_memory
            .then(|| Mutex::new(ConversationMemory::new(chatbot.memory_window)));

        Self {
            model,
            rag,
            sql,
            classifier,
            memory,
            system_prompt: chatbot.system_prompt.clone(),
            retrieval_k: chatbot.retrieval_k,
            provider_label: provider_label.into(),
        }
    }

    pub fn rag(&self) -> &RagSystem {
        &self.rag
    }

    /// Process one query end to end: classify, dispatch to the matching
    /// branch, record the exchange.
    pub async fn process(&self, query: &str, use_model_classification: bool) -> Result<ChatOutcome> {
        let intent = if use_model_classification {
            self.classifier.classify_with_model(query, self.model.as_ref()).await
        } else {
            self.classifier.classify(query)
        };

        let answer = match intent {
            Intent::UserGuide => self.handle_user_guide(query).await?,
            Intent::ContractInfo => self.handle_contract(query).await,
            Intent::General => self.handle_general(query).await?,
        };

        if let Some(memory) = &self.memory {
            memory.lock().await.record(query, &answer);
        }

        info!(event_name = "query_processed", intent = intent.label());
        Ok(ChatOutcome { query: query.to_string(), intent, answer })
    }

    /// Ground the answer in retrieved guide chunks. Retrieval or model
    /// failures propagate; there is no useful degraded answer here.
    async fn handle_user_guide(&self, query: &str) -> Result<String> {
        let context = self.rag.context_for_query(query, self.retrieval_k).await?;

        let prompt = format!(
            "{system_prompt}\n\n\
             Context from user guides:\n{context}\n\n\
             User question: {query}\n\n\
             Please provide a helpful answer based on the context above. If the context does \
             not contain the information needed, let the customer know and offer to escalate \
             to a human agent.",
            system_prompt = self.system_prompt,
        );

        let messages =
            [ChatMessage::system(self.system_prompt.clone()), ChatMessage::user(prompt)];
        self.model.complete(&messages).await
    }

    /// Look the answer up in the contract database. Every failure in this
    /// branch, policy refusals included, becomes the escalation message.
    async fn handle_contract(&self, query: &str) -> String {
        match self.contract_answer(query).await {
            Ok(answer) => answer,
            Err(error) => {
                warn!(event_name = "contract_branch_failed", %error, "returning escalation message");
                CONTRACT_ESCALATION_MESSAGE.to_string()
            }
        }
    }

    async fn contract_answer(&self, query: &str) -> Result<String> {
        let record = self.sql.query_and_format(query, self.model.as_ref()).await?;

        let prompt = format!(
            "{system_prompt}\n\n\
             User question: {query}\n\n\
             Database query results:\n{results}\n\n\
             SQL query used: {sql}\n\n\
             Please provide a helpful, natural language answer based on the query results \
             above. If no results were found, let the customer know politely and offer \
             alternatives.",
            system_prompt = self.system_prompt,
            results = record.formatted,
            sql = record.sql,
        );

        let messages =
            [ChatMessage::system(self.system_prompt.clone()), ChatMessage::user(prompt)];
        self.model.complete(&messages).await
    }

    async fn handle_general(&self, query: &str) -> Result<String> {
        let messages =
            [ChatMessage::system(self.system_prompt.clone()), ChatMessage::user(query)];
        self.model.complete(&messages).await
    }

    pub async fn history(&self) -> Vec<ConversationTurn> {
        match &self.memory {
            Some(memory) => memory.lock().await.history(),
            None => Vec::new(),
        }
    }

    pub async fn clear_history(&self) {
        if let Some(memory) = &self.memory {
            memory.lock().await.clear();
        }
    }

    pub async fn status(&self) -> SystemStatus {
        SystemStatus {
            llm_initialized: true,
            rag_index_ready: self.rag.is_ready().await,
            sql_system_initialized: true,
            sql_connection_active: self.sql.connection_active().await,
            memory_enabled: self.memory.is_some(),
            provider: self.provider_label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    use deskbot_core::config::{
        ChatbotConfig, DocumentsConfig, IntentConfig, StoreKind, VectorStoreConfig,
    };
    use deskbot_core::{ChatMessage, ChatModel, Role};
    use deskbot_db::ContractQuerySystem;
    use deskbot_rag::{FlatStore, HashEmbedder, RagSystem};

    use super::{SupportAgent, CONTRACT_ESCALATION_MESSAGE};
    use crate::intent::{Intent, IntentClassifier};

    /// Returns a fixed reply and captures every prompt it sees.
    struct ScriptedModel {
        reply: Result<String, String>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), seen: Mutex::new(Vec::new()) }
        }

        fn failing(message: &str) -> Self {
            Self { reply: Err(message.to_string()), seen: Mutex::new(Vec::new()) }
        }

        async fn last_prompt(&self) -> String {
            let seen = self.seen.lock().await;
            seen.last()
                .and_then(|messages| messages.last())
                .map(|message| message.content.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.seen.lock().await.push(messages.to_vec());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(anyhow::anyhow!(message.clone())),
            }
        }
    }

    fn intent_config() -> IntentConfig {
        IntentConfig {
            user_guide_keywords: ["how", "guide", "export", "report", "setup"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            contract_keywords: ["contract", "expire", "expiration", "pricing", "module"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }

    fn chatbot_config(enable_memory: bool) -> ChatbotConfig {
        ChatbotConfig {
            system_prompt: "You are a helpful support assistant.".to_string(),
            enable_memory,
            memory_window: 10,
            retrieval_k: 3,
        }
    }

    async fn rag_with_corpus(corpus: &TempDir, index: &TempDir, build: bool) -> RagSystem {
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
        let system = RagSystem::new(
            Box::new(HashEmbedder::new(128)),
            Box::new(FlatStore::new(index.path().join("index.json"))),
            &documents,
            &vector_store,
        );
        if build {
            fs::write(
                corpus.path().join("export.txt"),
                "To export a report, open the Reports page and press the Export button.",
            )
            .unwrap();
            system.initialize_or_load().await.unwrap();
        }
        system
    }

    fn agent(model: Arc<ScriptedModel>, rag: RagSystem, enable_memory: bool) -> SupportAgent {
        SupportAgent::new(
            model,
            rag,
            ContractQuerySystem::mock("Tables: contracts, modules.".to_string()),
            IntentClassifier::new(&intent_config()),
            &chatbot_config(enable_memory),
            "openai",
        )
    }

    #[tokio::test]
    async fn user_guide_query_is_grounded_in_retrieved_context() {
        let corpus = TempDir::new().unwrap();
        let index = TempDir::new().unwrap();
        let rag = rag_with_corpus(&corpus, &index, true).await;
        let model = Arc::new(ScriptedModel::replying("Press the Export button."));

        let agent = agent(model.clone(), rag, true);
        let outcome = agent.process("How do I export a report?", false).await.unwrap();

        assert_eq!(outcome.intent, Intent::UserGuide);
        assert_eq!(outcome.answer, "Press the Export button.");
        let prompt = model.last_prompt().await;
        assert!(prompt.contains("[Source 1: export.txt]"));
        assert!(prompt.contains("User question: How do I export a report?"));
    }

    #[tokio::test]
    async fn contract_query_carries_sql_and_rows_into_the_prompt() {
        let corpus = TempDir::new().unwrap();
        let index = TempDir::new().unwrap();
        let rag = rag_with_corpus(&corpus, &index, false).await;
        let model = Arc::new(ScriptedModel::replying("Your contract expires 2024-12-31."));

        let agent = agent(model.clone(), rag, true);
        let outcome =
            agent.process("When does my contract expire?", false).await.unwrap();

        assert_eq!(outcome.intent, Intent::ContractInfo);
        assert_eq!(outcome.answer, "Your contract expires 2024-12-31.");
        let prompt = model.last_prompt().await;
        assert!(prompt.contains("Database query results:"));
        assert!(prompt.contains("2024-12-31"));
        assert!(prompt.contains("SQL query used: SELECT"));
    }

    #[tokio::test]
    async fn contract_branch_failure_becomes_an_escalation_message() {
        let corpus = TempDir::new().unwrap();
        let index = TempDir::new().unwrap();
        let rag = rag_with_corpus(&corpus, &index, false).await;
        let model = Arc::new(ScriptedModel::failing("model offline"));

        let agent = agent(model, rag, true);
        let outcome =
            agent.process("When does my contract expire?", false).await.unwrap();

        assert_eq!(outcome.intent, Intent::ContractInfo);
        assert_eq!(outcome.answer, CONTRACT_ESCALATION_MESSAGE);
    }

    #[tokio::test]
    async fn general_query_goes_straight_to_the_model() {
        let corpus = TempDir::new().unwrap();
        let index = TempDir::new().unwrap();
        let rag = rag_with_corpus(&corpus, &index, false).await;
        let model = Arc::new(ScriptedModel::replying("Hello! How can I help?"));

        let agent = agent(model.clone(), rag, true);
        let outcome = agent.process("Good morning!", false).await.unwrap();

        assert_eq!(outcome.intent, Intent::General);
        assert_eq!(model.last_prompt().await, "Good morning!");
    }

    #[tokio::test]
    async fn memory_records_exchanges_and_clears() {
        let corpus = TempDir::new().unwrap();
        let index = TempDir::new().unwrap();
        let rag = rag_with_corpus(&corpus, &index, false).await;
        let model = Arc::new(ScriptedModel::replying("Hi!"));

        let agent = agent(model, rag, true);
        agent.process("Hello", false).await.unwrap();

        let history = agent.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "Hello");
        assert_eq!(history[1].role, Role::Assistant);

        agent.clear_history().await;
        assert!(agent.history().await.is_empty());
    }

    #[tokio::test]
    async fn disabled_memory_keeps_no_history() {
        let corpus = TempDir::new().unwrap();
        let index = TempDir::new().unwrap();
        let rag = rag_with_corpus(&corpus, &index, false).await;
        let model = Arc::new(ScriptedModel::replying("Hi!"));

        let agent = agent(model, rag, false);
        agent.process("Hello", false).await.unwrap();
        assert!(agent.history().await.is_empty());

        let status = agent.status().await;
        assert!(!status.memory_enabled);
    }

    #[tokio::test]
    async fn status_reflects_component_readiness() {
        let corpus = TempDir::new().unwrap();
        let index = TempDir::new().unwrap();
        let rag = rag_with_corpus(&corpus, &index, true).await;
        let model = Arc::new(ScriptedModel::replying("ok"));

        let agent = agent(model, rag, true);
        let status = agent.status().await;

        assert!(status.llm_initialized);
        assert!(status.rag_index_ready);
        assert!(status.sql_system_initialized);
        assert!(!status.sql_connection_active);
        assert!(status.memory_enabled);
        assert_eq!(status.provider, "openai");
    }
}
