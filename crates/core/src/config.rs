use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub documents: DocumentsConfig,
    pub intent: IntentConfig,
    pub chatbot: ChatbotConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
    /// Static schema description handed to the translator when live
    /// introspection is unavailable.
    pub schema_description: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    pub kind: EmbeddingKind,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub dimensions: usize,
}

#[derive(Clone, Debug)]
pub struct VectorStoreConfig {
    pub kind: StoreKind,
    pub persist_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Clone, Debug)]
pub struct DocumentsConfig {
    pub corpus_dir: PathBuf,
    pub allowed_extensions: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct IntentConfig {
    pub user_guide_keywords: Vec<String>,
    pub contract_keywords: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ChatbotConfig {
    pub system_prompt: String,
    pub enable_memory: bool,
    /// Retained conversation exchanges (a user/assistant pair counts as one).
    pub memory_window: usize,
    pub retrieval_k: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    pub fn label(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingKind {
    Http,
    Hash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Flat,
    Sqlite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub corpus_dir: Option<PathBuf>,
    pub persist_path: Option<PathBuf>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub embedding_kind: Option<EmbeddingKind>,
    pub store_kind: Option<StoreKind>,
    pub enable_memory: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://data/contracts.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
                schema_description: DEFAULT_SCHEMA_DESCRIPTION.to_string(),
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                temperature: 0.7,
                max_tokens: 2000,
                timeout_secs: 60,
            },
            embedding: EmbeddingConfig {
                kind: EmbeddingKind::Hash,
                base_url: None,
                api_key: None,
                model: "nomic-embed-text".to_string(),
                dimensions: 384,
            },
            vector_store: VectorStoreConfig {
                kind: StoreKind::Flat,
                persist_path: PathBuf::from("data/vector_index"),
                chunk_size: 1000,
                chunk_overlap: 200,
            },
            documents: DocumentsConfig {
                corpus_dir: PathBuf::from("data/user_guides"),
                allowed_extensions: vec![".txt".to_string(), ".md".to_string()],
            },
            intent: IntentConfig {
                user_guide_keywords: default_user_guide_keywords(),
                contract_keywords: default_contract_keywords(),
            },
            chatbot: ChatbotConfig {
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
                enable_memory: true,
                memory_window: 10,
                retrieval_k: 3,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful customer service assistant for a \
business software platform. Answer clearly and concisely. When you do not know the answer, \
say so and offer to connect the customer with a human agent.";

const DEFAULT_SCHEMA_DESCRIPTION: &str = "Tables: contracts(contract_id, customer_name, \
expiration_date, pricing, status); modules(module_id, module_name, description); \
contract_modules(contract_id, module_id, purchased_date) joining contracts to modules.";

fn default_user_guide_keywords() -> Vec<String> {
    [
        "how", "guide", "tutorial", "instructions", "feature", "configure", "setup", "export",
        "report", "navigate", "dashboard", "install",
    ]
    .iter()
    .map(|keyword| keyword.to_string())
    .collect()
}

fn default_contract_keywords() -> Vec<String> {
    [
        "contract", "expire", "expiration", "renewal", "pricing", "cost", "invoice", "module",
        "purchased", "license", "subscription",
    ]
    .iter()
    .map(|keyword| keyword.to_string())
    .collect()
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for EmbeddingKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "hash" => Ok(Self::Hash),
            other => Err(ConfigError::Validation(format!(
                "unsupported embedding kind `{other}` (expected http|hash)"
            ))),
        }
    }
}

impl std::str::FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Validation(format!(
                "unsupported vector store kind `{other}` (expected flat|sqlite)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("deskbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
            if let Some(schema_description) = database.schema_description {
                self.database.schema_description = schema_description;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(embedding) = patch.embedding {
            if let Some(kind) = embedding.kind {
                self.embedding.kind = kind;
            }
            if let Some(base_url) = embedding.base_url {
                self.embedding.base_url = Some(base_url);
            }
            if let Some(api_key) = embedding.api_key {
                self.embedding.api_key = Some(secret_value(api_key));
            }
            if let Some(model) = embedding.model {
                self.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                self.embedding.dimensions = dimensions;
            }
        }

        if let Some(vector_store) = patch.vector_store {
            if let Some(kind) = vector_store.kind {
                self.vector_store.kind = kind;
            }
            if let Some(persist_path) = vector_store.persist_path {
                self.vector_store.persist_path = persist_path;
            }
            if let Some(chunk_size) = vector_store.chunk_size {
                self.vector_store.chunk_size = chunk_size;
            }
            if let Some(chunk_overlap) = vector_store.chunk_overlap {
                self.vector_store.chunk_overlap = chunk_overlap;
            }
        }

        if let Some(documents) = patch.documents {
            if let Some(corpus_dir) = documents.corpus_dir {
                self.documents.corpus_dir = corpus_dir;
            }
            if let Some(allowed_extensions) = documents.allowed_extensions {
                self.documents.allowed_extensions = allowed_extensions;
            }
        }

        if let Some(intent) = patch.intent {
            if let Some(user_guide_keywords) = intent.user_guide_keywords {
                self.intent.user_guide_keywords = user_guide_keywords;
            }
            if let Some(contract_keywords) = intent.contract_keywords {
                self.intent.contract_keywords = contract_keywords;
            }
        }

        if let Some(chatbot) = patch.chatbot {
            if let Some(system_prompt) = chatbot.system_prompt {
                self.chatbot.system_prompt = system_prompt;
            }
            if let Some(enable_memory) = chatbot.enable_memory {
                self.chatbot.enable_memory = enable_memory;
            }
            if let Some(memory_window) = chatbot.memory_window {
                self.chatbot.memory_window = memory_window;
            }
            if let Some(retrieval_k) = chatbot.retrieval_k {
                self.chatbot.retrieval_k = retrieval_k;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DESKBOT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("DESKBOT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("DESKBOT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("DESKBOT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("DESKBOT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("DESKBOT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("DESKBOT_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("DESKBOT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("DESKBOT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("DESKBOT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("DESKBOT_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("DESKBOT_EMBEDDING_KIND") {
            self.embedding.kind = value.parse()?;
        }
        if let Some(value) = read_env("DESKBOT_EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(value);
        }
        if let Some(value) = read_env("DESKBOT_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("DESKBOT_EMBEDDING_MODEL") {
            self.embedding.model = value;
        }

        if let Some(value) = read_env("DESKBOT_VECTOR_STORE_KIND") {
            self.vector_store.kind = value.parse()?;
        }
        if let Some(value) = read_env("DESKBOT_VECTOR_STORE_PERSIST_PATH") {
            self.vector_store.persist_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("DESKBOT_DOCUMENTS_CORPUS_DIR") {
            self.documents.corpus_dir = PathBuf::from(value);
        }

        if let Some(value) = read_env("DESKBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("DESKBOT_SERVER_PORT") {
            self.server.port = parse_u16("DESKBOT_SERVER_PORT", &value)?;
        }

        let log_level = read_env("DESKBOT_LOGGING_LEVEL").or_else(|| read_env("DESKBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DESKBOT_LOGGING_FORMAT").or_else(|| read_env("DESKBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(corpus_dir) = overrides.corpus_dir {
            self.documents.corpus_dir = corpus_dir;
        }
        if let Some(persist_path) = overrides.persist_path {
            self.vector_store.persist_path = persist_path;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(embedding_kind) = overrides.embedding_kind {
            self.embedding.kind = embedding_kind;
        }
        if let Some(store_kind) = overrides.store_kind {
            self.vector_store.kind = store_kind;
        }
        if let Some(enable_memory) = overrides.enable_memory {
            self.chatbot.enable_memory = enable_memory;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_embedding(&self.embedding)?;
        validate_vector_store(&self.vector_store)?;
        validate_documents(&self.documents)?;
        validate_chatbot(&self.chatbot)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("deskbot.toml"), PathBuf::from("config/deskbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Substitute `${VAR}` and `${VAR:default}` expressions with environment
/// values before TOML parsing.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut expression = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => expression.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let (key, default) = match expression.split_once(':') {
                Some((key, default)) => (key.to_string(), Some(default.to_string())),
                None => (expression, None),
            };

            let value = match env::var(&key) {
                Ok(value) => value,
                Err(_) => default
                    .ok_or(ConfigError::MissingEnvInterpolation { var: key.clone() })?,
            };
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_embedding(embedding: &EmbeddingConfig) -> Result<(), ConfigError> {
    if embedding.dimensions == 0 {
        return Err(ConfigError::Validation(
            "embedding.dimensions must be greater than zero".to_string(),
        ));
    }

    if embedding.kind == EmbeddingKind::Http {
        let missing =
            embedding.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "embedding.base_url is required when embedding.kind is `http`".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_vector_store(vector_store: &VectorStoreConfig) -> Result<(), ConfigError> {
    if vector_store.chunk_size == 0 {
        return Err(ConfigError::Validation(
            "vector_store.chunk_size must be greater than zero".to_string(),
        ));
    }

    if vector_store.chunk_overlap >= vector_store.chunk_size {
        return Err(ConfigError::Validation(
            "vector_store.chunk_overlap must be smaller than vector_store.chunk_size".to_string(),
        ));
    }

    Ok(())
}

fn validate_documents(documents: &DocumentsConfig) -> Result<(), ConfigError> {
    if documents.allowed_extensions.is_empty() {
        return Err(ConfigError::Validation(
            "documents.allowed_extensions must list at least one extension".to_string(),
        ));
    }

    for extension in &documents.allowed_extensions {
        if !extension.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "documents.allowed_extensions entries must start with a dot, got `{extension}`"
            )));
        }
    }

    Ok(())
}

fn validate_chatbot(chatbot: &ChatbotConfig) -> Result<(), ConfigError> {
    if chatbot.memory_window == 0 {
        return Err(ConfigError::Validation(
            "chatbot.memory_window must be greater than zero".to_string(),
        ));
    }

    if chatbot.retrieval_k == 0 {
        return Err(ConfigError::Validation(
            "chatbot.retrieval_k must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    embedding: Option<EmbeddingPatch>,
    vector_store: Option<VectorStorePatch>,
    documents: Option<DocumentsPatch>,
    intent: Option<IntentPatch>,
    chatbot: Option<ChatbotPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
    schema_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingPatch {
    kind: Option<EmbeddingKind>,
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct VectorStorePatch {
    kind: Option<StoreKind>,
    persist_path: Option<PathBuf>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentsPatch {
    corpus_dir: Option<PathBuf>,
    allowed_extensions: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct IntentPatch {
    user_guide_keywords: Option<Vec<String>>,
    contract_keywords: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatbotPatch {
    system_prompt: Option<String>,
    enable_memory: Option<bool>,
    memory_window: Option<usize>,
    retrieval_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
