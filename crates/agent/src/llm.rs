//! Chat-model client.
//!
//! One client covers all three providers. OpenAI and Ollama speak the same
//! `/v1/chat/completions` shape (Ollama without auth); Anthropic uses its
//! own `/v1/messages` endpoint with `x-api-key` auth and a top-level system
//! field, so system messages are folded out of the message list for it.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use deskbot_core::config::{LlmConfig, LlmProvider};
use deskbot_core::{ChatMessage, ChatModel, Role};

const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com";
const ANTHROPIC_DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building http client")?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| {
                match config.provider {
                    LlmProvider::Anthropic => ANTHROPIC_DEFAULT_BASE_URL,
                    _ => OPENAI_DEFAULT_BASE_URL,
                }
                .to_string()
            })
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            provider: config.provider,
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    async fn complete_openai(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = if self.base_url.ends_with("/v1") {
            format!("{}/chat/completions", self.base_url)
        } else {
            format!("{}/v1/chat/completions", self.base_url)
        };

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.context("chat completion request failed")?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat endpoint returned {status}: {detail}"));
        }

        let parsed: ChatCompletionsResponse =
            response.json().await.context("chat completion response invalid")?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat endpoint returned no choices"))
    }

    async fn complete_anthropic(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);

        // Anthropic takes system text as a top-level field, not a message.
        let system: Vec<&str> = messages
            .iter()
            .filter(|message| message.role == Role::System)
            .map(|message| message.content.as_str())
            .collect();
        let turns: Vec<serde_json::Value> = messages
            .iter()
            .filter(|message| message.role != Role::System)
            .map(|message| json!({ "role": message.role.as_str(), "content": message.content }))
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": turns,
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n\n"));
        }

        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("anthropic provider requires an api key"))?;

        let response = self
            .client
            .post(&url)
            .header("x-api-key", key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .context("messages request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("messages endpoint returned {status}: {detail}"));
        }

        let parsed: AnthropicResponse =
            response.json().await.context("messages response invalid")?;
        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| anyhow!("messages endpoint returned no text content"))
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        match self.provider {
            LlmProvider::OpenAi | LlmProvider::Ollama => self.complete_openai(messages).await,
            LlmProvider::Anthropic => self.complete_anthropic(messages).await,
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
struct AnthropicContentBlock {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use deskbot_core::config::{LlmConfig, LlmProvider};

    use super::{OpenAiCompatibleClient, ANTHROPIC_DEFAULT_BASE_URL, OPENAI_DEFAULT_BASE_URL};

    fn config(provider: LlmProvider, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: Some("sk-test".to_string().into()),
            base_url: base_url.map(str::to_string),
            model: "test-model".to_string(),
            temperature: 0.7,
            max_tokens: 256,
            timeout_secs: 5,
        }
    }

    #[test]
    fn default_base_urls_follow_the_provider() {
        let openai =
            OpenAiCompatibleClient::from_config(&config(LlmProvider::OpenAi, None)).unwrap();
        assert_eq!(openai.base_url, OPENAI_DEFAULT_BASE_URL);

        let anthropic =
            OpenAiCompatibleClient::from_config(&config(LlmProvider::Anthropic, None)).unwrap();
        assert_eq!(anthropic.base_url, ANTHROPIC_DEFAULT_BASE_URL);
    }

    #[test]
    fn trailing_slashes_are_normalized() {
        let client = OpenAiCompatibleClient::from_config(&config(
            LlmProvider::Ollama,
            Some("http://localhost:11434/"),
        ))
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.provider(), LlmProvider::Ollama);
    }
}
