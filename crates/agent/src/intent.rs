//! Intent classification.
//!
//! The keyword path counts case-insensitive substring hits against two
//! configured lists. More contract hits than guide hits routes to the
//! database; any guide hit routes to retrieval; otherwise the query is
//! general. A tie with hits on both sides goes to the guide path, which is
//! the cheaper and safer branch. The model-assisted path asks the chat model
//! for a category and falls back to keywords on any failure, so
//! classification itself can never error.

use serde::{Deserialize, Serialize};
use tracing::warn;

use deskbot_core::config::IntentConfig;
use deskbot_core::{ChatMessage, ChatModel};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    UserGuide,
    ContractInfo,
    General,
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::UserGuide => "user_guide",
            Self::ContractInfo => "contract_info",
            Self::General => "general",
        }
    }
}

#[derive(Clone, Debug)]
pub struct IntentClassifier {
    user_guide_keywords: Vec<String>,
    contract_keywords: Vec<String>,
}

impl IntentClassifier {
    pub fn new(config: &IntentConfig) -> Self {
        Self {
            user_guide_keywords: config.user_guide_keywords.clone(),
            contract_keywords: config.contract_keywords.clone(),
        }
    }

    pub fn classify(&self, query: &str) -> Intent {
        let query_lower = query.to_lowercase();

        let guide_score = self
            .user_guide_keywords
            .iter()
            .filter(|keyword| query_lower.contains(&keyword.to_lowercase()))
            .count();
        let contract_score = self
            .contract_keywords
            .iter()
            .filter(|keyword| query_lower.contains(&keyword.to_lowercase()))
            .count();

        if contract_score > guide_score {
            Intent::ContractInfo
        } else if guide_score > 0 {
            Intent::UserGuide
        } else {
            Intent::General
        }
    }

    /// Ask the model for a category; fall back to keywords on any failure or
    /// unparseable reply.
    pub async fn classify_with_model(&self, query: &str, model: &dyn ChatModel) -> Intent {
        let prompt = format!(
            "Classify the following customer query into one of these categories:\n\
             1. USER_GUIDE - Questions about how to use the software, features, tutorials, instructions\n\
             2. CONTRACT_INFO - Questions about contract details, expiration dates, pricing, purchased modules\n\
             3. GENERAL - General questions or greetings\n\n\
             Query: {query}\n\n\
             Respond with only the category name (USER_GUIDE, CONTRACT_INFO, or GENERAL)."
        );

        match model.complete(&[ChatMessage::user(prompt)]).await {
            Ok(reply) => {
                let normalized = reply.trim().to_uppercase();
                if normalized.contains("USER_GUIDE") {
                    Intent::UserGuide
                } else if normalized.contains("CONTRACT") {
                    Intent::ContractInfo
                } else {
                    Intent::General
                }
            }
            Err(error) => {
                warn!(
                    event_name = "model_classification_failed",
                    %error,
                    "falling back to keyword matching",
                );
                self.classify(query)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;

    use deskbot_core::config::IntentConfig;
    use deskbot_core::{ChatMessage, ChatModel};

    use super::{Intent, IntentClassifier};

    fn classifier() -> IntentClassifier {
        IntentClassifier::new(&IntentConfig {
            user_guide_keywords: ["how", "guide", "export", "report", "configure", "setup"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            contract_keywords: ["contract", "expire", "expiration", "pricing", "cost", "module"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
        })
    }

    #[test]
    fn keyword_cases_route_as_expected() {
        struct Case {
            query: &'static str,
            expected: Intent,
        }

        let cases = [
            Case { query: "How do I export a report?", expected: Intent::UserGuide },
            Case { query: "When does my contract expire?", expected: Intent::ContractInfo },
            Case { query: "What is the pricing on the ACME contract?", expected: Intent::ContractInfo },
            Case { query: "Hello there!", expected: Intent::General },
            Case { query: "Thanks for the help", expected: Intent::General },
            Case { query: "guide me through setup", expected: Intent::UserGuide },
        ];

        let classifier = classifier();
        for case in cases {
            assert_eq!(
                classifier.classify(case.query),
                case.expected,
                "query: {}",
                case.query
            );
        }
    }

    #[test]
    fn tie_goes_to_the_guide_path() {
        // One hit each side: "how" vs "contract".
        let classifier = classifier();
        assert_eq!(classifier.classify("how does the contract work"), Intent::UserGuide);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let classifier = classifier();
        assert_eq!(classifier.classify("WHEN DOES MY CONTRACT EXPIRE?"), Intent::ContractInfo);
    }

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

    #[tokio::test]
    async fn model_reply_is_parsed_loosely() {
        let classifier = classifier();

        let model = ScriptedModel { reply: Ok("The category is USER_GUIDE.".to_string()) };
        assert_eq!(classifier.classify_with_model("anything", &model).await, Intent::UserGuide);

        let model = ScriptedModel { reply: Ok("contract_info".to_string()) };
        assert_eq!(classifier.classify_with_model("anything", &model).await, Intent::ContractInfo);

        let model = ScriptedModel { reply: Ok("no idea".to_string()) };
        assert_eq!(classifier.classify_with_model("anything", &model).await, Intent::General);
    }

    #[tokio::test]
    async fn model_failure_falls_back_to_keywords() {
        let classifier = classifier();
        let model = ScriptedModel { reply: Err("connection refused".to_string()) };

        let intent = classifier.classify_with_model("when does my contract expire", &model).await;
        assert_eq!(intent, Intent::ContractInfo);
    }
}
