//! Query routing agent - intent classification and answer orchestration
//!
//! This crate is the "brain" of deskbot: it decides how each customer query
//! should be answered and drives the answer to completion:
//! - Classifies intent (keyword heuristics, optionally model-assisted)
//! - Routes USER_GUIDE questions through document retrieval
//! - Routes CONTRACT_INFO questions through the structured-query subsystem
//! - Answers everything else directly from the chat model
//! - Maintains a bounded window of conversation history
//!
//! # Key Types
//!
//! - `SupportAgent` - main orchestrator (see `orchestrator` module)
//! - `Intent` - the three routing strategies
//! - `OpenAiCompatibleClient` - chat-model client for OpenAI/Anthropic/Ollama
//!
//! # Safety Principle
//!
//! The model is strictly a translator and phrasing engine. It never executes
//! anything itself: generated SQL passes a read-only gate before touching the
//! database, and a contract lookup that fails for any reason becomes a polite
//! escalation message rather than a raw error.

pub mod intent;
pub mod llm;
pub mod memory;
pub mod orchestrator;

pub use intent::{Intent, IntentClassifier};
pub use llm::OpenAiCompatibleClient;
pub use memory::{ConversationMemory, ConversationTurn};
pub use orchestrator::{ChatOutcome, SupportAgent, SystemStatus};
