//! Bounded conversation history.
//!
//! A FIFO window counted in exchanges: recording a question/answer pair
//! pushes a user turn and an assistant turn, then evicts the oldest pair
//! once the window is exceeded. History length therefore never passes
//! `2 * window`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use deskbot_core::Role;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug)]
pub struct ConversationMemory {
    window: usize,
    turns: VecDeque<ConversationTurn>,
}

impl ConversationMemory {
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1), turns: VecDeque::new() }
    }

    pub fn record(&mut self, question: &str, answer: &str) {
        self.turns.push_back(ConversationTurn {
            role: Role::User,
            content: question.to_string(),
        });
        self.turns.push_back(ConversationTurn {
            role: Role::Assistant,
            content: answer.to_string(),
        });

        while self.turns.len() > self.window * 2 {
            self.turns.pop_front();
            self.turns.pop_front();
        }
    }

    /// Ordered snapshot, oldest first.
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
