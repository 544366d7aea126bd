//! Bounded conversation history shared between the triage agent and workers.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Default number of turns kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Who produced a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Speaker {
    User,
    Agent(String),
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Agent(name) => f.write_str(name),
        }
    }
}

/// One utterance in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub speaker: Speaker,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Ring of the most recent turns. Oldest turns drop off once full.
#[derive(Debug)]
pub struct ConversationHistory {
    turns: Mutex<VecDeque<HistoryTurn>>,
    capacity: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ConversationHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record a user utterance.
    pub fn push_user(&self, content: impl Into<String>) {
        self.push(Speaker::User, content.into());
    }

    /// Record an agent response.
    pub fn push_agent(&self, agent: impl Into<String>, content: impl Into<String>) {
        self.push(Speaker::Agent(agent.into()), content.into());
    }

    fn push(&self, speaker: Speaker, content: String) {
        let mut turns = self.turns.lock();
        if turns.len() == self.capacity {
            turns.pop_front();
        }
        turns.push_back(HistoryTurn {
            speaker,
            content,
            at: Utc::now(),
        });
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> Vec<HistoryTurn> {
        let turns = self.turns.lock();
        let skip = turns.len().saturating_sub(n);
        turns.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.lock().is_empty()
    }

    pub fn clear(&self) {
        self.turns.lock().clear();
    }
}
