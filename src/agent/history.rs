//! Bounded window of recent conversation turns.
//!
//! The window counts entries, not exchanges: after eviction it may start
//! with an assistant reply whose question has already been dropped.

use std::collections::VecDeque;
use std::fmt;

use super::message::Role;

/// Number of entries kept in the window.
pub const HISTORY_CAPACITY: usize = 5;

/// One side of an exchange. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    role: Role,
    text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for ConversationTurn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role, self.text)
    }
}

/// FIFO log holding at most [`HISTORY_CAPACITY`] turns.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl HistoryWindow {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Add a turn at the tail, evicting from the head past capacity.
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    /// Record a completed exchange: the query, then the reply.
    pub fn record_exchange(&mut self, query: impl Into<String>, reply: impl Into<String>) {
        self.append(ConversationTurn::user(query));
        self.append(ConversationTurn::assistant(reply));
    }

    /// Oldest-first copy of the retained turns.
    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new()
    }
}
