//! Bounded conversation history
//!
//! Holds the prior turns sent alongside each chat request so the assistant
//! can resolve follow-up questions. The log is capped: old turns are evicted
//! from the front in user/assistant pairs so the transcript sent to the
//! endpoint never opens with a dangling assistant reply.

use serde::{Deserialize, Serialize};

/// Default maximum number of retained turns
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Synthesized per request, never stored in history
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name used by the chat endpoint
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message in a conversation, immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    /// Create a user turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, bounded log of prior turns
///
/// Insertion order is chronological. After every append the log is trimmed
/// from the oldest end until it fits the limit, and never starts with an
/// assistant turn.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: Vec<ChatTurn>,
    limit: usize,
}

impl ConversationHistory {
    /// Create an empty history bounded to `limit` turns
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            turns: Vec::new(),
            limit,
        }
    }

    /// Append a turn to the tail, then trim the head to the limit
    pub fn append(&mut self, turn: ChatTurn) {
        self.turns.push(turn);

        while self.turns.len() > self.limit {
            self.turns.remove(0);
            // Keep the transcript opening on a user turn
            if self.turns.first().is_some_and(|t| t.role == Role::Assistant) {
                self.turns.remove(0);
            }
        }
    }

    /// Chronological copy of the retained turns
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChatTurn> {
        self.turns.clone()
    }

    /// Forget all retained turns
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(history: &mut ConversationHistory, n: usize) {
        history.append(ChatTurn::user(format!("question {n}")));
        history.append(ChatTurn::assistant(format!("answer {n}")));
    }

    #[test]
    fn append_keeps_order() {
        let mut history = ConversationHistory::new(10);
        exchange(&mut history, 1);
        exchange(&mut history, 2);

        let turns = history.snapshot();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "question 1");
        assert_eq!(turns[3].content, "answer 2");
    }

    #[test]
    fn length_never_exceeds_limit() {
        let mut history = ConversationHistory::new(6);
        for n in 0..50 {
            exchange(&mut history, n);
            assert!(history.len() <= 6, "len {} after exchange {n}", history.len());
        }
    }

    #[test]
    fn head_is_never_an_assistant_turn() {
        let mut history = ConversationHistory::new(5);
        for n in 0..20 {
            exchange(&mut history, n);
            let head = history.snapshot().into_iter().next();
            assert!(head.is_none_or(|t| t.role == Role::User));
        }
    }

    #[test]
    fn eviction_removes_oldest_pair() {
        let mut history = ConversationHistory::new(4);
        exchange(&mut history, 1);
        exchange(&mut history, 2);
        exchange(&mut history, 3);

        let turns = history.snapshot();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "question 2");
        assert_eq!(turns[0].role, Role::User);
    }

    #[test]
    fn odd_limit_still_starts_on_user_turn() {
        let mut history = ConversationHistory::new(3);
        exchange(&mut history, 1);
        exchange(&mut history, 2);

        let turns = history.snapshot();
        assert!(turns.len() <= 3);
        assert_eq!(turns[0].role, Role::User);
    }

    #[test]
    fn clear_empties_history() {
        let mut history = ConversationHistory::new(10);
        exchange(&mut history, 1);
        assert!(!history.is_empty());

        history.clear();
        assert!(history.is_empty());
        assert!(history.snapshot().is_empty());
    }

    #[test]
    fn role_wire_names() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
