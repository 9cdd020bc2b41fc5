//! Conversation event types

use serde::{Deserialize, Serialize};

/// Events emitted while a conversation turn is in flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// A turn was accepted and the agent is being launched
    TurnStart { turn_number: u32, prompt: String },

    /// Sanitized reply text reconstructed so far
    ReplyUpdate { text: String },

    /// The turn finished; `reply` is what was appended to the history
    TurnEnd {
        turn_number: u32,
        reply: String,
        is_error: bool,
    },
}

impl ConversationEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationEvent::TurnEnd { .. })
    }
}
