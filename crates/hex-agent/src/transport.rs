//! Transport abstraction between the conversation and the agent process

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::events::ConversationEvent;
use crate::launch::Launch;

/// A sender for partial-reply updates while a turn is running.
///
/// Sending never blocks and silently drops updates nobody listens to.
#[derive(Clone, Default)]
pub struct ProgressSender {
    tx: Option<broadcast::Sender<ConversationEvent>>,
}

impl ProgressSender {
    /// Create a progress sender publishing on the given channel
    pub fn new(tx: broadcast::Sender<ConversationEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sender that discards everything
    pub fn noop() -> Self {
        Self { tx: None }
    }

    /// Publish the sanitized reply reconstructed so far
    pub fn send(&self, text: impl Into<String>) {
        if let Some(ref tx) = self.tx {
            let _ = tx.send(ConversationEvent::ReplyUpdate { text: text.into() });
        }
    }
}

/// Runs one turn against the agent and returns its final reply text
#[async_trait]
pub trait Transport: Send + Sync {
    /// Invoke the agent for a single turn.
    ///
    /// Implementations never retry; a failure is reported for this turn only.
    async fn invoke(&self, prompt: &str, launch: &Launch, progress: &ProgressSender)
    -> Result<String>;
}
