//! The active conversation and what is needed to start a new one

use hex_agent::{Conversation, SystemInfo, Transport};
use std::sync::Arc;

/// Owns the current conversation; `/new` swaps it for a fresh one
pub struct ChatSession {
    transport: Arc<dyn Transport>,
    system: SystemInfo,
    conversation: Arc<Conversation>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn Transport>, system: SystemInfo) -> Self {
        let conversation = Arc::new(Conversation::new(Arc::clone(&transport), system.clone()));
        tracing::info!(session = %conversation.session(), "conversation started");
        Self {
            transport,
            system,
            conversation,
        }
    }

    pub fn conversation(&self) -> &Arc<Conversation> {
        &self.conversation
    }

    pub fn system(&self) -> &SystemInfo {
        &self.system
    }

    /// Replace the conversation with one bound to a new session handle.
    ///
    /// A turn still running on the old conversation finishes on its own.
    pub fn restart(&mut self) -> &Arc<Conversation> {
        self.conversation = Arc::new(Conversation::new(
            Arc::clone(&self.transport),
            self.system.clone(),
        ));
        tracing::info!(session = %self.conversation.session(), "conversation restarted");
        &self.conversation
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use hex_agent::{Launch, ProgressSender};

    /// Answers every prompt by echoing it back
    pub(crate) struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn invoke(
            &self,
            prompt: &str,
            _launch: &Launch,
            _progress: &ProgressSender,
        ) -> hex_agent::Result<String> {
            Ok(format!("echo: {}", prompt))
        }
    }

    pub(crate) fn test_system() -> SystemInfo {
        SystemInfo {
            platform: "linux".into(),
            arch: "x64".into(),
            core_count: 4,
            memory_gb: 8,
            elevated: false,
        }
    }

    pub(crate) fn test_session() -> ChatSession {
        ChatSession::new(Arc::new(EchoTransport), test_system())
    }

    #[tokio::test]
    async fn test_restart_starts_clean_conversation() {
        let mut session = test_session();
        let first = session.conversation().session().clone();
        session.conversation().submit("hello").await.unwrap();
        assert!(!session.conversation().is_first_turn());

        let fresh = session.restart();
        assert_ne!(fresh.session(), &first);
        assert!(fresh.history().is_empty());
        assert!(fresh.is_first_turn());

        let reply = session.conversation().submit("again").await.unwrap();
        assert!(reply.starts_with("echo: [System: linux x64"));
    }
}
