//! Conversation state: turn history, first-turn flag and the busy guard.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::broadcast;

use crate::{
    error::Rejection,
    events::ConversationEvent,
    launch::Launch,
    session::SessionHandle,
    system::SystemInfo,
    transport::{ProgressSender, Transport},
};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
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
}

#[derive(Debug)]
struct ConversationState {
    history: Vec<Turn>,
    is_first_turn: bool,
    last_failed: bool,
}

/// Releases the busy flag when a submission finishes, however it finishes
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A single logical conversation with the external agent
pub struct Conversation {
    transport: Arc<dyn Transport>,
    system: SystemInfo,
    session: SessionHandle,
    state: Mutex<ConversationState>,
    busy: AtomicBool,
    event_tx: broadcast::Sender<ConversationEvent>,
}

impl Conversation {
    /// Start a conversation with a freshly generated session handle
    pub fn new(transport: Arc<dyn Transport>, system: SystemInfo) -> Self {
        Self::with_session(transport, system, SessionHandle::generate())
    }

    pub fn with_session(
        transport: Arc<dyn Transport>,
        system: SystemInfo,
        session: SessionHandle,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            transport,
            system,
            session,
            state: Mutex::new(ConversationState {
                history: Vec::new(),
                is_first_turn: true,
                last_failed: false,
            }),
            busy: AtomicBool::new(false),
            event_tx,
        }
    }

    /// Subscribe to turn lifecycle and streaming events
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.event_tx.subscribe()
    }

    /// Send one user message and wait for the agent's reply.
    ///
    /// Agent failures come back as the reply text; only blank input and
    /// overlapping submissions are refused.
    pub async fn submit(&self, text: &str) -> Result<String, Rejection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Rejection::Blank);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Rejection::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let (prompt, launch, turn_number) = {
            let mut state = self.state.lock();
            let prompt = if state.is_first_turn {
                format!("{}\n\n{}", self.system.context_line(), text)
            } else {
                text.to_string()
            };
            state.history.push(Turn::user(text));
            let turn_number = count_user_turns(&state.history);
            (
                prompt,
                Launch::for_turn(&self.session, state.is_first_turn),
                turn_number,
            )
        };

        let _ = self.event_tx.send(ConversationEvent::TurnStart {
            turn_number,
            prompt: prompt.clone(),
        });

        let progress = ProgressSender::new(self.event_tx.clone());
        let outcome = self.transport.invoke(&prompt, &launch, &progress).await;

        let (reply, is_error) = match outcome {
            Ok(reply) => (reply, false),
            Err(e) => {
                tracing::warn!(session = %self.session, "turn {} failed: {}", turn_number, e);
                (e.to_string(), true)
            }
        };

        {
            let mut state = self.state.lock();
            state.is_first_turn = false;
            state.last_failed = is_error;
            state.history.push(Turn::assistant(reply.clone()));
        }

        let _ = self.event_tx.send(ConversationEvent::TurnEnd {
            turn_number,
            reply: reply.clone(),
            is_error,
        });

        Ok(reply)
    }

    /// Snapshot of the full history, oldest first
    pub fn history(&self) -> Vec<Turn> {
        self.state.lock().history.clone()
    }

    /// The last `n` turns, oldest first
    pub fn recent(&self, n: usize) -> Vec<Turn> {
        let state = self.state.lock();
        let start = state.history.len().saturating_sub(n);
        state.history[start..].to_vec()
    }

    /// Number of user turns submitted so far
    pub fn turn_count(&self) -> u32 {
        count_user_turns(&self.state.lock().history)
    }

    pub fn is_first_turn(&self) -> bool {
        self.state.lock().is_first_turn
    }

    /// Whether the most recent completed turn ended in an agent error
    pub fn last_turn_failed(&self) -> bool {
        self.state.lock().last_failed
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn system(&self) -> &SystemInfo {
        &self.system
    }
}

fn count_user_turns(history: &[Turn]) -> u32 {
    history.iter().filter(|t| t.role == Role::User).count() as u32
}
