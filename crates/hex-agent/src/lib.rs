//! hex-agent: Conversation bridge to an external AI agent CLI
//!
//! This crate launches the agent binary once per turn, resumes the same
//! agent-side session across launches, decodes its line-oriented event
//! stream into a single reply and keeps the turn history.

pub mod bridge;
pub mod conversation;
pub mod error;
pub mod events;
pub mod launch;
pub mod resolve;
pub mod sanitize;
pub mod session;
pub mod stream;
pub mod system;
pub mod transport;

pub use bridge::{BridgeConfig, NO_RESPONSE, ProcessBridge};
pub use conversation::{Conversation, Role, Turn};
pub use error::{BridgeError, Rejection, Result};
pub use events::ConversationEvent;
pub use launch::{Launch, LaunchOptions};
pub use resolve::{DEFAULT_COMMAND, resolve_binary};
pub use sanitize::sanitize;
pub use session::SessionHandle;
pub use stream::{StreamDecoder, StreamEvent};
pub use system::SystemInfo;
pub use transport::{ProgressSender, Transport};
