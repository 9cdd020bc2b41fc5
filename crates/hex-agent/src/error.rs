//! Error types for hex-agent

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the bridge error
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Turn-scoped failures of a single external-process invocation
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The agent binary could not be launched at all
    #[error("Failed to start {}: {source}", binary.display())]
    SpawnFailed {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process exited non-zero without producing any reply text
    #[error("Agent exited with code {code}: {diagnostics}")]
    ProcessFailed { code: i32, diagnostics: String },

    /// Waiting on the child process failed
    #[error("I/O error while talking to agent: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Exit code carried by the error, if the process got far enough to have one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BridgeError::ProcessFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Reasons a submission is refused without touching the conversation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Input was empty or whitespace only
    #[error("nothing to send")]
    Blank,

    /// A previous turn is still waiting on the agent
    #[error("a reply is still in progress")]
    Busy,
}
