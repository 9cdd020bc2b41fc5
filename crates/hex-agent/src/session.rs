//! Opaque session handles that tie several agent launches into one conversation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier passed to the agent as `--session-id` and later `--resume`.
///
/// Generated once per conversation and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(String);

impl SessionHandle {
    /// Generate a fresh random handle
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The handle as passed on the agent command line
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for status lines
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
