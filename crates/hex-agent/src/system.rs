//! Host description sent to the agent on the first turn

use serde::{Deserialize, Serialize};

/// Machine facts gathered once at startup and treated as immutable afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub platform: String,
    pub arch: String,
    pub core_count: usize,
    pub memory_gb: u64,
    /// Whether the user can run privileged commands without a password
    pub elevated: bool,
}

impl SystemInfo {
    /// The bracketed context line prefixed to the first prompt
    pub fn context_line(&self) -> String {
        format!(
            "[System: {} {}, {} cores, {}GB RAM, sudo={}]",
            self.platform,
            self.arch,
            self.core_count,
            self.memory_gb,
            if self.elevated { "yes" } else { "no" }
        )
    }
}
