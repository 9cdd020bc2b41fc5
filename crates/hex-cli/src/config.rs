//! Configuration file support

use hex_agent::{BridgeConfig, LaunchOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Turns shown in the TUI transcript when nothing is configured
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// Configuration for hex
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit path to the agent binary (skips the PATH search)
    pub binary: Option<String>,
    /// Command name searched for when no binary is given
    pub command: Option<String>,
    /// Arguments placed before the generated flags, e.g. a script for an interpreter
    pub base_args: Vec<String>,
    /// Model forwarded to the agent
    pub model: Option<String>,
    /// Extra system prompt appended when the session is created
    pub system_prompt: Option<String>,
    /// Let the agent act without asking for permission (true by default)
    pub skip_permissions: Option<bool>,
    /// Additional flags passed through verbatim
    pub extra_args: Vec<String>,
    /// Delay before writing a resumed prompt to the agent's stdin
    pub stdin_delay_ms: Option<u64>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
    /// Number of turns kept on screen in the TUI
    pub history_window: Option<usize>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hex")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("HEX_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a file, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to a file
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            command: Some(hex_agent::DEFAULT_COMMAND.to_string()),
            skip_permissions: Some(true),
            stdin_delay_ms: Some(100),
            tui: Some(true),
            history_window: Some(DEFAULT_HISTORY_WINDOW),
            ..Default::default()
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    pub fn history_window(&self) -> usize {
        self.history_window.unwrap_or(DEFAULT_HISTORY_WINDOW).max(1)
    }

    /// Build the bridge settings for an already resolved binary
    pub fn bridge_config(&self, binary: PathBuf, model: Option<String>) -> BridgeConfig {
        let mut bridge = BridgeConfig::new(binary);
        bridge.base_args = self.base_args.clone();
        bridge.options = LaunchOptions {
            model: model.or_else(|| self.model.clone()),
            system_prompt: self.system_prompt.clone(),
            skip_permissions: self.skip_permissions.unwrap_or(true),
            extra_args: self.extra_args.clone(),
        };
        if let Some(ms) = self.stdin_delay_ms {
            bridge.stdin_delay = Duration::from_millis(ms);
        }
        bridge
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# hex configuration file
# Place at ~/.config/hex/config.toml (Linux), ~/Library/Application Support/hex/config.toml (Mac)
# or point HEX_CONFIG_PATH at another file

# Agent command searched for on PATH and in common install locations
command = "claude"

# Or an explicit binary (skips the search)
# binary = "/usr/local/bin/claude"

# Arguments placed before hex's own flags, e.g. when launching through an interpreter
# base_args = ["/opt/agent/cli.js"]

# Model forwarded to the agent (agent default when unset)
# model = "sonnet"

# Extra instructions appended to the agent's system prompt on the first turn
# system_prompt = "Answer briefly."

# Let the agent act without asking for permission
skip_permissions = true

# Additional flags passed through verbatim
# extra_args = ["--add-dir", "/tmp"]

# Milliseconds to wait before writing a follow-up prompt to the agent
stdin_delay_ms = 100

# Whether to use TUI mode by default (true by default)
# Set to false for simple stdin/stdout mode
tui = true

# Turns kept on screen in the TUI
history_window = 20
"#
}
