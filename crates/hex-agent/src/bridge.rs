//! Running the external agent binary for a single turn

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};

use crate::error::{BridgeError, Result};
use crate::launch::{Launch, LaunchOptions};
use crate::sanitize::sanitize;
use crate::stream::StreamDecoder;
use crate::transport::{ProgressSender, Transport};

/// Reply used when the agent exits cleanly without saying anything
pub const NO_RESPONSE: &str = "(no response)";

/// Pause before writing a resumed prompt, for agents slow to start reading
pub const DEFAULT_STDIN_DELAY: Duration = Duration::from_millis(100);

/// Bound on the `--version` availability probe
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Size of each stdout read
const READ_CHUNK: usize = 8 * 1024;

/// Minimum spacing between partial-reply updates
const PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Resolved agent binary
    pub binary: PathBuf,
    /// Arguments placed before the generated flags (e.g. a script for an interpreter)
    pub base_args: Vec<String>,
    /// Flags forwarded on every launch
    pub options: LaunchOptions,
    /// Delay before the prompt is written on resumed turns
    pub stdin_delay: Duration,
}

impl BridgeConfig {
    /// Config for a binary with default options
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            base_args: Vec::new(),
            options: LaunchOptions::default(),
            stdin_delay: DEFAULT_STDIN_DELAY,
        }
    }
}

/// Launches the agent process per turn and turns its output into a reply
pub struct ProcessBridge {
    config: BridgeConfig,
}

impl ProcessBridge {
    /// Create a new process bridge
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    /// The binary this bridge launches
    pub fn binary(&self) -> &Path {
        &self.config.binary
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Whether `<binary> --version` runs and exits cleanly
    pub async fn check_available(&self) -> bool {
        let probe = Command::new(&self.config.binary)
            .args(&self.config.base_args)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(VERSION_PROBE_TIMEOUT, probe).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                tracing::debug!("version probe failed to start: {}", e);
                false
            }
            Err(_) => {
                tracing::debug!("version probe timed out");
                false
            }
        }
    }

    async fn run(&self, prompt: &str, launch: &Launch, progress: &ProgressSender) -> Result<String> {
        let args = launch.args(prompt, &self.config.options);
        tracing::debug!(
            binary = %self.config.binary.display(),
            session = %launch.session(),
            fresh = launch.is_fresh(),
            "launching agent"
        );

        let stdin = if launch.stdin_prompt(prompt).is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let mut child = Command::new(&self.config.binary)
            .args(&self.config.base_args)
            .args(&args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BridgeError::SpawnFailed {
                binary: self.config.binary.clone(),
                source,
            })?;

        let writer = match (launch.stdin_prompt(prompt), child.stdin.take()) {
            (Some(text), Some(pipe)) => Some(tokio::spawn(write_prompt(
                pipe,
                text.to_string(),
                self.config.stdin_delay,
            ))),
            _ => None,
        };

        let stderr = child.stderr.take();
        let diagnostics = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                if let Err(e) = stderr.read_to_end(&mut buf).await {
                    tracing::warn!("reading agent stderr failed: {}", e);
                }
            }
            String::from_utf8_lossy(&buf).into_owned()
        });

        let mut decoder = StreamDecoder::new();
        if let Some(mut stdout) = child.stdout.take() {
            let mut chunk = vec![0u8; READ_CHUNK];
            let mut updates = ProgressThrottle::default();
            loop {
                match stdout.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => {
                        decoder.feed_bytes(&chunk[..n]);
                        if updates.due(&decoder) {
                            updates.publish(&decoder, progress);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("reading agent stdout failed: {}", e);
                        break;
                    }
                }
            }
            if updates.stale(&decoder) {
                updates.publish(&decoder, progress);
            }
        }

        let status = child.wait().await?;
        if let Some(writer) = writer {
            let _ = writer.await;
        }
        let diagnostics = diagnostics.await.unwrap_or_default();
        let code = status.code().unwrap_or(-1);
        tracing::debug!(code, "agent exited");

        classify(&decoder.finalize(), status.success(), code, &diagnostics)
    }
}

#[async_trait]
impl Transport for ProcessBridge {
    async fn invoke(
        &self,
        prompt: &str,
        launch: &Launch,
        progress: &ProgressSender,
    ) -> Result<String> {
        self.run(prompt, launch, progress).await
    }
}

/// Rate-limits partial replies so long outputs are not re-sanitized per read
#[derive(Default)]
struct ProgressThrottle {
    revision: u64,
    last_sent: String,
    sent_at: Option<Instant>,
}

impl ProgressThrottle {
    fn stale(&self, decoder: &StreamDecoder) -> bool {
        decoder.revision() != self.revision
    }

    fn due(&self, decoder: &StreamDecoder) -> bool {
        self.stale(decoder)
            && self
                .sent_at
                .is_none_or(|at| at.elapsed() >= PROGRESS_INTERVAL)
    }

    fn publish(&mut self, decoder: &StreamDecoder, progress: &ProgressSender) {
        self.revision = decoder.revision();
        self.sent_at = Some(Instant::now());
        let partial = sanitize(decoder.current());
        if partial != self.last_sent {
            progress.send(partial.clone());
            self.last_sent = partial;
        }
    }
}

async fn write_prompt(mut pipe: ChildStdin, prompt: String, delay: Duration) {
    tokio::time::sleep(delay).await;
    if let Err(e) = pipe.write_all(prompt.as_bytes()).await {
        tracing::warn!("writing prompt to agent stdin failed: {}", e);
        return;
    }
    if let Err(e) = pipe.shutdown().await {
        tracing::warn!("closing agent stdin failed: {}", e);
    }
}

/// Decide the turn outcome from the reconstructed text and the exit status.
///
/// Text produced before a non-zero exit is still returned as the reply.
fn classify(raw: &str, success: bool, code: i32, diagnostics: &str) -> Result<String> {
    let reply = sanitize(raw);
    if !reply.is_empty() {
        if !success {
            tracing::warn!(code, "agent exited non-zero after replying; keeping the reply");
        }
        return Ok(reply);
    }

    let diagnostics = sanitize(diagnostics);
    if !success && !diagnostics.is_empty() {
        return Err(BridgeError::ProcessFailed { code, diagnostics });
    }
    Ok(NO_RESPONSE.to_string())
}
