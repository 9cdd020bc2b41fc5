//! hex - terminal chat client for an external AI agent CLI

mod commands;
mod config;
mod session;
mod system;
mod ui;

use clap::{Parser, Subcommand};
use hex_agent::{ProcessBridge, Rejection, Transport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::session::ChatSession;

/// Log filter used with --verbose unless RUST_LOG says otherwise
const DEFAULT_LOG_FILTER: &str = "hex=debug,hex_agent=debug";

/// Shown when the agent binary cannot be run
const INSTALL_HINT: &str = "npm install -g @anthropic-ai/claude-code";

/// hex - chat with your local AI agent from the terminal
#[derive(Parser, Debug)]
#[command(name = "hex")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the agent binary (default: search for `claude`)
    #[arg(short, long, global = true)]
    binary: Option<PathBuf>,

    /// Model forwarded to the agent
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long, global = true)]
    no_tui: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Interactive conversation (default)
    Chat,
    /// Print the system information sent to the agent
    Info,
    /// Send a single prompt in a fresh conversation and print the reply
    Run {
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();
    let command = args.command.clone().unwrap_or(Command::Chat);
    let use_tui = command == Command::Chat && !args.no_tui && cfg.tui.unwrap_or(true);

    if args.verbose {
        init_logging(use_tui)?;
    }

    // CLI takes precedence over the config file
    let binary = match args.binary.clone().or_else(|| cfg.binary.as_ref().map(PathBuf::from)) {
        Some(path) => path,
        None => hex_agent::resolve_binary(
            cfg.command
                .as_deref()
                .unwrap_or(hex_agent::DEFAULT_COMMAND),
        ),
    };

    if command == Command::Info {
        return print_info(&binary);
    }

    let bridge = ProcessBridge::new(cfg.bridge_config(binary, args.model.clone()));
    if !bridge.check_available().await {
        eprintln!(
            "Error: could not run the agent at {}",
            bridge.binary().display()
        );
        eprintln!();
        eprintln!("Install it with: {}", INSTALL_HINT);
        eprintln!("Or point hex at it: hex --binary /path/to/claude (or `binary` in the config file)");
        std::process::exit(1);
    }

    let transport: Arc<dyn Transport> = Arc::new(bridge);
    let mut session = ChatSession::new(transport, system::probe());

    match command {
        Command::Run { prompt } => {
            if !run_command(&session, &prompt.join(" ")).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        _ if use_tui => ui::run_tui(&mut session, cfg.history_window()).await,
        _ => run_interactive(&mut session).await,
    }
}

fn init_logging(use_tui: bool) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // The TUI owns the terminal, so logs go to a file instead
    if use_tui {
        let dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hex");
        std::fs::create_dir_all(&dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("hex.log"))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn print_info(binary: &std::path::Path) -> anyhow::Result<()> {
    let info = serde_json::json!({
        "system": system::probe(),
        "binary": binary.display().to_string(),
        "hostname": system::hostname(),
    });
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

/// Run one turn and print the reply. Returns false when the agent failed.
async fn run_command(session: &ChatSession, prompt: &str) -> anyhow::Result<bool> {
    let conversation = session.conversation();

    let reply = match conversation.submit(prompt).await {
        Ok(reply) => reply,
        Err(Rejection::Blank) => anyhow::bail!("nothing to send: the prompt is blank"),
        Err(e) => anyhow::bail!("{}", e),
    };

    if conversation.last_turn_failed() {
        eprintln!("Error: {}", reply);
        return Ok(false);
    }
    println!("{}", reply);
    Ok(true)
}

/// Printed in plain mode while a turn is running
const WAITING_LINE: &str = "  [thinking...]";

fn plain_banner(session: &ChatSession) -> String {
    format!(
        "hex session: {} (/help for commands)\n{}",
        session.conversation().session().short(),
        session.system().context_line()
    )
}

async fn run_interactive(session: &mut ChatSession) -> anyhow::Result<()> {
    use std::io::{self, Write};

    // Show minimal startup info (only if TTY)
    if io::IsTerminal::is_terminal(&io::stderr()) {
        eprintln!("{}", plain_banner(session));
        eprintln!();
    }

    loop {
        print!("you: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit" | "q") {
            break;
        }

        // Handle slash commands
        if let Some(result) = commands::execute_command(input, session) {
            match result {
                commands::CommandResult::Message(msg) => println!("{}", msg),
                commands::CommandResult::NewConversation => {
                    let conversation = session.restart();
                    println!(
                        "Started a new conversation ({})",
                        conversation.session().short()
                    );
                }
                commands::CommandResult::Exit => break,
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            println!();
            continue;
        }

        println!("{}", WAITING_LINE);
        match session.conversation().submit(input).await {
            Ok(reply) => println!("hex: {}", reply),
            Err(e) => eprintln!("Not sent: {}", e),
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_chat() {
        let args = Args::try_parse_from(["hex"]).unwrap();
        assert_eq!(args.command, None);
        assert!(!args.no_tui);
    }

    #[test]
    fn test_run_collects_prompt_words() {
        let args =
            Args::try_parse_from(["hex", "--model", "opus", "run", "what", "is", "2+2?"]).unwrap();
        assert_eq!(args.model.as_deref(), Some("opus"));
        assert_eq!(
            args.command,
            Some(Command::Run {
                prompt: vec!["what".into(), "is".into(), "2+2?".into()]
            })
        );
    }

    #[test]
    fn test_run_requires_prompt() {
        assert!(Args::try_parse_from(["hex", "run"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["hex", "chat", "--no-tui", "-b", "/opt/claude"]).unwrap();
        assert_eq!(args.command, Some(Command::Chat));
        assert!(args.no_tui);
        assert_eq!(args.binary, Some(PathBuf::from("/opt/claude")));
    }

    #[tokio::test]
    async fn test_run_command_prints_reply() {
        let session = session::tests::test_session();
        assert!(run_command(&session, "ping").await.unwrap());
        assert_eq!(session.conversation().turn_count(), 1);
        assert!(run_command(&session, "   ").await.is_err());
    }

    #[test]
    fn test_plain_banner_shows_system_summary() {
        let session = session::tests::test_session();
        let banner = plain_banner(&session);
        assert!(banner.contains(session.conversation().session().short()));
        assert!(banner.ends_with("[System: linux x64, 4 cores, 8GB RAM, sudo=no]"));
    }

    /// Streams far more partial replies than the event channel holds, then fails
    struct NoisyFailure;

    #[async_trait::async_trait]
    impl Transport for NoisyFailure {
        async fn invoke(
            &self,
            _prompt: &str,
            _launch: &hex_agent::Launch,
            progress: &hex_agent::ProgressSender,
        ) -> hex_agent::Result<String> {
            for i in 0..300 {
                progress.send(format!("partial {}", i));
            }
            Err(hex_agent::BridgeError::ProcessFailed {
                code: 1,
                diagnostics: "permission denied".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_run_command_reports_failure_after_many_updates() {
        let session = ChatSession::new(Arc::new(NoisyFailure), session::tests::test_system());
        let _events = session.conversation().subscribe();
        assert!(!run_command(&session, "ping").await.unwrap());
    }
}
