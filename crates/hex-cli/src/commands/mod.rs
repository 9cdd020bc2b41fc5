//! Slash commands for interactive mode

use crate::session::ChatSession;
use hex_agent::{Conversation, Role, Turn};

/// Turns listed by `/history` without an argument
const DEFAULT_HISTORY_COUNT: usize = 10;

/// Result of executing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Show a message to the user (not sent to agent)
    Message(String),
    /// Start over with a new session handle
    NewConversation,
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, session: &ChatSession) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "session" | "s" => CommandResult::Message(session_info(session.conversation())),

        "info" | "i" => CommandResult::Message(session.system().context_line()),

        "history" => match parse_count(args) {
            Some(n) => CommandResult::Message(history_text(&session.conversation().recent(n))),
            None => CommandResult::Message(format!("Not a turn count: {}", args)),
        },

        "new" | "n" => CommandResult::NewConversation,

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn parse_count(args: &str) -> Option<usize> {
    if args.is_empty() {
        Some(DEFAULT_HISTORY_COUNT)
    } else {
        args.parse().ok()
    }
}

fn session_info(conversation: &Conversation) -> String {
    let mut output = String::from("Session Info\n");
    output.push_str(&"-".repeat(40));
    output.push('\n');
    output.push_str(&format!("Session:    {}\n", conversation.session()));
    output.push_str(&format!("Turns:      {}\n", conversation.turn_count()));
    output.push_str(&format!(
        "Next turn:  {}\n",
        if conversation.is_first_turn() {
            "creates the session"
        } else {
            "resumes the session"
        }
    ));
    if conversation.is_busy() {
        output.push_str("Status:     waiting for a reply\n");
    }
    output
}

/// Plain-text rendering of a slice of history
pub fn history_text(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return "No turns yet.".to_string();
    }
    turns
        .iter()
        .map(|turn| {
            let who = match turn.role {
                Role::User => "you",
                Role::Assistant => "hex",
            };
            format!("{}: {}", who, turn.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /session, /s         Show the session handle and turn count
  /info, /i            Show the system line sent with the first message
  /history [n]         Show the last n turns (default 10)
  /new, /n             Start a new conversation
  /quit, /exit, /q     Exit hex

Anything else is sent to the agent."#
        .to_string()
}
