//! How a turn is handed to the agent binary

use crate::session::SessionHandle;

/// Launch strategy for one turn.
///
/// The first turn creates the agent-side session and passes the prompt as an
/// argument; every later turn resumes it and writes the prompt to stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    Fresh(SessionHandle),
    Resume(SessionHandle),
}

/// Flags shared by every launch, beyond the session and prompt plumbing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Forwarded as `--model`
    pub model: Option<String>,
    /// Forwarded as `--append-system-prompt` when the session is created
    pub system_prompt: Option<String>,
    /// Adds `--dangerously-skip-permissions`
    pub skip_permissions: bool,
    /// Appended verbatim after the built-in flags
    pub extra_args: Vec<String>,
}

impl Launch {
    /// Pick the strategy from the conversation's first-turn flag
    pub fn for_turn(session: &SessionHandle, is_first_turn: bool) -> Self {
        if is_first_turn {
            Launch::Fresh(session.clone())
        } else {
            Launch::Resume(session.clone())
        }
    }

    pub fn session(&self) -> &SessionHandle {
        match self {
            Launch::Fresh(s) | Launch::Resume(s) => s,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Launch::Fresh(_))
    }

    /// Full argument vector for this launch
    pub fn args(&self, prompt: &str, options: &LaunchOptions) -> Vec<String> {
        let mut args: Vec<String> = ["-p", "--output-format", "stream-json", "--verbose"]
            .into_iter()
            .map(String::from)
            .collect();

        match self {
            Launch::Fresh(session) => {
                args.push("--session-id".into());
                args.push(session.to_string());
                if let Some(ref system_prompt) = options.system_prompt {
                    args.push("--append-system-prompt".into());
                    args.push(system_prompt.clone());
                }
            }
            Launch::Resume(session) => {
                args.push("--resume".into());
                args.push(session.to_string());
            }
        }

        if let Some(ref model) = options.model {
            args.push("--model".into());
            args.push(model.clone());
        }
        if options.skip_permissions {
            args.push("--dangerously-skip-permissions".into());
        }
        args.extend(options.extra_args.iter().cloned());

        if self.is_fresh() {
            args.push(prompt.to_string());
        }
        args
    }

    /// Prompt text to write on stdin, if this launch reads it from there
    pub fn stdin_prompt<'a>(&self, prompt: &'a str) -> Option<&'a str> {
        match self {
            Launch::Fresh(_) => None,
            Launch::Resume(_) => Some(prompt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_passes_prompt_as_last_argument() {
        let session = SessionHandle::generate();
        let launch = Launch::for_turn(&session, true);
        let args = launch.args("hello there", &LaunchOptions::default());

        assert_eq!(
            args,
            vec![
                "-p",
                "--output-format",
                "stream-json",
                "--verbose",
                "--session-id",
                session.as_str(),
                "hello there",
            ]
        );
        assert_eq!(launch.stdin_prompt("hello there"), None);
    }

    #[test]
    fn test_resume_keeps_prompt_off_the_command_line() {
        let session = SessionHandle::generate();
        let launch = Launch::for_turn(&session, false);
        let args = launch.args("secret follow-up", &LaunchOptions::default());

        assert!(args.windows(2).any(|w| w[0] == "--resume" && w[1] == session.as_str()));
        assert!(!args.iter().any(|a| a == "--session-id"));
        assert!(!args.iter().any(|a| a == "secret follow-up"));
        assert_eq!(launch.stdin_prompt("secret follow-up"), Some("secret follow-up"));
    }

    #[test]
    fn test_options_are_forwarded() {
        let session = SessionHandle::generate();
        let options = LaunchOptions {
            model: Some("sonnet".into()),
            system_prompt: Some("You are Hex.".into()),
            skip_permissions: true,
            extra_args: vec!["--add-dir".into(), "/tmp".into()],
        };

        let fresh = Launch::Fresh(session.clone()).args("hi", &options);
        assert!(fresh.windows(2).any(|w| w[0] == "--model" && w[1] == "sonnet"));
        assert!(
            fresh
                .windows(2)
                .any(|w| w[0] == "--append-system-prompt" && w[1] == "You are Hex.")
        );
        assert!(fresh.iter().any(|a| a == "--dangerously-skip-permissions"));
        assert_eq!(fresh.last().map(String::as_str), Some("hi"));
        assert!(fresh.windows(2).any(|w| w[0] == "--add-dir" && w[1] == "/tmp"));

        let resumed = Launch::Resume(session).args("hi", &options);
        assert!(!resumed.iter().any(|a| a == "--append-system-prompt"));
        assert_eq!(resumed.last().map(String::as_str), Some("/tmp"));
    }
}
