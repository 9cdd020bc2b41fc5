//! Transcript widget: the visible slice of the conversation

use super::theme::Theme;
use hex_agent::{Role, Turn};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::time::{Duration, Instant};

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SPINNER_FRAME: Duration = Duration::from_millis(80);

/// Who a transcript entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent,
    /// Local notices such as slash command output
    System,
}

/// A single entry in the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub content: String,
    pub is_error: bool,
    /// The reply is still being produced
    pub is_streaming: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            content: content.into(),
            is_error: false,
            is_streaming: false,
        }
    }

    pub fn agent_streaming() -> Self {
        Self {
            speaker: Speaker::Agent,
            content: String::new(),
            is_error: false,
            is_streaming: true,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::System,
            content: content.into(),
            is_error: false,
            is_streaming: false,
        }
    }

    pub fn is_turn(&self) -> bool {
        self.speaker != Speaker::System
    }
}

impl From<Turn> for ChatMessage {
    fn from(turn: Turn) -> Self {
        let speaker = match turn.role {
            Role::User => Speaker::User,
            Role::Assistant => Speaker::Agent,
        };
        Self {
            speaker,
            content: turn.text,
            is_error: false,
            is_streaming: false,
        }
    }
}

/// Drop the oldest entries until at most `window` conversation turns remain.
/// Notices older than the oldest kept turn go with it.
pub fn trim_to_window(messages: &mut Vec<ChatMessage>, window: usize) {
    let turns = messages.iter().filter(|m| m.is_turn()).count();
    let mut excess = turns.saturating_sub(window);
    if excess == 0 {
        return;
    }
    let cut = messages
        .iter()
        .position(|m| {
            if m.is_turn() {
                if excess == 0 {
                    return true;
                }
                excess -= 1;
            }
            false
        })
        .unwrap_or(messages.len());
    messages.drain(..cut);
}

/// Current spinner glyph for an animation started at `start`
pub fn spinner_frame(start: Instant) -> &'static str {
    let index = (start.elapsed().as_millis() / SPINNER_FRAME.as_millis()) as usize;
    SPINNER_FRAMES[index % SPINNER_FRAMES.len()]
}

/// Renders chat messages with wrapping, skipping `scroll` lines from the top
pub struct Transcript<'a> {
    messages: &'a [ChatMessage],
    theme: &'a Theme,
    scroll: usize,
    spinner_start: Instant,
}

impl<'a> Transcript<'a> {
    pub fn new(messages: &'a [ChatMessage], theme: &'a Theme, spinner_start: Instant) -> Self {
        Self {
            messages,
            theme,
            scroll: 0,
            spinner_start,
        }
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    fn render_message(&self, msg: &ChatMessage, width: usize) -> Vec<Line<'static>> {
        let (label, header_style) = self.theme.header(msg.speaker);
        let header = if msg.is_streaming {
            format!("{} ▌", label)
        } else {
            label.to_string()
        };

        let mut lines = vec![Line::from(Span::styled(header, header_style))];

        if msg.is_streaming && msg.content.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("  {} waiting for the agent...", spinner_frame(self.spinner_start)),
                self.theme.busy(),
            )));
        } else {
            let style = self.theme.body(msg);
            for line in wrap_content(&msg.content, width) {
                lines.push(Line::from(Span::styled(format!("  {}", line), style)));
            }
        }

        lines.push(Line::from(""));
        lines
    }
}

impl Widget for Transcript<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let width = area.width as usize;
        let visible: Vec<Line> = self
            .messages
            .iter()
            .flat_map(|msg| self.render_message(msg, width))
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();

        Paragraph::new(visible)
            .style(Style::default())
            .render(area, buf);
    }
}

fn wrap_content(content: &str, width: usize) -> Vec<String> {
    let content_width = width.saturating_sub(2).max(1);
    textwrap::wrap(content, content_width)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

/// Total rendered height of `messages` at `width`. Must match `render_message`.
pub fn transcript_height(messages: &[ChatMessage], width: usize) -> usize {
    messages
        .iter()
        .map(|msg| {
            let body = if msg.is_streaming && msg.content.is_empty() {
                1
            } else {
                wrap_content(&msg.content, width).len()
            };
            // Header and separator
            body + 2
        })
        .sum()
}
