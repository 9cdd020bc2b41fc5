//! Styles for transcript speakers, the input box and the status bar

use super::transcript::{ChatMessage, Speaker};
use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    user: Color,
    agent: Color,
    notice: Color,
    failure: Color,
    text: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            user: Color::Cyan,
            agent: Color::Green,
            notice: Color::DarkGray,
            failure: Color::Red,
            text: Color::White,
        }
    }

    /// Label and style of a transcript entry's header line
    pub fn header(&self, speaker: Speaker) -> (&'static str, Style) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        match speaker {
            Speaker::User => ("▶ You", bold.fg(self.user)),
            Speaker::Agent => ("◀ Agent", bold.fg(self.agent)),
            Speaker::System => ("● hex", Style::default().fg(self.notice)),
        }
    }

    pub fn body(&self, msg: &ChatMessage) -> Style {
        let color = if msg.is_error {
            self.failure
        } else if msg.speaker == Speaker::System {
            self.notice
        } else {
            self.text
        };
        Style::default().fg(color)
    }

    /// Spinner and other "turn in progress" markers
    pub fn busy(&self) -> Style {
        Style::default().fg(self.user)
    }

    pub fn quiet(&self) -> Style {
        Style::default().fg(self.notice)
    }

    pub fn typed(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn cursor(&self) -> Style {
        Style::default().bg(self.user)
    }
}
