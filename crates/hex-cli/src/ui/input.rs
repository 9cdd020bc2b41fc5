//! Key handling and the single-line input box

use super::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Processed input action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Char(char),
    /// Enter
    Submit,
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Escape,
    /// Ctrl+C
    Interrupt,
    /// Ctrl+D
    Eof,
    /// Ctrl+U
    ClearLine,
    /// Ctrl+W
    DeleteWord,
    /// Bracketed paste
    Paste(String),
    Unknown,
}

impl Action {
    /// Keys that leave the TUI
    pub fn is_quit(&self) -> bool {
        matches!(self, Action::Interrupt | Action::Eof | Action::Escape)
    }
}

/// Convert a crossterm key event to an action
pub fn key_to_action(event: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Interrupt,
            KeyCode::Char('d') => Action::Eof,
            KeyCode::Char('u') => Action::ClearLine,
            KeyCode::Char('w') => Action::DeleteWord,
            KeyCode::Char('a') => Action::Home,
            KeyCode::Char('e') => Action::End,
            _ => Action::Unknown,
        };
    }

    if modifiers.contains(KeyModifiers::ALT) {
        return Action::Unknown;
    }

    match code {
        KeyCode::Char(c) => Action::Char(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Esc => Action::Escape,
        _ => Action::Unknown,
    }
}

/// Single-line text input
#[derive(Debug, Default)]
pub struct InputBox {
    content: String,
    /// Cursor position (character index, not byte index)
    cursor: usize,
    /// Horizontal scroll offset (in display width)
    scroll: usize,
    placeholder: String,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Take the content, leaving the box empty
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        self.scroll = 0;
        std::mem::take(&mut self.content)
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn cursor_display_width(&self) -> usize {
        self.content
            .chars()
            .take(self.cursor)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    /// Apply an editing action. Returns whether anything changed.
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        let char_count = self.content.chars().count();

        let changed = match action {
            Action::Char(c) => {
                self.insert_char(*c);
                true
            }
            Action::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.remove_at_cursor();
                true
            }
            Action::Delete if self.cursor < char_count => {
                self.remove_at_cursor();
                true
            }
            Action::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Action::Right if self.cursor < char_count => {
                self.cursor += 1;
                true
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = char_count;
                true
            }
            Action::ClearLine => {
                self.take();
                true
            }
            Action::DeleteWord => {
                let chars: Vec<char> = self.content.chars().collect();
                let mut start = self.cursor;
                while start > 0 && chars[start - 1] == ' ' {
                    start -= 1;
                }
                while start > 0 && chars[start - 1] != ' ' {
                    start -= 1;
                }
                let range = self.byte_offset(start)..self.byte_offset(self.cursor);
                self.content.drain(range);
                self.cursor = start;
                true
            }
            Action::Paste(text) => {
                for c in text.chars() {
                    if c == '\n' || c == '\r' {
                        if !self.content.ends_with(' ') && self.cursor > 0 {
                            self.insert_char(' ');
                        }
                    } else {
                        self.insert_char(c);
                    }
                }
                true
            }
            _ => false,
        };

        if changed {
            self.update_scroll(width as usize);
        }
        changed
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    fn remove_at_cursor(&mut self) {
        let start = self.byte_offset(self.cursor);
        let end = self.byte_offset(self.cursor + 1);
        self.content.drain(start..end);
    }

    fn update_scroll(&mut self, width: usize) {
        // Borders and padding
        let visible_width = width.saturating_sub(4).max(1);
        let cursor_pos = self.cursor_display_width();

        if cursor_pos < self.scroll {
            self.scroll = cursor_pos;
        } else if cursor_pos >= self.scroll + visible_width {
            self.scroll = cursor_pos - visible_width + 1;
        }
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.busy());

        let inner = block.inner(area);
        block.render(area, buf);

        let (text, style) = if self.content.is_empty() {
            (self.placeholder.clone(), theme.quiet())
        } else {
            (self.visible_text(inner.width as usize), theme.typed())
        };
        Paragraph::new(text).style(style).render(inner, buf);

        if inner.width > 0 {
            let cursor_x = self.cursor_display_width().saturating_sub(self.scroll);
            if cursor_x < inner.width as usize {
                if let Some(cell) = buf.cell_mut((inner.x + cursor_x as u16, inner.y)) {
                    cell.set_style(theme.cursor());
                }
            }
        }
    }

    /// The slice of content that fits after horizontal scrolling
    fn visible_text(&self, visible_width: usize) -> String {
        let mut skipped = 0;
        let mut used = 0;
        let mut visible = String::new();
        for c in self.content.chars() {
            let w = c.width().unwrap_or(0);
            if skipped < self.scroll {
                skipped += w;
                continue;
            }
            if used + w > visible_width {
                break;
            }
            visible.push(c);
            used += w;
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputBox {
        let mut input = InputBox::new();
        input.handle_action(&Action::Paste(text.into()), 80);
        input
    }

    #[test]
    fn test_key_mapping() {
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl('c')), Action::Interrupt);
        assert_eq!(key_to_action(ctrl('d')), Action::Eof);
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            Action::Submit
        );
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::SHIFT)),
            Action::Char('x')
        );
        assert!(key_to_action(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)).is_quit());
        assert!(!Action::Submit.is_quit());
    }

    #[test]
    fn test_editing_multibyte_text() {
        let mut input = typed("héllo");
        input.handle_action(&Action::Left, 80);
        input.handle_action(&Action::Backspace, 80);
        assert_eq!(input.content(), "hélo");

        input.handle_action(&Action::Home, 80);
        input.handle_action(&Action::Delete, 80);
        input.handle_action(&Action::Char('ñ'), 80);
        assert_eq!(input.content(), "ñélo");
    }

    #[test]
    fn test_delete_word_and_take() {
        let mut input = typed("send this now  ");
        input.handle_action(&Action::DeleteWord, 80);
        assert_eq!(input.content(), "send this ");

        assert_eq!(input.take(), "send this ");
        assert_eq!(input.content(), "");
        assert!(!input.handle_action(&Action::Backspace, 80));
    }

    #[test]
    fn test_paste_flattens_newlines() {
        let input = typed("one\r\ntwo\nthree");
        assert_eq!(input.content(), "one two three");
    }

    #[test]
    fn test_scrolls_to_keep_cursor_visible() {
        let mut input = InputBox::new();
        for c in "abcdefghijklmnop".chars() {
            input.handle_action(&Action::Char(c), 10);
        }
        assert_eq!(input.visible_text(6).chars().last(), Some('p'));
        input.handle_action(&Action::Home, 10);
        assert_eq!(input.visible_text(6), "abcdef");
    }
}
