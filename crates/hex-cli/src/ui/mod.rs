//! TUI implementation for hex

mod input;
mod theme;
mod transcript;

use crossterm::event::{Event, EventStream, MouseEventKind};
use futures::StreamExt;
use hex_agent::{Conversation, ConversationEvent, Rejection};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};

use crate::commands::{CommandResult, execute_command};
use crate::session::ChatSession;
use input::{Action, InputBox, key_to_action};
use theme::Theme;
use transcript::{ChatMessage, Speaker, Transcript, spinner_frame, transcript_height, trim_to_window};

/// TUI application state
pub struct TuiState {
    messages: Vec<ChatMessage>,
    input: InputBox,
    /// Lines scrolled from the top; `usize::MAX` follows the bottom
    scroll: usize,
    is_processing: bool,
    status: String,
    theme: Theme,
    history_window: usize,
    spinner_start: Instant,
}

impl TuiState {
    pub fn new(conversation: &Conversation, history_window: usize) -> Self {
        let mut state = Self {
            messages: vec![],
            input: InputBox::new().with_placeholder("Type a message or /help..."),
            scroll: 0,
            is_processing: false,
            status: "Ready".to_string(),
            theme: Theme::dark(),
            history_window,
            spinner_start: Instant::now(),
        };
        state.load_history(conversation);
        state
    }

    /// Replace the transcript with the conversation's recent turns
    fn load_history(&mut self, conversation: &Conversation) {
        self.messages = conversation
            .recent(self.history_window)
            .into_iter()
            .map(ChatMessage::from)
            .collect();
        self.is_processing = conversation.is_busy();
        self.scroll_to_bottom();
    }

    /// Handle conversation events
    pub fn handle_conversation_event(&mut self, event: ConversationEvent) {
        match event {
            ConversationEvent::TurnStart { turn_number, .. } => {
                self.is_processing = true;
                self.spinner_start = Instant::now();
                self.status = format!("Turn {}...", turn_number);
                if !matches!(self.messages.last(), Some(m) if m.is_streaming) {
                    self.messages.push(ChatMessage::agent_streaming());
                }
                self.scroll_to_bottom();
            }
            ConversationEvent::ReplyUpdate { text } => {
                if let Some(last) = self.messages.last_mut() {
                    if last.is_streaming {
                        last.content = text;
                        self.scroll_to_bottom();
                    }
                }
            }
            ConversationEvent::TurnEnd {
                reply, is_error, ..
            } => {
                match self.messages.last_mut() {
                    Some(last) if last.is_streaming => {
                        last.content = reply;
                        last.is_streaming = false;
                        last.is_error = is_error;
                    }
                    _ => {
                        let mut msg = ChatMessage::system(reply);
                        msg.is_error = is_error;
                        self.messages.push(msg);
                    }
                }
                self.is_processing = false;
                self.status = if is_error {
                    "Agent failed".to_string()
                } else {
                    "Ready".to_string()
                };
                trim_to_window(&mut self.messages, self.history_window);
                self.scroll_to_bottom();
            }
        }
    }

    /// A submission was refused before reaching the agent
    fn handle_rejection(&mut self, rejection: Rejection) {
        // The optimistic entries never became turns.
        if let Some(pos) = self.messages.iter().rposition(|m| m.is_streaming) {
            self.messages.remove(pos);
        }
        if let Some(pos) = self
            .messages
            .iter()
            .rposition(|m| m.speaker == Speaker::User)
        {
            self.messages.remove(pos);
        }
        self.is_processing = false;
        self.show_system_message(&format!("Not sent: {}", rejection));
    }

    fn scroll_to_bottom(&mut self) {
        // Resolved during render once the content height is known
        self.scroll = usize::MAX;
    }

    /// Show a system message
    pub fn show_system_message(&mut self, content: &str) {
        self.messages.push(ChatMessage::system(content));
        self.scroll_to_bottom();
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame, session: &ChatSession) {
        let size = frame.area();

        // Layout: messages (flex), status bar (1), input (3)
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(size);

        self.render_messages(frame, chunks[0], session);
        self.render_status(frame, chunks[1], session.conversation());
        self.input
            .render(chunks[2], frame.buffer_mut(), &self.theme);
    }

    fn render_messages(&mut self, frame: &mut Frame, area: Rect, session: &ChatSession) {
        let title = format!(" hex │ {} ", session.system().context_line());
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.quiet())
            .title(title);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.height == 0 || self.messages.is_empty() {
            frame.render_widget(welcome(), inner);
            return;
        }

        let content_height = transcript_height(&self.messages, inner.width as usize);
        let max_scroll = content_height.saturating_sub(inner.height as usize);
        self.scroll = self.scroll.min(max_scroll);

        let transcript =
            Transcript::new(&self.messages, &self.theme, self.spinner_start).scroll(self.scroll);
        frame.render_widget(transcript, inner);

        if content_height > inner.height as usize {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");

            let mut scrollbar_state = ScrollbarState::new(content_height)
                .position(self.scroll)
                .viewport_content_length(inner.height as usize);

            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect, conversation: &Conversation) {
        let left_content = if self.is_processing {
            format!(
                "{} {} │ session {}",
                spinner_frame(self.spinner_start),
                self.status,
                conversation.session().short()
            )
        } else {
            format!(
                "session {} │ {} turns │ {}",
                conversation.session().short(),
                conversation.turn_count(),
                self.status
            )
        };
        let left_style = if self.is_processing {
            self.theme.busy()
        } else {
            self.theme.quiet()
        };
        let right_content = "Enter: send │ /help │ Ctrl+C: quit";

        let left_width = left_content.chars().count();
        let right_width = right_content.chars().count();
        let available = area.width as usize;

        let line = if left_width + right_width + 2 <= available {
            let spacing = available - left_width - right_width;
            Line::from(vec![
                Span::styled(left_content, left_style),
                Span::raw(" ".repeat(spacing)),
                Span::styled(right_content, self.theme.quiet()),
            ])
        } else {
            Line::from(Span::styled(left_content, left_style))
        };

        frame.render_widget(Paragraph::new(line), area);
    }
}

fn welcome() -> Paragraph<'static> {
    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(k, Style::default().fg(Color::Cyan)),
            Span::styled(what, Style::default().fg(Color::White)),
        ])
    };
    Paragraph::new(vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "  ⬡ ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "hex",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                " - chat with your local agent",
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Keybindings",
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
        key("    Enter     ", "Send message"),
        key("    PgUp/Dn   ", "Scroll history"),
        key("    Ctrl+C    ", "Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "  Type a message to get started, or /help for commands...",
            Style::default().fg(Color::DarkGray),
        )),
    ])
}

/// What the key loop should do after an action
enum Flow {
    Continue,
    Quit,
}

/// Run the TUI application
pub async fn run_tui(session: &mut ChatSession, history_window: usize) -> anyhow::Result<()> {
    use crossterm::{
        event::{DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };
    use ratatui::{Terminal, backend::CrosstermBackend};
    use std::io;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Rejections come back from the spawned submit tasks
    let (reject_tx, mut reject_rx) = mpsc::channel::<Rejection>(32);

    let mut state = TuiState::new(session.conversation(), history_window);
    let mut events = session.conversation().subscribe();
    let mut event_stream = EventStream::new();

    // Tick interval for animations (80ms for smooth spinner)
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(80));

    let result = loop {
        terminal.draw(|frame| state.render(frame, session))?;
        let area_width = terminal.size()?.width;

        tokio::select! {
            biased;

            event = events.recv() => {
                match event {
                    Ok(event) => state.handle_conversation_event(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::debug!("transcript skipped {} updates", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {}
                }
            }

            Some(rejection) = reject_rx.recv() => {
                state.handle_rejection(rejection);
            }

            event = event_stream.next() => {
                match event {
                    Some(Ok(Event::Key(key))) => {
                        let action = key_to_action(key);
                        match handle_action(&mut state, session, &mut events, &reject_tx, action, area_width) {
                            Flow::Continue => {}
                            Flow::Quit => break Ok(()),
                        }
                    }
                    Some(Ok(Event::Paste(text))) => {
                        state.input.handle_action(&Action::Paste(text), area_width);
                    }
                    Some(Ok(Event::Mouse(mouse))) => {
                        match mouse.kind {
                            MouseEventKind::ScrollUp => {
                                state.scroll = state.scroll.saturating_sub(3);
                            }
                            MouseEventKind::ScrollDown => {
                                state.scroll = state.scroll.saturating_add(3);
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        break Err(anyhow::anyhow!("Event error: {}", e));
                    }
                    None => {
                        break Ok(());
                    }
                }
            }

            // Tick for animations (spinner updates)
            _ = tick_interval.tick() => {}
        }
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    if session.conversation().is_busy() {
        tracing::info!("exiting with a turn in flight; the agent process is left to finish");
    }

    result
}

fn handle_action(
    state: &mut TuiState,
    session: &mut ChatSession,
    events: &mut broadcast::Receiver<ConversationEvent>,
    reject_tx: &mpsc::Sender<Rejection>,
    action: Action,
    width: u16,
) -> Flow {
    if action.is_quit() {
        return Flow::Quit;
    }

    match action {
        Action::Submit => {
            let content = state.input.content().trim().to_string();
            if content.is_empty() {
                return Flow::Continue;
            }

            if let Some(result) = execute_command(&content, session) {
                state.input.take();
                match result {
                    CommandResult::Message(msg) => state.show_system_message(&msg),
                    CommandResult::NewConversation => {
                        let conversation = session.restart();
                        *events = conversation.subscribe();
                        state.load_history(conversation);
                        state.status = "Ready".to_string();
                        state.show_system_message(&format!(
                            "Started a new conversation ({})",
                            conversation.session().short()
                        ));
                    }
                    CommandResult::Exit => return Flow::Quit,
                    CommandResult::Unknown(cmd) => state.show_system_message(&format!(
                        "Unknown command: /{}\nType /help for available commands.",
                        cmd
                    )),
                }
                return Flow::Continue;
            }

            // Keep the draft while a reply is still streaming in.
            if state.is_processing {
                state.status = "Still waiting for the previous reply".to_string();
                return Flow::Continue;
            }

            state.input.take();
            state.messages.push(ChatMessage::user(&content));
            state.messages.push(ChatMessage::agent_streaming());
            state.is_processing = true;
            state.spinner_start = Instant::now();
            state.scroll_to_bottom();

            let conversation = Arc::clone(session.conversation());
            let reject_tx = reject_tx.clone();
            tokio::spawn(async move {
                if let Err(rejection) = conversation.submit(&content).await {
                    let _ = reject_tx.send(rejection).await;
                }
            });
        }
        Action::PageUp => {
            state.scroll = state.scroll.saturating_sub(10);
        }
        Action::PageDown => {
            state.scroll = state.scroll.saturating_add(10);
        }
        other => {
            state.input.handle_action(&other, width);
        }
    }
    Flow::Continue
}
