use crate::config::Config;
use crate::conversation::Message;
use crate::error::ChatResult;
use crate::llm::LlmEvent;
use crate::session::ChatSession;
use crate::ui::conversation::{
    get_help_text, ConversationComposer, ConversationHistory, ConversationResult, InputMode, Notice,
    ParsedCommand, Sidebar, SlashCommand,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info};

const SIDEBAR_WIDTH: u16 = 34;
const SCROLL_STEP: usize = 5;

/// Terminal chat application state
pub struct App {
    session: ChatSession,
    model: String,
    show_timestamps: bool,
    composer: ConversationComposer,
    stream_receiver: Option<mpsc::Receiver<LlmEvent>>,
    notice: Option<Notice>,
    scroll_offset: usize,
    /// Scroll limit measured at the last draw
    max_scroll: usize,
    should_quit: bool,
}

impl App {
    pub fn new(session: ChatSession, config: &Config) -> Self {
        let (mode, notice) = if session.has_credential() {
            (InputMode::Chat, None)
        } else {
            (
                InputMode::Token,
                Some(Notice::warning(
                    "Please enter your Replicate API token, or head over to https://replicate.com to create one.",
                )),
            )
        };

        Self {
            session,
            model: config.model.clone(),
            show_timestamps: config.ui.show_timestamps,
            composer: ConversationComposer::new(mode),
            stream_receiver: None,
            notice,
            scroll_offset: 0,
            max_scroll: 0,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let steps = if key.modifiers.contains(KeyModifiers::SHIFT) { 10 } else { 1 };

        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => self.should_quit = true,
            KeyCode::Char('l') if ctrl => self.clear_history(),
            KeyCode::F(2) => self.session.params_mut().nudge_temperature(-steps),
            KeyCode::F(3) => self.session.params_mut().nudge_temperature(steps),
            KeyCode::F(4) => self.session.params_mut().nudge_top_p(-steps),
            KeyCode::F(5) => self.session.params_mut().nudge_top_p(steps),
            KeyCode::PageUp => {
                self.scroll_offset = (self.scroll_offset + SCROLL_STEP).min(self.max_scroll);
            }
            KeyCode::PageDown => self.scroll_offset = self.scroll_offset.saturating_sub(SCROLL_STEP),
            _ => match self.composer.handle_key(key) {
                ConversationResult::Submitted(input) => self.submit(&input),
                ConversationResult::Token(token) => self.set_token(&token),
                ConversationResult::Command(command) => self.handle_slash_command(command),
                ConversationResult::None => {}
            },
        }
    }

    fn submit(&mut self, input: &str) {
        let result = self.session.submit(input);
        self.start_stream(result);
    }

    fn start_stream(&mut self, result: ChatResult<mpsc::Receiver<LlmEvent>>) {
        match result {
            Ok(rx) => {
                self.stream_receiver = Some(rx);
                self.composer.set_focus(false);
                self.notice = None;
                self.scroll_offset = 0;
            }
            Err(e) => self.notice = Some(Notice::warning(e.to_string())),
        }
    }

    fn set_token(&mut self, raw: &str) {
        match self.session.set_credential(raw) {
            Ok(()) => {
                self.composer.set_mode(InputMode::Chat);
                self.notice = Some(Notice::info("API token accepted. Ask Arctic anything."));
            }
            Err(e) => self.notice = Some(Notice::warning(e.to_string())),
        }
    }

    fn clear_history(&mut self) {
        match self.session.clear_history() {
            Ok(()) => {
                self.scroll_offset = 0;
                self.notice = None;
            }
            Err(e) => self.notice = Some(Notice::warning(e.to_string())),
        }
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) {
        debug!(command = command.command.command(), "slash command");

        if self.session.is_streaming() && !command.command.available_during_streaming() {
            self.notice = Some(Notice::warning(format!(
                "/{} is not available while Arctic is responding",
                command.command.command()
            )));
            return;
        }

        match command.command {
            SlashCommand::Clear => self.clear_history(),
            SlashCommand::Retry => {
                let result = self.session.retry();
                self.start_stream(result);
            }
            SlashCommand::Temperature | SlashCommand::TopP => self.set_param(&command),
            SlashCommand::Token => match command.argument() {
                Some(raw) => self.set_token(raw),
                None => {
                    self.composer.set_mode(InputMode::Token);
                    self.notice = Some(Notice::info("Paste your Replicate API token and press Enter."));
                }
            },
            SlashCommand::Help => self.notice = Some(Notice::info(get_help_text())),
            SlashCommand::Bye => self.should_quit = true,
        }
    }

    fn set_param(&mut self, command: &ParsedCommand) {
        let name = command.command.command();
        let Some(value) = command.value() else {
            self.notice = Some(Notice::warning(format!("usage: /{} <number>", name)));
            return;
        };

        let params = self.session.params_mut();
        let result = match command.command {
            SlashCommand::Temperature => params.set_temperature(value).map(|()| params.temperature),
            _ => params.set_top_p(value).map(|()| params.top_p),
        };

        self.notice = Some(match result {
            Ok(stored) => {
                info!(param = name, value = stored, "generation parameter changed");
                Notice::info(format!("{} set to {}", name, stored))
            }
            Err(e) => Notice::warning(e.to_string()),
        });
    }

    /// Drain whatever the stream has produced so far (called from main loop)
    pub fn process_streaming_events(&mut self) {
        let Some(rx) = self.stream_receiver.as_mut() else {
            return;
        };

        let mut outcome = None;
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    if let Some(done) = self.session.handle_event(event) {
                        outcome = Some(done);
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    outcome = self.session.stream_closed();
                    self.stream_receiver = None;
                    break;
                }
            }
        }

        if let Some(outcome) = outcome {
            self.finish_turn(outcome);
        }
    }

    fn finish_turn(&mut self, outcome: ChatResult<Message>) {
        self.stream_receiver = None;
        self.composer.set_focus(true);
        match outcome {
            Ok(message) => debug!(chars = message.content().len(), "response shown"),
            Err(e) => {
                self.notice = Some(Notice::error(format!("{}. Use /retry to try again.", e)));
            }
        }
    }

    pub fn draw(&mut self, frame: &mut Frame) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(SIDEBAR_WIDTH)])
            .split(frame.size());

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // History
                Constraint::Length(3), // Composer
            ])
            .split(columns[0]);

        let history = ConversationHistory::new(self.session.conversation().messages())
            .streaming(self.session.partial_response())
            .notice(self.notice.as_ref())
            .show_timestamps(self.show_timestamps);
        self.max_scroll = history.max_scroll(rows[0]);
        self.scroll_offset = self.scroll_offset.min(self.max_scroll);
        frame.render_widget(history.scroll_offset(self.scroll_offset), rows[0]);
        frame.render_widget(&self.composer, rows[1]);

        frame.render_widget(
            Sidebar {
                model: &self.model,
                has_credential: self.session.has_credential(),
                params: self.session.params(),
                streaming: self.session.is_streaming(),
            },
            columns[1],
        );
    }
}
