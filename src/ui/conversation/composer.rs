use crate::ui::conversation::commands::{command_entries, parse_slash_command, CommandEntry, ParsedCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ConversationResult {
    Submitted(String),
    Command(ParsedCommand),
    Token(String),
    None,
}

/// What the composer is currently collecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Chat messages and slash commands
    Chat,
    /// A secret API token, rendered masked
    Token,
}

/// Single-line input box for messages, commands and the API token
pub struct ConversationComposer {
    content: String,
    /// Cursor position in characters
    cursor: usize,
    mode: InputMode,
    has_focus: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl ConversationComposer {
    pub fn new(mode: InputMode) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            mode,
            has_focus: true,
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationResult {
        if key.kind != KeyEventKind::Press {
            return ConversationResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if self.show_command_palette && self.apply_selected_command() {
                    return ConversationResult::None;
                }
                if self.content.trim().is_empty() {
                    return ConversationResult::None;
                }

                let content = std::mem::take(&mut self.content);
                self.cursor = 0;
                self.close_command_palette();

                if self.mode == InputMode::Token && !content.starts_with('/') {
                    return ConversationResult::Token(content);
                }
                if let Some(command) = parse_slash_command(&content) {
                    return ConversationResult::Command(command);
                }
                return match self.mode {
                    InputMode::Chat => ConversationResult::Submitted(content),
                    InputMode::Token => ConversationResult::Token(content),
                };
            }
            KeyCode::Up if self.show_command_palette => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette => self.move_command_selection(1),
            KeyCode::Esc if self.show_command_palette => self.close_command_palette(),
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_char(c);
                self.sync_command_palette();
            }
            KeyCode::Backspace => {
                if self.backspace() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Delete => {
                if self.delete() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.char_len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.char_len(),
            _ => {}
        }

        ConversationResult::None
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    /// Insert a character at the cursor position
    fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
        true
    }

    /// Delete character at cursor
    fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
        true
    }

    fn sync_command_palette(&mut self) {
        let typing_command = self.content.starts_with('/') && !self.content.contains(char::is_whitespace);
        if typing_command {
            if !self.show_command_palette {
                self.show_command_palette = true;
                self.selected_command = Some(0);
            }
            self.refresh_command_palette();
        } else if self.show_command_palette {
            self.close_command_palette();
        }
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self) {
        let query = self.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        self.selected_command = if self.filtered_commands.is_empty() {
            None
        } else {
            let index = self.selected_command.unwrap_or(0);
            Some(index.min(self.filtered_commands.len() - 1))
        };
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        self.selected_command = Some((current + delta).rem_euclid(len) as usize);
    }

    fn apply_selected_command(&mut self) -> bool {
        let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index))
            .copied()
        else {
            return false;
        };

        self.content = format!("/{} ", entry.keyword);
        self.cursor = self.char_len();
        self.close_command_palette();
        true
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            self.clear();
        }
        self.mode = mode;
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Set focus state
    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    /// Get current content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Clear content
    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.close_command_palette();
    }

    fn title(&self) -> &'static str {
        match self.mode {
            InputMode::Chat => "💬 Message - Enter to send, / for commands",
            InputMode::Token => "🔑 Replicate API token",
        }
    }

    fn placeholder(&self) -> &'static str {
        match self.mode {
            InputMode::Chat => "Ask Arctic anything...",
            InputMode::Token => "Paste your token (r8_...) - get one at https://replicate.com",
        }
    }

    fn display_text(&self) -> String {
        match self.mode {
            InputMode::Token if !self.content.starts_with('/') => "•".repeat(self.char_len()),
            _ => self.content.clone(),
        }
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title())
            .style(if self.has_focus {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut text = self.display_text();
            if self.has_focus {
                let at = text
                    .char_indices()
                    .nth(self.cursor)
                    .map(|(i, _)| i)
                    .unwrap_or(text.len());
                text.insert(at, '▌');
            }

            // Keep the cursor end visible when the text is wider than the box
            let width = inner_area.width as usize;
            let chars: Vec<char> = text.chars().collect();
            let start = chars.len().saturating_sub(width);
            let visible: String = chars[start..].iter().collect();
            buf.set_line(inner_area.x, inner_area.y, &Line::from(visible), inner_area.width);
        }

        if self.show_command_palette && !self.filtered_commands.is_empty() {
            let palette_height = (self.filtered_commands.len().min(7) + 2) as u16;
            let palette_area = Rect {
                x: area.x,
                y: area.y.saturating_sub(palette_height),
                width: area.width,
                height: palette_height.min(area.y),
            };
            if palette_area.height < 3 {
                return;
            }

            Clear.render(palette_area, buf);
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            for (index, entry) in self.filtered_commands.iter().enumerate() {
                if index >= inner.height as usize {
                    break;
                }

                let style = if self.selected_command == Some(index) {
                    Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled(" — ", Style::default().fg(Color::DarkGray)),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);

                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::conversation::commands::SlashCommand;

    fn press(composer: &mut ConversationComposer, code: KeyCode) -> ConversationResult {
        composer.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            press(composer, KeyCode::Char(c));
        }
    }

    #[test]
    fn enter_submits_message_and_clears() {
        let mut composer = ConversationComposer::new(InputMode::Chat);
        type_str(&mut composer, "What is 2+2?");

        assert_eq!(
            press(&mut composer, KeyCode::Enter),
            ConversationResult::Submitted("What is 2+2?".to_string())
        );
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut composer = ConversationComposer::new(InputMode::Chat);
        type_str(&mut composer, "   ");
        assert_eq!(press(&mut composer, KeyCode::Enter), ConversationResult::None);
    }

    #[test]
    fn editing_handles_multibyte_characters() {
        let mut composer = ConversationComposer::new(InputMode::Chat);
        type_str(&mut composer, "café");
        press(&mut composer, KeyCode::Left);
        press(&mut composer, KeyCode::Backspace);
        assert_eq!(composer.content(), "caé");
        press(&mut composer, KeyCode::Delete);
        assert_eq!(composer.content(), "ca");
    }

    #[test]
    fn slash_input_becomes_command() {
        let mut composer = ConversationComposer::new(InputMode::Chat);
        type_str(&mut composer, "/temperature 0.8");

        match press(&mut composer, KeyCode::Enter) {
            ConversationResult::Command(command) => {
                assert_eq!(command.command, SlashCommand::Temperature);
                assert_eq!(command.value(), Some(0.8));
            }
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn palette_completes_selected_command() {
        let mut composer = ConversationComposer::new(InputMode::Chat);
        type_str(&mut composer, "/cl");
        press(&mut composer, KeyCode::Tab);
        assert_eq!(composer.content(), "/clear ");
    }

    #[test]
    fn token_mode_returns_token() {
        let mut composer = ConversationComposer::new(InputMode::Token);
        type_str(&mut composer, "r8_secret");
        assert_eq!(composer.display_text(), "•••••••••");
        assert_eq!(
            press(&mut composer, KeyCode::Enter),
            ConversationResult::Token("r8_secret".to_string())
        );
    }
}
