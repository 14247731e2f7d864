//! Conversation history display component

use crate::conversation::{Message, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Severity of a transient UI notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message from the app itself, shown under the history but never sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, text: text.into() }
    }
}

/// Conversation history display component
pub struct ConversationHistory<'a> {
    messages: &'a [Message],
    streaming_message: Option<&'a str>,
    notice: Option<&'a Notice>,
    show_timestamps: bool,
    /// Lines scrolled up from the bottom
    scroll_offset: usize,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: &'a [Message]) -> Self {
        Self {
            messages,
            streaming_message: None,
            notice: None,
            show_timestamps: true,
            scroll_offset: 0,
        }
    }

    pub fn streaming(mut self, text: Option<&'a str>) -> Self {
        self.streaming_message = text;
        self
    }

    pub fn notice(mut self, notice: Option<&'a Notice>) -> Self {
        self.notice = notice;
        self
    }

    pub fn show_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    pub fn scroll_offset(mut self, offset: usize) -> Self {
        self.scroll_offset = offset;
        self
    }

    /// Furthest the view can scroll up when drawn into `area`
    pub fn max_scroll(&self, area: Rect) -> usize {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        self.lines(inner.width).len().saturating_sub(inner.height as usize)
    }

    /// Every line the history would render at `width`, oldest first
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for message in self.messages {
            all_lines.extend(self.render_message(message, width));
            // spacing between messages
            all_lines.push(Line::from(""));
        }

        if let Some(text) = self.streaming_message {
            all_lines.extend(render_streaming_message(text, width));
        }

        if let Some(notice) = self.notice {
            all_lines.extend(render_notice(notice, width));
        }

        all_lines
    }

    fn render_message(&self, message: &Message, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let mut header = format!("{} {}", role_icon(message.role()), role_label(message.role()));
        if self.show_timestamps {
            header.push(' ');
            header.push_str(&message.timestamp().with_timezone(&chrono::Local).format("%H:%M:%S").to_string());
        }
        header.push(' ');
        header.push_str(&"─".repeat(20));

        lines.push(Line::from(vec![Span::styled(
            header,
            Style::default().fg(Color::DarkGray),
        )]));

        for content_line in wrap_text(message.content(), width.saturating_sub(2) as usize) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(content_line, content_style(message.role())),
            ]));
        }

        lines
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = Block::default().borders(Borders::ALL).inner(area);
        let all_lines = self.lines(inner_area.width);

        // Anchor to the bottom, then walk back by the scroll offset
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let offset = self.scroll_offset.min(total.saturating_sub(height));

        let title = if offset > 0 {
            format!("💬 Conversation (↑{} lines)", offset)
        } else {
            "💬 Conversation".to_string()
        };
        Block::default().borders(Borders::ALL).title(title).render(area, buf);

        let end = total - offset;
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

fn role_icon(role: Role) -> &'static str {
    match role {
        Role::User => "👤",
        Role::Assistant => "❄️",
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Arctic",
    }
}

/// Get content style based on role
fn content_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Blue),
        Role::Assistant => Style::default().fg(Color::Green),
    }
}

/// Render a streaming message with typing indicator
fn render_streaming_message(text: &str, width: u16) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![Span::styled(
        format!("{} {} {}", role_icon(Role::Assistant), role_label(Role::Assistant), "─".repeat(20)),
        Style::default().fg(Color::DarkGray),
    )])];

    let content_lines = wrap_text(text, width.saturating_sub(3) as usize);
    let last = content_lines.len().saturating_sub(1);
    for (i, content_line) in content_lines.into_iter().enumerate() {
        let cursor = if i == last { "▋" } else { "" };
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, Style::default().fg(Color::Green)),
            Span::styled(cursor, Style::default().fg(Color::Yellow)),
        ]));
    }

    lines
}

fn render_notice(notice: &Notice, width: u16) -> Vec<Line<'static>> {
    let (icon, style) = match notice.level {
        NoticeLevel::Info => ("ℹ️ ", Style::default().fg(Color::Cyan)),
        NoticeLevel::Warning => ("⚠️ ", Style::default().fg(Color::Yellow)),
        NoticeLevel::Error => ("❌ ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
    };

    wrap_text(&notice.text, width.saturating_sub(3) as usize)
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let prefix = if i == 0 { icon } else { "   " };
            Line::from(vec![Span::styled(prefix, style), Span::styled(text, style)])
        })
        .collect()
}

/// Wrap text to fit within the given width, keeping explicit line breaks
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut current_line));
                current_len = 0;
            }
            if current_len > 0 {
                current_line.push(' ');
                current_len += 1;
            }

            // Hard-break words longer than a whole line
            let mut chars = word.chars().peekable();
            while chars.peek().is_some() {
                if current_len == width {
                    lines.push(std::mem::take(&mut current_line));
                    current_len = 0;
                }
                if let Some(c) = chars.next() {
                    current_line.push(c);
                    current_len += 1;
                }
            }
        }

        lines.push(current_line);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_text("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
    }

    #[test]
    fn keeps_paragraph_breaks() {
        assert_eq!(wrap_text("one\n\ntwo", 20), vec!["one", "", "two"]);
    }

    #[test]
    fn hard_breaks_long_words() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn title_shows_clamped_scroll_offset() {
        let messages = vec![Message::assistant("one"), Message::user("two")];
        let area = Rect::new(0, 0, 40, 6);
        let mut buf = Buffer::empty(area);

        let history = ConversationHistory::new(&messages).show_timestamps(false);
        let limit = history.max_scroll(area);
        history.scroll_offset(500).render(area, &mut buf);

        let title: String = (0..area.width).map(|x| buf.get(x, 0).symbol()).collect();
        assert!(!title.contains("500"));
        assert!(title.contains(&format!("↑{} lines", limit)));
    }

    #[test]
    fn lines_include_streaming_text_and_notice() {
        let messages = vec![Message::assistant("Hello"), Message::user("What is 2+2?")];
        let notice = Notice::warning("token missing");
        let history = ConversationHistory::new(&messages)
            .streaming(Some("4, obv"))
            .notice(Some(&notice))
            .show_timestamps(false);

        let rendered: Vec<String> = history
            .lines(40)
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();

        let hello = rendered.iter().position(|l| l.contains("Hello")).unwrap();
        let question = rendered.iter().position(|l| l.contains("What is 2+2?")).unwrap();
        let partial = rendered.iter().position(|l| l.contains("4, obv▋")).unwrap();
        let warning = rendered.iter().position(|l| l.contains("token missing")).unwrap();
        assert!(hello < question && question < partial && partial < warning);
    }
}
