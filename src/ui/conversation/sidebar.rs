use crate::params::{GenerationParams, TEMPERATURE_MAX, TEMPERATURE_MIN, TOP_P_MAX, TOP_P_MIN};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, LineGauge, Paragraph, Widget, Wrap},
};

const CREDIT: &str = "Built by Snowflake to demonstrate Snowflake Arctic.";

/// Settings panel: model, credential status and the two sampling sliders
pub struct Sidebar<'a> {
    pub model: &'a str,
    pub has_credential: bool,
    pub params: &'a GenerationParams,
    pub streaming: bool,
}

impl Widget for Sidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("❄️ Snowflake Arctic");
        let inner = block.inner(area);
        block.render(area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // model + credential
                Constraint::Length(1),
                Constraint::Length(2), // temperature
                Constraint::Length(2), // top p
                Constraint::Length(1),
                Constraint::Min(0),    // key hints
                Constraint::Length(5), // credits
            ])
            .split(inner);

        let credential_line = if self.has_credential {
            Line::from(vec![Span::styled("✅ API token set", Style::default().fg(Color::Green))])
        } else {
            Line::from(vec![Span::styled(
                "⚠️ Enter your Replicate API token",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )])
        };
        let status_line = if self.streaming {
            Line::from(vec![Span::styled("Arctic is typing...", Style::default().fg(Color::Green))])
        } else {
            Line::from(vec![Span::styled("Ready", Style::default().fg(Color::DarkGray))])
        };
        Paragraph::new(vec![
            Line::from(vec![Span::styled(self.model, Style::default().fg(Color::Gray))]),
            credential_line,
            status_line,
        ])
        .wrap(Wrap { trim: true })
        .render(chunks[0], buf);

        slider(
            "Temperature",
            self.params.temperature,
            TEMPERATURE_MIN,
            TEMPERATURE_MAX,
            self.params.temperature_ratio(),
        )
        .render(chunks[2], buf);
        slider(
            "Top p",
            self.params.top_p,
            TOP_P_MIN,
            TOP_P_MAX,
            self.params.top_p_ratio(),
        )
        .render(chunks[3], buf);

        let hints = vec![
            hint("F2/F3", "temperature -/+"),
            hint("F4/F5", "top p -/+"),
            hint("Ctrl+L", "clear chat history"),
            hint("PgUp/PgDn", "scroll"),
            hint("/help", "commands"),
            hint("Ctrl+C", "quit"),
        ];
        Paragraph::new(hints).render(chunks[5], buf);

        let footer = Style::default().fg(Color::DarkGray);
        Paragraph::new(vec![
            Line::from(Span::styled(CREDIT, footer)),
            Line::from(Span::styled(
                format!("Model hosted by Replicate: replicate.com/{}", self.model),
                footer,
            )),
        ])
        .wrap(Wrap { trim: true })
        .render(chunks[6], buf);
    }
}

fn slider(label: &str, value: f32, min: f32, max: f32, ratio: f64) -> LineGauge<'static> {
    LineGauge::default()
        .label(format!("{} {:.2} ({}-{})", label, value, min, max))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio)
}

fn hint(key: &'static str, action: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(key, Style::default().fg(Color::Cyan)),
        Span::styled(format!(" {}", action), Style::default().fg(Color::DarkGray)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(sidebar: Sidebar<'_>, area: Rect) -> String {
        let mut buf = Buffer::empty(area);
        sidebar.render(area, &mut buf);
        (0..area.height)
            .map(|y| (0..area.width).map(|x| buf.get(x, y).symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn shows_parameters_and_credits() {
        let params = GenerationParams::default();
        let screen = render(
            Sidebar {
                model: "snowflake/snowflake-arctic-instruct",
                has_credential: false,
                params: &params,
                streaming: false,
            },
            Rect::new(0, 0, 34, 30),
        );

        assert!(screen.contains("Temperature 0.60"));
        assert!(screen.contains("Top p 0.90"));
        assert!(screen.contains("Built by Snowflake"));
        assert!(screen.contains("Model hosted by Replicate"));
    }
}
