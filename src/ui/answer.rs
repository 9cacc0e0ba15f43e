use chrono::DateTime;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};

use crate::api::types::CompletionResponse;
use crate::app::App;

const SPINNER: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

/// Answer panel: metadata header, usage line, then the wrapped answer text.
pub struct AnswerView<'a> {
    pub app: &'a App,
}

impl<'a> AnswerView<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for AnswerView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Answer ")
            .title_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .border_style(Style::default().fg(Color::DarkGray));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height == 0 || inner.width < 2 {
            return;
        }

        let Some(resp) = self.app.response.as_ref() else {
            let (msg, style) = if self.app.loading {
                let frame = SPINNER[self.app.spinner_frame % SPINNER.len()];
                (
                    format!("{frame} Waiting for the model..."),
                    Style::default().fg(Color::Yellow),
                )
            } else {
                (
                    "Ask a question to see the answer here".to_string(),
                    Style::default().fg(Color::DarkGray),
                )
            };
            buf.set_string(inner.x + 1, inner.y, msg, style);
            return;
        };

        let header = metadata_lines(resp, self.app.models.display_name(&resp.model));
        let header_height = header.len() as u16 + 1;

        let [header_area, body_area] =
            Layout::vertical([Constraint::Length(header_height), Constraint::Min(0)]).areas(inner);
        let header_area = Rect::new(
            header_area.x + 1,
            header_area.y,
            header_area.width.saturating_sub(1),
            header_area.height,
        );
        Paragraph::new(header).render(header_area, buf);

        let sep_y = header_area.y + header_area.height.saturating_sub(1);
        if header_area.height > 0 && sep_y < inner.y + inner.height {
            buf.set_string(
                header_area.x,
                sep_y,
                "\u{2500}".repeat(header_area.width as usize),
                Style::default().fg(Color::DarkGray),
            );
        }

        let body_area = Rect::new(
            body_area.x + 1,
            body_area.y,
            body_area.width.saturating_sub(1),
            body_area.height,
        );
        let answer = resp.answer();
        let text = if answer.is_empty() {
            "(empty answer)"
        } else {
            answer
        };
        Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .scroll((self.app.answer_scroll, 0))
            .render(body_area, buf);
    }
}

fn metadata_lines<'a>(resp: &'a CompletionResponse, model_name: &'a str) -> Vec<Line<'a>> {
    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White);

    let mut lines = vec![Line::from(vec![
        Span::styled("Model: ", label),
        Span::styled(model_name, value),
        Span::styled("  Finish: ", label),
        Span::styled(resp.finish_reason(), value),
        Span::styled("  Created: ", label),
        Span::styled(format_timestamp(resp.created), value),
    ])];

    let usage = &resp.usage;
    lines.push(Line::from(vec![
        Span::styled("Tokens: ", label),
        Span::styled(usage.summary(), Style::default().fg(Color::Yellow)),
    ]));
    lines.push(Line::from(vec![
        Span::styled("Time: ", label),
        Span::styled(
            format!(
                "queue {:.3}s, prompt {:.3}s, completion {:.3}s, total {:.3}s",
                usage.queue_time, usage.prompt_time, usage.completion_time, usage.total_time
            ),
            value,
        ),
    ]));

    if !resp.id.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Id: ", label),
            Span::styled(resp.id.as_str(), value),
        ]));
    }

    lines
}

/// Format a unix timestamp for display. Values above 1e12 are treated as
/// milliseconds, anything else as seconds. Zero renders as an empty string.
pub fn format_timestamp(timestamp: i64) -> String {
    if timestamp == 0 {
        return String::new();
    }
    let parsed = if timestamp > 1_000_000_000_000 {
        DateTime::from_timestamp_millis(timestamp)
    } else {
        DateTime::from_timestamp(timestamp, 0)
    };
    parsed
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::format_timestamp;

    #[test]
    fn formats_seconds() {
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn formats_milliseconds() {
        assert_eq!(format_timestamp(1_700_000_000_000), "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn zero_is_blank() {
        assert_eq!(format_timestamp(0), "");
    }
}
