use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::api::ClassifiedError;

/// A dismissible centered popup showing the classified error message.
pub struct ErrorPopup<'a> {
    text: &'a str,
    status_code: u16,
}

impl<'a> ErrorPopup<'a> {
    pub fn new(error: &'a ClassifiedError) -> Self {
        Self {
            text: &error.message,
            status_code: error.status_code,
        }
    }

    fn title(&self) -> String {
        if self.status_code == 0 {
            " Error ".to_string()
        } else {
            format!(" Error {} ", self.status_code)
        }
    }
}

impl Widget for ErrorPopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let max_width = 70u16.min(area.width.saturating_sub(4));
        // Inner width available for text (subtract 2 for border)
        let inner_width = max_width.saturating_sub(2) as usize;

        let text_lines: usize = self
            .text
            .lines()
            .map(|line| {
                if line.is_empty() || inner_width == 0 {
                    1
                } else {
                    line.width().div_ceil(inner_width)
                }
            })
            .sum();

        // Border, hint line and a blank line above the hint.
        let content_height = (text_lines as u16) + 4;
        let max_height = (area.height * 3 / 5).max(8);
        let height = content_height
            .min(max_height)
            .min(area.height.saturating_sub(2));

        let x = area.x + (area.width.saturating_sub(max_width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        let panel = Rect::new(x, y, max_width, height);

        Clear.render(panel, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title())
            .title_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
            .border_style(Style::default().fg(Color::Red));

        let inner = block.inner(panel);
        block.render(panel, buf);

        // Reserve the last line of inner area for the dismiss hint
        if inner.height < 2 {
            return;
        }
        let text_area = Rect::new(inner.x, inner.y, inner.width, inner.height - 1);
        let hint_area = Rect::new(inner.x, inner.y + inner.height - 1, inner.width, 1);

        let paragraph = Paragraph::new(self.text).wrap(Wrap { trim: true });
        paragraph.render(text_area, buf);

        let hint = Line::from(Span::styled(
            " Press Esc or Enter to dismiss ",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ));
        Paragraph::new(hint).render(hint_area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorKind;

    fn error(status_code: u16) -> ClassifiedError {
        ClassifiedError {
            kind: ErrorKind::ServerError,
            message: "Service temporarily unavailable. Please try again later.".into(),
            status_code,
            raw_cause: None,
        }
    }

    #[test]
    fn title_includes_status_when_known() {
        assert_eq!(ErrorPopup::new(&error(503)).title(), " Error 503 ");
        assert_eq!(ErrorPopup::new(&error(0)).title(), " Error ");
    }

    #[test]
    fn renders_message_inside_panel() {
        let area = Rect::new(0, 0, 80, 20);
        let mut buf = Buffer::empty(area);
        let err = error(503);
        ErrorPopup::new(&err).render(area, &mut buf);

        let rendered: String = (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|(x, y)| buf[(x, y)].symbol().to_string())
            .collect();
        assert!(rendered.contains("Service temporarily unavailable"));
        assert!(rendered.contains("Error 503"));
    }
}
