use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Widget};

use crate::app::{App, AppMode};
use crate::ui::input::TextInput;

/// Bordered question box; shows the live cursor while editing.
pub struct QuestionBox<'a> {
    pub app: &'a App,
}

impl<'a> QuestionBox<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for QuestionBox<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let editing = self.app.mode == AppMode::Editing;
        let border = if editing { Color::Cyan } else { Color::DarkGray };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Ask {} ", self.app.model_display_name()))
            .title_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .border_style(Style::default().fg(border));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height == 0 {
            return;
        }

        if self.app.question.is_empty() && !editing {
            buf.set_string(
                inner.x + 1,
                inner.y,
                "Press i to type a question",
                Style::default().fg(Color::DarkGray),
            );
            return;
        }

        let line = Rect::new(inner.x + 1, inner.y, inner.width.saturating_sub(1), 1);
        TextInput::new("", &self.app.question)
            .cursor(editing)
            .render(line, buf);
    }
}
