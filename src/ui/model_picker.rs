use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};

use crate::app::App;

/// Centered overlay listing the model catalog with the cursor row highlighted.
pub struct ModelPicker<'a> {
    pub app: &'a App,
}

impl<'a> ModelPicker<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for ModelPicker<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let models = &self.app.models.models;

        let width = 64u16.min(area.width.saturating_sub(4));
        let height = (models.len() as u16 + 4).min(area.height.saturating_sub(2));
        let x = area.x + (area.width.saturating_sub(width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        let panel = Rect::new(x, y, width, height);

        Clear.render(panel, buf);

        let title = if self.app.models_fallback {
            " Models (built-in) "
        } else {
            " Models "
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .border_style(Style::default().fg(Color::Cyan));

        let inner = block.inner(panel);
        block.render(panel, buf);

        let rows = inner.height.saturating_sub(1) as usize;
        // Keep the cursor row on screen.
        let start = self.app.picker_index.saturating_sub(rows.saturating_sub(1));

        let lines: Vec<Line<'_>> = models
            .iter()
            .enumerate()
            .skip(start)
            .take(rows)
            .map(|(idx, model)| {
                let selected = idx == self.app.picker_index;
                let current = model.id == self.app.model;
                let base = if selected {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else {
                    Style::default().fg(Color::White)
                };
                let marker = if current { "* " } else { "  " };
                let name = if model.name.is_empty() {
                    model.id.as_str()
                } else {
                    model.name.as_str()
                };
                Line::from(vec![
                    Span::styled(marker, base.fg(Color::Yellow)),
                    Span::styled(name, base.add_modifier(Modifier::BOLD)),
                    Span::styled(format!("  {}", model.id), base.fg(Color::Gray)),
                    Span::styled(format!("  {}", model.provider), base.fg(Color::DarkGray)),
                ])
            })
            .collect();

        Paragraph::new(lines).render(
            Rect::new(inner.x, inner.y, inner.width, rows as u16),
            buf,
        );

        if inner.height > 0 {
            buf.set_string(
                inner.x,
                inner.y + inner.height - 1,
                " j/k move  Enter select  Esc close",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            );
        }
    }
}
