use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthChar;

/// A simple single-line text input renderer.
///
/// Renders the prompt + text content, with a cursor indicator at the end.
pub struct TextInput<'a> {
    pub prompt: &'a str,
    pub text: &'a str,
    pub style: Style,
    pub cursor: bool,
}

impl<'a> TextInput<'a> {
    pub fn new(prompt: &'a str, text: &'a str) -> Self {
        Self {
            prompt,
            text,
            style: Style::default().fg(Color::White),
            cursor: true,
        }
    }

    pub fn cursor(mut self, cursor: bool) -> Self {
        self.cursor = cursor;
        self
    }
}

/// Rightmost suffix of `s` that fits in `max_width` terminal columns.
pub(crate) fn tail_fitting(s: &str, max_width: usize) -> &str {
    let mut width = 0;
    let mut start = s.len();
    for (idx, ch) in s.char_indices().rev() {
        let w = ch.width().unwrap_or(0);
        if width + w > max_width {
            break;
        }
        width += w;
        start = idx;
    }
    &s[start..]
}

impl Widget for TextInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let cursor = if self.cursor { "\u{2588}" } else { "" };
        let display = format!("{}{}{cursor}", self.prompt, self.text);
        // If the display is wider than the area, show the rightmost portion.
        let visible = tail_fitting(&display, area.width as usize);

        buf.set_string(area.x, area.y, visible, self.style);
    }
}

#[cfg(test)]
mod tests {
    use super::tail_fitting;

    #[test]
    fn keeps_short_text() {
        assert_eq!(tail_fitting("hello", 10), "hello");
    }

    #[test]
    fn keeps_rightmost_columns() {
        assert_eq!(tail_fitting("hello world", 5), "world");
    }

    #[test]
    fn never_splits_wide_characters() {
        // Each CJK character is two columns wide.
        assert_eq!(tail_fitting("日本語", 5), "本語");
    }
}
