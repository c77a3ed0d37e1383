//! Status bar — one-line key hints at the bottom of the screen.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::Theme;

/// A `(key, description)` pair rendered as ` key description `.
pub type Hint<'a> = (&'a str, &'a str);

pub fn draw_status_bar(frame: &mut Frame, area: Rect, hints: &[Hint], theme: &Theme) {
    let mut spans: Vec<Span> = Vec::with_capacity(hints.len() * 3);
    for (i, (key, desc)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ", theme.style_muted()));
        }
        spans.push(Span::styled(format!("{} ", key), theme.style_secondary()));
        spans.push(Span::styled(*desc, theme.style_muted()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
