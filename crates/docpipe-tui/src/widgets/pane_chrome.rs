//! PaneChrome — standardized bordered pane with focus styling and badges.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
};

use crate::theme::Theme;

/// A badge shown in the top-right of the pane header (e.g., "BUSY", "ERR").
pub struct Badge<'a> {
    pub text: &'a str,
    pub color: Color,
}

/// Renders a bordered pane with consistent focus styling and optional badge.
pub fn pane_chrome<'a>(
    title: &'a str,
    key_hint: Option<char>,
    focused: bool,
    badge: Option<Badge<'a>>,
    theme: &Theme,
) -> Block<'a> {
    let border_style = if focused {
        Style::default().fg(theme.border_focused)
    } else {
        Style::default().fg(theme.border)
    };

    let title_style = if focused {
        Style::default()
            .fg(theme.primary)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.muted)
    };

    let mut title_spans = Vec::new();
    if let Some(key) = key_hint {
        title_spans.push(Span::styled(
            format!("[{}] ", key),
            Style::default().fg(theme.secondary),
        ));
    }
    title_spans.push(Span::styled(title, title_style));

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Line::from(title_spans));

    if let Some(b) = badge {
        block = block.title_top(
            Line::from(Span::styled(
                format!(" {} ", b.text),
                Style::default().fg(b.color).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        );
    }

    block
}
