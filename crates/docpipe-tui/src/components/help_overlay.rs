//! Help overlay — centered key reference, toggled with `?`.

use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::{app_state::AppState, widgets::pane_chrome::pane_chrome};

const KEYS: &[(&str, &str)] = &[
    ("1 / 2", "pipeline / analysis workspace"),
    ("Tab / Shift-Tab", "cycle pane focus"),
    ("Enter / s", "submit the current step"),
    ("b", "back to the prompt step (from review)"),
    ("p", "stage file paths from the clipboard"),
    ("r", "start a new task (from results)"),
    ("c", "copy the schema DDL (from results)"),
    ("^R", "refresh warehouse metadata"),
    ("^L", "clear the analysis conversation"),
    ("n / p", "cycle charts (chart panel)"),
    ("L", "toggle the log panel"),
    ("T", "toggle dark / light theme"),
    ("^O", "log out"),
    ("?", "toggle this help"),
    ("q / ^C", "quit"),
];

pub struct HelpOverlay;

impl HelpOverlay {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let theme = &state.theme;
        let w = 56.min(area.width.saturating_sub(4));
        let h = (KEYS.len() as u16 + 4).min(area.height.saturating_sub(2));
        let card = Rect {
            x: area.x + (area.width.saturating_sub(w)) / 2,
            y: area.y + (area.height.saturating_sub(h)) / 2,
            width: w,
            height: h,
        };
        frame.render_widget(Clear, card);

        let block = pane_chrome("help", None, true, None, theme);
        let inner = block.inner(card);
        frame.render_widget(block, card);

        let lines: Vec<Line> = KEYS
            .iter()
            .map(|(key, desc)| {
                Line::from(vec![
                    Span::styled(
                        format!(" {:>14}  ", key),
                        theme.style_secondary().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(*desc, theme.style_default()),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}
