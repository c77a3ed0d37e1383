//! TextField — wraps tui-input for single-line editing in panes.
//!
//! Used for the task prompt, the metric editor, chat input and the login
//! form. Supports an optional mask for secret entry.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::Theme;

pub enum FieldAction {
    Changed(String),
    Confirmed(String),
    Cancelled,
    None,
}

pub struct TextField {
    input: Input,
    label: String,
    placeholder: String,
    /// When set, rendered value is replaced with this char (password entry).
    mask: Option<char>,
}

impl TextField {
    pub fn new(label: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            label: label.into(),
            placeholder: placeholder.into(),
            mask: None,
        }
    }

    pub fn masked(label: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            mask: Some('•'),
            ..Self::new(label, placeholder)
        }
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn is_empty(&self) -> bool {
        self.input.value().is_empty()
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn set_value(&mut self, value: &str) {
        self.input = Input::new(value.to_string());
    }

    /// Handle a key event while this field is being edited.
    pub fn handle_key(&mut self, key: KeyEvent) -> FieldAction {
        match key.code {
            KeyCode::Esc => FieldAction::Cancelled,
            KeyCode::Enter => FieldAction::Confirmed(self.input.value().to_string()),
            _ => {
                let before = self.input.value().to_string();
                self.input
                    .handle_event(&ratatui::crossterm::event::Event::Key(key));
                if self.input.value() != before {
                    FieldAction::Changed(self.input.value().to_string())
                } else {
                    FieldAction::None
                }
            }
        }
    }

    /// Render the field as `label: value` with a cursor when `editing`.
    pub fn draw(&self, frame: &mut Frame, area: Rect, editing: bool, theme: &Theme) {
        let label_w = if self.label.is_empty() {
            0
        } else {
            self.label.chars().count() + 2
        };
        let inner_w = (area.width as usize).saturating_sub(label_w + 1);
        let scroll = self.input.visual_scroll(inner_w);
        let value = self.input.value();

        let shown = if value.is_empty() {
            Span::styled(self.placeholder.clone(), theme.style_muted())
        } else {
            let visible: String = match self.mask {
                Some(c) => value.chars().skip(scroll).map(|_| c).collect(),
                None => value.chars().skip(scroll).collect(),
            };
            Span::styled(visible, theme.style_default())
        };

        let mut spans = Vec::new();
        if !self.label.is_empty() {
            spans.push(Span::styled(
                format!("{}: ", self.label),
                theme.style_secondary(),
            ));
        }
        spans.push(shown);
        frame.render_widget(Paragraph::new(Line::from(spans)), area);

        if editing {
            let cursor_x =
                area.x + label_w as u16 + (self.input.visual_cursor() - scroll) as u16;
            frame.set_cursor_position((
                cursor_x.min(area.x + area.width.saturating_sub(1)),
                area.y,
            ));
        }
    }
}
