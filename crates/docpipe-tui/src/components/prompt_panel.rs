//! Prompt panel — step 2. Shows what was uploaded and takes the optional
//! guidance prompt for metric suggestion.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    widgets::pane_chrome::{pane_chrome, Badge},
    widgets::text_field::{FieldAction, TextField},
};

pub struct PromptPanel {
    prompt: TextField,
    synced: bool,
}

impl PromptPanel {
    pub fn new() -> Self {
        Self {
            prompt: TextField::new("", "e.g. focus on revenue, assets and debt…"),
            synced: false,
        }
    }
}

impl Component for PromptPanel {
    fn id(&self) -> ComponentId {
        ComponentId::PromptPanel
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Enter => vec![Action::Submit],
            _ => match self.prompt.handle_key(key) {
                FieldAction::Changed(text) => vec![Action::PromptChanged(text)],
                _ => vec![],
            },
        }
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if matches!(action, Action::ResetTask) {
            self.prompt.clear();
            self.synced = false;
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let theme = &state.theme;
        let pipeline = &state.pipeline;

        // Adopt a restored prompt once, without clobbering live edits.
        if !self.synced {
            if !pipeline.user_prompt.is_empty() && self.prompt.is_empty() {
                self.prompt.set_value(&pipeline.user_prompt);
            }
            self.synced = true;
        }

        let badge = if pipeline.processing {
            Some(Badge {
                text: "SUGGESTING",
                color: theme.warn,
            })
        } else if pipeline.error.is_some() {
            Some(Badge {
                text: "ERR",
                color: theme.err,
            })
        } else {
            None
        };
        let block = pane_chrome("describe the task", None, focused, badge, theme);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(2),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        // Uploaded documents recap
        let mut items: Vec<ListItem> = vec![ListItem::new(Span::styled(
            format!(" uploaded ({}) ", pipeline.uploaded_paths.len()),
            theme.style_secondary(),
        ))];
        for path in &pipeline.uploaded_paths {
            let name = path.rsplit('/').next().unwrap_or(path);
            items.push(ListItem::new(Line::from(vec![
                Span::styled(" ✓ ", ratatui::style::Style::default().fg(theme.ok)),
                Span::styled(name.to_string(), theme.style_default()),
            ])));
        }
        frame.render_widget(List::new(items), rows[0]);

        // Prompt input
        self.prompt.draw(frame, rows[1], focused, theme);

        if let Some(err) = &pipeline.error {
            frame.render_widget(
                Paragraph::new(Span::styled(format!(" {}", err), theme.style_error())),
                rows[2],
            );
        }
        frame.render_widget(
            Paragraph::new(Span::styled(
                " Enter request metric suggestions · prompt is optional",
                theme.style_muted(),
            )),
            rows[3],
        );
    }
}
