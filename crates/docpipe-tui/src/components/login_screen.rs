//! Login screen — the gate in front of both workspaces.
//!
//! Two fields (username, masked secret). First successful login for a
//! username seeds the stored credential; later logins must match it.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    widgets::text_field::{FieldAction, TextField},
};

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Username,
    Secret,
}

pub struct LoginScreen {
    username: TextField,
    secret: TextField,
    active: Field,
    /// Last rejection, cleared on the next keystroke.
    pub error: Option<String>,
}

impl LoginScreen {
    pub fn new() -> Self {
        Self {
            username: TextField::new("user", "username"),
            secret: TextField::masked("pass", "secret"),
            active: Field::Username,
            error: None,
        }
    }

    pub fn reject(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.secret.clear();
        self.active = Field::Secret;
    }

    fn submit(&mut self) -> Vec<Action> {
        let user = self.username.text().trim().to_string();
        let pass = self.secret.text().to_string();
        if user.is_empty() {
            self.error = Some("Enter a username.".to_string());
            self.active = Field::Username;
            return vec![];
        }
        if pass.is_empty() {
            self.error = Some("Enter a secret.".to_string());
            self.active = Field::Secret;
            return vec![];
        }
        vec![Action::Login(user, pass)]
    }
}

impl Component for LoginScreen {
    fn id(&self) -> ComponentId {
        ComponentId::LoginScreen
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        self.error = None;

        match key.code {
            KeyCode::Tab | KeyCode::Down | KeyCode::Up => {
                self.active = match self.active {
                    Field::Username => Field::Secret,
                    Field::Secret => Field::Username,
                };
                vec![]
            }
            _ => {
                let field = match self.active {
                    Field::Username => &mut self.username,
                    Field::Secret => &mut self.secret,
                };
                match field.handle_key(key) {
                    FieldAction::Confirmed(_) => {
                        if self.active == Field::Username {
                            self.active = Field::Secret;
                            vec![]
                        } else {
                            self.submit()
                        }
                    }
                    _ => vec![],
                }
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        let theme = &state.theme;

        // Centered card
        let card_w = 52.min(area.width.saturating_sub(4)).max(30);
        let card_h = 9;
        let card = Rect {
            x: area.x + (area.width.saturating_sub(card_w)) / 2,
            y: area.y + (area.height.saturating_sub(card_h)) / 2,
            width: card_w,
            height: card_h.min(area.height),
        };
        frame.render_widget(Clear, card);

        let block = crate::widgets::pane_chrome::pane_chrome("sign in", None, true, None, theme);
        let inner = block.inner(card);
        frame.render_widget(block, card);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "docpipe — document to warehouse",
                theme.style_secondary().add_modifier(Modifier::BOLD),
            ))),
            rows[0],
        );
        self.username
            .draw(frame, rows[2], self.active == Field::Username, theme);
        self.secret
            .draw(frame, rows[3], self.active == Field::Secret, theme);

        let footer = match &self.error {
            Some(err) => Line::from(Span::styled(err.clone(), theme.style_error())),
            None => Line::from(Span::styled(
                "Enter submit · Tab switch field",
                theme.style_muted(),
            )),
        };
        frame.render_widget(Paragraph::new(footer), rows[4]);
    }
}
