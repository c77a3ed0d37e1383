//! Chat panel — conversational analysis over the deployed warehouse.
//!
//! Scrollback of turns on top, a single-line query input at the bottom.
//! Scroll sticks to the newest turn until the user pages up.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    analysis::Role,
    component::Component,
    widgets::pane_chrome::{pane_chrome, Badge},
    widgets::text_field::{FieldAction, TextField},
};

pub struct ChatPanel {
    input: TextField,
    /// Lines scrolled up from the bottom; 0 sticks to the newest turn.
    offset_from_bottom: u16,
}

impl ChatPanel {
    pub fn new() -> Self {
        Self {
            input: TextField::new("", "ask about the warehouse data…"),
            offset_from_bottom: 0,
        }
    }

    fn transcript_lines(&self, state: &AppState) -> Vec<Line<'static>> {
        let theme = &state.theme;
        let mut lines: Vec<Line> = Vec::new();

        if state.conversation.turns().is_empty() {
            lines.push(Line::from(Span::styled(
                " Ask a question about the deployed data.",
                theme.style_muted(),
            )));
            if let Some(data) = &state.available {
                if !data.companies.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!(" companies: {}", data.companies.join(", ")),
                        theme.style_muted(),
                    )));
                }
                if !data.metrics.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!(" metrics: {}", data.metrics.join(", ")),
                        theme.style_muted(),
                    )));
                }
            }
            return lines;
        }

        for turn in state.conversation.turns() {
            match turn.role {
                Role::User => {
                    lines.push(Line::from(vec![
                        Span::styled(
                            " you ",
                            Style::default()
                                .fg(theme.info)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(turn.content(), theme.style_default()),
                    ]));
                }
                Role::Assistant => {
                    lines.push(Line::from(vec![
                        Span::styled(
                            " docpipe ",
                            Style::default()
                                .fg(theme.ok)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(turn.content(), theme.style_secondary()),
                    ]));
                    if let Some(resp) = &turn.response {
                        for insight in &resp.insights {
                            lines.push(Line::from(vec![
                                Span::styled("   • ", theme.style_muted()),
                                Span::styled(insight.clone(), theme.style_secondary()),
                            ]));
                        }
                        if let Some(chart) = &resp.chart {
                            lines.push(Line::from(Span::styled(
                                format!("   ▦ chart: {}", chart.title),
                                Style::default().fg(theme.info),
                            )));
                        }
                        if let (Some(companies), Some(metrics)) =
                            (&resp.available_companies, &resp.available_metrics)
                        {
                            lines.push(Line::from(Span::styled(
                                format!(
                                    "   available: {} · {}",
                                    companies.join(", "),
                                    metrics.join(", ")
                                ),
                                theme.style_muted(),
                            )));
                        }
                    }
                }
            }
            lines.push(Line::from(""));
        }

        if state.conversation.in_flight {
            lines.push(Line::from(Span::styled(
                " thinking…",
                Style::default().fg(theme.warn),
            )));
        }
        lines
    }
}

impl Component for ChatPanel {
    fn id(&self) -> ComponentId {
        ComponentId::ChatPanel
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::PageUp => {
                self.offset_from_bottom = self.offset_from_bottom.saturating_add(4);
                return vec![];
            }
            KeyCode::PageDown => {
                self.offset_from_bottom = self.offset_from_bottom.saturating_sub(4);
                return vec![];
            }
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return vec![Action::ClearConversation];
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return vec![Action::RefreshMetadata];
            }
            _ => {}
        }
        match self.input.handle_key(key) {
            FieldAction::Confirmed(text) => {
                if text.trim().is_empty() {
                    return vec![];
                }
                self.input.clear();
                self.offset_from_bottom = 0;
                vec![Action::SendQuery(text)]
            }
            _ => vec![],
        }
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if matches!(action, Action::ClearConversation | Action::ResetTask) {
            self.offset_from_bottom = 0;
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let theme = &state.theme;
        let badge = if state.conversation.in_flight {
            Some(Badge {
                text: "BUSY",
                color: theme.warn,
            })
        } else {
            None
        };
        let block = pane_chrome("analysis chat", None, focused, badge, theme);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(2), Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let lines = self.transcript_lines(state);
        let height = rows[0].height;
        let total = lines.len() as u16;
        let max_offset = total.saturating_sub(height);
        self.offset_from_bottom = self.offset_from_bottom.min(max_offset);
        let scroll = max_offset - self.offset_from_bottom;
        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .scroll((scroll, 0)),
            rows[0],
        );

        self.input.draw(frame, rows[1], focused, theme);
        frame.render_widget(
            Paragraph::new(Span::styled(
                " Enter send · PgUp/PgDn scroll · ^R refresh metadata · ^L clear chat",
                theme.style_muted(),
            )),
            rows[2],
        );
    }
}
