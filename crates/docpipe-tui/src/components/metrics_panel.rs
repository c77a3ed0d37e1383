//! Metrics panel — step 3. Suggested metrics on the left (toggle in/out),
//! the working set on the right with an inline add/edit editor.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

use docpipe_proto::protocol::{Metric, MetricKind};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    widgets::pane_chrome::{pane_chrome, Badge},
    widgets::text_field::{FieldAction, TextField},
};

#[derive(Clone, Copy, PartialEq)]
enum Side {
    Suggested,
    Working,
}

#[derive(Clone, Copy, PartialEq)]
enum EditorField {
    Name,
    Kind,
    Description,
}

struct Editor {
    /// Index into the working set when editing, None when adding.
    index: Option<usize>,
    field: EditorField,
    name: TextField,
    description: TextField,
    kind: MetricKind,
}

impl Editor {
    fn add() -> Self {
        Self {
            index: None,
            field: EditorField::Name,
            name: TextField::new("name", "metric_name"),
            description: TextField::new("desc", "what to extract"),
            kind: MetricKind::Float,
        }
    }

    fn edit(index: usize, metric: &Metric) -> Self {
        let mut editor = Self::add();
        editor.index = Some(index);
        editor.name.set_value(&metric.name);
        editor.description.set_value(&metric.description);
        editor.kind = metric.kind;
        editor
    }

    fn metric(&self) -> Metric {
        Metric::new(
            self.name.text().trim(),
            self.kind,
            self.description.text().trim(),
        )
    }

    fn cycle_kind(&mut self) {
        let all = MetricKind::ALL;
        let pos = all.iter().position(|&k| k == self.kind).unwrap_or(0);
        self.kind = all[(pos + 1) % all.len()];
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            EditorField::Name => EditorField::Kind,
            EditorField::Kind => EditorField::Description,
            EditorField::Description => EditorField::Name,
        };
    }
}

pub struct MetricsPanel {
    side: Side,
    suggested_sel: usize,
    working_sel: usize,
    editor: Option<Editor>,
}

impl MetricsPanel {
    pub fn new() -> Self {
        Self {
            side: Side::Suggested,
            suggested_sel: 0,
            working_sel: 0,
            editor: None,
        }
    }

    /// Whether the inline editor currently owns text input.
    pub fn is_editing(&self) -> bool {
        self.editor.is_some()
    }

    fn clamp(&mut self, state: &AppState) {
        let s = state.pipeline.suggested_metrics.len();
        if s == 0 {
            self.suggested_sel = 0;
        } else if self.suggested_sel >= s {
            self.suggested_sel = s - 1;
        }
        let w = state.pipeline.selected_metrics.len();
        if w == 0 {
            self.working_sel = 0;
        } else if self.working_sel >= w {
            self.working_sel = w - 1;
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let Some(editor) = self.editor.as_mut() else {
            return vec![];
        };
        match key.code {
            KeyCode::Esc => {
                self.editor = None;
                return vec![];
            }
            KeyCode::Tab | KeyCode::Down => {
                editor.next_field();
                return vec![];
            }
            KeyCode::Enter => {
                let metric = editor.metric();
                let action = match editor.index {
                    Some(i) => Action::EditMetric(i, metric),
                    None => Action::AddMetric(metric),
                };
                self.editor = None;
                return vec![action];
            }
            _ => {}
        }
        match editor.field {
            EditorField::Name => {
                let _ = editor.name.handle_key(key);
            }
            EditorField::Kind => {
                if matches!(key.code, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) {
                    editor.cycle_kind();
                }
            }
            EditorField::Description => {
                let _ = editor.description.handle_key(key);
            }
        }
        vec![]
    }
}

impl Component for MetricsPanel {
    fn id(&self) -> ComponentId {
        ComponentId::MetricsPanel
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        self.clamp(state);

        if self.editor.is_some() {
            return self.handle_editor_key(key);
        }

        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.side = Side::Suggested,
            KeyCode::Right | KeyCode::Char('l') => self.side = Side::Working,
            KeyCode::Up | KeyCode::Char('k') => match self.side {
                Side::Suggested => self.suggested_sel = self.suggested_sel.saturating_sub(1),
                Side::Working => self.working_sel = self.working_sel.saturating_sub(1),
            },
            KeyCode::Down | KeyCode::Char('j') => match self.side {
                Side::Suggested => {
                    if self.suggested_sel + 1 < state.pipeline.suggested_metrics.len() {
                        self.suggested_sel += 1;
                    }
                }
                Side::Working => {
                    if self.working_sel + 1 < state.pipeline.selected_metrics.len() {
                        self.working_sel += 1;
                    }
                }
            },
            KeyCode::Char(' ') => {
                if self.side == Side::Suggested
                    && !state.pipeline.suggested_metrics.is_empty()
                {
                    return vec![Action::ToggleMetric(self.suggested_sel)];
                }
            }
            KeyCode::Char('a') => self.editor = Some(Editor::add()),
            KeyCode::Char('e') => {
                if self.side == Side::Working {
                    if let Some(metric) =
                        state.pipeline.selected_metrics.get(self.working_sel)
                    {
                        self.editor = Some(Editor::edit(self.working_sel, metric));
                    }
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if self.side == Side::Working
                    && !state.pipeline.selected_metrics.is_empty()
                {
                    return vec![Action::DeleteMetric(self.working_sel)];
                }
            }
            KeyCode::Char('b') => return vec![Action::Back],
            KeyCode::Char('s') | KeyCode::Enter => return vec![Action::Submit],
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        self.clamp(state);
        let theme = &state.theme;
        let pipeline = &state.pipeline;

        let badge = if pipeline.error.is_some() {
            Some(Badge {
                text: "ERR",
                color: theme.err,
            })
        } else {
            None
        };
        let block = pane_chrome("review metrics", None, focused, badge, theme);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let editor_h = if self.editor.is_some() { 4 } else { 0 };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(editor_h),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[0]);

        // ── Suggested list ────────────────────────────────────────────────────
        let sug_focused = focused && self.side == Side::Suggested && self.editor.is_none();
        let mut items: Vec<ListItem> = vec![ListItem::new(Span::styled(
            format!(" suggested ({}) ", pipeline.suggested_metrics.len()),
            if sug_focused {
                theme.style_default()
            } else {
                theme.style_secondary()
            },
        ))];
        for (i, metric) in pipeline.suggested_metrics.iter().enumerate() {
            let picked = pipeline.is_selected(&metric.name);
            let mark = if picked { "[x]" } else { "[ ]" };
            let mark_style = if picked {
                Style::default().fg(theme.ok)
            } else {
                theme.style_muted()
            };
            let line = Line::from(vec![
                Span::styled(format!(" {} ", mark), mark_style),
                Span::styled(metric.name.clone(), theme.style_default()),
                Span::styled(format!(" ({})", metric.kind.label()), theme.style_muted()),
            ]);
            let item = if sug_focused && i == self.suggested_sel {
                ListItem::new(line).style(theme.style_selected(true))
            } else {
                ListItem::new(line)
            };
            items.push(item);
        }
        frame.render_widget(List::new(items), halves[0]);

        // ── Working set ───────────────────────────────────────────────────────
        let work_focused = focused && self.side == Side::Working && self.editor.is_none();
        let mut items: Vec<ListItem> = vec![ListItem::new(Span::styled(
            format!(" will be extracted ({}) ", pipeline.selected_metrics.len()),
            if work_focused {
                theme.style_default()
            } else {
                theme.style_secondary()
            },
        ))];
        if pipeline.selected_metrics.is_empty() {
            items.push(ListItem::new(Span::styled(
                " none selected — toggle or add at least one",
                Style::default().fg(theme.warn),
            )));
        }
        for (i, metric) in pipeline.selected_metrics.iter().enumerate() {
            let custom = !pipeline
                .suggested_metrics
                .iter()
                .any(|m| m.name == metric.name);
            let mut spans = vec![
                Span::styled(" ▪ ", theme.style_secondary()),
                Span::styled(metric.name.clone(), theme.style_default()),
                Span::styled(format!(" ({})", metric.kind.label()), theme.style_muted()),
            ];
            if custom {
                spans.push(Span::styled(" custom", Style::default().fg(theme.info)));
            }
            if !metric.description.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", metric.description),
                    theme.style_muted(),
                ));
            }
            let line = Line::from(spans);
            let item = if work_focused && i == self.working_sel {
                ListItem::new(line).style(theme.style_selected(true))
            } else {
                ListItem::new(line)
            };
            items.push(item);
        }
        frame.render_widget(List::new(items), halves[1]);

        // ── Inline editor ─────────────────────────────────────────────────────
        if let Some(editor) = &self.editor {
            let editor_rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1),
                    Constraint::Length(1),
                    Constraint::Length(1),
                    Constraint::Length(1),
                ])
                .split(rows[1]);
            let title = match editor.index {
                Some(_) => " edit metric ",
                None => " add metric ",
            };
            frame.render_widget(
                Paragraph::new(Span::styled(title, theme.style_secondary())),
                editor_rows[0],
            );
            editor
                .name
                .draw(frame, editor_rows[1], editor.field == EditorField::Name, theme);
            let kind_style = if editor.field == EditorField::Kind {
                theme.style_default()
            } else {
                theme.style_muted()
            };
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled("type: ", theme.style_secondary()),
                    Span::styled(editor.kind.label(), kind_style),
                    Span::styled("  (Space cycles)", theme.style_muted()),
                ])),
                editor_rows[2],
            );
            editor.description.draw(
                frame,
                editor_rows[3],
                editor.field == EditorField::Description,
                theme,
            );
        }

        if let Some(err) = &pipeline.error {
            frame.render_widget(
                Paragraph::new(Span::styled(format!(" {}", err), theme.style_error())),
                rows[2],
            );
        }
        let hint = if self.editor.is_some() {
            " Tab next field · Enter save · Esc cancel"
        } else {
            " Space toggle · a add · e edit · d delete · b back · Enter start processing"
        };
        frame.render_widget(Paragraph::new(Span::styled(hint, theme.style_muted())), rows[3]);
    }
}
