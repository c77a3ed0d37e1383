//! Header — 2-row top bar.
//!
//! Row 1: app name, workspace tabs, signed-in user, backend URL.
//! Row 2: step breadcrumb 1…5 (Pipeline) or warehouse summary (Analysis).
//!
//! Not focusable.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::{
    action::Workspace,
    app_state::AppState,
    pipeline::Step,
};

pub struct Header {
    pub workspace: Workspace,
}

impl Header {
    pub fn new() -> Self {
        Self {
            workspace: Workspace::Pipeline,
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        frame.render_widget(Clear, area);
        let theme = &state.theme;

        let row1 = Rect { height: 1, ..area };
        let mut spans: Vec<Span> = vec![
            Span::styled(
                " docpipe ",
                Style::default()
                    .fg(theme.primary)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("│ ", theme.style_muted()),
        ];

        for (ws, label) in [
            (Workspace::Pipeline, "[1] Pipeline"),
            (Workspace::Analysis, "[2] Analysis"),
        ] {
            let style = if self.workspace == ws {
                Style::default()
                    .fg(theme.primary)
                    .add_modifier(Modifier::BOLD)
            } else {
                theme.style_muted()
            };
            spans.push(Span::styled(format!("{}  ", label), style));
        }

        if state.auth.authenticated {
            spans.push(Span::styled("│ ", theme.style_muted()));
            spans.push(Span::styled(state.username().to_string(), theme.style_secondary()));
            spans.push(Span::styled(" @ ", theme.style_muted()));
            let conn_style = if state.connected {
                Style::default().fg(theme.ok)
            } else {
                theme.style_muted()
            };
            spans.push(Span::styled(state.backend_url.clone(), conn_style));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), row1);

        if area.height < 2 {
            return;
        }
        let row2 = Rect {
            y: area.y + 1,
            height: 1,
            ..area
        };

        match self.workspace {
            Workspace::Pipeline => self.draw_breadcrumb(frame, row2, state),
            Workspace::Analysis => self.draw_warehouse_summary(frame, row2, state),
        }
    }

    fn draw_breadcrumb(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let theme = &state.theme;
        let current = state.pipeline.step;
        let mut spans: Vec<Span> = vec![Span::raw(" ")];

        for step in [
            Step::Upload,
            Step::Suggest,
            Step::Review,
            Step::Process,
            Step::Results,
        ] {
            if step.ordinal() > 1 {
                spans.push(Span::styled(" › ", theme.style_muted()));
            }
            let label = format!("{} {}", step.ordinal(), step.title());
            let style = if step == current {
                Style::default()
                    .fg(theme.primary)
                    .add_modifier(Modifier::BOLD)
            } else if step < current {
                Style::default().fg(theme.ok)
            } else {
                theme.style_muted()
            };
            spans.push(Span::styled(label, style));
        }

        if state.pipeline.processing {
            spans.push(Span::styled("  working…", Style::default().fg(theme.warn)));
        }
        if state.stats.documents_processed > 0 {
            spans.push(Span::styled(
                format!(
                    "  ({} doc(s), {} task(s) lifetime)",
                    state.stats.documents_processed, state.stats.aggregate.tasks_completed
                ),
                theme.style_muted(),
            ));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_warehouse_summary(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let theme = &state.theme;
        let line = match &state.available {
            Some(data) => Line::from(vec![
                Span::raw(" "),
                Span::styled("warehouse: ", theme.style_muted()),
                Span::styled(
                    format!(
                        "{} companies · {} metrics · {} tables",
                        data.companies.len(),
                        data.metrics.len(),
                        data.tables.len()
                    ),
                    theme.style_secondary(),
                ),
            ]),
            None => Line::from(vec![
                Span::raw(" "),
                Span::styled("warehouse: metadata not loaded (press ^R)", theme.style_muted()),
            ]),
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}
