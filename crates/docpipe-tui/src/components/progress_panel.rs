//! Progress panel — step 4. A gauge driven by the simulated checkpoints
//! plus a phase list. The real completion signal is the network response;
//! the gauge never reaches 100 on its own.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, List, ListItem, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    widgets::pane_chrome::{pane_chrome, Badge},
};

/// Cosmetic phase labels paired with the progress value at which each one
/// is considered underway.
const PHASES: &[(u8, &str)] = &[
    (10, "Reading documents"),
    (20, "Extracting metric values"),
    (30, "Validating extracted data"),
    (40, "Designing warehouse schema"),
    (60, "Deploying tables and loading rows"),
];

pub struct ProgressPanel;

impl ProgressPanel {
    pub fn new() -> Self {
        Self
    }
}

impl Component for ProgressPanel {
    fn id(&self) -> ComponentId {
        ComponentId::ProgressPanel
    }

    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Vec<Action> {
        // Nothing to drive here; the step advances when the backend answers.
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let theme = &state.theme;
        let pipeline = &state.pipeline;

        let block = pane_chrome(
            "processing",
            None,
            focused,
            Some(Badge {
                text: "WORKING",
                color: theme.warn,
            }),
            theme,
        );
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(2),
            ])
            .split(inner);

        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(
                    " extracting {} metric(s) from {} document(s)",
                    pipeline.selected_metrics.len(),
                    pipeline.uploaded_paths.len()
                ),
                theme.style_secondary(),
            )),
            rows[0],
        );

        let gauge = Gauge::default()
            .ratio((pipeline.progress as f64 / 100.0).clamp(0.0, 1.0))
            .gauge_style(Style::default().fg(theme.info).bg(theme.selection_bg))
            .label(format!("{}%", pipeline.progress));
        frame.render_widget(gauge, rows[2]);

        let items: Vec<ListItem> = PHASES
            .iter()
            .map(|&(at, label)| {
                let reached = pipeline.progress >= at;
                let current = reached
                    && PHASES
                        .iter()
                        .filter(|&&(next, _)| next > at)
                        .all(|&(next, _)| pipeline.progress < next);
                let (mark, style) = if current && pipeline.progress < 100 {
                    (
                        "…",
                        Style::default().fg(theme.warn).add_modifier(Modifier::BOLD),
                    )
                } else if reached {
                    ("✓", Style::default().fg(theme.ok))
                } else {
                    ("·", theme.style_muted())
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!(" {} ", mark), style),
                    Span::styled(label, if reached { theme.style_default() } else { theme.style_muted() }),
                ]))
            })
            .collect();
        frame.render_widget(List::new(items), rows[3]);
    }
}
