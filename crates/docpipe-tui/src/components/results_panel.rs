//! Results panel — step 5. Extracted metrics per document, the deployment
//! summary, and the generated warehouse schema/DDL.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table},
    Frame,
};

use crate::{
    action::{Action, ComponentId, Workspace},
    app_state::AppState,
    component::Component,
    render::{cell_text, clean_label, document_rows, metric_columns},
    widgets::pane_chrome::{pane_chrome, Badge},
};

#[derive(Clone, Copy, PartialEq)]
enum View {
    Metrics,
    Schema,
}

pub struct ResultsPanel {
    view: View,
    scroll: u16,
}

impl ResultsPanel {
    pub fn new() -> Self {
        Self {
            view: View::Metrics,
            scroll: 0,
        }
    }
}

impl Component for ResultsPanel {
    fn id(&self) -> ComponentId {
        ComponentId::ResultsPanel
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Char('c') => {
                let ddl = state
                    .pipeline
                    .results
                    .as_ref()
                    .and_then(|r| r.schema.as_ref())
                    .map(|s| s.ddl_sql.clone())
                    .filter(|d| !d.is_empty());
                if let Some(ddl) = ddl {
                    return vec![Action::CopyToClipboard(ddl)];
                }
            }
            KeyCode::Char('v') => {
                self.view = match self.view {
                    View::Metrics => View::Schema,
                    View::Schema => View::Metrics,
                };
                self.scroll = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::Char('r') => return vec![Action::ResetTask],
            KeyCode::Char('a') => return vec![Action::SwitchWorkspace(Workspace::Analysis)],
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let theme = &state.theme;
        let Some(outcome) = &state.pipeline.results else {
            let block = pane_chrome("results", None, focused, None, theme);
            let inner = block.inner(area);
            frame.render_widget(block, area);
            frame.render_widget(
                Paragraph::new(Span::styled(" no results yet", theme.style_muted())),
                inner,
            );
            return;
        };

        let status = outcome
            .deployment
            .as_ref()
            .map(|d| d.status.as_str())
            .unwrap_or("UNKNOWN");
        let badge = if status.eq_ignore_ascii_case("success") {
            Badge {
                text: "SUCCESS",
                color: theme.ok,
            }
        } else {
            Badge {
                text: "CHECK",
                color: theme.warn,
            }
        };
        let block = pane_chrome("results", None, focused, Some(badge), theme);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(2),
                Constraint::Length(1),
            ])
            .split(inner);

        // Deployment summary line
        if let Some(d) = &outcome.deployment {
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(" deployed to ", theme.style_muted()),
                    Span::styled(
                        format!("{}.{}", d.database, d.schema),
                        theme.style_default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(
                            " · {} table(s) · {} row(s) loaded",
                            d.tables_created, d.rows_loaded
                        ),
                        theme.style_secondary(),
                    ),
                ])),
                rows_layout[0],
            );
        }

        let tab_line = Line::from(vec![
            Span::styled(
                " metrics ",
                if self.view == View::Metrics {
                    theme.style_default().add_modifier(Modifier::BOLD)
                } else {
                    theme.style_muted()
                },
            ),
            Span::styled("│", theme.style_muted()),
            Span::styled(
                " schema ",
                if self.view == View::Schema {
                    theme.style_default().add_modifier(Modifier::BOLD)
                } else {
                    theme.style_muted()
                },
            ),
        ]);
        frame.render_widget(Paragraph::new(tab_line), rows_layout[1]);

        match self.view {
            View::Metrics => self.draw_metrics(frame, rows_layout[2], state, outcome),
            View::Schema => self.draw_schema(frame, rows_layout[2], state, outcome),
        }

        frame.render_widget(
            Paragraph::new(Span::styled(
                " v metrics/schema · c copy DDL · a analysis workspace · r new task",
                theme.style_muted(),
            )),
            rows_layout[3],
        );
    }
}

impl ResultsPanel {
    fn draw_metrics(
        &self,
        frame: &mut Frame,
        area: Rect,
        state: &AppState,
        outcome: &docpipe_proto::protocol::ProcessResponse,
    ) {
        let theme = &state.theme;
        let doc_rows = document_rows(outcome);
        if doc_rows.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    " no metrics were extracted",
                    theme.style_muted(),
                )),
                area,
            );
            return;
        }
        let columns = metric_columns(&doc_rows);

        let header = Row::new(
            std::iter::once(Cell::from("document"))
                .chain(columns.iter().map(|c| Cell::from(c.clone())))
                .collect::<Vec<Cell>>(),
        )
        .style(theme.style_secondary().add_modifier(Modifier::BOLD));

        let table_rows: Vec<Row> = doc_rows
            .iter()
            .skip(self.scroll as usize)
            .map(|r| {
                let mut cells = vec![Cell::from(clean_label(&r.document))
                    .style(theme.style_default())];
                for col in &columns {
                    let text = r
                        .metrics
                        .get(col)
                        .map(cell_text)
                        .unwrap_or_else(|| "—".to_string());
                    cells.push(Cell::from(text).style(theme.style_secondary()));
                }
                Row::new(cells)
            })
            .collect();

        let mut widths = vec![Constraint::Length(26)];
        widths.extend(std::iter::repeat(Constraint::Min(10)).take(columns.len()));
        frame.render_widget(Table::new(table_rows, widths).header(header), area);
    }

    fn draw_schema(
        &self,
        frame: &mut Frame,
        area: Rect,
        state: &AppState,
        outcome: &docpipe_proto::protocol::ProcessResponse,
    ) {
        let theme = &state.theme;
        let Some(schema) = &outcome.schema else {
            frame.render_widget(
                Paragraph::new(Span::styled(" no schema returned", theme.style_muted())),
                area,
            );
            return;
        };

        let mut lines: Vec<Line> = Vec::new();
        for table in &schema.tables {
            lines.push(Line::from(Span::styled(
                format!(" {}", table.table_name),
                theme.style_default().add_modifier(Modifier::BOLD),
            )));
            for col in &table.columns {
                let mut spans = vec![
                    Span::styled("   · ", theme.style_muted()),
                    Span::styled(col.name.clone(), theme.style_secondary()),
                    Span::styled(format!(" {}", col.column_type), theme.style_muted()),
                ];
                if !col.constraints.is_empty() {
                    spans.push(Span::styled(
                        format!(" {}", col.constraints),
                        Style::default().fg(theme.info),
                    ));
                }
                lines.push(Line::from(spans));
            }
        }
        if !schema.ddl_sql.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(" DDL", theme.style_secondary())));
            for sql_line in schema.ddl_sql.lines() {
                lines.push(Line::from(Span::styled(
                    format!(" {}", sql_line),
                    theme.style_muted(),
                )));
            }
        }
        frame.render_widget(
            Paragraph::new(lines).scroll((self.scroll, 0)),
            area,
        );
    }
}
