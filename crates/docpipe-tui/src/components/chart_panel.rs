//! Chart panel — draws whatever the latest (or pinned) analysis chart
//! describes: table, bar, line, or pie-as-proportions.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Bar, BarChart, BarGroup, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table},
    Frame,
};

use docpipe_proto::protocol::{ChartKind, ChartSpec};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    render::{prepare_chart, PreparedChart},
    widgets::pane_chrome::pane_chrome,
};

pub struct ChartPanel {
    scroll: u16,
}

impl ChartPanel {
    pub fn new() -> Self {
        Self { scroll: 0 }
    }

    /// Indices of assistant turns that carry a chart, in order.
    fn chart_turns(state: &AppState) -> Vec<usize> {
        state
            .conversation
            .turns()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.response.as_ref().is_some_and(|r| r.chart.is_some()))
            .map(|(i, _)| i)
            .collect()
    }

    fn cycle(state: &AppState, forward: bool) -> Action {
        let turns = Self::chart_turns(state);
        if turns.is_empty() {
            return Action::Noop;
        }
        let current = state
            .chart_turn
            .or_else(|| turns.last().copied())
            .unwrap_or(0);
        let pos = turns.iter().position(|&i| i == current).unwrap_or(0);
        let next = if forward {
            (pos + 1) % turns.len()
        } else {
            (pos + turns.len() - 1) % turns.len()
        };
        Action::ShowChart(Some(turns[next]))
    }
}

impl Component for ChartPanel {
    fn id(&self) -> ComponentId {
        ComponentId::ChartPanel
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Char('n') | KeyCode::Right => vec![Self::cycle(state, true)],
            KeyCode::Char('p') | KeyCode::Left => vec![Self::cycle(state, false)],
            KeyCode::Esc => vec![Action::ShowChart(None)],
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1);
                vec![]
            }
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let theme = &state.theme;
        let block = pane_chrome("chart", None, focused, None, theme);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(spec) = state.current_chart() else {
            let mut lines = vec![Line::from(Span::styled(
                " no chart yet — ask for a comparison or trend",
                theme.style_muted(),
            ))];
            if let Some(data) = &state.available {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!(" {} table(s) in the warehouse", data.tables.len()),
                    theme.style_muted(),
                )));
            }
            frame.render_widget(Paragraph::new(lines), inner);
            return;
        };

        let prepared = prepare_chart(spec);
        if prepared.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    " the chart has no data rows",
                    theme.style_muted(),
                )),
                inner,
            );
            return;
        }

        // Title row, then the body.
        let title_area = Rect { height: 1, ..inner };
        let body = Rect {
            y: inner.y + 1,
            height: inner.height.saturating_sub(1),
            ..inner
        };
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {}", prepared.title),
                theme.style_default().add_modifier(Modifier::BOLD),
            )),
            title_area,
        );

        match prepared.kind {
            ChartKind::Table => self.draw_table(frame, body, state, spec, &prepared),
            ChartKind::Bar => self.draw_bars(frame, body, state, &prepared),
            ChartKind::Line => self.draw_lines(frame, body, state, &prepared),
            ChartKind::Pie => self.draw_pie(frame, body, state, &prepared),
        }
    }
}

impl ChartPanel {
    fn draw_table(
        &self,
        frame: &mut Frame,
        area: Rect,
        state: &AppState,
        spec: &ChartSpec,
        prepared: &PreparedChart,
    ) {
        let theme = &state.theme;
        let header = Row::new(
            prepared
                .columns
                .iter()
                .map(|c| Cell::from(c.clone()))
                .collect::<Vec<Cell>>(),
        )
        .style(theme.style_secondary().add_modifier(Modifier::BOLD));

        let rows: Vec<Row> = (0..spec.rows.len())
            .skip(self.scroll as usize)
            .map(|i| {
                Row::new(
                    prepared
                        .columns
                        .iter()
                        .map(|col| Cell::from(prepared.cell(spec, i, col)))
                        .collect::<Vec<Cell>>(),
                )
                .style(theme.style_default())
            })
            .collect();

        let widths = vec![Constraint::Min(10); prepared.columns.len()];
        frame.render_widget(Table::new(rows, widths).header(header), area);
    }

    fn draw_bars(&self, frame: &mut Frame, area: Rect, state: &AppState, prepared: &PreparedChart) {
        let theme = &state.theme;
        let Some(series) = prepared.series.first() else {
            return;
        };
        // BarChart wants u64; rescale so the largest value keeps resolution.
        let max = series.values.iter().cloned().fold(0.0_f64, f64::max);
        let scale = if max > 0.0 { 1000.0 / max } else { 1.0 };

        let bars: Vec<Bar> = prepared
            .labels
            .iter()
            .zip(&series.values)
            .enumerate()
            .map(|(i, (label, &value))| {
                Bar::default()
                    .value((value.max(0.0) * scale).round() as u64)
                    .text_value(format!("{:.1}", value))
                    .label(Line::from(label.clone()))
                    .style(Style::default().fg(theme.chart[i % theme.chart.len()]))
            })
            .collect();

        let width = ((area.width as usize / prepared.labels.len().max(1)).saturating_sub(1))
            .clamp(3, 18) as u16;
        let chart = BarChart::default()
            .data(BarGroup::default().bars(&bars))
            .bar_width(width)
            .bar_gap(1)
            .label_style(theme.style_muted())
            .value_style(theme.style_secondary());
        frame.render_widget(chart, area);
    }

    fn draw_lines(&self, frame: &mut Frame, area: Rect, state: &AppState, prepared: &PreparedChart) {
        let theme = &state.theme;
        let points: Vec<Vec<(f64, f64)>> = prepared
            .series
            .iter()
            .map(|s| {
                s.values
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| (i as f64, v))
                    .collect()
            })
            .collect();

        let y_max = points
            .iter()
            .flatten()
            .map(|&(_, y)| y)
            .fold(f64::MIN, f64::max)
            .max(1.0);
        let y_min = points
            .iter()
            .flatten()
            .map(|&(_, y)| y)
            .fold(f64::MAX, f64::min)
            .min(0.0);

        let datasets: Vec<Dataset> = prepared
            .series
            .iter()
            .zip(&points)
            .enumerate()
            .map(|(i, (s, data))| {
                Dataset::default()
                    .name(s.name.clone())
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(theme.chart[i % theme.chart.len()]))
                    .data(data)
            })
            .collect();

        let x_labels: Vec<Span> = if prepared.labels.len() > 1 {
            vec![
                Span::styled(prepared.labels[0].clone(), theme.style_muted()),
                Span::styled(
                    prepared.labels[prepared.labels.len() - 1].clone(),
                    theme.style_muted(),
                ),
            ]
        } else {
            prepared
                .labels
                .iter()
                .map(|l| Span::styled(l.clone(), theme.style_muted()))
                .collect()
        };

        let chart = Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .bounds([0.0, (prepared.labels.len().saturating_sub(1)).max(1) as f64])
                    .labels(x_labels)
                    .style(theme.style_muted()),
            )
            .y_axis(
                Axis::default()
                    .bounds([y_min, y_max])
                    .labels(vec![
                        Span::styled(format!("{:.0}", y_min), theme.style_muted()),
                        Span::styled(format!("{:.0}", y_max), theme.style_muted()),
                    ])
                    .style(theme.style_muted()),
            );
        frame.render_widget(chart, area);
    }

    /// Pie charts render as a proportion list; slices of a terminal circle
    /// would waste the space.
    fn draw_pie(&self, frame: &mut Frame, area: Rect, state: &AppState, prepared: &PreparedChart) {
        let theme = &state.theme;
        let Some(series) = prepared.series.first() else {
            return;
        };
        let total: f64 = series.values.iter().filter(|v| **v > 0.0).sum();
        if total <= 0.0 {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    " all slice values are zero",
                    theme.style_muted(),
                )),
                area,
            );
            return;
        }

        let bar_w = (area.width as usize).saturating_sub(36).max(8);
        let lines: Vec<Line> = prepared
            .labels
            .iter()
            .zip(&series.values)
            .enumerate()
            .map(|(i, (label, &value))| {
                let share = (value.max(0.0) / total).clamp(0.0, 1.0);
                let filled = (share * bar_w as f64).round() as usize;
                let bar: String = "█".repeat(filled);
                Line::from(vec![
                    Span::styled(format!(" {:<24}", label), theme.style_default()),
                    Span::styled(
                        bar,
                        Style::default().fg(theme.chart[i % theme.chart.len()]),
                    ),
                    Span::styled(format!(" {:>5.1}%", share * 100.0), theme.style_secondary()),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines).scroll((self.scroll, 0)), area);
    }
}
