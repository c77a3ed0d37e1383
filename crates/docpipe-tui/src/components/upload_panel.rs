//! Upload panel — step 1. Staged documents on the left, a directory
//! browser on the right. The funnel also accepts pasted paths (bracketed
//! paste and the system clipboard).

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    ingest::format_size,
    widgets::pane_chrome::{pane_chrome, Badge},
};

#[derive(Clone, Copy, PartialEq)]
enum Side {
    Staged,
    Browser,
}

pub struct UploadPanel {
    side: Side,
    staged_sel: usize,
    browse_sel: usize,
    browse_state: ListState,
    staged_state: ListState,
}

impl UploadPanel {
    pub fn new() -> Self {
        Self {
            side: Side::Browser,
            staged_sel: 0,
            browse_sel: 0,
            browse_state: ListState::default(),
            staged_state: ListState::default(),
        }
    }

    /// Reset browser selection after the App rescans the directory.
    pub fn reset_browse_selection(&mut self) {
        self.browse_sel = 0;
    }

    fn clamp(&mut self, state: &AppState) {
        let staged = state.pipeline.file_meta.len();
        if staged == 0 {
            self.staged_sel = 0;
        } else if self.staged_sel >= staged {
            self.staged_sel = staged - 1;
        }
        let browse = state.browse_entries.len();
        if browse == 0 {
            self.browse_sel = 0;
        } else if self.browse_sel >= browse {
            self.browse_sel = browse - 1;
        }
    }
}

impl Component for UploadPanel {
    fn id(&self) -> ComponentId {
        ComponentId::UploadPanel
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        self.clamp(state);

        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                self.side = Side::Staged;
                return vec![];
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.side = Side::Browser;
                return vec![];
            }
            KeyCode::Char('p') => return vec![Action::PasteClipboard],
            KeyCode::Char('s') => return vec![Action::Submit],
            _ => {}
        }

        match self.side {
            Side::Browser => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.browse_sel = self.browse_sel.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.browse_sel + 1 < state.browse_entries.len() {
                        self.browse_sel += 1;
                    }
                }
                KeyCode::Home | KeyCode::Char('g') => self.browse_sel = 0,
                KeyCode::End | KeyCode::Char('G') => {
                    self.browse_sel = state.browse_entries.len().saturating_sub(1);
                }
                KeyCode::Enter | KeyCode::Char(' ') => {
                    if let Some(entry) = state.browse_entries.get(self.browse_sel) {
                        if entry.is_dir {
                            return vec![Action::BrowseTo(entry.path.clone())];
                        }
                        return vec![Action::StageFile(entry.path.clone())];
                    }
                }
                KeyCode::Backspace => {
                    if let Some(parent) = state.browse_dir.parent() {
                        return vec![Action::BrowseTo(parent.to_path_buf())];
                    }
                }
                _ => {}
            },
            Side::Staged => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.staged_sel = self.staged_sel.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.staged_sel + 1 < state.pipeline.file_meta.len() {
                        self.staged_sel += 1;
                    }
                }
                KeyCode::Char('d') | KeyCode::Delete => {
                    if !state.pipeline.file_meta.is_empty() {
                        return vec![Action::UnstageFile(self.staged_sel)];
                    }
                }
                _ => {}
            },
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        self.clamp(state);
        let theme = &state.theme;
        let pipeline = &state.pipeline;

        let badge = if pipeline.processing {
            Some(Badge {
                text: "UPLOADING",
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
        let block = pane_chrome("upload documents", None, focused, badge, theme);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1), Constraint::Length(1)])
            .split(inner);
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(rows[0]);

        // ── Staged files ──────────────────────────────────────────────────────
        let staged_focused = focused && self.side == Side::Staged;
        let mut staged_items: Vec<ListItem> = Vec::new();
        if pipeline.file_meta.is_empty() {
            staged_items.push(ListItem::new(Span::styled(
                " nothing staged yet",
                theme.style_muted(),
            )));
        } else {
            for (i, meta) in pipeline.file_meta.iter().enumerate() {
                let selected = staged_focused && i == self.staged_sel;
                let line = Line::from(vec![
                    Span::styled(" ▪ ", theme.style_secondary()),
                    Span::styled(meta.name.clone(), theme.style_default()),
                    Span::styled(
                        format!("  {}", format_size(meta.size_bytes)),
                        theme.style_muted(),
                    ),
                ]);
                let item = if selected {
                    ListItem::new(line).style(theme.style_selected(true))
                } else {
                    ListItem::new(line)
                };
                staged_items.push(item);
            }
        }
        let staged_title = format!(" staged ({}) ", pipeline.file_meta.len());
        let mut staged_lines = vec![ListItem::new(Span::styled(
            staged_title,
            if staged_focused {
                theme.style_default()
            } else {
                theme.style_secondary()
            },
        ))];
        staged_lines.extend(staged_items);
        self.staged_state.select(None);
        frame.render_stateful_widget(
            List::new(staged_lines),
            halves[0],
            &mut self.staged_state,
        );

        // ── Browser ───────────────────────────────────────────────────────────
        let browser_focused = focused && self.side == Side::Browser;
        let mut items: Vec<ListItem> = vec![ListItem::new(Span::styled(
            format!(" {} ", state.browse_dir.display()),
            if browser_focused {
                theme.style_default()
            } else {
                theme.style_secondary()
            },
        ))];
        if state.browse_entries.is_empty() {
            items.push(ListItem::new(Span::styled(
                " no documents here",
                theme.style_muted(),
            )));
        }
        let visible = halves[1].height.saturating_sub(1) as usize;
        let offset = self.browse_sel.saturating_sub(visible.saturating_sub(1));
        for (i, entry) in state.browse_entries.iter().enumerate().skip(offset) {
            let selected = browser_focused && i == self.browse_sel;
            let line = if entry.is_dir {
                Line::from(vec![
                    Span::styled(" ▸ ", theme.style_secondary()),
                    Span::styled(format!("{}/", entry.name), theme.style_secondary()),
                ])
            } else {
                Line::from(vec![
                    Span::styled("   ", theme.style_muted()),
                    Span::styled(entry.name.clone(), theme.style_default()),
                    Span::styled(
                        format!("  {}", format_size(entry.size_bytes)),
                        theme.style_muted(),
                    ),
                ])
            };
            let item = if selected {
                ListItem::new(line).style(theme.style_selected(true))
            } else {
                ListItem::new(line)
            };
            items.push(item);
        }
        self.browse_state.select(None);
        frame.render_stateful_widget(List::new(items), halves[1], &mut self.browse_state);

        // ── Error line + hints ────────────────────────────────────────────────
        if let Some(err) = &pipeline.error {
            frame.render_widget(
                Paragraph::new(Span::styled(format!(" {}", err), theme.style_error())),
                rows[1],
            );
        }
        frame.render_widget(
            Paragraph::new(Span::styled(
                " Enter stage/open · Backspace up · d unstage · p paste clipboard · s upload",
                theme.style_muted(),
            )),
            rows[2],
        );
    }
}
