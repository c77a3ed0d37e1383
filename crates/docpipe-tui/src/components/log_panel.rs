//! LogPanel — client log viewer with an optional backend tail.
//!
//! Local lines come from the in-app tracing layer; `t` swaps to the
//! backend-side tail fetched over `GET /logs`.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Clear, Paragraph, Wrap},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    widgets::pane_chrome::pane_chrome,
};

#[derive(Clone, Copy, PartialEq)]
enum Source {
    Client,
    Backend,
}

pub struct LogPanel {
    scroll: usize,
    source: Source,
    /// Track last log count to detect new entries for auto-scroll
    last_log_count: usize,
}

impl LogPanel {
    pub fn new() -> Self {
        Self {
            scroll: usize::MAX,
            source: Source::Client,
            last_log_count: 0,
        }
    }
}

impl Component for LogPanel {
    fn id(&self) -> ComponentId {
        ComponentId::LogPanel
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1);
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(10);
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.scroll = 0;
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.scroll = usize::MAX;
            }
            KeyCode::Char('t') => {
                self.source = match self.source {
                    Source::Client => Source::Backend,
                    Source::Backend => Source::Client,
                };
                self.scroll = usize::MAX;
                if self.source == Source::Backend {
                    return vec![Action::FetchRemoteLogs];
                }
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        if area.height == 0 {
            return;
        }
        frame.render_widget(Clear, area);
        let theme = &state.theme;

        let title = match self.source {
            Source::Client => "log",
            Source::Backend => "log (backend)",
        };
        let block = pane_chrome(title, None, focused, None, theme);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let logs = match self.source {
            Source::Client => &state.logs,
            Source::Backend => &state.remote_logs,
        };
        let height = inner.height as usize;
        let log_count = logs.len();

        // Auto-scroll to bottom if new logs arrived and we were at bottom
        if log_count > self.last_log_count {
            let max_scroll = log_count.saturating_sub(height);
            if self.scroll >= max_scroll.saturating_sub(1) {
                self.scroll = usize::MAX;
            }
            self.last_log_count = log_count;
        }

        if logs.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no log entries yet", theme.style_muted())),
                inner,
            );
            return;
        }

        // Clamp scroll — newest last (scroll 0 = top = oldest)
        let max_scroll = log_count.saturating_sub(height);
        if self.scroll > max_scroll {
            self.scroll = max_scroll;
        }

        let lines: Vec<Line> = logs
            .iter()
            .skip(self.scroll)
            .take(height)
            .map(|msg| {
                Line::from(vec![
                    Span::raw("  "),
                    Span::styled(compact_log_line(msg), theme.style_muted()),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }
}

// ── Log line formatting ───────────────────────────────────────────────────────

pub fn compact_log_line(raw: &str) -> String {
    let clean = strip_ansi(raw).trim().to_string();
    let mut rest = clean.as_str();
    let mut head: Vec<String> = Vec::new();

    // Try to parse a leading RFC3339 timestamp
    if let Some((tok, rem)) = split_first_token(rest) {
        if let Some(ts) = compact_timestamp(tok) {
            head.push(ts);
            rest = rem.trim_start();
        }
    }

    // Try to strip a log level
    if let Some((tok, rem)) = split_first_token(rest) {
        let upper = tok.to_ascii_uppercase();
        if matches!(upper.as_str(), "TRACE" | "DEBUG" | "INFO" | "WARN" | "ERROR") {
            head.push(upper);
            rest = rem.trim_start();
        }
    }

    // Strip a module path prefix like "foo::bar: "
    if let Some((left, msg)) = rest.split_once(": ") {
        if !left.is_empty()
            && left.len() <= 48
            && left
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '-'))
        {
            rest = msg.trim_start();
        }
    }

    if head.is_empty() {
        rest.to_string()
    } else if rest.is_empty() {
        head.join(" ")
    } else {
        format!("{} {}", head.join(" "), rest)
    }
}

fn compact_timestamp(token: &str) -> Option<String> {
    let dt = chrono::DateTime::parse_from_rfc3339(token).ok()?;
    let local = dt.with_timezone(&chrono::Local);
    let fmt = if local.date_naive() == chrono::Local::now().date_naive() {
        "%H:%M:%S"
    } else {
        "%m-%d %H:%M"
    };
    Some(local.format(fmt).to_string())
}

fn split_first_token(s: &str) -> Option<(&str, &str)> {
    let mut parts = s.splitn(2, char::is_whitespace);
    let first = parts.next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some((first, parts.next().unwrap_or("")))
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_escape = false;
    for ch in s.chars() {
        if in_escape {
            if ('@'..='~').contains(&ch) {
                in_escape = false;
            }
            continue;
        }
        if ch == '\u{1b}' {
            in_escape = true;
            continue;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_line_strips_level_and_module() {
        let line = "INFO docpipe_tui::pipeline: upload ok, 2 path(s)";
        assert_eq!(compact_log_line(line), "INFO upload ok, 2 path(s)");
    }

    #[test]
    fn compact_line_passes_plain_text() {
        assert_eq!(compact_log_line("just a message"), "just a message");
    }
}
