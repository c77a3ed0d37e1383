//! AppState — shared read-only data passed to all components during
//! render/event handling.
//!
//! Components read this but never mutate it. The App event loop is the only
//! writer, and it persists tracked fields after every mutating dispatch.

use std::path::PathBuf;

use docpipe_proto::protocol::{AvailableData, ChartSpec};

use crate::analysis::Conversation;
use crate::auth::AuthGate;
use crate::ingest::BrowseEntry;
use crate::pipeline::PipelineState;
use crate::stats::LifetimeStats;
use crate::theme::{Theme, ThemeKind};

pub struct AppState {
    // ── Aggregates (single-writer, persisted) ────────────────────────────────
    pub pipeline: PipelineState,
    pub conversation: Conversation,
    pub auth: AuthGate,

    // ── Analysis side data ───────────────────────────────────────────────────
    /// Warehouse metadata cache (companies / metrics / tables).
    pub available: Option<AvailableData>,
    /// Which assistant turn the chart panel is pinned to (None = latest).
    pub chart_turn: Option<usize>,

    // ── Device-level ─────────────────────────────────────────────────────────
    pub stats: LifetimeStats,
    pub theme_kind: ThemeKind,
    pub theme: Theme,

    // ── Environment ──────────────────────────────────────────────────────────
    pub backend_url: String,
    /// Set after the first successful backend response of the session.
    pub connected: bool,
    pub browse_dir: PathBuf,
    pub browse_entries: Vec<BrowseEntry>,

    // ── Logs ─────────────────────────────────────────────────────────────────
    /// In-app log lines (newest last), shown by the log panel.
    pub logs: Vec<String>,
    /// Backend-side log tail fetched on demand.
    pub remote_logs: Vec<String>,
}

impl AppState {
    /// The chart the chart panel should draw: the pinned turn's chart, or
    /// the most recent assistant chart.
    pub fn current_chart(&self) -> Option<&ChartSpec> {
        if let Some(idx) = self.chart_turn {
            return self
                .conversation
                .turns()
                .get(idx)
                .and_then(|t| t.response.as_ref())
                .and_then(|r| r.chart.as_ref());
        }
        self.conversation
            .turns()
            .iter()
            .rev()
            .find_map(|t| t.response.as_ref().and_then(|r| r.chart.as_ref()))
    }

    pub fn username(&self) -> &str {
        self.auth.username.as_deref().unwrap_or("—")
    }
}
