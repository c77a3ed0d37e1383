//! Action enum — all user-initiated intents and internal events.

use std::path::PathBuf;

use docpipe_proto::protocol::Metric;

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    UploadPanel,
    PromptPanel,
    MetricsPanel,
    ProgressPanel,
    ResultsPanel,
    ChatPanel,
    ChartPanel,
    LogPanel,
    HelpOverlay,
    LoginScreen,
}

/// Which workspace (tab) is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workspace {
    /// The five-step document pipeline.
    Pipeline,
    /// The conversational analysis view.
    Analysis,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Pipeline ─────────────────────────────────────────────────────────────
    /// Submit whatever the current step submits (upload / suggest / process).
    Submit,
    /// Review → Suggest.
    Back,
    /// Clear the whole task (pipeline + conversation).
    ResetTask,
    StageFile(PathBuf),
    UnstageFile(usize),
    /// Point the file browser at a different directory.
    BrowseTo(PathBuf),
    /// Pull file paths out of the system clipboard.
    PasteClipboard,
    PromptChanged(String),
    AddMetric(Metric),
    EditMetric(usize, Metric),
    DeleteMetric(usize),
    /// Toggle the Nth *suggested* metric in/out of the working set.
    ToggleMetric(usize),

    // ── Analysis ─────────────────────────────────────────────────────────────
    SendQuery(String),
    /// Drop the whole conversation (the task itself is untouched).
    ClearConversation,
    RefreshMetadata,
    /// Pin the chart panel to the chart of a given turn (None = latest).
    ShowChart(Option<usize>),

    // ── Auth ─────────────────────────────────────────────────────────────────
    Login(String, String),
    Logout,

    // ── Navigation / UI ──────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    SwitchWorkspace(Workspace),
    ToggleLogs,
    /// Pull the backend log tail for the log panel.
    FetchRemoteLogs,
    ToggleHelp,
    ToggleTheme,
    CopyToClipboard(String),

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
    Noop,
}
