//! App — component-based event loop.
//!
//! Architecture:
//! - `App` owns all components and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks.
//! - The event loop draws each frame, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Network calls run in spawned tasks and report back as `*Done` messages
//!   tagged with the generation that was current when they started.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use ratatui::crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use docpipe_proto::config::Config;
use docpipe_proto::protocol::{
    AnalysisResponse, AvailableData, ProcessRequest, ProcessResponse, StopAfter,
};
use docpipe_proto::store::{DurableStore, SessionStore, keys};

use crate::{
    action::{Action, ComponentId, Workspace},
    analysis::Conversation,
    api::ApiClient,
    app_state::AppState,
    auth::AuthGate,
    component::Component,
    components::{
        chart_panel::ChartPanel, chat_panel::ChatPanel, header::Header,
        help_overlay::HelpOverlay, log_panel::LogPanel, login_screen::LoginScreen,
        metrics_panel::MetricsPanel, progress_panel::ProgressPanel, prompt_panel::PromptPanel,
        results_panel::ResultsPanel, upload_panel::UploadPanel,
    },
    ingest,
    layout::WorkspaceManager,
    pipeline::{PipelineState, Step},
    render::document_rows,
    stats::LifetimeStats,
    theme::Theme,
    widgets::{
        status_bar::{draw_status_bar, Hint},
        toast::ToastManager,
    },
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    UploadDone(u64, Result<Vec<String>>),
    SuggestDone(u64, Result<ProcessResponse>),
    ProcessDone(u64, Result<ProcessResponse>),
    QueryDone(u64, Result<AnalysisResponse>),
    MetadataDone(Result<AvailableData>),
    RemoteLogs(Result<Vec<String>>),
}

/// How many local log lines the panel keeps / mirrors.
const LOG_TAIL_LINES: usize = 300;

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    log_path: PathBuf,

    // Shared state (passed read-only to components)
    pub state: AppState,

    // Stores and backend
    durable: DurableStore,
    session: SessionStore,
    api: ApiClient,

    // Components
    header: Header,
    login_screen: LoginScreen,
    upload_panel: UploadPanel,
    prompt_panel: PromptPanel,
    metrics_panel: MetricsPanel,
    progress_panel: ProgressPanel,
    results_panel: ResultsPanel,
    chat_panel: ChatPanel,
    chart_panel: ChartPanel,
    log_panel: LogPanel,
    help_overlay: HelpOverlay,

    wm: WorkspaceManager,
    toast: ToastManager,

    msg_tx: Option<mpsc::Sender<AppMessage>>,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        durable: DurableStore,
        session: SessionStore,
        log_path: PathBuf,
    ) -> Self {
        let api = ApiClient::new(&config.backend.base_url, config.backend.request_timeout_secs);

        let auth = AuthGate::restore(&session);
        let pipeline = PipelineState::restore(&session);
        let conversation = Conversation::restore(&session, config.analysis.history_window);
        let available = session.get(keys::AVAILABLE_DATA);
        let stats = LifetimeStats::restore(&durable);
        let theme_kind = durable.get(keys::THEME).unwrap_or_default();

        let browse_dir = config.paths.browse_dir.clone();
        let browse_entries = ingest::scan_dir(&browse_dir);

        let state = AppState {
            pipeline,
            conversation,
            auth,
            available,
            chart_turn: None,
            stats,
            theme_kind,
            theme: Theme::of(theme_kind),
            backend_url: api.base_url().to_string(),
            connected: false,
            browse_dir,
            browse_entries,
            logs: Vec::new(),
            remote_logs: Vec::new(),
        };

        let mut wm = WorkspaceManager::new();
        wm.rebuild(state.pipeline.step, state.auth.authenticated);

        Self {
            log_path,
            state,
            durable,
            session,
            api,
            header: Header::new(),
            login_screen: LoginScreen::new(),
            upload_panel: UploadPanel::new(),
            prompt_panel: PromptPanel::new(),
            metrics_panel: MetricsPanel::new(),
            progress_panel: ProgressPanel::new(),
            results_panel: ResultsPanel::new(),
            chat_panel: ChatPanel::new(),
            chart_panel: ChartPanel::new(),
            log_panel: LogPanel::new(),
            help_overlay: HelpOverlay::new(),
            wm,
            toast: ToastManager::new(),
            msg_tx: None,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);
        self.msg_tx = Some(tx.clone());

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // Warm the warehouse metadata cache when a session resumes signed in.
        if self.state.auth.authenticated {
            self.spawn_metadata_fetch();
        }

        // ── Periodic timers ───────────────────────────────────────────────────
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Simulated processing progress advances one checkpoint per tick.
        let mut progress_tick = tokio::time::interval(Duration::from_millis(1200));
        progress_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Log tail refresh: only while the log panel is open.
        let mut log_refresh = tokio::time::interval(Duration::from_secs(2));
        log_refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Best-effort mirroring of the client log to the backend.
        let mut log_mirror = tokio::time::interval(Duration::from_secs(30));
        log_mirror.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            terminal.draw(|f| self.draw(f))?;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    self.handle_message(msg).await;
                }

                _ = ui_tick.tick() => {
                    self.toast.tick();
                    let tick_actions: Vec<Action> = {
                        let s = &self.state;
                        let mut all = Vec::new();
                        all.extend(self.chat_panel.tick(s));
                        all.extend(self.chart_panel.tick(s));
                        all
                    };
                    for action in tick_actions {
                        self.dispatch(action).await;
                    }
                }

                _ = progress_tick.tick() => {
                    if self.state.pipeline.step == Step::Process {
                        self.state.pipeline.tick_progress();
                    }
                }

                _ = log_refresh.tick() => {
                    if self.wm.show_log_panel {
                        self.reload_log_tail();
                    }
                }

                _ = log_mirror.tick() => {
                    if self.state.connected && !self.state.logs.is_empty() {
                        let api = self.api.clone();
                        let lines = self.state.logs.clone();
                        tokio::spawn(async move { api.mirror_logs(&lines).await });
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableBracketedPaste
        )?;
        terminal.show_cursor()?;
        Ok(())
    }

    // ── Message handling ──────────────────────────────────────────────────────

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(ev) => {
                let actions = match ev {
                    Event::Key(key) => self.handle_key(key),
                    Event::Paste(text) => self.stage_pasted(&text),
                    _ => vec![],
                };
                for action in actions {
                    self.dispatch(action).await;
                }
            }

            AppMessage::UploadDone(gen, result) => {
                match result {
                    Ok(paths) => {
                        if self.state.pipeline.apply_upload_ok(gen, paths) {
                            self.state.connected = true;
                            if self.state.pipeline.step == Step::Suggest {
                                self.toast.resolve_spinner(
                                    crate::widgets::toast::Severity::Success,
                                    "documents uploaded",
                                    Duration::from_secs(3),
                                );
                            } else {
                                self.toast.dismiss_spinner();
                            }
                        } else {
                            self.toast.dismiss_spinner();
                        }
                    }
                    Err(e) => {
                        self.state.pipeline.apply_failure(gen, e.to_string());
                        self.toast.dismiss_spinner();
                    }
                }
                self.after_pipeline_change();
            }

            AppMessage::SuggestDone(gen, result) => {
                match result {
                    Ok(resp) => {
                        if let Some(err) = resp.error.filter(|e| !e.is_empty()) {
                            self.state.pipeline.apply_failure(gen, err);
                            self.toast.dismiss_spinner();
                        } else {
                            let metrics = resp.suggested_metrics.unwrap_or_default();
                            if self.state.pipeline.apply_suggest_ok(gen, metrics) {
                                self.state.connected = true;
                                if self.state.pipeline.step == Step::Review {
                                    self.toast.resolve_spinner(
                                        crate::widgets::toast::Severity::Success,
                                        format!(
                                            "{} metric(s) suggested",
                                            self.state.pipeline.suggested_metrics.len()
                                        ),
                                        Duration::from_secs(3),
                                    );
                                } else {
                                    self.toast.dismiss_spinner();
                                }
                            } else {
                                self.toast.dismiss_spinner();
                            }
                        }
                    }
                    Err(e) => {
                        self.state.pipeline.apply_failure(gen, e.to_string());
                        self.toast.dismiss_spinner();
                    }
                }
                self.after_pipeline_change();
            }

            AppMessage::ProcessDone(gen, result) => {
                match result {
                    Ok(resp) => {
                        if self.state.pipeline.apply_process_ok(gen, resp) {
                            self.state.connected = true;
                            if self.state.pipeline.step == Step::Results {
                                self.record_completion();
                                self.toast.resolve_spinner(
                                    crate::widgets::toast::Severity::Success,
                                    "deployed to the warehouse",
                                    Duration::from_secs(4),
                                );
                                // Fresh tables mean fresh metadata.
                                self.spawn_metadata_fetch();
                            } else {
                                self.toast.dismiss_spinner();
                            }
                        } else {
                            self.toast.dismiss_spinner();
                        }
                    }
                    Err(e) => {
                        self.state.pipeline.apply_failure(gen, e.to_string());
                        self.toast.dismiss_spinner();
                    }
                }
                self.after_pipeline_change();
            }

            AppMessage::QueryDone(gen, result) => {
                match result {
                    Ok(resp) => {
                        // The generation check gates the availability merge too:
                        // a response that outlived its conversation is dropped
                        // wholesale, cache included.
                        if self.state.conversation.apply_response(gen, resp.clone()) {
                            self.state.connected = true;
                            self.merge_available(&resp);
                            // Unpin so the newest chart shows.
                            self.state.chart_turn = None;
                        }
                    }
                    Err(e) => {
                        self.state
                            .conversation
                            .apply_transport_failure(gen, &e.to_string());
                    }
                }
                self.persist_conversation();
            }

            AppMessage::MetadataDone(result) => match result {
                Ok(data) => {
                    self.state.connected = true;
                    if let Err(e) = self.session.put(keys::AVAILABLE_DATA, &data) {
                        warn!("app: failed to cache metadata: {}", e);
                    }
                    self.state.available = Some(data);
                }
                Err(e) => debug!("app: metadata refresh failed: {}", e),
            },

            AppMessage::RemoteLogs(result) => match result {
                Ok(lines) => self.state.remote_logs = lines,
                Err(e) => debug!("app: backend log fetch failed: {}", e),
            },
        }
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    /// True when the focused component owns free-text input, so plain
    /// character keys must not be stolen as shortcuts.
    fn typing(&self) -> bool {
        match self.wm.focused() {
            Some(ComponentId::LoginScreen)
            | Some(ComponentId::PromptPanel)
            | Some(ComponentId::ChatPanel) => true,
            Some(ComponentId::MetricsPanel) => self.metrics_panel.is_editing(),
            _ => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }

        // Always-global keys
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return vec![Action::Quit],
                KeyCode::Char('o') => return vec![Action::Logout],
                _ => {}
            }
        }

        if self.wm.show_help {
            // Any key closes the overlay.
            return vec![Action::ToggleHelp];
        }

        if !self.typing() {
            match key.code {
                KeyCode::Char('q') => return vec![Action::Quit],
                KeyCode::Char('?') => return vec![Action::ToggleHelp],
                KeyCode::Char('1') => return vec![Action::SwitchWorkspace(Workspace::Pipeline)],
                KeyCode::Char('2') => return vec![Action::SwitchWorkspace(Workspace::Analysis)],
                KeyCode::Char('L') => return vec![Action::ToggleLogs],
                KeyCode::Char('T') => return vec![Action::ToggleTheme],
                KeyCode::Tab => return vec![Action::FocusNext],
                KeyCode::BackTab => return vec![Action::FocusPrev],
                _ => {}
            }
        } else if self.state.auth.authenticated {
            // Workspace hop still works from text inputs via Alt.
            if key.modifiers.contains(KeyModifiers::ALT) {
                match key.code {
                    KeyCode::Char('1') => {
                        return vec![Action::SwitchWorkspace(Workspace::Pipeline)]
                    }
                    KeyCode::Char('2') => {
                        return vec![Action::SwitchWorkspace(Workspace::Analysis)]
                    }
                    _ => {}
                }
            }
            if key.code == KeyCode::Tab && self.wm.focused() == Some(ComponentId::ChatPanel) {
                return vec![Action::FocusNext];
            }
        }

        let s = &self.state;
        match self.wm.focused() {
            Some(ComponentId::LoginScreen) => self.login_screen.handle_key(key, s),
            Some(ComponentId::UploadPanel) => self.upload_panel.handle_key(key, s),
            Some(ComponentId::PromptPanel) => self.prompt_panel.handle_key(key, s),
            Some(ComponentId::MetricsPanel) => self.metrics_panel.handle_key(key, s),
            Some(ComponentId::ProgressPanel) => self.progress_panel.handle_key(key, s),
            Some(ComponentId::ResultsPanel) => self.results_panel.handle_key(key, s),
            Some(ComponentId::ChatPanel) => self.chat_panel.handle_key(key, s),
            Some(ComponentId::ChartPanel) => self.chart_panel.handle_key(key, s),
            Some(ComponentId::LogPanel) => self.log_panel.handle_key(key, s),
            _ => vec![],
        }
    }

    /// Bracketed paste anywhere in the Upload step stages the pasted paths.
    fn stage_pasted(&mut self, text: &str) -> Vec<Action> {
        let paths = ingest::paths_from_paste(text);
        if paths.is_empty() {
            return vec![];
        }
        paths.into_iter().map(Action::StageFile).collect()
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        // Broadcast to components first so they can react (clear inputs etc).
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.prompt_panel.on_action(&action, s));
            out.extend(self.chat_panel.on_action(&action, s));
            out
        };

        self.apply_action(action).await;
        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        if !matches!(action, Action::Noop) {
            debug!("apply_action: {:?}", action);
        }
        match action {
            // ── Pipeline ──────────────────────────────────────────────────────
            Action::Submit => self.submit_current_step(),
            Action::Back => {
                if self.state.pipeline.back_to_suggest() {
                    self.after_pipeline_change();
                }
            }
            Action::ResetTask => {
                self.state.pipeline.reset();
                self.state.conversation.clear();
                self.state.chart_turn = None;
                if let Err(e) = self.session.reset_task() {
                    warn!("app: session reset failed: {}", e);
                }
                self.toast.info("task reset");
                self.after_pipeline_change();
                self.persist_conversation();
            }
            Action::StageFile(path) => {
                let size = ingest::file_size(&path);
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if self.state.pipeline.stage_file(path, size) {
                    self.toast.info(format!("staged {}", name));
                    self.persist_pipeline();
                } else {
                    self.toast
                        .warning("files can only be added in the upload step");
                }
            }
            Action::UnstageFile(index) => {
                self.state.pipeline.unstage_file(index);
                self.persist_pipeline();
            }
            Action::BrowseTo(dir) => {
                self.state.browse_entries = ingest::scan_dir(&dir);
                self.state.browse_dir = dir;
                self.upload_panel.reset_browse_selection();
            }
            Action::PasteClipboard => self.stage_from_clipboard(),
            Action::PromptChanged(text) => {
                self.state.pipeline.user_prompt = text;
                self.persist_pipeline();
            }
            Action::AddMetric(metric) => {
                if self.state.pipeline.add_metric(metric) {
                    self.persist_pipeline();
                }
            }
            Action::EditMetric(index, metric) => {
                if self.state.pipeline.edit_metric(index, metric) {
                    self.persist_pipeline();
                }
            }
            Action::DeleteMetric(index) => {
                self.state.pipeline.remove_metric(index);
                self.persist_pipeline();
            }
            Action::ToggleMetric(index) => {
                self.state.pipeline.toggle_suggested(index);
                self.persist_pipeline();
            }

            // ── Analysis ──────────────────────────────────────────────────────
            Action::SendQuery(text) => self.send_query(&text),
            Action::ClearConversation => {
                self.state.conversation.clear();
                self.state.chart_turn = None;
                self.persist_conversation();
                self.toast.info("conversation cleared");
            }
            Action::RefreshMetadata => self.spawn_metadata_fetch(),
            Action::ShowChart(turn) => self.state.chart_turn = turn,

            // ── Auth ──────────────────────────────────────────────────────────
            Action::Login(username, secret) => {
                let result = self.state.auth.login(
                    &mut self.durable,
                    &mut self.session,
                    &username,
                    &secret,
                );
                match result {
                    Ok(()) => {
                        self.toast.success(format!("welcome, {}", username));
                        self.rebuild();
                        self.spawn_metadata_fetch();
                    }
                    Err(message) => self.login_screen.reject(message),
                }
            }
            Action::Logout => {
                if !self.state.auth.authenticated {
                    return;
                }
                if let Err(e) = self.state.auth.logout(&mut self.session) {
                    warn!("app: logout persistence failed: {}", e);
                }
                // The on-disk task state is gone; drop the in-memory copy too.
                self.state.pipeline.reset();
                self.state.conversation.clear();
                self.state.chart_turn = None;
                self.wm.set_workspace(Workspace::Pipeline, Step::Upload, false);
                self.header.workspace = Workspace::Pipeline;
                self.rebuild();
            }

            // ── Navigation / UI ───────────────────────────────────────────────
            Action::FocusNext => self.wm.focus_next(),
            Action::FocusPrev => self.wm.focus_prev(),
            Action::SwitchWorkspace(ws) => {
                self.wm.set_workspace(
                    ws,
                    self.state.pipeline.step,
                    self.state.auth.authenticated,
                );
                self.header.workspace = ws;
                if ws == Workspace::Analysis && self.state.available.is_none() {
                    self.spawn_metadata_fetch();
                }
            }
            Action::ToggleLogs => {
                self.wm
                    .toggle_log_panel(self.state.pipeline.step, self.state.auth.authenticated);
                if self.wm.show_log_panel {
                    self.reload_log_tail();
                }
            }
            Action::FetchRemoteLogs => {
                let api = self.api.clone();
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let result = api.fetch_logs().await;
                    if let Some(tx) = tx {
                        let _ = tx.send(AppMessage::RemoteLogs(result)).await;
                    }
                });
            }
            Action::ToggleHelp => self.wm.show_help = !self.wm.show_help,
            Action::ToggleTheme => {
                self.state.theme_kind = self.state.theme_kind.toggled();
                self.state.theme = Theme::of(self.state.theme_kind);
                if let Err(e) = self.durable.put(keys::THEME, &self.state.theme_kind) {
                    warn!("app: failed to persist theme: {}", e);
                }
            }
            Action::CopyToClipboard(text) => match arboard::Clipboard::new() {
                Ok(mut clipboard) => {
                    if clipboard.set_text(text).is_ok() {
                        self.toast.info("copied");
                    }
                }
                Err(e) => debug!("clipboard unavailable: {}", e),
            },

            // ── System ────────────────────────────────────────────────────────
            Action::Quit => self.should_quit = true,
            Action::Noop => {}
        }
    }

    // ── Step submission ───────────────────────────────────────────────────────

    fn submit_current_step(&mut self) {
        match self.state.pipeline.step {
            Step::Upload => {
                if !self.state.pipeline.begin_upload() {
                    return;
                }
                self.persist_pipeline();
                self.toast.spinner("uploading documents…");
                let api = self.api.clone();
                let tx = self.msg_tx.clone();
                let generation = self.state.pipeline.generation;
                let files = self.state.pipeline.pending_files.clone();
                tokio::spawn(async move {
                    let result = api.upload(&files).await;
                    if let Some(tx) = tx {
                        let _ = tx.send(AppMessage::UploadDone(generation, result)).await;
                    }
                });
            }
            Step::Suggest => {
                if !self.state.pipeline.begin_suggest() {
                    return;
                }
                self.persist_pipeline();
                self.toast.spinner("asking for metric suggestions…");
                let api = self.api.clone();
                let tx = self.msg_tx.clone();
                let generation = self.state.pipeline.generation;
                let prompt = self.state.pipeline.user_prompt.trim().to_string();
                let request = ProcessRequest {
                    file_paths: self.state.pipeline.uploaded_paths.clone(),
                    user_prompt: (!prompt.is_empty()).then_some(prompt),
                    selected_metrics: None,
                    stop_after: Some(StopAfter::Extract),
                };
                tokio::spawn(async move {
                    let result = api.process(&request).await;
                    if let Some(tx) = tx {
                        let _ = tx.send(AppMessage::SuggestDone(generation, result)).await;
                    }
                });
            }
            Step::Review => {
                if !self.state.pipeline.begin_process() {
                    return;
                }
                self.after_pipeline_change();
                self.toast.spinner("extracting and deploying…");
                let api = self.api.clone();
                let tx = self.msg_tx.clone();
                let generation = self.state.pipeline.generation;
                let prompt = self.state.pipeline.user_prompt.trim().to_string();
                let request = ProcessRequest {
                    file_paths: self.state.pipeline.uploaded_paths.clone(),
                    user_prompt: (!prompt.is_empty()).then_some(prompt),
                    selected_metrics: Some(self.state.pipeline.selected_metrics.clone()),
                    stop_after: Some(StopAfter::All),
                };
                tokio::spawn(async move {
                    let result = api.process(&request).await;
                    if let Some(tx) = tx {
                        let _ = tx.send(AppMessage::ProcessDone(generation, result)).await;
                    }
                });
            }
            Step::Process | Step::Results => {}
        }
    }

    fn send_query(&mut self, text: &str) {
        match self.state.conversation.begin_query(text) {
            Ok(history) => {
                self.persist_conversation();
                let api = self.api.clone();
                let tx = self.msg_tx.clone();
                let generation = self.state.conversation.generation;
                let query = text.trim().to_string();
                tokio::spawn(async move {
                    let result = api.analysis_query(&query, history).await;
                    if let Some(tx) = tx {
                        let _ = tx.send(AppMessage::QueryDone(generation, result)).await;
                    }
                });
            }
            Err(crate::analysis::QueryRejection::Busy) => {
                self.toast.warning("an analysis request is already running");
            }
            Err(crate::analysis::QueryRejection::Empty) => {}
        }
    }

    fn stage_from_clipboard(&mut self) {
        let text = match arboard::Clipboard::new().and_then(|mut c| c.get_text()) {
            Ok(text) => text,
            Err(e) => {
                debug!("clipboard unavailable: {}", e);
                self.toast.warning("clipboard is not available");
                return;
            }
        };
        let paths = ingest::paths_from_paste(&text);
        if paths.is_empty() {
            self.toast.info("no document paths on the clipboard");
            return;
        }
        let count = paths.len();
        for path in paths {
            let size = ingest::file_size(&path);
            self.state.pipeline.stage_file(path, size);
        }
        self.persist_pipeline();
        self.toast.success(format!("staged {} file(s)", count));
    }

    fn spawn_metadata_fetch(&mut self) {
        let api = self.api.clone();
        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let result = api.analysis_metadata().await;
            if let Some(tx) = tx {
                let _ = tx.send(AppMessage::MetadataDone(result)).await;
            }
        });
    }

    /// Fold piggybacked availability lists into the metadata cache.
    fn merge_available(&mut self, resp: &AnalysisResponse) {
        if resp.available_companies.is_none() && resp.available_metrics.is_none() {
            return;
        }
        let mut data = self.state.available.clone().unwrap_or_default();
        if let Some(companies) = &resp.available_companies {
            data.companies = companies.clone();
        }
        if let Some(metrics) = &resp.available_metrics {
            data.metrics = metrics.clone();
        }
        self.state.available = Some(data);
    }

    fn record_completion(&mut self) {
        let Some(outcome) = &self.state.pipeline.results else {
            return;
        };
        let documents = document_rows(outcome).len() as u64;
        let metrics = self.state.pipeline.selected_metrics.len() as u64;
        let rows = outcome
            .deployment
            .as_ref()
            .map(|d| d.rows_loaded)
            .unwrap_or(0);
        self.state
            .stats
            .record_completion(&mut self.durable, documents, metrics, rows);
    }

    // ── Persistence / bookkeeping ─────────────────────────────────────────────

    fn persist_pipeline(&mut self) {
        if let Err(e) = self.state.pipeline.persist(&mut self.session) {
            warn!("app: pipeline persistence failed: {}", e);
        }
    }

    fn persist_conversation(&mut self) {
        if let Err(e) = self.state.conversation.persist(&mut self.session) {
            warn!("app: conversation persistence failed: {}", e);
        }
    }

    /// Persist and rebuild after anything that may have moved the step.
    fn after_pipeline_change(&mut self) {
        self.persist_pipeline();
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.wm
            .rebuild(self.state.pipeline.step, self.state.auth.authenticated);
    }

    fn reload_log_tail(&mut self) {
        match std::fs::read_to_string(&self.log_path) {
            Ok(content) => {
                let lines: Vec<String> = content.lines().map(str::to_string).collect();
                let start = lines.len().saturating_sub(LOG_TAIL_LINES);
                self.state.logs = lines[start..].to_vec();
            }
            Err(e) => debug!("log tail unavailable: {}", e),
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        frame.render_widget(
            ratatui::widgets::Block::default()
                .style(ratatui::style::Style::default().bg(self.state.theme.bg)),
            area,
        );

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(4),
                Constraint::Length(1),
            ])
            .split(area);

        self.header.draw(frame, rows[0], &self.state);
        self.draw_body(frame, rows[1]);
        self.draw_status_bar(frame, rows[2]);

        if self.wm.show_help {
            self.help_overlay.draw(frame, area, &self.state);
        }
        self.toast.draw(frame, area, &self.state.theme);
    }

    fn draw_body(&mut self, frame: &mut ratatui::Frame, area: Rect) {
        if !self.state.auth.authenticated {
            let focused = self.wm.is_focused(ComponentId::LoginScreen);
            self.login_screen.draw(frame, area, focused, &self.state);
            return;
        }

        let (main, log_area) = if self.wm.show_log_panel {
            let split = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(4), Constraint::Length(9)])
                .split(area);
            (split[0], Some(split[1]))
        } else {
            (area, None)
        };

        match self.wm.workspace {
            Workspace::Pipeline => {
                let id = match self.state.pipeline.step {
                    Step::Upload => ComponentId::UploadPanel,
                    Step::Suggest => ComponentId::PromptPanel,
                    Step::Review => ComponentId::MetricsPanel,
                    Step::Process => ComponentId::ProgressPanel,
                    Step::Results => ComponentId::ResultsPanel,
                };
                let focused = self.wm.is_focused(id);
                let s = &self.state;
                match self.state.pipeline.step {
                    Step::Upload => self.upload_panel.draw(frame, main, focused, s),
                    Step::Suggest => self.prompt_panel.draw(frame, main, focused, s),
                    Step::Review => self.metrics_panel.draw(frame, main, focused, s),
                    Step::Process => self.progress_panel.draw(frame, main, focused, s),
                    Step::Results => self.results_panel.draw(frame, main, focused, s),
                }
            }
            Workspace::Analysis => {
                let halves = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                    .split(main);
                let chat_focused = self.wm.is_focused(ComponentId::ChatPanel);
                let chart_focused = self.wm.is_focused(ComponentId::ChartPanel);
                self.chat_panel
                    .draw(frame, halves[0], chat_focused, &self.state);
                self.chart_panel
                    .draw(frame, halves[1], chart_focused, &self.state);
            }
        }

        if let Some(log_area) = log_area {
            let focused = self.wm.is_focused(ComponentId::LogPanel);
            self.log_panel.draw(frame, log_area, focused, &self.state);
        }
    }

    fn draw_status_bar(&self, frame: &mut ratatui::Frame, area: Rect) {
        let mut hints: Vec<Hint> = Vec::new();
        if !self.state.auth.authenticated {
            hints.push(("Enter", "sign in"));
            hints.push(("^C", "quit"));
        } else {
            hints.push(("1/2", "workspace"));
            if !self.typing() {
                hints.push(("Tab", "focus"));
                hints.push(("L", "logs"));
                hints.push(("?", "help"));
                hints.push(("q", "quit"));
            } else {
                hints.push(("^O", "log out"));
                hints.push(("^C", "quit"));
            }
        }
        draw_status_bar(frame, area, &hints, &self.state.theme);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_app(dir: &std::path::Path) -> App {
        App::new(
            Config::default(),
            DurableStore::open(dir.join("durable.json")),
            SessionStore::open(dir.join("session.json")),
            dir.join("docpipe.log"),
        )
    }

    fn availability_response() -> AnalysisResponse {
        AnalysisResponse {
            summary: Some("Two companies are loaded.".into()),
            available_companies: Some(vec!["Apple".into(), "Tesla".into()]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn stale_query_response_is_dropped_wholesale() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.state
            .conversation
            .begin_query("revenue by company")
            .unwrap();
        let stale = app.state.conversation.generation;
        app.state.conversation.clear();

        app.handle_message(AppMessage::QueryDone(stale, Ok(availability_response())))
            .await;

        // Neither the conversation nor the metadata cache sees the response.
        assert!(app.state.conversation.turns().is_empty());
        assert!(app.state.available.is_none());
    }

    #[tokio::test]
    async fn current_query_response_merges_availability() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.state
            .conversation
            .begin_query("revenue by company")
            .unwrap();
        let gen = app.state.conversation.generation;

        app.handle_message(AppMessage::QueryDone(gen, Ok(availability_response())))
            .await;

        let data = app.state.available.as_ref().unwrap();
        assert_eq!(data.companies, vec!["Apple", "Tesla"]);
        assert_eq!(app.state.conversation.turns().len(), 2);
    }
}
