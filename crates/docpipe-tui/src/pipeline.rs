//! Pipeline state machine — the five-step document→warehouse workflow.
//!
//! All mutation happens through the methods here, driven by the App event
//! loop. Network calls never run inside this module: the App spawns them and
//! feeds completions back as `apply_*` calls tagged with the `generation`
//! that was current when the request started. A completion whose generation
//! no longer matches (the task was reset meanwhile) is dropped, so a late
//! response can never resurrect stale state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use docpipe_proto::protocol::{Metric, ProcessResponse};
use docpipe_proto::store::{keys, SessionStore, StoreError};

/// Simulated progress checkpoints shown while the backend works through its
/// phases (upload, extract, analyze, design schema, deploy). Cosmetic
/// approximation only — the backend does not report real phase completion.
/// 100 is reached exclusively by `apply_process_ok`.
pub const PROGRESS_CHECKPOINTS: &[u8] = &[10, 20, 30, 40, 60];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Step {
    #[default]
    Upload,
    Suggest,
    Review,
    Process,
    Results,
}

impl Step {
    pub fn ordinal(self) -> u8 {
        match self {
            Step::Upload => 1,
            Step::Suggest => 2,
            Step::Review => 3,
            Step::Process => 4,
            Step::Results => 5,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Upload => "Upload",
            Step::Suggest => "Suggest",
            Step::Review => "Review",
            Step::Process => "Process",
            Step::Results => "Results",
        }
    }
}

/// Persistable shadow of a staged file. The raw path handle lives only in
/// `pending_files` and is lost on reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Default)]
pub struct PipelineState {
    pub step: Step,
    /// Staged file handles — session-only, never serialized. After a reload
    /// the user re-selects files if the step is back at Upload.
    pub pending_files: Vec<PathBuf>,
    pub file_meta: Vec<FileMeta>,
    pub uploaded_paths: Vec<String>,
    pub user_prompt: String,
    pub suggested_metrics: Vec<Metric>,
    pub selected_metrics: Vec<Metric>,
    pub results: Option<ProcessResponse>,

    /// One network operation in flight at a time.
    pub processing: bool,
    /// Single-slot error, cleared on the next attempt.
    pub error: Option<String>,
    /// Simulated progress while in Process (0–100).
    pub progress: u8,
    /// Bumped on every reset; stale completions are matched against this.
    pub generation: u64,
}

impl PipelineState {
    // ── Staging (file ingestion funnel feeds this) ───────────────────────────

    /// Append a staged file plus its metadata shadow. Only valid while the
    /// step is Upload; drop/paste sources are no-ops otherwise. Duplicate
    /// names are intentionally allowed.
    pub fn stage_file(&mut self, path: PathBuf, size_bytes: u64) -> bool {
        if self.step != Step::Upload {
            return false;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.file_meta.push(FileMeta { name, size_bytes });
        self.pending_files.push(path);
        true
    }

    pub fn unstage_file(&mut self, index: usize) {
        if index < self.pending_files.len() {
            self.pending_files.remove(index);
        }
        if index < self.file_meta.len() {
            self.file_meta.remove(index);
        }
    }

    // ── Gates ────────────────────────────────────────────────────────────────

    /// Whether the current step's submit action is allowed right now.
    /// Checked both for button enablement and again at transition time.
    pub fn can_submit(&self) -> bool {
        if self.processing {
            return false;
        }
        match self.step {
            Step::Upload => !self.pending_files.is_empty(),
            Step::Suggest => !self.uploaded_paths.is_empty(),
            Step::Review => !self.selected_metrics.is_empty(),
            Step::Process | Step::Results => false,
        }
    }

    // ── Upload ───────────────────────────────────────────────────────────────

    pub fn begin_upload(&mut self) -> bool {
        if self.processing || self.step != Step::Upload {
            return false;
        }
        self.error = None;
        if self.pending_files.is_empty() {
            self.error = Some("Add at least one document before uploading.".to_string());
            return false;
        }
        self.processing = true;
        info!("pipeline: uploading {} file(s)", self.pending_files.len());
        true
    }

    pub fn apply_upload_ok(&mut self, generation: u64, server_paths: Vec<String>) -> bool {
        if !self.accept(generation) {
            return false;
        }
        self.processing = false;
        if server_paths.is_empty() {
            self.error = Some("The server accepted no files. Try uploading again.".to_string());
            return true;
        }
        self.uploaded_paths = server_paths;
        self.step = Step::Suggest;
        info!("pipeline: upload ok, {} path(s), step → Suggest", self.uploaded_paths.len());
        true
    }

    // ── Suggest ──────────────────────────────────────────────────────────────

    pub fn begin_suggest(&mut self) -> bool {
        if self.processing || self.step != Step::Suggest {
            return false;
        }
        self.error = None;
        if self.uploaded_paths.is_empty() {
            self.error = Some("No uploaded documents to analyze.".to_string());
            return false;
        }
        self.processing = true;
        info!("pipeline: requesting metric suggestions");
        true
    }

    pub fn apply_suggest_ok(&mut self, generation: u64, metrics: Vec<Metric>) -> bool {
        if !self.accept(generation) {
            return false;
        }
        self.processing = false;
        if metrics.is_empty() {
            // Semantic empty result: soft failure, same recovery as transport.
            self.error = Some(
                "No metrics were suggested. Add a prompt describing what to extract and retry."
                    .to_string(),
            );
            return true;
        }
        self.suggested_metrics = metrics.clone();
        self.selected_metrics = metrics;
        self.step = Step::Review;
        info!(
            "pipeline: {} metric(s) suggested, step → Review",
            self.suggested_metrics.len()
        );
        true
    }

    // ── Review (local editing only) ──────────────────────────────────────────

    pub fn back_to_suggest(&mut self) -> bool {
        if self.processing || self.step != Step::Review {
            return false;
        }
        self.error = None;
        self.step = Step::Suggest;
        true
    }

    pub fn add_metric(&mut self, metric: Metric) -> bool {
        self.error = None;
        if metric.name.trim().is_empty() {
            self.error = Some("Metric name cannot be empty.".to_string());
            return false;
        }
        if self.selected_metrics.iter().any(|m| m.name == metric.name) {
            self.error = Some(format!("A metric named '{}' already exists.", metric.name));
            return false;
        }
        self.selected_metrics.push(metric);
        true
    }

    /// Replace the metric at `index` in place. Renaming onto another
    /// existing metric is rejected so names stay unique.
    pub fn edit_metric(&mut self, index: usize, metric: Metric) -> bool {
        self.error = None;
        if index >= self.selected_metrics.len() {
            return false;
        }
        if metric.name.trim().is_empty() {
            self.error = Some("Metric name cannot be empty.".to_string());
            return false;
        }
        let clash = self
            .selected_metrics
            .iter()
            .enumerate()
            .any(|(i, m)| i != index && m.name == metric.name);
        if clash {
            self.error = Some(format!("A metric named '{}' already exists.", metric.name));
            return false;
        }
        self.selected_metrics[index] = metric;
        true
    }

    pub fn remove_metric(&mut self, index: usize) {
        if index < self.selected_metrics.len() {
            self.selected_metrics.remove(index);
        }
    }

    /// Toggle a suggested metric in/out of the working set.
    pub fn toggle_suggested(&mut self, index: usize) {
        let Some(suggested) = self.suggested_metrics.get(index).cloned() else {
            return;
        };
        if let Some(pos) = self
            .selected_metrics
            .iter()
            .position(|m| m.name == suggested.name)
        {
            self.selected_metrics.remove(pos);
        } else {
            self.selected_metrics.push(suggested);
        }
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected_metrics.iter().any(|m| m.name == name)
    }

    // ── Process ──────────────────────────────────────────────────────────────

    pub fn begin_process(&mut self) -> bool {
        if self.processing || self.step != Step::Review {
            return false;
        }
        self.error = None;
        if self.selected_metrics.is_empty() {
            self.error = Some("Select at least one metric before processing.".to_string());
            return false;
        }
        self.processing = true;
        self.step = Step::Process;
        self.progress = PROGRESS_CHECKPOINTS[0];
        info!(
            "pipeline: extraction started with {} metric(s)",
            self.selected_metrics.len()
        );
        true
    }

    /// Advance the simulated progress one checkpoint. Called on a timer while
    /// processing; stops short of 100 until the network call resolves.
    pub fn tick_progress(&mut self) -> bool {
        if !self.processing || self.step != Step::Process {
            return false;
        }
        let next = PROGRESS_CHECKPOINTS
            .iter()
            .copied()
            .find(|&c| c > self.progress);
        match next {
            Some(c) => {
                self.progress = c;
                true
            }
            None => false,
        }
    }

    pub fn apply_process_ok(&mut self, generation: u64, outcome: ProcessResponse) -> bool {
        if !self.accept(generation) {
            return false;
        }
        self.processing = false;
        if let Some(err) = outcome.error.as_deref().filter(|e| !e.is_empty()) {
            self.step = Step::Review;
            self.progress = 0;
            self.error = Some(format!("Processing failed: {}. Adjust metrics and retry.", err));
            return true;
        }
        self.results = Some(outcome);
        self.progress = 100;
        self.step = Step::Results;
        info!("pipeline: processing complete, step → Results");
        true
    }

    // ── Shared failure / reset ───────────────────────────────────────────────

    /// Transport or HTTP failure for whichever call is in flight. The step
    /// holds (Process drops back to Review) and accumulated state is kept so
    /// a retry does not redo prior steps.
    pub fn apply_failure(&mut self, generation: u64, message: String) -> bool {
        if !self.accept(generation) {
            return false;
        }
        self.processing = false;
        if self.step == Step::Process {
            self.step = Step::Review;
            self.progress = 0;
        }
        warn!("pipeline: request failed: {}", message);
        self.error = Some(message);
        true
    }

    /// Replace the whole structure with defaults. Idempotent; bumps the
    /// generation so in-flight completions are discarded on arrival.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = PipelineState {
            generation,
            ..PipelineState::default()
        };
        info!("pipeline: task reset (generation {})", generation);
    }

    fn accept(&self, generation: u64) -> bool {
        if generation != self.generation {
            warn!(
                "pipeline: dropping stale completion (generation {} != {})",
                generation, self.generation
            );
            return false;
        }
        true
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Write every persistable field through to the session store. Called
    /// after each mutating dispatch; `pending_files` is deliberately absent.
    pub fn persist(&self, store: &mut SessionStore) -> Result<(), StoreError> {
        store.put(keys::STEP, &self.step)?;
        store.put(keys::FILE_META, &self.file_meta)?;
        store.put(keys::UPLOADED_PATHS, &self.uploaded_paths)?;
        store.put(keys::USER_PROMPT, &self.user_prompt)?;
        store.put(keys::SUGGESTED_METRICS, &self.suggested_metrics)?;
        store.put(keys::SELECTED_METRICS, &self.selected_metrics)?;
        store.put(keys::RESULTS, &self.results)?;
        Ok(())
    }

    /// Rebuild from the session store, field by field, falling back to the
    /// default on any absent or corrupt entry.
    pub fn restore(store: &SessionStore) -> Self {
        let mut state = PipelineState {
            step: store.get_or_default(keys::STEP),
            file_meta: store.get_or_default(keys::FILE_META),
            uploaded_paths: store.get_or_default(keys::UPLOADED_PATHS),
            user_prompt: store.get_or_default(keys::USER_PROMPT),
            suggested_metrics: store.get_or_default(keys::SUGGESTED_METRICS),
            selected_metrics: store.get_or_default(keys::SELECTED_METRICS),
            results: store.get::<Option<ProcessResponse>>(keys::RESULTS).flatten(),
            ..PipelineState::default()
        };
        // File handles cannot be restored; a session that reloads mid-Upload
        // starts the staging over, and a mid-Process reload retries from
        // Review rather than pretending a request is still in flight.
        if state.step == Step::Upload {
            state.file_meta.clear();
        }
        if state.step == Step::Process {
            state.step = Step::Review;
            state.progress = 0;
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpipe_proto::protocol::{Deployment, MetricKind};
    use std::collections::BTreeMap;

    fn metric(name: &str) -> Metric {
        Metric::new(name, MetricKind::Float, "test metric")
    }

    fn staged(state: &mut PipelineState, n: usize) {
        for i in 0..n {
            assert!(state.stage_file(PathBuf::from(format!("/tmp/doc{}.pdf", i)), 100));
        }
    }

    fn outcome_success() -> ProcessResponse {
        ProcessResponse {
            extracted_metrics_by_document: Some(BTreeMap::from([(
                "doc0.pdf".to_string(),
                BTreeMap::from([("revenue".to_string(), serde_json::json!(383.0))]),
            )])),
            deployment: Some(Deployment {
                status: "SUCCESS".to_string(),
                database: "FIN".to_string(),
                schema: "PUBLIC".to_string(),
                rows_loaded: 12,
                tables_created: 1,
            }),
            ..ProcessResponse::default()
        }
    }

    #[test]
    fn forward_walk_increases_step_with_gates_satisfied() {
        let mut p = PipelineState::default();
        staged(&mut p, 2);

        assert!(p.begin_upload());
        assert!(p.apply_upload_ok(0, vec!["/srv/a.pdf".into(), "/srv/b.pdf".into()]));
        assert_eq!(p.step, Step::Suggest);
        assert_eq!(p.uploaded_paths.len(), 2);

        assert!(p.begin_suggest());
        assert!(p.apply_suggest_ok(0, vec![metric("revenue"), metric("assets"), metric("debt")]));
        assert_eq!(p.step, Step::Review);
        assert_eq!(p.selected_metrics.len(), 3);

        assert!(p.begin_process());
        assert_eq!(p.step, Step::Process);
        assert!(p.apply_process_ok(0, outcome_success()));
        assert_eq!(p.step, Step::Results);
        assert!(p.results.is_some());
        assert_eq!(p.progress, 100);
    }

    #[test]
    fn scenario_two_files_three_metrics_deselect_one() {
        let mut p = PipelineState::default();
        staged(&mut p, 2);
        p.user_prompt = "extract revenue".to_string();

        assert!(p.begin_upload());
        assert!(p.apply_upload_ok(0, vec!["/srv/a.pdf".into(), "/srv/b.pdf".into()]));
        assert_eq!(p.step, Step::Suggest);
        assert_eq!(p.uploaded_paths.len(), 2);

        assert!(p.begin_suggest());
        assert!(p.apply_suggest_ok(0, vec![metric("revenue"), metric("assets"), metric("debt")]));
        assert_eq!(p.selected_metrics.len(), 3);

        p.toggle_suggested(2); // deselect "debt"
        assert_eq!(p.selected_metrics.len(), 2);
        assert!(!p.is_selected("debt"));

        assert!(p.begin_process());
        assert!(p.apply_process_ok(0, outcome_success()));
        assert_eq!(p.step, Step::Results);
        assert_eq!(
            p.results.unwrap().deployment.unwrap().status,
            "SUCCESS"
        );
    }

    #[test]
    fn upload_gate_rejects_empty_staging() {
        let mut p = PipelineState::default();
        assert!(!p.begin_upload());
        assert!(p.error.is_some());
        assert_eq!(p.step, Step::Upload);
        assert!(!p.processing);
    }

    #[test]
    fn stage_file_is_noop_outside_upload_step() {
        let mut p = PipelineState::default();
        staged(&mut p, 1);
        assert!(p.begin_upload());
        assert!(p.apply_upload_ok(0, vec!["/srv/a.pdf".into()]));
        assert!(!p.stage_file(PathBuf::from("/tmp/late.pdf"), 1));
        assert_eq!(p.pending_files.len(), 1);
    }

    #[test]
    fn duplicate_filenames_stage_twice() {
        let mut p = PipelineState::default();
        assert!(p.stage_file(PathBuf::from("/a/report.pdf"), 10));
        assert!(p.stage_file(PathBuf::from("/b/report.pdf"), 20));
        assert_eq!(p.file_meta.len(), 2);
        assert_eq!(p.file_meta[0].name, "report.pdf");
        assert_eq!(p.file_meta[1].name, "report.pdf");
    }

    #[test]
    fn empty_suggestions_are_a_soft_failure() {
        let mut p = PipelineState::default();
        staged(&mut p, 1);
        assert!(p.begin_upload());
        assert!(p.apply_upload_ok(0, vec!["/srv/a.pdf".into()]));

        assert!(p.begin_suggest());
        assert!(p.apply_suggest_ok(0, vec![]));
        assert_eq!(p.step, Step::Suggest);
        assert!(p.error.is_some());
        assert!(!p.processing);
        // Prior state untouched, retry needs no re-upload.
        assert_eq!(p.uploaded_paths.len(), 1);
    }

    #[test]
    fn failure_preserves_step_and_accumulated_state() {
        let mut p = PipelineState::default();
        staged(&mut p, 1);
        assert!(p.begin_upload());
        assert!(p.apply_upload_ok(0, vec!["/srv/a.pdf".into()]));
        assert!(p.begin_suggest());
        assert!(p.apply_failure(0, "backend unreachable".to_string()));

        assert_eq!(p.step, Step::Suggest);
        assert_eq!(p.uploaded_paths.len(), 1);
        assert_eq!(p.error.as_deref(), Some("backend unreachable"));

        // Next attempt clears the error slot.
        assert!(p.begin_suggest());
        assert!(p.error.is_none());
    }

    #[test]
    fn process_failure_never_reports_100() {
        let mut p = PipelineState::default();
        staged(&mut p, 1);
        assert!(p.begin_upload());
        assert!(p.apply_upload_ok(0, vec!["/srv/a.pdf".into()]));
        assert!(p.begin_suggest());
        assert!(p.apply_suggest_ok(0, vec![metric("revenue")]));
        assert!(p.begin_process());

        while p.tick_progress() {}
        assert_eq!(p.progress, *PROGRESS_CHECKPOINTS.last().unwrap());

        assert!(p.apply_failure(0, "deploy failed".to_string()));
        assert_eq!(p.step, Step::Review);
        assert_eq!(p.progress, 0);
        assert!(p.results.is_none());
    }

    #[test]
    fn processing_flag_blocks_reentrant_submission() {
        let mut p = PipelineState::default();
        staged(&mut p, 1);
        assert!(p.begin_upload());
        assert!(!p.begin_upload());
        assert!(!p.can_submit());
    }

    #[test]
    fn metric_identity_add_edit_delete() {
        let mut p = PipelineState::default();
        assert!(p.add_metric(metric("revenue")));
        assert!(!p.add_metric(metric("revenue")));
        assert_eq!(
            p.selected_metrics.iter().filter(|m| m.name == "revenue").count(),
            1
        );

        let edited = Metric::new("revenue", MetricKind::Int, "rounded");
        assert!(p.edit_metric(0, edited));
        assert_eq!(
            p.selected_metrics.iter().filter(|m| m.name == "revenue").count(),
            1
        );
        assert_eq!(p.selected_metrics[0].kind, MetricKind::Int);

        p.remove_metric(0);
        assert!(p.selected_metrics.is_empty());
    }

    #[test]
    fn edit_cannot_rename_onto_existing_metric() {
        let mut p = PipelineState::default();
        assert!(p.add_metric(metric("revenue")));
        assert!(p.add_metric(metric("assets")));
        assert!(!p.edit_metric(1, metric("revenue")));
        assert_eq!(p.selected_metrics[1].name, "assets");
    }

    #[test]
    fn toggle_removes_then_restores() {
        let mut p = PipelineState::default();
        p.suggested_metrics = vec![metric("revenue"), metric("assets")];
        p.selected_metrics = p.suggested_metrics.clone();

        p.toggle_suggested(0);
        assert!(!p.is_selected("revenue"));
        assert_eq!(p.selected_metrics.len(), 1);

        p.toggle_suggested(0);
        assert!(p.is_selected("revenue"));
        assert_eq!(p.selected_metrics.len(), 2);
    }

    #[test]
    fn reset_is_idempotent_and_bumps_generation() {
        let mut p = PipelineState::default();
        staged(&mut p, 1);
        assert!(p.begin_upload());
        assert!(p.apply_upload_ok(0, vec!["/srv/a.pdf".into()]));

        p.reset();
        assert_eq!(p.step, Step::Upload);
        assert!(p.uploaded_paths.is_empty());
        assert_eq!(p.generation, 1);

        p.reset();
        assert_eq!(p.step, Step::Upload);
        assert!(p.uploaded_paths.is_empty());
        assert!(p.pending_files.is_empty());
        assert!(p.error.is_none());
        assert_eq!(p.generation, 2);
    }

    #[test]
    fn stale_completion_is_dropped_after_reset() {
        let mut p = PipelineState::default();
        staged(&mut p, 1);
        assert!(p.begin_upload());
        let gen = p.generation;
        p.reset();

        assert!(!p.apply_upload_ok(gen, vec!["/srv/a.pdf".into()]));
        assert_eq!(p.step, Step::Upload);
        assert!(p.uploaded_paths.is_empty());

        assert!(!p.apply_failure(gen, "late error".to_string()));
        assert!(p.error.is_none());
    }

    #[test]
    fn persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SessionStore::open(dir.path().join("session.json"));

        let mut p = PipelineState::default();
        staged(&mut p, 2);
        p.user_prompt = "extract revenue".to_string();
        assert!(p.begin_upload());
        assert!(p.apply_upload_ok(0, vec!["/srv/a.pdf".into(), "/srv/b.pdf".into()]));
        assert!(p.begin_suggest());
        assert!(p.apply_suggest_ok(0, vec![metric("revenue"), metric("assets")]));
        p.persist(&mut store).unwrap();

        // Simulated restart: reopen the store file and rebuild.
        let store = SessionStore::open(dir.path().join("session.json"));
        let restored = PipelineState::restore(&store);

        assert_eq!(restored.step, p.step);
        assert_eq!(restored.file_meta, p.file_meta);
        assert_eq!(restored.uploaded_paths, p.uploaded_paths);
        assert_eq!(restored.user_prompt, p.user_prompt);
        assert_eq!(restored.suggested_metrics, p.suggested_metrics);
        assert_eq!(restored.selected_metrics, p.selected_metrics);
        assert_eq!(restored.results, p.results);
        // Raw handles never persist.
        assert!(restored.pending_files.is_empty());
    }

    #[test]
    fn restore_from_empty_store_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session.json"));
        let restored = PipelineState::restore(&store);
        assert_eq!(restored.step, Step::Upload);
        assert!(restored.selected_metrics.is_empty());
    }

    #[test]
    fn restore_mid_process_falls_back_to_review() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SessionStore::open(dir.path().join("session.json"));
        let mut p = PipelineState::default();
        staged(&mut p, 1);
        assert!(p.begin_upload());
        assert!(p.apply_upload_ok(0, vec!["/srv/a.pdf".into()]));
        assert!(p.begin_suggest());
        assert!(p.apply_suggest_ok(0, vec![metric("revenue")]));
        assert!(p.begin_process());
        p.persist(&mut store).unwrap();

        let restored = PipelineState::restore(&store);
        assert_eq!(restored.step, Step::Review);
        assert!(!restored.processing);
    }
}
