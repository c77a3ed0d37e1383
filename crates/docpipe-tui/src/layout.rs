//! WorkspaceManager — tracks the active workspace, the focus ring, and
//! which overlays (log panel, help) are open.
//!
//! The ring is rebuilt whenever the pipeline step, the workspace, or the
//! auth gate changes, because different steps expose different panels.

use crate::action::{ComponentId, Workspace};
use crate::pipeline::Step;

pub struct WorkspaceManager {
    pub workspace: Workspace,
    pub show_log_panel: bool,
    pub show_help: bool,
    ring: Vec<ComponentId>,
    current: usize,
}

impl WorkspaceManager {
    pub fn new() -> Self {
        let mut wm = Self {
            workspace: Workspace::Pipeline,
            show_log_panel: false,
            show_help: false,
            ring: Vec::new(),
            current: 0,
        };
        wm.rebuild(Step::Upload, false);
        wm
    }

    /// Rebuild the focus ring for the current workspace/step/auth state,
    /// keeping focus on the same component when it survives the rebuild.
    pub fn rebuild(&mut self, step: Step, authenticated: bool) {
        let old = self.focused();

        let mut ring = if !authenticated {
            vec![ComponentId::LoginScreen]
        } else {
            match self.workspace {
                Workspace::Pipeline => vec![match step {
                    Step::Upload => ComponentId::UploadPanel,
                    Step::Suggest => ComponentId::PromptPanel,
                    Step::Review => ComponentId::MetricsPanel,
                    Step::Process => ComponentId::ProgressPanel,
                    Step::Results => ComponentId::ResultsPanel,
                }],
                Workspace::Analysis => vec![ComponentId::ChatPanel, ComponentId::ChartPanel],
            }
        };
        if self.show_log_panel {
            ring.push(ComponentId::LogPanel);
        }

        self.ring = ring;
        self.current = old
            .and_then(|id| self.ring.iter().position(|&x| x == id))
            .unwrap_or(0);
    }

    pub fn focused(&self) -> Option<ComponentId> {
        self.ring.get(self.current).copied()
    }

    pub fn focus_next(&mut self) {
        if !self.ring.is_empty() {
            self.current = (self.current + 1) % self.ring.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.ring.is_empty() {
            self.current = if self.current == 0 {
                self.ring.len() - 1
            } else {
                self.current - 1
            };
        }
    }

    pub fn is_focused(&self, id: ComponentId) -> bool {
        self.focused() == Some(id)
    }

    pub fn set_workspace(&mut self, ws: Workspace, step: Step, authenticated: bool) {
        if self.workspace != ws {
            self.workspace = ws;
            self.rebuild(step, authenticated);
        }
    }

    pub fn toggle_log_panel(&mut self, step: Step, authenticated: bool) {
        self.show_log_panel = !self.show_log_panel;
        self.rebuild(step, authenticated);
    }
}

impl Default for WorkspaceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_ring_is_login_only() {
        let wm = WorkspaceManager::new();
        assert_eq!(wm.focused(), Some(ComponentId::LoginScreen));
    }

    #[test]
    fn ring_follows_pipeline_step() {
        let mut wm = WorkspaceManager::new();
        wm.rebuild(Step::Review, true);
        assert_eq!(wm.focused(), Some(ComponentId::MetricsPanel));
        wm.rebuild(Step::Results, true);
        assert_eq!(wm.focused(), Some(ComponentId::ResultsPanel));
    }

    #[test]
    fn analysis_ring_cycles_chat_and_chart() {
        let mut wm = WorkspaceManager::new();
        wm.set_workspace(Workspace::Analysis, Step::Upload, true);
        assert_eq!(wm.workspace, Workspace::Analysis);
        assert_eq!(wm.focused(), Some(ComponentId::ChatPanel));
        wm.focus_next();
        assert_eq!(wm.focused(), Some(ComponentId::ChartPanel));
        wm.focus_next();
        assert_eq!(wm.focused(), Some(ComponentId::ChatPanel));
    }

    #[test]
    fn log_panel_joins_the_ring_and_focus_survives() {
        let mut wm = WorkspaceManager::new();
        wm.set_workspace(Workspace::Analysis, Step::Upload, true);
        wm.focus_next(); // ChartPanel
        wm.toggle_log_panel(Step::Upload, true);
        assert!(wm.show_log_panel);
        assert_eq!(wm.focused(), Some(ComponentId::ChartPanel));
        wm.focus_next();
        assert!(wm.is_focused(ComponentId::LogPanel));
    }
}
