//! Analysis conversation manager — independent of the pipeline.
//!
//! Maintains an append-only dialogue with the backend analysis service.
//! Turns are never edited or reordered; a failed request becomes a normal
//! assistant-styled turn so the conversation can always continue. The
//! history payload sent with each query is windowed to the last
//! `HISTORY_WINDOW` turns.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use docpipe_proto::protocol::{AnalysisResponse, HistoryEntry};
use docpipe_proto::store::{keys, SessionStore, StoreError};

/// Default number of prior turns included with each query.
pub const HISTORY_WINDOW: usize = 6;

/// Shown in place of a hard error. Soft and actionable, never a raw
/// transport or backend message.
pub const SOFT_FAILURE_REPLY: &str = "I couldn't complete that analysis. Try rephrasing the \
     question, or ask about one of the companies and metrics shown in the data panel.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn wire_name(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of the dialogue. User turns carry `text`; assistant turns carry
/// either a full backend response or synthetic fallback text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AnalysisResponse>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: Some(text.into()),
            response: None,
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: Some(text.into()),
            response: None,
        }
    }

    pub fn assistant(response: AnalysisResponse) -> Self {
        Self {
            role: Role::Assistant,
            text: None,
            response: Some(response),
        }
    }

    /// Flattened content for the history payload: the response summary for
    /// assistant turns, with a stringified fallback when absent.
    pub fn content(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        if let Some(resp) = &self.response {
            if let Some(summary) = resp.summary.as_deref().filter(|s| !s.is_empty()) {
                return summary.to_string();
            }
            return serde_json::to_string(resp).unwrap_or_default();
        }
        String::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryRejection {
    /// Empty or whitespace-only input.
    Empty,
    /// A request is already outstanding.
    Busy,
}

#[derive(Debug)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
    pub in_flight: bool,
    /// Bumped on clear; stale responses are matched against this.
    pub generation: u64,
    window: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self {
            turns: Vec::new(),
            in_flight: false,
            generation: 0,
            window: HISTORY_WINDOW,
        }
    }
}

impl Conversation {
    pub fn with_window(window: usize) -> Self {
        Self {
            window: window.max(1),
            ..Self::default()
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Validate and register a query: appends the user turn optimistically
    /// and returns the windowed history payload. The just-appended turn is
    /// excluded — it travels as the `query` field, not as history.
    pub fn begin_query(&mut self, query: &str) -> Result<Vec<HistoryEntry>, QueryRejection> {
        if self.in_flight {
            return Err(QueryRejection::Busy);
        }
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryRejection::Empty);
        }

        self.turns.push(ConversationTurn::user(query));
        self.in_flight = true;

        let prior = &self.turns[..self.turns.len() - 1];
        let start = prior.len().saturating_sub(self.window);
        let history = prior[start..]
            .iter()
            .map(|t| HistoryEntry {
                role: t.role.wire_name().to_string(),
                content: t.content(),
            })
            .collect();
        Ok(history)
    }

    /// Classify and append a backend response. A response without a usable
    /// summary is a soft failure: the user sees guidance, the cause goes to
    /// the log only.
    pub fn apply_response(&mut self, generation: u64, response: AnalysisResponse) -> bool {
        if !self.accept(generation) {
            return false;
        }
        self.in_flight = false;

        let usable = response
            .summary
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        if !usable {
            warn!(
                "analysis: response had no summary (error: {:?})",
                response.error
            );
            self.turns
                .push(ConversationTurn::assistant_text(SOFT_FAILURE_REPLY));
            return true;
        }

        info!("analysis: response appended ({} insight(s))", response.insights.len());
        self.turns.push(ConversationTurn::assistant(response));
        true
    }

    /// Transport/HTTP failure: same soft treatment, never a dead end.
    pub fn apply_transport_failure(&mut self, generation: u64, cause: &str) -> bool {
        if !self.accept(generation) {
            return false;
        }
        self.in_flight = false;
        warn!("analysis: query failed: {}", cause);
        self.turns
            .push(ConversationTurn::assistant_text(SOFT_FAILURE_REPLY));
        true
    }

    /// Wholesale clear, used by task reset and logout.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.in_flight = false;
        self.generation += 1;
    }

    fn accept(&self, generation: u64) -> bool {
        if generation != self.generation {
            warn!(
                "analysis: dropping stale response (generation {} != {})",
                generation, self.generation
            );
            return false;
        }
        true
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    pub fn persist(&self, store: &mut SessionStore) -> Result<(), StoreError> {
        store.put(keys::ANALYSIS_HISTORY, &self.turns)
    }

    pub fn restore(store: &SessionStore, window: usize) -> Self {
        Self {
            turns: store.get_or_default(keys::ANALYSIS_HISTORY),
            window: window.max(1),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(summary: &str) -> AnalysisResponse {
        AnalysisResponse {
            summary: Some(summary.to_string()),
            ..AnalysisResponse::default()
        }
    }

    #[test]
    fn rejects_blank_and_busy() {
        let mut c = Conversation::default();
        assert_eq!(c.begin_query("   "), Err(QueryRejection::Empty));
        assert!(c.begin_query("revenue trend?").is_ok());
        assert_eq!(c.begin_query("another"), Err(QueryRejection::Busy));
    }

    #[test]
    fn windowing_after_ten_pairs() {
        let mut c = Conversation::default();
        for i in 0..10 {
            c.begin_query(&format!("question {}", i)).unwrap();
            c.apply_response(0, reply(&format!("answer {}", i)));
        }

        let history = c.begin_query("question 10").unwrap();
        assert_eq!(history.len(), HISTORY_WINDOW);
        // Original order, most recent turns, newest user turn excluded.
        assert_eq!(history[0].role, "assistant");
        assert_eq!(history[0].content, "answer 7");
        assert_eq!(history[5].content, "answer 9");
        assert!(history.iter().all(|h| h.content != "question 10"));
    }

    #[test]
    fn first_query_sends_empty_history() {
        let mut c = Conversation::default();
        let history = c.begin_query("what do you have?").unwrap();
        assert!(history.is_empty());
        assert_eq!(c.turns().len(), 1);
    }

    #[test]
    fn assistant_content_uses_summary_with_fallback() {
        let turn = ConversationTurn::assistant(reply("Revenue rose 12%."));
        assert_eq!(turn.content(), "Revenue rose 12%.");

        let bare = ConversationTurn::assistant(AnalysisResponse::default());
        // No summary: stringified response, never empty.
        assert!(!bare.content().is_empty());
    }

    #[test]
    fn error_without_summary_becomes_soft_turn() {
        let mut c = Conversation::default();
        c.begin_query("show me the tables").unwrap();
        c.apply_response(
            0,
            AnalysisResponse {
                error: Some("SQL compilation error: line 3".to_string()),
                ..AnalysisResponse::default()
            },
        );

        let last = c.turns().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.text.as_deref(), Some(SOFT_FAILURE_REPLY));
        // Raw error never surfaces in the conversation.
        assert!(!last.content().contains("SQL compilation"));
        assert!(!c.in_flight);
    }

    #[test]
    fn transport_failure_keeps_conversation_usable() {
        let mut c = Conversation::default();
        c.begin_query("anything").unwrap();
        c.apply_transport_failure(0, "connection refused");

        assert_eq!(c.turns().len(), 2);
        assert!(!c.in_flight);
        assert!(c.begin_query("retry").is_ok());
    }

    #[test]
    fn turns_are_strictly_append_ordered() {
        let mut c = Conversation::default();
        c.begin_query("q1").unwrap();
        c.apply_response(0, reply("a1"));
        c.begin_query("q2").unwrap();
        c.apply_response(0, reply("a2"));

        let contents: Vec<String> = c.turns().iter().map(|t| t.content()).collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
    }

    #[test]
    fn stale_response_after_clear_is_dropped() {
        let mut c = Conversation::default();
        c.begin_query("q1").unwrap();
        let gen = c.generation;
        c.clear();

        assert!(!c.apply_response(gen, reply("late")));
        assert!(c.turns().is_empty());
    }

    #[test]
    fn clear_twice_yields_same_empty_history() {
        let mut c = Conversation::default();
        c.begin_query("q1").unwrap();
        c.apply_response(0, reply("a1"));
        c.clear();
        c.clear();
        assert!(c.turns().is_empty());
        assert!(!c.in_flight);
    }

    #[test]
    fn persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SessionStore::open(dir.path().join("session.json"));

        let mut c = Conversation::default();
        c.begin_query("q1").unwrap();
        c.apply_response(0, reply("a1"));
        c.persist(&mut store).unwrap();

        let store = SessionStore::open(dir.path().join("session.json"));
        let restored = Conversation::restore(&store, HISTORY_WINDOW);
        assert_eq!(restored.turns(), c.turns());
        assert!(!restored.in_flight);
    }
}
