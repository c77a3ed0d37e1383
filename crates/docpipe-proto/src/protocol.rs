//! Wire types for the docpipe backend HTTP contract.
//!
//! Field names follow the backend's JSON exactly; Rust-side names are mapped
//! with serde attributes so the rest of the client never sees snake-cased
//! Python conventions like `chart_type` or `x_axis`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Metrics ───────────────────────────────────────────────────────────────────

/// Value type of a metric, as the backend spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MetricKind {
    #[serde(rename = "str", alias = "string")]
    #[default]
    Str,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "bool")]
    Bool,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Str,
        MetricKind::Int,
        MetricKind::Float,
        MetricKind::Bool,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Str => "str",
            MetricKind::Int => "int",
            MetricKind::Float => "float",
            MetricKind::Bool => "bool",
        }
    }
}

/// A named, typed data point the user wants extracted from documents.
/// Identity key is `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Metric {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    #[serde(default)]
    pub description: String,
}

impl Metric {
    pub fn new(name: impl Into<String>, kind: MetricKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
        }
    }
}

// ── Upload ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    /// Server-assigned storage paths, one per uploaded file.
    pub files: Vec<String>,
    #[serde(default)]
    pub count: usize,
}

// ── Processing ────────────────────────────────────────────────────────────────

/// Which backend phase to stop after. The suggestion call and the final
/// extraction call share one endpoint and differ only in this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopAfter {
    Extract,
    All,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessRequest {
    pub file_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_metrics: Option<Vec<Metric>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_after: Option<StopAfter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub constraints: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<TableColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WarehouseSchema {
    #[serde(default)]
    pub tables: Vec<TableSchema>,
    #[serde(default)]
    pub ddl_sql: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub status: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub rows_loaded: u64,
    #[serde(default)]
    pub tables_created: u64,
}

/// Response of `POST /process` — suggestion phase populates
/// `suggested_metrics`; the final phase populates everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProcessResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_metrics: Option<Vec<Metric>>,
    /// Legacy flat map: metric name → value, all documents merged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_metrics: Option<BTreeMap<String, serde_json::Value>>,
    /// Legacy raw extraction payload some backends still emit. Carried but
    /// unread; the metric maps above hold the same data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_results: Option<serde_json::Value>,
    /// Preferred shape: document name → (metric name → value).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_metrics_by_document: Option<BTreeMap<String, BTreeMap<String, serde_json::Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<WarehouseSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Deployment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ── Analysis ──────────────────────────────────────────────────────────────────

/// One `{role, content}` entry of the bounded history payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisQuery {
    pub query: String,
    pub conversation_history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Table,
    Bar,
    Line,
    Pie,
}

/// Backend-declared description of how to visualize returned analysis rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "chart_type")]
    pub kind: ChartKind,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "x_axis", default, skip_serializing_if = "Option::is_none")]
    pub x_field: Option<String>,
    #[serde(rename = "y_axis", default, skip_serializing_if = "Option::is_none")]
    pub y_field: Option<String>,
    #[serde(rename = "series", default, skip_serializing_if = "Option::is_none")]
    pub series_fields: Option<Vec<String>>,
    #[serde(rename = "data", default)]
    pub rows: Vec<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_companies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_metrics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response of `GET /analysis/metadata` — what the warehouse currently holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AvailableData {
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub tables: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_kind_wire_names() {
        let m: Metric = serde_json::from_str(
            r#"{"name": "revenue", "type": "float", "description": "Total revenue"}"#,
        )
        .unwrap();
        assert_eq!(m.kind, MetricKind::Float);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["type"], "float");
    }

    #[test]
    fn metric_kind_accepts_string_alias() {
        let m: Metric =
            serde_json::from_str(r#"{"name": "ticker", "type": "string", "description": ""}"#)
                .unwrap();
        assert_eq!(m.kind, MetricKind::Str);
    }

    #[test]
    fn chart_spec_uses_backend_field_names() {
        let spec: ChartSpec = serde_json::from_str(
            r#"{
                "chart_type": "bar",
                "title": "Revenue by company",
                "x_axis": "company",
                "y_axis": "revenue",
                "series": ["revenue"],
                "data": [{"company": "Apple", "revenue": 383.0}]
            }"#,
        )
        .unwrap();
        assert_eq!(spec.kind, ChartKind::Bar);
        assert_eq!(spec.x_field.as_deref(), Some("company"));
        assert_eq!(spec.rows.len(), 1);
    }

    #[test]
    fn process_response_tolerates_partial_payloads() {
        // Suggestion phase: only suggested_metrics present.
        let resp: ProcessResponse = serde_json::from_str(
            r#"{"suggested_metrics": [{"name": "revenue", "type": "float", "description": ""}]}"#,
        )
        .unwrap();
        assert_eq!(resp.suggested_metrics.unwrap().len(), 1);
        assert!(resp.deployment.is_none());

        // Final phase without the per-document map.
        let resp: ProcessResponse = serde_json::from_str(
            r#"{
                "extracted_metrics": {"total_assets": 500},
                "deployment": {"status": "SUCCESS", "database": "FIN", "schema": "PUBLIC", "rows_loaded": 12}
            }"#,
        )
        .unwrap();
        assert!(resp.extracted_metrics_by_document.is_none());
        assert_eq!(resp.deployment.unwrap().status, "SUCCESS");
    }

    #[test]
    fn process_response_carries_raw_extraction_results() {
        let resp: ProcessResponse = serde_json::from_str(
            r#"{
                "extraction_results": [{"document": "q1_report.pdf", "status": "ok"}],
                "extracted_metrics": {"revenue": 383.0}
            }"#,
        )
        .unwrap();
        assert!(resp.extraction_results.is_some());

        // Absent on the wire stays absent when re-serialized.
        let resp = ProcessResponse::default();
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("extraction_results").is_none());
    }

    #[test]
    fn analysis_response_error_shape() {
        let resp: AnalysisResponse =
            serde_json::from_str(r#"{"error": "no such table", "insights": []}"#).unwrap();
        assert!(resp.summary.is_none());
        assert_eq!(resp.error.as_deref(), Some("no such table"));
    }
}
