//! Result-shape dispatch and cleaning for the renderer components.
//!
//! Everything here is pure: the pipeline's stored rows are never mutated,
//! the chart/table components consume the prepared structures as-is.

use std::collections::BTreeMap;

use docpipe_proto::protocol::{ChartKind, ChartSpec, ProcessResponse};

/// Synthetic document name used when only the legacy flat metrics map is
/// present.
pub const SINGLE_DOCUMENT_KEY: &str = "(Single Document)";

/// Categorical labels longer than this are truncated with an ellipsis.
pub const MAX_LABEL_CHARS: usize = 24;

const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".png", ".jpg", ".jpeg"];

// ── Label cleaning ────────────────────────────────────────────────────────────

/// Display-name cleaning for any field acting as a categorical label:
/// strip path-like prefixes, strip known document extensions, truncate
/// overlong labels.
pub fn clean_label(raw: &str) -> String {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw);

    let mut label = base;
    let lower = base.to_ascii_lowercase();
    for ext in DOCUMENT_EXTENSIONS {
        if lower.ends_with(ext) {
            label = &base[..base.len() - ext.len()];
            break;
        }
    }

    if label.chars().count() > MAX_LABEL_CHARS {
        let mut truncated: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
        truncated.push('…');
        truncated
    } else {
        label.to_string()
    }
}

// ── Pipeline results ──────────────────────────────────────────────────────────

/// One table row of the results view: a document and its extracted metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRow {
    pub document: String,
    pub metrics: BTreeMap<String, serde_json::Value>,
}

/// Normalize a `ProcessResponse` into per-document rows. Prefers the
/// per-document map; the legacy flat map becomes one synthetic row so
/// downstream table logic never distinguishes the two shapes.
pub fn document_rows(outcome: &ProcessResponse) -> Vec<DocumentRow> {
    if let Some(by_doc) = &outcome.extracted_metrics_by_document {
        return by_doc
            .iter()
            .map(|(doc, metrics)| DocumentRow {
                document: doc.clone(),
                metrics: metrics.clone(),
            })
            .collect();
    }
    if let Some(flat) = &outcome.extracted_metrics {
        return vec![DocumentRow {
            document: SINGLE_DOCUMENT_KEY.to_string(),
            metrics: flat.clone(),
        }];
    }
    Vec::new()
}

/// Union of metric names across all rows, sorted for stable columns.
pub fn metric_columns(rows: &[DocumentRow]) -> Vec<String> {
    let mut names: Vec<String> = rows
        .iter()
        .flat_map(|r| r.metrics.keys().cloned())
        .collect();
    names.sort();
    names.dedup();
    names
}

// ── Chart preparation ─────────────────────────────────────────────────────────

/// Coerce a JSON value to a chartable number (numbers and numeric strings).
pub fn numeric(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// A value formatted for tabular display.
pub fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "—".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    /// One value per row; rows where the field is missing or non-numeric
    /// chart as zero.
    pub values: Vec<f64>,
}

/// A `ChartSpec` resolved for drawing: axis fields settled, labels cleaned,
/// series values coerced to numbers. Borrowed data only; the spec's rows
/// are untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChart {
    pub kind: ChartKind,
    pub title: String,
    pub x_field: String,
    /// Cleaned categorical label per row.
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    /// All column names, x first — used by the table rendering.
    pub columns: Vec<String>,
}

impl PreparedChart {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn cell(&self, spec: &ChartSpec, row: usize, column: &str) -> String {
        spec.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(cell_text)
            .unwrap_or_else(|| "—".to_string())
    }
}

/// Resolve fields and coerce rows for drawing.
///
/// - `x_field` falls back to the first non-numeric field of the first row.
/// - Missing `series_fields` degrades to `y_field`, then to the first
///   numeric field other than the axis.
pub fn prepare_chart(spec: &ChartSpec) -> PreparedChart {
    let first = spec.rows.first();

    let x_field = spec
        .x_field
        .clone()
        .filter(|f| !f.is_empty())
        .or_else(|| {
            first.and_then(|row| {
                row.iter()
                    .find(|(_, v)| numeric(v).is_none())
                    .map(|(k, _)| k.clone())
            })
        })
        .or_else(|| first.and_then(|row| row.keys().next().cloned()))
        .unwrap_or_default();

    let series_names: Vec<String> = spec
        .series_fields
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| {
            spec.y_field
                .clone()
                .filter(|f| !f.is_empty())
                .map(|f| vec![f])
        })
        .or_else(|| {
            first.and_then(|row| {
                row.iter()
                    .find(|(k, v)| **k != x_field && numeric(v).is_some())
                    .map(|(k, _)| vec![k.clone()])
            })
        })
        .unwrap_or_default();

    let labels = spec
        .rows
        .iter()
        .map(|row| {
            row.get(&x_field)
                .map(cell_text)
                .map(|s| clean_label(&s))
                .unwrap_or_else(|| "—".to_string())
        })
        .collect();

    let series = series_names
        .into_iter()
        .map(|name| {
            let values = spec
                .rows
                .iter()
                .map(|row| row.get(&name).and_then(numeric).unwrap_or(0.0))
                .collect();
            Series { name, values }
        })
        .collect();

    let mut columns = vec![x_field.clone()];
    if let Some(row) = first {
        for key in row.keys() {
            if *key != x_field {
                columns.push(key.clone());
            }
        }
    }

    PreparedChart {
        kind: spec.kind,
        title: spec.title.clone(),
        x_field,
        labels,
        series,
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(kind: ChartKind, rows: Vec<BTreeMap<String, serde_json::Value>>) -> ChartSpec {
        ChartSpec {
            kind,
            title: "test".to_string(),
            x_field: Some("company".to_string()),
            y_field: Some("revenue".to_string()),
            series_fields: None,
            rows,
        }
    }

    fn row(pairs: &[(&str, serde_json::Value)]) -> BTreeMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn label_strips_prefix_and_extension() {
        assert_eq!(clean_label("/tmp/uploads/Apple_10K.pdf"), "Apple_10K");
        assert_eq!(clean_label("C:\\docs\\report.PDF"), "report");
        assert_eq!(clean_label("plain_name"), "plain_name");
    }

    #[test]
    fn label_truncates_with_ellipsis() {
        let long = "a_very_long_document_label_that_overflows";
        let cleaned = clean_label(long);
        assert_eq!(cleaned.chars().count(), MAX_LABEL_CHARS);
        assert!(cleaned.ends_with('…'));
    }

    #[test]
    fn legacy_metrics_become_single_document_row() {
        let outcome = ProcessResponse {
            extracted_metrics: Some(row(&[("total_assets", json!(500))])),
            ..ProcessResponse::default()
        };
        let rows = document_rows(&outcome);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].document, SINGLE_DOCUMENT_KEY);
        assert_eq!(rows[0].metrics["total_assets"], json!(500));
    }

    #[test]
    fn per_document_map_wins_over_legacy() {
        let outcome = ProcessResponse {
            extracted_metrics: Some(row(&[("stale", json!(1))])),
            extracted_metrics_by_document: Some(
                [(
                    "a.pdf".to_string(),
                    row(&[("revenue", json!(10))]),
                )]
                .into_iter()
                .collect(),
            ),
            ..ProcessResponse::default()
        };
        let rows = document_rows(&outcome);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].document, "a.pdf");
        assert!(!rows[0].metrics.contains_key("stale"));
    }

    #[test]
    fn metric_columns_union_sorted() {
        let rows = vec![
            DocumentRow {
                document: "a".to_string(),
                metrics: row(&[("revenue", json!(1)), ("assets", json!(2))]),
            },
            DocumentRow {
                document: "b".to_string(),
                metrics: row(&[("revenue", json!(3)), ("debt", json!(4))]),
            },
        ];
        assert_eq!(metric_columns(&rows), vec!["assets", "debt", "revenue"]);
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(numeric(&json!(12.5)), Some(12.5));
        assert_eq!(numeric(&json!("1,234")), Some(1234.0));
        assert_eq!(numeric(&json!("n/a")), None);
        assert_eq!(numeric(&json!(null)), None);
    }

    #[test]
    fn prepared_chart_cleans_labels_and_coerces_values() {
        let chart = prepare_chart(&spec(
            ChartKind::Bar,
            vec![
                row(&[("company", json!("/srv/up/Apple_10K.pdf")), ("revenue", json!(383.0))]),
                row(&[("company", json!("msft")), ("revenue", json!("211"))]),
            ],
        ));
        assert_eq!(chart.labels, vec!["Apple_10K", "msft"]);
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].values, vec![383.0, 211.0]);
    }

    #[test]
    fn missing_series_infers_first_numeric_non_axis_field() {
        let mut s = spec(
            ChartKind::Line,
            vec![row(&[
                ("quarter", json!("Q1")),
                ("company", json!("apple")),
                ("revenue", json!(90.0)),
            ])],
        );
        s.x_field = Some("quarter".to_string());
        s.y_field = None;
        s.series_fields = None;

        let chart = prepare_chart(&s);
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].name, "revenue");
    }

    #[test]
    fn empty_rows_prepare_as_empty_state() {
        let chart = prepare_chart(&spec(ChartKind::Pie, vec![]));
        assert!(chart.is_empty());
        assert!(chart.series.is_empty() || chart.series[0].values.is_empty());
    }
}
