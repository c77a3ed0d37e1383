//! Backend API client.
//!
//! Thin request layer over reqwest. Transport and HTTP failures fold into
//! `anyhow::Error` with enough context for the log; user-facing wording is
//! the state machines' job.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use docpipe_proto::protocol::{
    AnalysisQuery, AnalysisResponse, AvailableData, HistoryEntry, ProcessRequest, ProcessResponse,
    UploadResponse,
};

use crate::ingest;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// `POST /upload` — multipart payload of the staged files. Returns the
    /// server-assigned storage paths.
    pub async fn upload(&self, files: &[PathBuf]) -> Result<Vec<String>> {
        let mut form = reqwest::multipart::Form::new();
        for path in files {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(name)
                .mime_str(ingest::mime_for(path))
                .context("Invalid MIME type for upload part")?;
            form = form.part("files", part);
        }

        let response = self
            .http
            .post(format!("{}/upload", self.base))
            .multipart(form)
            .send()
            .await
            .context("Failed to reach the upload endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Upload failed ({}): {}", status, error_detail(&body));
        }

        let data: UploadResponse = response
            .json()
            .await
            .context("Failed to parse upload response")?;
        Ok(data.files)
    }

    /// `POST /process` — both the suggestion call and the final
    /// extraction+deployment call, distinguished by the request fields.
    pub async fn process(&self, request: &ProcessRequest) -> Result<ProcessResponse> {
        let response = self
            .http
            .post(format!("{}/process", self.base))
            .json(request)
            .send()
            .await
            .context("Failed to reach the processing endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Processing failed ({}): {}", status, error_detail(&body));
        }

        response
            .json()
            .await
            .context("Failed to parse processing response")
    }

    /// `GET /analysis/metadata` — what the warehouse currently holds.
    pub async fn analysis_metadata(&self) -> Result<AvailableData> {
        let response = self
            .http
            .get(format!("{}/analysis/metadata", self.base))
            .send()
            .await
            .context("Failed to reach the metadata endpoint")?;

        if !response.status().is_success() {
            anyhow::bail!("Metadata request returned status {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse metadata response")
    }

    /// `POST /analysis/query` — one conversational turn with windowed history.
    pub async fn analysis_query(
        &self,
        query: &str,
        history: Vec<HistoryEntry>,
    ) -> Result<AnalysisResponse> {
        let payload = AnalysisQuery {
            query: query.to_string(),
            conversation_history: history,
        };
        let response = self
            .http
            .post(format!("{}/analysis/query", self.base))
            .json(&payload)
            .send()
            .await
            .context("Failed to reach the analysis endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Analysis query failed ({}): {}", status, error_detail(&body));
        }

        response
            .json()
            .await
            .context("Failed to parse analysis response")
    }

    /// `POST /logs` — best-effort mirroring of client log lines. Failures
    /// never surface to the user.
    pub async fn mirror_logs(&self, lines: &[String]) {
        let result = self
            .http
            .post(format!("{}/logs", self.base))
            .json(&serde_json::json!({ "lines": lines }))
            .send()
            .await;
        if let Err(e) = result {
            tracing::debug!("log mirroring skipped: {}", e);
        }
    }

    /// `GET /logs` — backend-side log tail for the log panel. Best-effort.
    pub async fn fetch_logs(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct LogLines {
            #[serde(default)]
            lines: Vec<String>,
        }

        let response = self
            .http
            .get(format!("{}/logs", self.base))
            .send()
            .await
            .context("Failed to reach the logs endpoint")?;
        if !response.status().is_success() {
            anyhow::bail!("Logs request returned status {}", response.status());
        }
        let data: LogLines = response.json().await.context("Failed to parse logs")?;
        Ok(data.lines)
    }
}

/// Prefer the FastAPI-style `detail` field when the error body is JSON;
/// otherwise show the raw body (trimmed).
fn error_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no further detail".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://127.0.0.1:8000/", 30);
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
    }

    #[test]
    fn error_detail_prefers_json_detail_field() {
        assert_eq!(
            error_detail(r#"{"detail": "upload dir not writable"}"#),
            "upload dir not writable"
        );
        assert_eq!(error_detail("plain text body"), "plain text body");
        assert_eq!(error_detail("   "), "no further detail");
    }
}
