//! OCR service client
//!
//! Production `Extractor`: posts the uploaded sheets to the OCR service and
//! converts its confidence-scored response into an `ExtractionBatch`.
//!
//! # API Reference
//! - `GET {base}/health` → `{"status": "...", "ocr_ready": bool}`
//! - `POST {base}/extract` (multipart, one `files` part) →
//!   `{"project_info": {field: {value, confidence}}, "readings": [{field: {value, confidence}}], "page_count": n}`
//!
//! Each uploaded sheet is sent in its own request; the per-sheet batches are
//! merged in upload order with `merge_pages`.
//!
//! Wire values may be numbers, strings or null; a missing field becomes
//! `{null, 0.0}`. Reading order is taken as given.

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::{ProjectField, ProjectRecord, ReadingField, ReadingRecord, SourceFile};
use crate::services::batch_merger::merge_pages;
use crate::services::edit_merger::{normalize_text, parse_numeric};
use crate::types::{ConfidenceValue, ExtractionBatch, ExtractionError, Extractor, FieldSlot};

/// Timeout for the reachability check
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// User agent sent with every request
const USER_AGENT: &str = concat!("piletest-verify/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireScalar {
    Number(f64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
struct WireValue {
    #[serde(default)]
    value: Option<WireScalar>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl WireValue {
    fn confidence(&self) -> f64 {
        self.confidence.unwrap_or(0.0)
    }

    fn numeric(&self) -> Option<f64> {
        match &self.value {
            Some(WireScalar::Number(n)) if n.is_finite() => Some(*n),
            Some(WireScalar::Text(s)) => parse_numeric(s),
            _ => None,
        }
    }

    fn text(&self) -> Option<String> {
        match &self.value {
            Some(WireScalar::Number(n)) => Some(n.to_string()),
            Some(WireScalar::Text(s)) => normalize_text(s),
            None => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireExtractResponse {
    #[serde(default)]
    project_info: HashMap<String, WireValue>,
    readings: Vec<HashMap<String, WireValue>>,
    #[serde(default)]
    page_count: usize,
}

#[derive(Debug, Deserialize)]
struct WireHealth {
    #[serde(default)]
    ocr_ready: bool,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    detail: String,
}

fn project_from_wire(mut info: HashMap<String, WireValue>) -> ProjectRecord {
    let mut project = ProjectRecord::default();
    for field in ProjectField::ALL {
        let wire = info.remove(field.as_str()).unwrap_or_default();
        *project.field_mut(field) = ConfidenceValue::new(wire.text(), wire.confidence());
    }
    project
}

fn reading_from_wire(mut row: HashMap<String, WireValue>) -> ReadingRecord {
    let mut reading = ReadingRecord::default();
    for field in ReadingField::ALL {
        let wire = row.remove(field.as_str()).unwrap_or_default();
        match reading.slot_mut(field) {
            FieldSlot::Numeric(cv) => *cv = ConfidenceValue::new(wire.numeric(), wire.confidence()),
            FieldSlot::Text(cv) => *cv = ConfidenceValue::new(wire.text(), wire.confidence()),
        }
    }
    reading
}

/// Parse an `/extract` response body
pub fn parse_extract_response(body: &str) -> Result<ExtractionBatch, ExtractionError> {
    let wire: WireExtractResponse =
        serde_json::from_str(body).map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    Ok(ExtractionBatch {
        project: project_from_wire(wire.project_info),
        readings: wire.readings.into_iter().map(reading_from_wire).collect(),
        page_count: wire.page_count,
    })
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for the OCR service
pub struct OcrClient {
    http_client: Client,
    base_url: String,
}

impl OcrClient {
    /// Create a client for the service at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ExtractionError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ExtractionError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(err: reqwest::Error) -> ExtractionError {
        if err.is_connect() {
            ExtractionError::Unreachable(err.to_string())
        } else {
            ExtractionError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl Extractor for OcrClient {
    fn name(&self) -> &'static str {
        "ocr-service"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        let response = match self.http_client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %url, error = %e, "OCR health check failed");
                return false;
            }
        };

        if !response.status().is_success() {
            debug!(status = %response.status(), "OCR health check returned error status");
            return false;
        }

        match response.json::<WireHealth>().await {
            Ok(health) => health.ocr_ready,
            Err(e) => {
                warn!(error = %e, "OCR health response could not be parsed");
                false
            }
        }
    }

    async fn extract(&self, sources: &[SourceFile]) -> Result<ExtractionBatch, ExtractionError> {
        let url = format!("{}/extract", self.base_url);
        info!(url = %url, sources = sources.len(), "Sending field sheets to OCR service");

        let mut pages = Vec::with_capacity(sources.len());
        for source in sources {
            pages.push(self.extract_source(&url, source).await?);
        }

        let batch = merge_pages(pages);
        debug!(
            readings = batch.readings.len(),
            pages = batch.page_count,
            "OCR extraction merged"
        );
        Ok(batch)
    }
}

impl OcrClient {
    /// One `/extract` round trip for a single uploaded sheet
    async fn extract_source(
        &self,
        url: &str,
        source: &SourceFile,
    ) -> Result<ExtractionBatch, ExtractionError> {
        let part = multipart::Part::bytes(source.data.clone())
            .file_name(source.file_name.clone())
            .mime_str(&source.content_type)
            .map_err(|e| {
                ExtractionError::Malformed(format!(
                    "Invalid content type for {}: {}",
                    source.file_name, e
                ))
            })?;
        let form = multipart::Form::new().part("files", part);

        let response = self
            .http_client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(Self::transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<WireErrorDetail>(&body)
                .map(|d| d.detail)
                .unwrap_or(body);
            return Err(ExtractionError::Api(status.as_u16(), message));
        }

        let batch = parse_extract_response(&body)?;
        debug!(
            file = %source.file_name,
            readings = batch.readings.len(),
            "OCR page parsed"
        );
        Ok(batch)
    }
}
