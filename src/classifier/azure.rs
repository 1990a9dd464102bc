//! Azure AI Document Intelligence custom-classifier client (REST).
//!
//! Classification is a long-running operation:
//!
//! ```text
//! POST {endpoint}/documentintelligence/documentClassifiers/{id}:analyze?api-version=…&split=auto
//!   body: {"base64Source": "<pdf>"}
//!   ← 202 Accepted, Operation-Location: <url>
//! GET  <Operation-Location>            (repeat until succeeded / failed)
//!   ← {"status": "running"}
//!   ← {"status": "succeeded", "analyzeResult": {"documents": [...]}}
//! ```
//!
//! The client does not retry. A request that fails, an analysis that fails,
//! or an operation that outlives `max_wait_secs` is reported as
//! [`PdfSplitError::ClassificationFailed`].

use super::DocumentClassifier;
use crate::error::PdfSplitError;
use crate::model::{ClassificationDocument, ClassificationResult, PageReference};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{header, StatusCode, Url};
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Connection and polling settings for [`AzureDocumentClassifier`].
#[derive(Clone)]
pub struct AzureClassifierConfig {
    /// Resource endpoint, e.g. `https://my-resource.cognitiveservices.azure.com/`.
    pub endpoint: String,
    pub api_key: String,
    /// Default: `2024-11-30`.
    pub api_version: String,
    /// Split mode sent with the request. Default: `auto`.
    pub split: String,
    /// Delay between polls when the service sends no `Retry-After`. Default: 1000.
    pub poll_interval_ms: u64,
    /// Give up on the operation after this long. Default: 300.
    pub max_wait_secs: u64,
    /// Per-request timeout in seconds. Default: 120.
    pub request_timeout_secs: u64,
}

impl AzureClassifierConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_version: "2024-11-30".to_string(),
            split: "auto".to_string(),
            poll_interval_ms: 1000,
            max_wait_secs: 300,
            request_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for AzureClassifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureClassifierConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("split", &self.split)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_wait_secs", &self.max_wait_secs)
            .finish()
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    #[serde(default)]
    documents: Option<Vec<AnalyzedDocument>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzedDocument {
    doc_type: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    bounding_regions: Option<Vec<BoundingRegion>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoundingRegion {
    page_number: u32,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ServiceError,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(msg)) => write!(f, "{code}: {msg}"),
            (None, Some(msg)) => f.write_str(msg),
            (Some(code), None) => f.write_str(code),
            (None, None) => f.write_str("unknown service error"),
        }
    }
}

/// What one poll of the operation told us.
#[derive(Debug)]
enum PollOutcome {
    Pending,
    Succeeded(ClassificationResult),
    Failed(String),
}

fn interpret_operation(op: AnalyzeOperation) -> PollOutcome {
    match op.status.as_str() {
        "succeeded" => PollOutcome::Succeeded(normalize(op.analyze_result)),
        "failed" | "canceled" => PollOutcome::Failed(
            op.error
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("analysis {}", op.status)),
        ),
        _ => PollOutcome::Pending,
    }
}

/// Map the service's optional lists onto the pipeline model.
fn normalize(result: Option<AnalyzeResult>) -> ClassificationResult {
    let documents = result
        .and_then(|r| r.documents)
        .unwrap_or_default()
        .into_iter()
        .map(|d| ClassificationDocument {
            doc_type: d.doc_type,
            confidence: d.confidence.unwrap_or(0.0),
            bounding_regions: d
                .bounding_regions
                .unwrap_or_default()
                .into_iter()
                .map(|r| PageReference::new(r.page_number))
                .collect(),
        })
        .collect();
    ClassificationResult::new(documents)
}

/// `Retry-After` in whole seconds, if present and sane.
fn retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

// ── Client ───────────────────────────────────────────────────────────────

/// [`DocumentClassifier`] backed by an Azure Document Intelligence custom classifier.
pub struct AzureDocumentClassifier {
    config: AzureClassifierConfig,
    endpoint: Url,
    client: reqwest::Client,
}

impl AzureDocumentClassifier {
    pub fn new(config: AzureClassifierConfig) -> Result<Self, PdfSplitError> {
        if config.endpoint.trim().is_empty() {
            return Err(PdfSplitError::InvalidConfig(
                "Document Intelligence endpoint is empty".into(),
            ));
        }
        if config.api_key.trim().is_empty() {
            return Err(PdfSplitError::InvalidConfig(
                "Document Intelligence API key is empty".into(),
            ));
        }
        let endpoint = Url::parse(config.endpoint.trim())
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| {
                PdfSplitError::InvalidConfig(format!(
                    "Document Intelligence endpoint '{}' is not a valid URL",
                    config.endpoint
                ))
            })?;

        let builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));
        // Unit tests talk to a loopback stub.
        #[cfg(test)]
        let builder = builder.no_proxy();
        let client = builder
            .build()
            .map_err(|e| PdfSplitError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            config,
            endpoint,
            client,
        })
    }

    /// `{endpoint}/documentintelligence/documentClassifiers/{id}:analyze?…`,
    /// with the classifier id escaped as one path segment.
    fn analyze_url(&self, classifier_id: &str) -> Url {
        let action = format!("{classifier_id}:analyze");
        let mut url = self.endpoint.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty()
                .extend(["documentintelligence", "documentClassifiers", action.as_str()]);
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("api-version", &self.config.api_version)
            .append_pair("split", &self.config.split);
        url
    }

    /// Submit the document; returns the operation URL to poll.
    async fn submit(&self, document: &[u8], classifier_id: &str) -> Result<String, String> {
        let body = serde_json::json!({
            "base64Source": base64::engine::general_purpose::STANDARD.encode(document),
        });

        let response = self
            .client
            .post(self.analyze_url(classifier_id))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if status != StatusCode::ACCEPTED && !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.to_string())
                .unwrap_or(text);
            return Err(format!("HTTP {status}: {detail}"));
        }

        response
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| format!("HTTP {status} without Operation-Location header"))
    }

    /// Poll the operation until it finishes or the deadline passes.
    async fn poll(&self, operation_url: &str) -> Result<ClassificationResult, String> {
        let deadline = Instant::now() + Duration::from_secs(self.config.max_wait_secs);
        let default_delay = Duration::from_millis(self.config.poll_interval_ms);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let response = self
                .client
                .get(operation_url)
                .header(API_KEY_HEADER, &self.config.api_key)
                .send()
                .await
                .map_err(|e| format!("poll request failed: {e}"))?;

            let status = response.status();
            let delay = retry_after(response.headers()).unwrap_or(default_delay);
            let text = response
                .text()
                .await
                .map_err(|e| format!("poll response unreadable: {e}"))?;

            if !status.is_success() {
                return Err(format!("poll returned HTTP {status}: {text}"));
            }

            let op: AnalyzeOperation = serde_json::from_str(&text)
                .map_err(|e| format!("malformed operation response: {e}"))?;
            debug!("Classification poll {}: status={}", attempts, op.status);

            match interpret_operation(op) {
                PollOutcome::Succeeded(result) => return Ok(result),
                PollOutcome::Failed(reason) => return Err(reason),
                PollOutcome::Pending => {}
            }

            if Instant::now() + delay > deadline {
                return Err(format!(
                    "operation did not finish within {}s",
                    self.config.max_wait_secs
                ));
            }
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DocumentClassifier for AzureDocumentClassifier {
    async fn classify(
        &self,
        document: &[u8],
        classifier_id: &str,
    ) -> Result<ClassificationResult, PdfSplitError> {
        let failed = |reason: String| PdfSplitError::ClassificationFailed {
            classifier_id: classifier_id.to_string(),
            reason,
        };

        if document.is_empty() {
            return Err(failed("document is empty".into()));
        }

        info!(
            "Classifying {} bytes with classifier '{}'",
            document.len(),
            classifier_id
        );
        let operation_url = self.submit(document, classifier_id).await.map_err(failed)?;
        debug!("Classification operation: {}", operation_url);

        let result = self.poll(&operation_url).await.map_err(failed)?;
        info!("Classification complete. Found {} documents.", result.len());
        Ok(result)
    }
}
