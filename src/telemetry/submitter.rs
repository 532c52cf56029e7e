use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header::CONTENT_TYPE};

use crate::telemetry::{
    error::{
        SubmitError, connect_error, invalid_endpoint, serialization_error, timeout_error,
        transport_error,
    },
    ports::Submitter,
    types::{SubmissionOutcome, SubmissionRecord},
};

pub const DEFAULT_ENDPOINT: &str = "https://uplink.jenkins.io/events";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Posts records as JSON over a shared client. Any HTTP response counts as
/// delivered; only failures to complete the exchange are reported as errors.
/// The client's request timeout bounds every exchange.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: Client,
}

impl HttpSubmitter {
    pub fn new(timeout_ms: u64) -> Result<Self, SubmitError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms.max(1)))
            .build()
            .map_err(|err| transport_error(format!("failed to build http client: {err}")))?;
        Ok(Self { client })
    }

    async fn post(&self, endpoint: &str, record: &SubmissionRecord) -> Result<String, SubmitError> {
        let url = parse_endpoint(endpoint)?;
        let body = serde_json::to_vec(record).map_err(|err| {
            serialization_error(format!(
                "failed to serialize record for {}: {err}",
                record.trial_id()
            ))
        })?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| classify_reqwest_error(&err))?;

        Ok(status_line(response.status()))
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn send(&self, endpoint: &str, record: &SubmissionRecord) -> SubmissionOutcome {
        match self.post(endpoint, record).await {
            Ok(status_line) => SubmissionOutcome::Delivered { status_line },
            Err(error) => SubmissionOutcome::TransportFailure { error },
        }
    }
}

pub fn parse_endpoint(endpoint: &str) -> Result<Url, SubmitError> {
    match Url::parse(endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        Ok(url) => Err(invalid_endpoint(format!(
            "unsupported endpoint scheme '{}' in {endpoint}",
            url.scheme()
        ))),
        Err(err) => Err(invalid_endpoint(format!(
            "invalid endpoint '{endpoint}': {err}"
        ))),
    }
}

/// `"200 OK"`, `"500 Internal Server Error"`, or just the code when the
/// status has no canonical reason.
pub fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

fn classify_reqwest_error(err: &reqwest::Error) -> SubmitError {
    if err.is_timeout() {
        timeout_error(format!("request timed out: {err}"))
    } else if err.is_connect() {
        connect_error(format!("connection failed: {err}"))
    } else if err.is_builder() {
        invalid_endpoint(format!("request could not be built: {err}"))
    } else {
        transport_error(format!("request failed: {err}"))
    }
}
