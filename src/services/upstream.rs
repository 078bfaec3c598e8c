//! Client for the remote admin API.
//!
//! Request bodies are wrapped as `{ "data": <envelope string> }` and every
//! response is read as `{ status, message?, data, report? }` with `data`
//! decoded through the configured [`EnvelopeCodec`].

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

use super::envelope::{decode_payload, CodecError, SharedCodec};

/// Failure of a single upstream round trip. Nothing here is retried.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("network error: {0}")]
    Network(String),

    #[error("decode error: {0}")]
    Decode(#[from] CodecError),

    #[error("upstream rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl UpstreamError {
    /// Message safe to show in the dashboard.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Network error".to_string(),
            Self::Decode(_) => "Failed to decrypt upstream response".to_string(),
            Self::Rejected { message, .. } => message.clone(),
        }
    }
}

/// Decoded response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamResponse {
    pub status: u16,
    pub message: Option<String>,
    pub data: Value,
    pub report: Option<Value>,
}

fn is_success_status(status: u16) -> bool {
    matches!(status, 200 | 201)
}

fn rejected(status: u16, message: Option<String>) -> UpstreamError {
    UpstreamError::Rejected {
        status,
        message: message.unwrap_or_else(|| format!("Request failed with status {}", status)),
    }
}

/// Render an envelope `message` for display. Structured messages (e.g.
/// validation error maps) are shown as compact JSON.
fn message_text(message: Value) -> Option<String> {
    match message {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }

    /// Turn a non-success envelope into [`UpstreamError::Rejected`].
    pub fn into_result(self) -> Result<Self, UpstreamError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(rejected(self.status, self.message))
        }
    }
}

/// Raw envelope as it arrives on the wire.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    message: Value,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    report: Option<Value>,
}

#[derive(Serialize)]
struct EnvelopeBody {
    data: String,
}

/// Client for the remote admin API.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    codec: SharedCodec,
}

impl UpstreamClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout_seconds: u64,
        codec: SharedCodec,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = base_url, "Upstream client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            codec,
        })
    }

    pub fn codec(&self) -> &SharedCodec {
        &self.codec
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn authorize(&self, mut req: RequestBuilder, request_id: Option<&str>) -> RequestBuilder {
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(rid) = request_id {
            req = req.header("x-request-id", rid);
        }
        req
    }

    /// POST `body` wrapped in the envelope.
    #[instrument(skip(self, body))]
    pub async fn post_envelope(
        &self,
        path: &str,
        body: &Value,
        request_id: Option<&str>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.url(path);
        let wrapped = EnvelopeBody {
            data: self.codec.encode(body)?,
        };

        debug!(url = %url, "Upstream envelope request");

        let req = self.authorize(self.client.post(&url).json(&wrapped), request_id);
        self.send(req).await
    }

    /// GET an endpoint whose response carries an encrypted `data` field.
    #[instrument(skip(self))]
    pub async fn get_envelope(
        &self,
        path: &str,
        request_id: Option<&str>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.url(path);

        debug!(url = %url, "Upstream envelope GET");

        let req = self.authorize(self.client.get(&url), request_id);
        self.send(req).await
    }

    async fn send(&self, req: RequestBuilder) -> Result<UpstreamResponse, UpstreamError> {
        let response = req.send().await.map_err(|e| {
            error!(error = %e, "Upstream request failed");
            UpstreamError::Network(e.to_string())
        })?;

        let http_status = response.status();
        let raw: RawEnvelope = response.json().await.map_err(|e| {
            error!(error = %e, status = %http_status, "Upstream returned a non-envelope body");
            UpstreamError::Network(format!("invalid response body: {}", e))
        })?;

        let status = raw.status.unwrap_or_else(|| http_status.as_u16());
        let message = message_text(raw.message);

        // failure envelopes carry no ciphertext worth decoding
        if !is_success_status(status) {
            return Err(rejected(status, message));
        }

        let data = decode_payload(self.codec.as_ref(), raw.data).map_err(|e| {
            error!(error = %e, "Failed to decode upstream payload");
            UpstreamError::Decode(e)
        })?;

        Ok(UpstreamResponse {
            status,
            message,
            data,
            report: raw.report,
        })
    }

    /// Check upstream reachability.
    pub async fn health_check(&self) -> Result<()> {
        self.client
            .get(self.url("/health"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Upstream health check failed")?
            .error_for_status()
            .context("Upstream unhealthy")?;

        Ok(())
    }
}
