use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::FetchFailure;

/// Characters of an error response body kept in logs
const LOG_BODY_PREVIEW_CHARS: usize = 512;

/// HTTP client for the lookup API. One GET per call, no retries.
pub struct LookupHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Treat non-2xx responses as failures
    fail_on_error_status: bool,
}

impl LookupHttpClient {
    /// Create a new HTTP client.
    ///
    /// Timeouts are only applied when given; otherwise the transport
    /// defaults stand.
    pub fn new(
        connect_timeout: Option<u64>,
        request_timeout: Option<u64>,
        fail_on_error_status: bool,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = connect_timeout {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = request_timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            fail_on_error_status,
        })
    }

    /// Issue a single GET and parse the body as JSON.
    ///
    /// The body is returned as-is; an upstream error payload on a success
    /// status is still a success here.
    pub async fn get_json(&self, url: &str) -> Result<Value, FetchFailure> {
        let request = self
            .client
            .get(url)
            .build()
            .map_err(|e| transport_failure(e, url_host(url)))?;

        let host = request.url().host_str().unwrap_or_default().to_string();
        tracing::debug!(method = "GET", host = %host, "Sending HTTP request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| transport_failure(e, host.clone()))?;

        let status = response.status();
        tracing::debug!(status = %status, "Received HTTP response");

        let body = response
            .text()
            .await
            .map_err(|e| transport_failure(e, host.clone()))?;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                host = %host,
                body_len = body.len(),
                response_body = %body_preview(&body),
                "Received error response"
            );
            if self.fail_on_error_status {
                return Err(FetchFailure::Status {
                    status: status.as_u16(),
                    body,
                });
            }
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(
                error = %e,
                host = %host,
                body_len = body.len(),
                "Response body is not valid JSON"
            );
            FetchFailure::Decode(e)
        })
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Categorize a reqwest error for diagnostics
pub fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() || e.is_builder() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

fn transport_failure(e: reqwest::Error, host: String) -> FetchFailure {
    let kind = error_kind(&e);
    // Strip the URL so the API key never reaches logs or error chains
    let e = e.without_url();

    tracing::warn!(
        error_kind = kind,
        error = %e,
        host = %host,
        "HTTP request error"
    );

    FetchFailure::Transport { kind, source: e }
}

/// Leading part of a response body for logs, cut on a char boundary
fn body_preview(body: &str) -> &str {
    match body.char_indices().nth(LOG_BODY_PREVIEW_CHARS) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

fn url_host(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}
