// Request dispatcher: kind + params -> one GET -> JSON

use anyhow::Result as AnyResult;
use serde_json::Value;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{DispatchError, Result};
use crate::http_client::LookupHttpClient;
use crate::kind::RequestKind;
use crate::params::RequestParams;
use crate::query::{EncodingMode, QueryPlan};

/// Builds lookup URLs and performs them.
///
/// Holds no per-request state; share it behind an `Arc` and call it
/// concurrently.
pub struct Dispatcher {
    http: LookupHttpClient,
    base_url: String,
    api_key: String,
    encoding: EncodingMode,
}

impl Dispatcher {
    /// Create a dispatcher from loaded configuration
    pub fn new(config: &Config) -> AnyResult<Self> {
        let http = LookupHttpClient::new(
            config.http_connect_timeout,
            config.http_request_timeout,
            !config.accept_error_status,
        )?;

        Ok(Self::with_client(
            http,
            config.base_url.clone(),
            config.api_key.clone(),
            config.encoding,
        ))
    }

    /// Create a dispatcher around an existing HTTP client
    pub fn with_client(
        http: LookupHttpClient,
        base_url: String,
        api_key: String,
        encoding: EncodingMode,
    ) -> Self {
        Self {
            http,
            base_url,
            api_key,
            encoding,
        }
    }

    pub fn encoding(&self) -> EncodingMode {
        self.encoding
    }

    /// Fully-qualified URL a dispatch would request. Validates required
    /// parameters the same way `dispatch` does.
    pub fn build_url(&self, kind: RequestKind, params: &RequestParams) -> Result<String> {
        let plan = QueryPlan::build(kind, &self.api_key, params)?;
        Ok(plan.to_url(&self.base_url, self.encoding))
    }

    /// Perform one lookup.
    ///
    /// Validation failures return before any network activity. The parsed
    /// body is returned unmodified.
    pub async fn dispatch(&self, kind: RequestKind, params: &RequestParams) -> Result<Value> {
        let plan = self.plan(kind, params)?;
        self.send(&plan).await
    }

    /// Like `dispatch`, but gives up with `Cancelled` as soon as `cancel`
    /// fires. A token that has already fired means nothing is sent.
    pub async fn dispatch_cancellable(
        &self,
        kind: RequestKind,
        params: &RequestParams,
        cancel: &CancelToken,
    ) -> Result<Value> {
        let plan = self.plan(kind, params)?;

        if cancel.is_cancelled() {
            tracing::debug!(kind = %kind, "Dispatch cancelled before sending");
            return Err(DispatchError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(kind = %kind, "Dispatch cancelled in flight");
                Err(DispatchError::Cancelled)
            }
            result = self.send(&plan) => result,
        }
    }

    fn plan(&self, kind: RequestKind, params: &RequestParams) -> Result<QueryPlan> {
        QueryPlan::build(kind, &self.api_key, params).map_err(|e| {
            tracing::debug!(kind = %kind, error = %e, "Rejected request before sending");
            e
        })
    }

    async fn send(&self, plan: &QueryPlan) -> Result<Value> {
        let url = plan.to_url(&self.base_url, self.encoding);
        tracing::info!(
            kind = %plan.kind(),
            url = %plan.to_redacted_url(&self.base_url, self.encoding),
            "Dispatching lookup"
        );

        match self.http.get_json(&url).await {
            Ok(body) => {
                tracing::debug!(kind = %plan.kind(), "Lookup succeeded");
                Ok(body)
            }
            Err(failure) => {
                tracing::error!(kind = %plan.kind(), error = %failure, "Lookup failed");
                Err(DispatchError::FetchFailed(failure))
            }
        }
    }
}
