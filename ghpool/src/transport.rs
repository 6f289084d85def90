//! The HTTP transport boundary the scheduling core dispatches through.
//!
//! `SearchTransport` is the "external request executor" of the design: the
//! core (`Client`, `Queue`) never touches `reqwest` directly, only this
//! trait, so tests can substitute a fake transport without a live server.
//! Grounded on `GitHubClient::send_with_rate_limit` from the teacher repo,
//! generalized from a fixed GitHub releases endpoint to an arbitrary search
//! URL + params.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

/// Optional per-request overrides. Defaults mirror the teacher's
/// `GitHubClient`: GET, the bearer/Accept headers added by the `Client`
/// layer, no body.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestParams {
    pub fn method(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }
}

/// A successful transport round-trip. Headers are retained even on success
/// so the rate-limit header-refresh routine can run uniformly.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A failed transport round-trip. `status`/`headers` are populated whenever
/// the server returned a response at all (a non-2xx status); both are
/// `None`/empty for pure network failures, matching spec.md §6's "failure
/// with `{message, response?: {status, headers}}`".
#[derive(Debug, Clone, thiserror::Error)]
#[error("transport request failed: {message}")]
pub struct TransportFailure {
    pub message: String,
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
}

pub type TransportOutcome = Result<TransportResponse, TransportFailure>;

/// The request executor the scheduling core dispatches through.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn execute(&self, url: &str, params: &RequestParams) -> TransportOutcome;
}

/// `reqwest`-backed implementation, grounded on `GitHubClient::get_release`.
pub struct HttpSearchTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpSearchTransport {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        Self::with_timeout(user_agent, Duration::from_secs(30))
    }

    pub fn with_timeout(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build http client: {e}"))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl SearchTransport for HttpSearchTransport {
    async fn execute(&self, url: &str, params: &RequestParams) -> TransportOutcome {
        let mut builder = self
            .client
            .request(params.method(), url)
            .timeout(self.timeout)
            .headers(params.headers.clone());

        if let Some(body) = &params.body {
            builder = builder.body(body.clone());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                return Err(TransportFailure {
                    message: err.to_string(),
                    status: err.status(),
                    headers: HeaderMap::new(),
                });
            }
        };

        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(TransportFailure {
                message: format!("HTTP {status}: {body_text}"),
                status: Some(status),
                headers,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportFailure {
                message: format!("failed to read response body: {e}"),
                status: Some(status),
                headers: headers.clone(),
            })?;

        Ok(TransportResponse { headers, body })
    }
}
