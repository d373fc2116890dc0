//! HTTP transport for the Azure DevOps wiki REST API.
//!
//! One [`HttpTransport`] is scoped to one wiki:
//! `{base_url}/{organization}/{project}/_apis/wiki/wikis/{wiki_identifier}`.
//! Requests carry basic auth (empty user name, the personal access token
//! as password) and a JSON content type.
//!
//! # Retry
//!
//! Transient failures are retried with exponential backoff:
//! - network errors → retry
//! - HTTP 429 and 5xx → retry
//! - other HTTP 4xx → fail immediately
//!
//! Delays are 1s, 2s, 4s, ... capped at 32s, up to `max_retries` extra
//! attempts.
//!
//! POST is retried like GET: the only POST is the read-only `pagesBatch`
//! listing call.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::TransportError;
use crate::traits::{Transport, TransportResponse};

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpTransport {
    /// Create a transport rooted at `base_url` (the wiki API base).
    pub fn new(
        base_url: String,
        token: &str,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            max_retries,
            base_delay: Duration::from_secs(1),
        })
    }

    /// Override the first backoff delay. Later delays double from here.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .basic_auth("", Some(&self.token))
            .header("Content-Type", "application/json")
    }

    /// Send a request, retrying transient failures.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<TransportResponse, TransportError> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * (1u32 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let mut req = self.request(method.clone(), path);
            if let Some(body) = body {
                req = req.body(body.to_string());
            }

            match self.send_once(req, path).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() => {
                    tracing::debug!(path, attempt, error = %e, "retrying wiki request");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| TransportError::Other(format!("{} failed after retries", path))))
    }

    async fn send_once(
        &self,
        req: RequestBuilder,
        path: &str,
    ) -> Result<TransportResponse, TransportError> {
        let resp = req.send().await.map_err(|source| TransportError::Network {
            path: path.to_string(),
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                body: body.chars().take(500).collect(),
            });
        }

        let headers: HashMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let text = resp.text().await.map_err(|source| TransportError::Network {
            path: path.to_string(),
            source,
        })?;
        let data = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| TransportError::Decode {
                path: path.to_string(),
                message: e.to_string(),
            })?
        };

        Ok(TransportResponse { data, headers })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: Value) -> Result<TransportResponse, TransportError> {
        self.send(Method::POST, path, Some(&body)).await
    }

    async fn get(&self, path: &str) -> Result<TransportResponse, TransportError> {
        self.send(Method::GET, path, None).await
    }
}
