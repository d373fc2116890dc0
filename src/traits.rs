//! Extension traits for the transport seam.
//!
//! The harvest core never talks HTTP directly. It issues `post` and `get`
//! calls against a [`Transport`] scoped to one wiki, and the orchestrator
//! obtains one transport per source from a [`TransportFactory`].
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │         MultiSourceOrchestrator            │
//! │   TransportFactory::create(source) ──┐     │
//! └──────────────────────────────────────┼─────┘
//!                                        ▼
//!        ┌──────────────┐  ┌──────────────────────┐
//!        │ HttpTransport│  │ in-memory (tests)    │
//!        │ reqwest+retry│  │ scripted responses   │
//!        └──────────────┘  └──────────────────────┘
//! ```
//!
//! Implement [`Transport`] to harvest from something other than the live
//! REST API (a recorded fixture, a proxy, a test double).

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::TransportError;
use crate::models::{SourceConfig, WikiSettings};
use crate::transport::HttpTransport;

// ═══════════════════════════════════════════════════════════════════════
// Transport Trait
// ═══════════════════════════════════════════════════════════════════════

/// Response of a single transport call.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    /// Decoded JSON body.
    pub data: Value,
    /// Response headers with lower-cased names.
    pub headers: HashMap<String, String>,
}

impl TransportResponse {
    /// Build a response with a body and no headers.
    pub fn new(data: Value) -> Self {
        Self {
            data,
            headers: HashMap::new(),
        }
    }

    /// Add a header. The name is lower-cased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Request/response channel to one wiki.
///
/// Paths are relative to the wiki API base
/// (`…/_apis/wiki/wikis/{wiki_identifier}`). Implementations handle
/// authentication and transport-level retry; the harvest core never
/// retries on its own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body.
    async fn post(&self, path: &str, body: Value) -> Result<TransportResponse, TransportError>;

    /// GET a JSON resource.
    async fn get(&self, path: &str) -> Result<TransportResponse, TransportError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Transport Factory
// ═══════════════════════════════════════════════════════════════════════

/// Builds the transport a single source's harvest will own.
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        settings: &WikiSettings,
        source: &SourceConfig,
    ) -> Result<Arc<dyn Transport>, TransportError>;
}

/// Default factory: a fresh [`HttpTransport`] per source.
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl TransportFactory for HttpTransportFactory {
    fn create(
        &self,
        settings: &WikiSettings,
        source: &SourceConfig,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        let transport = HttpTransport::new(
            source.api_base_url(&settings.base_url),
            &settings.token,
            self.timeout_secs,
            self.max_retries,
        )?;
        Ok(Arc::new(transport))
    }
}
