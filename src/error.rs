//! Error taxonomy for a harvest run.
//!
//! Each error class is contained at a different level:
//!
//! | Error | Scope | Raised past the orchestrator? |
//! |-------|-------|-------------------------------|
//! | [`ConfigurationError`] | whole run | yes, before any network call |
//! | [`ListingError`] | one source | no, logged and the source yields nothing |
//! | [`FetchError`] | one page | no, logged and the page is dropped |
//!
//! [`TransportError`] is the failure of a single HTTP round-trip and is
//! carried as the source of the listing and fetch errors.

use thiserror::Error;

/// Failure of one transport call.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    /// The request never produced a response (connect, timeout, TLS, ...).
    #[error("request to {path} failed: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not the JSON shape we expected.
    #[error("could not decode response from {path}: {message}")]
    Decode { path: String, message: String },

    /// Transport-specific failure not covered above (used by in-memory transports).
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether a retry could plausibly succeed: network errors, 429 and 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network { .. } => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::Decode { .. } | TransportError::Other(_) => false,
        }
    }
}

/// A required configuration value is missing.
///
/// Every missing field is collected, not just the first one found.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing required configuration: {}", .missing.join(", "))]
pub struct ConfigurationError {
    /// Dotted config keys that are absent or blank, e.g. `wiki.sources.docs.project`.
    pub missing: Vec<String>,
}

/// Enumerating the pages of one wiki failed.
#[derive(Error, Debug)]
#[error("listing pages of {source_label} failed")]
pub struct ListingError {
    pub source_label: String,
    #[source]
    pub cause: TransportError,
}

/// Retrieving the content of one page failed.
#[derive(Error, Debug)]
#[error("fetching page {page_id} of {source_label} failed")]
pub struct FetchError {
    pub source_label: String,
    pub page_id: u64,
    #[source]
    pub cause: TransportError,
}

/// Failure that keeps a single source from being harvested.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error(transparent)]
    Listing(#[from] ListingError),

    /// The transport for the source could not be built.
    #[error("could not create transport for {source_label}")]
    Transport {
        source_label: String,
        #[source]
        cause: TransportError,
    },
}

/// Render an error and its sources as `outer: inner: root`.
pub fn display_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut next = err.source();
    while let Some(cause) = next {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        next = cause.source();
    }
    out
}
