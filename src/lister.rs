//! Page enumeration over the paginated `pagesBatch` endpoint.
//!
//! Each response carries a slice of page summaries in `value` and, when more
//! pages remain, an opaque token in the `x-ms-continuationtoken` header. The
//! token is passed back unchanged in the next request body. A response
//! without a token (or with an empty one) ends enumeration.
//!
//! ```text
//! Enumerating(None) ──POST {}──▶ token? ──yes──▶ Enumerating(Some(t)) ──POST {continuationToken:t}──▶ ...
//!                                   └──no───▶ Done
//! ```

use serde_json::{json, Value};

use crate::error::{ListingError, TransportError};
use crate::models::PageSummary;
use crate::traits::Transport;

/// Listing endpoint, relative to the wiki API base.
pub const PAGES_BATCH_PATH: &str = "/pagesBatch?api-version=6.0-preview.1";

/// Response header holding the continuation token.
pub const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

/// Where the listing loop stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingState {
    /// Another request is due, carrying the token if there is one.
    Enumerating(Option<String>),
    Done,
}

impl ListingState {
    /// Next state given the token a response returned.
    fn advance(token: Option<&str>) -> Self {
        match token {
            Some(t) if !t.is_empty() => ListingState::Enumerating(Some(t.to_string())),
            _ => ListingState::Done,
        }
    }
}

/// Request body for one listing round.
fn request_body(token: Option<&str>) -> Value {
    match token {
        Some(t) => json!({ "continuationToken": t }),
        None => json!({}),
    }
}

/// Enumerate every page of one wiki, in the order the service returns them.
///
/// The whole listing is collected before returning. Any failed request
/// aborts enumeration; no partial list is returned.
pub async fn list_all_pages(
    transport: &dyn Transport,
    source_label: &str,
) -> Result<Vec<PageSummary>, ListingError> {
    tracing::info!(source = source_label, "Listing wiki pages");

    let mut pages = Vec::new();
    let mut state = ListingState::Enumerating(None);
    let mut rounds = 0u64;

    while let ListingState::Enumerating(token) = state {
        let response = transport
            .post(PAGES_BATCH_PATH, request_body(token.as_deref()))
            .await
            .map_err(|cause| ListingError {
                source_label: source_label.to_string(),
                cause,
            })?;
        rounds += 1;

        let batch = parse_page_summaries(&response.data).map_err(|cause| ListingError {
            source_label: source_label.to_string(),
            cause,
        })?;
        tracing::debug!(
            source = source_label,
            round = rounds,
            items = batch.len(),
            "listing round"
        );
        for page in &batch {
            tracing::trace!(
                source = source_label,
                page_id = page.id,
                path = page.path.as_deref().unwrap_or(""),
                "listed page"
            );
        }
        pages.extend(batch);

        state = ListingState::advance(response.header(CONTINUATION_HEADER));
    }

    tracing::info!(source = source_label, pages = pages.len(), rounds, "Found wiki pages");
    Ok(pages)
}

/// Decode the `value` array of a listing response. A missing array is empty.
fn parse_page_summaries(data: &Value) -> Result<Vec<PageSummary>, TransportError> {
    match data.get("value") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| TransportError::Decode {
            path: PAGES_BATCH_PATH.to_string(),
            message: e.to_string(),
        }),
    }
}
