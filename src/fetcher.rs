//! Bounded-concurrency page content retrieval.
//!
//! Identifiers are split into fixed-size chunks. Every fetch in a chunk runs
//! concurrently and the chunk settles as a whole before the next one starts,
//! so at most `chunk_size` requests are in flight per source. A failed fetch
//! is logged and dropped; it never cancels its siblings.

use futures::future::join_all;
use std::sync::Arc;

use crate::error::{FetchError, TransportError};
use crate::models::PageContent;
use crate::traits::Transport;

/// Default number of concurrent fetches per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Content endpoint for one page, relative to the wiki API base.
pub fn page_content_path(id: u64) -> String {
    format!("/pages/{}?includeContent=true", id)
}

/// Counts from a batch fetch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    pub fetched: usize,
    pub failed: usize,
    /// Sequential chunk rounds issued.
    pub rounds: usize,
}

impl FetchReport {
    pub(crate) fn absorb(&mut self, other: FetchReport) {
        self.fetched += other.fetched;
        self.failed += other.failed;
        self.rounds += other.rounds;
    }
}

/// Fetches page content for one source.
#[derive(Clone)]
pub struct BatchFetcher {
    transport: Arc<dyn Transport>,
    source_label: String,
    chunk_size: usize,
}

impl BatchFetcher {
    /// `chunk_size` of zero is treated as one.
    pub fn new(transport: Arc<dyn Transport>, source_label: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            transport,
            source_label: source_label.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Fetch a single page.
    pub async fn fetch_page(&self, id: u64) -> Result<PageContent, FetchError> {
        let path = page_content_path(id);
        let fail = |cause: TransportError| FetchError {
            source_label: self.source_label.clone(),
            page_id: id,
            cause,
        };

        let response = self.transport.get(&path).await.map_err(fail)?;
        let mut page: PageContent = serde_json::from_value(response.data).map_err(|e| {
            fail(TransportError::Decode {
                path: path.clone(),
                message: e.to_string(),
            })
        })?;
        page.id.get_or_insert(id);
        Ok(page)
    }

    /// Run one chunk and settle every fetch. Results keep input order.
    pub async fn fetch_chunk_settled(
        &self,
        ids: &[u64],
    ) -> Vec<(u64, Result<PageContent, FetchError>)> {
        let results = join_all(ids.iter().map(|&id| self.fetch_page(id))).await;
        ids.iter().copied().zip(results).collect()
    }

    /// Run one chunk, keeping only the pages that were fetched.
    pub async fn fetch_chunk(&self, ids: &[u64]) -> (Vec<PageContent>, FetchReport) {
        let mut report = FetchReport {
            rounds: 1,
            ..Default::default()
        };
        let mut pages = Vec::with_capacity(ids.len());

        for (id, result) in self.fetch_chunk_settled(ids).await {
            match result {
                Ok(page) => {
                    report.fetched += 1;
                    pages.push(page);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        source = %self.source_label,
                        page_id = id,
                        error = %e.cause,
                        "Failed to fetch wiki page, skipping"
                    );
                }
            }
        }

        (pages, report)
    }

    /// Fetch every id, `chunk_size` at a time.
    pub async fn fetch_all_with_report(&self, ids: &[u64]) -> (Vec<PageContent>, FetchReport) {
        let mut pages = Vec::with_capacity(ids.len());
        let mut report = FetchReport::default();

        for chunk in ids.chunks(self.chunk_size) {
            let (chunk_pages, chunk_report) = self.fetch_chunk(chunk).await;
            pages.extend(chunk_pages);
            report.absorb(chunk_report);
        }

        tracing::debug!(
            source = %self.source_label,
            fetched = report.fetched,
            failed = report.failed,
            rounds = report.rounds,
            "batch fetch complete"
        );
        (pages, report)
    }

    /// Fetch every id; failures are excluded from the result.
    pub async fn fetch_all(&self, ids: &[u64]) -> Vec<PageContent> {
        self.fetch_all_with_report(ids).await.0
    }
}
