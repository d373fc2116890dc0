//! Single-wiki harvest: list, then fetch, then map.
//!
//! [`WikiHarvester::harvest`] lists every page before the first fetch.
//! The returned [`DocumentStream`] then fetches one chunk per poll cycle and
//! yields that chunk's documents, so only one chunk of page bodies is held
//! at a time. The stream is single-pass; build a new harvester to run again.

use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

use crate::error::ListingError;
use crate::fetcher::{BatchFetcher, FetchReport, DEFAULT_CHUNK_SIZE};
use crate::lister::list_all_pages;
use crate::mapper::map_page;
use crate::models::{NormalizedDocument, SourceConfig};
use crate::progress::{HarvestProgressEvent, HarvestProgressReporter, NoProgress};
use crate::traits::Transport;

/// Lazy, single-pass sequence of harvested documents.
pub type DocumentStream = BoxStream<'static, NormalizedDocument>;

/// Harvests one configured wiki through its own transport.
pub struct WikiHarvester {
    source: SourceConfig,
    transport: Arc<dyn Transport>,
    chunk_size: usize,
    progress: Arc<dyn HarvestProgressReporter>,
}

impl WikiHarvester {
    pub fn new(source: SourceConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            source,
            transport,
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress: Arc::new(NoProgress),
        }
    }

    /// Concurrent fetches per chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn HarvestProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    /// List every page, then return a stream that fetches and maps them.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError`] if enumeration fails. No document is
    /// produced in that case.
    pub async fn harvest(self) -> Result<DocumentStream, ListingError> {
        let label = self.source.label();
        self.progress.report(HarvestProgressEvent::Listing {
            source: label.clone(),
        });

        let ids: Vec<u64> = list_all_pages(self.transport.as_ref(), &label)
            .await?
            .into_iter()
            .map(|page| page.id)
            .collect();

        tracing::info!(source = %label, pages = ids.len(), "Harvesting wiki");

        let state = HarvestState {
            fetcher: BatchFetcher::new(self.transport, label.clone(), self.chunk_size),
            ids,
            offset: 0,
            report: FetchReport::default(),
            title_suffix: self.source.title_suffix,
            progress: self.progress,
            label,
        };

        Ok(stream::unfold(state, |mut state| async move {
            let docs = state.next_chunk().await?;
            Some((stream::iter(docs), state))
        })
        .flatten()
        .boxed())
    }
}

/// Cursor over the listed ids while the stream is being drained.
struct HarvestState {
    fetcher: BatchFetcher,
    ids: Vec<u64>,
    offset: usize,
    report: FetchReport,
    title_suffix: Option<String>,
    progress: Arc<dyn HarvestProgressReporter>,
    label: String,
}

impl HarvestState {
    /// Fetch and map the next chunk. `None` once every id has been tried.
    async fn next_chunk(&mut self) -> Option<Vec<NormalizedDocument>> {
        if self.offset >= self.ids.len() {
            tracing::info!(
                source = %self.label,
                fetched = self.report.fetched,
                failed = self.report.failed,
                "Done harvesting wiki"
            );
            return None;
        }

        let end = (self.offset + self.fetcher.chunk_size()).min(self.ids.len());
        let (pages, report) = self.fetcher.fetch_chunk(&self.ids[self.offset..end]).await;
        self.offset = end;
        self.report.absorb(report);

        self.progress.report(HarvestProgressEvent::Fetching {
            source: self.label.clone(),
            n: self.offset as u64,
            total: self.ids.len() as u64,
        });

        let suffix = self.title_suffix.as_deref();
        Some(pages.into_iter().map(|page| map_page(page, suffix)).collect())
    }
}
