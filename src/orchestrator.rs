//! Multi-wiki fan-out.
//!
//! Validates the configuration once, then runs one harvest per source on
//! its own task. Each source settles independently: a source whose listing
//! fails is logged and contributes nothing, while the others keep
//! streaming. Documents from all sources are merged into one stream through
//! a bounded channel, so a slow consumer applies backpressure instead of
//! letting documents pile up in memory.
//!
//! ```text
//!                    ┌── task: harvest(wiki:a) ──┐
//! validate ─▶ spawn ─┼── task: harvest(wiki:b) ──┼──▶ channel ──▶ DocumentStream
//!                    └── task: harvest(wiki:c) ──┘
//! ```

use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{display_chain, ConfigurationError, HarvestError};
use crate::fetcher::DEFAULT_CHUNK_SIZE;
use crate::harvester::{DocumentStream, WikiHarvester};
use crate::models::{NormalizedDocument, SourceConfig, WikiSettings};
use crate::progress::{HarvestProgressReporter, NoProgress};
use crate::traits::{HttpTransportFactory, TransportFactory};

/// Runs every configured wiki harvest concurrently.
pub struct MultiSourceOrchestrator {
    settings: WikiSettings,
    sources: Vec<SourceConfig>,
    chunk_size: usize,
    factory: Arc<dyn TransportFactory>,
    progress: Arc<dyn HarvestProgressReporter>,
}

impl MultiSourceOrchestrator {
    /// Validate `config` and prepare a run. No network call is made.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] listing every missing required key.
    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        let (settings, sources) = config.validate()?;
        Ok(Self {
            settings,
            sources,
            chunk_size: config.fetch.chunk_size,
            factory: Arc::new(HttpTransportFactory {
                timeout_secs: config.http.timeout_secs,
                max_retries: config.http.max_retries,
            }),
            progress: Arc::new(NoProgress),
        })
    }

    /// Build from already validated parts, with the default chunk size.
    pub fn new(
        settings: WikiSettings,
        sources: Vec<SourceConfig>,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            settings,
            sources,
            chunk_size: DEFAULT_CHUNK_SIZE,
            factory,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn HarvestProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// Start every harvest and return the merged document stream.
    ///
    /// Must be called inside a tokio runtime. Source failures never surface
    /// here; they are logged with the source label.
    pub fn run(&self) -> DocumentStream {
        let (tx, rx) = mpsc::channel::<NormalizedDocument>(self.chunk_size.max(1));
        let mut handles = Vec::with_capacity(self.sources.len());

        tracing::info!(sources = self.sources.len(), "Starting wiki harvest run");

        for source in &self.sources {
            let label = source.label();
            let harvest = self.start_harvest(source.clone());
            let mut tx = tx.clone();

            let task_label = label.clone();
            let handle = tokio::spawn(async move {
                let mut docs = match harvest.await {
                    Ok(docs) => docs,
                    Err(e) => {
                        tracing::error!(
                            source = %task_label,
                            error = %display_chain(&e),
                            "Wiki harvest failed, skipping source"
                        );
                        return;
                    }
                };
                while let Some(doc) = docs.next().await {
                    if tx.send(doc).await.is_err() {
                        tracing::debug!(source = %task_label, "document receiver dropped");
                        return;
                    }
                }
            });
            handles.push((label, handle));
        }
        drop(tx);

        // A panicking harvest drops its sender like a finished one; record it.
        tokio::spawn(async move {
            for (label, handle) in handles {
                if let Err(e) = handle.await {
                    tracing::error!(source = %label, error = %e, "Wiki harvest task aborted");
                }
            }
        });

        rx.boxed()
    }

    /// Run and drain every document into memory.
    pub async fn run_to_vec(&self) -> Vec<NormalizedDocument> {
        self.run().collect().await
    }

    fn start_harvest(
        &self,
        source: SourceConfig,
    ) -> impl std::future::Future<Output = Result<DocumentStream, HarvestError>> + Send + 'static {
        let transport = self.factory.create(&self.settings, &source);
        let chunk_size = self.chunk_size;
        let progress = self.progress.clone();

        async move {
            let transport = transport.map_err(|cause| HarvestError::Transport {
                source_label: source.label(),
                cause,
            })?;
            let docs = WikiHarvester::new(source, transport)
                .with_chunk_size(chunk_size)
                .with_progress(progress)
                .harvest()
                .await?;
            Ok(docs)
        }
    }
}

/// Validate `config`, harvest every wiki, and collect the documents.
///
/// # Errors
///
/// Only configuration problems are returned; per-source and per-page
/// failures are logged and skipped.
pub async fn run_harvest(config: &Config) -> Result<Vec<NormalizedDocument>, ConfigurationError> {
    let orchestrator = MultiSourceOrchestrator::from_config(config)?;
    Ok(orchestrator.run_to_vec().await)
}
