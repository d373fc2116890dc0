//! # Wiki Harvest
//!
//! Enumerate every page of one or more Azure DevOps wikis, fetch each page's
//! content, and emit a normalized `{title, location, text}` document per page
//! for a downstream search indexer.
//!
//! A failed page or even a whole failed wiki never aborts the run; only a
//! missing configuration value does, and it does so before any network call.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ MultiSourceOrchestr. │  validate config, one task per wiki
//! └─────────┬────────────┘
//!           ▼  (per wiki)
//! ┌──────────┐   ┌──────────────┐   ┌──────────┐
//! │  Lister  │──▶│ BatchFetcher │──▶│  Mapper  │──▶ DocumentStream
//! │pagesBatch│   │ chunks of 100│   │  title…  │
//! └──────────┘   └──────────────┘   └──────────┘
//!           │            │
//!           └─────┬──────┘
//!                 ▼
//!          ┌─────────────┐
//!          │  Transport  │  reqwest, basic auth, retry/backoff
//!          └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! wiki-harvest sources                         # check configured wikis
//! wiki-harvest harvest > docs.jsonl            # harvest every wiki
//! wiki-harvest harvest --source platform --format json --output out/platform.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and presence validation |
//! | [`models`] | Sources, page records, normalized documents |
//! | [`error`] | Configuration, listing, fetch, and transport errors |
//! | [`traits`] | `Transport` and `TransportFactory` seams |
//! | [`transport`] | reqwest transport with basic auth and retry |
//! | [`lister`] | Continuation-token page enumeration |
//! | [`fetcher`] | Chunked, bounded-concurrency content fetch |
//! | [`mapper`] | Page → document mapping and title rules |
//! | [`harvester`] | Single-wiki harvest stream |
//! | [`orchestrator`] | Multi-wiki fan-out with per-source failure isolation |
//! | [`progress`] | Harvest progress on stderr |
//! | [`export`] | JSON Lines / JSON document writer |
//! | [`sources`] | Configured wiki status listing |
//! | [`logging`] | `tracing` subscriber setup |

pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod harvester;
pub mod lister;
pub mod logging;
pub mod mapper;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod sources;
pub mod traits;
pub mod transport;

pub use error::{ConfigurationError, FetchError, ListingError, TransportError};
pub use harvester::{DocumentStream, WikiHarvester};
pub use models::{NormalizedDocument, PageContent, PageSummary, SourceConfig, WikiSettings};
pub use orchestrator::{run_harvest, MultiSourceOrchestrator};
pub use traits::{Transport, TransportFactory, TransportResponse};
