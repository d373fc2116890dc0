//! Integration tests for listing, batch fetch, harvest and multi-wiki runs.
//!
//! Every test runs against scripted in-memory transports plugged in through
//! the `Transport` and `TransportFactory` traits, so no network is touched.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use wiki_harvest::config::Config;
use wiki_harvest::export::{write_documents, DocumentFormat};
use wiki_harvest::fetcher::BatchFetcher;
use wiki_harvest::lister::list_all_pages;
use wiki_harvest::progress::{HarvestProgressEvent, HarvestProgressReporter};
use wiki_harvest::{
    run_harvest, MultiSourceOrchestrator, NormalizedDocument, SourceConfig, Transport,
    TransportError, TransportFactory, TransportResponse, WikiHarvester, WikiSettings,
};

// ─── Scripted Wiki ──────────────────────────────────────────────────

/// In-memory wiki: scripted listing rounds and a page table.
#[derive(Default)]
struct ScriptedWiki {
    /// One entry per listing round; `Err` fails that round.
    listing: Vec<Result<TransportResponse, String>>,
    pages: HashMap<u64, Value>,
    failing: HashSet<u64>,
    /// When set, every listing round waits for a notification first.
    listing_gate: Option<Arc<Notify>>,
    posts: Mutex<Vec<Value>>,
    gets: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedWiki {
    /// Single listing round returning `ids`, each with a page body.
    fn with_pages(ids: &[u64]) -> Self {
        let value: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "id": id, "path": format!("/Page {}", id) }))
            .collect();
        let pages = ids
            .iter()
            .map(|&id| {
                (
                    id,
                    json!({
                        "id": id,
                        "path": format!("/Home/Page {}", id),
                        "content": format!("body {}", id),
                        "remoteUrl": format!("https://wiki.test/{}", id),
                    }),
                )
            })
            .collect();
        Self {
            listing: vec![Ok(TransportResponse::new(json!({ "value": value })))],
            pages,
            ..Default::default()
        }
    }

    fn failing(mut self, ids: &[u64]) -> Self {
        self.failing.extend(ids.iter().copied());
        self
    }

    fn post_bodies(&self) -> Vec<Value> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedWiki {
    async fn post(&self, _path: &str, body: Value) -> Result<TransportResponse, TransportError> {
        if let Some(gate) = &self.listing_gate {
            gate.notified().await;
        }
        let round = {
            let mut posts = self.posts.lock().unwrap();
            posts.push(body);
            posts.len() - 1
        };
        match self.listing.get(round) {
            Some(Ok(resp)) => Ok(resp.clone()),
            Some(Err(msg)) => Err(TransportError::Other(msg.clone())),
            None => Err(TransportError::Other(format!("unexpected listing round {}", round))),
        }
    }

    async fn get(&self, path: &str) -> Result<TransportResponse, TransportError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Let sibling fetches start before this one settles.
        tokio::task::yield_now().await;

        let id: u64 = path
            .trim_start_matches("/pages/")
            .split('?')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&id) {
            return Err(TransportError::Status {
                status: 500,
                path: path.to_string(),
                body: "boom".into(),
            });
        }
        match self.pages.get(&id) {
            Some(page) => Ok(TransportResponse::new(page.clone())),
            None => Err(TransportError::Status {
                status: 404,
                path: path.to_string(),
                body: String::new(),
            }),
        }
    }
}

/// Hands out a pre-built wiki per source name.
#[derive(Default)]
struct ScriptedFactory {
    wikis: HashMap<String, Arc<ScriptedWiki>>,
    created: AtomicUsize,
}

impl ScriptedFactory {
    fn with(mut self, name: &str, wiki: ScriptedWiki) -> Self {
        self.wikis.insert(name.to_string(), Arc::new(wiki));
        self
    }
}

impl TransportFactory for ScriptedFactory {
    fn create(
        &self,
        _settings: &WikiSettings,
        source: &SourceConfig,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        match self.wikis.get(&source.name) {
            Some(wiki) => Ok(wiki.clone() as Arc<dyn Transport>),
            None => Err(TransportError::Other(format!("no wiki named {}", source.name))),
        }
    }
}

/// Records every progress event.
#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<HarvestProgressEvent>>,
}

impl HarvestProgressReporter for RecordingProgress {
    fn report(&self, event: HarvestProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn source(name: &str, title_suffix: Option<&str>) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        organization: "acme".into(),
        project: "platform".into(),
        wiki_identifier: format!("{}.wiki", name),
        title_suffix: title_suffix.map(String::from),
    }
}

fn settings() -> WikiSettings {
    WikiSettings {
        base_url: "https://dev.azure.com".into(),
        token: "pat".into(),
    }
}

fn listing_round(ids: &[u64], token: Option<&str>) -> Result<TransportResponse, String> {
    let value: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    let resp = TransportResponse::new(json!({ "count": ids.len(), "value": value }));
    Ok(match token {
        Some(t) => resp.with_header("x-ms-continuationtoken", t),
        None => resp,
    })
}

// ─── Listing ────────────────────────────────────────────────────────

#[tokio::test]
async fn listing_follows_continuation_tokens() {
    let wiki = ScriptedWiki {
        listing: vec![
            listing_round(&[1, 2], Some("t1")),
            listing_round(&[], Some("t2")),
            listing_round(&[3], None),
        ],
        ..Default::default()
    };

    let pages = list_all_pages(&wiki, "wiki:docs").await.unwrap();
    let ids: Vec<u64> = pages.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    assert_eq!(
        wiki.post_bodies(),
        vec![
            json!({}),
            json!({ "continuationToken": "t1" }),
            json!({ "continuationToken": "t2" }),
        ]
    );
}

#[tokio::test]
async fn listing_without_token_makes_one_request() {
    let wiki = ScriptedWiki {
        listing: vec![listing_round(&[], None)],
        ..Default::default()
    };
    assert!(list_all_pages(&wiki, "wiki:docs").await.unwrap().is_empty());
    assert_eq!(wiki.post_bodies().len(), 1);
}

#[tokio::test]
async fn listing_failure_discards_partial_results() {
    let wiki = ScriptedWiki {
        listing: vec![
            listing_round(&[1, 2], Some("t1")),
            Err("connection reset".into()),
        ],
        ..Default::default()
    };

    let err = list_all_pages(&wiki, "wiki:docs").await.unwrap_err();
    assert_eq!(err.source_label, "wiki:docs");
    assert!(err.cause.to_string().contains("connection reset"));
    assert_eq!(wiki.post_bodies().len(), 2);
}

// ─── Batch Fetch ────────────────────────────────────────────────────

#[tokio::test]
async fn batch_fetch_runs_in_bounded_rounds() {
    let ids: Vec<u64> = (1..=250).collect();
    let wiki = Arc::new(ScriptedWiki::with_pages(&ids));
    let fetcher = BatchFetcher::new(wiki.clone(), "wiki:docs", 100);

    let (pages, report) = fetcher.fetch_all_with_report(&ids).await;

    assert_eq!(pages.len(), 250);
    assert_eq!(report.rounds, 3);
    assert_eq!(report.fetched, 250);
    assert_eq!(report.failed, 0);
    assert_eq!(wiki.gets.load(Ordering::SeqCst), 250);

    let max = wiki.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 100, "max in flight was {}", max);
    assert!(max > 1, "fetches within a chunk should overlap");
}

#[tokio::test]
async fn failed_fetch_is_dropped_without_cancelling_siblings() {
    let wiki = Arc::new(ScriptedWiki::with_pages(&[1, 2, 3]).failing(&[2]));
    let fetcher = BatchFetcher::new(wiki.clone(), "wiki:docs", 100);

    let (pages, report) = fetcher.fetch_all_with_report(&[1, 2, 3]).await;
    let ids: Vec<Option<u64>> = pages.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![Some(1), Some(3)]);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(wiki.gets.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn settled_chunk_keeps_the_failure_cause() {
    let wiki = Arc::new(ScriptedWiki::with_pages(&[1, 2]).failing(&[2]));
    let fetcher = BatchFetcher::new(wiki, "wiki:docs", 10);

    let results = fetcher.fetch_chunk_settled(&[1, 2]).await;
    assert_eq!(results.len(), 2);
    assert!(results[0].1.is_ok());

    let err = results[1].1.as_ref().unwrap_err();
    assert_eq!(err.page_id, 2);
    assert_eq!(err.source_label, "wiki:docs");
}

#[tokio::test]
async fn empty_id_list_fetches_nothing() {
    let wiki = Arc::new(ScriptedWiki::default());
    let fetcher = BatchFetcher::new(wiki.clone(), "wiki:docs", 100);

    let (pages, report) = fetcher.fetch_all_with_report(&[]).await;
    assert!(pages.is_empty());
    assert_eq!(report.rounds, 0);
    assert_eq!(wiki.gets.load(Ordering::SeqCst), 0);
}

// ─── Single Wiki Harvest ────────────────────────────────────────────

#[tokio::test]
async fn harvest_maps_fetched_pages_and_skips_failures() {
    let mut wiki = ScriptedWiki::default().failing(&[2]);
    wiki.listing = vec![listing_round(&[1, 2, 3], None)];
    wiki.pages.insert(
        1,
        json!({
            "id": 1,
            "path": "/Home/Intro",
            "content": "Welcome",
            "remoteUrl": "https://dev.azure.com/acme/platform/_wiki/wikis/docs.wiki/1",
        }),
    );
    wiki.pages.insert(
        3,
        json!({
            "id": 3,
            "path": "/Home/Notes",
            "content": "n",
            "remoteUrl": "https://dev.azure.com/acme/platform/_wiki/wikis/docs.wiki/3",
        }),
    );

    let docs: Vec<NormalizedDocument> =
        WikiHarvester::new(source("docs", Some(" - Docs")), Arc::new(wiki))
            .harvest()
            .await
            .unwrap()
            .collect()
            .await;

    assert_eq!(
        docs,
        vec![
            NormalizedDocument {
                title: "Intro - Docs".into(),
                location: "https://dev.azure.com/acme/platform/_wiki/wikis/docs.wiki/1".into(),
                text: "Welcome".into(),
            },
            NormalizedDocument {
                title: "Notes - Docs".into(),
                location: "https://dev.azure.com/acme/platform/_wiki/wikis/docs.wiki/3".into(),
                text: "n".into(),
            },
        ]
    );
}

#[tokio::test]
async fn harvest_of_unusual_pages_uses_fallbacks() {
    let mut wiki = ScriptedWiki::default();
    wiki.listing = vec![listing_round(&[10], None)];
    wiki.pages.insert(10, json!({ "id": 10, "path": "/" }));

    let docs: Vec<NormalizedDocument> = WikiHarvester::new(source("docs", None), Arc::new(wiki))
        .harvest()
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].title, "Unknown Title");
    assert_eq!(docs[0].location, "");
    assert_eq!(docs[0].text, "");
}

#[tokio::test]
async fn harvest_fails_when_listing_fails() {
    let wiki = ScriptedWiki {
        listing: vec![Err("unauthorized".into())],
        ..Default::default()
    };
    let wiki = Arc::new(wiki);

    let result = WikiHarvester::new(source("docs", None), wiki.clone())
        .harvest()
        .await;
    let err = match result {
        Ok(_) => panic!("listing failure should fail the harvest"),
        Err(e) => e,
    };
    assert_eq!(err.source_label, "wiki:docs");
    assert_eq!(wiki.gets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn harvest_fetches_lazily_chunk_by_chunk() {
    let ids: Vec<u64> = (1..=30).collect();
    let wiki = Arc::new(ScriptedWiki::with_pages(&ids));

    let mut docs = WikiHarvester::new(source("docs", None), wiki.clone())
        .with_chunk_size(10)
        .harvest()
        .await
        .unwrap();
    assert_eq!(wiki.gets.load(Ordering::SeqCst), 0);

    let first = docs.next().await.unwrap();
    assert_eq!(first.title, "Page 1");
    assert_eq!(wiki.gets.load(Ordering::SeqCst), 10);

    let rest: Vec<NormalizedDocument> = docs.collect().await;
    assert_eq!(rest.len(), 29);
    assert_eq!(wiki.gets.load(Ordering::SeqCst), 30);
}

#[tokio::test]
async fn harvest_reports_listing_then_fetch_progress() {
    let ids: Vec<u64> = (1..=250).collect();
    let wiki = Arc::new(ScriptedWiki::with_pages(&ids));
    let progress = Arc::new(RecordingProgress::default());

    let docs: Vec<NormalizedDocument> = WikiHarvester::new(source("docs", None), wiki)
        .with_progress(progress.clone())
        .harvest()
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(docs.len(), 250);

    let fetching = |n| HarvestProgressEvent::Fetching {
        source: "wiki:docs".into(),
        n,
        total: 250,
    };
    assert_eq!(
        *progress.events.lock().unwrap(),
        vec![
            HarvestProgressEvent::Listing {
                source: "wiki:docs".into()
            },
            fetching(100),
            fetching(200),
            fetching(250),
        ]
    );
}

// ─── Multi-Wiki Orchestration ───────────────────────────────────────

#[tokio::test]
async fn failing_source_does_not_affect_the_others() {
    let broken = ScriptedWiki {
        listing: vec![Err("503 service unavailable".into())],
        ..Default::default()
    };
    let factory = Arc::new(
        ScriptedFactory::default()
            .with("a", ScriptedWiki::with_pages(&[1]))
            .with("b", broken),
    );

    let orchestrator = MultiSourceOrchestrator::new(
        settings(),
        vec![source("a", None), source("b", None)],
        factory.clone(),
    );
    let docs = orchestrator.run_to_vec().await;

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].title, "Page 1");
    assert_eq!(factory.created.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn transport_creation_failure_skips_only_that_source() {
    let factory = Arc::new(ScriptedFactory::default().with("a", ScriptedWiki::with_pages(&[1, 2])));

    let orchestrator = MultiSourceOrchestrator::new(
        settings(),
        vec![source("a", None), source("missing", None)],
        factory,
    );
    assert_eq!(orchestrator.run_to_vec().await.len(), 2);
}

#[tokio::test]
async fn documents_from_every_source_are_merged() {
    let factory = Arc::new(
        ScriptedFactory::default()
            .with("a", ScriptedWiki::with_pages(&[1, 2, 3]))
            .with("b", ScriptedWiki::with_pages(&[10, 20])),
    );

    let orchestrator = MultiSourceOrchestrator::new(
        settings(),
        vec![source("a", Some(" (A)")), source("b", Some(" (B)"))],
        factory,
    )
    .with_chunk_size(2);

    let mut titles: Vec<String> = orchestrator
        .run_to_vec()
        .await
        .into_iter()
        .map(|d| d.title)
        .collect();
    titles.sort();
    assert_eq!(
        titles,
        vec![
            "Page 1 (A)",
            "Page 10 (B)",
            "Page 2 (A)",
            "Page 20 (B)",
            "Page 3 (A)",
        ]
    );
}

#[tokio::test]
async fn no_sources_yield_an_empty_stream() {
    let orchestrator =
        MultiSourceOrchestrator::new(settings(), Vec::new(), Arc::new(ScriptedFactory::default()));
    assert!(orchestrator.run_to_vec().await.is_empty());
}

#[tokio::test]
async fn consumer_can_stop_early() {
    let ids: Vec<u64> = (1..=500).collect();
    let factory = Arc::new(ScriptedFactory::default().with("a", ScriptedWiki::with_pages(&ids)));
    let orchestrator =
        MultiSourceOrchestrator::new(settings(), vec![source("a", None)], factory).with_chunk_size(50);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docs.jsonl");
    let written = write_documents(orchestrator.run(), Some(&path), DocumentFormat::Jsonl, Some(5))
        .await
        .unwrap();

    assert_eq!(written, 5);
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 5);
}

#[tokio::test]
async fn limit_on_chunk_boundary_fetches_no_extra_chunk() {
    let ids: Vec<u64> = (1..=30).collect();
    let wiki = Arc::new(ScriptedWiki::with_pages(&ids));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docs.jsonl");

    let docs = WikiHarvester::new(source("docs", None), wiki.clone())
        .with_chunk_size(10)
        .harvest()
        .await
        .unwrap();
    let written = write_documents(docs, Some(&path), DocumentFormat::Jsonl, Some(10))
        .await
        .unwrap();

    assert_eq!(written, 10);
    assert_eq!(wiki.gets.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn zero_limit_fetches_no_content() {
    let wiki = Arc::new(ScriptedWiki::with_pages(&[1, 2, 3]));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docs.json");

    let docs = WikiHarvester::new(source("docs", None), wiki.clone())
        .harvest()
        .await
        .unwrap();
    let written = write_documents(docs, Some(&path), DocumentFormat::Json, Some(0))
        .await
        .unwrap();

    assert_eq!(written, 0);
    assert_eq!(wiki.gets.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
}

#[tokio::test]
async fn sources_are_harvested_concurrently() {
    let gate = Arc::new(Notify::new());
    let mut blocked = ScriptedWiki::with_pages(&[1]);
    blocked.listing_gate = Some(gate.clone());

    let factory = Arc::new(
        ScriptedFactory::default()
            .with("a", blocked)
            .with("b", ScriptedWiki::with_pages(&[2])),
    );
    let orchestrator = MultiSourceOrchestrator::new(
        settings(),
        vec![source("a", Some(" (A)")), source("b", Some(" (B)"))],
        factory,
    );
    let mut docs = orchestrator.run();

    // "a" cannot finish listing until "b" has delivered a document.
    let first = tokio::time::timeout(Duration::from_secs(5), docs.next())
        .await
        .expect("b should not wait behind a")
        .unwrap();
    assert_eq!(first.title, "Page 2 (B)");

    gate.notify_one();
    let rest: Vec<NormalizedDocument> = docs.collect().await;
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].title, "Page 1 (A)");
}

// ─── Configuration ──────────────────────────────────────────────────

#[tokio::test]
async fn missing_configuration_fails_before_any_transport_is_built() {
    let cfg: Config = toml::from_str(
        r#"
[wiki]
base_url = "https://dev.azure.com"

[wiki.sources.docs]
organization = "acme"
wiki_identifier = "docs.wiki"
"#,
    )
    .unwrap();

    let err = run_harvest(&cfg).await.unwrap_err();
    assert_eq!(
        err.missing,
        vec!["wiki.token", "wiki.sources.docs.project"]
    );

    let factory = Arc::new(ScriptedFactory::default());
    let built = MultiSourceOrchestrator::from_config(&cfg)
        .map(|o| o.with_transport_factory(factory.clone()));
    assert!(built.is_err());
    assert_eq!(factory.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn valid_configuration_runs_through_the_factory() {
    let cfg: Config = toml::from_str(
        r#"
[wiki]
base_url = "https://dev.azure.com"
token = "pat"

[wiki.sources.a]
organization = "acme"
project = "platform"
wiki_identifier = "a.wiki"
title_suffix = " | A"

[fetch]
chunk_size = 7
"#,
    )
    .unwrap();

    let factory = Arc::new(ScriptedFactory::default().with("a", ScriptedWiki::with_pages(&[4, 5])));
    let orchestrator = MultiSourceOrchestrator::from_config(&cfg)
        .unwrap()
        .with_transport_factory(factory.clone());

    assert_eq!(orchestrator.sources().len(), 1);
    let docs = orchestrator.run_to_vec().await;
    let titles: Vec<&str> = docs.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["Page 4 | A", "Page 5 | A"]);
    assert_eq!(factory.created.load(Ordering::SeqCst), 1);
}
