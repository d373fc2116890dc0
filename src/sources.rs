//! Configured wiki status listing.
//!
//! Reports which wikis are configured and whether each has everything a
//! harvest needs. Used by the `wiki-harvest sources` command.
//!
//! A source is healthy when it has `organization`, `project` and
//! `wiki_identifier` and the shared `wiki.base_url` / `wiki.token` are set.
//! No network call is made.

use anyhow::Result;
use serde::Serialize;

use crate::config::{present, Config};
use crate::models::SourceConfig;

/// Configuration status of a single wiki.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceStatus {
    /// Source label, e.g. `"wiki:docs"`.
    pub name: String,
    pub healthy: bool,
    /// API base URL when healthy, otherwise the missing keys.
    pub notes: Option<String>,
}

/// Status of every `[wiki.sources.<name>]` entry.
pub fn get_sources(config: &Config) -> Vec<SourceStatus> {
    let base_url = present(&config.wiki.base_url);
    let mut shared_missing = Vec::new();
    if base_url.is_none() {
        shared_missing.push("wiki.base_url");
    }
    if present(&config.wiki.token).is_none() {
        shared_missing.push("wiki.token");
    }

    config
        .wiki
        .sources
        .iter()
        .map(|(name, raw)| {
            let mut missing = shared_missing.clone();
            missing.extend(raw.missing_fields());

            let notes = match base_url {
                Some(base) if missing.is_empty() => {
                    let source = SourceConfig {
                        name: name.clone(),
                        organization: present(&raw.organization).unwrap_or_default().to_string(),
                        project: present(&raw.project).unwrap_or_default().to_string(),
                        wiki_identifier: present(&raw.wiki_identifier).unwrap_or_default().to_string(),
                        title_suffix: raw.title_suffix.clone(),
                    };
                    format!("url: {}", source.api_base_url(base))
                }
                _ => format!("missing: {}", missing.join(", ")),
            };

            SourceStatus {
                name: format!("wiki:{}", name),
                healthy: missing.is_empty(),
                notes: Some(notes),
            }
        })
        .collect()
}

/// CLI entry point for `wiki-harvest sources`.
pub fn list_sources(config: &Config) -> Result<()> {
    let sources = get_sources(config);

    if sources.is_empty() {
        println!("No wikis configured (add a [wiki.sources.<name>] table).");
        return Ok(());
    }

    println!("{:<24} {:<8} NOTES", "SOURCE", "HEALTHY");
    for s in &sources {
        println!(
            "{:<24} {:<8} {}",
            s.name,
            s.healthy,
            s.notes.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
