//! Core data models used throughout the harvester.
//!
//! These types represent the configured sources, the raw page records
//! returned by the wiki API, and the normalized documents handed to the
//! indexing boundary.

use serde::{Deserialize, Serialize};

/// Shared settings applied to every configured wiki.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiSettings {
    /// Service root, e.g. `https://dev.azure.com`.
    pub base_url: String,
    /// Personal access token sent as the basic-auth password.
    pub token: String,
}

/// One wiki to harvest. Built only from a validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Instance name from the config table key (e.g. `"docs"`).
    pub name: String,
    pub organization: String,
    pub project: String,
    pub wiki_identifier: String,
    /// Appended verbatim to every derived title.
    pub title_suffix: Option<String>,
}

impl SourceConfig {
    /// Label used in logs: `"wiki:<name>"`.
    pub fn label(&self) -> String {
        format!("wiki:{}", self.name)
    }

    /// Base URL of the wiki REST API for this source.
    ///
    /// `{base_url}/{organization}/{project}/_apis/wiki/wikis/{wiki_identifier}`
    pub fn api_base_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}/{}/_apis/wiki/wikis/{}",
            base_url.trim_end_matches('/'),
            self.organization,
            self.project,
            self.wiki_identifier
        )
    }
}

/// Listing record from the `pagesBatch` endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PageSummary {
    pub id: u64,
    #[serde(default)]
    pub path: Option<String>,
}

/// Full page record from the `pages/{id}` endpoint.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    #[serde(default)]
    pub id: Option<u64>,
    /// Slash-delimited hierarchy, e.g. `/Platform/Runbooks/Deploy`.
    #[serde(default)]
    pub path: Option<String>,
    /// Raw markdown body.
    #[serde(default)]
    pub content: Option<String>,
    /// Browser URL of the page.
    #[serde(default)]
    pub remote_url: Option<String>,
}

/// The output unit consumed by the indexing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedDocument {
    pub title: String,
    pub location: String,
    pub text: String,
}
