//! TOML configuration parsing and validation.
//!
//! # Example
//!
//! ```toml
//! [wiki]
//! base_url = "https://dev.azure.com"
//! token = "…"                       # or set WIKI_HARVEST_TOKEN
//!
//! [wiki.sources.platform]
//! organization = "acme"
//! project = "platform"
//! wiki_identifier = "platform.wiki"
//! title_suffix = " - Platform Wiki"
//!
//! [fetch]
//! chunk_size = 100
//!
//! [http]
//! timeout_secs = 30
//! max_retries = 3
//! ```
//!
//! Wiki fields are optional at parse time. Presence is checked by
//! [`Config::validate`], which reports every missing key at once.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigurationError;
use crate::fetcher::DEFAULT_CHUNK_SIZE;
use crate::models::{SourceConfig, WikiSettings};

/// Environment variable consulted when `wiki.token` is not set.
pub const TOKEN_ENV: &str = "WIKI_HARVEST_TOKEN";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub wiki: WikiConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WikiConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    /// Named wiki instances, keyed by the `[wiki.sources.<name>]` table name.
    #[serde(default)]
    pub sources: BTreeMap<String, RawSourceConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawSourceConfig {
    pub organization: Option<String>,
    pub project: Option<String>,
    pub wiki_identifier: Option<String>,
    pub title_suffix: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

/// `Some` only for a value with non-whitespace content.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl RawSourceConfig {
    /// Names of the required fields this source lacks.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if present(&self.organization).is_none() {
            missing.push("organization");
        }
        if present(&self.project).is_none() {
            missing.push("project");
        }
        if present(&self.wiki_identifier).is_none() {
            missing.push("wiki_identifier");
        }
        missing
    }
}

impl Config {
    /// Check every required value and build the typed settings.
    ///
    /// Requires `wiki.base_url`, `wiki.token`, at least one source, and
    /// `organization`, `project`, `wiki_identifier` on every source. Each
    /// missing key is logged and listed in the returned error.
    pub fn validate(&self) -> Result<(WikiSettings, Vec<SourceConfig>), ConfigurationError> {
        let mut missing = Vec::new();

        let base_url = present(&self.wiki.base_url);
        if base_url.is_none() {
            missing.push("wiki.base_url".to_string());
        }
        let token = present(&self.wiki.token);
        if token.is_none() {
            missing.push("wiki.token".to_string());
        }
        if self.wiki.sources.is_empty() {
            missing.push("wiki.sources".to_string());
        }

        let mut sources = Vec::with_capacity(self.wiki.sources.len());
        for (name, raw) in &self.wiki.sources {
            let lacking = raw.missing_fields();
            if !lacking.is_empty() {
                missing.extend(
                    lacking
                        .into_iter()
                        .map(|field| format!("wiki.sources.{}.{}", name, field)),
                );
                continue;
            }
            sources.push(SourceConfig {
                name: name.clone(),
                organization: present(&raw.organization).unwrap_or_default().to_string(),
                project: present(&raw.project).unwrap_or_default().to_string(),
                wiki_identifier: present(&raw.wiki_identifier).unwrap_or_default().to_string(),
                title_suffix: raw.title_suffix.clone(),
            });
        }

        match (base_url, token) {
            (Some(base_url), Some(token)) if missing.is_empty() => Ok((
                WikiSettings {
                    base_url: base_url.to_string(),
                    token: token.to_string(),
                },
                sources,
            )),
            _ => {
                for key in &missing {
                    tracing::error!(key = %key, "No {} configured", key);
                }
                Err(ConfigurationError { missing })
            }
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if present(&config.wiki.token).is_none() {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            config.wiki.token = Some(token);
        }
    }

    if config.fetch.chunk_size == 0 {
        anyhow::bail!("fetch.chunk_size must be > 0");
    }

    Ok(config)
}
