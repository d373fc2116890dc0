//! # Wiki Harvest CLI (`wiki-harvest`)
//!
//! ## Usage
//!
//! ```bash
//! wiki-harvest --config ./config/wiki-harvest.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `wiki-harvest sources` | List configured wikis and whether each is complete |
//! | `wiki-harvest harvest` | Harvest every wiki and write documents |
//!
//! ## Examples
//!
//! ```bash
//! # Harvest everything to stdout as JSON Lines
//! wiki-harvest harvest > docs.jsonl
//!
//! # Harvest one wiki into a JSON array file, with progress
//! wiki-harvest harvest --source platform --format json --output out/platform.json --progress human
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wiki_harvest::config;
use wiki_harvest::export::{self, DocumentFormat};
use wiki_harvest::logging::{self, LogFormat};
use wiki_harvest::orchestrator::MultiSourceOrchestrator;
use wiki_harvest::progress::ProgressMode;
use wiki_harvest::sources;

/// Harvest Azure DevOps wikis into normalized documents for search indexing.
#[derive(Parser)]
#[command(name = "wiki-harvest", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/wiki-harvest.toml")]
    config: PathBuf,

    /// Debug-level logging.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Only log errors.
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured wikis and their status.
    ///
    /// No network call is made; a wiki is healthy when every required
    /// field is configured.
    Sources,

    /// Harvest wiki pages and write normalized documents.
    ///
    /// Lists every page of each configured wiki, fetches page content in
    /// chunks, and writes one document per fetched page. Failed pages and
    /// failed wikis are logged and skipped.
    Harvest {
        /// Only harvest the wiki with this name (`[wiki.sources.<name>]`).
        #[arg(long)]
        source: Option<String>,

        /// Write documents to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Document layout.
        #[arg(long, value_enum, default_value_t = DocumentFormat::Jsonl)]
        format: DocumentFormat,

        /// Progress reporting on stderr. Defaults to `human` on a TTY, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,

        /// Stop after this many documents.
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet, cli.log_format)?;

    let mut cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Harvest {
            source,
            output,
            format,
            progress,
            limit,
        } => {
            if let Some(name) = source {
                if !cfg.wiki.sources.contains_key(&name) {
                    bail!(
                        "Unknown wiki source: '{}'. Configured: {}",
                        name,
                        cfg.wiki
                            .sources
                            .keys()
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
                cfg.wiki.sources.retain(|k, _| *k == name);
            }

            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            let orchestrator = MultiSourceOrchestrator::from_config(&cfg)
                .context("Refusing to harvest with incomplete configuration")?
                .with_progress(progress.reporter());

            let written =
                export::write_documents(orchestrator.run(), output.as_deref(), format, limit)
                    .await?;

            eprintln!(
                "harvest: {} documents from {} wiki(s)",
                written,
                orchestrator.sources().len()
            );
        }
    }

    Ok(())
}
