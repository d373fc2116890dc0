//! Write harvested documents for the indexing pipeline.
//!
//! Documents are written as they arrive from the stream, so a large run
//! never holds the whole document set in memory. Two layouts:
//!
//! | Format | Shape |
//! |--------|-------|
//! | `jsonl` | one `{"title","location","text"}` object per line |
//! | `json` | a single JSON array |

use anyhow::{Context, Result};
use futures::StreamExt;
use std::io::Write;
use std::path::Path;

use crate::harvester::DocumentStream;
use crate::models::NormalizedDocument;

/// Output layout.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum DocumentFormat {
    #[default]
    Jsonl,
    Json,
}

/// Incremental document writer.
pub struct DocumentWriter<W: Write> {
    out: W,
    format: DocumentFormat,
    written: usize,
}

impl<W: Write> DocumentWriter<W> {
    pub fn new(out: W, format: DocumentFormat) -> Self {
        Self {
            out,
            format,
            written: 0,
        }
    }

    pub fn write(&mut self, doc: &NormalizedDocument) -> Result<()> {
        match self.format {
            DocumentFormat::Jsonl => {
                serde_json::to_writer(&mut self.out, doc)?;
                self.out.write_all(b"\n")?;
            }
            DocumentFormat::Json => {
                self.out
                    .write_all(if self.written == 0 { b"[\n  " } else { b",\n  " })?;
                serde_json::to_writer(&mut self.out, doc)?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Close the layout and flush. Returns the number of documents written.
    pub fn finish(mut self) -> Result<usize> {
        if self.format == DocumentFormat::Json {
            self.out
                .write_all(if self.written == 0 { b"[]\n" } else { b"\n]\n" })?;
        }
        self.out.flush()?;
        Ok(self.written)
    }
}

/// Drain `docs` into `output` (or stdout), stopping after `limit` documents.
///
/// Returns the number of documents written.
pub async fn write_documents(
    mut docs: DocumentStream,
    output: Option<&Path>,
    format: DocumentFormat,
    limit: Option<usize>,
) -> Result<usize> {
    let out: Box<dyn Write> = match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Box::new(std::io::BufWriter::new(file))
        }
        None => Box::new(std::io::BufWriter::new(std::io::stdout().lock())),
    };

    let mut writer = DocumentWriter::new(out, format);
    let mut count = 0usize;
    // Stop before polling again: the next poll may fetch a whole chunk.
    while limit.map_or(true, |max| count < max) {
        let Some(doc) = docs.next().await else {
            break;
        };
        writer.write(&doc)?;
        count += 1;
    }
    writer.finish()
}
