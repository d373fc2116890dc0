//! Page record → normalized document.
//!
//! Total: every page maps to a document. Missing fields degrade to defaults.

use crate::models::{NormalizedDocument, PageContent};

/// Title used when a page has no usable path.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Last non-empty `/`-segment of a page path.
pub fn title_from_path(path: Option<&str>) -> &str {
    path.and_then(|p| p.split('/').rev().find(|segment| !segment.is_empty()))
        .unwrap_or(UNKNOWN_TITLE)
}

/// Map a fetched page to the document handed to the indexer.
///
/// The suffix is appended verbatim, with no separator of its own.
pub fn map_page(page: PageContent, title_suffix: Option<&str>) -> NormalizedDocument {
    let mut title = title_from_path(page.path.as_deref()).to_string();
    if let Some(suffix) = title_suffix {
        title.push_str(suffix);
    }

    NormalizedDocument {
        title,
        location: page.remote_url.unwrap_or_default(),
        text: page.content.unwrap_or_default(),
    }
}
