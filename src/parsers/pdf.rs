//! PDF parsing via `pdf-extract`.
//!
//! `pdf-extract`'s `PlainTextOutput` inserts a form-feed (`\x0c`) between
//! pages; page boundaries for chunking and `ExtractionParams::Pdf` are
//! recovered by splitting on that character.

use super::{FormatMetadata, ParsedContent};
use crate::error::{CoreError, CoreResult};

pub fn parse(bytes: &[u8], original_path: &str) -> CoreResult<ParsedContent> {
    let raw = pdf_extract::extract_text_from_mem(bytes).map_err(|e| CoreError::ParseError {
        path: original_path.into(),
        reason: e.to_string(),
    })?;

    let pages: Vec<String> = raw
        .split('\x0c')
        .map(|page| page.lines().map(|l| l.trim_end()).collect::<Vec<_>>().join("\n"))
        .collect();
    // Drop a single trailing empty page produced by a final form-feed.
    let pages: Vec<String> = if pages.len() > 1 && pages.last().map(|p| p.trim().is_empty()).unwrap_or(false) {
        pages[..pages.len() - 1].to_vec()
    } else {
        pages
    };

    let content = pages.join("\n\n");

    Ok(ParsedContent {
        content,
        format_tag: "pdf",
        original_path: original_path.to_string(),
        metadata: FormatMetadata::Pdf { pages },
    })
}
