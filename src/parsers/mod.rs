//! Format Parsers (C2).
//!
//! Each backend converts raw bytes into a neutral [`ParsedContent`] carrying
//! format-specific [`FormatMetadata`] the chunker needs to respect structural
//! boundaries (sheet rows, slide numbers, page numbers, paragraph indices).
//! Parsers are pure functions of their input bytes — no global state, no I/O
//! beyond the single read the caller already did.

mod docx;
mod html;
mod pdf;
mod pptx;
mod text;
pub(crate) mod xlsx;

use crate::error::{CoreError, CoreResult};
use std::path::Path;

pub(crate) use xlsx::{index_to_letter, letter_to_index};

/// One row of cells, used by both `.xlsx` and `.csv` (a csv file is treated
/// as a single-sheet spreadsheet named `"Sheet1"`).
pub type Row = Vec<String>;

#[derive(Clone, Debug)]
pub struct SheetData {
    pub name: String,
    pub rows: Vec<Row>,
}

#[derive(Clone, Debug)]
pub struct SlideData {
    pub index: usize,
    pub text: String,
    pub notes: Option<String>,
}

/// Format-specific structure the chunker needs to produce correct
/// `ExtractionParams`.
#[derive(Clone, Debug)]
pub enum FormatMetadata {
    /// Text/Markdown/HTML: normalized content split into lines.
    Lines { lines: Vec<String> },
    Pdf { pages: Vec<String> },
    Word { paragraphs: Vec<String> },
    Excel { sheets: Vec<SheetData> },
    PowerPoint { slides: Vec<SlideData> },
}

#[derive(Clone, Debug)]
pub struct ParsedContent {
    /// Normalized textual content (for formats where a single linear stream
    /// makes sense — used for embeddings' context and for document-level
    /// summaries).
    pub content: String,
    pub format_tag: &'static str,
    pub original_path: String,
    pub metadata: FormatMetadata,
}

/// The closed, case-insensitive set of extensions this system understands.
/// MUST agree exactly with `fingerprint`'s enumeration filter — enforced by
/// a property test in `tests/format_agreement.rs`.
const SUPPORTED_EXTENSIONS: &[&str] =
    &["txt", "md", "html", "htm", "pdf", "docx", "xlsx", "csv", "pptx"];

pub fn is_supported(extension: &str) -> bool {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

/// Parse a file's bytes according to its extension.
pub fn parse_file(path: &Path, bytes: &[u8]) -> CoreResult<ParsedContent> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let original_path = path.to_string_lossy().replace('\\', "/");

    match ext.as_str() {
        "txt" => text::parse(bytes, &original_path, "text"),
        "md" => text::parse(bytes, &original_path, "markdown"),
        "html" | "htm" => html::parse(bytes, &original_path),
        "pdf" => pdf::parse(bytes, &original_path),
        "docx" => docx::parse(bytes, &original_path),
        "xlsx" => xlsx::parse(bytes, &original_path),
        "csv" => xlsx::parse_csv(bytes, &original_path),
        "pptx" => pptx::parse(bytes, &original_path),
        other => Err(CoreError::ParseError {
            path: path.to_path_buf(),
            reason: format!("unsupported extension '{other}'"),
        }),
    }
}

/// Re-derive the exact substring a chunk was built from, given the original
/// file's bytes and its extraction params. Used both by round-trip tests
/// and by the `get_sheet_data`/`get_slides`/`get_pages` tool handlers that
/// want a fresh read instead of the cached chunk content.
pub fn extract_by_params(
    path: &Path,
    bytes: &[u8],
    params: &crate::chunker::ExtractionParams,
) -> CoreResult<String> {
    use crate::chunker::ExtractionParams as EP;
    let parsed = parse_file(path, bytes)?;

    match (params, &parsed.metadata) {
        (EP::Text { start_line, end_line }, FormatMetadata::Lines { lines }) => {
            extract_lines(lines, *start_line, *end_line, params)
        }
        (
            EP::Excel { sheet, start_row, end_row, start_col, end_col },
            FormatMetadata::Excel { sheets },
        ) => xlsx::extract_range(sheets, sheet, *start_row, *end_row, start_col, end_col, params),
        (
            EP::PowerPoint { slide, include_notes, include_comments: _ },
            FormatMetadata::PowerPoint { slides },
        ) => pptx::extract_slide(slides, *slide, *include_notes, params),
        (EP::Pdf { page_start, page_end }, FormatMetadata::Pdf { pages }) => {
            extract_pages(pages, *page_start, *page_end, params)
        }
        (
            EP::Word { paragraph_start, paragraph_end },
            FormatMetadata::Word { paragraphs },
        ) => extract_paragraphs(paragraphs, *paragraph_start, *paragraph_end, params),
        _ => Err(CoreError::ExtractionError {
            params: format!("{params:?}"),
            reason: "extraction params variant does not match this document's format".to_string(),
        }),
    }
}

fn extract_lines(
    lines: &[String],
    start_line: usize,
    end_line: usize,
    params: &crate::chunker::ExtractionParams,
) -> CoreResult<String> {
    if start_line == 0 || end_line < start_line || end_line > lines.len() {
        return Err(CoreError::ExtractionError {
            params: format!("{params:?}"),
            reason: format!("line range {start_line}..={end_line} out of bounds (len={})", lines.len()),
        });
    }
    Ok(lines[start_line - 1..end_line].join("\n"))
}

fn extract_pages(
    pages: &[String],
    page_start: usize,
    page_end: usize,
    params: &crate::chunker::ExtractionParams,
) -> CoreResult<String> {
    if page_start == 0 || page_end < page_start || page_end > pages.len() {
        return Err(CoreError::ExtractionError {
            params: format!("{params:?}"),
            reason: format!("page range {page_start}..={page_end} out of bounds (len={})", pages.len()),
        });
    }
    Ok(pages[page_start - 1..page_end].join("\n\n"))
}

fn extract_paragraphs(
    paragraphs: &[String],
    paragraph_start: usize,
    paragraph_end: usize,
    params: &crate::chunker::ExtractionParams,
) -> CoreResult<String> {
    if paragraph_start == 0 || paragraph_end < paragraph_start || paragraph_end > paragraphs.len()
    {
        return Err(CoreError::ExtractionError {
            params: format!("{params:?}"),
            reason: format!(
                "paragraph range {paragraph_start}..={paragraph_end} out of bounds (len={})",
                paragraphs.len()
            ),
        });
    }
    Ok(paragraphs[paragraph_start - 1..paragraph_end].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(is_supported("TXT"));
        assert!(is_supported(".Md"));
        assert!(!is_supported("exe"));
        assert!(!is_supported("png"));
    }
}
