//! Chunker (C3).
//!
//! Splits a [`ParsedContent`](crate::parsers::ParsedContent) into an ordered
//! sequence of [`Chunk`]s, each carrying a versioned [`ExtractionParams`] that
//! lets a later process re-derive the chunk's content deterministically.

use crate::parsers::{FormatMetadata, ParsedContent, SheetData, SlideData};
use crate::tokenizer::estimate_tokens;
use serde::{Deserialize, Serialize};

/// Schema version every serialized `ExtractionParams` envelope carries
/// alongside its tag. Tracked here so a future format change has somewhere
/// to branch from; today there is only one version.
pub const EXTRACTION_PARAMS_VERSION: u32 = 1;

/// A tagged descriptor that lets a parser re-derive a chunk's content from
/// the original file. Serializes as `{type, ...fields}`; `version` is carried
/// alongside the chunk record rather than duplicated into every variant.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExtractionParams {
    Text { start_line: usize, end_line: usize },
    Excel {
        sheet: String,
        start_row: usize,
        end_row: usize,
        start_col: String,
        end_col: String,
    },
    PowerPoint { slide: usize, include_notes: bool, include_comments: bool },
    Pdf { page_start: usize, page_end: usize },
    Word { paragraph_start: usize, paragraph_end: usize },
}

impl ExtractionParams {
    /// Returns `false` for anything that didn't come off a deserializer
    /// whose envelope recorded `version == EXTRACTION_PARAMS_VERSION`.
    /// Callers that accept params over the wire should check the envelope's
    /// `version` field before constructing one of these at all; this exists
    /// so that check has a single named comparison to call.
    pub fn is_supported_version(version: u32) -> bool {
        version == EXTRACTION_PARAMS_VERSION
    }
}

#[derive(Clone, Debug)]
pub struct Chunk {
    pub chunk_index: usize,
    pub start: usize,
    pub end: usize,
    pub token_count: usize,
    pub content: String,
    pub key_phrases: Vec<(String, f64)>,
    pub readability: f64,
    pub extraction_params: ExtractionParams,
}

#[derive(Clone, Copy, Debug)]
pub struct ChunkerConfig {
    pub max_tokens: usize,
    pub min_tokens: usize,
    /// Widest column span a single Excel/CSV chunk is allowed to cover.
    pub max_data_columns: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: crate::config::DEFAULT_MAX_CHUNK_TOKENS,
            min_tokens: crate::config::DEFAULT_MIN_CHUNK_TOKENS,
            max_data_columns: 3,
        }
    }
}

/// Allowed overshoot past `max_tokens` for an indivisible unit.
const OVERSHOOT_FACTOR: f64 = 1.2;

pub fn chunk(parsed: &ParsedContent, config: ChunkerConfig) -> Vec<Chunk> {
    match &parsed.metadata {
        FormatMetadata::Lines { lines } => chunk_lines(lines, config),
        FormatMetadata::Excel { sheets } => chunk_excel(sheets, config),
        FormatMetadata::PowerPoint { slides } => chunk_slides(slides, config),
        FormatMetadata::Pdf { pages } => chunk_pages(pages, config),
        FormatMetadata::Word { paragraphs } => chunk_paragraphs(paragraphs, config),
    }
}

fn key_phrases(text: &str, limit: usize) -> Vec<(String, f64)> {
    use std::collections::HashMap;
    const STOPWORDS: &[&str] = &[
        "the", "a", "an", "of", "to", "and", "in", "is", "it", "for", "on", "with", "as", "this",
        "that", "by", "are", "was", "be", "or", "at",
    ];
    let mut freq: HashMap<String, usize> = HashMap::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let lower = word.to_ascii_lowercase();
        if lower.len() < 3 || STOPWORDS.contains(&lower.as_str()) {
            continue;
        }
        *freq.entry(lower).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, f64)> =
        freq.into_iter().map(|(w, c)| (w, c as f64)).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let max_count = ranked.first().map(|(_, c)| *c).unwrap_or(1.0);
    ranked.truncate(limit);
    ranked.into_iter().map(|(w, c)| (w, c / max_count)).collect()
}

/// Flesch-Reading-Ease-style approximation: no syllable dictionary, so
/// syllables are estimated as vowel-group count per word. Documented as an
/// approximation, not a strict implementation of the published formula.
fn readability(text: &str) -> f64 {
    let sentences = text.split(['.', '!', '?']).filter(|s| !s.trim().is_empty()).count().max(1);
    let words: Vec<&str> = text.split_whitespace().collect();
    let word_count = words.len().max(1);
    let syllables: usize = words.iter().map(|w| estimate_syllables(w)).sum::<usize>().max(1);

    let score = 206.835 - 1.015 * (word_count as f64 / sentences as f64)
        - 84.6 * (syllables as f64 / word_count as f64);
    score.clamp(0.0, 100.0)
}

fn estimate_syllables(word: &str) -> usize {
    let mut count = 0;
    let mut prev_vowel = false;
    for c in word.chars() {
        let is_vowel = "aeiouAEIOU".contains(c);
        if is_vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = is_vowel;
    }
    count.max(1)
}

// ---------------------------------------------------------------------------
// Text / Markdown / HTML — paragraph-boundary splitting
// ---------------------------------------------------------------------------

fn chunk_lines(lines: &[String], config: ChunkerConfig) -> Vec<Chunk> {
    // Group lines into paragraphs (consecutive non-blank runs).
    let mut paragraphs: Vec<(usize, usize)> = Vec::new(); // (start_line, end_line), 1-based
    let mut i = 0usize;
    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }
        let start = i;
        while i < lines.len() && !lines[i].trim().is_empty() {
            i += 1;
        }
        paragraphs.push((start + 1, i));
    }

    let mut chunks = Vec::new();
    let mut cur_start: Option<usize> = None;
    let mut cur_end = 0usize;
    let mut cur_tokens = 0usize;

    let max_overshoot = (config.max_tokens as f64 * OVERSHOOT_FACTOR) as usize;

    for (p_start, p_end) in paragraphs {
        let para_text = lines[p_start - 1..p_end].join("\n");
        let para_tokens = estimate_tokens(&para_text);

        if cur_start.is_none() {
            cur_start = Some(p_start);
            cur_end = p_end;
            cur_tokens = para_tokens;
            continue;
        }

        if cur_tokens + para_tokens > config.max_tokens && cur_tokens >= config.min_tokens {
            chunks.push(build_text_chunk(lines, cur_start.unwrap(), cur_end, chunks.len()));
            cur_start = Some(p_start);
            cur_end = p_end;
            cur_tokens = para_tokens;
        } else if para_tokens > max_overshoot && cur_tokens > 0 {
            // Indivisible oversized paragraph: flush what we have, then let
            // it stand alone even though it alone exceeds max by up to 20%.
            chunks.push(build_text_chunk(lines, cur_start.unwrap(), cur_end, chunks.len()));
            cur_start = Some(p_start);
            cur_end = p_end;
            cur_tokens = para_tokens;
        } else {
            cur_end = p_end;
            cur_tokens += para_tokens;
        }
    }

    if let Some(start) = cur_start {
        chunks.push(build_text_chunk(lines, start, cur_end, chunks.len()));
    }

    if chunks.is_empty() && !lines.is_empty() {
        chunks.push(build_text_chunk(lines, 1, lines.len(), 0));
    }

    chunks
}

fn build_text_chunk(lines: &[String], start_line: usize, end_line: usize, idx: usize) -> Chunk {
    let content = lines[start_line - 1..end_line].join("\n");
    let token_count = estimate_tokens(&content);
    Chunk {
        chunk_index: idx,
        start: start_line - 1,
        end: end_line,
        token_count,
        key_phrases: key_phrases(&content, 8),
        readability: readability(&content),
        extraction_params: ExtractionParams::Text { start_line, end_line },
        content,
    }
}

// ---------------------------------------------------------------------------
// Excel / CSV — per-sheet chunks over data rows, excluding a leading label
// column and the header row from the extracted range entirely
// ---------------------------------------------------------------------------

/// A row-and-column sub-range of a sheet's data rows must round-trip through
/// `extract_range` byte-for-byte, so the chunk's content is built the same
/// way `extract_range` rebuilds it: neither one ever touches the header row.
/// Column 0 is dropped from every chunk when it looks like a row label (none
/// of the data rows parse it as a number) rather than a data series.
fn chunk_excel(sheets: &[SheetData], config: ChunkerConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for sheet in sheets {
        if sheet.rows.len() < 2 {
            continue; // nothing but a header (or nothing at all)
        }
        let data_rows = &sheet.rows[1..];
        let width = sheet.rows.iter().map(|r| r.len()).max().unwrap_or(1).max(1);
        let first_data_col = leading_label_column_width(data_rows, width);

        for (row_start, row_end) in row_groups(data_rows, config.max_tokens) {
            let start_row = row_start + 2; // 1-based, row 1 is the header
            let end_row = row_end + 2;

            let mut col = first_data_col;
            while col < width {
                let col_end = (col + config.max_data_columns - 1).min(width - 1);
                chunks.push(build_excel_chunk(sheet, start_row, end_row, col, col_end, chunks.len()));
                col = col_end + 1;
            }
        }
    }
    chunks
}

/// `1` if every data row's first column fails to parse as a number (it's a
/// label, e.g. a product or region name), `0` if the sheet has no spare
/// column to drop or the first column is itself numeric data.
fn leading_label_column_width(data_rows: &[Vec<String>], width: usize) -> usize {
    if width <= 1 {
        return 0;
    }
    let all_non_numeric =
        data_rows.iter().all(|row| row.first().map(|v| v.trim().parse::<f64>().is_err()).unwrap_or(true));
    if all_non_numeric {
        1
    } else {
        0
    }
}

/// Greedily groups data-row indices (0-based into `data_rows`) into
/// token-budget-bounded runs, the same accumulation strategy `chunk_lines`
/// uses for paragraphs.
fn row_groups(data_rows: &[Vec<String>], max_tokens: usize) -> Vec<(usize, usize)> {
    let mut groups = Vec::new();
    let mut start = 0usize;
    let mut tokens = 0usize;
    for (i, row) in data_rows.iter().enumerate() {
        let row_tokens = estimate_tokens(&row.join(","));
        if i > start && tokens + row_tokens > max_tokens {
            groups.push((start, i - 1));
            start = i;
            tokens = 0;
        }
        tokens += row_tokens;
    }
    groups.push((start, data_rows.len() - 1));
    groups
}

fn build_excel_chunk(
    sheet: &SheetData,
    start_row: usize,
    end_row: usize,
    start_col_idx: usize,
    end_col_idx: usize,
    idx: usize,
) -> Chunk {
    let content = sheet.rows[start_row - 1..end_row]
        .iter()
        .map(|row| {
            (start_col_idx..=end_col_idx)
                .map(|c| row.get(c).cloned().unwrap_or_default())
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n");
    Chunk {
        chunk_index: idx,
        start: start_row - 1,
        end: end_row,
        token_count: estimate_tokens(&content),
        key_phrases: key_phrases(&content, 8),
        readability: readability(&content),
        extraction_params: ExtractionParams::Excel {
            sheet: sheet.name.clone(),
            start_row,
            end_row,
            start_col: crate::parsers::index_to_letter(start_col_idx),
            end_col: crate::parsers::index_to_letter(end_col_idx),
        },
        content,
    }
}

// ---------------------------------------------------------------------------
// PowerPoint — one chunk per slide, notes appended if they fit
// ---------------------------------------------------------------------------

fn chunk_slides(slides: &[SlideData], config: ChunkerConfig) -> Vec<Chunk> {
    slides
        .iter()
        .enumerate()
        .map(|(idx, slide)| {
            let notes_tokens = slide.notes.as_deref().map(estimate_tokens).unwrap_or(0);
            let slide_tokens = estimate_tokens(&slide.text);
            let include_notes =
                slide.notes.is_some() && slide_tokens + notes_tokens <= config.max_tokens;

            let mut content = slide.text.clone();
            if include_notes {
                content.push_str("\n[Speaker Notes]\n");
                content.push_str(slide.notes.as_deref().unwrap_or(""));
            }

            Chunk {
                chunk_index: idx,
                start: slide.index - 1,
                end: slide.index,
                token_count: estimate_tokens(&content),
                key_phrases: key_phrases(&content, 8),
                readability: readability(&content),
                extraction_params: ExtractionParams::PowerPoint {
                    slide: slide.index,
                    include_notes,
                    include_comments: false,
                },
                content,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// PDF — per-page grouping under the token budget
// ---------------------------------------------------------------------------

fn chunk_pages(pages: &[String], config: ChunkerConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut cur_start = 1usize;
    let mut cur_tokens = 0usize;

    for (i, page) in pages.iter().enumerate() {
        let page_no = i + 1;
        let page_tokens = estimate_tokens(page);

        if cur_tokens > 0 && cur_tokens + page_tokens > config.max_tokens {
            chunks.push(build_page_chunk(pages, cur_start, page_no - 1, chunks.len()));
            cur_start = page_no;
            cur_tokens = 0;
        }
        cur_tokens += page_tokens;
    }
    if cur_start <= pages.len() {
        chunks.push(build_page_chunk(pages, cur_start, pages.len(), chunks.len()));
    }
    chunks
}

fn build_page_chunk(pages: &[String], page_start: usize, page_end: usize, idx: usize) -> Chunk {
    let content = pages[page_start - 1..page_end].join("\n\n");
    Chunk {
        chunk_index: idx,
        start: page_start - 1,
        end: page_end,
        token_count: estimate_tokens(&content),
        key_phrases: key_phrases(&content, 8),
        readability: readability(&content),
        extraction_params: ExtractionParams::Pdf { page_start, page_end },
        content,
    }
}

// ---------------------------------------------------------------------------
// Word — per-paragraph grouping under the token budget
// ---------------------------------------------------------------------------

fn chunk_paragraphs(paragraphs: &[String], config: ChunkerConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut cur_start = 1usize;
    let mut cur_tokens = 0usize;

    for (i, para) in paragraphs.iter().enumerate() {
        let para_no = i + 1;
        let para_tokens = estimate_tokens(para);

        if cur_tokens > 0 && cur_tokens + para_tokens > config.max_tokens {
            chunks.push(build_paragraph_chunk(paragraphs, cur_start, para_no - 1, chunks.len()));
            cur_start = para_no;
            cur_tokens = 0;
        }
        cur_tokens += para_tokens;
    }
    if cur_start <= paragraphs.len() {
        chunks.push(build_paragraph_chunk(paragraphs, cur_start, paragraphs.len(), chunks.len()));
    }
    chunks
}

fn build_paragraph_chunk(
    paragraphs: &[String],
    paragraph_start: usize,
    paragraph_end: usize,
    idx: usize,
) -> Chunk {
    let content = paragraphs[paragraph_start - 1..paragraph_end].join("\n");
    Chunk {
        chunk_index: idx,
        start: paragraph_start - 1,
        end: paragraph_end,
        token_count: estimate_tokens(&content),
        key_phrases: key_phrases(&content, 8),
        readability: readability(&content),
        extraction_params: ExtractionParams::Word { paragraph_start, paragraph_end },
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers;

    #[test]
    fn text_chunks_are_dense_and_ordered() {
        let text = "Para one line.\n\nPara two line.\n\nPara three line.\n";
        let parsed = parsers::parse_file(std::path::Path::new("a.txt"), text.as_bytes()).unwrap();
        let chunks = chunk(&parsed, ChunkerConfig { max_tokens: 4, min_tokens: 1, ..ChunkerConfig::default() });
        assert!(!chunks.is_empty());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
        }
    }

    #[test]
    fn excel_chunk_drops_the_label_column_and_groups_by_max_data_columns() {
        use crate::parsers::SheetData;
        let sheets = vec![SheetData {
            name: "Sales Data".to_string(),
            rows: vec![
                vec!["Product".into(), "Q1".into(), "Q2".into(), "Q3".into(), "Q4".into()],
                vec!["Apples".into(), "100".into(), "150".into(), "200".into(), "180".into()],
                vec!["Bananas".into(), "80".into(), "90".into(), "110".into(), "95".into()],
            ],
        }];
        let chunks = chunk_excel(&sheets, ChunkerConfig::default());
        assert_eq!(chunks.len(), 2, "columns B-D and E split into separate chunks");

        match &chunks[0].extraction_params {
            ExtractionParams::Excel { sheet, start_row, end_row, start_col, end_col, .. } => {
                assert_eq!(sheet, "Sales Data");
                assert_eq!(*start_row, 2);
                assert_eq!(*end_row, 3);
                assert_eq!(start_col, "B");
                assert_eq!(end_col, "D");
            }
            other => panic!("expected Excel params, got {other:?}"),
        }
        assert_eq!(chunks[0].content, "100,150,200\n80,90,110");

        match &chunks[1].extraction_params {
            ExtractionParams::Excel { start_col, end_col, .. } => {
                assert_eq!(start_col, "E");
                assert_eq!(end_col, "E");
            }
            other => panic!("expected Excel params, got {other:?}"),
        }
        assert_eq!(chunks[1].content, "180\n95");
    }

    #[test]
    fn excel_chunk_round_trips_through_extract_range() {
        use crate::parsers::SheetData;
        let sheets = vec![SheetData {
            name: "Sales Data".to_string(),
            rows: vec![
                vec!["Product".into(), "Q1".into(), "Q2".into(), "Q3".into(), "Q4".into()],
                vec!["Apples".into(), "100".into(), "150".into(), "200".into(), "180".into()],
                vec!["Bananas".into(), "80".into(), "90".into(), "110".into(), "95".into()],
            ],
        }];
        for c in chunk_excel(&sheets, ChunkerConfig::default()) {
            let ExtractionParams::Excel { sheet, start_row, end_row, start_col, end_col } =
                &c.extraction_params
            else {
                panic!("expected Excel params");
            };
            let reextracted = crate::parsers::xlsx::extract_range(
                &sheets,
                sheet,
                *start_row,
                *end_row,
                start_col,
                end_col,
                &c.extraction_params,
            )
            .unwrap();
            assert_eq!(reextracted, c.content);
        }
    }
}
