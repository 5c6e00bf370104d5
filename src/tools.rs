//! Tool Endpoint Router (C8).
//!
//! Implements the fixed set of MCP tools this server exposes. Each handler
//! returns a `ToolResult`, the `{status, data}` envelope the JSON-RPC layer
//! (`protocol.rs`) wraps into a `tools/call` response — grounded on the
//! teacher's `handle_tool_call` returning `(text, is_error)` for
//! `dispatch_jsonrpc` to wrap, generalized here into a typed envelope and a
//! JSON payload instead of a single text blob.

use crate::embedding::EmbeddingProvider;
use crate::error::{CoreError, CoreResult};
use crate::indexer::{IndexerControl, IndexingSession};
use crate::store::VectorStore;
use crate::tokenizer::estimate_tokens;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Default page size and token budget for tools that paginate or truncate.
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_TOKEN_BUDGET: usize = 8_000;

pub struct ToolContext {
    pub root: PathBuf,
    pub store: Mutex<VectorStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub session: Arc<Mutex<IndexingSession>>,
    pub control: Arc<IndexerControl>,
    pub server_name: &'static str,
    pub server_version: &'static str,
}

#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub code: &'static str,
    pub message: String,
}

pub struct ToolResult {
    pub status: ToolStatus,
    pub data: Option<Value>,
}

impl ToolResult {
    fn ok(data: Value) -> Self {
        Self { status: ToolStatus { code: "ok", message: "ok".to_string() }, data: Some(data) }
    }

    fn partial(data: Value, message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus { code: "partial_success", message: message.into() },
            data: Some(data),
        }
    }

    fn err(err: &CoreError) -> Self {
        Self { status: ToolStatus { code: err.code(), message: err.to_string() }, data: None }
    }

    pub fn to_json(&self) -> Value {
        let mut envelope = json!({
            "status": { "code": self.status.code, "message": self.status.message }
        });
        if let Some(data) = &self.data {
            envelope["data"] = data.clone();
        }
        envelope
    }
}

/// Opaque pagination token: a page's next starting offset, rendered as hex
/// so callers can't assume decimal formatting but any monotonically
/// increasing integer works — it's never interpreted, only round-tripped.
fn encode_token(offset: usize) -> String {
    format!("{offset:x}")
}

fn decode_token(token: &str) -> CoreResult<usize> {
    usize::from_str_radix(token, 16).map_err(|_| CoreError::InvalidArgument {
        field: "continuation_token".to_string(),
        reason: format!("not a valid continuation token: '{token}'"),
    })
}

fn paginate<T: Clone>(items: &[T], offset: usize, limit: usize) -> (Vec<T>, Option<String>) {
    let page: Vec<T> = items.iter().skip(offset).take(limit).cloned().collect();
    let next_offset = offset + page.len();
    let next_token = if next_offset < items.len() { Some(encode_token(next_offset)) } else { None };
    (page, next_token)
}

/// Truncate a list of `(tokens, json_value)` pairs to fit a token budget,
/// always keeping whole entries — never cutting a chunk in half.
fn truncate_to_budget(entries: Vec<(usize, Value)>, budget: usize) -> (Vec<Value>, bool) {
    let mut used = 0usize;
    let mut out = Vec::new();
    let mut truncated = false;
    for (tokens, value) in entries {
        if used + tokens > budget && !out.is_empty() {
            truncated = true;
            break;
        }
        used += tokens;
        out.push(value);
    }
    (out, truncated)
}

pub fn dispatch(name: &str, args: &Value, ctx: &ToolContext) -> ToolResult {
    let result = match name {
        "get_server_info" => get_server_info(ctx),
        "list_folders" => list_folders(args, ctx),
        "list_documents" => list_documents(args, ctx),
        "get_document_outline" => get_document_outline(args, ctx),
        "get_document_data" => get_document_data(args, ctx),
        "get_sheet_data" => get_sheet_data(args, ctx),
        "get_slides" => get_slides(args, ctx),
        "get_pages" => get_pages(args, ctx),
        "get_chunks" => get_chunks(args, ctx),
        "search" => search(args, ctx),
        "get_embedding" => get_embedding(args, ctx),
        "get_status" => get_status(ctx),
        "refresh_document" => refresh_document(args, ctx),
        other => {
            return ToolResult::err(&CoreError::InvalidArgument {
                field: "name".to_string(),
                reason: format!("unknown tool '{other}'"),
            })
        }
    };
    match result {
        Ok(r) => r,
        Err(e) => ToolResult::err(&e),
    }
}

fn required_str<'a>(args: &'a Value, field: &str) -> CoreResult<&'a str> {
    args.get(field).and_then(|v| v.as_str()).ok_or_else(|| CoreError::InvalidArgument {
        field: field.to_string(),
        reason: "missing or not a string".to_string(),
    })
}

fn optional_usize(args: &Value, field: &str, default: usize) -> usize {
    args.get(field).and_then(|v| v.as_u64()).map(|n| n as usize).unwrap_or(default)
}

fn optional_str<'a>(args: &'a Value, field: &str) -> Option<&'a str> {
    args.get(field).and_then(|v| v.as_str())
}

// ---------------------------------------------------------------------------
// get_server_info / list_folders / get_status
// ---------------------------------------------------------------------------

fn get_server_info(ctx: &ToolContext) -> CoreResult<ToolResult> {
    Ok(ToolResult::ok(json!({
        "name": ctx.server_name,
        "version": ctx.server_version,
        "embedding_model": ctx.embedder.model_id(),
        "embedding_dimension": ctx.embedder.dimension(),
    })))
}

/// Top-level subfolders of the indexed root, sorted by name. Hidden
/// directories and the `.folder-mcp` cache directory never appear.
fn list_folders(args: &Value, ctx: &ToolContext) -> CoreResult<ToolResult> {
    let offset = match optional_str(args, "continuation_token") {
        Some(t) => decode_token(t)?,
        None => 0,
    };
    let budget = optional_usize(args, "max_tokens", DEFAULT_TOKEN_BUDGET);

    let mut names: Vec<String> = std::fs::read_dir(&ctx.root)
        .map_err(|e| CoreError::io(&ctx.root, e))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();

    let entries: Vec<(usize, Value)> =
        names.iter().skip(offset).map(|name| (estimate_tokens(name), json!(name))).collect();
    let (page, truncated) = truncate_to_budget(entries, budget);
    let next_token = if truncated { Some(encode_token(offset + page.len())) } else { None };

    Ok(ToolResult::ok(json!({
        "folders": page,
        "continuation_token": next_token,
        "total": names.len(),
    })))
}

fn get_status(ctx: &ToolContext) -> CoreResult<ToolResult> {
    let session = ctx.session.lock().unwrap();
    let store = ctx.store.lock().unwrap();
    let stats = store.get_stats()?;
    Ok(ToolResult::ok(json!({
        "indexing": {
            "state": format!("{:?}", session.state),
            "total_documents": session.total_documents,
            "processed_documents": session.processed_documents,
            "added": session.added,
            "updated": session.updated,
            "removed": session.removed,
            "error_count": session.errors.len(),
        },
        "store": {
            "document_count": stats.document_count,
            "chunk_count": stats.chunk_count,
            "embedding_count": stats.embedding_count,
            "documents_needing_reindex": stats.documents_needing_reindex,
        }
    })))
}

// ---------------------------------------------------------------------------
// list_documents / get_document_outline / get_document_data
// ---------------------------------------------------------------------------

/// A document is a direct child of `folder` when its path has `folder` as a
/// prefix with exactly one path segment remaining after it. `folder == ""`
/// means the root itself.
fn is_direct_child(doc_path: &str, folder: &str) -> bool {
    let rest = if folder.is_empty() {
        doc_path
    } else {
        match doc_path.strip_prefix(folder).and_then(|r| r.strip_prefix('/')) {
            Some(rest) => rest,
            None => return false,
        }
    };
    !rest.is_empty() && !rest.contains('/')
}

fn list_documents(args: &Value, ctx: &ToolContext) -> CoreResult<ToolResult> {
    let offset = match optional_str(args, "continuation_token") {
        Some(t) => decode_token(t)?,
        None => 0,
    };
    let limit = optional_usize(args, "limit", DEFAULT_PAGE_SIZE);
    let folder = optional_str(args, "folder").map(|f| f.trim_matches('/'));

    let store = ctx.store.lock().unwrap();
    let mut docs = store.list_documents()?;
    if let Some(folder) = folder {
        docs.retain(|d| is_direct_child(&d.path, folder));
    }
    let (page, next_token) = paginate(&docs, offset, limit);

    let items: Vec<Value> = page
        .iter()
        .map(|d| {
            let name = d.path.rsplit('/').next().unwrap_or(&d.path);
            json!({
                "path": d.path,
                "name": name,
                "content_hash": d.content_hash,
                "size": d.size,
                "mtime": d.mtime,
                "needs_reindex": d.needs_reindex,
            })
        })
        .collect();

    Ok(ToolResult::ok(json!({
        "documents": items,
        "continuation_token": next_token,
        "total": docs.len(),
    })))
}

fn get_document_outline(args: &Value, ctx: &ToolContext) -> CoreResult<ToolResult> {
    let path = required_str(args, "path")?;
    let store = ctx.store.lock().unwrap();
    let doc = store.get_document(path)?.ok_or_else(|| CoreError::NotFound {
        entity: "document".to_string(),
        id: path.to_string(),
    })?;
    let chunks = store.list_chunks(path)?;

    let outline: Vec<Value> = chunks
        .iter()
        .map(|c| {
            json!({
                "chunk_index": c.chunk_index,
                "token_count": c.token_count,
                "key_phrases": c.key_phrases,
                "extraction_params": c.extraction_params,
            })
        })
        .collect();

    Ok(ToolResult::ok(json!({
        "path": doc.path,
        "content_hash": doc.content_hash,
        "chunk_count": chunks.len(),
        "outline": outline,
    })))
}

fn get_document_data(args: &Value, ctx: &ToolContext) -> CoreResult<ToolResult> {
    let path = required_str(args, "path")?;
    let budget = optional_usize(args, "token_budget", DEFAULT_TOKEN_BUDGET);

    let store = ctx.store.lock().unwrap();
    store.get_document(path)?.ok_or_else(|| CoreError::NotFound {
        entity: "document".to_string(),
        id: path.to_string(),
    })?;
    let chunks = store.list_chunks(path)?;

    let entries: Vec<(usize, Value)> = chunks
        .iter()
        .map(|c| (c.token_count, json!({ "chunk_index": c.chunk_index, "content": c.content })))
        .collect();
    let (page, truncated) = truncate_to_budget(entries, budget);

    let result = json!({ "path": path, "chunks": page });
    if truncated {
        Ok(ToolResult::partial(result, "response truncated to fit token_budget"))
    } else {
        Ok(ToolResult::ok(result))
    }
}

// ---------------------------------------------------------------------------
// Format-specific accessors — re-derive from disk via ExtractionParams
// ---------------------------------------------------------------------------

fn read_source(path: &str, ctx: &ToolContext) -> CoreResult<Vec<u8>> {
    let abs = crate::fingerprint::absolute_path(&ctx.root, path);
    std::fs::read(&abs).map_err(|e| CoreError::io(&abs, e))
}

/// Parses an A1-style range like `"B2:D3"` into (start_row, end_row,
/// start_col, end_col), 1-based rows and A1 column letters.
fn parse_a1_range(range: &str) -> CoreResult<(usize, usize, String, String)> {
    let re = regex::Regex::new(r"(?i)^([a-z]+)(\d+):([a-z]+)(\d+)$").unwrap();
    let caps = re.captures(range.trim()).ok_or_else(|| CoreError::InvalidArgument {
        field: "range".to_string(),
        reason: format!("'{range}' is not an A1-style range like 'B2:D3'"),
    })?;
    let start_row: usize = caps[2].parse().unwrap();
    let end_row: usize = caps[4].parse().unwrap();
    Ok((start_row, end_row, caps[1].to_ascii_uppercase(), caps[3].to_ascii_uppercase()))
}

/// Parses a 1-based numeric range like `"2"` or `"2-4"`.
fn parse_numeric_range(range: &str, field: &str) -> CoreResult<(usize, usize)> {
    let invalid = || CoreError::InvalidArgument {
        field: field.to_string(),
        reason: format!("'{range}' is not a range like '2' or '2-4'"),
    };
    match range.split_once('-') {
        Some((start, end)) => {
            let start: usize = start.trim().parse().map_err(|_| invalid())?;
            let end: usize = end.trim().parse().map_err(|_| invalid())?;
            Ok((start, end))
        }
        None => {
            let n: usize = range.trim().parse().map_err(|_| invalid())?;
            Ok((n, n))
        }
    }
}

fn parsed_metadata(path: &str, ctx: &ToolContext) -> CoreResult<crate::parsers::ParsedContent> {
    let abs = crate::fingerprint::absolute_path(&ctx.root, path);
    let bytes = read_source(path, ctx)?;
    crate::parsers::parse_file(&abs, &bytes)
}

fn get_sheet_data(args: &Value, ctx: &ToolContext) -> CoreResult<ToolResult> {
    let path = required_str(args, "path")?;
    let sheet_name = optional_str(args, "sheet");
    let range = optional_str(args, "range");

    let parsed = parsed_metadata(path, ctx)?;
    let sheets = match &parsed.metadata {
        crate::parsers::FormatMetadata::Excel { sheets } => sheets,
        _ => {
            return Err(CoreError::InvalidArgument {
                field: "path".to_string(),
                reason: format!("'{path}' is not a spreadsheet document"),
            })
        }
    };
    let sheet = match sheet_name {
        Some(name) => sheets.iter().find(|s| s.name == name).ok_or_else(|| CoreError::NotFound {
            entity: "sheet".to_string(),
            id: name.to_string(),
        })?,
        None => sheets
            .first()
            .ok_or_else(|| CoreError::NotFound { entity: "sheet".to_string(), id: path.to_string() })?,
    };

    let width = sheet.rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let (start_row, end_row, start_col, end_col) = match range {
        Some(r) => parse_a1_range(r)?,
        None => (
            1,
            sheet.rows.len(),
            crate::parsers::index_to_letter(0),
            crate::parsers::index_to_letter(width.saturating_sub(1)),
        ),
    };

    let params = crate::chunker::ExtractionParams::Excel {
        sheet: sheet.name.clone(),
        start_row,
        end_row,
        start_col: start_col.clone(),
        end_col: end_col.clone(),
    };
    let content =
        crate::parsers::xlsx::extract_range(sheets, &sheet.name, start_row, end_row, &start_col, &end_col, &params)?;

    Ok(ToolResult::ok(json!({
        "path": path,
        "sheet": sheet.name,
        "start_row": start_row,
        "end_row": end_row,
        "start_col": start_col,
        "end_col": end_col,
        "content": content,
    })))
}

fn get_slides(args: &Value, ctx: &ToolContext) -> CoreResult<ToolResult> {
    let path = required_str(args, "path")?;
    let slide_range = optional_str(args, "slide_range");

    let parsed = parsed_metadata(path, ctx)?;
    let slides = match &parsed.metadata {
        crate::parsers::FormatMetadata::PowerPoint { slides } => slides,
        _ => {
            return Err(CoreError::InvalidArgument {
                field: "path".to_string(),
                reason: format!("'{path}' is not a presentation document"),
            })
        }
    };
    let (start, end) = match slide_range {
        Some(r) => parse_numeric_range(r, "slide_range")?,
        None => (1, slides.len()),
    };

    let items: Vec<Value> = slides
        .iter()
        .filter(|s| s.index >= start && s.index <= end)
        .map(|s| json!({ "slide": s.index, "text": s.text, "notes": s.notes }))
        .collect();

    Ok(ToolResult::ok(json!({ "path": path, "slide_range": [start, end], "slides": items })))
}

fn get_pages(args: &Value, ctx: &ToolContext) -> CoreResult<ToolResult> {
    let path = required_str(args, "path")?;
    let page_range = optional_str(args, "page_range");

    let parsed = parsed_metadata(path, ctx)?;
    let pages = match &parsed.metadata {
        crate::parsers::FormatMetadata::Pdf { pages } => pages,
        _ => {
            return Err(CoreError::InvalidArgument {
                field: "path".to_string(),
                reason: format!("'{path}' is not a paginated document"),
            })
        }
    };
    let (start, end) = match page_range {
        Some(r) => parse_numeric_range(r, "page_range")?,
        None => (1, pages.len()),
    };
    if start == 0 || end < start || end > pages.len() {
        return Err(CoreError::InvalidArgument {
            field: "page_range".to_string(),
            reason: format!("range {start}..={end} out of bounds (len={})", pages.len()),
        });
    }

    let items: Vec<Value> = (start..=end).map(|n| json!({ "page": n, "text": pages[n - 1] })).collect();

    Ok(ToolResult::ok(json!({ "path": path, "page_range": [start, end], "pages": items })))
}

fn get_chunks(args: &Value, ctx: &ToolContext) -> CoreResult<ToolResult> {
    let path = required_str(args, "path")?;
    let offset = match optional_str(args, "continuation_token") {
        Some(t) => decode_token(t)?,
        None => 0,
    };
    let limit = optional_usize(args, "limit", DEFAULT_PAGE_SIZE);

    let store = ctx.store.lock().unwrap();
    let chunks = store.list_chunks(path)?;
    let (page, next_token) = paginate(&chunks, offset, limit);

    let items: Vec<Value> = page
        .iter()
        .map(|c| {
            json!({
                "chunk_index": c.chunk_index,
                "content": c.content,
                "token_count": c.token_count,
                "readability": c.readability,
                "key_phrases": c.key_phrases,
                "extraction_params": c.extraction_params,
            })
        })
        .collect();

    Ok(ToolResult::ok(json!({
        "path": path,
        "chunks": items,
        "continuation_token": next_token,
        "total": chunks.len(),
    })))
}

// ---------------------------------------------------------------------------
// search / get_embedding
// ---------------------------------------------------------------------------

fn search(args: &Value, ctx: &ToolContext) -> CoreResult<ToolResult> {
    let query = required_str(args, "query")?;
    let top_k = optional_usize(args, "top_k", 10);
    let min_similarity = args.get("min_similarity").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let folder = optional_str(args, "folder").map(|f| f.trim_matches('/'));
    let document_types: Option<Vec<String>> = args.get("document_types").and_then(|v| v.as_array()).map(
        |types| types.iter().filter_map(|t| t.as_str()).map(|t| t.trim_start_matches('.').to_ascii_lowercase()).collect(),
    );
    let needs_filtering = folder.is_some() || document_types.is_some();

    let query_vector = ctx.embedder.embed_query(query)?;
    let store = ctx.store.lock().unwrap();
    // A post-hoc filter can only discard candidates, so it must see every
    // match before top_k is applied, not just the first top_k of the
    // unfiltered ranking.
    let fetch_k = if needs_filtering { usize::MAX } else { top_k };
    let hits = store.search(&query_vector, fetch_k, min_similarity)?;

    let filtered = hits.into_iter().filter(|h| {
        let folder_ok = folder.map(|f| is_under_folder(&h.document_path, f)).unwrap_or(true);
        let type_ok = document_types
            .as_ref()
            .map(|types| {
                std::path::Path::new(&h.document_path)
                    .extension()
                    .map(|e| types.iter().any(|t| t == &e.to_string_lossy().to_ascii_lowercase()))
                    .unwrap_or(false)
            })
            .unwrap_or(true);
        folder_ok && type_ok
    });

    let items: Vec<Value> = filtered
        .take(top_k)
        .map(|h| {
            json!({
                "document_path": h.document_path,
                "chunk_index": h.chunk_index,
                "content": h.content,
                "similarity": h.similarity,
                "extraction_params": h.extraction_params,
            })
        })
        .collect();

    Ok(ToolResult::ok(json!({ "query": query, "results": items })))
}

/// Recursive prefix match: `folder` itself or anything nested under it.
fn is_under_folder(doc_path: &str, folder: &str) -> bool {
    doc_path == folder || doc_path.starts_with(&format!("{folder}/"))
}

fn get_embedding(args: &Value, ctx: &ToolContext) -> CoreResult<ToolResult> {
    let path = required_str(args, "path")?;
    let chunk_index = optional_usize(args, "chunk_index", 0);

    let store = ctx.store.lock().unwrap();
    let vector = store.get_chunk_embedding(path, chunk_index)?.ok_or_else(|| CoreError::NotFound {
        entity: "embedding".to_string(),
        id: format!("{path}#{chunk_index}"),
    })?;

    Ok(ToolResult::ok(json!({
        "path": path,
        "chunk_index": chunk_index,
        "dimension": vector.len(),
        "vector": vector,
    })))
}

// ---------------------------------------------------------------------------
// refresh_document
// ---------------------------------------------------------------------------

fn refresh_document(args: &Value, ctx: &ToolContext) -> CoreResult<ToolResult> {
    let path = required_str(args, "path")?;

    if ctx.control.is_cancelled() {
        return Err(CoreError::Cancelled);
    }

    let abs = crate::fingerprint::absolute_path(&ctx.root, path);
    if !abs.exists() {
        let mut store = ctx.store.lock().unwrap();
        let deleted = store.delete_document(path)?;
        return Ok(ToolResult::ok(json!({ "path": path, "action": "deleted", "found": deleted })));
    }

    let mut store = ctx.store.lock().unwrap();
    store.mark_for_reindex(path)?;
    Ok(ToolResult::ok(json!({ "path": path, "action": "marked_for_reindex" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_tokens_round_trip() {
        let items: Vec<i32> = (0..10).collect();
        let (page, token) = paginate(&items, 0, 3);
        assert_eq!(page, vec![0, 1, 2]);
        let offset = decode_token(&token.unwrap()).unwrap();
        assert_eq!(offset, 3);

        let (page2, token2) = paginate(&items, offset, 3);
        assert_eq!(page2, vec![3, 4, 5]);
        assert!(token2.is_some());

        let (last_page, last_token) = paginate(&items, 9, 3);
        assert_eq!(last_page, vec![9]);
        assert!(last_token.is_none());
    }

    #[test]
    fn truncate_never_splits_an_entry() {
        let entries = vec![
            (5, json!({"i": 0})),
            (5, json!({"i": 1})),
            (5, json!({"i": 2})),
        ];
        let (page, truncated) = truncate_to_budget(entries, 11);
        assert_eq!(page.len(), 2);
        assert!(truncated);
    }

    #[test]
    fn truncate_always_keeps_at_least_one_entry() {
        let entries = vec![(100, json!({"i": 0}))];
        let (page, truncated) = truncate_to_budget(entries, 1);
        assert_eq!(page.len(), 1);
        assert!(!truncated);
    }

    #[test]
    fn is_direct_child_rejects_grandchildren_and_siblings() {
        assert!(is_direct_child("Finance/2024/Q4/report.xlsx", "Finance/2024/Q4"));
        assert!(!is_direct_child("Finance/2024/Q4/nested/report.xlsx", "Finance/2024/Q4"));
        assert!(!is_direct_child("Finance/2024/other.xlsx", "Finance/2024/Q4"));
        assert!(is_direct_child("readme.txt", ""));
        assert!(!is_direct_child("notes/readme.txt", ""));
    }

    #[test]
    fn is_under_folder_is_recursive() {
        assert!(is_under_folder("Engineering/roadmap.md", "Engineering"));
        assert!(is_under_folder("Engineering/2024/roadmap.md", "Engineering"));
        assert!(is_under_folder("Engineering", "Engineering"));
        assert!(!is_under_folder("EngineeringTeam/x.md", "Engineering"));
    }

    #[test]
    fn parse_a1_range_accepts_standard_notation() {
        let (start_row, end_row, start_col, end_col) = parse_a1_range("B2:D3").unwrap();
        assert_eq!((start_row, end_row), (2, 3));
        assert_eq!((start_col.as_str(), end_col.as_str()), ("B", "D"));
    }

    #[test]
    fn parse_a1_range_rejects_malformed_input() {
        assert!(parse_a1_range("not-a-range").is_err());
    }

    #[test]
    fn parse_numeric_range_accepts_single_and_span() {
        assert_eq!(parse_numeric_range("3", "page_range").unwrap(), (3, 3));
        assert_eq!(parse_numeric_range("2-4", "page_range").unwrap(), (2, 4));
        assert!(parse_numeric_range("nope", "page_range").is_err());
    }
}
