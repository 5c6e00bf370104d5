//! JSON-RPC / MCP stdio transport (C9).
//!
//! Newline-delimited JSON-RPC 2.0 over stdin/stdout: notifications get no
//! response, `tools/call` wraps the tool envelope into MCP content blocks,
//! and everything ahead of `initialize` gets `-32002`.
//! Tracing stays on stderr/file (`logging.rs`); stdout carries only
//! JSON-RPC frames.

use crate::tools::{self, ToolContext};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Per-connection session state. A stdio server only ever has one, but
/// keeping it as an explicit value (rather than a global) matches the
/// teacher's `Option<SessionState>` thread-through and leaves room for a
/// future multi-client transport.
#[derive(Default)]
pub struct Session {
    pub initialized: bool,
    pub request_count: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}

fn tool_definitions() -> Value {
    json!([
        {
            "name": "get_server_info",
            "description": "Report server name, version, and the active embedding model.",
            "annotations": { "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": { "type": "object", "properties": {}, "required": [] }
        },
        {
            "name": "list_folders",
            "description": "List the top-level subfolders of the indexed root.",
            "annotations": { "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": {
                "type": "object",
                "properties": {
                    "max_tokens": { "type": "integer", "description": "Token budget for this page" },
                    "continuation_token": { "type": "string", "description": "Token from a previous page" }
                },
                "required": []
            }
        },
        {
            "name": "list_documents",
            "description": "List indexed documents under a folder, non-recursively, paginated.",
            "annotations": { "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": {
                "type": "object",
                "properties": {
                    "folder": { "type": "string", "description": "Folder path to list direct children of; root if omitted" },
                    "limit": { "type": "integer", "description": "Maximum documents per page" },
                    "continuation_token": { "type": "string", "description": "Token from a previous page" }
                },
                "required": []
            }
        },
        {
            "name": "get_document_outline",
            "description": "Get a document's chunk outline: indexes, token counts, and key phrases.",
            "annotations": { "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": {
                "type": "object",
                "properties": { "path": { "type": "string" } },
                "required": ["path"]
            }
        },
        {
            "name": "get_document_data",
            "description": "Get a document's chunk contents, truncated to a token budget.",
            "annotations": { "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "token_budget": { "type": "integer" }
                },
                "required": ["path"]
            }
        },
        {
            "name": "get_sheet_data",
            "description": "Extract a cell range from a spreadsheet, read directly from the source file.",
            "annotations": { "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "sheet": { "type": "string", "description": "Sheet name; defaults to the first sheet" },
                    "range": { "type": "string", "description": "A1-style range like 'B2:D3'; defaults to the whole sheet" }
                },
                "required": ["path"]
            }
        },
        {
            "name": "get_slides",
            "description": "Get slide text and speaker notes from a presentation, read directly from the source file.",
            "annotations": { "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "slide_range": { "type": "string", "description": "'N' or 'N-M', 1-based; defaults to every slide" }
                },
                "required": ["path"]
            }
        },
        {
            "name": "get_pages",
            "description": "Get page text from a paginated document, read directly from the source file.",
            "annotations": { "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "page_range": { "type": "string", "description": "'N' or 'N-M', 1-based; defaults to every page" }
                },
                "required": ["path"]
            }
        },
        {
            "name": "get_chunks",
            "description": "List a document's chunks with full content, paginated.",
            "annotations": { "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "limit": { "type": "integer" },
                    "continuation_token": { "type": "string" }
                },
                "required": ["path"]
            }
        },
        {
            "name": "search",
            "description": "Semantic k-NN search over indexed chunks.",
            "annotations": { "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "top_k": { "type": "integer" },
                    "min_similarity": { "type": "number" },
                    "folder": { "type": "string", "description": "Restrict results to this folder and its subfolders" },
                    "document_types": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Restrict results to these file extensions"
                    }
                },
                "required": ["query"]
            }
        },
        {
            "name": "get_embedding",
            "description": "Fetch the raw embedding vector for a chunk.",
            "annotations": { "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": {
                "type": "object",
                "properties": { "path": { "type": "string" }, "chunk_index": { "type": "integer" } },
                "required": ["path"]
            }
        },
        {
            "name": "get_status",
            "description": "Report indexing progress and vector store statistics.",
            "annotations": { "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": { "type": "object", "properties": {}, "required": [] }
        },
        {
            "name": "refresh_document",
            "description": "Mark a document for reindexing, or remove it if it no longer exists on disk.",
            "annotations": { "readOnlyHint": false, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false },
            "inputSchema": {
                "type": "object",
                "properties": { "path": { "type": "string" } },
                "required": ["path"]
            }
        }
    ])
}

/// Handle one parsed JSON-RPC message. Returns `None` for notifications
/// (no `id`, or a `notifications/*` method) since those get no response.
pub fn dispatch_jsonrpc(ctx: &ToolContext, msg: &Value, session: &mut Session) -> Option<Value> {
    let method = msg["method"].as_str().unwrap_or("");
    let id = msg.get("id").cloned();

    if id.is_none() || method.starts_with("notifications/") {
        return None;
    }

    let response = match method {
        "initialize" => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false },
                    "prompts": { "listChanged": false },
                    "resources": { "listChanged": false }
                },
                "serverInfo": { "name": ctx.server_name, "version": ctx.server_version },
                "instructions": "Index and search a local folder of documents. Start with `search` for semantic discovery, `list_documents`/`get_document_outline` to browse, and `get_chunks`/`get_document_data` to read."
            }
        }),
        "tools/list" => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": { "tools": tool_definitions() }
        }),
        "tools/call" => {
            let tool_name = msg["params"]["name"].as_str().unwrap_or("");
            let arguments = msg["params"].get("arguments").cloned().unwrap_or_else(|| json!({}));
            let request_id = uuid::Uuid::new_v4();

            let span = tracing::info_span!("tool_call", %request_id, tool = tool_name);
            let _enter = span.enter();

            let result = tools::dispatch(tool_name, &arguments, ctx);
            let is_error = result.status.code != "ok" && result.status.code != "partial_success";
            let content_text = serde_json::to_string(&result.to_json())
                .unwrap_or_else(|_| result.status.message.clone());

            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "content": [{ "type": "text", "text": content_text }],
                    "isError": is_error
                }
            })
        }
        "ping" => json!({ "jsonrpc": "2.0", "id": id, "result": {} }),
        "prompts/list" => json!({ "jsonrpc": "2.0", "id": id, "result": { "prompts": [] } }),
        "prompts/get" => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32602, "message": "no prompts are registered" }
        }),
        "resources/list" => json!({ "jsonrpc": "2.0", "id": id, "result": { "resources": [] } }),
        "resources/read" => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32602, "message": "no resources are registered" }
        }),
        other => {
            tracing::warn!(method = other, "unknown json-rpc method");
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": "Method not found" }
            })
        }
    };

    session.request_count += 1;
    Some(response)
}

/// Run the stdio server loop: read newline-delimited JSON-RPC from stdin,
/// write newline-delimited JSON-RPC to stdout. Logging never touches
/// stdout — it's reserved for protocol frames.
pub fn run_stdio(ctx: Arc<ToolContext>) {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = Session::new();

    tracing::info!(root = %ctx.root.display(), "mcp server ready");

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let msg: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(_) => {
                write_response(&stdout, &json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": { "code": -32700, "message": "Parse error" }
                }));
                continue;
            }
        };

        let method = msg["method"].as_str().unwrap_or("");
        if method == "notifications/initialized" || method == "notifications/cancelled" {
            continue;
        }

        if !session.initialized && method != "initialize" && method != "ping" {
            if let Some(id) = msg.get("id").cloned() {
                write_response(&stdout, &json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32002, "message": "Server not initialized. Send 'initialize' first." }
                }));
            }
            continue;
        }

        if let Some(response) = dispatch_jsonrpc(&ctx, &msg, &mut session) {
            if method == "initialize" {
                session.initialized = true;
            }
            write_response(&stdout, &response);
        }
    }
}

fn write_response(stdout: &io::Stdout, value: &Value) {
    let mut out = stdout.lock();
    let _ = writeln!(out, "{}", value);
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::indexer::{IndexerControl, IndexingSession};
    use crate::store::VectorStore;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn test_ctx() -> ToolContext {
        ToolContext {
            root: PathBuf::from("."),
            store: Mutex::new(VectorStore::open_in_memory("mock", 8).unwrap()),
            embedder: Arc::new(MockEmbeddingProvider::new(8)),
            session: Arc::new(Mutex::new(IndexingSession::default())),
            control: Arc::new(IndexerControl::default()),
            server_name: "folder-mcp",
            server_version: "0.1.0",
        }
    }

    #[test]
    fn notifications_produce_no_response() {
        let ctx = test_ctx();
        let mut session = Session::new();
        let msg = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
        assert!(dispatch_jsonrpc(&ctx, &msg, &mut session).is_none());
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let ctx = test_ctx();
        let mut session = Session::new();
        let msg = json!({ "jsonrpc": "2.0", "id": 1, "method": "nonsense" });
        let response = dispatch_jsonrpc(&ctx, &msg, &mut session).unwrap();
        assert_eq!(response["error"]["code"], -32601);
    }

    #[test]
    fn tools_call_wraps_status_envelope_as_text_content() {
        let ctx = test_ctx();
        let mut session = Session::new();
        let msg = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": "get_server_info", "arguments": {} }
        });
        let response = dispatch_jsonrpc(&ctx, &msg, &mut session).unwrap();
        assert_eq!(response["result"]["isError"], false);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("\"ok\""));
    }

    #[test]
    fn tools_call_with_unknown_tool_is_marked_error() {
        let ctx = test_ctx();
        let mut session = Session::new();
        let msg = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": "no_such_tool", "arguments": {} }
        });
        let response = dispatch_jsonrpc(&ctx, &msg, &mut session).unwrap();
        assert_eq!(response["result"]["isError"], true);
    }
}
