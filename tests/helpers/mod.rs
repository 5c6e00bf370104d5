//! Integration test harness: builds a [`folder_mcp::tools::ToolContext`] over
//! a copied fixture tree, indexes it once with the mock embedder, and
//! exposes both the tool-call surface and the raw JSON-RPC surface.

pub mod fixtures;

use folder_mcp::embedding::{EmbeddingProvider, MockEmbeddingProvider};
use folder_mcp::indexer::{Indexer, IndexerConfig, IndexerControl, IndexingSession};
use folder_mcp::protocol::{self, Session};
use folder_mcp::store::VectorStore;
use folder_mcp::tools::{self, ToolContext};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub struct TestHarness {
    pub ctx: Arc<ToolContext>,
    pub session: Session,
    _temp_dir: TempDir,
}

impl TestHarness {
    /// Copy a named fixture tree into a temp dir and run one indexing pass
    /// over it with an 8-dimensional mock embedder.
    pub fn from_fixture(name: &str) -> Self {
        let fixture_src =
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
        assert!(fixture_src.exists(), "fixture '{name}' not found at {}", fixture_src.display());

        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        fixtures::copy_dir_recursive(&fixture_src, &root);

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new(8));
        let mut store = VectorStore::open_in_memory(embedder.model_id(), embedder.dimension())
            .expect("failed to open in-memory store");

        let indexer = Indexer::new(root.clone(), IndexerConfig::default(), Default::default());
        let control = IndexerControl::default();
        let session = Mutex::new(IndexingSession::default());
        indexer
            .run(&mut store, embedder.as_ref(), &control, &session)
            .expect("initial indexing pass failed");

        let ctx = Arc::new(ToolContext {
            root,
            store: Mutex::new(store),
            embedder,
            session: Arc::new(session),
            control: Arc::new(control),
            server_name: "folder-mcp-test",
            server_version: "0.0.0-test",
        });

        TestHarness { ctx, session: Session::new(), _temp_dir: temp_dir }
    }

    /// Call a tool directly (bypassing the JSON-RPC envelope) and return its
    /// `{status, data}` response body.
    pub fn call_tool(&self, name: &str, args: Value) -> Value {
        tools::dispatch(name, &args, &self.ctx).to_json()
    }

    /// Send a raw JSON-RPC message through the MCP dispatcher.
    pub fn dispatch(&mut self, msg: Value) -> Option<Value> {
        protocol::dispatch_jsonrpc(&self.ctx, &msg, &mut self.session)
    }

    pub fn initialize(&mut self) -> Value {
        let msg = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "0.0.0" }
            }
        });
        self.dispatch(msg).expect("expected an initialize response")
    }

    /// Call a tool through the full JSON-RPC `tools/call` envelope and
    /// return `(parsed status/data body, is_error)`.
    pub fn call_tool_via_rpc(&mut self, name: &str, args: Value) -> (Value, bool) {
        let msg = json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": { "name": name, "arguments": args }
        });
        let resp = self.dispatch(msg).expect("expected a tools/call response");
        let result = &resp["result"];
        let is_error = result["isError"].as_bool().unwrap_or(false);
        let text = result["content"][0]["text"].as_str().unwrap_or("null");
        let body: Value = serde_json::from_str(text).expect("tool response was not valid JSON");
        (body, is_error)
    }
}
