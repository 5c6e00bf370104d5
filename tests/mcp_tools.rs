//! Integration tests for the MCP tool surface, exercised both as direct
//! tool calls and through the full JSON-RPC `tools/call` envelope.

mod helpers;

use helpers::TestHarness;
use serde_json::json;

#[test]
fn initialize_negotiates_protocol_version_and_capabilities() {
    let mut h = TestHarness::from_fixture("basic");
    let resp = h.initialize();

    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(resp["result"]["serverInfo"]["name"], "folder-mcp-test");
    assert!(resp["result"]["capabilities"]["tools"].is_object());
}

#[test]
fn get_server_info_reports_embedder_identity() {
    let h = TestHarness::from_fixture("basic");
    let resp = h.call_tool("get_server_info", json!({}));
    assert_eq!(resp["status"]["code"], "ok");
    assert_eq!(resp["data"]["embedding_model"], "mock");
    assert_eq!(resp["data"]["embedding_dimension"], 8);
}

#[test]
fn list_documents_finds_every_fixture_file() {
    let h = TestHarness::from_fixture("basic");
    let resp = h.call_tool("list_documents", json!({}));
    assert_eq!(resp["status"]["code"], "ok");
    let paths: Vec<&str> =
        resp["data"]["documents"].as_array().unwrap().iter().map(|d| d["path"].as_str().unwrap()).collect();
    assert!(paths.contains(&"notes/project-overview.md"));
    assert!(paths.contains(&"notes/meeting-log.txt"));
    assert!(paths.contains(&"reports/quarterly-costs.csv"));
    assert_eq!(resp["data"]["total"], 3);
}

#[test]
fn list_documents_paginates_with_a_continuation_token() {
    let h = TestHarness::from_fixture("basic");
    let first = h.call_tool("list_documents", json!({ "limit": 1 }));
    assert_eq!(first["data"]["documents"].as_array().unwrap().len(), 1);
    let token = first["data"]["continuation_token"].as_str().expect("expected a token");

    let second = h.call_tool("list_documents", json!({ "limit": 1, "continuation_token": token }));
    let first_path = first["data"]["documents"][0]["path"].as_str().unwrap();
    let second_path = second["data"]["documents"][0]["path"].as_str().unwrap();
    assert_ne!(first_path, second_path, "pagination must not repeat an entry across pages");
}

#[test]
fn list_folders_enumerates_top_level_subfolders_excluding_hidden() {
    let h = TestHarness::from_fixture("nested");
    let resp = h.call_tool("list_folders", json!({}));
    assert_eq!(resp["status"]["code"], "ok");
    let folders: Vec<&str> =
        resp["data"]["folders"].as_array().unwrap().iter().map(|f| f.as_str().unwrap()).collect();
    assert_eq!(folders, vec!["Engineering", "Finance"]);
}

#[test]
fn list_documents_with_a_folder_returns_only_its_direct_children() {
    let h = TestHarness::from_fixture("nested");
    let resp = h.call_tool("list_documents", json!({ "folder": "Finance/2024/Q4" }));
    assert_eq!(resp["status"]["code"], "ok");
    let docs = resp["data"]["documents"].as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["path"], "Finance/2024/Q4/Q4_Forecast.csv");
    assert_eq!(docs[0]["name"], "Q4_Forecast.csv");
}

#[test]
fn search_can_be_scoped_to_a_folder_and_document_type() {
    let h = TestHarness::from_fixture("nested");
    let resp = h.call_tool(
        "search",
        json!({ "query": "forecast spend", "folder": "Engineering", "document_types": ["csv"] }),
    );
    assert_eq!(resp["status"]["code"], "ok");
    assert!(resp["data"]["results"].as_array().unwrap().is_empty(), "Engineering has no csv files");
}

#[test]
fn list_documents_pagination_matches_spec_scenario_six() {
    let h = TestHarness::from_fixture("pagination");
    let mut token: Option<String> = None;
    let mut sizes = Vec::new();
    let mut all_paths = Vec::new();
    loop {
        let args = match &token {
            Some(t) => json!({ "limit": 4, "continuation_token": t }),
            None => json!({ "limit": 4 }),
        };
        let resp = h.call_tool("list_documents", args);
        let docs = resp["data"]["documents"].as_array().unwrap();
        sizes.push(docs.len());
        all_paths.extend(docs.iter().map(|d| d["path"].as_str().unwrap().to_string()));
        token = resp["data"]["continuation_token"].as_str().map(|s| s.to_string());
        if token.is_none() {
            break;
        }
    }
    assert_eq!(sizes, vec![4, 4, 2]);
    let mut sorted = all_paths.clone();
    sorted.sort();
    assert_eq!(all_paths, sorted, "pages concatenate in name-sorted order");
    assert_eq!(all_paths.len(), 10);
}

#[test]
fn get_document_outline_lists_chunks_with_key_phrases() {
    let h = TestHarness::from_fixture("basic");
    let resp = h.call_tool("get_document_outline", json!({ "path": "notes/project-overview.md" }));
    assert_eq!(resp["status"]["code"], "ok");
    assert!(resp["data"]["chunk_count"].as_u64().unwrap() >= 1);
    assert!(resp["data"]["outline"][0]["extraction_params"].is_object());
}

#[test]
fn get_document_outline_unknown_path_is_not_found() {
    let h = TestHarness::from_fixture("basic");
    let resp = h.call_tool("get_document_outline", json!({ "path": "nope.md" }));
    assert_eq!(resp["status"]["code"], "not_found");
    assert!(resp["data"].is_null());
}

#[test]
fn get_document_data_respects_a_tight_token_budget() {
    let h = TestHarness::from_fixture("basic");
    let full = h.call_tool("get_document_data", json!({ "path": "notes/meeting-log.txt" }));
    assert_eq!(full["status"]["code"], "ok");

    let tight =
        h.call_tool("get_document_data", json!({ "path": "notes/meeting-log.txt", "token_budget": 1 }));
    assert_eq!(tight["status"]["code"], "partial_success");
    assert_eq!(tight["data"]["chunks"].as_array().unwrap().len(), 1, "must keep at least one chunk");
}

#[test]
fn get_chunks_reproduces_source_content_via_get_sheet_data() {
    let h = TestHarness::from_fixture("basic");
    let chunks = h.call_tool("get_chunks", json!({ "path": "reports/quarterly-costs.csv" }));
    assert_eq!(chunks["status"]["code"], "ok");
    let first_chunk = &chunks["data"]["chunks"][0];
    let params = &first_chunk["extraction_params"];
    let range = format!(
        "{}{}:{}{}",
        params["start_col"].as_str().unwrap(),
        params["start_row"].as_u64().unwrap(),
        params["end_col"].as_str().unwrap(),
        params["end_row"].as_u64().unwrap(),
    );

    let resp = h.call_tool(
        "get_sheet_data",
        json!({ "path": "reports/quarterly-costs.csv", "sheet": params["sheet"], "range": range }),
    );
    assert_eq!(resp["status"]["code"], "ok");
    assert_eq!(resp["data"]["content"], first_chunk["content"]);
}

#[test]
fn get_sheet_data_extracts_the_requested_cell_range() {
    let h = TestHarness::from_fixture("basic");
    let resp = h.call_tool(
        "get_sheet_data",
        json!({ "path": "reports/quarterly-costs.csv", "sheet": "Sheet1", "range": "B2:D2" }),
    );
    assert_eq!(resp["status"]["code"], "ok");
    assert_eq!(resp["data"]["content"], "April,18200,20000");
}

#[test]
fn search_finds_the_relevant_document() {
    let h = TestHarness::from_fixture("basic");
    let resp = h.call_tool("search", json!({ "query": "reconciliation job rewrite", "top_k": 5 }));
    assert_eq!(resp["status"]["code"], "ok");
    let results = resp["data"]["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().any(|r| r["document_path"] == "notes/meeting-log.txt"));
}

#[test]
fn get_embedding_returns_a_vector_of_the_configured_dimension() {
    let h = TestHarness::from_fixture("basic");
    let resp =
        h.call_tool("get_embedding", json!({ "path": "notes/project-overview.md", "chunk_index": 0 }));
    assert_eq!(resp["status"]["code"], "ok");
    assert_eq!(resp["data"]["dimension"], 8);
    assert_eq!(resp["data"]["vector"].as_array().unwrap().len(), 8);
}

#[test]
fn refresh_document_marks_an_existing_file_for_reindex() {
    let h = TestHarness::from_fixture("basic");
    let resp = h.call_tool("refresh_document", json!({ "path": "notes/meeting-log.txt" }));
    assert_eq!(resp["status"]["code"], "ok");
    assert_eq!(resp["data"]["action"], "marked_for_reindex");

    let status = h.call_tool("get_status", json!({}));
    assert_eq!(status["data"]["store"]["documents_needing_reindex"], 1);
}

#[test]
fn refresh_document_deletes_a_file_that_no_longer_exists_on_disk() {
    let h = TestHarness::from_fixture("basic");
    let resp = h.call_tool("refresh_document", json!({ "path": "notes/does-not-exist.txt" }));
    assert_eq!(resp["status"]["code"], "ok");
    assert_eq!(resp["data"]["action"], "deleted");
    assert_eq!(resp["data"]["found"], false);
}

#[test]
fn unknown_tool_name_is_an_invalid_argument_error() {
    let h = TestHarness::from_fixture("basic");
    let resp = h.call_tool("not_a_real_tool", json!({}));
    assert_eq!(resp["status"]["code"], "invalid_argument");
}

#[test]
fn tools_call_rpc_envelope_wraps_the_same_status_body() {
    let mut h = TestHarness::from_fixture("basic");
    let (body, is_error) = h.call_tool_via_rpc("get_server_info", json!({}));
    assert!(!is_error);
    assert_eq!(body["status"]["code"], "ok");
    assert_eq!(body["data"]["embedding_model"], "mock");
}

#[test]
fn tools_call_rpc_envelope_marks_errors() {
    let mut h = TestHarness::from_fixture("basic");
    let (body, is_error) = h.call_tool_via_rpc("get_document_outline", json!({ "path": "nope.md" }));
    assert!(is_error);
    assert_eq!(body["status"]["code"], "not_found");
}
