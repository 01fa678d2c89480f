use std::sync::Arc;
use std::sync::atomic::Ordering;

use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;

use burrow_cache::PackageStore;

use crate::router::handle_line;
use crate::rpc;
use crate::ServerState;

const MAIN_GO: &str = "package main\n\nimport \"fmt\"\n\nfunc add(x int, y int) int {\n\tz := x + y\n\treturn z\n}\n";

fn test_state() -> (Arc<ServerState>, UnboundedSender<String>) {
    // Dropping the receiver is fine: progress sends tolerate a closed
    // channel and responses come back as return values here.
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    (Arc::new(ServerState::new(PackageStore::in_memory())), tx)
}

async fn roundtrip(state: &Arc<ServerState>, tx: &UnboundedSender<String>, msg: Value) -> Option<Value> {
    let line = serde_json::to_string(&msg).unwrap();
    handle_line(state, tx, &line)
        .await
        .map(|resp| serde_json::from_str(&resp).unwrap())
}

async fn open_doc(state: &Arc<ServerState>, tx: &UnboundedSender<String>, uri: &str, text: &str) {
    let msg = json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didOpen",
        "params": {
            "textDocument": { "uri": uri, "text": text }
        }
    });
    let response = roundtrip(state, tx, msg).await;
    assert!(response.is_none(), "notifications never get responses");
}

#[tokio::test]
async fn test_unparseable_line_answers_parse_error() {
    let (state, tx) = test_state();
    let response = handle_line(&state, &tx, "{not json").await.unwrap();
    let value: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(value["error"]["code"], rpc::PARSE_ERROR);
    assert_eq!(value["id"], Value::Null);
}

#[tokio::test]
async fn test_unknown_method_answers_method_not_found() {
    let (state, tx) = test_state();
    let msg = json!({"jsonrpc": "2.0", "id": 1, "method": "textDocument/hover"});
    let response = roundtrip(&state, &tx, msg).await.unwrap();
    assert_eq!(response["error"]["code"], rpc::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_notification_is_ignored() {
    let (state, tx) = test_state();
    let msg = json!({"jsonrpc": "2.0", "method": "workspace/didChangeConfiguration"});
    assert!(roundtrip(&state, &tx, msg).await.is_none());
}

#[tokio::test]
async fn test_malformed_params_answer_invalid_params() {
    let (state, tx) = test_state();
    let msg = json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "textDocument/completion",
        "params": { "position": { "line": 0, "character": 0 } }
    });
    let response = roundtrip(&state, &tx, msg).await.unwrap();
    assert_eq!(response["error"]["code"], rpc::INVALID_PARAMS);
}

#[tokio::test]
async fn test_completion_for_unopened_file_is_empty() {
    let (state, tx) = test_state();
    let msg = json!({
        "jsonrpc": "2.0",
        "id": 4,
        "method": "textDocument/completion",
        "params": {
            "textDocument": { "uri": "file:///nowhere/main.go" },
            "position": { "line": 0, "character": 0 }
        }
    });
    let response = roundtrip(&state, &tx, msg).await.unwrap();
    assert_eq!(response["result"]["isIncomplete"], true);
    assert!(response["result"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_completion_returns_scoped_symbols_and_keywords() {
    let (state, tx) = test_state();
    open_doc(&state, &tx, "file:///ws/main.go", MAIN_GO).await;

    let msg = json!({
        "jsonrpc": "2.0",
        "id": 5,
        "method": "textDocument/completion",
        "params": {
            "textDocument": { "uri": "file:///ws/main.go" },
            "position": { "line": 6, "character": 1 }
        }
    });
    let response = roundtrip(&state, &tx, msg).await.unwrap();
    let items = response["result"]["items"].as_array().unwrap();
    let labels: Vec<&str> = items
        .iter()
        .map(|item| item["label"].as_str().unwrap())
        .collect();

    assert!(labels.contains(&"add"), "global function offered: {labels:?}");
    assert!(labels.contains(&"fmt"), "import offered: {labels:?}");
    assert!(labels.contains(&"z"), "function-local variable offered: {labels:?}");
    for keyword in ["import", "if", "case", "default", "func", "switch"] {
        assert!(labels.contains(&keyword), "keyword {keyword} offered");
    }
}

#[tokio::test]
async fn test_completion_fuzzy_filters_on_typed_word() {
    let (state, tx) = test_state();
    open_doc(&state, &tx, "file:///ws/main.go", MAIN_GO).await;

    // Cursor right after the "ad" on a line reading "\tad".
    let edited = MAIN_GO.replace("\treturn z\n", "\tad\n\treturn z\n");
    let change = json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didChange",
        "params": {
            "textDocument": { "uri": "file:///ws/main.go" },
            "contentChanges": [{ "text": edited }]
        }
    });
    assert!(roundtrip(&state, &tx, change).await.is_none());

    let msg = json!({
        "jsonrpc": "2.0",
        "id": 6,
        "method": "textDocument/completion",
        "params": {
            "textDocument": { "uri": "file:///ws/main.go" },
            "position": { "line": 6, "character": 3 }
        }
    });
    let response = roundtrip(&state, &tx, msg).await.unwrap();
    let items = response["result"]["items"].as_array().unwrap();
    let labels: Vec<&str> = items
        .iter()
        .map(|item| item["label"].as_str().unwrap())
        .collect();

    assert!(labels.contains(&"add"), "fuzzy match kept: {labels:?}");
    assert!(!labels.contains(&"fmt"), "non-match dropped: {labels:?}");
}

#[tokio::test]
async fn test_initialize_scans_workspace_and_advertises_capabilities() {
    let (state, tx) = test_state();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("go.mod"), "module example.com/demo\n\ngo 1.21\n").unwrap();
    std::fs::write(dir.path().join("main.go"), MAIN_GO).unwrap();

    let msg = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "clientInfo": { "name": "test-editor", "version": "1.0" },
            "workspaceFolders": [
                { "uri": dir.path().display().to_string(), "name": "demo" }
            ]
        }
    });
    let response = roundtrip(&state, &tx, msg).await.unwrap();

    let caps = &response["result"]["capabilities"];
    assert_eq!(caps["textDocumentSync"]["openClose"], true);
    assert_eq!(caps["completionProvider"]["resolveProvider"], true);
    let triggers = caps["completionProvider"]["triggerCharacters"]
        .as_array()
        .unwrap();
    assert_eq!(triggers.len(), 27);
    assert_eq!(response["result"]["serverInfo"]["name"], "burrow");

    assert_eq!(state.documents.len(), 1, "workspace Go file indexed");
    assert!(
        state.packages.get("example.com/demo", "").is_some(),
        "workspace module registered"
    );
    assert_eq!(state.client.read().await.as_ref().unwrap().name, "test-editor");
}

#[tokio::test]
async fn test_initialize_skips_folder_without_go_mod() {
    let (state, tx) = test_state();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.go"), MAIN_GO).unwrap();

    let msg = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "workspaceFolders": [
                { "uri": dir.path().display().to_string(), "name": "nomod" }
            ]
        }
    });
    let response = roundtrip(&state, &tx, msg).await.unwrap();
    assert!(response["error"].is_null(), "missing go.mod is not an error");
    assert_eq!(state.documents.len(), 0, "folder skipped entirely");
}

#[tokio::test]
async fn test_shutdown_sets_flag_and_answers_null() {
    let (state, tx) = test_state();
    let msg = json!({"jsonrpc": "2.0", "id": 9, "method": "shutdown"});
    let response = roundtrip(&state, &tx, msg).await.unwrap();
    assert!(response["result"].is_null());
    assert!(state.shutdown_requested.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_resolve_echoes_item() {
    let (state, tx) = test_state();
    let item = json!({"label": "add", "kind": 3, "detail": "func add(int, int)",
                      "insertText": "add", "sortText": "1.50"});
    let msg = json!({
        "jsonrpc": "2.0",
        "id": 10,
        "method": "completionItem/resolve",
        "params": item.clone()
    });
    let response = roundtrip(&state, &tx, msg).await.unwrap();
    assert_eq!(response["result"], item);
}

#[tokio::test]
async fn test_did_save_with_text_reindexes() {
    let (state, tx) = test_state();
    open_doc(&state, &tx, "file:///ws/main.go", MAIN_GO).await;

    let saved = MAIN_GO.replace("add", "saved");
    let msg = json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didSave",
        "params": {
            "textDocument": { "uri": "file:///ws/main.go" },
            "text": saved
        }
    });
    assert!(roundtrip(&state, &tx, msg).await.is_none());

    let completion = json!({
        "jsonrpc": "2.0",
        "id": 11,
        "method": "textDocument/completion",
        "params": {
            "textDocument": { "uri": "file:///ws/main.go" },
            "position": { "line": 6, "character": 1 }
        }
    });
    let response = roundtrip(&state, &tx, completion).await.unwrap();
    let labels: Vec<&str> = response["result"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["label"].as_str().unwrap())
        .collect();
    assert!(labels.contains(&"saved"), "saved text indexed: {labels:?}");
    assert!(!labels.contains(&"add"), "old symbols replaced: {labels:?}");
}

#[test]
fn test_uri_to_path_decodes_percent_escapes() {
    use crate::protocol::uri_to_path;
    use std::path::PathBuf;

    assert_eq!(
        uri_to_path("file:///ws/my%20pkg/main.go"),
        PathBuf::from("/ws/my pkg/main.go")
    );
    assert_eq!(uri_to_path("/ws/plain/main.go"), PathBuf::from("/ws/plain/main.go"));
    // Multi-byte escapes reassemble into one character.
    assert_eq!(
        uri_to_path("file:///caf%C3%A9/app.go"),
        PathBuf::from("/café/app.go")
    );
    // Malformed escapes pass through untouched.
    assert_eq!(
        uri_to_path("file:///ws/%zz/main.go"),
        PathBuf::from("/ws/%zz/main.go")
    );
}

#[tokio::test]
async fn test_did_close_removes_document() {
    let (state, tx) = test_state();
    open_doc(&state, &tx, "file:///ws/main.go", MAIN_GO).await;
    assert_eq!(state.documents.len(), 1);

    let msg = json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didClose",
        "params": { "textDocument": { "uri": "file:///ws/main.go" } }
    });
    assert!(roundtrip(&state, &tx, msg).await.is_none());
    assert!(state.documents.is_empty());
}
