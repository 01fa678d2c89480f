//! Integration tests for Burrow
//!
//! These tests drive the full server stack through the JSON-RPC router,
//! the way an editor session would.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;

use burrow_cache::PackageStore;
use burrow_server::router::handle_line;
use burrow_server::ServerState;

const MAIN_GO: &str = "package main\n\nimport \"fmt\"\n\nfunc add(x int, y int) int {\n\tz := x + y\n\treturn z\n}\n";

fn session() -> (Arc<ServerState>, UnboundedSender<String>) {
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    (Arc::new(ServerState::new(PackageStore::in_memory())), tx)
}

async fn send(
    state: &Arc<ServerState>,
    tx: &UnboundedSender<String>,
    msg: Value,
) -> Option<Value> {
    let line = serde_json::to_string(&msg).unwrap();
    handle_line(state, tx, &line)
        .await
        .map(|resp| serde_json::from_str(&resp).unwrap())
}

fn completion_request(id: u64, uri: &str, line: u32, character: u32) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "textDocument/completion",
        "params": {
            "textDocument": { "uri": uri },
            "position": { "line": line, "character": character }
        }
    })
}

fn labels_of(response: &Value) -> Vec<String> {
    response["result"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["label"].as_str().unwrap().to_string())
        .collect()
}

/// Full editor session: open, complete, break the file, complete against
/// the retained index, fix the file, complete against the fresh one.
#[tokio::test]
async fn test_open_complete_stale_recover_flow() {
    let (state, tx) = session();
    let uri = "file:///ws/main.go";

    let open = json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didOpen",
        "params": { "textDocument": { "uri": uri, "text": MAIN_GO } }
    });
    assert!(send(&state, &tx, open).await.is_none());

    // Inside the function body: locals, globals, and keywords.
    let response = send(&state, &tx, completion_request(1, uri, 6, 1))
        .await
        .unwrap();
    let labels = labels_of(&response);
    assert!(labels.contains(&"add".to_string()));
    assert!(labels.contains(&"z".to_string()));
    assert!(labels.contains(&"func".to_string()));

    // An edit that no longer parses. The notification produces no
    // response; the document goes stale but keeps serving.
    let broken = MAIN_GO.replace("func add", "func add((");
    let change = json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didChange",
        "params": {
            "textDocument": { "uri": uri },
            "contentChanges": [{ "text": broken }]
        }
    });
    assert!(send(&state, &tx, change).await.is_none());

    let response = send(&state, &tx, completion_request(2, uri, 6, 1))
        .await
        .unwrap();
    let labels = labels_of(&response);
    assert!(
        labels.contains(&"add".to_string()),
        "stale document still serves its last valid symbols: {labels:?}"
    );

    // A good edit replaces the stale snapshot wholesale.
    let fixed = MAIN_GO.replace("func add", "func sum");
    let change = json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didChange",
        "params": {
            "textDocument": { "uri": uri },
            "contentChanges": [{ "text": fixed }]
        }
    });
    assert!(send(&state, &tx, change).await.is_none());

    let response = send(&state, &tx, completion_request(3, uri, 6, 1))
        .await
        .unwrap();
    let labels = labels_of(&response);
    assert!(labels.contains(&"sum".to_string()));
    assert!(!labels.contains(&"add".to_string()));
}

/// Initialize against a real workspace folder on disk, then complete in
/// one of the files it indexed.
#[tokio::test]
async fn test_initialize_then_complete_workspace_file() {
    let (state, tx) = session();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("go.mod"),
        "module example.com/demo\n\ngo 1.21\n",
    )
    .unwrap();
    let main_path = dir.path().join("main.go");
    std::fs::write(&main_path, MAIN_GO).unwrap();

    let init = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "clientInfo": { "name": "integration", "version": "0" },
            "workspaceFolders": [
                { "uri": dir.path().display().to_string(), "name": "demo" }
            ]
        }
    });
    let response = send(&state, &tx, init).await.unwrap();
    assert_eq!(response["result"]["serverInfo"]["name"], "burrow");
    assert!(state.packages.get("example.com/demo", "").is_some());

    let uri = main_path.display().to_string();
    let response = send(&state, &tx, completion_request(2, &uri, 6, 1))
        .await
        .unwrap();
    assert!(labels_of(&response).contains(&"add".to_string()));
}

/// The package cache survives a server restart.
#[tokio::test]
async fn test_package_cache_persists_across_restarts() {
    let cache_dir = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    std::fs::write(
        workspace.path().join("go.mod"),
        "module example.com/persisted\n",
    )
    .unwrap();

    {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let state = Arc::new(ServerState::new(
            PackageStore::open(cache_dir.path()).unwrap(),
        ));
        let init = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "workspaceFolders": [
                    { "uri": workspace.path().display().to_string(), "name": "p" }
                ]
            }
        });
        assert!(send(&state, &tx, init).await.is_some());
    }

    let reopened = PackageStore::open(cache_dir.path()).unwrap();
    assert!(reopened.get("example.com/persisted", "").is_some());
}
