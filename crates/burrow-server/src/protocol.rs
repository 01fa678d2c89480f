//! LSP-shaped protocol payloads
//!
//! Only the subset of the Language Server Protocol the server actually
//! speaks: document lifecycle, completion, and workspace bootstrap. All
//! positions are 0-based lines and columns.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const SERVICE_NAME: &str = "burrow";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentPosition {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceFolder {
    pub uri: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub process_id: Option<i64>,
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
    #[serde(default)]
    pub root_uri: Option<String>,
    #[serde(default)]
    pub workspace_folders: Option<Vec<WorkspaceFolder>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextDocumentIdentifier {
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentItem {
    pub uri: String,
    #[serde(default)]
    pub language_id: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidOpenParams {
    pub text_document: TextDocumentItem,
}

/// Full-text sync: only the last change event's complete text matters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChange {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidChangeParams {
    pub text_document: TextDocumentIdentifier,
    pub content_changes: Vec<ContentChange>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidCloseParams {
    pub text_document: TextDocumentIdentifier,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidSaveParams {
    pub text_document: TextDocumentIdentifier,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionParams {
    pub text_document: TextDocumentIdentifier,
    pub position: DocumentPosition,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandParams {
    pub command: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

pub mod completion_kind {
    pub const KEYWORD: u32 = 14;
    pub const VARIABLE: u32 = 6;
    pub const FUNCTION: u32 = 3;
    pub const MODULE: u32 = 9;
    pub const STRUCT: u32 = 22;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub label: String,
    pub kind: u32,
    pub detail: String,
    pub insert_text: String,
    pub sort_text: String,
}

impl CompletionItem {
    pub fn new(label: &str, kind: u32, score: f64) -> Self {
        CompletionItem {
            label: label.to_string(),
            kind,
            detail: label.to_string(),
            insert_text: label.to_string(),
            sort_text: format!("{score:.2}"),
        }
    }

    pub fn with_detail(label: &str, kind: u32, detail: String, score: f64) -> Self {
        CompletionItem {
            label: label.to_string(),
            kind,
            detail,
            insert_text: label.to_string(),
            sort_text: format!("{score:.2}"),
        }
    }
}

/// Completion lists are always marked incomplete so clients re-query as
/// the word grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionList {
    pub is_incomplete: bool,
    pub items: Vec<CompletionItem>,
}

impl CompletionList {
    pub fn new(items: Vec<CompletionItem>) -> Self {
        CompletionList {
            is_incomplete: true,
            items,
        }
    }
}

/// Capability table advertised from `initialize`. Everything not listed
/// here stays off.
pub fn server_capabilities() -> Value {
    json!({
        "textDocumentSync": {
            "openClose": true,
            "change": 1
        },
        "completionProvider": {
            "resolveProvider": true,
            "triggerCharacters": [
                "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l",
                "m", "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x",
                "y", "z", "."
            ]
        },
        "hoverProvider": {
            "workDoneProgress": true
        },
        "definitionProvider": {
            "documentSelector": [
                { "language": "go", "scheme": "file", "pattern": "*.{go,mod}" }
            ]
        },
        "documentSymbolProvider": {
            "workDoneProgress": true
        },
        "workspace": {
            "workspaceFolders": { "supported": true }
        }
    })
}

/// Strip a `file://` scheme if present and undo percent-escapes;
/// editors send both URI and plain-path forms.
pub fn uri_to_path(uri: &str) -> std::path::PathBuf {
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    if !path.contains('%') {
        return std::path::PathBuf::from(path);
    }

    // Editors escape spaces and non-ASCII path segments; decode byte by
    // byte so multi-byte sequences reassemble correctly.
    let raw = path.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' && i + 2 < raw.len() {
            if let (Some(hi), Some(lo)) = (hex_val(raw[i + 1]), hex_val(raw[i + 2])) {
                bytes.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        bytes.push(raw[i]);
        i += 1;
    }
    std::path::PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
