//! Request and notification handlers

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use ignore::WalkBuilder;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use burrow_core::{Position, GLOBAL_BLOCK};

use crate::progress::Progress;
use crate::protocol::{
    completion_kind, server_capabilities, uri_to_path, CompletionItem, CompletionList,
    CompletionParams, DidChangeParams, DidCloseParams, DidOpenParams, DidSaveParams,
    ExecuteCommandParams, InitializeParams, SERVICE_NAME,
};
use crate::rpc::RpcError;
use crate::ServerState;

const STD_SCORE: f64 = 1.0;
const BIG_SCORE: f64 = 1.5;

/// Keywords offered on every completion, after any symbol matches.
const GO_KEYWORDS: [&str; 6] = ["import", "if", "case", "default", "func", "switch"];

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError::invalid_params(e.to_string()))
}

/// Record client info and workspace folders, index every `*.go` file in
/// each folder, and answer with the capability table.
pub async fn initialize(
    state: &Arc<ServerState>,
    outbound: &UnboundedSender<String>,
    params: Value,
) -> Result<Value, RpcError> {
    let params: InitializeParams = parse_params(params)?;

    if let Some(client) = &params.client_info {
        info!(
            "Client: {} {}",
            client.name,
            client.version.as_deref().unwrap_or("")
        );
    }
    *state.client.write().await = params.client_info.clone();

    let mut folders: Vec<PathBuf> = params
        .workspace_folders
        .unwrap_or_default()
        .iter()
        .map(|folder| uri_to_path(&folder.uri))
        .collect();
    if folders.is_empty() {
        if let Some(root) = &params.root_uri {
            folders.push(uri_to_path(root));
        }
    }

    let progress = Progress::new("initialize:burrow", SERVICE_NAME, outbound.clone());
    progress.begin("indexing workspace");

    // Bulk indexing walks the filesystem and parses every file; keep it
    // off the executor threads.
    for folder in &folders {
        let scan_state = Arc::clone(state);
        let scan_folder = folder.clone();
        let outcome =
            tokio::task::spawn_blocking(move || scan_workspace_folder(&scan_state, &scan_folder))
                .await
                .map_err(anyhow::Error::from)
                .and_then(|r| r);
        if let Err(e) = outcome {
            progress.end("workspace indexing failed");
            return Err(RpcError::internal(e.to_string()));
        }
    }
    *state.workspace_folders.write().await = folders;

    progress.end("workspace indexed");

    Ok(json!({
        "capabilities": server_capabilities(),
        "serverInfo": {
            "name": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

/// Register the folder's module with the package store, then bulk-index
/// its Go files. Per-file failures are logged and skipped; only package
/// store I/O aborts the scan.
fn scan_workspace_folder(state: &ServerState, folder: &Path) -> anyhow::Result<()> {
    let Some(module_path) = read_module_path(folder) else {
        warn!(
            "Skipping workspace folder {}: no go.mod module declaration",
            folder.display()
        );
        return Ok(());
    };
    let module_name = module_path
        .rsplit('/')
        .next()
        .unwrap_or(&module_path)
        .to_string();
    let record = state.packages.get_or_create(&module_name, &module_path, "")?;
    debug!("Workspace module: {}", record.index_name());

    for entry in WalkBuilder::new(folder).build().flatten() {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "go") {
            continue;
        }
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if let Err(e) = state.documents.open(path.to_path_buf(), text) {
            warn!("Failed to index {}: {}", path.display(), e);
        }
    }
    Ok(())
}

fn read_module_path(folder: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(folder.join("go.mod")).ok()?;
    raw.lines()
        .find_map(|line| line.strip_prefix("module "))
        .map(|rest| rest.trim().to_string())
}

pub fn shutdown(state: &Arc<ServerState>) -> Result<Value, RpcError> {
    info!("Shutdown requested");
    state.shutdown_requested.store(true, Ordering::SeqCst);
    Ok(Value::Null)
}

/// Parses run on a blocking thread; the store swap itself is cheap.
async fn open_document(
    state: &Arc<ServerState>,
    path: PathBuf,
    text: String,
) -> anyhow::Result<Arc<burrow_index::Document>> {
    let state = Arc::clone(state);
    let doc = tokio::task::spawn_blocking(move || state.documents.open(path, text)).await??;
    Ok(doc)
}

async fn change_document(
    state: &Arc<ServerState>,
    path: PathBuf,
    text: String,
) -> anyhow::Result<()> {
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.documents.change(path, text)).await??;
    Ok(())
}

pub async fn did_open(state: &Arc<ServerState>, params: Value) {
    let Ok(params) = serde_json::from_value::<DidOpenParams>(params) else {
        warn!("Malformed didOpen params");
        return;
    };
    let path = uri_to_path(&params.text_document.uri);
    match open_document(state, path.clone(), params.text_document.text).await {
        Ok(doc) => debug!(
            "Opened {} ({} lines)",
            path.display(),
            doc.file().line_count
        ),
        Err(e) => warn!("Parse failed for {}: {}", path.display(), e),
    }
}

pub async fn did_change(state: &Arc<ServerState>, params: Value) {
    let Ok(params) = serde_json::from_value::<DidChangeParams>(params) else {
        warn!("Malformed didChange params");
        return;
    };
    // Full-text sync: the last change event carries the whole document.
    let Some(change) = params.content_changes.into_iter().next_back() else {
        return;
    };
    let path = uri_to_path(&params.text_document.uri);
    if let Err(e) = change_document(state, path.clone(), change.text).await {
        warn!("Re-index failed for {}: {}", path.display(), e);
    }
}

pub fn did_close(state: &Arc<ServerState>, params: Value) {
    let Ok(params) = serde_json::from_value::<DidCloseParams>(params) else {
        warn!("Malformed didClose params");
        return;
    };
    let path = uri_to_path(&params.text_document.uri);
    if state.documents.close(&path) {
        debug!("Closed {}", path.display());
    }
}

pub async fn did_save(state: &Arc<ServerState>, params: Value) {
    let Ok(params) = serde_json::from_value::<DidSaveParams>(params) else {
        warn!("Malformed didSave params");
        return;
    };
    // Saves with included text re-index; bare saves are a no-op since
    // the store already holds the latest full text.
    if let Some(text) = params.text {
        let path = uri_to_path(&params.text_document.uri);
        if let Err(e) = change_document(state, path.clone(), text).await {
            warn!("Re-index failed for {}: {}", path.display(), e);
        }
    }
}

/// Completion against the current document snapshot. An unknown path
/// answers an empty list rather than an error.
pub fn completion(state: &Arc<ServerState>, params: Value) -> Result<Value, RpcError> {
    let params: CompletionParams = parse_params(params)?;
    let path = uri_to_path(&params.text_document.uri);

    let Some(doc) = state.documents.get(&path) else {
        debug!("Completion for unopened file {}", path.display());
        return to_result(CompletionList::new(Vec::new()));
    };

    // The cursor sits one past the word being typed.
    let pos = Position::new(
        params.position.line,
        params.position.character.saturating_sub(1),
    );
    let word = doc.cursor_word(pos);
    debug!(
        "Completion word {:?} at {}:{}",
        word, pos.line, pos.column
    );

    let mut items = if let Some((root, _member)) = word.split_once('.') {
        package_member_items(state, &doc, root)
    } else {
        scoped_symbol_items(&doc, pos, &word)
    };

    for keyword in GO_KEYWORDS {
        items.push(CompletionItem::new(
            keyword,
            completion_kind::KEYWORD,
            STD_SCORE,
        ));
    }

    to_result(CompletionList::new(items))
}

/// Dotted word: resolve the root segment through the import table, then
/// look the package up in the store. Unresolved roots contribute no
/// items.
fn package_member_items(
    state: &Arc<ServerState>,
    doc: &burrow_index::Document,
    root: &str,
) -> Vec<CompletionItem> {
    let Some(import) = doc.resolve_import(root) else {
        debug!("No import in scope for {:?}", root);
        return Vec::new();
    };

    let records = state.packages.find(&burrow_cache::PackageQuery {
        import_path: Some(import.full_path.clone()),
        ..Default::default()
    });
    records
        .iter()
        .map(|record| {
            CompletionItem::with_detail(
                &record.name,
                completion_kind::MODULE,
                record.index_name(),
                BIG_SCORE,
            )
        })
        .collect()
}

/// Plain word: flatten symbols visible from the cursor (enclosing block
/// plus `Global`), fuzzy-ranked against the typed prefix.
fn scoped_symbol_items(
    doc: &burrow_index::Document,
    pos: Position,
    word: &str,
) -> Vec<CompletionItem> {
    let symbols = doc.symbols();
    let mut blocks = vec![GLOBAL_BLOCK];
    let enclosing = doc.cursor_block(pos);
    if enclosing != GLOBAL_BLOCK {
        blocks.push(enclosing);
    }

    let mut candidates: Vec<CompletionItem> = Vec::new();
    for block in blocks {
        for import in symbols.imports_in(block) {
            candidates.push(CompletionItem::with_detail(
                &import.local_name,
                completion_kind::MODULE,
                import.full_path.clone(),
                BIG_SCORE,
            ));
        }
        for var in symbols.variables_in(block) {
            if let Some(name) = &var.name {
                candidates.push(CompletionItem::with_detail(
                    name,
                    completion_kind::VARIABLE,
                    var.type_desc.clone(),
                    BIG_SCORE,
                ));
            }
        }
        for func in symbols.functions_in(block) {
            let param_types: Vec<&str> =
                func.params.iter().map(|p| p.type_desc.as_str()).collect();
            candidates.push(CompletionItem::with_detail(
                &func.name,
                completion_kind::FUNCTION,
                format!("func {}({})", func.name, param_types.join(", ")),
                BIG_SCORE,
            ));
        }
        for ty in symbols.types_in(block) {
            candidates.push(CompletionItem::with_detail(
                &ty.name,
                completion_kind::STRUCT,
                ty.type_desc.clone(),
                BIG_SCORE,
            ));
        }
    }

    if word.is_empty() {
        return candidates;
    }

    let matcher = SkimMatcherV2::default();
    let mut ranked: Vec<(i64, CompletionItem)> = candidates
        .into_iter()
        .filter_map(|item| {
            matcher
                .fuzzy_match(&item.label, word)
                .map(|score| (score, item))
        })
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.into_iter().map(|(_, item)| item).collect()
}

/// No extra data is computed lazily; the item resolves to itself.
pub fn resolve_completion_item(params: Value) -> Result<Value, RpcError> {
    Ok(params)
}

pub fn execute_command(params: Value) -> Result<Value, RpcError> {
    let params: ExecuteCommandParams = parse_params(params)?;
    debug!(
        "Ignoring command {:?} ({} args)",
        params.command,
        params.arguments.len()
    );
    Ok(Value::Null)
}

pub fn cancel_request(params: Value) {
    // Requests complete synchronously per line, so cancellation only
    // gets logged.
    debug!("Cancel requested: {}", params);
}

fn to_result<T: serde::Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal(e.to_string()))
}
