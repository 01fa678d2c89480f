//! CLI command implementations

use std::path::PathBuf;

use anyhow::Context;
use ignore::WalkBuilder;

use burrow_index::DocumentStore;
use burrow_server::{BurrowServer, ServerConfig};

pub async fn serve(
    config_dir: PathBuf,
    host: String,
    port: u16,
    stdio: bool,
) -> anyhow::Result<()> {
    let config = ServerConfig {
        host: host.clone(),
        port,
        cache_dir: config_dir,
    };
    let server = BurrowServer::new(&config)?;

    if stdio {
        server.serve_stdio().await
    } else {
        tracing::info!("Starting Burrow server on {}:{}", host, port);
        server.serve_tcp(&host, port).await
    }
}

/// One-shot index of a folder, for smoke-testing a workspace outside an
/// editor session.
pub async fn index(folder: PathBuf) -> anyhow::Result<()> {
    tracing::info!("Indexing workspace: {}", folder.display());

    let store = DocumentStore::new();
    let mut failed = 0usize;
    for entry in WalkBuilder::new(&folder).build().flatten() {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "go") {
            continue;
        }
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if let Err(e) = store.open(path.to_path_buf(), text) {
            tracing::warn!("{}", e);
            failed += 1;
        }
    }

    tracing::info!("Indexed {} files ({} failed to parse)", store.len(), failed);
    Ok(())
}

/// Default package cache location: `~/.cache/burrow`.
pub fn default_config_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .context("cannot determine home directory")?;
    Ok(PathBuf::from(home).join(".cache").join("burrow"))
}
