//! Line-delimited JSON-RPC server for editor integration
//!
//! One JSON message per line, over TCP or stdio. Requests are routed by
//! method name; notifications never produce responses. Each connection
//! gets a reader loop plus a writer task fed by an outbound channel so
//! handlers and `$/progress` notifications share one ordered stream.

pub mod handlers;
pub mod progress;
pub mod protocol;
pub mod router;
pub mod rpc;

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use burrow_cache::PackageStore;
use burrow_index::DocumentStore;

use crate::protocol::ClientInfo;

/// Shared server state, one per process. Connections hold it behind an
/// `Arc`; the document store and package store are concurrent inside.
pub struct ServerState {
    pub documents: DocumentStore,
    pub packages: PackageStore,
    pub workspace_folders: RwLock<Vec<PathBuf>>,
    pub client: RwLock<Option<ClientInfo>>,
    pub shutdown_requested: AtomicBool,
}

impl ServerState {
    pub fn new(packages: PackageStore) -> Self {
        ServerState {
            documents: DocumentStore::new(),
            packages,
            workspace_folders: RwLock::new(Vec::new()),
            client: RwLock::new(None),
            shutdown_requested: AtomicBool::new(false),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cache_dir: PathBuf,
}

pub struct BurrowServer {
    state: Arc<ServerState>,
}

impl BurrowServer {
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let packages = PackageStore::open(&config.cache_dir)?;
        Ok(BurrowServer {
            state: Arc::new(ServerState::new(packages)),
        })
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Accept loop. Each editor connection runs independently against
    /// the shared state.
    pub async fn serve_tcp(&self, host: &str, port: u16) -> anyhow::Result<()> {
        let listener = TcpListener::bind((host, port)).await?;
        info!("Listening on {}", listener.local_addr()?);

        loop {
            let (stream, addr) = listener.accept().await?;
            info!("Editor connected: {}", addr);
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                let (read_half, write_half) = stream.into_split();
                if let Err(e) = serve_connection(read_half, write_half, state).await {
                    warn!("Connection {} closed with error: {}", addr, e);
                } else {
                    info!("Editor disconnected: {}", addr);
                }
            });
        }
    }

    /// Single-session mode over the process's stdin/stdout.
    pub async fn serve_stdio(&self) -> anyhow::Result<()> {
        info!("Serving over stdio");
        let state = Arc::clone(&self.state);
        serve_connection(tokio::io::stdin(), tokio::io::stdout(), state).await
    }
}

async fn serve_connection<R, W>(
    reader: R,
    mut writer: W,
    state: Arc<ServerState>,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbound, mut rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.write_all(b"\n").await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = router::handle_line(&state, &outbound, &line).await {
            if outbound.send(response).is_err() {
                break;
            }
        }
        if state.shutdown_requested.load(Ordering::SeqCst) {
            break;
        }
    }

    drop(outbound);
    let _ = writer_task.await;
    Ok(())
}
