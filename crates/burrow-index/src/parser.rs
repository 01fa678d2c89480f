//! Thread-safe parser pool for the Go grammar
//!
//! Tree-sitter parsers are not Send + Sync, so parsing runs on dedicated
//! worker threads reached through a channel. Callers hand over the source
//! text and receive the finished tree.

use anyhow::Result;
use tree_sitter::{Parser, Tree};

/// Internal message for a parser worker.
struct WorkerRequest {
    source: String,
    reply: std::sync::mpsc::Sender<Result<Tree>>,
}

/// Pool of worker threads, each owning one Go parser.
pub struct ParserPool {
    sender: std::sync::mpsc::Sender<WorkerRequest>,
}

impl ParserPool {
    /// Create a pool with the given number of worker threads.
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = std::sync::mpsc::channel::<WorkerRequest>();
        let receiver = std::sync::Arc::new(std::sync::Mutex::new(receiver));

        for i in 0..num_workers {
            let receiver = receiver.clone();
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    fn worker_thread(
        worker_id: usize,
        receiver: std::sync::Arc<std::sync::Mutex<std::sync::mpsc::Receiver<WorkerRequest>>>,
    ) {
        tracing::debug!("Parser worker {} started", worker_id);

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_go::LANGUAGE.into()) {
            tracing::error!("Parser worker {} failed to load Go grammar: {}", worker_id, e);
            return;
        }

        loop {
            let request = match receiver.lock().unwrap().recv() {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!("Parser worker {} shutting down", worker_id);
                    break;
                }
            };

            let result = match parser.parse(&request.source, None) {
                Some(tree) => Ok(tree),
                None => Err(anyhow::anyhow!("failed to parse source")),
            };

            if request.reply.send(result).is_err() {
                tracing::warn!("Failed to send parse result back to caller");
            }
        }
    }

    /// Parse synchronously, blocking the current thread until a worker
    /// finishes.
    pub fn parse_blocking(&self, source: String) -> Result<Tree> {
        let (reply, response) = std::sync::mpsc::channel();

        self.sender
            .send(WorkerRequest { source, reply })
            .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;

        response
            .recv()
            .map_err(|_| anyhow::anyhow!("parser worker died"))?
    }

    /// Parse asynchronously via `spawn_blocking`.
    pub async fn parse(&self, source: String) -> Result<Tree> {
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || {
            let (reply, response) = std::sync::mpsc::channel();

            sender
                .send(WorkerRequest { source, reply })
                .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;

            response
                .recv()
                .map_err(|_| anyhow::anyhow!("parser worker died"))?
        })
        .await
        .map_err(|e| anyhow::anyhow!("task join error: {}", e))?
    }
}

impl Clone for ParserPool {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Convenience constructor sized to the available parallelism, at least 2.
pub fn create_parser_pool() -> ParserPool {
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);

    ParserPool::new(num_workers)
}
