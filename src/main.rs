//! Burrow CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "burrow")]
#[command(about = "Go language server with a live source index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config directory for the package cache (defaults to ~/.cache/burrow)
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the language server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "9257")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Speak over stdin/stdout instead of TCP
        #[arg(long)]
        stdio: bool,
    },
    /// Index a workspace folder and print a summary
    Index {
        /// Workspace folder (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The server may share stdout with the wire
    // protocol, so logs go to stderr.
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("burrow={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Burrow v{}", env!("CARGO_PKG_VERSION"));

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => commands::default_config_dir()?,
    };

    match cli.command {
        Commands::Serve { port, host, stdio } => {
            commands::serve(config_dir, host, port, stdio).await
        }
        Commands::Index { folder } => commands::index(folder).await,
        Commands::Version => {
            println!("Burrow v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
