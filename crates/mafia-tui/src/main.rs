use std::fs::File;
use std::sync::{Arc, Mutex};

use clap::Parser;
use mafia_client::config::{KEY_ENV, StoreCredentials, URL_ENV};
use mafia_client::memory_store::MemoryStore;
use mafia_client::rest_store::RestStore;
use tracing_subscriber::EnvFilter;

mod client;
mod tui;

#[derive(Parser)]
#[command(name = "mafia")]
#[command(about = "Host or join a Mafia party game", long_about = None)]
struct Cli {
    /// Base URL of the hosted session store
    #[arg(long, env = URL_ENV)]
    store_url: Option<String>,

    /// Anonymous API key for the hosted session store
    #[arg(long, env = KEY_ENV, hide_env_values = true)]
    store_key: Option<String>,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, default_value = "mafia.log")]
    log_file: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log = match File::create(&cli.log_file) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: cannot open log file '{}': {}", cli.log_file, e);
            return;
        }
    };
    // Respects RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(log))
        .with_ansi(false)
        .init();

    let result = match StoreCredentials::resolve(cli.store_url, cli.store_key) {
        Some(creds) => {
            tracing::info!(?creds, "using hosted session store");
            client::start_client(Arc::new(RestStore::new(creds))).await
        }
        None => {
            tracing::warn!("{URL_ENV} or {KEY_ENV} not set; using in-memory store");
            client::start_client(Arc::new(MemoryStore::new())).await
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "client exited with error");
        eprintln!("Error: {}", e);
    }
}
