//! Mock score persistence server
//!
//! Stands in for the web app's score API during local play.
//!
//! Endpoints:
//! - `POST /api/score` with `{"score": n}` appends the score, adds it to the
//!   running total and updates the leaderboard entry for `--username`
//! - `GET /api/score` returns the whole store
//!
//! Usage:
//!   cargo run --bin mock-score-server -- --port 3000 --username player

use clap::Parser;
use posebeat::io::{start_score_server, ScoreState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mock-score-server")]
#[command(about = "In-memory score API for local play")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Leaderboard entry updated with the running total
    #[arg(short, long, default_value = "player")]
    username: String,

    /// Optional JSON file mirroring the store across restarts
    #[arg(long)]
    store: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();

    let state = match args.store {
        Some(ref path) => ScoreState::with_file(&args.username, path)?,
        None => ScoreState::in_memory(&args.username),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    start_score_server(listener, Arc::new(state), shutdown_rx).await.map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}
