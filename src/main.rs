//! Posebeat - pose-matching rhythm game engine
//!
//! Plays one routine against a stream of pose frames and submits the final
//! score to the persistence endpoint.
//!
//! Module structure:
//! - `domain/` - Core types (landmarks, joint angles, poses, routines)
//! - `io/` - External interfaces (frame source, score client/server)
//! - `services/` - Game logic (validator, sequence controller, session loop)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use posebeat::infra::{Config, Metrics};
use posebeat::io::{FrameInput, FrameSource, ScoreClient};
use posebeat::services::{create_score_worker, FrameReport, GameLoop, GameSession};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Posebeat - hold the pose on the beat
#[derive(Parser, Debug)]
#[command(name = "posebeat", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON-lines pose frames; `-` reads stdin
    #[arg(short, long, default_value = "-")]
    frames: String,

    /// Delay between frames when replaying a recording (0 = as fast as read)
    #[arg(long, default_value_t = 0)]
    frame_interval_ms: u64,

    /// Play the routine without submitting the final score
    #[arg(long)]
    no_submit: bool,

    /// Write every frame report to stdout as a JSON line
    #[arg(long)]
    print_reports: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));
    // A pending stdin read holds a blocking thread until the next line arrives
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}

async fn run(args: Args) -> anyhow::Result<()> {
    info!(git_hash = %env!("GIT_HASH"), "posebeat starting");

    let config_path = args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[]));
    let mut config = Config::load_from_path(&config_path);
    if args.no_submit {
        config = config.with_scoring_disabled();
    }

    info!(
        config_file = %config.config_file(),
        beat_interval_ms = %config.beat_interval_ms(),
        window_beats = %config.window_beats(),
        tail_beats = %config.tail_beats(),
        match_threshold = %config.match_threshold(),
        steps = %config.sequence().len(),
        poses = %config.catalog().len(),
        scoring_enabled = %config.scoring_enabled(),
        score_url = %config.score_url(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let metrics = Arc::new(Metrics::new());

    // Handle shutdown on Ctrl+C
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = signal_tx.send(true);
    });

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Start frame source (bounded channel, lossy when the loop falls behind)
    let (frame_tx, frame_rx) = mpsc::channel(config.frame_channel_capacity());
    let pacing = Some(Duration::from_millis(args.frame_interval_ms));
    let source = FrameSource::new(FrameInput::from_arg(&args.frames), pacing, metrics.clone());
    let source_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(e) = source.run(frame_tx, source_shutdown).await {
            error!(error = %format!("{:#}", e), "frame_source_error");
        }
    });

    let session = GameSession::from_config(&config, metrics.clone());
    let mut game_loop = GameLoop::new(session, config.beat_interval(), metrics.clone());

    // Start score worker (if enabled)
    let worker_handle = if config.scoring_enabled() {
        let client = Arc::new(ScoreClient::new(config.score_url(), config.score_timeout())?);
        let (score_tx, worker) = create_score_worker(client, metrics.clone(), 4);
        game_loop = game_loop.with_score_tx(score_tx);
        Some(tokio::spawn(worker.run()))
    } else {
        None
    };

    // Optional renderer: frame reports as JSON lines on stdout
    let printer_handle = if args.print_reports {
        let (report_tx, report_rx) = mpsc::channel(config.frame_channel_capacity());
        game_loop = game_loop.with_report_tx(report_tx);
        Some(tokio::spawn(print_reports(report_rx)))
    } else {
        None
    };

    let summary = game_loop.run(frame_rx, shutdown_rx).await;

    // Dropping the loop closes the score and report channels
    drop(game_loop);
    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker_handle {
        handle.await.ok();
    }
    if let Some(handle) = printer_handle {
        handle.await.ok();
    }

    match summary {
        Some(summary) => info!(
            session_id = %summary.session_id,
            score = %summary.score,
            steps = %summary.steps,
            "session_summary"
        ),
        None => info!("session_aborted"),
    }
    metrics.report().log();

    info!("posebeat shutdown complete");
    Ok(())
}

async fn print_reports(mut rx: mpsc::Receiver<FrameReport>) {
    let mut stdout = std::io::stdout();
    while let Some(report) = rx.recv().await {
        match serde_json::to_string(&report) {
            Ok(line) => {
                if writeln!(stdout, "{}", line).is_err() {
                    break;
                }
            }
            Err(e) => error!(error = %e, "frame_report_encode_failed"),
        }
    }
}
