//! Pose frame source - JSON lines from a file or stdin
//!
//! Each line carries one pose backend message:
//! `{"landmarks":[{"x":0.41,"y":0.22}, ...]}`. An empty `landmarks` array is a
//! frame where nobody was detected. `{"error":"..."}` ends the stream.
//!
//! Frames are forwarded with `try_send` so a slow game loop drops frames
//! instead of stalling the reader.

use crate::domain::landmark::{Landmark, PoseFrame};
use crate::infra::metrics::Metrics;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum FrameParseError {
    #[error("invalid frame json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("pose source reported an error: {0}")]
    Source(String),
    #[error("frame has neither landmarks nor error")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct RawLandmark {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    landmarks: Option<Vec<Option<RawLandmark>>>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse one input line
///
/// Blank lines yield `Ok(None)`.
pub fn parse_frame(line: &str) -> Result<Option<PoseFrame>, FrameParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let message: RawMessage = serde_json::from_str(line)?;
    if let Some(error) = message.error {
        return Err(FrameParseError::Source(error));
    }
    let landmarks = message.landmarks.ok_or(FrameParseError::Empty)?;
    let landmarks = landmarks.into_iter().map(|lm| lm.map(|lm| Landmark::new(lm.x, lm.y))).collect();
    Ok(Some(PoseFrame::new(landmarks)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameInput {
    Stdin,
    File(PathBuf),
}

impl FrameInput {
    /// `-` means stdin
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            FrameInput::Stdin
        } else {
            FrameInput::File(PathBuf::from(arg))
        }
    }
}

impl std::fmt::Display for FrameInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameInput::Stdin => f.write_str("stdin"),
            FrameInput::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Counters for one run of the source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSourceStats {
    pub lines: u64,
    pub frames: u64,
    pub dropped: u64,
    pub rejected: u64,
}

pub struct FrameSource {
    input: FrameInput,
    /// Delay between forwarded frames when replaying a recording
    pacing: Option<Duration>,
    metrics: Arc<Metrics>,
}

impl FrameSource {
    pub fn new(input: FrameInput, pacing: Option<Duration>, metrics: Arc<Metrics>) -> Self {
        Self { input, pacing: pacing.filter(|d| !d.is_zero()), metrics }
    }

    /// Read the configured input until EOF, shutdown, or a closed channel
    ///
    /// Dropping `tx` on return is what tells the game loop the source ended.
    pub async fn run(
        self,
        tx: mpsc::Sender<PoseFrame>,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<FrameSourceStats> {
        use anyhow::Context;

        info!(input = %self.input, pacing_ms = ?self.pacing.map(|d| d.as_millis()), "frame_source_started");
        let stats = match self.input {
            FrameInput::Stdin => {
                let reader = BufReader::new(tokio::io::stdin());
                forward_lines(reader, self.pacing, &self.metrics, tx, shutdown).await
            }
            FrameInput::File(ref path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("Failed to open frame file: {}", path.display()))?;
                forward_lines(BufReader::new(file), self.pacing, &self.metrics, tx, shutdown).await
            }
        }?;
        info!(
            lines = %stats.lines,
            frames = %stats.frames,
            dropped = %stats.dropped,
            rejected = %stats.rejected,
            "frame_source_finished"
        );
        Ok(stats)
    }
}

/// Parse and forward every line from `reader`
pub async fn forward_lines<R: AsyncBufRead + Unpin>(
    reader: R,
    pacing: Option<Duration>,
    metrics: &Metrics,
    tx: mpsc::Sender<PoseFrame>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<FrameSourceStats> {
    let mut lines = reader.lines();
    let mut stats = FrameSourceStats::default();
    let mut pace = pacing.filter(|d| !d.is_zero()).map(tokio::time::interval);
    let mut shutdown_open = true;
    // Rate-limit drop warnings to 1 per second
    let mut last_drop_warn = Instant::now() - Duration::from_secs(2);

    loop {
        if let Some(ref mut pace) = pace {
            tokio::select! {
                _ = pace.tick() => {}
                changed = shutdown.changed(), if shutdown_open => {
                    match changed {
                        Ok(()) if *shutdown.borrow() => return Ok(stats),
                        Ok(()) => {}
                        Err(_) => shutdown_open = false,
                    }
                    continue;
                }
            }
        }

        let line = tokio::select! {
            line = lines.next_line() => line?,
            changed = shutdown.changed(), if shutdown_open => {
                match changed {
                    Ok(()) if *shutdown.borrow() => {
                        info!("frame_source_shutdown");
                        return Ok(stats);
                    }
                    Ok(()) => {}
                    Err(_) => shutdown_open = false,
                }
                continue;
            }
        };
        let Some(line) = line else {
            return Ok(stats);
        };
        stats.lines += 1;

        let frame = match parse_frame(&line) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(FrameParseError::Source(message)) => {
                error!(line = %stats.lines, error = %message, "pose_source_error");
                return Ok(stats);
            }
            Err(e) => {
                stats.rejected += 1;
                metrics.record_frame_rejected();
                warn!(line = %stats.lines, error = %e, "frame_rejected");
                continue;
            }
        };

        debug!(line = %stats.lines, landmarks = %frame.landmarks.len(), "frame_read");
        match tx.try_send(frame) {
            Ok(()) => stats.frames += 1,
            Err(TrySendError::Full(_)) => {
                stats.dropped += 1;
                metrics.record_frame_dropped();
                if last_drop_warn.elapsed() > Duration::from_secs(1) {
                    warn!("frame_dropped: channel full");
                    last_drop_warn = Instant::now();
                }
            }
            Err(TrySendError::Closed(_)) => {
                info!("frame_channel_closed");
                return Ok(stats);
            }
        }
    }
}
