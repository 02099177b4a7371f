//! Game session state and the async beat/frame loop
//!
//! The session owns everything a running routine mutates: the sequence
//! controller, the cumulative score and the latest validation. `GameLoop`
//! drives it from a single task that multiplexes:
//! - the beat clock (`tokio::time::interval`, first beat one period after start)
//! - pose frames arriving over an mpsc channel
//! - the shutdown signal
//!
//! Completion is handed to the score worker exactly once per session.

mod handlers;

use crate::domain::angles::JointAngles;
use crate::domain::landmark::PoseFrame;
use crate::domain::pose::{PoseId, ValidationResult};
use crate::domain::sequence::StretchSequence;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::score_worker::ScoreSubmission;
use crate::services::sequence::{SequenceController, SequenceSettings};
use crate::services::validator::PoseValidator;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Duration, Instant};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Constructed or stopped, not counting beats
    Idle,
    Running,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
        }
    }
}

/// Final outcome of a completed routine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub score: u32,
    pub steps: usize,
    pub windows_opened: u32,
    pub final_beat: u32,
}

/// Per-frame result published to renderers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameReport {
    pub session_id: String,
    pub beat: u32,
    /// Step currently shown to the player
    pub pose: Option<PoseId>,
    /// True while the shown step's window is open
    pub scoring: bool,
    pub angles: Option<JointAngles>,
    pub validation: Option<ValidationResult>,
    pub credited: bool,
    pub score: u32,
}

/// Most recent validation and the step it was computed for
#[derive(Debug, Clone, Copy)]
pub(crate) struct LatestValidation {
    pub(crate) step: usize,
    pub(crate) is_match: bool,
}

/// One play-through of a routine
pub struct GameSession {
    /// Assigned on every `start()`
    pub(crate) session_id: String,
    pub(crate) controller: SequenceController,
    pub(crate) validator: PoseValidator,
    pub(crate) status: SessionStatus,
    pub(crate) score: u32,
    pub(crate) windows_opened: u32,
    /// Set once the completion summary has been handed out
    pub(crate) reported: bool,
    pub(crate) latest: Option<LatestValidation>,
    pub(crate) metrics: Arc<Metrics>,
}

impl GameSession {
    pub fn new(
        sequence: Arc<StretchSequence>,
        settings: SequenceSettings,
        validator: PoseValidator,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            session_id: String::new(),
            controller: SequenceController::new(sequence, settings),
            validator,
            status: SessionStatus::Idle,
            score: 0,
            windows_opened: 0,
            reported: false,
            latest: None,
            metrics,
        }
    }

    pub fn from_config(config: &Config, metrics: Arc<Metrics>) -> Self {
        Self::new(
            config.sequence(),
            config.sequence_settings(),
            PoseValidator::new(config.match_threshold()),
            metrics,
        )
    }

    /// Begin a fresh play-through at beat 0 with a zero score
    pub fn start(&mut self) {
        self.session_id = uuid::Uuid::now_v7().to_string();
        self.controller.start();
        self.status = SessionStatus::Running;
        self.score = 0;
        self.windows_opened = 0;
        self.reported = false;
        self.latest = None;

        info!(
            session_id = %self.session_id,
            steps = %self.controller.sequence().len(),
            completion_beat = %self.controller.completion_beat(),
            "session_started"
        );
    }

    /// Abandon the play-through without reporting a score
    pub fn stop(&mut self) {
        if self.status != SessionStatus::Running {
            return;
        }
        info!(
            session_id = %self.session_id,
            beat = %self.controller.beat(),
            score = %self.score,
            "session_stopped"
        );
        self.controller.reset();
        self.status = SessionStatus::Idle;
        self.latest = None;
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn beat(&self) -> u32 {
        self.controller.beat()
    }

    pub fn controller(&self) -> &SequenceController {
        &self.controller
    }
}

/// Async driver for a `GameSession`
pub struct GameLoop {
    session: GameSession,
    beat_interval: Duration,
    metrics: Arc<Metrics>,
    /// Completion handoff to the score worker (optional)
    score_tx: Option<mpsc::Sender<ScoreSubmission>>,
    /// Per-frame reports for renderers (optional, lossy)
    report_tx: Option<mpsc::Sender<FrameReport>>,
}

impl GameLoop {
    pub fn new(session: GameSession, beat_interval: Duration, metrics: Arc<Metrics>) -> Self {
        Self { session, beat_interval, metrics, score_tx: None, report_tx: None }
    }

    pub fn with_score_tx(mut self, tx: mpsc::Sender<ScoreSubmission>) -> Self {
        self.score_tx = Some(tx);
        self
    }

    pub fn with_report_tx(mut self, tx: mpsc::Sender<FrameReport>) -> Self {
        self.report_tx = Some(tx);
        self
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Start a session and run it until completion or shutdown
    ///
    /// Returns the summary on completion, `None` when shut down first.
    pub async fn run(
        &mut self,
        mut frame_rx: mpsc::Receiver<PoseFrame>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Option<SessionSummary> {
        self.session.start();

        let mut beat_clock = interval_at(Instant::now() + self.beat_interval, self.beat_interval);
        let mut frames_open = true;
        let mut shutdown_open = true;

        loop {
            tokio::select! {
                _ = beat_clock.tick() => {
                    self.metrics.set_frame_queue_depth(frame_rx.len() as u64);
                    if let Some(summary) = self.session.handle_beat() {
                        self.submit(&summary).await;
                        return Some(summary);
                    }
                }
                frame = frame_rx.recv(), if frames_open => {
                    match frame {
                        Some(frame) => {
                            let report = self.session.handle_frame(&frame);
                            self.publish(report);
                        }
                        None => {
                            // Clock keeps running; remaining windows simply go unscored
                            frames_open = false;
                            info!(session_id = %self.session.session_id(), "frame_source_closed");
                        }
                    }
                }
                changed = shutdown.changed(), if shutdown_open => {
                    match changed {
                        Ok(()) if *shutdown.borrow() => {
                            self.session.stop();
                            return None;
                        }
                        Ok(()) => {}
                        Err(_) => shutdown_open = false,
                    }
                }
            }
        }
    }

    fn publish(&self, report: FrameReport) {
        if let Some(ref tx) = self.report_tx {
            if tx.try_send(report).is_err() {
                self.metrics.record_report_dropped();
            }
        }
    }

    async fn submit(&self, summary: &SessionSummary) {
        let Some(ref tx) = self.score_tx else {
            info!(session_id = %summary.session_id, score = %summary.score, "score_submission_disabled");
            return;
        };
        match tx.send(ScoreSubmission::new(&summary.session_id, summary.score)).await {
            Ok(()) => info!(session_id = %summary.session_id, score = %summary.score, "score_submission_enqueued"),
            Err(_) => error!(session_id = %summary.session_id, score = %summary.score, "score_worker_unavailable"),
        }
    }
}
