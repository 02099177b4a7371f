//! Beat and frame handlers for the GameSession
//!
//! Both handlers run on the game loop task, so score and window state have a
//! single writer.

use super::{FrameReport, GameSession, LatestValidation, SessionStatus, SessionSummary};
use crate::domain::landmark::PoseFrame;
use crate::services::validator::evaluate_frame;
use std::time::Instant;
use tracing::{debug, info};

impl GameSession {
    /// Advance the beat counter by one and apply the controller's outcome
    ///
    /// Returns the completion summary exactly once per session; every other
    /// call (including after completion or while idle) returns `None`.
    pub fn handle_beat(&mut self) -> Option<SessionSummary> {
        if self.status != SessionStatus::Running {
            return None;
        }

        let beat = self.controller.beat().saturating_add(1);
        self.metrics.record_beat();
        let outcome = self.controller.on_beat(beat);

        if let Some(closed) = outcome.window_closed {
            debug!(
                session_id = %self.session_id,
                beat = %beat,
                step = %closed.step,
                scored = %closed.scored,
                "window_closed"
            );
        }

        if let Some(opened) = outcome.window_opened {
            self.windows_opened += 1;
            self.metrics.record_window_opened();
            // A reading for an earlier step must not credit this one
            self.latest = None;
            let pose = self.controller.scoring_step().map(|s| s.pose.id.to_string()).unwrap_or_default();
            info!(
                session_id = %self.session_id,
                beat = %beat,
                step = %opened.step,
                pose = %pose,
                end = %opened.end,
                "window_opened"
            );
        }

        if outcome.completed {
            self.status = SessionStatus::Completed;
            return self.complete(beat);
        }

        self.credit_latest(beat);
        None
    }

    /// Evaluate a frame against the open window's pose and credit a match
    pub fn handle_frame(&mut self, frame: &PoseFrame) -> FrameReport {
        let started = Instant::now();
        let beat = self.controller.beat();
        let running = self.status == SessionStatus::Running;

        let window = self.controller.window().filter(|_| running);
        let target = window.and_then(|_| self.controller.scoring_step()).map(|s| s.pose.clone());
        let evaluation = evaluate_frame(frame, target.as_deref(), &self.validator);

        let mut credited = false;
        if let (Some(window), Some(validation)) = (window, evaluation.validation.as_ref()) {
            self.latest = Some(LatestValidation { step: window.step, is_match: validation.is_match });
            if validation.is_match {
                credited = self.credit(beat);
            }
        }

        let latency_us = started.elapsed().as_micros() as u64;
        self.metrics.record_frame(latency_us, evaluation.angles.is_some());

        let pose = self.controller.active_step().map(|s| s.pose.id.clone());
        if let Some(ref validation) = evaluation.validation {
            debug!(
                session_id = %self.session_id,
                beat = %beat,
                score = %validation.score,
                is_match = %validation.is_match,
                feedback = %validation.feedback,
                "frame_validated"
            );
        }

        FrameReport {
            session_id: self.session_id.clone(),
            beat,
            pose,
            scoring: window.is_some(),
            angles: evaluation.angles,
            validation: evaluation.validation,
            credited,
            score: self.score,
        }
    }

    /// Re-check the latest validation on a beat tick
    fn credit_latest(&mut self, beat: u32) {
        let Some(latest) = self.latest else {
            return;
        };
        let same_step = self.controller.window().is_some_and(|w| w.step == latest.step);
        if same_step && latest.is_match {
            self.credit(beat);
        }
    }

    fn credit(&mut self, beat: u32) -> bool {
        if !self.controller.credit(beat) {
            return false;
        }
        self.score += 1;
        self.metrics.record_window_credited();
        info!(
            session_id = %self.session_id,
            beat = %beat,
            score = %self.score,
            "window_credited"
        );
        true
    }

    fn complete(&mut self, beat: u32) -> Option<SessionSummary> {
        if self.reported {
            return None;
        }
        self.reported = true;
        self.metrics.record_session_completed();

        let summary = SessionSummary {
            session_id: self.session_id.clone(),
            score: self.score,
            steps: self.controller.sequence().len(),
            windows_opened: self.windows_opened,
            final_beat: beat,
        };
        info!(
            session_id = %summary.session_id,
            score = %summary.score,
            steps = %summary.steps,
            windows = %summary.windows_opened,
            beat = %beat,
            "session_complete"
        );
        Some(summary)
    }
}
