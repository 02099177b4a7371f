//! Services - game logic and state management
//!
//! This module contains the core game services:
//! - `validator` - Scores joint angles against a target pose
//! - `sequence` - Beat-driven routine state machine
//! - `session` - Game session state and the async game loop
//! - `score_worker` - Async score submission worker

pub mod score_worker;
pub mod sequence;
pub mod session;
pub mod validator;

// Re-export commonly used types
pub use score_worker::{create_score_worker, ScoreSubmission, ScoreWorker, SubmissionOutcome};
pub use sequence::{BeatOutcome, ScoringWindow, SequenceController, SequencePhase, SequenceSettings};
pub use session::{FrameReport, GameLoop, GameSession, SessionStatus, SessionSummary};
pub use validator::{evaluate_frame, FrameEvaluation, PoseValidator};
