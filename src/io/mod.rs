//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `frame_source` - JSON-lines pose frames from a file or stdin
//! - `score_client` - HTTP client for the score persistence endpoint
//! - `score_server` - In-memory score endpoint (mock server and tests)

pub mod frame_source;
pub mod score_client;
pub mod score_server;

// Re-export commonly used types
pub use frame_source::{parse_frame, FrameInput, FrameParseError, FrameSource, FrameSourceStats};
pub use score_client::{ScoreClient, ScoreError, ScoreReceipt};
pub use score_server::{start_score_server, ScoreState, ScoreStore};
