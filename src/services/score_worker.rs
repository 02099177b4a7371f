//! Score submission worker - posts completed sessions off the game loop
//!
//! The game loop enqueues one `ScoreSubmission` per completed session over an
//! mpsc channel. The worker makes exactly one HTTP call per session and never
//! posts the same session twice.

use crate::infra::metrics::Metrics;
use crate::io::score_client::ScoreClient;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A final score waiting to be persisted
#[derive(Debug, Clone)]
pub struct ScoreSubmission {
    pub session_id: String,
    pub score: u32,
    /// When the submission was enqueued (for queue delay measurement)
    pub enqueued_at: Instant,
}

impl ScoreSubmission {
    pub fn new(session_id: &str, score: u32) -> Self {
        Self { session_id: session_id.to_string(), score, enqueued_at: Instant::now() }
    }
}

/// What the worker concluded for one submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Accepted { user_total_score: f64 },
    Failed { kind: &'static str },
    Duplicate,
}

pub struct ScoreWorker {
    client: Arc<ScoreClient>,
    rx: mpsc::Receiver<ScoreSubmission>,
    metrics: Arc<Metrics>,
    /// Sessions already posted, successfully or not
    submitted: FxHashSet<String>,
    /// Optional per-submission outcome feed
    outcome_tx: Option<mpsc::Sender<(String, SubmissionOutcome)>>,
}

impl ScoreWorker {
    pub fn new(client: Arc<ScoreClient>, rx: mpsc::Receiver<ScoreSubmission>, metrics: Arc<Metrics>) -> Self {
        Self { client, rx, metrics, submitted: FxHashSet::default(), outcome_tx: None }
    }

    pub fn with_outcome_tx(mut self, tx: mpsc::Sender<(String, SubmissionOutcome)>) -> Self {
        self.outcome_tx = Some(tx);
        self
    }

    /// Run the worker, processing submissions until the channel closes
    pub async fn run(mut self) {
        info!(url = %self.client.url(), "score_worker_started");

        while let Some(submission) = self.rx.recv().await {
            let outcome = self.process(&submission).await;
            let feed_closed = match self.outcome_tx {
                Some(ref tx) => tx.send((submission.session_id.clone(), outcome)).await.is_err(),
                None => false,
            };
            // Outcome feed is best-effort; submissions continue without it
            if feed_closed {
                debug!(session_id = %submission.session_id, "score_outcome_feed_closed");
                self.outcome_tx = None;
            }
        }

        info!("score_worker_stopped");
    }

    async fn process(&mut self, submission: &ScoreSubmission) -> SubmissionOutcome {
        if !self.submitted.insert(submission.session_id.clone()) {
            warn!(session_id = %submission.session_id, "score_submission_duplicate");
            return SubmissionOutcome::Duplicate;
        }

        let queue_delay_us = submission.enqueued_at.elapsed().as_micros() as u64;
        let send_start = Instant::now();
        let result = self.client.submit(submission.score).await;
        let send_us = send_start.elapsed().as_micros() as u64;
        self.metrics.record_submission(result.is_ok(), send_us);

        match result {
            Ok(receipt) => {
                info!(
                    session_id = %submission.session_id,
                    score = %submission.score,
                    user_total_score = %receipt.user_total_score,
                    queue_delay_us = %queue_delay_us,
                    send_us = %send_us,
                    "score_submitted"
                );
                SubmissionOutcome::Accepted { user_total_score: receipt.user_total_score }
            }
            Err(e) => {
                error!(
                    session_id = %submission.session_id,
                    score = %submission.score,
                    kind = %e.kind(),
                    error = %e,
                    send_us = %send_us,
                    "score_submission_failed"
                );
                SubmissionOutcome::Failed { kind: e.kind() }
            }
        }
    }
}

/// Create a score submission channel and worker
pub fn create_score_worker(
    client: Arc<ScoreClient>,
    metrics: Arc<Metrics>,
    buffer_size: usize,
) -> (mpsc::Sender<ScoreSubmission>, ScoreWorker) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (tx, ScoreWorker::new(client, rx, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::score_server::{start_score_server, ScoreState, SCORE_PATH};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::watch;

    async fn served_client(state: Arc<ScoreState>) -> (Arc<ScoreClient>, watch::Sender<bool>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}{}", listener.local_addr().unwrap(), SCORE_PATH);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(start_score_server(listener, state, shutdown_rx));
        (Arc::new(ScoreClient::new(&url, Duration::from_secs(5)).unwrap()), shutdown_tx)
    }

    #[tokio::test]
    async fn test_worker_submits_each_session_once() {
        let state = Arc::new(ScoreState::in_memory("player"));
        let (client, _shutdown) = served_client(state.clone()).await;
        let metrics = Arc::new(Metrics::new());
        let (outcome_tx, mut outcome_rx) = mpsc::channel(8);
        let (tx, worker) = create_score_worker(client, metrics.clone(), 8);
        let handle = tokio::spawn(worker.with_outcome_tx(outcome_tx).run());

        tx.send(ScoreSubmission::new("session-a", 3)).await.unwrap();
        tx.send(ScoreSubmission::new("session-a", 3)).await.unwrap();
        tx.send(ScoreSubmission::new("session-b", 5)).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let mut outcomes = Vec::new();
        while let Some(outcome) = outcome_rx.recv().await {
            outcomes.push(outcome);
        }
        assert_eq!(
            outcomes,
            vec![
                ("session-a".to_string(), SubmissionOutcome::Accepted { user_total_score: 3.0 }),
                ("session-a".to_string(), SubmissionOutcome::Duplicate),
                ("session-b".to_string(), SubmissionOutcome::Accepted { user_total_score: 8.0 }),
            ]
        );
        assert_eq!(state.snapshot().user_scores, vec![3.0, 5.0]);
        assert_eq!(metrics.submissions_ok(), 2);
    }

    #[tokio::test]
    async fn test_worker_keeps_submitting_after_outcome_feed_closes() {
        let state = Arc::new(ScoreState::in_memory("player"));
        let (client, _shutdown) = served_client(state.clone()).await;
        let metrics = Arc::new(Metrics::new());
        let (outcome_tx, outcome_rx) = mpsc::channel(8);
        drop(outcome_rx);
        let (tx, worker) = create_score_worker(client, metrics.clone(), 8);
        let handle = tokio::spawn(worker.with_outcome_tx(outcome_tx).run());

        tx.send(ScoreSubmission::new("session-a", 3)).await.unwrap();
        tx.send(ScoreSubmission::new("session-b", 5)).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(state.snapshot().user_scores, vec![3.0, 5.0]);
        assert_eq!(metrics.submissions_ok(), 2);
    }

    #[tokio::test]
    async fn test_worker_does_not_retry_failures() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}{}", listener.local_addr().unwrap(), SCORE_PATH);
        drop(listener);

        let client = Arc::new(ScoreClient::new(&url, Duration::from_secs(1)).unwrap());
        let metrics = Arc::new(Metrics::new());
        let (outcome_tx, mut outcome_rx) = mpsc::channel(8);
        let (tx, worker) = create_score_worker(client, metrics.clone(), 8);
        let handle = tokio::spawn(worker.with_outcome_tx(outcome_tx).run());

        tx.send(ScoreSubmission::new("session-a", 3)).await.unwrap();
        tx.send(ScoreSubmission::new("session-a", 3)).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(outcome_rx.recv().await.unwrap().1, SubmissionOutcome::Failed { kind: "transport" });
        assert_eq!(outcome_rx.recv().await.unwrap().1, SubmissionOutcome::Duplicate);
        assert_eq!(metrics.submissions_failed(), 1);
        assert_eq!(metrics.submissions_ok(), 0);
    }
}
