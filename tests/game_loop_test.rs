//! Integration tests for the beat-driven game loop
//!
//! Beat-clock tests run on paused tokio time so a routine of 1s beats
//! finishes instantly and deterministically.

use posebeat::domain::landmark::LANDMARK_COUNT;
use posebeat::domain::{Landmark, PoseCatalog, PoseFrame, PoseId, StretchSequence};
use posebeat::infra::Metrics;
use posebeat::io::{start_score_server, ScoreClient, ScoreState};
use posebeat::services::{
    create_score_worker, FrameReport, GameLoop, GameSession, PoseValidator, ScoreSubmission,
    SequenceSettings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Body facing the camera with arms straight out to the sides
fn t_pose_landmarks() -> Vec<Option<Landmark>> {
    let mut points = vec![Some(Landmark::new(0.5, 0.15)); LANDMARK_COUNT];
    let mut set = |idx: usize, x: f64, y: f64| points[idx] = Some(Landmark::new(x, y));
    set(11, 0.4, 0.3); // shoulders
    set(12, 0.6, 0.3);
    set(13, 0.3, 0.3); // elbows
    set(14, 0.7, 0.3);
    set(15, 0.2, 0.3); // wrists
    set(16, 0.8, 0.3);
    set(23, 0.4, 0.6); // hips
    set(24, 0.6, 0.6);
    set(25, 0.4, 0.8); // knees
    set(26, 0.6, 0.8);
    set(27, 0.4, 1.0); // ankles
    set(28, 0.6, 1.0);
    points
}

/// T pose at beats 2 and 4; completes at beat 8
fn t_pose_routine() -> Arc<StretchSequence> {
    let catalog = PoseCatalog::builtin();
    let t_pose = catalog.get(&PoseId::from("T_POSE")).unwrap();
    let mut sequence = StretchSequence::new();
    sequence.add_step(2, t_pose.clone());
    sequence.add_step(4, t_pose);
    Arc::new(sequence)
}

fn game_loop(beat_interval: Duration, metrics: Arc<Metrics>) -> GameLoop {
    let session = GameSession::new(
        t_pose_routine(),
        SequenceSettings::default(),
        PoseValidator::default(),
        metrics.clone(),
    );
    GameLoop::new(session, beat_interval, metrics)
}

/// Send a T pose frame every `every` until the receiver goes away
fn feed_t_pose(tx: mpsc::Sender<PoseFrame>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            if tx.send(PoseFrame::new(t_pose_landmarks())).await.is_err() {
                return;
            }
        }
    })
}

#[tokio::test(start_paused = true)]
async fn test_matching_player_scores_every_window() {
    let metrics = Arc::new(Metrics::new());
    let (score_tx, mut score_rx) = mpsc::channel::<ScoreSubmission>(4);
    let mut game = game_loop(Duration::from_secs(1), metrics.clone()).with_score_tx(score_tx);
    let (frame_tx, frame_rx) = mpsc::channel(64);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let feeder = feed_t_pose(frame_tx, Duration::from_millis(250));

    let started = tokio::time::Instant::now();
    let summary = game.run(frame_rx, shutdown_rx).await.expect("routine completes");
    feeder.abort();

    assert_eq!(started.elapsed(), Duration::from_secs(8));
    assert_eq!(summary.score, 2);
    assert_eq!(summary.final_beat, 8);
    assert_eq!(summary.windows_opened, 2);

    drop(game);
    let submission = score_rx.recv().await.unwrap();
    assert_eq!(submission.score, 2);
    assert_eq!(submission.session_id, summary.session_id);
    assert!(score_rx.recv().await.is_none(), "submitted more than once");
    assert_eq!(metrics.windows_credited(), 2);
    assert_eq!(metrics.beats_total(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_clock_keeps_running_after_frames_end() {
    let (score_tx, mut score_rx) = mpsc::channel::<ScoreSubmission>(4);
    let mut game = game_loop(Duration::from_secs(1), Arc::new(Metrics::new())).with_score_tx(score_tx);
    let (frame_tx, frame_rx) = mpsc::channel(64);
    drop(frame_tx);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let summary = game.run(frame_rx, shutdown_rx).await.expect("routine completes");
    assert_eq!(summary.score, 0);
    assert_eq!(summary.final_beat, 8);
    assert_eq!(score_rx.recv().await.unwrap().score, 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_without_submission() {
    let (score_tx, mut score_rx) = mpsc::channel::<ScoreSubmission>(4);
    let metrics = Arc::new(Metrics::new());
    let mut game = game_loop(Duration::from_secs(1), metrics.clone()).with_score_tx(score_tx);
    let (frame_tx, frame_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let feeder = feed_t_pose(frame_tx, Duration::from_millis(250));

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(3500)).await;
        let _ = shutdown_tx.send(true);
    });

    let summary = game.run(frame_rx, shutdown_rx).await;
    feeder.abort();
    assert!(summary.is_none());
    assert_eq!(game.session().score(), 1);

    drop(game);
    assert!(score_rx.recv().await.is_none());
    assert_eq!(metrics.sessions_completed(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_shutdown_sender_does_not_stop_the_game() {
    let mut game = game_loop(Duration::from_secs(1), Arc::new(Metrics::new()));
    let (_frame_tx, frame_rx) = mpsc::channel::<PoseFrame>(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    drop(shutdown_tx);

    let summary = game.run(frame_rx, shutdown_rx).await;
    assert_eq!(summary.map(|s| s.final_beat), Some(8));
}

#[tokio::test(start_paused = true)]
async fn test_frames_before_first_window_do_not_score() {
    let mut game = game_loop(Duration::from_secs(1), Arc::new(Metrics::new()));
    let (report_tx, mut report_rx) = mpsc::channel::<FrameReport>(64);
    game = game.with_report_tx(report_tx);
    let (frame_tx, frame_rx) = mpsc::channel(64);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    // Frames only during the first 1.5s: beat 1 at most, before the beat-2 window
    let feeder = tokio::spawn(async move {
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(500)).await;
            frame_tx.send(PoseFrame::new(t_pose_landmarks())).await.unwrap();
        }
    });

    let summary = game.run(frame_rx, shutdown_rx).await.unwrap();
    feeder.await.unwrap();
    assert_eq!(summary.score, 0);

    drop(game);
    let mut reports = Vec::new();
    while let Some(report) = report_rx.recv().await {
        reports.push(report);
    }
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| !r.scoring && !r.credited && r.validation.is_none()));
    assert!(reports.iter().all(|r| r.beat <= 1 && r.pose == Some(PoseId::from("T_POSE"))));
}

#[tokio::test]
async fn test_completed_session_is_persisted() {
    let state = Arc::new(ScoreState::in_memory("player"));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/api/score", listener.local_addr().unwrap());
    let (server_shutdown_tx, server_shutdown_rx) = watch::channel(false);
    tokio::spawn(start_score_server(listener, state.clone(), server_shutdown_rx));

    let metrics = Arc::new(Metrics::new());
    let client = Arc::new(ScoreClient::new(&url, Duration::from_secs(5)).unwrap());
    let (score_tx, worker) = create_score_worker(client, metrics.clone(), 4);
    let worker_handle = tokio::spawn(worker.run());

    // Short real-time beats; frames arrive several times per beat
    let mut game = game_loop(Duration::from_millis(40), metrics.clone()).with_score_tx(score_tx);
    let (frame_tx, frame_rx) = mpsc::channel(64);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let feeder = feed_t_pose(frame_tx, Duration::from_millis(5));

    let summary = game.run(frame_rx, shutdown_rx).await.unwrap();
    feeder.abort();
    drop(game);
    worker_handle.await.unwrap();

    assert_eq!(summary.score, 2);
    let store = state.snapshot();
    assert_eq!(store.user_scores, vec![2.0]);
    assert_eq!(store.leaderboard[0].username, "player");
    assert_eq!(store.leaderboard[0].high_score, 2.0);
    assert_eq!(metrics.submissions_ok(), 1);
    let _ = server_shutdown_tx.send(true);
}
