//! Local score persistence endpoint
//!
//! Serves `POST /api/score` and `GET /api/score` from an in-memory store,
//! optionally mirrored to a JSON file after every accepted score. Used by the
//! `mock-score-server` binary and by integration tests.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub const SCORE_PATH: &str = "/api/score";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub high_score: f64,
}

/// Persisted score document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreStore {
    #[serde(default)]
    pub user_scores: Vec<f64>,
    #[serde(default)]
    pub user_total_score: f64,
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl ScoreStore {
    /// Append a score and refresh `username`'s leaderboard entry with the running total
    pub fn record(&mut self, score: f64, username: &str) {
        self.user_scores.push(score);
        self.user_total_score += score;
        let total = self.user_total_score;
        match self.leaderboard.iter_mut().find(|e| e.username == username) {
            Some(entry) => entry.high_score = total,
            None => self.leaderboard.push(LeaderboardEntry { username: username.to_string(), high_score: total }),
        }
    }
}

/// Shared server state
pub struct ScoreState {
    store: parking_lot::Mutex<ScoreStore>,
    username: String,
    path: Option<PathBuf>,
}

impl ScoreState {
    pub fn in_memory(username: &str) -> Self {
        Self { store: parking_lot::Mutex::new(ScoreStore::default()), username: username.to_string(), path: None }
    }

    /// Load the store from `path` if it exists, and write back to it on every score
    pub fn with_file(username: &str, path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let store = if path.exists() {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read score store: {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse score store: {}", path.display()))?
        } else {
            ScoreStore::default()
        };
        Ok(Self {
            store: parking_lot::Mutex::new(store),
            username: username.to_string(),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn snapshot(&self) -> ScoreStore {
        self.store.lock().clone()
    }

    fn record(&self, score: f64) -> Result<ScoreStore, String> {
        let mut store = self.store.lock();
        let mut updated = store.clone();
        updated.record(score, &self.username);
        if let Some(ref path) = self.path {
            let data = serde_json::to_string_pretty(&updated).map_err(|e| e.to_string())?;
            std::fs::write(path, data).map_err(|e| e.to_string())?;
        }
        *store = updated.clone();
        Ok(updated)
    }
}

fn json_response(status: StatusCode, body: Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response should not fail")
}

async fn handle_post(req: Request<Incoming>, state: &ScoreState) -> Response<Full<Bytes>> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Failed to update score", "details": e.to_string()}),
            )
        }
    };

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Failed to update score", "details": e.to_string()}),
            )
        }
    };

    let Some(score) = payload.get("score").and_then(Value::as_f64) else {
        warn!(body = %payload, "score_invalid");
        return json_response(StatusCode::BAD_REQUEST, json!({"error": "Invalid score"}));
    };

    match state.record(score) {
        Ok(store) => {
            info!(
                score = %score,
                total = %store.user_total_score,
                username = %state.username,
                "score_recorded"
            );
            json_response(
                StatusCode::OK,
                json!({
                    "success": true,
                    "userScores": store.user_scores,
                    "userTotalScore": store.user_total_score,
                }),
            )
        }
        Err(details) => {
            error!(error = %details, "score_store_write_failed");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Failed to update score", "details": details}),
            )
        }
    }
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ScoreState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = match (&method, path.as_str()) {
        (&Method::POST, SCORE_PATH) => handle_post(req, &state).await,
        (&Method::GET, SCORE_PATH) => {
            let store = state.snapshot();
            match serde_json::to_value(&store) {
                Ok(body) => json_response(StatusCode::OK, body),
                Err(e) => json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": e.to_string()})),
            }
        }
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail"),
    };
    Ok(response)
}

/// Serve score requests on `listener` until shutdown
pub async fn start_score_server(
    listener: TcpListener,
    state: Arc<ScoreState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, username = %state.username, "score_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "score_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "score_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("score_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::score_client::{ScoreClient, ScoreError};
    use std::time::Duration;

    async fn spawn_server(state: Arc<ScoreState>) -> (String, watch::Sender<bool>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(start_score_server(listener, state, shutdown_rx));
        (base, shutdown_tx)
    }

    #[test]
    fn test_store_record_updates_leaderboard() {
        let mut store = ScoreStore::default();
        store.record(3.0, "player");
        store.record(4.0, "player");
        assert_eq!(store.user_scores, vec![3.0, 4.0]);
        assert_eq!(store.user_total_score, 7.0);
        assert_eq!(store.leaderboard, vec![LeaderboardEntry { username: "player".into(), high_score: 7.0 }]);

        store.record(1.0, "other");
        assert_eq!(store.leaderboard.len(), 2);
        assert_eq!(store.leaderboard[1].high_score, 8.0);
    }

    #[test]
    fn test_store_parses_partial_document() {
        let store: ScoreStore =
            serde_json::from_str(r#"{"userScores":[2],"leaderboard":[{"username":"a","highScore":9}]}"#).unwrap();
        assert_eq!(store.user_total_score, 0.0);
        assert_eq!(store.leaderboard[0].high_score, 9.0);
    }

    #[tokio::test]
    async fn test_post_and_get_round_trip() {
        let state = Arc::new(ScoreState::in_memory("player"));
        let (base, _shutdown) = spawn_server(state.clone()).await;
        let client = ScoreClient::new(&format!("{}{}", base, SCORE_PATH), Duration::from_secs(5)).unwrap();

        let first = client.submit(5).await.unwrap();
        assert_eq!(first.user_total_score, 5.0);
        let second = client.submit(2).await.unwrap();
        assert!(second.success);
        assert_eq!(second.user_scores, vec![5.0, 2.0]);
        assert_eq!(second.user_total_score, 7.0);

        let body: ScoreStore = reqwest::get(format!("{}{}", base, SCORE_PATH)).await.unwrap().json().await.unwrap();
        assert_eq!(body.leaderboard[0].username, "player");
        assert_eq!(body.leaderboard[0].high_score, 7.0);
        assert_eq!(state.snapshot(), body);
    }

    #[tokio::test]
    async fn test_non_numeric_score_is_rejected() {
        let (base, _shutdown) = spawn_server(Arc::new(ScoreState::in_memory("player"))).await;
        let response = reqwest::Client::new()
            .post(format!("{}{}", base, SCORE_PATH))
            .body(r#"{"score":"seven"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Invalid score");
    }

    #[tokio::test]
    async fn test_malformed_body_is_server_error() {
        let (base, _shutdown) = spawn_server(Arc::new(ScoreState::in_memory("player"))).await;
        let response =
            reqwest::Client::new().post(format!("{}{}", base, SCORE_PATH)).body("{").send().await.unwrap();
        assert_eq!(response.status().as_u16(), 500);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Failed to update score");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (base, _shutdown) = spawn_server(Arc::new(ScoreState::in_memory("player"))).await;
        let client = ScoreClient::new(&format!("{}/api/other", base), Duration::from_secs(5)).unwrap();
        match client.submit(1).await {
            Err(ScoreError::Rejected { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected 404, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_file_store_persists_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        let state = Arc::new(ScoreState::with_file("player", &path).unwrap());
        let (base, _shutdown) = spawn_server(state).await;
        let client = ScoreClient::new(&format!("{}{}", base, SCORE_PATH), Duration::from_secs(5)).unwrap();
        client.submit(4).await.unwrap();

        let reloaded = ScoreState::with_file("player", &path).unwrap();
        assert_eq!(reloaded.snapshot().user_total_score, 4.0);
        assert_eq!(reloaded.snapshot().leaderboard[0].high_score, 4.0);
    }
}
