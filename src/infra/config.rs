//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::catalog::{default_routine, PoseCatalog};
use crate::domain::pose::{PoseId, TargetPose};
use crate::domain::sequence::StretchSequence;
use crate::services::sequence::{SequenceSettings, DEFAULT_TAIL_BEATS, DEFAULT_WINDOW_BEATS};
use crate::services::validator::DEFAULT_MATCH_THRESHOLD;
use anyhow::{ensure, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_beat_interval_ms")]
    pub beat_interval_ms: u64,
    #[serde(default = "default_window_beats")]
    pub window_beats: u32,
    #[serde(default = "default_tail_beats")]
    pub tail_beats: u32,
    #[serde(default = "default_match_threshold")]
    pub match_threshold: u8,
    /// Pose frames buffered between the source and the game loop
    #[serde(default = "default_frame_channel_capacity")]
    pub frame_channel_capacity: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            beat_interval_ms: default_beat_interval_ms(),
            window_beats: default_window_beats(),
            tail_beats: default_tail_beats(),
            match_threshold: default_match_threshold(),
            frame_channel_capacity: default_frame_channel_capacity(),
        }
    }
}

fn default_beat_interval_ms() -> u64 {
    1000
}

fn default_window_beats() -> u32 {
    DEFAULT_WINDOW_BEATS
}

fn default_tail_beats() -> u32 {
    DEFAULT_TAIL_BEATS
}

fn default_match_threshold() -> u8 {
    DEFAULT_MATCH_THRESHOLD
}

fn default_frame_channel_capacity() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_scoring_enabled")]
    pub enabled: bool,
    #[serde(default = "default_score_url")]
    pub url: String,
    #[serde(default = "default_score_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            enabled: default_scoring_enabled(),
            url: default_score_url(),
            timeout_ms: default_score_timeout_ms(),
        }
    }
}

fn default_scoring_enabled() -> bool {
    true
}

fn default_score_url() -> String {
    "http://localhost:3000/api/score".to_string()
}

fn default_score_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval_secs() }
    }
}

fn default_metrics_interval_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutineEntry {
    pub beat: u32,
    pub pose: PoseId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Added to the built-in catalog, replacing entries with the same id
    #[serde(default)]
    pub poses: Vec<TargetPose>,
    /// Replaces the default routine when present
    #[serde(default)]
    pub routine: Option<Vec<RoutineEntry>>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    beat_interval_ms: u64,
    window_beats: u32,
    tail_beats: u32,
    match_threshold: u8,
    frame_channel_capacity: usize,
    scoring_enabled: bool,
    score_url: String,
    score_timeout_ms: u64,
    metrics_interval_secs: u64,
    catalog: Arc<PoseCatalog>,
    sequence: Arc<StretchSequence>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        // The built-in routine only names built-in poses; the build cannot fail
        let catalog = PoseCatalog::builtin();
        let sequence = StretchSequence::from_routine(&default_routine(), &catalog).unwrap_or_default();
        let game = GameConfig::default();
        let scoring = ScoringConfig::default();
        Self {
            beat_interval_ms: game.beat_interval_ms,
            window_beats: game.window_beats,
            tail_beats: game.tail_beats,
            match_threshold: game.match_threshold,
            frame_channel_capacity: game.frame_channel_capacity,
            scoring_enabled: scoring.enabled,
            score_url: scoring.url,
            score_timeout_ms: scoring.timeout_ms,
            metrics_interval_secs: default_metrics_interval_secs(),
            catalog: Arc::new(catalog),
            sequence: Arc::new(sequence),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content, &path.display().to_string())
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse and validate TOML text; `source` is recorded as the config file name
    pub fn from_toml_str(content: &str, source: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content).context("Failed to parse TOML")?;
        Self::from_toml(toml_config, source)
    }

    fn from_toml(toml_config: TomlConfig, source: &str) -> anyhow::Result<Self> {
        let TomlConfig { game, scoring, metrics, poses, routine } = toml_config;

        ensure!(game.beat_interval_ms > 0, "game.beat_interval_ms must be greater than 0");
        ensure!(game.window_beats >= 1, "game.window_beats must be at least 1");
        ensure!(game.match_threshold <= 100, "game.match_threshold must be at most 100");
        ensure!(game.frame_channel_capacity > 0, "game.frame_channel_capacity must be greater than 0");
        ensure!(metrics.interval_secs > 0, "metrics.interval_secs must be greater than 0");

        let mut catalog = PoseCatalog::builtin();
        for pose in poses {
            ensure!(pose.tolerance > 0.0, "pose {} must have a positive tolerance", pose.id);
            ensure!(!pose.joints.is_empty(), "pose {} must list at least one joint", pose.id);
            for (i, target) in pose.joints.iter().enumerate() {
                let repeated = pose.joints[i + 1..].iter().any(|t| t.joint == target.joint);
                ensure!(!repeated, "pose {} lists joint {} more than once", pose.id, target.joint);
            }
            catalog.insert(pose);
        }

        let routine: Vec<(u32, PoseId)> = match routine {
            Some(entries) => entries.into_iter().map(|e| (e.beat, e.pose)).collect(),
            None => default_routine(),
        };
        let sequence = StretchSequence::from_routine(&routine, &catalog)?;
        let last_beat = sequence.last_beat();
        ensure!(
            last_beat.checked_add(game.window_beats).is_some(),
            "routine beat {} plus game.window_beats {} exceeds the beat range",
            last_beat,
            game.window_beats
        );
        ensure!(
            last_beat.checked_add(game.tail_beats).is_some(),
            "routine beat {} plus game.tail_beats {} exceeds the beat range",
            last_beat,
            game.tail_beats
        );

        Ok(Self {
            beat_interval_ms: game.beat_interval_ms,
            window_beats: game.window_beats,
            tail_beats: game.tail_beats,
            match_threshold: game.match_threshold,
            frame_channel_capacity: game.frame_channel_capacity,
            scoring_enabled: scoring.enabled,
            score_url: scoring.url,
            score_timeout_ms: scoring.timeout_ms,
            metrics_interval_secs: metrics.interval_secs,
            catalog: Arc::new(catalog),
            sequence: Arc::new(sequence),
            config_file: source.to_string(),
        })
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(Self::resolve_config_path(args))
    }

    /// Load from `path`, falling back to defaults with a warning
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.as_ref().display(), error = %format!("{:#}", e), "config_fallback_to_defaults");
                Self::default()
            }
        }
    }

    pub fn beat_interval(&self) -> Duration {
        Duration::from_millis(self.beat_interval_ms)
    }

    pub fn beat_interval_ms(&self) -> u64 {
        self.beat_interval_ms
    }

    pub fn window_beats(&self) -> u32 {
        self.window_beats
    }

    pub fn tail_beats(&self) -> u32 {
        self.tail_beats
    }

    pub fn sequence_settings(&self) -> SequenceSettings {
        SequenceSettings { window_beats: self.window_beats, tail_beats: self.tail_beats }
    }

    pub fn match_threshold(&self) -> u8 {
        self.match_threshold
    }

    pub fn frame_channel_capacity(&self) -> usize {
        self.frame_channel_capacity
    }

    pub fn scoring_enabled(&self) -> bool {
        self.scoring_enabled
    }

    pub fn score_url(&self) -> &str {
        &self.score_url
    }

    pub fn score_timeout(&self) -> Duration {
        Duration::from_millis(self.score_timeout_ms)
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn catalog(&self) -> Arc<PoseCatalog> {
        self.catalog.clone()
    }

    /// The routine every session of this run plays
    pub fn sequence(&self) -> Arc<StretchSequence> {
        self.sequence.clone()
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Disable score submission (e.g. `--no-submit`)
    pub fn with_scoring_disabled(mut self) -> Self {
        self.scoring_enabled = false;
        self
    }

    /// Builder method for tests to shorten the beat clock
    #[cfg(test)]
    pub fn with_beat_interval_ms(mut self, ms: u64) -> Self {
        self.beat_interval_ms = ms;
        self
    }
}
