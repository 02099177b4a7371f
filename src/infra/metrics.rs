//! Lock-free metrics collection and periodic reporting
//!
//! Hot-path recording (frames, beats) only touches atomics. Reporting swaps
//! the periodic counters to zero and reads the monotonic ones.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only. Do NOT use them for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
const BUCKET_BOUNDS: [u64; 10] = [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    std::array::from_fn(|i| buckets[i].swap(0, Ordering::Relaxed))
}

/// Upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Last bucket uses 2x the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector shared by the game loop, frame source and score worker
pub struct Metrics {
    /// Frames evaluated (monotonic)
    frames_total: AtomicU64,
    /// Frames evaluated since last report
    frames_since_report: AtomicU64,
    /// Frames that carried no detected pose (monotonic)
    frames_without_pose: AtomicU64,
    /// Frames the source could not enqueue (monotonic)
    frames_dropped: AtomicU64,
    /// Input lines that failed to parse (monotonic)
    frames_rejected: AtomicU64,
    /// Frame reports a slow renderer missed (monotonic)
    reports_dropped: AtomicU64,
    /// Frame evaluation latency (reset on report)
    validation_sum_us: AtomicU64,
    validation_max_us: AtomicU64,
    validation_buckets: [AtomicU64; NUM_BUCKETS],
    beats_total: AtomicU64,
    windows_opened: AtomicU64,
    windows_credited: AtomicU64,
    sessions_completed: AtomicU64,
    submissions_ok: AtomicU64,
    submissions_failed: AtomicU64,
    /// Score submission round trip (reset on report)
    submit_latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Frame channel depth (point-in-time)
    frame_queue_depth: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            frames_total: AtomicU64::new(0),
            frames_since_report: AtomicU64::new(0),
            frames_without_pose: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            reports_dropped: AtomicU64::new(0),
            validation_sum_us: AtomicU64::new(0),
            validation_max_us: AtomicU64::new(0),
            validation_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            beats_total: AtomicU64::new(0),
            windows_opened: AtomicU64::new(0),
            windows_credited: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            submissions_ok: AtomicU64::new(0),
            submissions_failed: AtomicU64::new(0),
            submit_latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            frame_queue_depth: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record one evaluated frame and how long evaluation took
    #[inline]
    pub fn record_frame(&self, latency_us: u64, detected: bool) {
        self.frames_total.fetch_add(1, Ordering::Relaxed);
        self.frames_since_report.fetch_add(1, Ordering::Relaxed);
        if !detected {
            self.frames_without_pose.fetch_add(1, Ordering::Relaxed);
        }
        self.validation_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.validation_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.validation_max_us, latency_us);
    }

    #[inline]
    pub fn record_frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_report_dropped(&self) {
        self.reports_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_beat(&self) {
        self.beats_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_window_opened(&self) {
        self.windows_opened.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_window_credited(&self) {
        self.windows_credited.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_session_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a score submission outcome and its round trip
    pub fn record_submission(&self, ok: bool, latency_us: u64) {
        if ok {
            self.submissions_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.submissions_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.submit_latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_frame_queue_depth(&self, depth: u64) {
        self.frame_queue_depth.store(depth, Ordering::Relaxed);
    }

    pub fn frames_total(&self) -> u64 {
        self.frames_total.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected.load(Ordering::Relaxed)
    }

    pub fn reports_dropped(&self) -> u64 {
        self.reports_dropped.load(Ordering::Relaxed)
    }

    pub fn beats_total(&self) -> u64 {
        self.beats_total.load(Ordering::Relaxed)
    }

    pub fn windows_credited(&self) -> u64 {
        self.windows_credited.load(Ordering::Relaxed)
    }

    pub fn sessions_completed(&self) -> u64 {
        self.sessions_completed.load(Ordering::Relaxed)
    }

    pub fn submissions_ok(&self) -> u64 {
        self.submissions_ok.load(Ordering::Relaxed)
    }

    pub fn submissions_failed(&self) -> u64 {
        self.submissions_failed.load(Ordering::Relaxed)
    }

    /// Calculate and return metrics summary, then reset periodic counters
    pub fn report(&self) -> MetricsSummary {
        let frames_count = self.frames_since_report.swap(0, Ordering::Relaxed);
        let validation_sum = self.validation_sum_us.swap(0, Ordering::Relaxed);
        let validation_max_us = self.validation_max_us.swap(0, Ordering::Relaxed);
        let validation_buckets = swap_buckets(&self.validation_buckets);
        let submit_buckets = swap_buckets(&self.submit_latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let frames_per_sec = if elapsed.as_secs_f64() > 0.0 {
            frames_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        MetricsSummary {
            frames_total: self.frames_total.load(Ordering::Relaxed),
            frames_per_sec,
            frames_without_pose: self.frames_without_pose.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            reports_dropped: self.reports_dropped.load(Ordering::Relaxed),
            validation_avg_us: if frames_count > 0 { validation_sum / frames_count } else { 0 },
            validation_max_us,
            validation_p99_us: percentile_from_buckets(&validation_buckets, 0.99),
            validation_buckets,
            beats_total: self.beats_total.load(Ordering::Relaxed),
            windows_opened: self.windows_opened.load(Ordering::Relaxed),
            windows_credited: self.windows_credited.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            submissions_ok: self.submissions_ok.load(Ordering::Relaxed),
            submissions_failed: self.submissions_failed.load(Ordering::Relaxed),
            submit_p99_us: percentile_from_buckets(&submit_buckets, 0.99),
            frame_queue_depth: self.frame_queue_depth.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct MetricsSummary {
    pub frames_total: u64,
    pub frames_per_sec: f64,
    pub frames_without_pose: u64,
    pub frames_dropped: u64,
    pub frames_rejected: u64,
    pub reports_dropped: u64,
    pub validation_avg_us: u64,
    pub validation_max_us: u64,
    pub validation_p99_us: u64,
    pub validation_buckets: [u64; NUM_BUCKETS],
    pub beats_total: u64,
    pub windows_opened: u64,
    pub windows_credited: u64,
    pub sessions_completed: u64,
    pub submissions_ok: u64,
    pub submissions_failed: u64,
    pub submit_p99_us: u64,
    pub frame_queue_depth: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            frames_total = %self.frames_total,
            frames_per_sec = format!("{:.1}", self.frames_per_sec),
            frames_without_pose = %self.frames_without_pose,
            frames_dropped = %self.frames_dropped,
            frames_rejected = %self.frames_rejected,
            validation_avg_us = %self.validation_avg_us,
            validation_p99_us = %self.validation_p99_us,
            beats = %self.beats_total,
            windows_opened = %self.windows_opened,
            windows_credited = %self.windows_credited,
            sessions = %self.sessions_completed,
            submit_ok = %self.submissions_ok,
            submit_failed = %self.submissions_failed,
            queue_depth = %self.frame_queue_depth,
            "metrics_summary"
        );
    }
}
