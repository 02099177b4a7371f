//! Body landmarks as produced by the pose-estimation source
//!
//! Coordinates are normalized to the camera frame (approximately [0, 1]),
//! with y growing downward. Indices follow the 33-point MediaPipe Pose layout.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Number of landmarks in a complete pose reading
pub const LANDMARK_COUNT: usize = 33;

pub const NOSE: usize = 0;
pub const LEFT_EYE_INNER: usize = 1;
pub const LEFT_EYE: usize = 2;
pub const LEFT_EYE_OUTER: usize = 3;
pub const RIGHT_EYE_INNER: usize = 4;
pub const RIGHT_EYE: usize = 5;
pub const RIGHT_EYE_OUTER: usize = 6;
pub const LEFT_EAR: usize = 7;
pub const RIGHT_EAR: usize = 8;
pub const MOUTH_LEFT: usize = 9;
pub const MOUTH_RIGHT: usize = 10;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_PINKY: usize = 17;
pub const RIGHT_PINKY: usize = 18;
pub const LEFT_INDEX: usize = 19;
pub const RIGHT_INDEX: usize = 20;
pub const LEFT_THUMB: usize = 21;
pub const RIGHT_THUMB: usize = 22;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;
pub const LEFT_HEEL: usize = 29;
pub const RIGHT_HEEL: usize = 30;
pub const LEFT_FOOT_INDEX: usize = 31;
pub const RIGHT_FOOT_INDEX: usize = 32;

/// Skeleton edges for renderers (pairs of landmark indices)
pub const SKELETON_CONNECTIONS: [(usize, usize); 19] = [
    (NOSE, LEFT_SHOULDER),
    (NOSE, RIGHT_SHOULDER),
    (LEFT_SHOULDER, RIGHT_SHOULDER),
    (LEFT_SHOULDER, LEFT_ELBOW),
    (LEFT_ELBOW, LEFT_WRIST),
    (RIGHT_SHOULDER, RIGHT_ELBOW),
    (RIGHT_ELBOW, RIGHT_WRIST),
    (LEFT_WRIST, LEFT_PINKY),
    (RIGHT_WRIST, RIGHT_PINKY),
    (LEFT_PINKY, LEFT_INDEX),
    (RIGHT_PINKY, RIGHT_INDEX),
    (LEFT_HIP, LEFT_KNEE),
    (RIGHT_HIP, RIGHT_KNEE),
    (LEFT_KNEE, LEFT_ANKLE),
    (RIGHT_KNEE, RIGHT_ANKLE),
    (LEFT_ANKLE, LEFT_HEEL),
    (RIGHT_ANKLE, RIGHT_HEEL),
    (LEFT_SHOULDER, LEFT_HIP),
    (RIGHT_SHOULDER, RIGHT_HIP),
];

/// A single normalized 2D keypoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

impl Landmark {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite numbers
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Midpoint between two landmarks
    #[inline]
    pub fn midpoint(&self, other: &Landmark) -> Landmark {
        Landmark::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// One reading from the pose source
///
/// `landmarks` is empty when detection failed for the frame. Individual
/// entries are `None` when the source reported the point as missing.
#[derive(Debug, Clone)]
pub struct PoseFrame {
    pub landmarks: Vec<Option<Landmark>>,
    pub received_at: Instant,
}

impl PoseFrame {
    pub fn new(landmarks: Vec<Option<Landmark>>) -> Self {
        Self { landmarks, received_at: Instant::now() }
    }

    /// A frame for which the source detected nobody
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    #[inline]
    pub fn is_detected(&self) -> bool {
        !self.landmarks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connections_reference_valid_indices() {
        for (a, b) in SKELETON_CONNECTIONS {
            assert!(a < LANDMARK_COUNT);
            assert!(b < LANDMARK_COUNT);
        }
    }

    #[test]
    fn test_midpoint() {
        let a = Landmark::new(0.2, 0.4);
        let b = Landmark::new(0.6, 0.8);
        let m = a.midpoint(&b);
        assert!((m.x - 0.4).abs() < 1e-12);
        assert!((m.y - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_empty_frame_is_not_detected() {
        assert!(!PoseFrame::empty().is_detected());
        assert!(PoseFrame::new(vec![None; LANDMARK_COUNT]).is_detected());
    }
}
