//! Joint angle extraction from raw landmarks
//!
//! True joint angles come from the angle at a vertex formed by three
//! landmarks. `Spine`, `LeftBalance` and `RightBalance` are coordinate
//! differences scaled by [`PROXY_SCALE`]; they are degree-like units, not
//! angles, and are not bounded to [0, 180].

use crate::domain::landmark::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Scale applied to normalized coordinate differences for proxy metrics
pub const PROXY_SCALE: f64 = 180.0;

/// Named joint or segment metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Joint {
    LeftArm,
    RightArm,
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    Spine,
    LeftBalance,
    RightBalance,
}

impl Joint {
    pub const ALL: [Joint; 13] = [
        Joint::LeftArm,
        Joint::RightArm,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
        Joint::Spine,
        Joint::LeftBalance,
        Joint::RightBalance,
    ];

    /// Wire name, matches the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Joint::LeftArm => "leftArm",
            Joint::RightArm => "rightArm",
            Joint::LeftShoulder => "leftShoulder",
            Joint::RightShoulder => "rightShoulder",
            Joint::LeftHip => "leftHip",
            Joint::RightHip => "rightHip",
            Joint::LeftKnee => "leftKnee",
            Joint::RightKnee => "rightKnee",
            Joint::LeftAnkle => "leftAnkle",
            Joint::RightAnkle => "rightAnkle",
            Joint::Spine => "spine",
            Joint::LeftBalance => "leftBalance",
            Joint::RightBalance => "rightBalance",
        }
    }

    /// Human-readable name used in feedback text
    pub fn label(&self) -> &'static str {
        match self {
            Joint::LeftArm => "left arm",
            Joint::RightArm => "right arm",
            Joint::LeftShoulder => "left shoulder",
            Joint::RightShoulder => "right shoulder",
            Joint::LeftHip => "left hip",
            Joint::RightHip => "right hip",
            Joint::LeftKnee => "left knee",
            Joint::RightKnee => "right knee",
            Joint::LeftAnkle => "left ankle",
            Joint::RightAnkle => "right ankle",
            Joint::Spine => "side bend",
            Joint::LeftBalance => "left foot lift",
            Joint::RightBalance => "right foot lift",
        }
    }

    /// Landmark triple (first, vertex, last) for true angles, `None` for proxies
    pub fn triple(&self) -> Option<(usize, usize, usize)> {
        match self {
            Joint::LeftArm => Some((LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST)),
            Joint::RightArm => Some((RIGHT_SHOULDER, RIGHT_ELBOW, RIGHT_WRIST)),
            Joint::LeftShoulder => Some((LEFT_ELBOW, LEFT_SHOULDER, LEFT_HIP)),
            Joint::RightShoulder => Some((RIGHT_ELBOW, RIGHT_SHOULDER, RIGHT_HIP)),
            Joint::LeftHip => Some((LEFT_SHOULDER, LEFT_HIP, LEFT_KNEE)),
            Joint::RightHip => Some((RIGHT_SHOULDER, RIGHT_HIP, RIGHT_KNEE)),
            Joint::LeftKnee => Some((LEFT_HIP, LEFT_KNEE, LEFT_ANKLE)),
            Joint::RightKnee => Some((RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE)),
            Joint::LeftAnkle => Some((LEFT_KNEE, LEFT_ANKLE, LEFT_FOOT_INDEX)),
            Joint::RightAnkle => Some((RIGHT_KNEE, RIGHT_ANKLE, RIGHT_FOOT_INDEX)),
            Joint::Spine | Joint::LeftBalance | Joint::RightBalance => None,
        }
    }
}

impl std::fmt::Display for Joint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Joint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Joint::ALL
            .iter()
            .copied()
            .find(|j| j.as_str() == s)
            .ok_or_else(|| format!("unknown joint '{}'", s))
    }
}

/// Angle values for one frame, keyed by joint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointAngles(FxHashMap<Joint, f64>);

impl JointAngles {
    pub fn new() -> Self {
        Self(FxHashMap::default())
    }

    #[inline]
    pub fn get(&self, joint: Joint) -> Option<f64> {
        self.0.get(&joint).copied()
    }

    #[inline]
    pub fn insert(&mut self, joint: Joint, value: f64) {
        self.0.insert(joint, value);
    }

    pub fn with(mut self, joint: Joint, value: f64) -> Self {
        self.insert(joint, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Joint, f64)> + '_ {
        self.0.iter().map(|(j, v)| (*j, *v))
    }
}

impl FromIterator<(Joint, f64)> for JointAngles {
    fn from_iter<I: IntoIterator<Item = (Joint, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Angle in degrees at vertex `b` between rays b→a and b→c
///
/// Absent, non-finite, or coincident points read as 0.
pub fn angle_between(a: Option<Landmark>, b: Option<Landmark>, c: Option<Landmark>) -> f64 {
    let (Some(a), Some(b), Some(c)) = (a, b, c) else {
        return 0.0;
    };
    if !(a.is_finite() && b.is_finite() && c.is_finite()) {
        return 0.0;
    }

    let (v1x, v1y) = (a.x - b.x, a.y - b.y);
    let (v2x, v2y) = (c.x - b.x, c.y - b.y);
    let mag1 = (v1x * v1x + v1y * v1y).sqrt();
    let mag2 = (v2x * v2x + v2y * v2y).sqrt();
    if mag1 == 0.0 || mag2 == 0.0 {
        return 0.0;
    }

    let cos = ((v1x * v2x + v1y * v2y) / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Compute every [`Joint`] value for a landmark set
///
/// Returns `None` when fewer than [`LANDMARK_COUNT`] landmarks are present.
pub fn extract_joint_angles(landmarks: &[Option<Landmark>]) -> Option<JointAngles> {
    if landmarks.len() < LANDMARK_COUNT {
        return None;
    }
    let at = |i: usize| landmarks[i].filter(Landmark::is_finite);

    let mut angles = JointAngles::new();
    for joint in Joint::ALL {
        if let Some((a, b, c)) = joint.triple() {
            angles.insert(joint, angle_between(at(a), at(b), at(c)));
        }
    }

    let spine = match (at(LEFT_SHOULDER), at(RIGHT_SHOULDER), at(LEFT_HIP), at(RIGHT_HIP)) {
        (Some(ls), Some(rs), Some(lh), Some(rh)) => {
            let shoulders = ls.midpoint(&rs);
            let hips = lh.midpoint(&rh);
            (shoulders.x - hips.x).abs() * PROXY_SCALE
        }
        _ => 0.0,
    };
    angles.insert(Joint::Spine, spine);

    let (left_balance, right_balance) = match (at(LEFT_ANKLE), at(RIGHT_ANKLE)) {
        (Some(la), Some(ra)) => ((ra.y - la.y) * PROXY_SCALE, (la.y - ra.y) * PROXY_SCALE),
        _ => (0.0, 0.0),
    };
    angles.insert(Joint::LeftBalance, left_balance);
    angles.insert(Joint::RightBalance, right_balance);

    Some(angles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures;

    fn lm(x: f64, y: f64) -> Option<Landmark> {
        Some(Landmark::new(x, y))
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_right_angle() {
        let angle = angle_between(lm(1.0, 0.0), lm(0.0, 0.0), lm(0.0, 1.0));
        assert!(approx(angle, 90.0));
    }

    #[test]
    fn test_straight_angle() {
        let angle = angle_between(lm(0.0, 0.5), lm(0.5, 0.5), lm(1.0, 0.5));
        assert!(approx(angle, 180.0));
    }

    #[test]
    fn test_collinear_same_direction_is_zero() {
        let angle = angle_between(lm(0.2, 0.2), lm(0.0, 0.0), lm(0.4, 0.4));
        assert!(angle.abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_inputs_read_zero() {
        // Vertex coincides with one endpoint
        assert_eq!(angle_between(lm(0.5, 0.5), lm(0.5, 0.5), lm(1.0, 0.0)), 0.0);
        // Missing point
        assert_eq!(angle_between(None, lm(0.5, 0.5), lm(1.0, 0.0)), 0.0);
        // Non-finite coordinate
        assert_eq!(angle_between(lm(f64::NAN, 0.0), lm(0.5, 0.5), lm(1.0, 0.0)), 0.0);
    }

    #[test]
    fn test_partial_landmark_set_has_no_reading() {
        let landmarks = vec![lm(0.5, 0.5); LANDMARK_COUNT - 1];
        assert!(extract_joint_angles(&landmarks).is_none());
        assert!(extract_joint_angles(&[]).is_none());
    }

    #[test]
    fn test_extract_t_pose() {
        let angles = extract_joint_angles(&fixtures::t_pose()).unwrap();
        assert_eq!(angles.len(), Joint::ALL.len());
        assert!(approx(angles.get(Joint::LeftShoulder).unwrap(), 90.0));
        assert!(approx(angles.get(Joint::RightShoulder).unwrap(), 90.0));
        assert!(approx(angles.get(Joint::LeftArm).unwrap(), 180.0));
        assert!(approx(angles.get(Joint::RightKnee).unwrap(), 180.0));
        assert!(approx(angles.get(Joint::Spine).unwrap(), 0.0));
    }

    #[test]
    fn test_spine_proxy_scaling() {
        let mut landmarks = fixtures::standing();
        // Shift both shoulders 0.1 to the right of the hips
        for idx in [LEFT_SHOULDER, RIGHT_SHOULDER] {
            let p = landmarks[idx].unwrap();
            landmarks[idx] = lm(p.x + 0.1, p.y);
        }
        let angles = extract_joint_angles(&landmarks).unwrap();
        assert!((angles.get(Joint::Spine).unwrap() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_balance_proxy_is_signed_and_unbounded() {
        let mut landmarks = fixtures::standing();
        let la = landmarks[LEFT_ANKLE].unwrap();
        // Lift the left foot far above the right one
        landmarks[LEFT_ANKLE] = lm(la.x, la.y - 1.5);
        let angles = extract_joint_angles(&landmarks).unwrap();
        let left = angles.get(Joint::LeftBalance).unwrap();
        let right = angles.get(Joint::RightBalance).unwrap();
        assert!((left - 270.0).abs() < 1e-9);
        assert!((right + 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_landmark_reads_zero_for_dependent_joints() {
        let mut landmarks = fixtures::t_pose();
        landmarks[LEFT_ELBOW] = None;
        let angles = extract_joint_angles(&landmarks).unwrap();
        assert_eq!(angles.get(Joint::LeftArm), Some(0.0));
        assert_eq!(angles.get(Joint::LeftShoulder), Some(0.0));
        assert!(approx(angles.get(Joint::RightShoulder).unwrap(), 90.0));
    }

    #[test]
    fn test_joint_name_round_trip() {
        for joint in Joint::ALL {
            assert_eq!(joint.as_str().parse::<Joint>().unwrap(), joint);
        }
        assert!("elbow".parse::<Joint>().is_err());
    }
}
