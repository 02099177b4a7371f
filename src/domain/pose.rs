//! Target pose definitions and per-frame validation results

use crate::domain::angles::Joint;
use serde::{Deserialize, Serialize};

/// Stable pose key (e.g. `T_POSE`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseId(pub String);

impl PoseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PoseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PoseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How a joint reading is compared against its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointRule {
    /// Absolute difference from target, falloff in both directions
    #[default]
    Nearest,
    /// Full marks at or above target, falloff below
    AtLeast,
    /// Full marks at or below target, falloff above
    AtMost,
}

impl JointRule {
    /// Degrees by which `current` misses the target under this rule (never negative)
    #[inline]
    pub fn excess(&self, current: f64, target: f64) -> f64 {
        match self {
            JointRule::Nearest => (current - target).abs(),
            JointRule::AtLeast => (target - current).max(0.0),
            JointRule::AtMost => (current - target).max(0.0),
        }
    }
}

/// One joint's requirement within a pose
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointTarget {
    pub joint: Joint,
    pub target: f64,
    #[serde(default)]
    pub rule: JointRule,
}

impl JointTarget {
    pub const fn nearest(joint: Joint, target: f64) -> Self {
        Self { joint, target, rule: JointRule::Nearest }
    }

    pub const fn at_least(joint: Joint, target: f64) -> Self {
        Self { joint, target, rule: JointRule::AtLeast }
    }

    pub const fn at_most(joint: Joint, target: f64) -> Self {
        Self { joint, target, rule: JointRule::AtMost }
    }
}

/// A stretch the player has to hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPose {
    pub id: PoseId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Degrees over which a joint score falls from 100 to 0
    pub tolerance: f64,
    pub joints: Vec<JointTarget>,
}

impl TargetPose {
    pub fn new(id: &str, name: &str, description: &str, tolerance: f64, joints: &[JointTarget]) -> Self {
        Self {
            id: PoseId::new(id),
            name: name.to_string(),
            description: description.to_string(),
            tolerance,
            joints: joints.to_vec(),
        }
    }

    pub fn target_for(&self, joint: Joint) -> Option<&JointTarget> {
        self.joints.iter().find(|t| t.joint == joint)
    }
}

/// Outcome of comparing one frame against a target pose
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// 0-100
    pub score: u8,
    pub is_match: bool,
    pub feedback: String,
}

impl ValidationResult {
    pub fn no_pose() -> Self {
        Self { score: 0, is_match: false, feedback: "No pose detected".to_string() }
    }
}
