//! Pose validation - scores a frame's joint angles against a target pose

use crate::domain::angles::{extract_joint_angles, Joint, JointAngles};
use crate::domain::landmark::PoseFrame;
use crate::domain::pose::{JointTarget, TargetPose, ValidationResult};
use smallvec::SmallVec;

/// Score at or above which a frame counts as a match
pub const DEFAULT_MATCH_THRESHOLD: u8 = 75;

/// Maximum number of joints named in corrective feedback
const FEEDBACK_JOINTS: usize = 2;

const MATCHED_FEEDBACK: &str = "Great! Pose matched";
const OUT_OF_VIEW_FEEDBACK: &str = "Move fully into view";

/// Per-joint breakdown used to build the final score and feedback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointScore {
    pub joint: Joint,
    pub current: f64,
    pub target: f64,
    pub score: f64,
}

/// 0-100 score for a single joint reading
///
/// Falls linearly from 100 to 0 as the rule's excess grows to `tolerance`.
/// A non-positive tolerance only accepts an exact hit.
pub fn joint_score(current: f64, target: &JointTarget, tolerance: f64) -> f64 {
    let excess = target.rule.excess(current, target.target);
    if tolerance.is_nan() || tolerance <= 0.0 {
        return if excess == 0.0 { 100.0 } else { 0.0 };
    }
    (100.0 - 100.0 * excess / tolerance).max(0.0)
}

#[derive(Debug, Clone, Copy)]
pub struct PoseValidator {
    match_threshold: u8,
}

impl Default for PoseValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

impl PoseValidator {
    pub fn new(match_threshold: u8) -> Self {
        Self { match_threshold: match_threshold.min(100) }
    }

    pub fn match_threshold(&self) -> u8 {
        self.match_threshold
    }

    /// Per-joint scores for every target joint present in the reading
    pub fn joint_scores(&self, angles: &JointAngles, pose: &TargetPose) -> SmallVec<[JointScore; 8]> {
        pose.joints
            .iter()
            .filter_map(|target| {
                let current = angles.get(target.joint).filter(|v| v.is_finite())?;
                Some(JointScore {
                    joint: target.joint,
                    current,
                    target: target.target,
                    score: joint_score(current, target, pose.tolerance),
                })
            })
            .collect()
    }

    /// Compare a reading against `pose`
    ///
    /// Joints missing from the reading are skipped rather than penalized.
    pub fn validate(&self, angles: Option<&JointAngles>, pose: &TargetPose) -> ValidationResult {
        let Some(angles) = angles else {
            return ValidationResult::no_pose();
        };

        let scores = self.joint_scores(angles, pose);
        if scores.is_empty() {
            return ValidationResult {
                score: 0,
                is_match: false,
                feedback: OUT_OF_VIEW_FEEDBACK.to_string(),
            };
        }

        let mean = scores.iter().map(|s| s.score).sum::<f64>() / scores.len() as f64;
        let score = mean.round().clamp(0.0, 100.0) as u8;
        let is_match = score >= self.match_threshold;

        let feedback = if is_match { MATCHED_FEEDBACK.to_string() } else { corrective_feedback(&scores) };

        ValidationResult { score, is_match, feedback }
    }
}

/// Hint naming the joints furthest from their targets
fn corrective_feedback(scores: &[JointScore]) -> String {
    let mut worst: SmallVec<[&JointScore; 8]> = scores.iter().filter(|s| s.score < 100.0).collect();
    // Stable sort keeps pose definition order among equal scores
    worst.sort_by(|a, b| a.score.total_cmp(&b.score));

    let hints: Vec<String> = worst
        .iter()
        .take(FEEDBACK_JOINTS)
        .map(|s| {
            let verb = if s.current < s.target { "increase" } else { "decrease" };
            format!("{} {}", verb, s.joint.label())
        })
        .collect();

    if hints.is_empty() {
        return "Almost there".to_string();
    }
    let mut text = hints.join(", ");
    if let Some(first) = text.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    text
}

/// Joint angles for one frame plus, when a target is active, its validation
#[derive(Debug, Clone)]
pub struct FrameEvaluation {
    pub angles: Option<JointAngles>,
    pub validation: Option<ValidationResult>,
}

/// Evaluate one frame against the currently active target, if any
pub fn evaluate_frame(
    frame: &PoseFrame,
    target: Option<&TargetPose>,
    validator: &PoseValidator,
) -> FrameEvaluation {
    let angles = extract_joint_angles(&frame.landmarks);
    let validation = target.map(|pose| validator.validate(angles.as_ref(), pose));
    FrameEvaluation { angles, validation }
}
