//! Built-in stretch poses and the default routine

use crate::domain::angles::Joint::*;
use crate::domain::pose::{JointTarget, PoseId, TargetPose};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Beats between consecutive poses in the default routine
pub const DEFAULT_ROUTINE_SPACING: u32 = 4;

fn builtin_poses() -> Vec<TargetPose> {
    vec![
        TargetPose::new(
            "ARMS_UP",
            "Arms Up",
            "Reach both arms straight overhead",
            30.0,
            &[
                JointTarget::at_least(LeftShoulder, 160.0),
                JointTarget::at_least(RightShoulder, 160.0),
                JointTarget::at_least(LeftArm, 160.0),
                JointTarget::at_least(RightArm, 160.0),
            ],
        ),
        TargetPose::new(
            "T_POSE",
            "T Pose",
            "Arms straight out to the sides at shoulder height",
            25.0,
            &[
                JointTarget::nearest(LeftShoulder, 90.0),
                JointTarget::nearest(RightShoulder, 90.0),
                JointTarget::at_least(LeftArm, 170.0),
                JointTarget::at_least(RightArm, 170.0),
            ],
        ),
        TargetPose::new(
            "WARRIOR",
            "Warrior II",
            "Arms out, front knee bent, back leg straight",
            25.0,
            &[
                JointTarget::nearest(LeftShoulder, 90.0),
                JointTarget::nearest(RightShoulder, 90.0),
                JointTarget::nearest(LeftKnee, 110.0),
                JointTarget::at_least(RightKnee, 165.0),
            ],
        ),
        TargetPose::new(
            "SIDE_BEND",
            "Side Bend",
            "Raise the left arm and lean the torso to the side",
            20.0,
            &[JointTarget::at_least(LeftShoulder, 150.0), JointTarget::at_least(Spine, 15.0)],
        ),
        TargetPose::new(
            "FORWARD_FOLD",
            "Forward Fold",
            "Hinge at the hips with straight legs",
            25.0,
            &[
                JointTarget::at_most(LeftHip, 70.0),
                JointTarget::at_most(RightHip, 70.0),
                JointTarget::at_least(LeftKnee, 160.0),
                JointTarget::at_least(RightKnee, 160.0),
            ],
        ),
        TargetPose::new(
            "QUAD_STRETCH",
            "Quad Stretch",
            "Pull the left heel toward the glutes while standing tall",
            25.0,
            &[JointTarget::at_most(LeftKnee, 50.0), JointTarget::at_least(RightKnee, 165.0)],
        ),
        TargetPose::new(
            "TREE_POSE",
            "Tree Pose",
            "Balance on the right leg with the left foot lifted",
            25.0,
            &[
                JointTarget::at_least(RightKnee, 165.0),
                JointTarget::at_most(LeftKnee, 70.0),
                JointTarget::at_least(LeftBalance, 10.0),
            ],
        ),
        TargetPose::new(
            "HIP_FLEXOR_LUNGE",
            "Hip Flexor Lunge",
            "Open the left hip while the right leg steps forward",
            20.0,
            &[JointTarget::at_least(LeftHip, 150.0), JointTarget::at_most(RightHip, 115.0)],
        ),
        TargetPose::new(
            "COBRA",
            "Cobra",
            "Press the chest up with straight arms and open hips",
            25.0,
            &[
                JointTarget::at_least(LeftHip, 140.0),
                JointTarget::at_least(RightHip, 140.0),
                JointTarget::at_least(LeftArm, 150.0),
                JointTarget::at_least(RightArm, 150.0),
            ],
        ),
        TargetPose::new(
            "SQUAT",
            "Squat",
            "Sit back until thighs are level",
            25.0,
            &[
                JointTarget::nearest(LeftKnee, 90.0),
                JointTarget::nearest(RightKnee, 90.0),
                JointTarget::nearest(LeftHip, 90.0),
                JointTarget::nearest(RightHip, 90.0),
            ],
        ),
        TargetPose::new(
            "STAR",
            "Star",
            "Arms raised in a wide V above the shoulders",
            25.0,
            &[
                JointTarget::nearest(LeftShoulder, 135.0),
                JointTarget::nearest(RightShoulder, 135.0),
                JointTarget::at_least(LeftArm, 165.0),
                JointTarget::at_least(RightArm, 165.0),
            ],
        ),
    ]
}

/// Immutable-after-load set of named poses, in definition order
#[derive(Debug, Clone, Default)]
pub struct PoseCatalog {
    poses: Vec<Arc<TargetPose>>,
    by_id: FxHashMap<PoseId, usize>,
}

impl PoseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical 11-pose table
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for pose in builtin_poses() {
            catalog.insert(pose);
        }
        catalog
    }

    /// Add a pose, replacing any existing pose with the same id in place
    pub fn insert(&mut self, pose: TargetPose) {
        let id = pose.id.clone();
        let pose = Arc::new(pose);
        match self.by_id.get(&id) {
            Some(&idx) => self.poses[idx] = pose,
            None => {
                self.by_id.insert(id, self.poses.len());
                self.poses.push(pose);
            }
        }
    }

    pub fn get(&self, id: &PoseId) -> Option<Arc<TargetPose>> {
        self.by_id.get(id).map(|&idx| self.poses[idx].clone())
    }

    pub fn contains(&self, id: &PoseId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TargetPose>> {
        self.poses.iter()
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

/// Every built-in pose once, four beats apart starting at beat 4
pub fn default_routine() -> Vec<(u32, PoseId)> {
    builtin_poses()
        .into_iter()
        .enumerate()
        .map(|(i, pose)| ((i as u32 + 1) * DEFAULT_ROUTINE_SPACING, pose.id))
        .collect()
}
