//! Domain models - landmarks, joint angles, poses, and routines
//!
//! This module contains the canonical data types used throughout the engine:
//! - `landmark` - normalized body keypoints and pose frames
//! - `angles` - joint angle calculation and extraction
//! - `pose` - target pose definitions and validation results
//! - `catalog` - built-in pose table and default routine
//! - `sequence` - beat-ordered routine of poses

pub mod angles;
pub mod catalog;
pub mod landmark;
pub mod pose;
pub mod sequence;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used types at module level
pub use angles::{angle_between, extract_joint_angles, Joint, JointAngles};
pub use catalog::PoseCatalog;
pub use landmark::{Landmark, PoseFrame};
pub use pose::{JointRule, JointTarget, PoseId, TargetPose, ValidationResult};
pub use sequence::{Step, StretchSequence};
