//! Ordered routine of target poses keyed by beat

use crate::domain::catalog::PoseCatalog;
use crate::domain::pose::{PoseId, TargetPose};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SequenceError {
    #[error("routine references unknown pose '{0}'")]
    UnknownPose(PoseId),
}

/// A pose scheduled at a beat
#[derive(Debug, Clone)]
pub struct Step {
    pub beat: u32,
    pub pose: Arc<TargetPose>,
}

/// Steps sorted by beat; equal beats keep insertion order
#[derive(Debug, Clone, Default)]
pub struct StretchSequence {
    steps: Vec<Step>,
}

impl StretchSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `(beat, pose id)` pairs against a catalog
    pub fn from_routine(routine: &[(u32, PoseId)], catalog: &PoseCatalog) -> Result<Self, SequenceError> {
        let mut sequence = Self::new();
        for (beat, id) in routine {
            let pose = catalog.get(id).ok_or_else(|| SequenceError::UnknownPose(id.clone()))?;
            sequence.add_step(*beat, pose);
        }
        Ok(sequence)
    }

    /// Insert a step, keeping the sequence sorted by beat
    pub fn add_step(&mut self, beat: u32, pose: Arc<TargetPose>) {
        let at = self.steps.partition_point(|s| s.beat <= beat);
        self.steps.insert(at, Step { beat, pose });
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Beat of the final step, 0 for an empty routine
    pub fn last_beat(&self) -> u32 {
        self.steps.last().map(|s| s.beat).unwrap_or(0)
    }

    /// Index of the last step scheduled at or before `beat`
    ///
    /// Before the first step this is the first step. `None` only when empty.
    pub fn active_index(&self, beat: u32) -> Option<usize> {
        if self.steps.is_empty() {
            return None;
        }
        let upto = self.steps.partition_point(|s| s.beat <= beat);
        Some(upto.saturating_sub(1))
    }
}
