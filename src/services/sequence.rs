//! Stretch sequence controller - beat-driven progression through a routine
//!
//! State machine: `Idle` -> `InSequence { index, window }` -> `Complete`.
//! A scoring window opens when the beat lands exactly on the active step's
//! beat and stays open for `window_beats` further beats (inclusive).

use crate::domain::sequence::{Step, StretchSequence};
use std::sync::Arc;
use tracing::debug;

/// Default scoring window width in beats
pub const DEFAULT_WINDOW_BEATS: u32 = 2;

/// Default beats after the last step before the routine completes
pub const DEFAULT_TAIL_BEATS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSettings {
    pub window_beats: u32,
    pub tail_beats: u32,
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self { window_beats: DEFAULT_WINDOW_BEATS, tail_beats: DEFAULT_TAIL_BEATS }
    }
}

/// Beat interval during which the step at `step` can be credited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringWindow {
    pub step: usize,
    pub start: u32,
    pub end: u32,
    pub scored: bool,
}

impl ScoringWindow {
    #[inline]
    pub fn contains(&self, beat: u32) -> bool {
        beat >= self.start && beat <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePhase {
    Idle,
    InSequence { index: usize, window: Option<ScoringWindow> },
    Complete,
}

impl SequencePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequencePhase::Idle => "idle",
            SequencePhase::InSequence { .. } => "in_sequence",
            SequencePhase::Complete => "complete",
        }
    }
}

/// What changed during one beat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeatOutcome {
    pub window_opened: Option<ScoringWindow>,
    pub window_closed: Option<ScoringWindow>,
    pub completed: bool,
}

pub struct SequenceController {
    sequence: Arc<StretchSequence>,
    settings: SequenceSettings,
    phase: SequencePhase,
    beat: u32,
}

impl SequenceController {
    pub fn new(sequence: Arc<StretchSequence>, settings: SequenceSettings) -> Self {
        Self { sequence, settings, phase: SequencePhase::Idle, beat: 0 }
    }

    /// Enter the sequence at beat 0 with no open window
    ///
    /// Restarting from any phase discards the previous progress.
    pub fn start(&mut self) {
        self.beat = 0;
        self.phase = SequencePhase::InSequence { index: 0, window: None };
    }

    /// Drop back to `Idle` without completing
    pub fn reset(&mut self) {
        self.beat = 0;
        self.phase = SequencePhase::Idle;
    }

    /// First beat at which the routine counts as finished
    ///
    /// Saturates at `u32::MAX` so an extreme routine still plays every step.
    pub fn completion_beat(&self) -> u32 {
        self.sequence.last_beat().saturating_add(self.settings.tail_beats)
    }

    /// Process the beat clock reaching `beat`
    ///
    /// Beats that do not advance the clock, or arrive outside `InSequence`,
    /// change nothing.
    pub fn on_beat(&mut self, beat: u32) -> BeatOutcome {
        let mut outcome = BeatOutcome::default();
        let SequencePhase::InSequence { index, window } = self.phase else {
            return outcome;
        };
        if beat <= self.beat {
            return outcome;
        }
        self.beat = beat;

        let mut index = index;
        let mut window = window;

        if let Some(active) = self.sequence.active_index(beat) {
            index = index.max(active);
            let step_beat = self.sequence.get(index).map(|s| s.beat);

            if step_beat == Some(beat) {
                let opened = ScoringWindow {
                    step: index,
                    start: beat,
                    end: beat.saturating_add(self.settings.window_beats),
                    scored: false,
                };
                outcome.window_closed = window.filter(|w| w.step != index);
                outcome.window_opened = Some(opened);
                window = Some(opened);
                debug!(beat = %beat, step = %index, end = %opened.end, "window_opened");
            } else if let Some(open) = window.filter(|w| beat > w.end) {
                outcome.window_closed = Some(open);
                window = None;
                debug!(beat = %beat, step = %open.step, scored = %open.scored, "window_closed");
            }
        }

        if beat >= self.completion_beat() {
            if outcome.window_closed.is_none() {
                outcome.window_closed = window;
            }
            outcome.completed = true;
            self.phase = SequencePhase::Complete;
        } else {
            self.phase = SequencePhase::InSequence { index, window };
        }
        outcome
    }

    /// Mark the open window as scored if `beat` falls inside it
    ///
    /// Returns true only for the first credit of a window.
    pub fn credit(&mut self, beat: u32) -> bool {
        if let SequencePhase::InSequence { window: Some(window), .. } = &mut self.phase {
            if window.contains(beat) && !window.scored {
                window.scored = true;
                return true;
            }
        }
        false
    }

    pub fn phase(&self) -> SequencePhase {
        self.phase
    }

    pub fn beat(&self) -> u32 {
        self.beat
    }

    pub fn window(&self) -> Option<ScoringWindow> {
        match self.phase {
            SequencePhase::InSequence { window, .. } => window,
            _ => None,
        }
    }

    /// The step currently shown to the player
    pub fn active_step(&self) -> Option<&Step> {
        match self.phase {
            SequencePhase::InSequence { index, .. } => self.sequence.get(index),
            _ => None,
        }
    }

    /// The step whose window is open, if any
    pub fn scoring_step(&self) -> Option<&Step> {
        self.window().and_then(|w| self.sequence.get(w.step))
    }

    pub fn sequence(&self) -> &Arc<StretchSequence> {
        &self.sequence
    }

    pub fn settings(&self) -> SequenceSettings {
        self.settings
    }
}
