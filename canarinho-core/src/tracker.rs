//! # In-Tune State Tracking
//!
//! Turns a stream of note assignments into an "in tune" flag plus a one-shot
//! event that fires on the transition into the in-tune band. The feedback
//! collaborator plays its confirmation cue on that event, so it sounds once
//! per tuning rather than once per frame.

use std::fmt;

use crate::tuning::NoteAssignment;

/// Flags produced for one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TuningStatus {
    pub is_in_tune: bool,
    /// True only on the first in-tune assignment after an out-of-tune one
    /// (or after a reset).
    pub just_became_in_tune: bool,
}

/// What the player should do with the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Tuned,
    /// Pitch is flat: increase tension.
    Tighten,
    /// Pitch is sharp: decrease tension.
    Loosen,
}

impl Classification {
    pub fn from_cents(cents: f64, in_tune_cents: f64) -> Self {
        if cents.abs() < in_tune_cents {
            Classification::Tuned
        } else if cents < 0.0 {
            Classification::Tighten
        } else {
            Classification::Loosen
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Tuned => "TUNED",
            Classification::Tighten => "TIGHTEN",
            Classification::Loosen => "LOOSEN",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge-triggered in-tune tracker.
#[derive(Debug, Clone)]
pub struct TuningStateTracker {
    in_tune_cents: f64,
    was_in_tune: bool,
}

impl TuningStateTracker {
    pub fn new(in_tune_cents: f64) -> Self {
        Self {
            in_tune_cents,
            was_in_tune: false,
        }
    }

    pub fn in_tune_cents(&self) -> f64 {
        self.in_tune_cents
    }

    pub fn was_in_tune(&self) -> bool {
        self.was_in_tune
    }

    /// Records one assignment and reports whether it is in tune.
    ///
    /// In tune means `|cents|` strictly below the threshold. The confirmation
    /// flag is an edge trigger: it is set only when the previous assignment
    /// (since the last [`reset`](Self::reset)) was out of tune.
    ///
    /// # Returns
    /// * `TuningStatus` - `is_in_tune` for this assignment and
    ///   `just_became_in_tune` on the out-of-tune to in-tune transition
    pub fn update(&mut self, assignment: &NoteAssignment) -> TuningStatus {
        let is_in_tune = assignment.cents.abs() < self.in_tune_cents;
        let just_became_in_tune = is_in_tune && !self.was_in_tune;
        self.was_in_tune = is_in_tune;
        TuningStatus {
            is_in_tune,
            just_became_in_tune,
        }
    }

    pub fn classify(&self, assignment: &NoteAssignment) -> Classification {
        Classification::from_cents(assignment.cents, self.in_tune_cents)
    }

    /// Forgets the previous in-tune state. Called whenever monitoring restarts.
    pub fn reset(&mut self) {
        self.was_in_tune = false;
    }
}
