// canarinho-core/src/lib.rs

//! The core logic for the Canarinho instrument tuner.
//! This crate estimates the pitch of a sustained tone, maps it onto the
//! nearest equal-tempered note and tracks when the tone comes into tune.
//! It is completely headless: it does not capture audio (except through the
//! optional `capture` feature), render anything or play sounds.
//!
//! Per cycle: [`source::FrameSource`] → [`pitch::PitchDetector`] →
//! [`tuning::NoteMapper`] → [`tracker::TuningStateTracker`] →
//! [`scheduler::ResultSink`].

#[cfg(feature = "capture")]
pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod frame;
pub mod pitch;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod tracker;
pub mod tuning;

pub use config::{CorrelationMethod, TunerConfig};
pub use error::{Result, TunerError};
pub use frame::AudioFrame;
pub use pitch::{PitchDetector, PitchEstimate};
pub use scheduler::{ResultSink, RunSummary, Scheduler, SchedulerHandle, StopReason};
pub use session::{CycleOutcome, TunerSession};
pub use tracker::{Classification, TuningStateTracker, TuningStatus};
pub use tuning::{NoteAssignment, NoteMapper, map_to_note};

/// Represents the result of a single cycle that produced a usable pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningReading {
    /// The nearest note and the deviation from it.
    pub assignment: NoteAssignment,
    pub is_in_tune: bool,
    /// Set on the one cycle where the tone entered the in-tune band.
    pub just_became_in_tune: bool,
    pub classification: Classification,
}
