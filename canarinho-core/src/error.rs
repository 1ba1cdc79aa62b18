//! Error type for the tuner core.
//!
//! Weak signals, out-of-range pitches and degenerate interpolation are not
//! errors: they are ordinary values on the detection path. `TunerError` only
//! covers configuration mistakes and frame-source failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TunerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The frame source could not be opened or stopped delivering frames
    /// (no device, permission denied, stream error).
    #[error("frame source: {0}")]
    Acquisition(String),

    #[error("frame length mismatch: expected {expected} samples, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    #[error("frame source disconnected")]
    Disconnected,

    #[error("tuner session is not running")]
    NotRunning,

    #[error("scheduler thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, TunerError>;
