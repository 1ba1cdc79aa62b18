//! # Tuner Configuration
//!
//! All thresholds used by the detection pipeline live here so they can be
//! tuned without touching the algorithm code. The defaults are empirical
//! values that work for guitar-like sustained tones; they are not physical
//! constants and should be validated against real recordings.
//!
//! Every field has a serde default, so a partial JSON document such as
//! `{ "in_tune_cents": 3.0 }` is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TunerError};

/// Conventional analysis frame size (~46 ms at 44.1 kHz).
pub const DEFAULT_FRAME_LENGTH: usize = 2048;

/// Concert pitch for A4 in Hz.
pub const CONCERT_PITCH: f64 = 440.0;

/// How the autocorrelation curve is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Direct O(L²) sum over all sample pairs.
    #[default]
    Direct,
    /// Zero-padded FFT, O(L log L). Same curve as `Direct` up to rounding.
    Fft,
}

/// Tunable parameters of the tuner pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Absolute cents deviation below which a note counts as in tune.
    pub in_tune_cents: f64,
    /// RMS amplitude below which a frame is treated as silence.
    pub silence_rms: f32,
    /// Amplitude threshold used to find the trim points of the working window.
    pub trim_amplitude: f32,
    /// Number of samples per analysis frame.
    pub frame_length: usize,
    /// Reference frequency of A4 in Hz.
    pub concert_pitch: f64,
    /// Detected frequencies at or below this value are discarded.
    pub min_frequency: f64,
    /// Detected frequencies at or above this value are discarded.
    pub max_frequency: f64,
    pub correlation: CorrelationMethod,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            in_tune_cents: 5.0,
            silence_rms: 0.01,
            trim_amplitude: 0.2,
            frame_length: DEFAULT_FRAME_LENGTH,
            concert_pitch: CONCERT_PITCH,
            min_frequency: 20.0,
            max_frequency: 5000.0,
            correlation: CorrelationMethod::Direct,
        }
    }
}

impl TunerConfig {
    /// Checks that every threshold is usable by the pipeline.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(TunerError::InvalidConfig(format!(
                    "{name} must be a positive finite number, got {value}"
                )))
            }
        }

        positive("in_tune_cents", self.in_tune_cents)?;
        positive("silence_rms", self.silence_rms as f64)?;
        positive("trim_amplitude", self.trim_amplitude as f64)?;
        positive("concert_pitch", self.concert_pitch)?;
        positive("min_frequency", self.min_frequency)?;
        positive("max_frequency", self.max_frequency)?;

        if self.frame_length < 3 {
            return Err(TunerError::InvalidConfig(format!(
                "frame_length must be at least 3 samples, got {}",
                self.frame_length
            )));
        }
        if self.min_frequency >= self.max_frequency {
            return Err(TunerError::InvalidConfig(format!(
                "min_frequency ({}) must be below max_frequency ({})",
                self.min_frequency, self.max_frequency
            )));
        }
        Ok(())
    }

    /// Whether a detected frequency falls inside the accepted musical range.
    pub fn accepts_frequency(&self, frequency: f64) -> bool {
        frequency > self.min_frequency && frequency < self.max_frequency
    }
}
