//! # Pitch Detection Module
//!
//! Estimates the fundamental frequency of a sustained tone with a
//! time-domain autocorrelation and parabolic peak refinement.
//!
//! ## Steps
//! 1. Silence gate on the frame RMS
//! 2. Trim the frame to the span between the first and last quiet samples
//! 3. Autocorrelate the trimmed window (direct sum or FFT)
//! 4. Skip the descending slope after the zero-lag peak
//! 5. Take the highest remaining correlation as the period
//! 6. Parabolic interpolation for sub-sample accuracy
//!
//! The cost is O(L²) in the trimmed length with the direct method, which
//! dominates the whole pipeline. `CorrelationMethod::Fft` brings it down to
//! O(L log L) for larger frames.

use tracing::trace;

use crate::config::{CorrelationMethod, TunerConfig};
use crate::fft::FftCorrelator;
use crate::frame::AudioFrame;

/// Outcome of one detection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchEstimate {
    /// Estimated fundamental frequency in Hz.
    Frequency(f64),
    /// The frame was too quiet (or too short) to carry a pitch.
    NoSignal,
}

impl PitchEstimate {
    pub fn frequency(&self) -> Option<f64> {
        match self {
            PitchEstimate::Frequency(freq) => Some(*freq),
            PitchEstimate::NoSignal => None,
        }
    }
}

/// Autocorrelation pitch detector.
///
/// Keeps its correlation scratch buffers between calls, so one detector
/// should be reused for every frame of a session. The detector does not
/// enforce a musical range; callers filter implausible frequencies.
#[derive(Debug)]
pub struct PitchDetector {
    silence_rms: f32,
    trim_amplitude: f32,
    method: CorrelationMethod,
    correlation: Vec<f64>,
    fft: FftCorrelator,
}

impl PitchDetector {
    pub fn new(config: &TunerConfig) -> Self {
        Self {
            silence_rms: config.silence_rms,
            trim_amplitude: config.trim_amplitude,
            method: config.correlation,
            correlation: Vec::with_capacity(config.frame_length),
            fft: FftCorrelator::new(),
        }
    }

    /// Estimates the fundamental frequency of `frame`.
    ///
    /// # Arguments
    /// * `frame` - Mono samples in [-1, 1] with their sample rate
    ///
    /// # Returns
    /// * `Frequency(hz)` - Refined fundamental, not yet checked against any
    ///   musical range
    /// * `NoSignal` - The frame is below the silence gate, shorter than three
    ///   samples, or its correlation has no interior peak (sub-audio content,
    ///   DC offset)
    pub fn detect(&mut self, frame: &AudioFrame) -> PitchEstimate {
        let samples = frame.samples();
        if samples.len() < 3 {
            return PitchEstimate::NoSignal;
        }

        // --- Silence gate ---
        let rms = frame.rms();
        if rms < self.silence_rms {
            trace!(rms, "frame below silence gate");
            return PitchEstimate::NoSignal;
        }

        // --- Trim to the dominant oscillation ---
        let (start, end) = trim_bounds(samples, self.trim_amplitude);
        let window = &samples[start..end];
        if window.len() < 3 {
            return PitchEstimate::NoSignal;
        }

        match self.method {
            CorrelationMethod::Direct => autocorrelate_direct(window, &mut self.correlation),
            CorrelationMethod::Fft => self.fft.autocorrelate(window, &mut self.correlation),
        }

        let Some(period) = find_period(&self.correlation) else {
            return PitchEstimate::NoSignal;
        };

        let frequency = frame.sample_rate() as f64 / period;
        trace!(start, end, period, frequency, "pitch estimate");

        if frequency.is_finite() && frequency > 0.0 {
            PitchEstimate::Frequency(frequency)
        } else {
            PitchEstimate::NoSignal
        }
    }
}

/// Finds the working window `[start, end)` of a frame.
///
/// `start` is the first sample in the first half whose magnitude is below
/// `threshold`; `end` is the last such sample in the second half. A side with
/// no qualifying sample keeps the untrimmed bound (`0` or `len - 1`).
pub fn trim_bounds(samples: &[f32], threshold: f32) -> (usize, usize) {
    let len = samples.len();
    let half = len / 2;

    let start = samples[..half]
        .iter()
        .position(|s| s.abs() < threshold)
        .unwrap_or(0);

    let end = (1..half)
        .map(|offset| len - offset)
        .find(|&i| samples[i].abs() < threshold)
        .unwrap_or(len.saturating_sub(1));

    if start < end { (start, end) } else { (0, len.saturating_sub(1)) }
}

/// Direct autocorrelation: `out[τ] = Σ signal[i]·signal[i+τ]` for every lag.
pub(crate) fn autocorrelate_direct(signal: &[f32], out: &mut Vec<f64>) {
    out.clear();
    out.extend((0..signal.len()).map(|lag| {
        signal[..signal.len() - lag]
            .iter()
            .zip(&signal[lag..])
            .map(|(&a, &b)| a as f64 * b as f64)
            .sum::<f64>()
    }));
}

/// Locates the period, in fractional samples, from an autocorrelation curve.
fn find_period(correlation: &[f64]) -> Option<f64> {
    let len = correlation.len();
    if len < 2 {
        return None;
    }

    // --- Skip the zero-lag peak and its initial decay ---
    let mut start = 0;
    while start + 1 < len && correlation[start] > correlation[start + 1] {
        start += 1;
    }

    // --- Highest correlation after the descent (earliest wins ties) ---
    let mut best_lag = start;
    let mut best_value = correlation[start];
    for (lag, &value) in correlation.iter().enumerate().skip(start + 1) {
        if value > best_value {
            best_value = value;
            best_lag = lag;
        }
    }

    // --- Peak on the edge of the curve: no neighbours, no period ---
    if best_lag == 0 || best_lag + 1 == len {
        return None;
    }

    // --- Parabolic interpolation around the peak ---
    let period = best_lag as f64
        + parabolic_shift(
            correlation[best_lag - 1],
            correlation[best_lag],
            correlation[best_lag + 1],
        );

    (period.is_finite() && period > 0.0).then_some(period)
}

/// Offset of the vertex of the parabola through `(-1, y1)`, `(0, y2)`, `(1, y3)`.
///
/// Zero curvature has no vertex; the integer peak is kept.
fn parabolic_shift(y1: f64, y2: f64, y3: f64) -> f64 {
    let a = (y1 + y3 - 2.0 * y2) / 2.0;
    let b = (y3 - y1) / 2.0;
    if a == 0.0 { 0.0 } else { -b / (2.0 * a) }
}
