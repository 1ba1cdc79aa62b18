//! # Frequency-Domain Autocorrelation
//!
//! Computes the same linear autocorrelation curve as the direct O(L²) pass,
//! using the Wiener-Khinchin relation `r = IFFT(|FFT(x)|²)`.
//!
//! The signal is zero-padded to a power of two of at least `2L` so the
//! circular correlation produced by the FFT does not wrap around; the first
//! `L` bins of the result are then exactly the linear correlation for lags
//! `0..L`.

use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

/// Reusable FFT state for autocorrelation.
///
/// Plans are rebuilt only when the padded size changes, and the complex
/// buffer is reused between frames so steady-state detection does not
/// allocate.
#[derive(Default)]
pub struct FftCorrelator {
    plans: Option<(usize, Arc<dyn Fft<f64>>, Arc<dyn Fft<f64>>)>,
    buffer: Vec<Complex<f64>>,
}

impl std::fmt::Debug for FftCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftCorrelator")
            .field("buffer_len", &self.buffer.len())
            .finish()
    }
}

impl FftCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    fn plans(&mut self, size: usize) -> (Arc<dyn Fft<f64>>, Arc<dyn Fft<f64>>) {
        match &self.plans {
            Some((planned, forward, inverse)) if *planned == size => {
                (Arc::clone(forward), Arc::clone(inverse))
            }
            _ => {
                let mut planner = FftPlanner::new();
                let forward = planner.plan_fft_forward(size);
                let inverse = planner.plan_fft_inverse(size);
                self.plans = Some((size, Arc::clone(&forward), Arc::clone(&inverse)));
                (forward, inverse)
            }
        }
    }

    /// Writes `c[τ] = Σ x[i]·x[i+τ]` for `τ in 0..signal.len()` into `out`.
    pub fn autocorrelate(&mut self, signal: &[f32], out: &mut Vec<f64>) {
        out.clear();
        let len = signal.len();
        if len == 0 {
            return;
        }

        let padded = (2 * len).next_power_of_two();
        self.buffer.clear();
        self.buffer
            .extend(signal.iter().map(|&s| Complex { re: s as f64, im: 0.0 }));
        self.buffer.resize(padded, Complex { re: 0.0, im: 0.0 });

        let (forward, inverse) = self.plans(padded);
        forward.process(&mut self.buffer);

        // Power spectrum
        for bin in self.buffer.iter_mut() {
            *bin = Complex { re: bin.norm_sqr(), im: 0.0 };
        }

        inverse.process(&mut self.buffer);

        // rustfft does not normalize the inverse transform.
        let scale = 1.0 / padded as f64;
        out.extend(self.buffer.iter().take(len).map(|c| c.re * scale));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::autocorrelate_direct;
    use approx::assert_relative_eq;

    #[test]
    fn matches_direct_correlation() {
        let signal: Vec<f32> = (0..300)
            .map(|i| {
                let t = i as f32 / 44_100.0;
                0.6 * (2.0 * std::f32::consts::PI * 330.0 * t).sin()
                    + 0.2 * (2.0 * std::f32::consts::PI * 990.0 * t).sin()
            })
            .collect();

        let mut direct = Vec::new();
        autocorrelate_direct(&signal, &mut direct);

        let mut correlator = FftCorrelator::new();
        let mut via_fft = Vec::new();
        correlator.autocorrelate(&signal, &mut via_fft);

        assert_eq!(direct.len(), via_fft.len());
        for (d, f) in direct.iter().zip(&via_fft) {
            assert_relative_eq!(*d, *f, epsilon = 1e-6);
        }
    }

    #[test]
    fn empty_signal_yields_empty_curve() {
        let mut correlator = FftCorrelator::new();
        let mut out = vec![1.0, 2.0];
        correlator.autocorrelate(&[], &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn reuses_buffers_across_sizes() {
        let mut correlator = FftCorrelator::new();
        let mut out = Vec::new();
        correlator.autocorrelate(&[1.0, 0.0, -1.0, 0.0], &mut out);
        assert_eq!(out.len(), 4);
        assert_relative_eq!(out[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(out[2], -1.0, epsilon = 1e-9);

        correlator.autocorrelate(&[0.5, 0.5], &mut out);
        assert_eq!(out.len(), 2);
        assert_relative_eq!(out[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(out[1], 0.25, epsilon = 1e-9);
    }
}
