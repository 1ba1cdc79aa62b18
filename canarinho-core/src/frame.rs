//! A single block of time-domain samples handed to the detector.

/// An immutable snapshot of consecutive mono samples captured at `sample_rate`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Root-mean-square amplitude over the whole frame. Zero for an empty frame.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        (self.samples.iter().map(|&s| s * s).sum::<f32>() / self.samples.len() as f32).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rms_of_constant_signal() {
        let frame = AudioFrame::new(vec![0.5; 64], 44_100);
        assert_relative_eq!(frame.rms(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn rms_of_empty_frame_is_zero() {
        let frame = AudioFrame::new(Vec::new(), 44_100);
        assert!(frame.is_empty());
        assert_eq!(frame.rms(), 0.0);
    }
}
