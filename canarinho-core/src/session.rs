//! # Tuner Session
//!
//! Owns everything that lives for one monitoring session: the detector and
//! its scratch buffers, the note mapper, the in-tune tracker and the last
//! reading. `start()` and `stop()` bracket a session; stopping discards all
//! per-cycle state so a later restart begins clean.
//!
//! `process_frame` runs one full cycle synchronously, so the pipeline can be
//! driven frame by frame without any scheduler or display loop.

use tracing::{debug, info};

use crate::TuningReading;
use crate::config::TunerConfig;
use crate::error::{Result, TunerError};
use crate::frame::AudioFrame;
use crate::pitch::{PitchDetector, PitchEstimate};
use crate::tracker::TuningStateTracker;
use crate::tuning::NoteMapper;

/// What one cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Reading(TuningReading),
    /// The frame was below the silence gate.
    NoSignal,
    /// A pitch was found but lies outside the accepted range (Hz).
    OutOfRange(f64),
}

#[derive(Debug)]
pub struct TunerSession {
    config: TunerConfig,
    detector: PitchDetector,
    mapper: NoteMapper,
    tracker: TuningStateTracker,
    running: bool,
    current: Option<TuningReading>,
}

impl TunerSession {
    /// Builds an idle session. Fails if the configuration is unusable.
    pub fn new(config: TunerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            detector: PitchDetector::new(&config),
            mapper: NoteMapper::new(config.concert_pitch),
            tracker: TuningStateTracker::new(config.in_tune_cents),
            running: false,
            current: None,
            config,
        })
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the previous reading was in tune.
    pub fn was_in_tune(&self) -> bool {
        self.tracker.was_in_tune()
    }

    /// The most recent reading. Cycles without a usable pitch leave it as is.
    pub fn current(&self) -> Option<&TuningReading> {
        self.current.as_ref()
    }

    /// Begins monitoring with a fresh in-tune state.
    pub fn start(&mut self) {
        self.tracker.reset();
        self.current = None;
        self.running = true;
        info!("tuner session started");
    }

    /// Ends monitoring and drops the per-cycle state.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.current = None;
        self.tracker.reset();
        info!("tuner session stopped");
    }

    /// Runs detection, note mapping and in-tune tracking on one frame.
    ///
    /// Silence and out-of-range pitches are ordinary outcomes and leave the
    /// tracker untouched. Errors are reserved for misuse: a stopped session or
    /// a frame of the wrong length.
    pub fn process_frame(&mut self, frame: &AudioFrame) -> Result<CycleOutcome> {
        if !self.running {
            return Err(TunerError::NotRunning);
        }
        if frame.len() != self.config.frame_length {
            return Err(TunerError::FrameLength {
                expected: self.config.frame_length,
                actual: frame.len(),
            });
        }

        let frequency = match self.detector.detect(frame) {
            PitchEstimate::NoSignal => return Ok(CycleOutcome::NoSignal),
            PitchEstimate::Frequency(freq) => freq,
        };
        if !self.config.accepts_frequency(frequency) {
            debug!(frequency, "pitch outside accepted range");
            return Ok(CycleOutcome::OutOfRange(frequency));
        }

        let assignment = self.mapper.map_to_note(frequency);
        let status = self.tracker.update(&assignment);
        let reading = TuningReading {
            classification: self.tracker.classify(&assignment),
            is_in_tune: status.is_in_tune,
            just_became_in_tune: status.just_became_in_tune,
            assignment,
        };
        debug!(
            note = %reading.assignment.label(),
            cents = reading.assignment.cents,
            frequency,
            in_tune = reading.is_in_tune,
            "cycle reading"
        );

        self.current = Some(reading.clone());
        Ok(CycleOutcome::Reading(reading))
    }
}
