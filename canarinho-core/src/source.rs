//! # Frame Sources
//!
//! The tuner core never captures audio itself. A [`FrameSource`] is acquired
//! when a session starts and hands back a [`FrameStream`]; dropping the
//! stream releases whatever the source holds (device stream, file, channel).
//! The scheduler polls the stream once per tick.
//!
//! Provided sources:
//! - [`ToneSource`]: a synthetic sine, for demos and tests
//! - [`SampleSource`]: pre-recorded samples cut into consecutive frames
//! - [`MailboxSource`]: frames pushed from another thread (e.g. an audio
//!   callback) through a single-slot channel

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use tracing::debug;

use crate::error::{Result, TunerError};
use crate::frame::AudioFrame;

/// Result of polling a stream for the next frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FramePoll {
    Frame(AudioFrame),
    /// No complete frame is available yet; try again next tick.
    Pending,
    /// The source has no more frames.
    Exhausted,
}

/// Something that can be opened to deliver audio frames.
pub trait FrameSource {
    /// Opens the source. The returned stream owns the acquired resources and
    /// releases them when dropped.
    fn acquire(&mut self) -> Result<Box<dyn FrameStream>>;
}

/// An acquired, open stream of frames.
pub trait FrameStream {
    fn poll_frame(&mut self) -> Result<FramePoll>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn acquire(&mut self) -> Result<Box<dyn FrameStream>> {
        (**self).acquire()
    }
}

// ---------------------------------------------------------------------------
// Synthetic tone
// ---------------------------------------------------------------------------

/// Generates a pure sine tone, frame after frame, with continuous phase.
#[derive(Debug, Clone)]
pub struct ToneSource {
    frequency: f64,
    amplitude: f32,
    sample_rate: u32,
    frame_length: usize,
    frame_limit: Option<usize>,
}

impl ToneSource {
    pub fn new(frequency: f64, sample_rate: u32, frame_length: usize) -> Self {
        Self {
            frequency,
            amplitude: 0.5,
            sample_rate,
            frame_length,
            frame_limit: None,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Stops after `frames` frames instead of running forever.
    pub fn with_frame_limit(mut self, frames: usize) -> Self {
        self.frame_limit = Some(frames);
        self
    }
}

impl FrameSource for ToneSource {
    fn acquire(&mut self) -> Result<Box<dyn FrameStream>> {
        if !(self.frequency.is_finite() && self.frequency > 0.0) || self.sample_rate == 0 {
            return Err(TunerError::Acquisition(format!(
                "cannot synthesize a {} Hz tone at {} Hz",
                self.frequency, self.sample_rate
            )));
        }
        debug!(frequency = self.frequency, "tone source acquired");
        Ok(Box::new(ToneStream {
            tone: self.clone(),
            position: 0,
            frames_emitted: 0,
        }))
    }
}

struct ToneStream {
    tone: ToneSource,
    position: u64,
    frames_emitted: usize,
}

impl FrameStream for ToneStream {
    fn poll_frame(&mut self) -> Result<FramePoll> {
        if self
            .tone
            .frame_limit
            .is_some_and(|limit| self.frames_emitted >= limit)
        {
            return Ok(FramePoll::Exhausted);
        }

        let step = 2.0 * std::f64::consts::PI * self.tone.frequency / self.tone.sample_rate as f64;
        let start = self.position;
        let samples = (0..self.tone.frame_length as u64)
            .map(|i| self.tone.amplitude * ((start + i) as f64 * step).sin() as f32)
            .collect();

        self.position += self.tone.frame_length as u64;
        self.frames_emitted += 1;
        Ok(FramePoll::Frame(AudioFrame::new(samples, self.tone.sample_rate)))
    }
}

// ---------------------------------------------------------------------------
// Pre-recorded samples
// ---------------------------------------------------------------------------

/// Cuts a recording into consecutive frames. A trailing partial frame is
/// dropped.
#[derive(Debug, Clone)]
pub struct SampleSource {
    samples: std::sync::Arc<[f32]>,
    sample_rate: u32,
    frame_length: usize,
    hop: usize,
}

impl SampleSource {
    pub fn new(samples: Vec<f32>, sample_rate: u32, frame_length: usize) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            frame_length,
            hop: frame_length,
        }
    }

    /// Advances `hop` samples between frames (overlapping frames when
    /// `hop < frame_length`).
    pub fn with_hop(mut self, hop: usize) -> Self {
        self.hop = hop.max(1);
        self
    }

    pub fn frame_count(&self) -> usize {
        if self.samples.len() < self.frame_length {
            0
        } else {
            (self.samples.len() - self.frame_length) / self.hop + 1
        }
    }
}

impl FrameSource for SampleSource {
    fn acquire(&mut self) -> Result<Box<dyn FrameStream>> {
        if self.sample_rate == 0 || self.frame_length == 0 {
            return Err(TunerError::Acquisition(
                "sample source needs a sample rate and frame length".into(),
            ));
        }
        debug!(
            samples = self.samples.len(),
            frames = self.frame_count(),
            "sample source acquired"
        );
        Ok(Box::new(SampleStream {
            source: self.clone(),
            offset: 0,
        }))
    }
}

struct SampleStream {
    source: SampleSource,
    offset: usize,
}

impl FrameStream for SampleStream {
    fn poll_frame(&mut self) -> Result<FramePoll> {
        let end = self.offset + self.source.frame_length;
        if end > self.source.samples.len() {
            return Ok(FramePoll::Exhausted);
        }
        let frame = AudioFrame::new(
            self.source.samples[self.offset..end].to_vec(),
            self.source.sample_rate,
        );
        self.offset += self.source.hop;
        Ok(FramePoll::Frame(frame))
    }
}

// ---------------------------------------------------------------------------
// Cross-thread mailbox
// ---------------------------------------------------------------------------

/// Creates a single-slot handoff between a capture thread and the detection
/// thread.
///
/// The [`FrameSender`] accumulates raw sample blocks of any size and posts
/// complete frames; when the slot is still occupied the new frame is dropped,
/// so the detector never falls behind the capture thread.
pub fn frame_mailbox(frame_length: usize, sample_rate: u32) -> (FrameSender, MailboxSource) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (
        FrameSender {
            tx,
            pending: Vec::with_capacity(frame_length * 2),
            frame_length,
            sample_rate,
            dropped: 0,
        },
        MailboxSource { rx },
    )
}

/// Producer half of [`frame_mailbox`].
#[derive(Debug)]
pub struct FrameSender {
    tx: Sender<AudioFrame>,
    pending: Vec<f32>,
    frame_length: usize,
    sample_rate: u32,
    dropped: u64,
}

impl FrameSender {
    /// Appends captured samples, posting every complete frame.
    ///
    /// Returns `Err(Disconnected)` once the consumer side is gone.
    pub fn push_samples(&mut self, data: &[f32]) -> Result<()> {
        self.pending.extend_from_slice(data);

        while self.pending.len() >= self.frame_length {
            let frame = AudioFrame::new(self.pending[..self.frame_length].to_vec(), self.sample_rate);
            self.pending.drain(..self.frame_length);

            match self.tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => self.dropped += 1,
                Err(TrySendError::Disconnected(_)) => return Err(TunerError::Disconnected),
            }
        }
        Ok(())
    }

    /// Frames discarded because the detector had not taken the previous one.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }
}

/// Consumer half of [`frame_mailbox`].
#[derive(Debug, Clone)]
pub struct MailboxSource {
    rx: Receiver<AudioFrame>,
}

impl FrameSource for MailboxSource {
    fn acquire(&mut self) -> Result<Box<dyn FrameStream>> {
        // Discard a frame left over from a previous session.
        let _ = self.rx.try_recv();
        Ok(Box::new(MailboxStream { rx: self.rx.clone() }))
    }
}

struct MailboxStream {
    rx: Receiver<AudioFrame>,
}

impl FrameStream for MailboxStream {
    fn poll_frame(&mut self) -> Result<FramePoll> {
        match self.rx.try_recv() {
            Ok(frame) => Ok(FramePoll::Frame(frame)),
            Err(TryRecvError::Empty) => Ok(FramePoll::Pending),
            Err(TryRecvError::Disconnected) => Err(TunerError::Disconnected),
        }
    }
}
