//! # Audio Capture Module
//!
//! Microphone frame source built on CPAL (Cross-Platform Audio Library).
//! Only compiled with the `capture` feature.
//!
//! The CPAL callback runs on the driver's thread. It downmixes to mono and
//! pushes samples into a [`frame_mailbox`], so complete frames reach the
//! detection thread through a single-slot channel and the buffer is never
//! shared between threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, warn};

use crate::error::{Result, TunerError};
use crate::source::{FramePoll, FrameSource, FrameStream, frame_mailbox};

/// Preferred capture rate (CD quality).
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Captures frames from the default input device.
#[derive(Debug, Clone)]
pub struct CaptureSource {
    frame_length: usize,
    target_sample_rate: u32,
}

impl CaptureSource {
    pub fn new(frame_length: usize) -> Self {
        Self {
            frame_length,
            target_sample_rate: TARGET_SAMPLE_RATE,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.target_sample_rate = sample_rate;
        self
    }
}

impl FrameSource for CaptureSource {
    /// Opens the default input device and starts streaming.
    ///
    /// Fails with [`TunerError::Acquisition`] when there is no input device,
    /// no 32-bit float input format, or the stream cannot be started (which
    /// is also how a denied microphone permission shows up).
    fn acquire(&mut self) -> Result<Box<dyn FrameStream>> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| TunerError::Acquisition("no input device available".into()))?;

        info!(device = %device.name().unwrap_or_else(|_| "<unknown>".into()), "using audio input device");

        let configs = device
            .supported_input_configs()
            .map_err(|e| TunerError::Acquisition(e.to_string()))?
            .collect::<Vec<_>>();
        let supported = find_supported_config(configs, self.target_sample_rate)
            .ok_or_else(|| TunerError::Acquisition("no suitable f32 input format found".into()))?;

        let rate = self.target_sample_rate.clamp(
            supported.min_sample_rate().0,
            supported.max_sample_rate().0,
        );
        let config: cpal::StreamConfig = supported.with_sample_rate(cpal::SampleRate(rate)).into();
        let channels = config.channels.max(1) as usize;
        info!(sample_rate = rate, channels, "selected capture format");

        let (mut sender, mut mailbox) = frame_mailbox(self.frame_length, rate);
        let failed = Arc::new(AtomicBool::new(false));
        let failed_in_callback = Arc::clone(&failed);
        let mut mono = Vec::with_capacity(self.frame_length);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    mono.clear();
                    mono.extend(
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
                    );
                    // The consumer going away is handled on the detection side.
                    let _ = sender.push_samples(&mono);
                },
                move |err| {
                    error!(%err, "audio input stream error");
                    failed_in_callback.store(true, Ordering::Release);
                },
                None,
            )
            .map_err(|e| TunerError::Acquisition(e.to_string()))?;

        stream
            .play()
            .map_err(|e| TunerError::Acquisition(e.to_string()))?;

        Ok(Box::new(CaptureStream {
            frames: mailbox.acquire()?,
            failed,
            stream,
        }))
    }
}

/// An open input stream. Dropping it stops capture and closes the device.
struct CaptureStream {
    frames: Box<dyn FrameStream>,
    failed: Arc<AtomicBool>,
    stream: cpal::Stream,
}

impl FrameStream for CaptureStream {
    fn poll_frame(&mut self) -> Result<FramePoll> {
        if self.failed.load(Ordering::Acquire) {
            return Err(TunerError::Acquisition("audio input stream failed".into()));
        }
        self.frames.poll_frame()
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            warn!(%e, "error pausing input stream");
        }
        info!("audio capture released");
    }
}

/// Picks the f32 input configuration closest to `target_rate`, preferring mono.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let rate_distance = if (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate) {
                0
            } else {
                let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
                let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
                min_diff.min(max_diff)
            };
            (rate_distance, c.channels() != 1)
        })
}
