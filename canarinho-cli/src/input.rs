//! Frame sources selectable from the command line.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use canarinho_core::source::SampleSource;

/// Reads a WAV file into mono `f32` samples in [-1, 1].
///
/// Multi-channel files are downmixed by averaging the channels of each
/// sample frame. Returns the samples and the file's sample rate.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f32>>>()?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            match spec.bits_per_sample {
                8 | 16 | 24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / max).map_err(|err| anyhow!(err)))
                    .collect::<Result<Vec<f32>>>()?,
                other => bail!("unsupported bits per sample {} in {}", other, path.display()),
            }
        }
    };

    Ok((downmix(&interleaved, spec.channels as usize), spec.sample_rate))
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Builds a frame source over the whole file.
pub fn wav_source(path: &Path, frame_length: usize) -> Result<SampleSource> {
    let (samples, sample_rate) = read_wav(path)?;
    if samples.len() < frame_length {
        bail!(
            "{} holds {} samples, fewer than one {}-sample frame",
            path.display(),
            samples.len(),
            frame_length
        );
    }
    Ok(SampleSource::new(samples, sample_rate, frame_length))
}
