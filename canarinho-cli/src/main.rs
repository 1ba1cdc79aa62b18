//! # Canarinho - Terminal Instrument Tuner
//!
//! Command-line front-end for `canarinho-core`. It picks a frame source,
//! runs the cycle scheduler on its own thread and renders every reading on a
//! single terminal line.
//!
//! ## Architecture
//! - **Main Thread**: argument parsing, then waits for Enter (stop) or for the
//!   run to end on its own
//! - **Scheduler Thread**: pulls frames, runs detection and drives the display
//! - **Audio Thread** (`--mic` only): CPAL callback feeding the frame mailbox
//! - **Communication**: crossbeam channels for shutdown and frame handoff

mod config;
mod input;
mod ui;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use canarinho_core::source::{FrameSource, ToneSource};
use canarinho_core::{RunSummary, Scheduler, TunerConfig, TunerSession};
use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ui::cent_meter::DEFAULT_METER_WIDTH;
use ui::main_display::TerminalDisplay;

/// Sample rate used for the synthetic tone source.
const TONE_SAMPLE_RATE: u32 = 44_100;

/// How often the main thread checks whether the run ended by itself.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "canarinho", version, about = "Real-time instrument tuner")]
struct Cli {
    /// Tune against a synthetic sine tone at this frequency (Hz).
    #[arg(long, value_name = "HZ", conflicts_with_all = ["wav", "mic"])]
    tone: Option<f64>,

    /// Read frames from a WAV file.
    #[arg(long, value_name = "PATH", conflicts_with = "mic")]
    wav: Option<PathBuf>,

    /// Capture from the default microphone (requires the `mic` feature).
    #[arg(long)]
    mic: bool,

    /// JSON tuner configuration; missing fields use defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stop after this many processed frames.
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,

    /// Milliseconds between cycles.
    #[arg(long, value_name = "MS", default_value_t = 16)]
    interval_ms: u64,

    /// Number of cells in the cent meter.
    #[arg(long, value_name = "CELLS", default_value_t = DEFAULT_METER_WIDTH)]
    meter_width: usize,

    /// Do not ring the terminal bell when a string comes into tune.
    #[arg(long)]
    no_bell: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(summary) => {
            println!(
                "{} frames, {} readings, {} in-tune confirmations ({:?})",
                summary.cycles, summary.readings, summary.confirmations, summary.stop_reason
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            eprintln!("canarinho: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so they never interleave with the tuner line on stdout.
/// Verbosity comes from `RUST_LOG`, defaulting to warnings only.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<RunSummary> {
    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => TunerConfig::default(),
    };
    let source = build_source(&cli, &config)?;

    let session = TunerSession::new(config.clone()).context("creating tuner session")?;
    let mut scheduler = Scheduler::new(session).with_interval(Duration::from_millis(cli.interval_ms));
    if let Some(cycles) = cli.cycles {
        scheduler = scheduler.with_cycle_limit(cycles);
    }

    let mut display =
        TerminalDisplay::new(io::stdout(), config.in_tune_cents).with_meter_width(cli.meter_width);
    if cli.no_bell {
        display = display.without_bell();
    }

    info!(?config, "starting tuner");
    eprintln!("Listening... press Enter to stop.");
    let handle = scheduler.spawn(source, display);
    let stop_requests = watch_stdin();

    loop {
        match stop_requests.recv_timeout(POLL_INTERVAL) {
            Ok(()) => return handle.stop().context("stopping tuner"),
            Err(RecvTimeoutError::Timeout) if handle.is_finished() => break,
            Err(RecvTimeoutError::Timeout) => {}
            // stdin closed: nothing can ask us to stop any more, so wait for
            // the run to end by itself.
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    handle.join().context("tuner run failed")
}

fn build_source(cli: &Cli, config: &TunerConfig) -> Result<Box<dyn FrameSource + Send>> {
    if let Some(frequency) = cli.tone {
        info!(frequency, "using synthetic tone source");
        return Ok(Box::new(ToneSource::new(
            frequency,
            TONE_SAMPLE_RATE,
            config.frame_length,
        )));
    }
    if let Some(path) = &cli.wav {
        info!(path = %path.display(), "using WAV file source");
        return Ok(Box::new(input::wav_source(path, config.frame_length)?));
    }
    if cli.mic {
        return mic_source(config);
    }
    bail!("no input selected; pass --tone <HZ>, --wav <PATH> or --mic")
}

#[cfg(feature = "mic")]
fn mic_source(config: &TunerConfig) -> Result<Box<dyn FrameSource + Send>> {
    use canarinho_core::audio::CaptureSource;

    info!("using microphone source");
    Ok(Box::new(CaptureSource::new(config.frame_length)))
}

#[cfg(not(feature = "mic"))]
fn mic_source(_config: &TunerConfig) -> Result<Box<dyn FrameSource + Send>> {
    bail!("microphone support is not compiled in; rebuild with `--features mic`")
}

/// Sends one stop request when the user presses Enter. The sender is dropped
/// on end of input.
fn watch_stdin() -> Receiver<()> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let mut line = String::new();
        if matches!(io::stdin().lock().read_line(&mut line), Ok(n) if n > 0) {
            let _ = tx.send(());
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tone_run() {
        let cli = Cli::try_parse_from(["canarinho", "--tone", "196", "--cycles", "5"]).unwrap();
        assert_eq!(cli.tone, Some(196.0));
        assert_eq!(cli.cycles, Some(5));
        assert_eq!(cli.interval_ms, 16);
        assert_eq!(cli.meter_width, DEFAULT_METER_WIDTH);
    }

    #[test]
    fn sources_are_exclusive() {
        assert!(Cli::try_parse_from(["canarinho", "--tone", "440", "--mic"]).is_err());
        assert!(Cli::try_parse_from(["canarinho", "--wav", "a.wav", "--mic"]).is_err());
    }

    #[test]
    fn missing_source_is_an_error() {
        let cli = Cli::try_parse_from(["canarinho"]).unwrap();
        assert!(build_source(&cli, &TunerConfig::default()).is_err());
    }

    #[test]
    fn tone_source_is_built() {
        let cli = Cli::try_parse_from(["canarinho", "--tone", "440"]).unwrap();
        assert!(build_source(&cli, &TunerConfig::default()).is_ok());
    }
}
