//! # Cycle Scheduler
//!
//! Drives a [`TunerSession`] at a steady cadence: on every tick it pulls one
//! frame from the acquired stream, runs the pipeline and hands the reading to
//! a [`ResultSink`]. One cycle always finishes before the next begins.
//!
//! Lifecycle:
//! - starting a run resets the session and acquires the frame source
//! - a shutdown signal is honoured between cycles; no cycle starts after it
//! - the frame stream is dropped on every exit path (shutdown, exhaustion,
//!   source error or panic), which releases the underlying device

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::{debug, info, warn};

use crate::TuningReading;
use crate::error::{Result, TunerError};
use crate::session::{CycleOutcome, TunerSession};
use crate::source::{FramePoll, FrameSource, FrameStream};

/// Nominal display refresh cadence (~60 Hz).
pub const DEFAULT_TICK: Duration = Duration::from_millis(16);

/// Receives the per-cycle output of the pipeline.
///
/// `publish` is the display collaborator's entry point and sees every
/// reading. `confirm` is the feedback collaborator's: it is called right
/// after `publish`, only on the cycle where the tone became in tune.
pub trait ResultSink {
    fn publish(&mut self, reading: &TuningReading);

    fn confirm(&mut self, _reading: &TuningReading) {}

    /// The session stopped; anything on display is stale.
    fn clear(&mut self) {}
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    #[default]
    Shutdown,
    /// The frame source ran out of frames.
    Exhausted,
    /// The configured cycle limit was reached.
    CycleLimit,
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Cycles that processed a frame.
    pub cycles: u64,
    pub readings: u64,
    pub no_signal: u64,
    pub out_of_range: u64,
    pub confirmations: u64,
    /// Ticks where the source had no frame ready.
    pub idle_ticks: u64,
    pub stop_reason: StopReason,
}

#[derive(Debug)]
pub struct Scheduler {
    session: TunerSession,
    interval: Duration,
    cycle_limit: Option<u64>,
}

impl Scheduler {
    pub fn new(session: TunerSession) -> Self {
        Self {
            session,
            interval: DEFAULT_TICK,
            cycle_limit: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Ends the run after `cycles` processed frames.
    pub fn with_cycle_limit(mut self, cycles: u64) -> Self {
        self.cycle_limit = Some(cycles);
        self
    }

    pub fn session(&self) -> &TunerSession {
        &self.session
    }

    /// Runs on the current thread until `shutdown` fires (or its sender is
    /// dropped), the source is exhausted, or the cycle limit is reached.
    ///
    /// One cycle starts per tick of the configured interval. A tick where the
    /// source has no frame ready is counted in `idle_ticks` and skipped.
    ///
    /// # Arguments
    /// * `source` - Acquired at the start of the run and released on every exit
    /// * `sink` - Receives every reading, confirmations, and a final `clear`
    /// * `shutdown` - Any message, or dropping the sender, ends the run
    ///
    /// # Returns
    /// * `Ok(RunSummary)` - Counters and the reason the run ended
    /// * `Err(TunerError)` - Acquisition failed or the source failed mid-run
    pub fn run<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        shutdown: &Receiver<()>,
    ) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        K: ResultSink + ?Sized,
    {
        let ticker = crossbeam_channel::tick(self.interval);
        self.run_with(source, sink, false, || {
            crossbeam_channel::select! {
                recv(shutdown) -> _ => return false,
                recv(ticker) -> _ => {},
            }
            // Both may be ready at once; shutdown always wins.
            matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
        })
    }

    /// Runs back to back without a ticker until the source is exhausted or
    /// the cycle limit is reached. Meant for offline input and tests.
    ///
    /// There is no ticker to wait on, so a source with no frame ready ends the
    /// run as `Exhausted` instead of being polled in a busy loop. Live sources
    /// belong in [`Scheduler::run`] or [`Scheduler::spawn`].
    pub fn run_frames<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        K: ResultSink + ?Sized,
    {
        self.run_with(source, sink, true, || true)
    }

    /// Moves the scheduler onto a dedicated thread.
    pub fn spawn<S, K>(mut self, mut source: S, mut sink: K) -> SchedulerHandle
    where
        S: FrameSource + Send + 'static,
        K: ResultSink + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let thread_handle = thread::spawn(move || {
            let result = self.run(&mut source, &mut sink, &shutdown_rx);
            if let Err(e) = &result {
                warn!(%e, "scheduler thread finished with error");
            }
            result
        });
        SchedulerHandle {
            shutdown_tx,
            thread_handle: Some(thread_handle),
        }
    }

    /// Shared run loop. `wait` blocks until the next cycle may start and
    /// returns `false` to stop. With `idle_ends_run`, a pending source counts
    /// as exhausted.
    fn run_with<S, K, W>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        idle_ends_run: bool,
        mut wait: W,
    ) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        K: ResultSink + ?Sized,
        W: FnMut() -> bool,
    {
        self.session.start();
        let result = self.drive(source, sink, idle_ends_run, &mut wait);
        self.session.stop();
        sink.clear();

        match &result {
            Ok(summary) => info!(?summary, "tuner run finished"),
            Err(e) => warn!(%e, "tuner run aborted"),
        }
        result
    }

    fn drive<S, K, W>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        idle_ends_run: bool,
        wait: &mut W,
    ) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        K: ResultSink + ?Sized,
        W: FnMut() -> bool,
    {
        // The stream lives only inside this function, so it is released on
        // every return, including `?` and unwinding.
        let mut stream = source.acquire()?;
        let mut summary = RunSummary::default();

        loop {
            if self.cycle_limit.is_some_and(|limit| summary.cycles >= limit) {
                summary.stop_reason = StopReason::CycleLimit;
                break;
            }
            if !wait() {
                summary.stop_reason = StopReason::Shutdown;
                break;
            }
            if !self.cycle(&mut *stream, sink, idle_ends_run, &mut summary)? {
                summary.stop_reason = StopReason::Exhausted;
                break;
            }
        }
        Ok(summary)
    }

    /// One cycle. Returns `false` once the source is exhausted.
    fn cycle<K>(
        &mut self,
        stream: &mut dyn FrameStream,
        sink: &mut K,
        idle_ends_run: bool,
        summary: &mut RunSummary,
    ) -> Result<bool>
    where
        K: ResultSink + ?Sized,
    {
        let frame = match stream.poll_frame()? {
            FramePoll::Frame(frame) => frame,
            FramePoll::Pending => {
                summary.idle_ticks += 1;
                return Ok(!idle_ends_run);
            }
            FramePoll::Exhausted => return Ok(false),
        };

        summary.cycles += 1;
        match self.session.process_frame(&frame)? {
            CycleOutcome::Reading(reading) => {
                summary.readings += 1;
                sink.publish(&reading);
                if reading.just_became_in_tune {
                    summary.confirmations += 1;
                    debug!(note = %reading.assignment.label(), "tone came into tune");
                    sink.confirm(&reading);
                }
            }
            CycleOutcome::NoSignal => summary.no_signal += 1,
            CycleOutcome::OutOfRange(_) => summary.out_of_range += 1,
        }
        Ok(true)
    }
}

/// Handle to a scheduler running on its own thread.
///
/// Dropping the handle also signals shutdown and waits for the thread, so the
/// frame source is always released by the time the handle is gone.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<Result<RunSummary>>>,
}

impl SchedulerHandle {
    pub fn is_finished(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }

    /// Signals shutdown and waits for the run to end.
    pub fn stop(mut self) -> Result<RunSummary> {
        let _ = self.shutdown_tx.try_send(());
        self.join_thread()
    }

    /// Waits for the run to end on its own (exhausted source or cycle limit).
    pub fn join(mut self) -> Result<RunSummary> {
        self.join_thread()
    }

    fn join_thread(&mut self) -> Result<RunSummary> {
        match self.thread_handle.take() {
            Some(handle) => handle.join().map_err(|_| TunerError::WorkerPanicked)?,
            None => Ok(RunSummary::default()),
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            let _ = self.shutdown_tx.try_send(());
            let _ = self.join_thread();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TunerConfig;
    use crate::source::{SampleSource, ToneSource};

    #[derive(Default)]
    struct Recorder {
        published: Vec<TuningReading>,
        confirmed: usize,
        cleared: usize,
    }

    impl ResultSink for Recorder {
        fn publish(&mut self, reading: &TuningReading) {
            self.published.push(reading.clone());
        }

        fn confirm(&mut self, _reading: &TuningReading) {
            self.confirmed += 1;
        }

        fn clear(&mut self) {
            self.cleared += 1;
        }
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(TunerSession::new(TunerConfig::default()).unwrap())
    }

    #[test]
    fn run_frames_stops_when_source_is_exhausted() {
        let mut source = ToneSource::new(440.0, 44_100, 2048).with_frame_limit(4);
        let mut sink = Recorder::default();

        let summary = scheduler().run_frames(&mut source, &mut sink).unwrap();

        assert_eq!(summary.stop_reason, StopReason::Exhausted);
        assert_eq!(summary.cycles, 4);
        assert_eq!(summary.readings, 4);
        assert_eq!(summary.confirmations, 1);
        assert_eq!(sink.published.len(), 4);
        assert_eq!(sink.confirmed, 1);
        assert_eq!(sink.cleared, 1);
        assert!(sink.published.iter().all(|r| r.assignment.label() == "A4"));
    }

    #[test]
    fn cycle_limit_ends_run() {
        let mut source = ToneSource::new(196.0, 44_100, 2048);
        let mut sink = Recorder::default();

        let summary = scheduler()
            .with_cycle_limit(3)
            .run_frames(&mut source, &mut sink)
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::CycleLimit);
        assert_eq!(summary.cycles, 3);
        assert_eq!(sink.published[0].assignment.label(), "G3");
    }

    #[test]
    fn silence_is_counted_but_not_published() {
        let mut source = SampleSource::new(vec![0.0; 2048 * 3], 44_100, 2048);
        let mut sink = Recorder::default();

        let summary = scheduler().run_frames(&mut source, &mut sink).unwrap();

        assert_eq!(summary.cycles, 3);
        assert_eq!(summary.no_signal, 3);
        assert!(sink.published.is_empty());
    }

    #[test]
    fn session_is_stopped_after_run() {
        let mut scheduler = scheduler();
        let mut source = ToneSource::new(440.0, 44_100, 2048).with_frame_limit(1);
        scheduler.run_frames(&mut source, &mut Recorder::default()).unwrap();
        assert!(!scheduler.session().is_running());
        assert!(scheduler.session().current().is_none());
    }

    #[test]
    fn run_frames_ends_when_source_has_nothing_ready() {
        let (_sender, mut source) = crate::source::frame_mailbox(2048, 44_100);
        let mut sink = Recorder::default();

        let summary = scheduler()
            .with_cycle_limit(10)
            .run_frames(&mut source, &mut sink)
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::Exhausted);
        assert_eq!(summary.idle_ticks, 1);
        assert_eq!(summary.cycles, 0);
        assert!(sink.published.is_empty());
    }

    #[test]
    fn dropped_shutdown_sender_stops_run() {
        let (tx, rx) = crossbeam_channel::bounded::<()>(1);
        drop(tx);
        let mut source = ToneSource::new(440.0, 44_100, 2048);
        let mut sink = Recorder::default();

        let summary = scheduler()
            .with_interval(Duration::from_millis(1))
            .run(&mut source, &mut sink, &rx)
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::Shutdown);
        assert_eq!(summary.cycles, 0);
    }
}
