//! # Main Display Module
//!
//! Terminal front-end for the tuner: renders each reading on a single,
//! continuously rewritten line and rings the terminal bell when the string
//! comes into tune.

use std::io::Write;

use canarinho_core::{ResultSink, TuningReading};
use tracing::warn;

use super::cent_meter::{CentMeter, DEFAULT_METER_WIDTH};

const BELL: &str = "\x07";

/// Formats one reading, e.g. `A4    +1.3c   440.3 Hz  -50 [...] +50  TUNED`.
pub fn format_reading(reading: &TuningReading, in_tune_cents: f64, meter_width: usize) -> String {
    let assignment = &reading.assignment;
    let meter = CentMeter::new(Some(assignment.cents), in_tune_cents)
        .with_width(meter_width)
        .render();
    format!(
        "{:<4} {:>+6.1}c {:>8.1} Hz  {}  {}",
        assignment.label(),
        assignment.cents,
        assignment.frequency,
        meter,
        reading.classification
    )
}

/// Display and feedback collaborator writing to a terminal.
pub struct TerminalDisplay<W: Write> {
    out: W,
    in_tune_cents: f64,
    meter_width: usize,
    bell: bool,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W, in_tune_cents: f64) -> Self {
        Self {
            out,
            in_tune_cents,
            meter_width: DEFAULT_METER_WIDTH,
            bell: true,
        }
    }

    /// Disables the audible confirmation; the "TUNED" marker is still printed.
    pub fn without_bell(mut self) -> Self {
        self.bell = false;
        self
    }

    pub fn with_meter_width(mut self, width: usize) -> Self {
        self.meter_width = width;
        self
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!(%e, "failed to write to terminal");
        }
    }
}

impl<W: Write> ResultSink for TerminalDisplay<W> {
    fn publish(&mut self, reading: &TuningReading) {
        let line = format_reading(reading, self.in_tune_cents, self.meter_width);
        // Clear to end of line so a shorter reading does not leave residue.
        self.write(&format!("\r{line}\x1b[K"));
    }

    fn confirm(&mut self, _reading: &TuningReading) {
        let cue = if self.bell { BELL } else { "" };
        self.write(&format!("  <- in tune{cue}"));
    }

    fn clear(&mut self) {
        self.write("\r\x1b[K");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canarinho_core::{Classification, map_to_note};

    fn reading(freq: f64, in_tune: bool, fired: bool) -> TuningReading {
        let assignment = map_to_note(freq);
        TuningReading {
            classification: Classification::from_cents(assignment.cents, 5.0),
            assignment,
            is_in_tune: in_tune,
            just_became_in_tune: fired,
        }
    }

    #[test]
    fn formats_note_cents_and_label() {
        let line = format_reading(&reading(445.0, false, false), 5.0, 11);
        assert!(line.starts_with("A4"), "{line}");
        assert!(line.contains("+19.6c"), "{line}");
        assert!(line.contains("445.0 Hz"), "{line}");
        assert!(line.contains("-50 [-----+-|---] +50"), "{line}");
        assert!(line.ends_with("LOOSEN"), "{line}");
    }

    #[test]
    fn confirmation_rings_bell() {
        let mut display = TerminalDisplay::new(Vec::new(), 5.0);
        let tuned = reading(440.0, true, true);
        display.publish(&tuned);
        display.confirm(&tuned);

        let output = String::from_utf8(display.into_inner()).unwrap();
        assert!(output.contains("TUNED"));
        assert!(output.contains("in tune\x07"));
    }

    #[test]
    fn bell_can_be_silenced() {
        let mut display = TerminalDisplay::new(Vec::new(), 5.0).without_bell();
        display.confirm(&reading(440.0, true, true));
        let output = String::from_utf8(display.into_inner()).unwrap();
        assert!(!output.contains('\x07'));
    }
}
