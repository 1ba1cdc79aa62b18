//! # Cent Meter Widget
//!
//! Text rendition of the needle gauge: a horizontal scale from -50 to +50
//! cents with a needle marking the current deviation.

/// Maximum cent deviation shown on the meter; larger deviations pin the needle.
pub const METER_RANGE: f64 = 50.0;

/// Needle swing at full scale, in degrees either side of vertical.
pub const MAX_NEEDLE_DEGREES: f64 = 60.0;

/// Scale cells when no width is requested.
pub const DEFAULT_METER_WIDTH: usize = 41;

/// Accuracy zone used to pick the needle glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    InTune,
    Close,
    Off,
}

impl Zone {
    pub fn from_cents(cents: f64, in_tune_cents: f64) -> Self {
        if cents.abs() < in_tune_cents {
            Zone::InTune
        } else if cents.abs() < 20.0 {
            Zone::Close
        } else {
            Zone::Off
        }
    }

    fn needle(&self) -> char {
        match self {
            Zone::InTune => '*',
            Zone::Close => '|',
            Zone::Off => '!',
        }
    }
}

/// Needle angle for a deviation: ±50 cents maps to ±60°, clamped.
/// An inactive meter rests at 0°.
pub fn needle_rotation(cents: Option<f64>) -> f64 {
    match cents {
        Some(c) => (c / METER_RANGE * MAX_NEEDLE_DEGREES).clamp(-MAX_NEEDLE_DEGREES, MAX_NEEDLE_DEGREES),
        None => 0.0,
    }
}

/// Cent meter widget for displaying tuning accuracy.
pub struct CentMeter {
    /// Current cent deviation (None if no pitch detected)
    cents: Option<f64>,
    in_tune_cents: f64,
    width: usize,
}

impl CentMeter {
    pub fn new(cents: Option<f64>, in_tune_cents: f64) -> Self {
        Self {
            cents,
            in_tune_cents,
            width: DEFAULT_METER_WIDTH,
        }
    }

    /// Number of cells in the scale; forced odd so there is a centre cell.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(3) | 1;
        self
    }

    pub fn render(&self) -> String {
        let center = self.width / 2;
        let mut cells: Vec<char> = (0..self.width)
            .map(|i| if i == center { '+' } else { '-' })
            .collect();

        if let Some(c) = self.cents {
            let position = (needle_rotation(Some(c)) + MAX_NEEDLE_DEGREES) / (2.0 * MAX_NEEDLE_DEGREES);
            let index = (position * (self.width - 1) as f64).round() as usize;
            cells[index.min(self.width - 1)] = Zone::from_cents(c, self.in_tune_cents).needle();
        }

        format!("-50 [{}] +50", cells.into_iter().collect::<String>())
    }
}
