// Timeline - Musical time representation
// Converts between ticks, beats, measures and wall-clock milliseconds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticks per quarter note used throughout the sequencer
pub const TICKS_PER_QUARTER: u32 = 480;

/// Ticks per whole note
pub const TICKS_PER_WHOLE: u32 = TICKS_PER_QUARTER * 4;

/// Time signature (numerator/denominator)
/// Example: 4/4 time = TimeSignature { numerator: 4, denominator: 4 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,   // Beats per bar
    pub denominator: u8, // Note value (4 = quarter note, 8 = eighth note)
}

impl TimeSignature {
    /// Creates a time signature, or `None` if the numerator is zero or the
    /// denominator is not a power of two between 1 and 32
    pub fn new(numerator: u8, denominator: u8) -> Option<Self> {
        if numerator == 0 || !denominator.is_power_of_two() || denominator > 32 {
            return None;
        }
        Some(Self {
            numerator,
            denominator,
        })
    }

    /// Common 4/4 time signature
    pub const fn four_four() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }

    /// Common 3/4 time signature (waltz)
    pub const fn three_four() -> Self {
        Self {
            numerator: 3,
            denominator: 4,
        }
    }

    /// Common 6/8 time signature
    pub const fn six_eight() -> Self {
        Self {
            numerator: 6,
            denominator: 8,
        }
    }

    /// Compound meters (6/8, 9/8, 12/8...) count dotted beats.
    /// 3/x is simple triple time.
    pub fn is_compound(&self) -> bool {
        self.numerator != 3 && self.numerator % 3 == 0
    }

    /// Number of counted beats per measure
    pub fn beats_per_measure(&self) -> u32 {
        if self.is_compound() {
            self.numerator as u32 / 3
        } else {
            self.numerator as u32
        }
    }

    /// Measure length in ticks
    pub fn measure_length_ticks(&self) -> f64 {
        TICKS_PER_WHOLE as f64 * self.numerator as f64 / self.denominator as f64
    }

    /// Beat length in ticks
    pub fn beat_length_ticks(&self) -> f64 {
        self.measure_length_ticks() / self.beats_per_measure() as f64
    }

    /// Denominator as a power-of-two exponent, as stored in sequence files
    pub fn denominator_exponent(&self) -> u8 {
        self.denominator.trailing_zeros() as u8
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Tempo in BPM (Beats Per Minute), where the beat follows the time signature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub const MIN_BPM: f64 = 20.0;
    pub const MAX_BPM: f64 = 999.0;

    /// Creates a tempo, or `None` outside [20, 999] BPM
    pub fn new(bpm: f64) -> Option<Self> {
        if (Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm) {
            Some(Self { bpm })
        } else {
            None
        }
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in milliseconds
    pub fn beat_duration_ms(&self) -> f64 {
        60_000.0 / self.bpm
    }

    /// Playback rate in ticks per millisecond
    pub fn ticks_per_ms(&self, time_signature: &TimeSignature) -> f64 {
        time_signature.beat_length_ticks() / self.beat_duration_ms()
    }

    /// Milliseconds per tick, the scale factor used by the envelope resampler
    pub fn ms_per_tick(&self, time_signature: &TimeSignature) -> f64 {
        1.0 / self.ticks_per_ms(time_signature)
    }

    /// Duration in microseconds of `ticks_per_quarter` ticks at this tempo.
    ///
    /// A sequence file declaring that resolution and this tempo plays each
    /// tick as long as `ms_per_tick`.
    pub fn micros_per_quarter(
        &self,
        time_signature: &TimeSignature,
        ticks_per_quarter: u16,
    ) -> u32 {
        let ms_per_quarter = ticks_per_quarter as f64 * self.ms_per_tick(time_signature);
        (ms_per_quarter * 1000.0).round() as u32
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Musical time representation (measure:beat:tick), used for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MusicalTime {
    pub measure: u32, // 1-based
    pub beat: u32,    // 1-based
    pub tick: u32,    // Tick within beat (0-based)
}

impl MusicalTime {
    /// Create from an absolute tick position
    pub fn from_ticks(ticks: f64, time_signature: &TimeSignature) -> Self {
        let ticks = ticks.max(0.0);
        let measure_length = time_signature.measure_length_ticks();
        let beat_length = time_signature.beat_length_ticks();

        let measure = (ticks / measure_length).floor();
        let within_measure = ticks - measure * measure_length;
        let beat = (within_measure / beat_length).floor();
        let tick = within_measure - beat * beat_length;

        Self {
            measure: measure as u32 + 1,
            beat: beat as u32 + 1,
            tick: tick as u32,
        }
    }
}

impl fmt::Display for MusicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:03}", self.measure, self.beat, self.tick)
    }
}

/// Fixed timing constants of the real-time player and envelope resampler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Wall-clock length of one player iteration
    pub sleep_interval_ms: u64,
    /// Player iterations between listener notifications
    pub notification_decimation: u32,
    /// Spacing of resampled envelope events
    pub envelope_resolution_ms: f64,
    /// Sequence file resolution. Tick positions are unchanged, the file's
    /// tempo is scaled so exported ticks last as long as in playback.
    pub ticks_per_quarter: u16,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            sleep_interval_ms: 6,
            notification_decimation: 8,
            envelope_resolution_ms: 24.0,
            ticks_per_quarter: TICKS_PER_QUARTER as u16,
        }
    }
}
