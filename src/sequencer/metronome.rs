// Metronome - beat and measure boundary tracking for the player
// Thresholds are in ticks and advance one boundary per check

use super::timeline::TimeSignature;

/// Type of metronome click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    /// First beat of a measure
    Accent,
    /// Any other beat
    Regular,
}

/// Metronome scheduler
/// Determines when the playhead crosses a beat or measure boundary
#[derive(Debug, Clone, PartialEq)]
pub struct MetronomeScheduler {
    beat_length: f64,
    measure_length: f64,
    next_beat: f64,
    next_measure: f64,
}

impl MetronomeScheduler {
    pub fn new(beat_length: f64, measure_length: f64) -> Self {
        Self {
            beat_length: beat_length.max(1.0),
            measure_length: measure_length.max(1.0),
            next_beat: 0.0,
            next_measure: 0.0,
        }
    }

    pub fn from_time_signature(time_signature: &TimeSignature) -> Self {
        Self::new(
            time_signature.beat_length_ticks(),
            time_signature.measure_length_ticks(),
        )
    }

    /// Change beat and measure lengths. Takes effect at the next `reset`.
    pub fn set_lengths(&mut self, beat_length: f64, measure_length: f64) {
        self.beat_length = beat_length.max(1.0);
        self.measure_length = measure_length.max(1.0);
    }

    pub fn beat_length(&self) -> f64 {
        self.beat_length
    }

    pub fn measure_length(&self) -> f64 {
        self.measure_length
    }

    pub fn next_beat(&self) -> f64 {
        self.next_beat
    }

    pub fn next_measure(&self) -> f64 {
        self.next_measure
    }

    /// Place the thresholds on the first boundaries at or after `position`
    pub fn reset(&mut self, position: f64) {
        self.next_beat = Self::boundary_at_or_after(position, self.beat_length);
        self.next_measure = Self::boundary_at_or_after(position, self.measure_length);
    }

    fn boundary_at_or_after(position: f64, length: f64) -> f64 {
        let boundary = length * (position / length).floor();
        if boundary < position {
            boundary + length
        } else {
            boundary
        }
    }

    /// Report a click if `position` has reached the next boundary.
    /// A measure boundary also consumes the beat it falls on.
    pub fn check(&mut self, position: f64) -> Option<ClickType> {
        if position >= self.next_measure {
            self.next_measure += self.measure_length;
            self.next_beat += self.beat_length;
            Some(ClickType::Accent)
        } else if position >= self.next_beat {
            self.next_beat += self.beat_length;
            Some(ClickType::Regular)
        } else {
            None
        }
    }
}

impl Default for MetronomeScheduler {
    fn default() -> Self {
        Self::from_time_signature(&TimeSignature::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_thresholds() {
        let mut scheduler = MetronomeScheduler::new(480.0, 1920.0);

        scheduler.reset(0.0);
        assert_eq!(scheduler.next_beat(), 0.0);
        assert_eq!(scheduler.next_measure(), 0.0);

        scheduler.reset(500.0);
        assert_eq!(scheduler.next_beat(), 960.0);
        assert_eq!(scheduler.next_measure(), 1920.0);

        scheduler.reset(1920.0);
        assert_eq!(scheduler.next_beat(), 1920.0);
        assert_eq!(scheduler.next_measure(), 1920.0);
    }

    #[test]
    fn test_clicks_over_one_measure() {
        let mut scheduler = MetronomeScheduler::new(480.0, 1920.0);
        scheduler.reset(0.0);

        let mut clicks = Vec::new();
        let mut position = 0.0;
        while position < 2000.0 {
            if let Some(click) = scheduler.check(position) {
                clicks.push((position as u32, click));
            }
            position += 5.76;
        }

        let kinds: Vec<ClickType> = clicks.iter().map(|(_, c)| *c).collect();
        assert_eq!(
            kinds,
            vec![
                ClickType::Accent,
                ClickType::Regular,
                ClickType::Regular,
                ClickType::Regular,
                ClickType::Accent,
            ]
        );
        assert_eq!(clicks[0].0, 0);
        assert!(clicks[1].0 >= 480 && clicks[1].0 < 486);
    }

    #[test]
    fn test_compound_meter() {
        let scheduler = MetronomeScheduler::from_time_signature(&TimeSignature::six_eight());
        assert_eq!(scheduler.beat_length(), 720.0);
        assert_eq!(scheduler.measure_length(), 1440.0);
    }

    #[test]
    fn test_no_click_between_boundaries() {
        let mut scheduler = MetronomeScheduler::new(480.0, 1920.0);
        scheduler.reset(10.0);
        assert_eq!(scheduler.check(100.0), None);
        assert_eq!(scheduler.check(479.0), None);
        assert_eq!(scheduler.check(480.0), Some(ClickType::Regular));
        assert_eq!(scheduler.check(481.0), None);
    }
}
