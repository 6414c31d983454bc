// Tuning controller encoding - continuous tuning values as three 7-bit controller bytes

/// Upper bound of the tuning value domain (cents)
pub const TUNING_VALUE_MAX: f64 = 12288.0;

const RESOLUTION_BITS: u32 = 21;
const RESOLUTION_MAX: f64 = ((1u32 << RESOLUTION_BITS) - 1) as f64;

/// Split a tuning value into three controller values, most significant first.
///
/// The value is clamped to `0..=TUNING_VALUE_MAX` and quantised to 21 bits.
pub fn tuning_controller_values(value: f64) -> [u8; 3] {
    let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, TUNING_VALUE_MAX) };
    let scaled = (value / TUNING_VALUE_MAX * RESOLUTION_MAX).round() as u32;
    [
        ((scaled >> 14) & 0x7F) as u8,
        ((scaled >> 7) & 0x7F) as u8,
        (scaled & 0x7F) as u8,
    ]
}

/// Inverse of [`tuning_controller_values`], up to quantisation
pub fn tuning_value_from_controllers(values: [u8; 3]) -> f64 {
    let scaled = ((values[0] as u32 & 0x7F) << 14)
        | ((values[1] as u32 & 0x7F) << 7)
        | (values[2] as u32 & 0x7F);
    scaled as f64 / RESOLUTION_MAX * TUNING_VALUE_MAX
}

/// Controller numbers carrying the generator and period values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningControllers {
    pub generator: [u8; 3],
    pub period: [u8; 3],
}

impl TuningControllers {
    /// Numbers used when streaming to live outputs
    pub const LIVE: Self = Self {
        generator: [53, 54, 55],
        period: [50, 51, 52],
    };

    /// Numbers written into sequence files
    pub const FILE: Self = Self {
        generator: [20, 21, 22],
        period: [50, 51, 52],
    };

    /// Three (controller, value) pairs for a generator change
    pub fn generator_messages(&self, value: f64) -> [(u8, u8); 3] {
        Self::pair(self.generator, tuning_controller_values(value))
    }

    /// Three (controller, value) pairs for a period change
    pub fn period_messages(&self, value: f64) -> [(u8, u8); 3] {
        Self::pair(self.period, tuning_controller_values(value))
    }

    fn pair(numbers: [u8; 3], values: [u8; 3]) -> [(u8, u8); 3] {
        [
            (numbers[0], values[0]),
            (numbers[1], values[1]),
            (numbers[2], values[2]),
        ]
    }
}

/// Controller carrying the harmonicity envelope
pub const HARMONICITY_CONTROLLER: u8 = 56;

/// Controller carrying the just-intonation envelope
pub const JUST_INTONATION_CONTROLLER: u8 = 57;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert_eq!(tuning_controller_values(0.0), [0, 0, 0]);
        assert_eq!(tuning_controller_values(TUNING_VALUE_MAX), [0x7F, 0x7F, 0x7F]);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(tuning_controller_values(-50.0), [0, 0, 0]);
        assert_eq!(tuning_controller_values(20000.0), [0x7F, 0x7F, 0x7F]);
        assert_eq!(tuning_controller_values(f64::NAN), [0, 0, 0]);
    }

    #[test]
    fn test_midpoint() {
        // 6144 -> 1048575.5 rounds to 1048576 = 0x100000
        assert_eq!(tuning_controller_values(6144.0), [0x40, 0, 0]);
    }

    #[test]
    fn test_values_survive_quantisation() {
        for value in [0.0, 1.0, 700.0, 1200.0, 1901.955, 12000.0] {
            let decoded = tuning_value_from_controllers(tuning_controller_values(value));
            assert!((decoded - value).abs() < 0.01, "{value} decoded as {decoded}");
        }
    }

    #[test]
    fn test_controller_numbers() {
        let live = TuningControllers::LIVE.generator_messages(700.0);
        let file = TuningControllers::FILE.generator_messages(700.0);
        assert_eq!([live[0].0, live[1].0, live[2].0], [53, 54, 55]);
        assert_eq!([file[0].0, file[1].0, file[2].0], [20, 21, 22]);
        // same values either way
        assert_eq!(live[2].1, file[2].1);

        let period = TuningControllers::LIVE.period_messages(1200.0);
        assert_eq!([period[0].0, period[1].0, period[2].0], [50, 51, 52]);
    }
}
