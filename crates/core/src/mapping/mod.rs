//! Conversion between physical values, the normalized `[0, 1]` domain and
//! display strings.

/// Largest number of decimals derived from a quantization step.
const MAX_DISPLAY_PRECISION: usize = 6;
/// Decimals shown for continuous (unquantized) parameters.
const DEFAULT_DISPLAY_PRECISION: usize = 2;

/// Pure mapping between a physical range and the normalized domain.
///
/// With `skew == 1` and `step == 0` the two directions are inverses up to
/// floating point rounding. A positive `step` makes [`normalized_to_value`]
/// lossy: many normalized inputs land on the same quantized value.
///
/// Mappers are only built from validated parameter configuration, so
/// `min <= max`, `skew > 0` and `step >= 0` always hold.
///
/// [`normalized_to_value`]: ValueMapper::normalized_to_value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueMapper {
    min: f64,
    max: f64,
    skew: f64,
    step: f64,
}

impl ValueMapper {
    pub(crate) fn new(min: f64, max: f64, skew: f64, step: f64) -> Self {
        Self {
            min,
            max,
            skew,
            step,
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn skew(&self) -> f64 {
        self.skew
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Width of the physical range.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Maps a physical value into the normalized domain. A zero-width range
    /// always maps to `0`.
    pub fn value_to_normalized(&self, value: f64) -> f64 {
        let span = self.span();
        if span == 0.0 {
            return 0.0;
        }

        let normalized = (value - self.min) / span;
        if self.skew != 1.0 {
            normalized.powf(1.0 / self.skew)
        } else {
            normalized
        }
    }

    /// Maps a normalized value back to physical units, quantizing to `step`
    /// when one is configured.
    pub fn normalized_to_value(&self, normalized: f64) -> f64 {
        let warped = if self.skew != 1.0 {
            normalized.powf(self.skew)
        } else {
            normalized
        };

        self.quantize(self.min + warped * self.span())
    }

    /// Snaps `value` to the nearest multiple of `step`. Quantizing an already
    /// quantized value is a no-op.
    pub fn quantize(&self, value: f64) -> f64 {
        if self.step > 0.0 {
            (value / self.step).round() * self.step
        } else {
            value
        }
    }

    /// Clamps a physical value into `[min, max]`.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Number of decimals used when formatting values of this range.
    pub fn display_precision(&self) -> usize {
        if self.step <= 0.0 {
            return DEFAULT_DISPLAY_PRECISION;
        }

        let mut scaled = self.step;
        let mut precision = 0;
        while precision < MAX_DISPLAY_PRECISION && (scaled - scaled.round()).abs() > 1e-9 {
            scaled *= 10.0;
            precision += 1;
        }
        precision
    }

    /// Formats `value` followed by `units` when a unit label is present.
    pub fn format(&self, value: f64, units: &str) -> String {
        // Avoid rendering "-0.00".
        let value = if value == 0.0 { 0.0 } else { value };
        let precision = self.display_precision();
        if units.is_empty() {
            format!("{value:.precision$}")
        } else {
            format!("{value:.precision$} {units}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(min: f64, max: f64) -> ValueMapper {
        ValueMapper::new(min, max, 1.0, 0.0)
    }

    #[test]
    fn linear_mapping_round_trips() {
        let mapper = linear(-24.0, 24.0);
        for i in 0..=96 {
            let value = -24.0 + i as f64 * 0.5;
            let back = mapper.normalized_to_value(mapper.value_to_normalized(value));
            assert!((back - value).abs() < 1e-9, "{value} became {back}");
        }
    }

    #[test]
    fn skewed_mapping_round_trips_from_normalized() {
        let mapper = ValueMapper::new(20.0, 20_000.0, 0.25, 0.0);
        for i in 0..=20 {
            let normalized = i as f64 / 20.0;
            let back = mapper.value_to_normalized(mapper.normalized_to_value(normalized));
            assert!((back - normalized).abs() < 1e-9);
        }
    }

    #[test]
    fn skew_concentrates_resolution_at_the_low_end() {
        let mapper = ValueMapper::new(0.0, 100.0, 2.0, 0.0);
        assert!((mapper.normalized_to_value(0.5) - 25.0).abs() < 1e-9);
        assert!((mapper.value_to_normalized(25.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn degenerate_range_normalizes_to_zero() {
        let mapper = linear(5.0, 5.0);
        assert_eq!(mapper.value_to_normalized(5.0), 0.0);
        assert_eq!(mapper.normalized_to_value(0.7), 5.0);
    }

    #[test]
    fn quantization_is_idempotent() {
        let mapper = ValueMapper::new(0.0, 10.0, 1.0, 0.1);
        for i in 0..=100 {
            let once = mapper.normalized_to_value(i as f64 / 100.0 + 0.0037);
            assert_eq!(mapper.quantize(once), once);
        }
    }

    #[test]
    fn quantization_snaps_to_step() {
        let mapper = ValueMapper::new(0.0, 12.0, 1.0, 1.0);
        assert_eq!(mapper.normalized_to_value(0.49), 6.0);
        assert_eq!(mapper.normalized_to_value(0.45), 5.0);
    }

    #[test]
    fn formats_with_step_precision_and_units() {
        assert_eq!(linear(0.0, 1.0).format(0.5, ""), "0.50");
        assert_eq!(ValueMapper::new(0.0, 10.0, 1.0, 1.0).format(3.0, "st"), "3 st");
        assert_eq!(
            ValueMapper::new(0.0, 10.0, 1.0, 0.01).format(2.5, "Hz"),
            "2.50 Hz"
        );
        assert_eq!(linear(-1.0, 1.0).format(-0.0, ""), "0.00");
    }
}
