use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Per-parameter options controlling display, mapping and smoothing.
///
/// Missing fields fall back to the defaults when deserialized:
/// `units = ""`, `skew = 1.0`, `step = 0.0`, `automatable = true`,
/// `saveable = true`, `smoothing = 0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterConfig {
    /// Unit label appended to the display text.
    pub units: String,
    /// Power-curve exponent for the normalized mapping. `1.0` is linear.
    pub skew: f64,
    /// Quantization step in physical units. `0.0` disables quantization.
    pub step: f64,
    pub automatable: bool,
    pub saveable: bool,
    /// Damping coefficient in `[0, 1)`. `0.0` makes writes instantaneous.
    pub smoothing: f64,
}

impl Default for ParameterConfig {
    fn default() -> Self {
        Self {
            units: String::new(),
            skew: 1.0,
            step: 0.0,
            automatable: true,
            saveable: true,
            smoothing: 0.0,
        }
    }
}

impl ParameterConfig {
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_skew(mut self, skew: f64) -> Self {
        self.skew = skew;
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_automatable(mut self, automatable: bool) -> Self {
        self.automatable = automatable;
        self
    }

    pub fn with_saveable(mut self, saveable: bool) -> Self {
        self.saveable = saveable;
        self
    }
}

/// Top-level configuration structure for the command line driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub frames: FrameConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections use their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Settings for the frame driver that ticks smoothing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub rate_hz: u32,
    /// Upper bound on frames driven before giving up on convergence.
    pub max_frames: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            rate_hz: 60,
            max_frames: 600,
        }
    }
}

impl FrameConfig {
    /// Duration of a single frame in seconds.
    pub fn frame_seconds(&self) -> f64 {
        1.0 / f64::from(self.rate_hz.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_defaults_match_documented_values() {
        let config = ParameterConfig::default();
        assert_eq!(config.units, "");
        assert_eq!(config.skew, 1.0);
        assert_eq!(config.step, 0.0);
        assert!(config.automatable);
        assert!(config.saveable);
        assert_eq!(config.smoothing, 0.0);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: ParameterConfig =
            serde_json::from_str(r#"{ "units": "Hz", "smoothing": 0.5 }"#).unwrap();
        assert_eq!(config.units, "Hz");
        assert_eq!(config.smoothing, 0.5);
        assert_eq!(config.skew, 1.0);
        assert!(config.saveable);
    }

    #[test]
    fn loads_app_config_from_file() {
        let path = std::env::temp_dir().join(format!(
            "param-automation-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "frames": { "rate_hz": 120 } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.frames.rate_hz, 120);
        assert_eq!(config.frames.max_frames, 600);
        assert!((config.frames.frame_seconds() - 1.0 / 120.0).abs() < 1e-12);
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let err = AppConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, crate::EngineError::Io(_)));
    }
}
