use crate::error::{ChatError, ChatResult};
use serde::{Deserialize, Serialize};

pub const TEMPERATURE_MIN: f32 = 0.01;
pub const TEMPERATURE_MAX: f32 = 5.0;
pub const TEMPERATURE_DEFAULT: f32 = 0.6;

pub const TOP_P_MIN: f32 = 0.01;
pub const TOP_P_MAX: f32 = 1.0;
pub const TOP_P_DEFAULT: f32 = 0.9;

/// Slider step for both parameters
pub const PARAM_STEP: f32 = 0.01;

/// Sampling parameters forwarded verbatim to the model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Randomness of the generated text. Lower is more deterministic.
    pub temperature: f32,
    /// Nucleus sampling cutoff. Lower focuses on fewer options.
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: TEMPERATURE_DEFAULT,
            top_p: TOP_P_DEFAULT,
        }
    }
}

impl GenerationParams {
    /// Build parameters, rejecting values outside their bounds
    pub fn new(temperature: f32, top_p: f32) -> ChatResult<Self> {
        let mut params = Self::default();
        params.set_temperature(temperature)?;
        params.set_top_p(top_p)?;
        Ok(params)
    }

    /// Check that both values are inside their bounds
    pub fn validate(&self) -> ChatResult<()> {
        check_range("temperature", self.temperature, TEMPERATURE_MIN, TEMPERATURE_MAX)?;
        check_range("top_p", self.top_p, TOP_P_MIN, TOP_P_MAX)
    }

    pub fn set_temperature(&mut self, value: f32) -> ChatResult<()> {
        check_range("temperature", value, TEMPERATURE_MIN, TEMPERATURE_MAX)?;
        self.temperature = value;
        Ok(())
    }

    pub fn set_top_p(&mut self, value: f32) -> ChatResult<()> {
        check_range("top_p", value, TOP_P_MIN, TOP_P_MAX)?;
        self.top_p = value;
        Ok(())
    }

    /// Move temperature by `steps` slider increments, clamped to bounds
    pub fn nudge_temperature(&mut self, steps: i32) {
        self.temperature = snap(self.temperature + steps as f32 * PARAM_STEP)
            .clamp(TEMPERATURE_MIN, TEMPERATURE_MAX);
    }

    /// Move top_p by `steps` slider increments, clamped to bounds
    pub fn nudge_top_p(&mut self, steps: i32) {
        self.top_p = snap(self.top_p + steps as f32 * PARAM_STEP).clamp(TOP_P_MIN, TOP_P_MAX);
    }

    /// Temperature position within its range, 0.0..=1.0 (for gauges)
    pub fn temperature_ratio(&self) -> f64 {
        ratio(self.temperature, TEMPERATURE_MIN, TEMPERATURE_MAX)
    }

    /// top_p position within its range, 0.0..=1.0 (for gauges)
    pub fn top_p_ratio(&self) -> f64 {
        ratio(self.top_p, TOP_P_MIN, TOP_P_MAX)
    }
}

fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> ChatResult<()> {
    // NaN falls through to the error branch
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ChatError::ParameterOutOfRange { name, value, min, max })
    }
}

/// Round to the nearest slider step
fn snap(value: f32) -> f32 {
    (value / PARAM_STEP).round() * PARAM_STEP
}

fn ratio(value: f32, min: f32, max: f32) -> f64 {
    (((value - min) / (max - min)) as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_slider_defaults() {
        let params = GenerationParams::default();
        assert_eq!(params.temperature, 0.6);
        assert_eq!(params.top_p, 0.9);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(GenerationParams::new(0.0, 0.5).is_err());
        assert!(GenerationParams::new(5.01, 0.5).is_err());
        assert!(GenerationParams::new(1.0, 1.5).is_err());
        assert!(GenerationParams::new(f32::NAN, 0.5).is_err());

        let err = GenerationParams::new(1.0, 0.0).unwrap_err();
        assert!(matches!(err, ChatError::ParameterOutOfRange { name: "top_p", .. }));
    }

    #[test]
    fn accepts_bounds() {
        let params = GenerationParams::new(5.0, 0.01).unwrap();
        assert!((params.temperature - 5.0).abs() < 1e-4);
        assert!((params.top_p - 0.01).abs() < 1e-4);
    }

    #[test]
    fn nudges_clamp_to_bounds() {
        let mut params = GenerationParams::default();
        params.nudge_top_p(50);
        assert!((params.top_p - TOP_P_MAX).abs() < 1e-4);

        params.nudge_temperature(-1000);
        assert!((params.temperature - TEMPERATURE_MIN).abs() < 1e-4);

        params.nudge_temperature(10);
        assert!((params.temperature - 0.11).abs() < 1e-4);
    }

    #[test]
    fn exact_values_are_kept_until_nudged() {
        let mut params = GenerationParams::default();
        params.set_temperature(0.127).unwrap();
        params.set_top_p(0.333).unwrap();
        assert_eq!(params.temperature, 0.127);
        assert_eq!(params.top_p, 0.333);

        params.nudge_temperature(1);
        assert!((params.temperature - 0.14).abs() < 1e-4);
    }

    #[test]
    fn ratios_span_unit_interval() {
        let low = GenerationParams::new(TEMPERATURE_MIN, TOP_P_MIN).unwrap();
        assert!(low.temperature_ratio().abs() < 1e-6);
        assert!(low.top_p_ratio().abs() < 1e-6);

        let high = GenerationParams::new(TEMPERATURE_MAX, TOP_P_MAX).unwrap();
        assert!((high.temperature_ratio() - 1.0).abs() < 1e-6);
        assert!((high.top_p_ratio() - 1.0).abs() < 1e-6);
    }
}
