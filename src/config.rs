// src/config.rs

use crate::error::DetectionError;
use crate::types::{
    CaptureConfig, Config, DisplayConfig, EstimationConfig, HsvRange, LoggingConfig,
    MethodWeights, OutputConfig, PipelineConfig, SegmentationConfig,
};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
const MAX_OPENCV_HUE: u8 = 180;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config file {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    /// Runs before logging is initialized, so the caller reports which one
    /// was used.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Checked once at load; per-frame code assumes a valid config.
    pub fn validate(&self) -> std::result::Result<(), DetectionError> {
        self.segmentation.validate()?;
        self.estimation.validate()?;

        let min_conf = self.pipeline.min_confidence;
        if !(0.0..=1.0).contains(&min_conf) {
            return Err(DetectionError::invalid_config(format!(
                "pipeline.min_confidence must be in [0, 1], got {}",
                min_conf
            )));
        }

        if self.capture.fps == 0 {
            return Err(DetectionError::invalid_config("capture.fps must be > 0"));
        }
        let scale = self.capture.processing_downscale;
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(DetectionError::invalid_config(format!(
                "capture.processing_downscale must be in (0, 1], got {}",
                scale
            )));
        }
        if self.capture.ui_margin_top < 0 || self.capture.ui_margin_bottom < 0 {
            return Err(DetectionError::invalid_config(
                "capture UI margins must not be negative",
            ));
        }

        if !(0.0..=1.0).contains(&self.display.overlay_alpha) {
            return Err(DetectionError::invalid_config(format!(
                "display.overlay_alpha must be in [0, 1], got {}",
                self.display.overlay_alpha
            )));
        }

        Ok(())
    }
}

impl SegmentationConfig {
    fn validate(&self) -> std::result::Result<(), DetectionError> {
        if self.hsv_ranges.is_empty() {
            return Err(DetectionError::invalid_config(
                "segmentation.hsv_ranges must contain at least one range",
            ));
        }
        for range in &self.hsv_ranges {
            range.validate()?;
        }
        check_kernel("segmentation.blur_kernel_size", self.blur_kernel_size)?;
        check_kernel("segmentation.morph_kernel_size", self.morph_kernel_size)?;
        Ok(())
    }
}

impl HsvRange {
    pub fn new(name: &str, lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self {
            name: name.to_string(),
            lower,
            upper,
        }
    }

    fn validate(&self) -> std::result::Result<(), DetectionError> {
        if self.upper[0] > MAX_OPENCV_HUE {
            return Err(DetectionError::invalid_config(format!(
                "hsv range '{}': hue {} exceeds {}",
                self.name, self.upper[0], MAX_OPENCV_HUE
            )));
        }
        if self.lower.iter().zip(self.upper.iter()).any(|(lo, hi)| lo > hi) {
            return Err(DetectionError::invalid_config(format!(
                "hsv range '{}': lower {:?} exceeds upper {:?}",
                self.name, self.lower, self.upper
            )));
        }
        Ok(())
    }
}

impl EstimationConfig {
    fn validate(&self) -> std::result::Result<(), DetectionError> {
        if !(is_non_negative(self.canny_low)
            && self.canny_low <= self.canny_high
            && self.canny_high.is_finite())
        {
            return Err(DetectionError::invalid_config(format!(
                "estimation canny thresholds must satisfy 0 <= low <= high, got {} / {}",
                self.canny_low, self.canny_high
            )));
        }
        if self.hough_threshold <= 0 {
            return Err(DetectionError::invalid_config(
                "estimation.hough_threshold must be > 0",
            ));
        }
        if !(is_non_negative(self.min_line_length) && is_non_negative(self.max_line_gap)) {
            return Err(DetectionError::invalid_config(
                "estimation line length and gap must not be negative",
            ));
        }
        if !(is_positive(self.max_slope_angle) && is_positive(self.max_side_slope)) {
            return Err(DetectionError::invalid_config(
                "estimation slope maxima must be > 0",
            ));
        }
        self.weights.validate()
    }
}

impl MethodWeights {
    pub fn sum(&self) -> f64 {
        self.horizon + self.texture + self.perspective
    }

    fn validate(&self) -> std::result::Result<(), DetectionError> {
        if ![self.horizon, self.texture, self.perspective]
            .iter()
            .all(|w| is_non_negative(*w))
        {
            return Err(DetectionError::invalid_config(
                "fusion weights must be finite and not negative",
            ));
        }
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(DetectionError::invalid_config(format!(
                "fusion weights must sum to 1.0, got {:.6}",
                self.sum()
            )));
        }
        Ok(())
    }
}

// Written so that NaN fails the check.
fn is_positive(value: f64) -> bool {
    value > 0.0 && value.is_finite()
}

fn is_non_negative(value: f64) -> bool {
    value >= 0.0 && value.is_finite()
}

fn check_kernel(name: &str, size: i32) -> std::result::Result<(), DetectionError> {
    if size <= 0 || size % 2 == 0 {
        return Err(DetectionError::invalid_config(format!(
            "{} must be a positive odd number, got {}",
            name, size
        )));
    }
    Ok(())
}

// ============================================================================
// DEFAULTS
// ============================================================================

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            hsv_ranges: vec![
                HsvRange::new("standard_green", [40, 30, 30], [80, 255, 255]),
                HsvRange::new("light_green", [35, 30, 30], [45, 255, 255]),
                HsvRange::new("dark_green", [50, 30, 30], [70, 255, 255]),
            ],
            blur_kernel_size: 5,
            morph_kernel_size: 5,
            min_grass_pixels: 5000,
        }
    }
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            hough_threshold: 100,
            min_line_length: 100.0,
            max_line_gap: 10.0,
            weights: MethodWeights::default(),
            max_slope_angle: 15.0,
            max_side_slope: 10.0,
        }
    }
}

impl Default for MethodWeights {
    fn default() -> Self {
        Self {
            horizon: 0.4,
            texture: 0.3,
            perspective: 0.3,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            input_dir: "input".to_string(),
            fps: 12,
            processing_downscale: 0.5,
            ui_margin_top: 50,
            ui_margin_bottom: 50,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { overlay_alpha: 0.5 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            save_annotated: true,
            save_results: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = Config::default();
        config.estimation.weights.texture = 0.5;
        let err = config.validate().unwrap_err();
        assert!(
            err.to_string().contains("sum to 1.0"),
            "unexpected error: {}",
            err
        );
    }

    #[test]
    fn test_nan_limits_rejected() {
        let mut config = Config::default();
        config.estimation.max_slope_angle = f64::NAN;
        assert!(config.validate().is_err(), "NaN slope maximum must be rejected");

        let mut config = Config::default();
        config.estimation.max_side_slope = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.estimation.weights.horizon = f64::NAN;
        assert!(config.validate().is_err(), "NaN weight must be rejected");

        let mut config = Config::default();
        config.estimation.canny_low = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.estimation.max_line_gap = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_from_yaml_rejected_at_load() {
        let yaml = "estimation:\n  max_slope_angle: .nan\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.estimation.max_slope_angle.is_nan());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_even_kernel_rejected() {
        let mut config = Config::default();
        config.segmentation.blur_kernel_size = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_hsv_range_rejected() {
        let mut config = Config::default();
        config
            .segmentation
            .hsv_ranges
            .push(HsvRange::new("broken", [60, 30, 30], [40, 255, 255]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "estimation:\n  max_slope_angle: 20.0\nlogging:\n  level: debug\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.estimation.max_slope_angle, 20.0);
        assert_eq!(config.estimation.hough_threshold, 100);
        assert_eq!(config.segmentation.hsv_ranges.len(), 3);
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default("definitely/not/here.yaml").unwrap();
        assert_eq!(config.capture.fps, 12);
    }
}
