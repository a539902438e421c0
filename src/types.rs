// src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub segmentation: SegmentationConfig,
    pub estimation: EstimationConfig,
    pub pipeline: PipelineConfig,
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub hsv_ranges: Vec<HsvRange>,
    pub blur_kernel_size: i32,
    pub morph_kernel_size: i32,
    pub min_grass_pixels: u32,
}

/// Inclusive HSV bounds on OpenCV's 8-bit scale (H 0-180, S/V 0-255).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HsvRange {
    pub name: String,
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    pub canny_low: f64,
    pub canny_high: f64,
    pub hough_threshold: i32,
    pub min_line_length: f64,
    pub max_line_gap: f64,
    pub weights: MethodWeights,
    pub max_slope_angle: f64,
    pub max_side_slope: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodWeights {
    pub horizon: f64,
    pub texture: f64,
    pub perspective: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Segmentation confidence below this skips slope estimation
    pub min_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub input_dir: String,
    pub fps: u32,
    pub processing_downscale: f64,
    /// Rows of simulator HUD to drop from the top of each frame
    pub ui_margin_top: i32,
    /// Rows of simulator HUD to drop from the bottom of each frame
    pub ui_margin_bottom: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub overlay_alpha: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: String,
    pub save_annotated: bool,
    pub save_results: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

// ============================================================================
// ESTIMATES
// ============================================================================

/// Output of a single slope method for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AngleEstimate {
    pub angle_deg: f64,
    /// Trust in `angle_deg`, in [0, 1]
    pub confidence: f64,
}

impl AngleEstimate {
    pub fn new(angle_deg: f64, confidence: f64) -> Self {
        Self {
            angle_deg,
            confidence,
        }
    }

    /// The (0, 0) estimate every method falls back to when it finds nothing.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Fused slope for one frame. Angles are already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SlopeResult {
    pub pitch_deg: f64,
    pub side_tilt_deg: f64,
    pub confidence: f64,
}
