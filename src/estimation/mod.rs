// src/estimation/mod.rs
//
// Slope estimation from a grass mask.
//
// Signal flow:
//   mask ─┬→ horizon (Canny + probabilistic Hough) ──────┐
//         ├→ texture (Sobel over the mask) ──────────────┼→ fusion → SlopeResult
//         └→ perspective (largest contour, min-area rect)┘
//
// Every method degrades to a (0, 0) estimate on degenerate input, which
// fusion then weighs away through its zero confidence.

pub mod fusion;
pub mod horizon;
pub mod perspective;
pub mod texture;

pub use fusion::{derive_side_tilt, fuse, SlopeLimits};
pub use horizon::HorizonMethod;
pub use perspective::PerspectiveMethod;
pub use texture::TextureMethod;

use crate::error::{ensure_color_frame, ensure_mask, ensure_same_size, Result};
use crate::types::{AngleEstimate, EstimationConfig, MethodWeights, SlopeResult};
use opencv::core::Mat;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Horizon,
    Texture,
    Perspective,
}

impl MethodKind {
    pub const ALL: [MethodKind; 3] = [
        MethodKind::Horizon,
        MethodKind::Texture,
        MethodKind::Perspective,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MethodKind::Horizon => "HORIZON",
            MethodKind::Texture => "TEXTURE",
            MethodKind::Perspective => "PERSPECTIVE",
        }
    }

    fn build(self, config: &EstimationConfig) -> Box<dyn SlopeMethod> {
        match self {
            MethodKind::Horizon => Box::new(HorizonMethod::new(config)),
            MethodKind::Texture => Box::new(TextureMethod::new()),
            MethodKind::Perspective => Box::new(PerspectiveMethod::new()),
        }
    }
}

impl MethodWeights {
    pub fn for_method(&self, kind: MethodKind) -> f64 {
        match kind {
            MethodKind::Horizon => self.horizon,
            MethodKind::Texture => self.texture,
            MethodKind::Perspective => self.perspective,
        }
    }
}

/// One independent slope cue.
///
/// Callers guarantee `mask` is a CV_8UC1 0/255 image and `frame` a CV_8UC3
/// image of the same size. Implementations must return
/// [`AngleEstimate::none`] instead of failing when they find nothing.
pub trait SlopeMethod: Send + Sync {
    fn kind(&self) -> MethodKind;

    fn estimate(&self, mask: &Mat, frame: &Mat) -> Result<AngleEstimate>;
}

pub struct SlopeEstimator {
    methods: Vec<Box<dyn SlopeMethod>>,
    weights: MethodWeights,
    limits: SlopeLimits,
}

impl SlopeEstimator {
    pub fn new(config: &EstimationConfig) -> Self {
        Self {
            methods: MethodKind::ALL.iter().map(|kind| kind.build(config)).collect(),
            weights: config.weights,
            limits: SlopeLimits {
                max_slope_angle: config.max_slope_angle,
                max_side_slope: config.max_side_slope,
            },
        }
    }

    /// Fused (pitch, side-tilt, confidence) for one frame.
    pub fn estimate(&self, mask: &Mat, frame: &Mat) -> Result<SlopeResult> {
        let estimates = self.estimate_methods(mask, frame)?;
        let result = fuse(&estimates, &self.weights, &self.limits);

        debug!(
            "Fused slope: pitch={:.2}°, side={:.2}°, confidence={:.2}",
            result.pitch_deg, result.side_tilt_deg, result.confidence
        );

        Ok(result)
    }

    /// Raw per-method estimates, before fusion.
    pub fn estimate_methods(
        &self,
        mask: &Mat,
        frame: &Mat,
    ) -> Result<Vec<(MethodKind, AngleEstimate)>> {
        ensure_mask(mask)?;
        ensure_color_frame(frame)?;
        ensure_same_size(mask, frame)?;

        let mut estimates = Vec::with_capacity(self.methods.len());
        for method in &self.methods {
            let estimate = method.estimate(mask, frame)?;
            debug!(
                "  {:<11} angle={:+.2}° conf={:.2}",
                method.kind().as_str(),
                estimate.angle_deg,
                estimate.confidence
            );
            estimates.push((method.kind(), estimate));
        }

        Ok(estimates)
    }
}
