// src/estimation/fusion.rs
//
// Confidence-weighted fusion of the per-method estimates.
//
// Each contribution is scaled by the method's fixed weight AND by its own
// per-frame confidence, so a method that found nothing adds ~0 to both the
// angle and the overall confidence. Clamping happens once, after fusion.

use super::MethodKind;
use crate::types::{AngleEstimate, MethodWeights, SlopeResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeLimits {
    pub max_slope_angle: f64,
    pub max_side_slope: f64,
}

pub fn fuse(
    estimates: &[(MethodKind, AngleEstimate)],
    weights: &MethodWeights,
    limits: &SlopeLimits,
) -> SlopeResult {
    let mut pitch_raw = 0.0;
    let mut confidence = 0.0;

    for (kind, estimate) in estimates {
        let weight = weights.for_method(*kind);
        pitch_raw += estimate.angle_deg * weight * estimate.confidence;
        confidence += weight * estimate.confidence;
    }

    let side_tilt = derive_side_tilt(pitch_raw);

    SlopeResult {
        pitch_deg: pitch_raw.clamp(-limits.max_slope_angle, limits.max_slope_angle),
        side_tilt_deg: side_tilt.clamp(-limits.max_side_slope, limits.max_side_slope),
        confidence,
    }
}

/// Side tilt is not measured on its own; it is the fused pitch wrapped
/// into (-180, 180].
pub fn derive_side_tilt(pitch_deg: f64) -> f64 {
    let rad = pitch_deg.to_radians();
    rad.sin().atan2(rad.cos()).to_degrees()
}
