// src/estimation/perspective.rs
//
// Perspective cue: orientation of the minimum-area rectangle around the
// largest grass region.
//
// Angle convention: the rectangle edge closest to horizontal, in degrees,
// normalized into (-45, 45]. Positive means the edge falls to the right on
// screen (y grows downward), the same sign as the horizon cue's
// atan(dy/dx). Axis-aligned regions read 0.

use super::{MethodKind, SlopeMethod};
use crate::error::Result;
use crate::segmentation::{find_external_contours, largest_contour};
use crate::types::AngleEstimate;
use opencv::{core::Mat, imgproc, prelude::*};

// A region covering this share of the frame earns full confidence
const FULL_CONFIDENCE_COVERAGE: f64 = 0.1;

#[derive(Default)]
pub struct PerspectiveMethod;

impl PerspectiveMethod {
    pub fn new() -> Self {
        Self
    }
}

impl SlopeMethod for PerspectiveMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::Perspective
    }

    fn estimate(&self, mask: &Mat, _frame: &Mat) -> Result<AngleEstimate> {
        let contours = find_external_contours(mask)?;
        let Some((largest, area)) = largest_contour(&contours)? else {
            return Ok(AngleEstimate::none());
        };

        let rect = imgproc::min_area_rect(&largest)?;
        let angle = normalize_rect_angle(rect.angle as f64);

        let mask_area = mask.rows() as f64 * mask.cols() as f64;
        let confidence = (area / (mask_area * FULL_CONFIDENCE_COVERAGE)).min(1.0);

        Ok(AngleEstimate::new(angle, confidence))
    }
}

/// Map an OpenCV rotated-rect angle into (-45, 45].
///
/// OpenCV releases disagree on the raw range ([-90, 0) before 4.5.1,
/// (0, 90] after) but both report the angle of one rectangle edge, and the
/// other edge is 90° away, so reducing modulo 90 gives the same answer.
pub fn normalize_rect_angle(angle_deg: f64) -> f64 {
    let reduced = angle_deg.rem_euclid(90.0);
    if reduced > 45.0 {
        reduced - 90.0
    } else {
        reduced
    }
}
