// src/estimation/horizon.rs
//
// Horizon cue: straight edges of the grass region. Fairway borders and
// the far edge of the green tilt with the surface.

use super::{MethodKind, SlopeMethod};
use crate::error::Result;
use crate::types::{AngleEstimate, EstimationConfig};
use opencv::{
    core::{Mat, Vec4i, Vector},
    imgproc,
    prelude::*,
};
use std::f64::consts::PI;

const HOUGH_RHO: f64 = 1.0;
const HOUGH_THETA: f64 = PI / 180.0;
const CANNY_APERTURE: i32 = 3;

// Confidence saturates once this many lines agree
const LINES_FOR_FULL_CONFIDENCE: f64 = 10.0;

pub struct HorizonMethod {
    canny_low: f64,
    canny_high: f64,
    hough_threshold: i32,
    min_line_length: f64,
    max_line_gap: f64,
}

impl HorizonMethod {
    pub fn new(config: &EstimationConfig) -> Self {
        Self {
            canny_low: config.canny_low,
            canny_high: config.canny_high,
            hough_threshold: config.hough_threshold,
            min_line_length: config.min_line_length,
            max_line_gap: config.max_line_gap,
        }
    }

    fn detect_segments(&self, mask: &Mat) -> Result<Vector<Vec4i>> {
        let mut edges = Mat::default();
        imgproc::canny(
            mask,
            &mut edges,
            self.canny_low,
            self.canny_high,
            CANNY_APERTURE,
            false,
        )?;

        let mut segments = Vector::<Vec4i>::new();
        imgproc::hough_lines_p(
            &edges,
            &mut segments,
            HOUGH_RHO,
            HOUGH_THETA,
            self.hough_threshold,
            self.min_line_length,
            self.max_line_gap,
        )?;

        Ok(segments)
    }
}

impl SlopeMethod for HorizonMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::Horizon
    }

    fn estimate(&self, mask: &Mat, _frame: &Mat) -> Result<AngleEstimate> {
        let segments = self.detect_segments(mask)?;

        let mut angles: Vec<f64> = segments
            .iter()
            .filter_map(|s| segment_angle(s[0], s[1], s[2], s[3]))
            .collect();

        let Some(angle) = median(&mut angles) else {
            return Ok(AngleEstimate::none());
        };
        let confidence = (angles.len() as f64 / LINES_FOR_FULL_CONFIDENCE).min(1.0);

        Ok(AngleEstimate::new(angle, confidence))
    }
}

/// Inclination of a segment in degrees, `None` for vertical segments.
pub fn segment_angle(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<f64> {
    let dx = x2 - x1;
    if dx == 0 {
        return None;
    }
    let dy = y2 - y1;
    Some((dy as f64 / dx as f64).atan().to_degrees())
}

/// Median; the mean of the two middle values for an even count.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
