// src/estimation/texture.rs
//
// Texture cue: dominant gradient direction of the grass mask itself.
// Only pixels stronger than the image-wide mean gradient vote, weighted by
// their magnitude, so the flat interior and background contribute nothing.
// The frame's colours and lighting play no part.

use super::{MethodKind, SlopeMethod};
use crate::error::Result;
use crate::types::AngleEstimate;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};

const SOBEL_KSIZE: i32 = 3;
// Mean qualifying magnitude that maps to full confidence
const FULL_CONFIDENCE_MAGNITUDE: f64 = 255.0;

#[derive(Default)]
pub struct TextureMethod;

impl TextureMethod {
    pub fn new() -> Self {
        Self
    }

    fn sobel(image: &Mat, dx: i32, dy: i32) -> Result<Mat> {
        let mut gradient = Mat::default();
        imgproc::sobel(
            image,
            &mut gradient,
            core::CV_64F,
            dx,
            dy,
            SOBEL_KSIZE,
            1.0,
            0.0,
            core::BORDER_DEFAULT,
        )?;
        Ok(gradient)
    }
}

impl SlopeMethod for TextureMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::Texture
    }

    fn estimate(&self, mask: &Mat, _frame: &Mat) -> Result<AngleEstimate> {
        let gx = Self::sobel(mask, 1, 0)?;
        let gy = Self::sobel(mask, 0, 1)?;

        Ok(gradient_estimate(gx.data_typed::<f64>()?, gy.data_typed::<f64>()?))
    }
}

/// Magnitude-weighted mean direction (degrees, atan2 convention) over
/// pixels whose magnitude exceeds the mean.
pub fn gradient_estimate(gx: &[f64], gy: &[f64]) -> AngleEstimate {
    debug_assert_eq!(gx.len(), gy.len());
    if gx.is_empty() {
        return AngleEstimate::none();
    }

    let magnitudes: Vec<f64> = gx.iter().zip(gy).map(|(x, y)| x.hypot(*y)).collect();
    let mean_magnitude = magnitudes.iter().sum::<f64>() / magnitudes.len() as f64;

    let mut weighted_direction = 0.0;
    let mut weight_sum = 0.0;
    let mut count = 0usize;
    for ((x, y), magnitude) in gx.iter().zip(gy).zip(&magnitudes) {
        if *magnitude > mean_magnitude {
            weighted_direction += y.atan2(*x).to_degrees() * magnitude;
            weight_sum += magnitude;
            count += 1;
        }
    }

    if count == 0 {
        return AngleEstimate::none();
    }

    let direction = weighted_direction / weight_sum;
    let mean_qualifying = weight_sum / count as f64;
    let confidence = (mean_qualifying / FULL_CONFIDENCE_MAGNITUDE).min(1.0);

    AngleEstimate::new(direction, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use opencv::core::{Rect, Scalar};

    #[test]
    fn test_flat_field_has_no_texture() {
        let gx = vec![0.0; 100];
        let gy = vec![0.0; 100];
        assert_eq!(gradient_estimate(&gx, &gy), AngleEstimate::none());
    }

    #[test]
    fn test_uniform_gradient_has_no_qualifying_pixels() {
        // Every pixel equals the mean, none strictly exceeds it
        let gx = vec![3.0; 50];
        let gy = vec![4.0; 50];
        assert_eq!(gradient_estimate(&gx, &gy), AngleEstimate::none());
    }

    #[test]
    fn test_weighted_direction() {
        // Two strong pixels pointing +x and +y, weights 30 and 10
        let gx = [0.0, 0.0, 30.0, 0.0];
        let gy = [0.0, 0.0, 0.0, 10.0];

        let est = gradient_estimate(&gx, &gy);

        // Mean magnitude is 10, only the 30-magnitude pixel qualifies
        assert!((est.angle_deg - 0.0).abs() < 1e-9, "got {}", est.angle_deg);
        assert!((est.confidence - 30.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_saturates() {
        let gx = [0.0, 0.0, 0.0, 600.0];
        let gy = [0.0, 0.0, 0.0, -600.0];

        let est = gradient_estimate(&gx, &gy);

        assert!((est.angle_deg + 45.0).abs() < 1e-9);
        assert_eq!(est.confidence, 1.0);
    }

    #[test]
    fn test_empty_mask_has_no_texture() {
        let mask = blank_mask(120, 160);
        let frame = solid_frame(120, 160, GRASS_BGR);

        let est = TextureMethod::new().estimate(&mask, &frame).unwrap();
        assert_eq!(est, AngleEstimate::none());
    }

    #[test]
    fn test_grass_boundary_produces_texture() {
        let mut mask = blank_mask(120, 160);
        fill_rect(&mut mask, Rect::new(0, 60, 160, 60), Scalar::all(255.0));
        let frame = solid_frame(120, 160, GRASS_BGR);

        let est = TextureMethod::new().estimate(&mask, &frame).unwrap();

        // Mask rises downward across the horizontal border: +90°
        assert!((est.angle_deg - 90.0).abs() < 1.0, "got {}", est.angle_deg);
        // A 0/255 step gives magnitude 1020, well past saturation
        assert_eq!(est.confidence, 1.0);
    }

    #[test]
    fn test_dark_frame_does_not_silence_texture() {
        let mut mask = blank_mask(120, 160);
        fill_rect(&mut mask, Rect::new(0, 60, 160, 60), Scalar::all(255.0));
        let black = solid_frame(120, 160, (0.0, 0.0, 0.0));
        let green = solid_frame(120, 160, GRASS_BGR);

        let on_black = TextureMethod::new().estimate(&mask, &black).unwrap();
        let on_green = TextureMethod::new().estimate(&mask, &green).unwrap();

        assert!(on_black.confidence > 0.0, "mask edges alone must carry the cue");
        assert_eq!(on_black.angle_deg.to_bits(), on_green.angle_deg.to_bits());
        assert_eq!(on_black.confidence.to_bits(), on_green.confidence.to_bits());
    }
}
