// src/segmentation.rs
//
// Grass segmentation: HSV range classification, mask cleanup, and a
// coverage-based confidence score.
//
// HSV decouples hue from brightness, so the same ranges hold across the
// simulator's lighting presets. Several ranges are OR-ed together to cover
// light fairway turf and darker green cuts.

use crate::error::{ensure_color_frame, ensure_mask, Result};
use crate::types::SegmentationConfig;
use opencv::{
    core::{self, Mat, Point, Scalar, Size, Vector},
    imgproc,
    prelude::*,
};
use tracing::debug;

const MASK_ON: f64 = 255.0;
const BINARY_THRESHOLD: f64 = 127.0;

// Coverage band considered reliable (inclusive)
const RELIABLE_COVERAGE_MIN: f64 = 0.2;
const RELIABLE_COVERAGE_MAX: f64 = 0.8;
const EXTREME_COVERAGE_CONFIDENCE: f64 = 0.5;

pub type Contour = Vector<Point>;

pub struct SegmentationEngine {
    config: SegmentationConfig,
}

impl SegmentationEngine {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    /// Segment grass in a BGR frame.
    ///
    /// Returns the binary mask (0/255, same size as `frame`) and the
    /// coverage confidence in [0, 1].
    pub fn segment(&self, frame: &Mat) -> Result<(Mat, f64)> {
        ensure_color_frame(frame)?;

        let raw = self.classify(frame)?;
        let mask = self.clean_mask(&raw)?;

        let grass_pixels = core::count_non_zero(&mask)? as u64;
        let total_pixels = mask.total() as u64;
        let confidence =
            coverage_confidence(grass_pixels, total_pixels, self.config.min_grass_pixels);

        debug!(
            "Segmentation: {}/{} grass pixels ({:.1}%), confidence={:.2}",
            grass_pixels,
            total_pixels,
            100.0 * grass_pixels as f64 / total_pixels.max(1) as f64,
            confidence
        );

        Ok((mask, confidence))
    }

    /// Union of all configured HSV ranges, before cleanup.
    fn classify(&self, frame: &Mat) -> Result<Mat> {
        let mut hsv = Mat::default();
        imgproc::cvt_color_def(frame, &mut hsv, imgproc::COLOR_BGR2HSV)?;

        let mut combined =
            Mat::new_rows_cols_with_default(frame.rows(), frame.cols(), core::CV_8UC1, Scalar::all(0.0))?;

        for range in &self.config.hsv_ranges {
            let mut in_range = Mat::default();
            core::in_range(
                &hsv,
                &hsv_scalar(range.lower),
                &hsv_scalar(range.upper),
                &mut in_range,
            )?;

            let mut merged = Mat::default();
            core::bitwise_or_def(&combined, &in_range, &mut merged)?;
            combined = merged;
        }

        Ok(combined)
    }

    /// Blur, close, open, then re-binarize at the midpoint.
    pub fn clean_mask(&self, mask: &Mat) -> Result<Mat> {
        ensure_mask(mask)?;

        let blur = self.config.blur_kernel_size;
        let mut blurred = Mat::default();
        imgproc::gaussian_blur_def(mask, &mut blurred, Size::new(blur, blur), 0.0)?;

        let k = self.config.morph_kernel_size;
        let kernel =
            imgproc::get_structuring_element(imgproc::MORPH_RECT, Size::new(k, k), Point::new(-1, -1))?;

        // Close fills pinholes, open drops isolated specks
        let mut closed = Mat::default();
        imgproc::morphology_ex_def(&blurred, &mut closed, imgproc::MORPH_CLOSE, &kernel)?;
        let mut opened = Mat::default();
        imgproc::morphology_ex_def(&closed, &mut opened, imgproc::MORPH_OPEN, &kernel)?;

        let mut binary = Mat::default();
        imgproc::threshold(
            &opened,
            &mut binary,
            BINARY_THRESHOLD,
            MASK_ON,
            imgproc::THRESH_BINARY,
        )?;

        Ok(binary)
    }

    /// External contours of the mask, simplified polylines.
    pub fn contours(&self, mask: &Mat) -> Result<Vec<Contour>> {
        ensure_mask(mask)?;
        Ok(find_external_contours(mask)?.to_vec())
    }

    /// Filled mask of the largest external contour, or `None` for an
    /// empty mask.
    pub fn largest_connected_region(&self, mask: &Mat) -> Result<Option<Mat>> {
        ensure_mask(mask)?;

        let contours = find_external_contours(mask)?;
        let Some((largest, area)) = largest_contour(&contours)? else {
            return Ok(None);
        };

        let mut region =
            Mat::new_rows_cols_with_default(mask.rows(), mask.cols(), core::CV_8UC1, Scalar::all(0.0))?;
        let mut polygons = Vector::<Contour>::new();
        polygons.push(largest);
        imgproc::fill_poly_def(&mut region, &polygons, Scalar::all(MASK_ON))?;

        debug!(
            "Largest grass region: area={:.0} of {} contours",
            area,
            contours.len()
        );

        Ok(Some(region))
    }
}

/// Confidence from grass coverage. Too few pixels is no signal at all;
/// a moderate share of the frame is the reliable regime.
pub fn coverage_confidence(grass_pixels: u64, total_pixels: u64, min_grass_pixels: u32) -> f64 {
    if total_pixels == 0 || grass_pixels == 0 || grass_pixels < u64::from(min_grass_pixels) {
        return 0.0;
    }

    let coverage = grass_pixels as f64 / total_pixels as f64;
    if (RELIABLE_COVERAGE_MIN..=RELIABLE_COVERAGE_MAX).contains(&coverage) {
        1.0
    } else {
        EXTREME_COVERAGE_CONFIDENCE
    }
}

pub(crate) fn find_external_contours(mask: &Mat) -> Result<Vector<Contour>> {
    let mut contours = Vector::<Contour>::new();
    imgproc::find_contours(
        mask,
        &mut contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_SIMPLE,
        Point::new(0, 0),
    )?;
    Ok(contours)
}

/// Largest contour by area with its area. First one wins on ties.
pub(crate) fn largest_contour(contours: &Vector<Contour>) -> Result<Option<(Contour, f64)>> {
    let mut best: Option<(Contour, f64)> = None;
    for contour in contours.iter() {
        let area = imgproc::contour_area(&contour, false)?;
        let is_larger = best.as_ref().map_or(true, |(_, best_area)| area > *best_area);
        if is_larger {
            best = Some((contour, area));
        }
    }
    Ok(best)
}

fn hsv_scalar(hsv: [u8; 3]) -> Scalar {
    Scalar::new(hsv[0] as f64, hsv[1] as f64, hsv[2] as f64, 0.0)
}
