// src/overlay.rs
//
// Visualization of a processed frame: green tint over detected grass,
// slope arrows from the frame centre, and a text panel with the numbers.
// Always draws on a copy; the input frame is never touched.

use crate::types::{DisplayConfig, SlopeResult};
use anyhow::{ensure, Result};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar},
    imgproc,
    prelude::*,
};

// ============================================================================
// STYLE
// ============================================================================

const GRASS_TINT: (f64, f64, f64) = (0.0, 255.0, 0.0);
const SLOPE_ARROW: (f64, f64, f64) = (0.0, 0.0, 255.0);
const SIDE_ARROW: (f64, f64, f64) = (255.0, 0.0, 0.0);
const TEXT_COLOR: (f64, f64, f64) = (255.0, 255.0, 255.0);
const WARN_COLOR: (f64, f64, f64) = (0.0, 165.0, 255.0);
const PANEL_COLOR: (f64, f64, f64) = (40.0, 40.0, 40.0);

const ARROW_LENGTH_RATIO: f64 = 0.3;
const ARROW_TIP: f64 = 0.2;
// Side arrow is only drawn above this tilt (degrees)
const SIDE_ARROW_MIN_DEG: f64 = 1.0;

const TEXT_SCALE: f64 = 0.6;
const LINE_HEIGHT: i32 = 26;

fn color((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

/// Full overlay for a frame that passed the grass gate.
pub fn create_overlay(
    frame: &Mat,
    mask: &Mat,
    slope: &SlopeResult,
    display: &DisplayConfig,
) -> Result<Mat> {
    ensure!(
        mask.rows() == frame.rows() && mask.cols() == frame.cols(),
        "overlay mask {}x{} does not match frame {}x{}",
        mask.cols(),
        mask.rows(),
        frame.cols(),
        frame.rows()
    );

    let mut output = frame.try_clone()?;
    tint_grass(&mut output, mask, display.overlay_alpha)?;
    draw_slope_arrows(&mut output, slope)?;

    let lines = [
        format!("Slope: {:+.1} deg", slope.pitch_deg),
        format!("Side Slope: {:+.1} deg", slope.side_tilt_deg),
        format!("Confidence: {:.0}%", slope.confidence * 100.0),
    ];
    draw_text_panel(&mut output, &lines, color(TEXT_COLOR))?;

    Ok(output)
}

/// Copy of the frame with a status line, for frames the gate rejected.
pub fn annotate_low_confidence(frame: &Mat, segmentation_confidence: f64) -> Result<Mat> {
    let mut output = frame.try_clone()?;
    let lines = [format!(
        "Low grass confidence: {:.0}%",
        segmentation_confidence * 100.0
    )];
    draw_text_panel(&mut output, &lines, color(WARN_COLOR))?;
    Ok(output)
}

/// Blend a green-on-black layer over the whole frame. Grass turns green,
/// everything else is dimmed by `1 - alpha`.
fn tint_grass(output: &mut Mat, mask: &Mat, alpha: f64) -> Result<()> {
    let mut layer = Mat::new_rows_cols_with_default(
        output.rows(),
        output.cols(),
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    let green = Mat::new_rows_cols_with_default(
        output.rows(),
        output.cols(),
        core::CV_8UC3,
        color(GRASS_TINT),
    )?;
    green.copy_to_masked(&mut layer, mask)?;

    let mut blended = Mat::default();
    core::add_weighted(&layer, alpha, &*output, 1.0 - alpha, 0.0, &mut blended, -1)?;
    blended.copy_to(output)?;
    Ok(())
}

fn draw_slope_arrows(output: &mut Mat, slope: &SlopeResult) -> Result<()> {
    let center = Point::new(output.cols() / 2, output.rows() / 2);
    let length = output.cols().min(output.rows()) as f64 * ARROW_LENGTH_RATIO;

    imgproc::arrowed_line(
        output,
        center,
        arrow_end(center, length, slope.pitch_deg),
        color(SLOPE_ARROW),
        3,
        imgproc::LINE_AA,
        0,
        ARROW_TIP,
    )?;

    if slope.side_tilt_deg.abs() > SIDE_ARROW_MIN_DEG {
        imgproc::arrowed_line(
            output,
            center,
            arrow_end(center, length * 0.5, slope.side_tilt_deg),
            color(SIDE_ARROW),
            2,
            imgproc::LINE_AA,
            0,
            ARROW_TIP,
        )?;
    }

    Ok(())
}

/// Arrow tip for an angle measured from straight down the screen.
fn arrow_end(center: Point, length: f64, angle_deg: f64) -> Point {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    Point::new(
        center.x + (length * sin) as i32,
        center.y + (length * cos) as i32,
    )
}

fn draw_text_panel(output: &mut Mat, lines: &[String], text_color: Scalar) -> Result<()> {
    let panel_height = LINE_HEIGHT * lines.len() as i32 + 12;
    let panel_width = 320.min(output.cols());
    imgproc::rectangle(
        output,
        Rect::new(5, 5, panel_width - 10, panel_height),
        color(PANEL_COLOR),
        -1,
        imgproc::LINE_8,
        0,
    )?;

    for (i, line) in lines.iter().enumerate() {
        imgproc::put_text(
            output,
            line,
            Point::new(15, 28 + LINE_HEIGHT * i as i32),
            imgproc::FONT_HERSHEY_SIMPLEX,
            TEXT_SCALE,
            text_color,
            2,
            imgproc::LINE_8,
            false,
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn pixel(image: &Mat, row: i32, col: i32) -> core::Vec3b {
        *image.at_2d::<core::Vec3b>(row, col).unwrap()
    }

    #[test]
    fn test_arrow_end_points_down_when_level() {
        let end = arrow_end(Point::new(100, 100), 50.0, 0.0);
        assert_eq!(end, Point::new(100, 150));

        let tilted = arrow_end(Point::new(100, 100), 50.0, 90.0);
        assert_eq!(tilted.x, 150);
    }

    #[test]
    fn test_overlay_tints_grass_and_dims_the_rest() {
        let frame = solid_frame(300, 400, GRAY_BGR);
        let mut mask = blank_mask(300, 400);
        fill_rect(&mut mask, Rect::new(300, 200, 100, 100), Scalar::all(255.0));
        let slope = SlopeResult {
            pitch_deg: 0.0,
            side_tilt_deg: 0.0,
            confidence: 0.8,
        };

        let output = create_overlay(&frame, &mask, &slope, &DisplayConfig::default()).unwrap();

        assert_eq!(output.rows(), 300);
        assert_eq!(output.cols(), 400);
        assert_eq!(output.typ(), core::CV_8UC3);

        // Bottom-right corner is grass, bottom-left is not
        let grass = pixel(&output, 295, 395);
        assert!(grass[1] > 128, "grass should be tinted green: {:?}", grass);
        assert!(grass[0] < 128 && grass[2] < 128);
        // alpha 0.5 over black halves the background
        assert_eq!(pixel(&output, 295, 5), core::Vec3b::from([64, 64, 64]));

        // Input untouched
        assert_eq!(pixel(&frame, 295, 395), core::Vec3b::from([128, 128, 128]));
    }

    #[test]
    fn test_overlay_rejects_mismatched_mask() {
        let frame = solid_frame(100, 100, GRAY_BGR);
        let mask = blank_mask(50, 100);
        let result = create_overlay(&frame, &mask, &SlopeResult::default(), &DisplayConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_low_confidence_annotation_keeps_size() {
        let frame = solid_frame(120, 160, SKY_BGR);
        let output = annotate_low_confidence(&frame, 0.0).unwrap();
        assert_eq!(output.rows(), 120);
        assert_eq!(output.cols(), 160);
    }
}
