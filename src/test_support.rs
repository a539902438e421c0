// src/test_support.rs
//
// Synthetic frames and masks shared by the unit tests.

use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Vector},
    imgproc,
    prelude::*,
};

/// BGR turf green: HSV (60, 191, 160) on OpenCV's scale.
pub const GRASS_BGR: (f64, f64, f64) = (40.0, 160.0, 40.0);
/// Neutral gray, saturation 0 so never grass.
pub const GRAY_BGR: (f64, f64, f64) = (128.0, 128.0, 128.0);
/// Saturated blue, hue 120 so never grass.
pub const SKY_BGR: (f64, f64, f64) = (200.0, 50.0, 50.0);

pub fn bgr((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

pub fn solid_frame(rows: i32, cols: i32, color: (f64, f64, f64)) -> Mat {
    Mat::new_rows_cols_with_default(rows, cols, core::CV_8UC3, bgr(color)).unwrap()
}

pub fn blank_mask(rows: i32, cols: i32) -> Mat {
    Mat::new_rows_cols_with_default(rows, cols, core::CV_8UC1, Scalar::all(0.0)).unwrap()
}

pub fn fill_rect(image: &mut Mat, rect: Rect, color: Scalar) {
    imgproc::rectangle(image, rect, color, imgproc::FILLED, imgproc::LINE_8, 0).unwrap();
}

/// Filled rectangle of size `w`x`h` centred at (`cx`, `cy`), rotated by
/// `angle_deg` (positive = clockwise on screen, y pointing down).
pub fn fill_rotated_rect(
    image: &mut Mat,
    cx: f64,
    cy: f64,
    w: f64,
    h: f64,
    angle_deg: f64,
    color: Scalar,
) {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let corners = [(-w / 2.0, -h / 2.0), (w / 2.0, -h / 2.0), (w / 2.0, h / 2.0), (-w / 2.0, h / 2.0)];
    let mut points = Vector::<Point>::new();
    for (x, y) in corners {
        let rx = cx + x * cos - y * sin;
        let ry = cy + x * sin + y * cos;
        points.push(Point::new(rx.round() as i32, ry.round() as i32));
    }
    imgproc::fill_convex_poly(image, &points, color, imgproc::LINE_8, 0).unwrap();
}

pub fn count_on(mask: &Mat) -> i32 {
    core::count_non_zero(mask).unwrap()
}
