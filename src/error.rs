// src/error.rs
//
// Precondition failures of the detection core. Degenerate input (no grass,
// no lines, flat gradients) is never an error; it yields zero confidence.

use opencv::core::{self, Mat};
use opencv::prelude::*;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DetectionError>;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("empty {0}")]
    EmptyImage(&'static str),

    #[error("{what} must be {expected}, got OpenCV type {actual}")]
    UnexpectedType {
        what: &'static str,
        expected: &'static str,
        actual: i32,
    },

    #[error("mask is {mask_width}x{mask_height} but frame is {frame_width}x{frame_height}")]
    DimensionMismatch {
        mask_width: i32,
        mask_height: i32,
        frame_width: i32,
        frame_height: i32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl DetectionError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

/// Reject anything that is not a non-empty 3-channel 8-bit frame.
pub fn ensure_color_frame(frame: &Mat) -> Result<()> {
    if frame.empty() {
        return Err(DetectionError::EmptyImage("frame"));
    }
    if frame.typ() != core::CV_8UC3 {
        return Err(DetectionError::UnexpectedType {
            what: "frame",
            expected: "CV_8UC3",
            actual: frame.typ(),
        });
    }
    Ok(())
}

/// Reject a mask that is not single-channel 8-bit.
pub fn ensure_mask(mask: &Mat) -> Result<()> {
    if mask.empty() {
        return Err(DetectionError::EmptyImage("mask"));
    }
    if mask.typ() != core::CV_8UC1 {
        return Err(DetectionError::UnexpectedType {
            what: "mask",
            expected: "CV_8UC1",
            actual: mask.typ(),
        });
    }
    Ok(())
}

/// Mask and frame must describe the same pixel grid.
pub fn ensure_same_size(mask: &Mat, frame: &Mat) -> Result<()> {
    if mask.rows() != frame.rows() || mask.cols() != frame.cols() {
        return Err(DetectionError::DimensionMismatch {
            mask_width: mask.cols(),
            mask_height: mask.rows(),
            frame_width: frame.cols(),
            frame_height: frame.rows(),
        });
    }
    Ok(())
}
