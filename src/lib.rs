// src/lib.rs
//
// Putting-green slope detection: grass segmentation, multi-method slope
// estimation with confidence-weighted fusion, and the frame pipeline that
// ties them together.

pub mod config;
pub mod error;
pub mod estimation;
pub mod frame_source;
pub mod overlay;
pub mod pipeline;
pub mod report;
pub mod segmentation;
pub mod types;

#[cfg(test)]
mod test_support;

pub use error::{DetectionError, Result};
pub use estimation::{MethodKind, SlopeEstimator, SlopeMethod};
pub use pipeline::{FrameAnalysis, SlopePipeline};
pub use segmentation::SegmentationEngine;
pub use types::{AngleEstimate, Config, SlopeResult};
