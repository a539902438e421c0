// src/pipeline/frame_context.rs
//
// Everything the pipeline learned about one frame. The renderer and the
// result writer read from this instead of re-running any stage.

use crate::types::SlopeResult;
use opencv::core::Mat;

#[derive(Debug)]
pub struct FrameAnalysis {
    /// Binary grass mask (0/255), same size as the frame
    pub mask: Mat,
    pub segmentation_confidence: f64,
    /// `None` when the segmentation gate rejected the frame
    pub slope: Option<SlopeResult>,
}

impl FrameAnalysis {
    pub fn passed_gate(&self) -> bool {
        self.slope.is_some()
    }
}
