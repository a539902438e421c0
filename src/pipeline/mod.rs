// src/pipeline/mod.rs
//
// Per-frame driver: segmentation → confidence gate → slope estimation.
// The gate lives here, not in the estimator.

pub mod frame_context;
pub mod metrics;

pub use frame_context::FrameAnalysis;
pub use metrics::{MetricsSummary, PipelineMetrics};

use crate::error::Result;
use crate::estimation::SlopeEstimator;
use crate::segmentation::SegmentationEngine;
use crate::types::Config;
use opencv::core::Mat;
use std::time::Instant;
use tracing::debug;

pub struct SlopePipeline {
    segmentation: SegmentationEngine,
    estimator: SlopeEstimator,
    min_confidence: f64,
    metrics: PipelineMetrics,
}

impl SlopePipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            segmentation: SegmentationEngine::new(config.segmentation.clone()),
            estimator: SlopeEstimator::new(&config.estimation),
            min_confidence: config.pipeline.min_confidence,
            metrics: PipelineMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn segmentation(&self) -> &SegmentationEngine {
        &self.segmentation
    }

    pub fn process(&self, frame: &Mat) -> Result<FrameAnalysis> {
        self.metrics.inc(&self.metrics.total_frames);

        let result = self.run_stages(frame);
        if result.is_err() {
            self.metrics.inc(&self.metrics.failed_frames);
        }
        result
    }

    fn run_stages(&self, frame: &Mat) -> Result<FrameAnalysis> {
        let seg_start = Instant::now();
        let (mask, segmentation_confidence) = self.segmentation.segment(frame)?;
        self.metrics.set_timing(
            &self.metrics.segmentation_time_us,
            seg_start.elapsed().as_micros() as u64,
        );

        if segmentation_confidence < self.min_confidence {
            debug!(
                "Grass confidence {:.2} below {:.2}, skipping slope estimation",
                segmentation_confidence, self.min_confidence
            );
            self.metrics.inc(&self.metrics.gated_frames);
            return Ok(FrameAnalysis {
                mask,
                segmentation_confidence,
                slope: None,
            });
        }

        let est_start = Instant::now();
        let slope = self.estimator.estimate(&mask, frame)?;
        self.metrics.set_timing(
            &self.metrics.estimation_time_us,
            est_start.elapsed().as_micros() as u64,
        );
        self.metrics.inc(&self.metrics.estimated_frames);

        Ok(FrameAnalysis {
            mask,
            segmentation_confidence,
            slope: Some(slope),
        })
    }
}
