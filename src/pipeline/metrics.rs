// src/pipeline/metrics.rs
//
// Counters and last-frame timings for the slope pipeline. Logged as a
// summary at the end of every input.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub gated_frames: Arc<AtomicU64>,
    pub estimated_frames: Arc<AtomicU64>,
    pub failed_frames: Arc<AtomicU64>,
    pub segmentation_time_us: Arc<AtomicU64>,
    pub estimation_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            gated_frames: Arc::new(AtomicU64::new(0)),
            estimated_frames: Arc::new(AtomicU64::new(0)),
            failed_frames: Arc::new(AtomicU64::new(0)),
            segmentation_time_us: Arc::new(AtomicU64::new(0)),
            estimation_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            gated_frames: self.gated_frames.load(Ordering::Relaxed),
            estimated_frames: self.estimated_frames.load(Ordering::Relaxed),
            failed_frames: self.failed_frames.load(Ordering::Relaxed),
            fps: self.fps(),
            last_segmentation_us: self.segmentation_time_us.load(Ordering::Relaxed),
            last_estimation_us: self.estimation_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub gated_frames: u64,
    pub estimated_frames: u64,
    pub failed_frames: u64,
    pub fps: f64,
    pub last_segmentation_us: u64,
    pub last_estimation_us: u64,
    pub elapsed_secs: f64,
}
