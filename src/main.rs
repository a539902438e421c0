// src/main.rs

use anyhow::Result;
use slope_detection::{
    frame_source::{find_inputs, prepare_frame, InputSource},
    overlay,
    report::{AnnotatedWriter, FrameReport, ResultWriter},
    Config, SlopePipeline,
};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path =
        std::env::var("SLOPE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("slope_detection={},opencv=warn", config.logging.level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("⛳ Putting Green Slope Detection Starting");
    if Path::new(&config_path).exists() {
        info!("✓ Configuration loaded from {}", config_path);
    } else {
        warn!("Config file {} not found, using defaults", config_path);
    }

    info!(
        "Gate: min_confidence={:.2}, min_grass_pixels={}, {} HSV ranges",
        config.pipeline.min_confidence,
        config.segmentation.min_grass_pixels,
        config.segmentation.hsv_ranges.len()
    );
    info!(
        "Fusion weights: horizon={:.2}, texture={:.2}, perspective={:.2}",
        config.estimation.weights.horizon,
        config.estimation.weights.texture,
        config.estimation.weights.perspective
    );

    let pipeline = SlopePipeline::new(&config);
    info!("✓ Slope pipeline ready");

    let inputs = find_inputs(&config.capture.input_dir)?;
    if inputs.is_empty() {
        error!("No videos or images found in {}", config.capture.input_dir);
        return Ok(());
    }

    for (idx, input) in inputs.iter().enumerate() {
        info!("========================================");
        info!(
            "Processing input {}/{}: {}",
            idx + 1,
            inputs.len(),
            input.path().display()
        );
        info!("========================================");

        match process_input(input, &pipeline, &config).await {
            Ok(stats) => log_stats(&stats),
            Err(e) => error!("Failed to process {}: {:#}", input.path().display(), e),
        }
    }

    let summary = pipeline.metrics().summary();
    info!(
        "📊 Pipeline totals: {} frames, {} estimated, {} gated, {} failed ({:.1} FPS)",
        summary.total_frames,
        summary.estimated_frames,
        summary.gated_frames,
        summary.failed_frames,
        summary.fps
    );
    debug!("Metrics: {}", serde_json::to_string(&summary)?);

    Ok(())
}

#[derive(Debug, Default)]
struct ProcessingStats {
    total_frames: u64,
    skipped_frames: u64,
    gated_frames: u64,
    estimated_frames: u64,
    pitch_sum: f64,
    side_tilt_sum: f64,
    confidence_sum: f64,
    max_abs_pitch: f64,
    duration_secs: f64,
    avg_fps: f64,
}

impl ProcessingStats {
    fn mean(&self, sum: f64) -> f64 {
        sum / self.estimated_frames.max(1) as f64
    }
}

async fn process_input(
    input: &InputSource,
    pipeline: &SlopePipeline,
    config: &Config,
) -> Result<ProcessingStats> {
    let start = Instant::now();
    let stem = input.stem();
    let mut source = input.open()?;

    let mut annotated = match (config.output.save_annotated, input.is_video()) {
        (false, _) => None,
        (true, true) => Some(AnnotatedWriter::for_video(
            &config.output.output_dir,
            &stem,
            config.capture.fps as f64,
        )?),
        (true, false) => Some(AnnotatedWriter::for_images(&config.output.output_dir, &stem)?),
    };
    let mut results = if config.output.save_results {
        Some(ResultWriter::create(&config.output.output_dir, &stem)?)
    } else {
        None
    };

    let mut ticker = interval(Duration::from_secs_f64(1.0 / config.capture.fps as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut stats = ProcessingStats::default();
    let mut frame_index: u64 = 0;

    while let Some(raw) = source.next_frame()? {
        ticker.tick().await;
        let index = frame_index;
        frame_index += 1;
        stats.total_frames += 1;

        let frame = match prepare_frame(&raw, &config.capture) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame {}: skipped during preparation: {:#}", index, e);
                stats.skipped_frames += 1;
                continue;
            }
        };

        let analysis = match pipeline.process(&frame) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Frame {}: skipped: {}", index, e);
                stats.skipped_frames += 1;
                continue;
            }
        };

        match analysis.slope {
            Some(slope) => {
                stats.estimated_frames += 1;
                stats.pitch_sum += slope.pitch_deg;
                stats.side_tilt_sum += slope.side_tilt_deg;
                stats.confidence_sum += slope.confidence;
                stats.max_abs_pitch = stats.max_abs_pitch.max(slope.pitch_deg.abs());
                debug!(
                    "Frame {}: pitch={:+.2}° side={:+.2}° confidence={:.2}",
                    index, slope.pitch_deg, slope.side_tilt_deg, slope.confidence
                );
            }
            None => stats.gated_frames += 1,
        }

        if let Some(writer) = annotated.as_mut() {
            let rendered = match &analysis.slope {
                Some(slope) => {
                    overlay::create_overlay(&frame, &analysis.mask, slope, &config.display)?
                }
                None => overlay::annotate_low_confidence(&frame, analysis.segmentation_confidence)?,
            };
            writer.write(index, &rendered)?;
        }

        if let Some(writer) = results.as_mut() {
            writer.write(&FrameReport {
                source: &stem,
                frame_index: index,
                segmentation_confidence: analysis.segmentation_confidence,
                slope: analysis.slope,
            })?;
        }

        if frame_index % 100 == 0 {
            info!("Progress: {}", source.describe());
        }
    }

    if let Some(writer) = annotated {
        writer.finish()?;
    }
    if let Some(writer) = results {
        let (path, lines) = writer.finish()?;
        info!("✓ Wrote {} results to {}", lines, path.display());
    }

    stats.duration_secs = start.elapsed().as_secs_f64();
    stats.avg_fps = stats.total_frames as f64 / stats.duration_secs.max(1e-3);
    Ok(stats)
}

fn log_stats(stats: &ProcessingStats) {
    info!("✓ Input processed successfully!");
    info!("  Total frames: {}", stats.total_frames);
    info!(
        "  Slope estimated: {} ({:.1}%)",
        stats.estimated_frames,
        100.0 * stats.estimated_frames as f64 / stats.total_frames.max(1) as f64
    );
    info!("  Low grass confidence: {}", stats.gated_frames);
    if stats.skipped_frames > 0 {
        warn!("  Skipped frames: {}", stats.skipped_frames);
    }
    if stats.estimated_frames > 0 {
        info!("  Mean slope: {:+.2}°", stats.mean(stats.pitch_sum));
        info!("  Mean side slope: {:+.2}°", stats.mean(stats.side_tilt_sum));
        info!("  Max |slope|: {:.2}°", stats.max_abs_pitch);
        info!(
            "  Mean confidence: {:.0}%",
            100.0 * stats.mean(stats.confidence_sum)
        );
    }
    info!(
        "  Duration: {:.1}s, Processing Speed: {:.1} FPS",
        stats.duration_secs, stats.avg_fps
    );
}
