// src/report.rs
//
// Output sinks: per-frame slope results as JSON lines, and annotated
// frames as a video (video inputs) or numbered PNGs (image inputs).

use crate::types::SlopeResult;
use anyhow::{bail, Context, Result};
use opencv::{
    core::{self, Mat, Vector},
    imgcodecs,
    prelude::*,
    videoio::VideoWriter,
};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct FrameReport<'a> {
    pub source: &'a str,
    pub frame_index: u64,
    pub segmentation_confidence: f64,
    /// `null` when the frame did not pass the grass gate
    pub slope: Option<SlopeResult>,
}

pub struct ResultWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl ResultWriter {
    pub fn create(output_dir: impl AsRef<Path>, stem: &str) -> Result<Self> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)
            .with_context(|| format!("creating output directory {}", output_dir.display()))?;

        let path = output_dir.join(format!("{}_slopes.jsonl", stem));
        let file =
            File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        info!("Results: {}", path.display());

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write(&mut self, report: &FrameReport) -> Result<()> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Flushes and returns the file path and number of lines written.
    pub fn finish(mut self) -> Result<(PathBuf, u64)> {
        self.writer
            .flush()
            .with_context(|| format!("flushing {}", self.path.display()))?;
        Ok((self.path, self.written))
    }
}

pub enum AnnotatedWriter {
    /// Opened on the first frame, once the processed frame size is known.
    Video {
        path: PathBuf,
        fps: f64,
        writer: Option<VideoWriter>,
    },
    Images {
        dir: PathBuf,
        stem: String,
    },
}

impl AnnotatedWriter {
    pub fn for_video(output_dir: impl AsRef<Path>, stem: &str, fps: f64) -> Result<Self> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(format!("{}_annotated.mp4", stem));
        info!("Output video: {}", path.display());
        Ok(AnnotatedWriter::Video {
            path,
            fps,
            writer: None,
        })
    }

    pub fn for_images(output_dir: impl AsRef<Path>, stem: &str) -> Result<Self> {
        let dir = output_dir.as_ref().join(format!("{}_annotated", stem));
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        info!("Output images: {}", dir.display());
        Ok(AnnotatedWriter::Images {
            dir,
            stem: stem.to_string(),
        })
    }

    pub fn write(&mut self, frame_index: u64, frame: &Mat) -> Result<()> {
        match self {
            AnnotatedWriter::Video { path, fps, writer } => {
                if writer.is_none() {
                    *writer = Some(open_video_writer(path, *fps, frame.size()?)?);
                }
                if let Some(writer) = writer.as_mut() {
                    VideoWriterTrait::write(writer, frame)?;
                }
            }
            AnnotatedWriter::Images { dir, stem } => {
                let path = dir.join(format!("{}_{:06}.png", stem, frame_index));
                let path_str = path
                    .to_str()
                    .with_context(|| format!("non UTF-8 output path {}", path.display()))?;
                if !imgcodecs::imwrite(path_str, frame, &Vector::<i32>::new())? {
                    bail!("failed to write {}", path.display());
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        if let AnnotatedWriter::Video {
            writer: Some(mut writer),
            ..
        } = self
        {
            writer.release()?;
        }
        Ok(())
    }
}

fn open_video_writer(path: &Path, fps: f64, size: core::Size) -> Result<VideoWriter> {
    let path_str = path
        .to_str()
        .with_context(|| format!("non UTF-8 output path {}", path.display()))?;
    let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
    let writer = VideoWriter::new(path_str, fourcc, fps, size, true)?;
    if !writer.is_opened()? {
        bail!("failed to open video writer for {}", path.display());
    }
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "slope_detection_report_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_gated_frame_serializes_null_slope() {
        let report = FrameReport {
            source: "round1",
            frame_index: 7,
            segmentation_confidence: 0.2,
            slope: None,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["frame_index"], 7);
        assert!(value["slope"].is_null());
    }

    #[test]
    fn test_result_writer_emits_one_line_per_frame() {
        let dir = scratch_dir("jsonl");
        let mut writer = ResultWriter::create(&dir, "green").unwrap();

        writer
            .write(&FrameReport {
                source: "green",
                frame_index: 0,
                segmentation_confidence: 1.0,
                slope: Some(SlopeResult {
                    pitch_deg: 2.5,
                    side_tilt_deg: 2.5,
                    confidence: 0.9,
                }),
            })
            .unwrap();
        writer
            .write(&FrameReport {
                source: "green",
                frame_index: 1,
                segmentation_confidence: 0.1,
                slope: None,
            })
            .unwrap();
        let (path, written) = writer.finish().unwrap();

        assert_eq!(written, 2);
        assert_eq!(path, dir.join("green_slopes.jsonl"));

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["slope"]["pitch_deg"], 2.5);
        assert!(lines[1]["slope"].is_null());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_image_writer_numbers_frames() {
        let dir = scratch_dir("png");
        let mut writer = AnnotatedWriter::for_images(&dir, "shots").unwrap();
        writer.write(3, &solid_frame(20, 20, GRASS_BGR)).unwrap();
        writer.finish().unwrap();

        assert!(dir.join("shots_annotated/shots_000003.png").is_file());
        fs::remove_dir_all(&dir).unwrap();
    }
}
