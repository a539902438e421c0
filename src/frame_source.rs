// src/frame_source.rs
//
// Frame acquisition: recorded videos or directories of still images, plus
// the HUD crop / downscale applied before segmentation.

use crate::types::CaptureConfig;
use anyhow::{bail, Context, Result};
use opencv::{
    core::{Mat, Rect, Size},
    imgcodecs, imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

pub trait FrameSource {
    /// Next BGR frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Mat>>;
    fn describe(&self) -> String;
}

/// One unit of work discovered under the input directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum InputSource {
    Video(PathBuf),
    ImageSequence(PathBuf),
}

impl InputSource {
    pub fn path(&self) -> &Path {
        match self {
            InputSource::Video(path) | InputSource::ImageSequence(path) => path,
        }
    }

    /// Base name for output files.
    pub fn stem(&self) -> String {
        self.path()
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("input")
            .to_string()
    }

    pub fn is_video(&self) -> bool {
        matches!(self, InputSource::Video(_))
    }

    pub fn open(&self) -> Result<Box<dyn FrameSource>> {
        Ok(match self {
            InputSource::Video(path) => Box::new(VideoFileSource::open(path)?),
            InputSource::ImageSequence(dir) => Box::new(ImageSequenceSource::open(dir)?),
        })
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Videos are returned individually; every directory holding still images
/// becomes one image sequence.
pub fn find_inputs(dir: impl AsRef<Path>) -> Result<Vec<InputSource>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        bail!("input directory {} does not exist", dir.display());
    }

    let mut videos = BTreeSet::new();
    let mut image_dirs = BTreeSet::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if has_extension(path, VIDEO_EXTENSIONS) {
            videos.insert(path.to_path_buf());
        } else if has_extension(path, IMAGE_EXTENSIONS) {
            if let Some(parent) = path.parent() {
                image_dirs.insert(parent.to_path_buf());
            }
        }
    }

    info!(
        "Found {} video files and {} image directories",
        videos.len(),
        image_dirs.len()
    );

    Ok(videos
        .into_iter()
        .map(InputSource::Video)
        .chain(image_dirs.into_iter().map(InputSource::ImageSequence))
        .collect())
}

// ============================================================================
// VIDEO
// ============================================================================

pub struct VideoFileSource {
    path: PathBuf,
    cap: VideoCapture,
    total_frames: i32,
    frames_read: u64,
}

impl VideoFileSource {
    pub fn open(path: &Path) -> Result<Self> {
        info!("Opening video: {}", path.display());

        let path_str = path
            .to_str()
            .with_context(|| format!("non UTF-8 video path {}", path.display()))?;
        let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
        if !cap.is_opened()? {
            bail!("failed to open video file {}", path.display());
        }

        let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS)?;
        let total_frames = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT)? as i32;
        let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

        info!(
            "Video properties: {}x{} @ {:.1} FPS, {} frames",
            width, height, fps, total_frames
        );

        Ok(Self {
            path: path.to_path_buf(),
            cap,
            total_frames,
            frames_read: 0,
        })
    }
}

impl FrameSource for VideoFileSource {
    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !VideoCaptureTrait::read(&mut self.cap, &mut frame)? || frame.empty() {
            return Ok(None);
        }
        self.frames_read += 1;
        Ok(Some(frame))
    }

    fn describe(&self) -> String {
        format!(
            "video {} (frame {}/{})",
            self.path.display(),
            self.frames_read,
            self.total_frames
        )
    }
}

// ============================================================================
// STILL IMAGES
// ============================================================================

pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && has_extension(e.path(), IMAGE_EXTENSIONS))
            .map(|e| e.into_path())
            .collect();
        files.sort();

        info!("Image sequence {}: {} images", dir.display(), files.len());

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            next: 0,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Mat>> {
        while let Some(path) = self.files.get(self.next) {
            self.next += 1;

            let path_str = match path.to_str() {
                Some(s) => s,
                None => {
                    warn!("Skipping non UTF-8 image path {}", path.display());
                    continue;
                }
            };
            let image = imgcodecs::imread(path_str, imgcodecs::IMREAD_COLOR)?;
            if image.empty() {
                warn!("Skipping unreadable image {}", path.display());
                continue;
            }
            return Ok(Some(image));
        }
        Ok(None)
    }

    fn describe(&self) -> String {
        format!(
            "images {} ({}/{})",
            self.dir.display(),
            self.next,
            self.files.len()
        )
    }
}

// ============================================================================
// PREPARATION
// ============================================================================

/// Crop the simulator HUD rows and scale down for processing.
pub fn prepare_frame(raw: &Mat, capture: &CaptureConfig) -> Result<Mat> {
    if raw.empty() {
        bail!("empty frame from source");
    }

    let top = capture.ui_margin_top;
    let height = raw.rows() - top - capture.ui_margin_bottom;
    if height <= 0 {
        bail!(
            "UI margins {}+{} leave nothing of a {}-row frame",
            top,
            capture.ui_margin_bottom,
            raw.rows()
        );
    }

    let mut cropped = Mat::default();
    Mat::roi(raw, Rect::new(0, top, raw.cols(), height))?.copy_to(&mut cropped)?;

    let scale = capture.processing_downscale;
    if (scale - 1.0).abs() < f64::EPSILON {
        return Ok(cropped);
    }

    let mut resized = Mat::default();
    imgproc::resize(
        &cropped,
        &mut resized,
        Size::new(0, 0),
        scale,
        scale,
        imgproc::INTER_AREA,
    )?;
    if resized.empty() {
        bail!("downscale {} leaves an empty frame", scale);
    }
    Ok(resized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use opencv::core::{self, Vector};
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "slope_detection_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn capture(top: i32, bottom: i32, scale: f64) -> CaptureConfig {
        CaptureConfig {
            ui_margin_top: top,
            ui_margin_bottom: bottom,
            processing_downscale: scale,
            ..CaptureConfig::default()
        }
    }

    #[test]
    fn test_prepare_crops_and_scales() {
        let raw = solid_frame(300, 400, GRASS_BGR);
        let frame = prepare_frame(&raw, &capture(50, 50, 0.5)).unwrap();
        assert_eq!(frame.rows(), 100);
        assert_eq!(frame.cols(), 200);
        assert_eq!(frame.typ(), core::CV_8UC3);
    }

    #[test]
    fn test_prepare_without_downscale_only_crops() {
        let mut raw = solid_frame(200, 100, GRAY_BGR);
        // HUD band at the top should be cut away
        fill_rect(&mut raw, Rect::new(0, 0, 100, 20), bgr(SKY_BGR));
        let frame = prepare_frame(&raw, &capture(20, 0, 1.0)).unwrap();
        assert_eq!(frame.rows(), 180);
        assert_eq!(frame.cols(), 100);
        let px = *frame.at_2d::<core::Vec3b>(0, 0).unwrap();
        assert_eq!(px, core::Vec3b::from([128, 128, 128]));
    }

    #[test]
    fn test_prepare_rejects_margins_covering_frame() {
        let raw = solid_frame(80, 100, GRAY_BGR);
        assert!(prepare_frame(&raw, &capture(40, 40, 0.5)).is_err());
        assert!(prepare_frame(&Mat::default(), &CaptureConfig::default()).is_err());
    }

    #[test]
    fn test_find_inputs_groups_images_by_directory() {
        let dir = scratch_dir("find_inputs");
        fs::write(dir.join("round1.MP4"), b"").unwrap();
        fs::create_dir_all(dir.join("shots")).unwrap();
        fs::write(dir.join("shots/a.png"), b"").unwrap();
        fs::write(dir.join("shots/b.jpg"), b"").unwrap();
        fs::write(dir.join("notes.txt"), b"").unwrap();

        let inputs = find_inputs(&dir).unwrap();

        assert_eq!(
            inputs,
            vec![
                InputSource::Video(dir.join("round1.MP4")),
                InputSource::ImageSequence(dir.join("shots")),
            ]
        );
        assert_eq!(inputs[0].stem(), "round1");
        assert!(!inputs[1].is_video());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_find_inputs_missing_directory() {
        assert!(find_inputs("no/such/input/dir").is_err());
    }

    #[test]
    fn test_image_sequence_reads_in_order() {
        let dir = scratch_dir("image_sequence");
        let params = Vector::<i32>::new();
        imgcodecs::imwrite(
            dir.join("002.png").to_str().unwrap(),
            &solid_frame(20, 30, GRAY_BGR),
            &params,
        )
        .unwrap();
        imgcodecs::imwrite(
            dir.join("001.png").to_str().unwrap(),
            &solid_frame(10, 30, GRASS_BGR),
            &params,
        )
        .unwrap();
        fs::write(dir.join("003.png"), b"not an image").unwrap();

        let mut source = ImageSequenceSource::open(&dir).unwrap();
        assert!(source.describe().ends_with("(0/3)"), "{}", source.describe());

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.rows(), 10);
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.rows(), 20);
        // Corrupt file is skipped
        assert!(source.next_frame().unwrap().is_none());

        fs::remove_dir_all(&dir).unwrap();
    }
}
