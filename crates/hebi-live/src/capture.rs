//! Frame sources
//!
//! The sampler only needs "give me the current frame". Two sources ship
//! here: a synthetic pattern for offline runs and a directory of still
//! images replayed in a loop.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a source could not produce frames
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("access to the video source was denied: {0}")]
    PermissionDenied(String),

    #[error("video source not found: {0}")]
    NotFound(String),

    #[error("video source cannot deliver the requested format: {0}")]
    UnsupportedConstraints(String),

    #[error("frame capture failed: {0}")]
    Capture(String),
}

impl CameraError {
    /// Short explanation suitable for showing to a player
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => {
                "Camera access was denied. Allow access and restart to steer with your finger."
            }
            Self::NotFound(_) => "No camera was found. The snake will wander on its own.",
            Self::UnsupportedConstraints(_) => {
                "The camera does not support the requested resolution."
            }
            Self::Capture(_) => "The camera stopped delivering frames.",
        }
    }

    fn from_io(err: io::Error, path: &Path) -> Self {
        let detail = format!("{}: {}", path.display(), err);
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(detail),
            io::ErrorKind::NotFound => Self::NotFound(detail),
            _ => Self::Capture(detail),
        }
    }
}

/// Anything that yields RGB frames on demand
pub trait FrameSource: Send + 'static {
    fn resolution(&self) -> (u32, u32);

    fn capture(&mut self) -> Result<RgbImage, CameraError>;
}

impl FrameSource for Box<dyn FrameSource> {
    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }

    fn capture(&mut self) -> Result<RgbImage, CameraError> {
        (**self).capture()
    }
}

fn check_resolution(width: u32, height: u32) -> Result<(), CameraError> {
    if width == 0 || height == 0 {
        return Err(CameraError::UnsupportedConstraints(format!(
            "{}x{} frames",
            width, height
        )));
    }
    Ok(())
}

/// Synthetic frames: a bright disc orbiting on a dark background
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame: u64,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Result<Self, CameraError> {
        check_resolution(width, height)?;
        Ok(Self {
            width,
            height,
            frame: 0,
        })
    }

    /// Disc center of frame `index`, in pixels
    fn disc_center(&self, index: u64) -> (f32, f32) {
        let angle = index as f32 * 0.2;
        let (w, h) = (self.width as f32, self.height as f32);
        (w * (0.5 + 0.3 * angle.cos()), h * (0.5 + 0.3 * angle.sin()))
    }
}

impl FrameSource for TestPatternSource {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn capture(&mut self) -> Result<RgbImage, CameraError> {
        let (cx, cy) = self.disc_center(self.frame);
        let radius = (self.width.min(self.height) as f32 * 0.08).max(2.0);
        self.frame += 1;

        Ok(RgbImage::from_fn(self.width, self.height, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if dx * dx + dy * dy <= radius * radius {
                Rgb([240, 220, 200])
            } else {
                Rgb([24, 28, 36])
            }
        }))
    }
}

/// Replays every PNG/JPEG in a directory, sorted by name
pub struct ImageDirSource {
    paths: Vec<PathBuf>,
    next: usize,
    width: u32,
    height: u32,
}

impl ImageDirSource {
    pub fn open(dir: impl AsRef<Path>, width: u32, height: u32) -> Result<Self, CameraError> {
        let dir = dir.as_ref();
        check_resolution(width, height)?;

        let entries = std::fs::read_dir(dir).map_err(|e| CameraError::from_io(e, dir))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| CameraError::from_io(e, dir))?.path();
            if is_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(CameraError::NotFound(format!(
                "no .png or .jpg files in {}",
                dir.display()
            )));
        }

        log::info!("Replaying {} frames from {}", paths.len(), dir.display());
        Ok(Self {
            paths,
            next: 0,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}

impl FrameSource for ImageDirSource {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn capture(&mut self) -> Result<RgbImage, CameraError> {
        let path = &self.paths[self.next];
        self.next = (self.next + 1) % self.paths.len();

        let image = image::open(path)
            .map_err(|e| CameraError::Capture(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        if image.dimensions() == (self.width, self.height) {
            return Ok(image);
        }
        Ok(imageops::resize(&image, self.width, self.height, FilterType::Triangle))
    }
}
