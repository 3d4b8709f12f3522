//! Frame capture sources.
//!
//! - `stub://...`: synthetic road scene, deterministic per seed
//! - a local directory: still images (jpg/png) in file-name order
//! - any other path or URL: decoded with FFmpeg (feature: ingest-ffmpeg)
//!
//! Sources hand out owned `Frame`s one at a time. `Ok(None)` is a normal end
//! of stream; an `Err` is a capture failure the caller may log and retry.

#[cfg(feature = "ingest-ffmpeg")]
mod ffmpeg;
mod image_dir;
mod synthetic;

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::frame::Frame;

#[cfg(feature = "ingest-ffmpeg")]
pub use ffmpeg::FfmpegSource;
pub use image_dir::ImageDirSource;
pub use synthetic::{SyntheticSource, SYNTHETIC_HEIGHT, SYNTHETIC_WIDTH};

pub const STUB_SCHEME: &str = "stub://";

/// Capture settings shared by all sources.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// `stub://<name>`, a directory of images, or a video path/URL.
    pub uri: String,
    /// Seed for synthetic sources.
    pub seed: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            uri: "stub://road".to_string(),
            seed: 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub uri: String,
}

/// A capture source.
pub trait FrameSource {
    fn name(&self) -> &'static str;

    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    /// Next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }
}

/// Pick a source for `config.uri`.
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>> {
    let uri = config.uri.trim();
    if uri.is_empty() {
        return Err(anyhow!("source uri is empty"));
    }
    if uri.starts_with(STUB_SCHEME) {
        return Ok(Box::new(SyntheticSource::new(uri, config.seed)));
    }
    if Path::new(uri).is_dir() {
        return Ok(Box::new(ImageDirSource::open(Path::new(uri))?));
    }

    #[cfg(feature = "ingest-ffmpeg")]
    {
        Ok(Box::new(FfmpegSource::open(uri)?))
    }
    #[cfg(not(feature = "ingest-ffmpeg"))]
    {
        Err(anyhow!(
            "source '{}' needs video decoding; rebuild with the ingest-ffmpeg feature",
            uri
        ))
    }
}
