//! Still-image directory source.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Replays the images of one directory in file-name order. Files that fail
/// to decode are logged and skipped.
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    frame_count: u64,
}

impl ImageDirSource {
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(anyhow!("{} is not a directory", dir.display()));
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("failed to list {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        files.sort();

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            cursor: 0,
            frame_count: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageDirSource {
    fn name(&self) -> &'static str {
        "image_dir"
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "ImageDirSource: {} images in {}",
            self.files.len(),
            self.dir.display()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        while let Some(path) = self.files.get(self.cursor) {
            self.cursor += 1;
            match image::open(path) {
                Ok(img) => {
                    self.frame_count += 1;
                    return Ok(Some(Frame::from_rgb_image(img.to_rgb8())));
                }
                Err(err) => log::warn!("skipping {}: {}", path.display(), err),
            }
        }
        Ok(None)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            uri: self.dir.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn replays_images_in_name_order_and_skips_junk() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(4, 3, Rgb([255, 0, 0]))
            .save(dir.path().join("b.png"))
            .unwrap();
        RgbImage::from_pixel(2, 2, Rgb([0, 0, 255]))
            .save(dir.path().join("a.png"))
            .unwrap();
        std::fs::write(dir.path().join("c.jpg"), b"not an image").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut source = ImageDirSource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 3);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!((first.width(), first.height()), (2, 2));
        assert_eq!(first.pixel_rgb(0, 0), Some([0, 0, 255]));

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!((second.width(), second.height()), (4, 3));

        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.stats().frames_captured, 2);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(ImageDirSource::open(Path::new("/nonexistent/frames")).is_err());
    }
}
