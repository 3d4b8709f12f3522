//! Frame ownership layer.
//!
//! - `Frame`: owned 3-channel, 8-bit capture frame with an explicit channel order.
//! - `FrameRegion`: read-only window into a frame (color sampling only).
//!
//! The capture loop owns every `Frame`. The pipeline only ever receives `&Frame`
//! and the pixel buffer is private, so nothing downstream of capture can mutate
//! or hold on to the bytes beyond the borrow.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::detect::PixelBox;
use crate::error::{PipelineError, Result};

/// Samples per pixel. Anything else is rejected at construction.
pub const CHANNELS: usize = 3;

/// Order of the three samples inside one pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// Offsets of the red, green and blue samples within a pixel.
    pub fn rgb_offsets(self) -> [usize; 3] {
        match self {
            ChannelOrder::Rgb => [0, 1, 2],
            ChannelOrder::Bgr => [2, 1, 0],
        }
    }
}

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// Owned capture frame, `height × width × 3` bytes, row-major, interleaved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    order: ChannelOrder,
}

impl Frame {
    /// Wrap an interleaved 3-channel buffer.
    ///
    /// Zero-area frames are representable (a dropped capture may produce one);
    /// the normalizer rejects them.
    pub fn new(data: Vec<u8>, width: u32, height: u32, order: ChannelOrder) -> Result<Self> {
        Self::from_interleaved(data, width, height, CHANNELS, order)
    }

    /// Wrap an interleaved buffer with an explicit channel count.
    pub fn from_interleaved(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: usize,
        order: ChannelOrder,
    ) -> Result<Self> {
        if channels != CHANNELS {
            return Err(PipelineError::invalid_frame(format!(
                "unsupported channel count {} (expected {})",
                channels, CHANNELS
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(CHANNELS))
            .ok_or_else(|| PipelineError::invalid_frame("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(PipelineError::invalid_frame(format!(
                "frame length mismatch: expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            order,
        })
    }

    /// Uniform frame, mostly for tests and synthetic sources.
    pub fn filled(width: u32, height: u32, order: ChannelOrder, rgb: [u8; 3]) -> Self {
        let pixel = order_pixel(order, rgb);
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            data.extend_from_slice(&pixel);
        }
        Self {
            data,
            width,
            height,
            order,
        }
    }

    /// Take ownership of a decoded RGB image.
    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            order: ChannelOrder::Rgb,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel at (x, y) in RGB order, whatever the storage order is.
    pub fn pixel_rgb(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let [r, g, b] = self.order.rgb_offsets();
        Some([
            self.data[offset + r],
            self.data[offset + g],
            self.data[offset + b],
        ])
    }

    /// RGB-ordered copy of the frame as an `image` buffer.
    pub fn to_rgb_image(&self) -> RgbImage {
        let data = match self.order {
            ChannelOrder::Rgb => self.data.clone(),
            ChannelOrder::Bgr => self
                .data
                .chunks_exact(CHANNELS)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
        };
        // Length was validated at construction.
        RgbImage::from_raw(self.width, self.height, data).unwrap_or_default()
    }

    /// Read-only window over `bbox`. `None` when the box leaves the frame.
    pub fn region(&self, bbox: PixelBox) -> Option<FrameRegion<'_>> {
        if bbox.right() > u64::from(self.width) || bbox.bottom() > u64::from(self.height) {
            return None;
        }
        Some(FrameRegion { frame: self, bbox })
    }

    /// Paint a solid rectangle, clipped to the frame. Capture-side only.
    pub fn fill_rect(&mut self, bbox: PixelBox, rgb: [u8; 3]) {
        let pixel = order_pixel(self.order, rgb);
        let x_end = bbox.right().min(u64::from(self.width)) as usize;
        let y_end = bbox.bottom().min(u64::from(self.height)) as usize;
        let row_bytes = self.width as usize * CHANNELS;
        for y in (bbox.y as usize)..y_end {
            for x in (bbox.x as usize)..x_end {
                let offset = y * row_bytes + x * CHANNELS;
                self.data[offset..offset + CHANNELS].copy_from_slice(&pixel);
            }
        }
    }
}

fn order_pixel(order: ChannelOrder, rgb: [u8; 3]) -> [u8; 3] {
    match order {
        ChannelOrder::Rgb => rgb,
        ChannelOrder::Bgr => [rgb[2], rgb[1], rgb[0]],
    }
}

// ----------------------------------------------------------------------------
// FrameRegion
// ----------------------------------------------------------------------------

/// Borrowed rectangular window of a frame. Always inside the frame bounds.
#[derive(Clone, Copy, Debug)]
pub struct FrameRegion<'a> {
    frame: &'a Frame,
    bbox: PixelBox,
}

impl<'a> FrameRegion<'a> {
    pub fn bbox(&self) -> PixelBox {
        self.bbox
    }

    pub fn pixel_count(&self) -> usize {
        self.bbox.width as usize * self.bbox.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    /// Every pixel of the region in RGB order, row by row.
    pub fn pixels_rgb(&self) -> impl Iterator<Item = [u8; 3]> + 'a {
        let frame = self.frame;
        let bbox = self.bbox;
        let [r, g, b] = frame.order.rgb_offsets();
        let row_bytes = frame.width as usize * CHANNELS;
        (bbox.y as usize..bbox.y as usize + bbox.height as usize).flat_map(move |y| {
            let start = y * row_bytes + bbox.x as usize * CHANNELS;
            let end = start + bbox.width as usize * CHANNELS;
            frame.data[start..end]
                .chunks_exact(CHANNELS)
                .map(move |px| [px[r], px[g], px[b]])
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
