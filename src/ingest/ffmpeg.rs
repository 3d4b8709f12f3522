//! Video file / stream source using FFmpeg.
//!
//! Decodes the best video stream and converts every frame to packed RGB24
//! in memory.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;
use std::time::{Duration, Instant};

use super::{FrameSource, SourceStats};
use crate::frame::{ChannelOrder, Frame};

pub struct FfmpegSource {
    uri: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    connected_at: Option<Instant>,
    finished: bool,
}

impl FfmpegSource {
    pub fn open(uri: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&uri)
            .with_context(|| format!("failed to open '{}' with ffmpeg", uri))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("'{}' has no video track", uri))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            uri: uri.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            frame_count: 0,
            last_frame_at: None,
            connected_at: None,
            finished: false,
        })
    }

    fn receive(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        match self.decoder.receive_frame(&mut decoded) {
            Ok(()) => {}
            Err(err) if is_drained(&err) => return Ok(None),
            Err(err) => return Err(err).context("decode video frame"),
        }
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());
        Ok(Some(Frame::new(pixels, width, height, ChannelOrder::Rgb)?))
    }
}

impl FrameSource for FfmpegSource {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn connect(&mut self) -> Result<()> {
        self.connected_at = Some(Instant::now());
        log::info!("FfmpegSource: connected to {}", self.uri);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        // Frames still buffered in the decoder come first.
        if let Some(frame) = self.receive()? {
            return Ok(Some(frame));
        }
        if self.finished {
            return Ok(None);
        }

        loop {
            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {}
                Err(ffmpeg::Error::Eof) => break,
                Err(err) => return Err(err).context("read packet"),
            }
            if packet.stream() != self.stream_index {
                continue;
            }
            self.decoder
                .send_packet(&packet)
                .context("send packet to ffmpeg decoder")?;
            if let Some(frame) = self.receive()? {
                return Ok(Some(frame));
            }
        }

        self.finished = true;
        self.decoder.send_eof().context("flush ffmpeg decoder")?;
        let tail = self.receive()?;
        if tail.is_none() {
            log::info!(
                "FfmpegSource: {} ended after {} frames",
                self.uri,
                self.frame_count
            );
        }
        Ok(tail)
    }

    fn is_healthy(&self) -> bool {
        let Some(connected_at) = self.connected_at else {
            return false;
        };
        let Some(last_frame_at) = self.last_frame_at else {
            return connected_at.elapsed() <= Duration::from_secs(5);
        };
        self.finished || last_frame_at.elapsed() <= Duration::from_secs(2)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            uri: self.uri.clone(),
        }
    }
}

/// The decoder needs more input (EAGAIN) or has been fully flushed (EOF).
fn is_drained(err: &ffmpeg::Error) -> bool {
    match err {
        ffmpeg::Error::Eof => true,
        ffmpeg::Error::Other { errno } => *errno == ffmpeg::util::error::EAGAIN,
        _ => false,
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let packed = data
            .get(..row_bytes * height as usize)
            .context("ffmpeg frame is shorter than its dimensions")?;
        return Ok((packed.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_eagain_and_eof_mean_no_frame() {
        assert!(is_drained(&ffmpeg::Error::Eof));
        assert!(is_drained(&ffmpeg::Error::Other {
            errno: ffmpeg::util::error::EAGAIN
        }));
        assert!(!is_drained(&ffmpeg::Error::InvalidData));
        assert!(!is_drained(&ffmpeg::Error::Other {
            errno: ffmpeg::util::error::ENOMEM
        }));
    }
}
