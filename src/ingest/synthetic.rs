//! Synthetic capture (`stub://`) for tests and model-free runs.
//!
//! Every frame is a noisy asphalt-gray background with a red vehicle parked
//! in the middle. The noise comes from a seeded RNG, so a given seed always
//! yields the same frame sequence.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FrameSource, SourceStats};
use crate::detect::PixelBox;
use crate::frame::{ChannelOrder, Frame};

pub const SYNTHETIC_WIDTH: u32 = 640;
pub const SYNTHETIC_HEIGHT: u32 = 480;

const ROAD_RGB: [u8; 3] = [70, 70, 72];
const VEHICLE_RGB: [u8; 3] = [200, 30, 30];
const NOISE: i16 = 8;

pub struct SyntheticSource {
    uri: String,
    rng: StdRng,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(uri: &str, seed: u64) -> Self {
        Self {
            uri: uri.to_string(),
            rng: StdRng::seed_from_u64(seed),
            frame_count: 0,
        }
    }

    /// Where the vehicle is drawn in every frame.
    pub fn vehicle_box() -> PixelBox {
        PixelBox::new(240, 200, 160, 80)
    }

    fn render(&mut self) -> Result<Frame> {
        let vehicle = Self::vehicle_box();
        let mut data = Vec::with_capacity((SYNTHETIC_WIDTH * SYNTHETIC_HEIGHT) as usize * 3);
        for y in 0..SYNTHETIC_HEIGHT {
            for x in 0..SYNTHETIC_WIDTH {
                let inside = u64::from(x) >= u64::from(vehicle.x)
                    && u64::from(x) < vehicle.right()
                    && u64::from(y) >= u64::from(vehicle.y)
                    && u64::from(y) < vehicle.bottom();
                let base = if inside { VEHICLE_RGB } else { ROAD_RGB };
                // Captures arrive in BGR.
                for c in [2, 1, 0] {
                    let jitter = self.rng.gen_range(-NOISE..=NOISE);
                    data.push((i16::from(base[c]) + jitter).clamp(0, 255) as u8);
                }
            }
        }
        Ok(Frame::new(
            data,
            SYNTHETIC_WIDTH,
            SYNTHETIC_HEIGHT,
            ChannelOrder::Bgr,
        )?)
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("SyntheticSource: connected to {}", self.uri);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.frame_count += 1;
        self.render().map(Some)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            uri: self.uri.clone(),
        }
    }
}
