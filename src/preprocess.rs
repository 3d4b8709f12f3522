//! Frame → classifier input tensor.
//!
//! Resize with a fixed interpolation policy, reorder channels to what the
//! classifier was trained on, run the injected preprocessing strategy, add
//! the batch dimension. Output layout is NHWC `[1, H, W, 3]`.

use image::imageops::{self, FilterType};
use ndarray::{Array4, ArrayView4};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::frame::{ChannelOrder, Frame};

pub const DEFAULT_TARGET_SIZE: u32 = 224;

// ----------------------------------------------------------------------------
// NormalizedTensor
// ----------------------------------------------------------------------------

/// Classifier input: `[1, height, width, 3]` float samples.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedTensor {
    data: Array4<f32>,
}

impl NormalizedTensor {
    /// `[batch, height, width, channels]`.
    pub fn shape(&self) -> [usize; 4] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3]]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Sample at row `y`, column `x`, channel `c` of the single batch entry.
    pub fn at(&self, y: usize, x: usize, c: usize) -> f32 {
        self.data[[0, y, x, c]]
    }
}

// ----------------------------------------------------------------------------
// Preprocessing strategies
// ----------------------------------------------------------------------------

/// Per-sample transform applied after resizing and channel reordering.
///
/// `value` is the raw 0..=255 sample as `f32`; `channel` indexes the
/// classifier's channel order.
pub trait Preprocess: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, value: f32, channel: usize) -> f32;
}

/// Leaves samples in `[0, 255]`. EfficientNet-family models rescale inside
/// the network, so their preprocessing step is the identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl Preprocess for Passthrough {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn apply(&self, value: f32, _channel: usize) -> f32 {
        value
    }
}

/// Scales samples into `[0, 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnitScale;

impl Preprocess for UnitScale {
    fn name(&self) -> &'static str {
        "unit_scale"
    }

    fn apply(&self, value: f32, _channel: usize) -> f32 {
        value / 255.0
    }
}

/// Scales into `[0, 1]`, then standardizes per channel.
#[derive(Clone, Copy, Debug)]
pub struct MeanStd {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl MeanStd {
    /// ImageNet statistics in RGB order.
    pub fn imagenet() -> Self {
        Self {
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

impl Preprocess for MeanStd {
    fn name(&self) -> &'static str {
        "mean_std"
    }

    fn apply(&self, value: f32, channel: usize) -> f32 {
        (value / 255.0 - self.mean[channel]) / self.std[channel]
    }
}

/// Config-file selector for the shipped strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessKind {
    #[default]
    #[serde(alias = "efficientnet")]
    Passthrough,
    UnitScale,
    Imagenet,
}

impl PreprocessKind {
    pub fn into_strategy(self) -> Box<dyn Preprocess> {
        match self {
            PreprocessKind::Passthrough => Box::new(Passthrough),
            PreprocessKind::UnitScale => Box::new(UnitScale),
            PreprocessKind::Imagenet => Box::new(MeanStd::imagenet()),
        }
    }
}

// ----------------------------------------------------------------------------
// FrameNormalizer
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

impl Interpolation {
    fn filter(self) -> FilterType {
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Bilinear => FilterType::Triangle,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizerConfig {
    pub target_width: u32,
    pub target_height: u32,
    pub interpolation: Interpolation,
    /// Channel order the classifier was trained on.
    pub target_order: ChannelOrder,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_SIZE,
            target_height: DEFAULT_TARGET_SIZE,
            interpolation: Interpolation::default(),
            target_order: ChannelOrder::Rgb,
        }
    }
}

pub struct FrameNormalizer {
    config: NormalizerConfig,
    preprocess: Box<dyn Preprocess>,
}

impl FrameNormalizer {
    pub fn new(config: NormalizerConfig, preprocess: Box<dyn Preprocess>) -> Self {
        Self { config, preprocess }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn preprocess_name(&self) -> &'static str {
        self.preprocess.name()
    }

    /// Build the classifier input for `frame`.
    pub fn normalize(&self, frame: &Frame) -> Result<NormalizedTensor> {
        if frame.is_empty() {
            return Err(PipelineError::invalid_frame(format!(
                "zero-area frame ({}x{})",
                frame.width(),
                frame.height()
            )));
        }

        let (tw, th) = (self.config.target_width, self.config.target_height);
        let rgb = frame.to_rgb_image();
        let resized = if rgb.dimensions() == (tw, th) {
            rgb
        } else {
            imageops::resize(&rgb, tw, th, self.config.interpolation.filter())
        };

        let source = self.config.target_order.rgb_offsets();
        let data = Array4::from_shape_fn((1, th as usize, tw as usize, 3), |(_, y, x, c)| {
            let px = resized.get_pixel(x as u32, y as u32).0;
            self.preprocess.apply(f32::from(px[source[c]]), c)
        });

        Ok(NormalizedTensor { data })
    }
}

impl Default for FrameNormalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default(), Box::new(Passthrough))
    }
}

impl std::fmt::Debug for FrameNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameNormalizer")
            .field("config", &self.config)
            .field("preprocess", &self.preprocess.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_batched_nhwc_tensor() {
        let frame = Frame::filled(640, 480, ChannelOrder::Bgr, [10, 20, 30]);
        let tensor = FrameNormalizer::default().normalize(&frame).unwrap();
        assert_eq!(tensor.shape(), [1, 224, 224, 3]);
    }

    #[test]
    fn bgr_capture_becomes_rgb_input() {
        let frame = Frame::filled(32, 16, ChannelOrder::Bgr, [10, 20, 30]);
        let tensor = FrameNormalizer::default().normalize(&frame).unwrap();
        assert_eq!(tensor.at(5, 5, 0), 10.0);
        assert_eq!(tensor.at(5, 5, 1), 20.0);
        assert_eq!(tensor.at(5, 5, 2), 30.0);
    }

    #[test]
    fn target_order_can_be_bgr() {
        let normalizer = FrameNormalizer::new(
            NormalizerConfig {
                target_order: ChannelOrder::Bgr,
                ..NormalizerConfig::default()
            },
            Box::new(Passthrough),
        );
        let frame = Frame::filled(8, 8, ChannelOrder::Rgb, [10, 20, 30]);
        let tensor = normalizer.normalize(&frame).unwrap();
        assert_eq!(tensor.at(0, 0, 0), 30.0);
        assert_eq!(tensor.at(0, 0, 2), 10.0);
    }

    #[test]
    fn strategy_is_injected() {
        struct Negate;
        impl Preprocess for Negate {
            fn name(&self) -> &'static str {
                "negate"
            }
            fn apply(&self, value: f32, _channel: usize) -> f32 {
                -value
            }
        }

        let normalizer = FrameNormalizer::new(NormalizerConfig::default(), Box::new(Negate));
        let frame = Frame::filled(4, 4, ChannelOrder::Rgb, [255, 0, 51]);
        let tensor = normalizer.normalize(&frame).unwrap();
        assert_eq!(tensor.at(0, 0, 0), -255.0);
        assert_eq!(normalizer.preprocess_name(), "negate");

        let unit = FrameNormalizer::new(NormalizerConfig::default(), Box::new(UnitScale));
        assert_eq!(unit.normalize(&frame).unwrap().at(1, 1, 2), 0.2);
    }

    #[test]
    fn imagenet_standardizes_per_channel() {
        let strategy = MeanStd::imagenet();
        assert!((strategy.apply(255.0 * 0.485, 0)).abs() < 1e-5);
        assert!((strategy.apply(255.0, 2) - (1.0 - 0.406) / 0.225).abs() < 1e-5);
    }

    #[test]
    fn zero_area_frame_is_invalid() {
        let frame = Frame::new(Vec::new(), 0, 0, ChannelOrder::Bgr).unwrap();
        let err = FrameNormalizer::default().normalize(&frame).unwrap_err();
        assert!(err.is_invalid_frame());
    }

    #[test]
    fn preprocess_kind_accepts_efficientnet_alias() {
        let kind: PreprocessKind = serde_json::from_str("\"efficientnet\"").unwrap();
        assert_eq!(kind, PreprocessKind::Passthrough);
        assert_eq!(PreprocessKind::Imagenet.into_strategy().name(), "mean_std");
    }
}
