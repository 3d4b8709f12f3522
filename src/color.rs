//! Dominant vehicle color.
//!
//! A single-cluster k-means over the region's pixels converges to the
//! arithmetic mean of the samples, so the centroid is computed directly as
//! the mean. The mean is then matched against fixed inclusive RGB ranges in
//! declaration order; the first match wins, which makes overlapping ranges
//! (White/Yellow, Silver/White) resolve deterministically.

use serde::{Deserialize, Serialize};

use crate::frame::FrameRegion;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorName {
    Red,
    Blue,
    Green,
    White,
    Black,
    Silver,
    Yellow,
    Unknown,
}

impl ColorName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorName::Red => "Red",
            ColorName::Blue => "Blue",
            ColorName::Green => "Green",
            ColorName::White => "White",
            ColorName::Black => "Black",
            ColorName::Silver => "Silver",
            ColorName::Yellow => "Yellow",
            ColorName::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ColorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named bucket plus the mean RGB triple that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorLabel {
    pub name: ColorName,
    pub rgb: [f32; 3],
}

impl ColorLabel {
    pub fn unknown() -> Self {
        Self {
            name: ColorName::Unknown,
            rgb: [0.0; 3],
        }
    }
}

/// Inclusive per-channel bounds, RGB order.
struct ColorRange {
    name: ColorName,
    lower: [f32; 3],
    upper: [f32; 3],
}

const COLOR_RANGES: [ColorRange; 7] = [
    ColorRange {
        name: ColorName::Red,
        lower: [150.0, 0.0, 0.0],
        upper: [255.0, 50.0, 50.0],
    },
    ColorRange {
        name: ColorName::Blue,
        lower: [0.0, 0.0, 150.0],
        upper: [50.0, 50.0, 255.0],
    },
    ColorRange {
        name: ColorName::Green,
        lower: [0.0, 150.0, 0.0],
        upper: [50.0, 255.0, 50.0],
    },
    ColorRange {
        name: ColorName::White,
        lower: [200.0, 200.0, 200.0],
        upper: [255.0, 255.0, 255.0],
    },
    ColorRange {
        name: ColorName::Black,
        lower: [0.0, 0.0, 0.0],
        upper: [50.0, 50.0, 50.0],
    },
    ColorRange {
        name: ColorName::Silver,
        lower: [160.0, 160.0, 160.0],
        upper: [200.0, 200.0, 200.0],
    },
    // Blue is unconstrained; anything bright in red and green that was not
    // already White lands here.
    ColorRange {
        name: ColorName::Yellow,
        lower: [200.0, 200.0, 0.0],
        upper: [255.0, 255.0, 255.0],
    },
];

#[derive(Clone, Copy, Debug, Default)]
pub struct ColorClassifier;

impl ColorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a region. An empty region is `(Unknown, [0, 0, 0])`.
    pub fn classify(&self, region: &FrameRegion<'_>) -> ColorLabel {
        match mean_rgb(region.pixels_rgb()) {
            Some(rgb) => Self::label_for(rgb),
            None => ColorLabel::unknown(),
        }
    }

    /// Map a centroid to its bucket.
    pub fn label_for(rgb: [f32; 3]) -> ColorLabel {
        let name = COLOR_RANGES
            .iter()
            .find(|range| (0..3).all(|i| range.lower[i] <= rgb[i] && rgb[i] <= range.upper[i]))
            .map(|range| range.name)
            .unwrap_or(ColorName::Unknown);
        ColorLabel { name, rgb }
    }
}

/// Mean of the samples (the k=1 centroid), `None` for no samples.
fn mean_rgb(pixels: impl Iterator<Item = [u8; 3]>) -> Option<[f32; 3]> {
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for px in pixels {
        for (sum, v) in sums.iter_mut().zip(px) {
            *sum += u64::from(v);
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let n = count as f64;
    Some([
        (sums[0] as f64 / n) as f32,
        (sums[1] as f64 / n) as f32,
        (sums[2] as f64 / n) as f32,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::PixelBox;
    use crate::frame::{ChannelOrder, Frame};

    fn classify_uniform(rgb: [u8; 3]) -> ColorLabel {
        let frame = Frame::filled(6, 4, ChannelOrder::Bgr, rgb);
        let region = frame.region(PixelBox::new(0, 0, 6, 4)).unwrap();
        ColorClassifier::new().classify(&region)
    }

    #[test]
    fn empty_region_is_unknown_black() {
        let frame = Frame::filled(6, 4, ChannelOrder::Rgb, [255, 0, 0]);
        let region = frame.region(PixelBox::new(2, 2, 0, 2)).unwrap();
        assert_eq!(ColorClassifier::new().classify(&region), ColorLabel::unknown());
        assert_eq!(ColorLabel::unknown().rgb, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn near_white_is_white() {
        let label = classify_uniform([250, 252, 255]);
        assert_eq!(label.name, ColorName::White);
        assert_eq!(label.rgb, [250.0, 252.0, 255.0]);
    }

    #[test]
    fn primaries_map_to_their_buckets() {
        assert_eq!(classify_uniform([200, 20, 30]).name, ColorName::Red);
        assert_eq!(classify_uniform([10, 20, 220]).name, ColorName::Blue);
        assert_eq!(classify_uniform([10, 220, 20]).name, ColorName::Green);
        assert_eq!(classify_uniform([20, 20, 20]).name, ColorName::Black);
        assert_eq!(classify_uniform([180, 180, 180]).name, ColorName::Silver);
        assert_eq!(classify_uniform([230, 220, 40]).name, ColorName::Yellow);
        assert_eq!(classify_uniform([100, 60, 140]).name, ColorName::Unknown);
    }

    #[test]
    fn overlapping_ranges_resolve_to_earlier_bucket() {
        // (200, 200, 200) is inside White, Silver and Yellow.
        assert_eq!(ColorClassifier::label_for([200.0; 3]).name, ColorName::White);
    }

    #[test]
    fn centroid_is_the_mean_in_rgb_order() {
        let mut frame = Frame::filled(2, 1, ChannelOrder::Bgr, [0, 0, 0]);
        frame.fill_rect(PixelBox::new(1, 0, 1, 1), [255, 100, 50]);
        let region = frame.region(PixelBox::new(0, 0, 2, 1)).unwrap();
        let label = ColorClassifier::new().classify(&region);
        assert_eq!(label.rgb, [127.5, 50.0, 25.0]);
        assert_eq!(label.name, ColorName::Unknown);
    }
}
