use serde::{Deserialize, Serialize};

/// One raw detector row before any filtering.
///
/// Geometry is normalized to the frame: center and size are fractions of the
/// frame width/height. `class_scores[i]` is the score for label id `i`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub class_scores: Vec<f32>,
}

impl RawCandidate {
    pub fn new(center_x: f32, center_y: f32, width: f32, height: f32, class_scores: Vec<f32>) -> Self {
        Self {
            center_x,
            center_y,
            width,
            height,
            class_scores,
        }
    }

    /// Candidate with a single non-zero score at `class_id`.
    pub fn one_hot(
        center_x: f32,
        center_y: f32,
        width: f32,
        height: f32,
        class_id: usize,
        confidence: f32,
        num_classes: usize,
    ) -> Self {
        let mut class_scores = vec![0.0; num_classes.max(class_id + 1)];
        class_scores[class_id] = confidence;
        Self::new(center_x, center_y, width, height, class_scores)
    }
}

/// Axis-aligned box in absolute pixel coordinates (top-left origin).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Intersection over union. Two empty boxes overlap by 0.
    pub fn iou(&self, other: &PixelBox) -> f32 {
        let left = self.x.max(other.x) as u64;
        let top = self.y.max(other.y) as u64;
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return 0.0;
        }

        let intersection = (right - left) * (bottom - top);
        let union = self.area() + other.area() - intersection;
        if union == 0 {
            return 0.0;
        }
        (intersection as f64 / union as f64) as f32
    }
}

/// A filtered, in-frame detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: PixelBox,
    pub class_id: usize,
    pub confidence: f32,
}
