//! Raw detector output → deduplicated, in-frame detections.
//!
//! Order of operations is fixed: argmax, confidence cut, class whitelist,
//! pixel conversion, bounds check, then greedy non-max suppression. Dropped
//! candidates are expected input from an imperfect detector and are only
//! logged at debug level.

use serde::{Deserialize, Serialize};

use crate::detect::result::{Detection, PixelBox, RawCandidate};
use crate::error::{PipelineError, Result};
use crate::gate::argmax;

pub const DEFAULT_DETECTION_CONFIDENCE_THRESHOLD: f32 = 0.70;
pub const DEFAULT_NMS_IOU_THRESHOLD: f32 = 0.40;

/// COCO vehicle range: bicycle, car, motorcycle, airplane, bus, train, truck, boat.
pub const DEFAULT_VEHICLE_CLASSES: [usize; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

/// Which boxes may suppress each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NmsMode {
    /// Any overlapping pair competes, regardless of class.
    #[default]
    ClassAgnostic,
    /// Only boxes with the same class id compete.
    PerClass,
}

impl std::str::FromStr for NmsMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "class_agnostic" | "agnostic" => Ok(Self::ClassAgnostic),
            "per_class" | "class" => Ok(Self::PerClass),
            other => Err(format!("unknown NMS mode '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterConfig {
    /// Class ids worth reporting.
    pub class_whitelist: Vec<usize>,
    /// Candidates must score strictly above this.
    pub confidence_threshold: f32,
    /// A box is suppressed when its IoU with a kept box is strictly above this.
    pub nms_iou_threshold: f32,
    pub nms_mode: NmsMode,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            class_whitelist: DEFAULT_VEHICLE_CLASSES.to_vec(),
            confidence_threshold: DEFAULT_DETECTION_CONFIDENCE_THRESHOLD,
            nms_iou_threshold: DEFAULT_NMS_IOU_THRESHOLD,
            nms_mode: NmsMode::default(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DetectionFilter {
    config: FilterConfig,
}

impl DetectionFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Filter raw candidates for a `frame_width × frame_height` frame.
    ///
    /// Output is sorted by descending confidence; equal confidences keep their
    /// input order. A candidate without any class score is a model output
    /// shape error.
    pub fn filter(
        &self,
        candidates: &[RawCandidate],
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Vec<Detection>> {
        let mut survivors = Vec::with_capacity(candidates.len());

        for (index, candidate) in candidates.iter().enumerate() {
            let (class_id, confidence) = argmax(&candidate.class_scores).ok_or_else(|| {
                PipelineError::model_output(
                    "detector",
                    format!("candidate {} has no class scores", index),
                )
            })?;

            if !confidence.is_finite() || confidence <= self.config.confidence_threshold {
                continue;
            }
            if !self.config.class_whitelist.contains(&class_id) {
                continue;
            }
            let Some(bbox) = to_pixel_box(candidate, frame_width, frame_height) else {
                log::debug!(
                    "discarding candidate {} (class {}, conf {:.2}): outside {}x{} frame",
                    index,
                    class_id,
                    confidence,
                    frame_width,
                    frame_height
                );
                continue;
            };

            survivors.push(Detection {
                bbox,
                class_id,
                confidence,
            });
        }

        Ok(self.suppress(survivors))
    }

    /// Greedy non-max suppression.
    fn suppress(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        // sort_by is stable, so ties keep detection order.
        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
        for candidate in detections {
            let suppressed = kept.iter().any(|k| {
                self.competes(k, &candidate)
                    && k.bbox.iou(&candidate.bbox) > self.config.nms_iou_threshold
            });
            if suppressed {
                log::debug!(
                    "suppressing class {} conf {:.2} at {:?}",
                    candidate.class_id,
                    candidate.confidence,
                    candidate.bbox
                );
            } else {
                kept.push(candidate);
            }
        }
        kept
    }

    fn competes(&self, a: &Detection, b: &Detection) -> bool {
        match self.config.nms_mode {
            NmsMode::ClassAgnostic => true,
            NmsMode::PerClass => a.class_id == b.class_id,
        }
    }
}

/// Convert normalized center/size into a pixel box, or `None` when the box
/// does not lie entirely inside the frame. Boxes are never clamped.
fn to_pixel_box(candidate: &RawCandidate, frame_width: u32, frame_height: u32) -> Option<PixelBox> {
    let geometry = [
        candidate.center_x,
        candidate.center_y,
        candidate.width,
        candidate.height,
    ];
    if geometry.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let fw = f64::from(frame_width);
    let fh = f64::from(frame_height);
    let center_x = (f64::from(candidate.center_x) * fw).trunc();
    let center_y = (f64::from(candidate.center_y) * fh).trunc();
    let w = (f64::from(candidate.width) * fw).trunc();
    let h = (f64::from(candidate.height) * fh).trunc();
    let x = (center_x - w / 2.0).floor();
    let y = (center_y - h / 2.0).floor();

    if w < 0.0 || h < 0.0 || x < 0.0 || y < 0.0 || x + w > fw || y + h > fh {
        return None;
    }
    Some(PixelBox::new(x as u32, y as u32, w as u32, h as u32))
}
