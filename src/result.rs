//! Per-frame result handed to renderers and loggers.
//!
//! `FrameResult` is the only thing that leaves the pipeline. It carries no
//! frame counter or timestamp, so identical inputs produce identical results.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::color::{ColorClassifier, ColorLabel};
use crate::detect::Detection;
use crate::frame::Frame;
use crate::gate::{GateDecision, SeverityLevel};
use crate::labels::LabelVocabulary;

/// One surviving detection with its resolved attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedDetection {
    pub detection: Detection,
    pub vehicle_type: String,
    pub color: ColorLabel,
}

impl AnnotatedDetection {
    /// Overlay caption, e.g. `car (Red)`.
    pub fn caption(&self) -> String {
        format!("{} ({})", self.vehicle_type, self.color.name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub incident_detected: bool,
    pub severity: SeverityLevel,
    pub accident_confidence: f32,
    pub detections: Vec<AnnotatedDetection>,
}

impl FrameResult {
    /// Negative result for a frame the gate did not flag.
    pub fn no_incident(decision: GateDecision) -> Self {
        Self {
            incident_detected: false,
            severity: decision.severity,
            accident_confidence: decision.accident_confidence,
            detections: Vec::new(),
        }
    }

    /// What a renderer shows for a frame that failed processing.
    pub fn degraded() -> Self {
        Self::default()
    }

    /// Headline text for the frame overlay.
    pub fn headline(&self) -> String {
        if self.incident_detected {
            format!(
                "Accident Severity: {} (Confidence: {:.2})",
                self.severity, self.accident_confidence
            )
        } else {
            "No Accident Detected".to_string()
        }
    }

    /// Overlay color for boxes (RGB).
    pub fn box_rgb(&self) -> [u8; 3] {
        self.severity.overlay_rgb()
    }

    /// SHA-256 over the canonical JSON encoding, hex encoded.
    pub fn digest(&self) -> String {
        // Plain data with string keys; serialization cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&json))
    }
}

/// Pure structural composition of gate output, detections, labels and colors.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Pair every detection, in order, with its vehicle type and color.
    pub fn assemble(
        &self,
        decision: GateDecision,
        detections: &[Detection],
        frame: &Frame,
        labels: &LabelVocabulary,
        colors: &ColorClassifier,
    ) -> FrameResult {
        let detections = detections
            .iter()
            .map(|detection| {
                let color = match frame.region(detection.bbox) {
                    Some(region) => colors.classify(&region),
                    None => {
                        log::debug!("detection {:?} has no in-frame region", detection.bbox);
                        ColorLabel::unknown()
                    }
                };
                AnnotatedDetection {
                    detection: detection.clone(),
                    vehicle_type: labels.resolve(detection.class_id),
                    color,
                }
            })
            .collect();

        FrameResult {
            incident_detected: decision.incident_detected,
            severity: decision.severity,
            accident_confidence: decision.accident_confidence,
            detections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorName;
    use crate::detect::PixelBox;
    use crate::frame::ChannelOrder;

    fn incident() -> GateDecision {
        GateDecision {
            incident_detected: true,
            severity: SeverityLevel::High,
            accident_confidence: 0.912,
        }
    }

    #[test]
    fn assembles_in_order_with_names_and_colors() {
        let mut frame = Frame::filled(100, 100, ChannelOrder::Bgr, [0, 0, 0]);
        frame.fill_rect(PixelBox::new(0, 0, 10, 10), [220, 10, 10]);
        frame.fill_rect(PixelBox::new(50, 50, 20, 20), [240, 240, 240]);
        let detections = vec![
            Detection {
                bbox: PixelBox::new(50, 50, 20, 20),
                class_id: 7,
                confidence: 0.9,
            },
            Detection {
                bbox: PixelBox::new(0, 0, 10, 10),
                class_id: 2,
                confidence: 0.8,
            },
        ];

        let result = ResultAssembler::new().assemble(
            incident(),
            &detections,
            &frame,
            &LabelVocabulary::coco(),
            &ColorClassifier::new(),
        );

        assert!(result.incident_detected);
        assert_eq!(result.detections.len(), 2);
        assert_eq!(result.detections[0].vehicle_type, "truck");
        assert_eq!(result.detections[0].color.name, ColorName::White);
        assert_eq!(result.detections[1].caption(), "car (Red)");
        assert_eq!(result.detections[1].detection, detections[1]);
    }

    #[test]
    fn zero_detections_is_still_a_result() {
        let frame = Frame::filled(10, 10, ChannelOrder::Rgb, [0, 0, 0]);
        let result = ResultAssembler::new().assemble(
            incident(),
            &[],
            &frame,
            &LabelVocabulary::coco(),
            &ColorClassifier::new(),
        );
        assert!(result.incident_detected);
        assert!(result.detections.is_empty());
    }

    #[test]
    fn headlines_match_overlay_text() {
        let result = FrameResult {
            incident_detected: true,
            severity: SeverityLevel::Medium,
            accident_confidence: 0.85,
            detections: Vec::new(),
        };
        assert_eq!(result.headline(), "Accident Severity: 2 (Confidence: 0.85)");
        assert_eq!(result.box_rgb(), [255, 255, 0]);
        assert_eq!(FrameResult::degraded().headline(), "No Accident Detected");
    }

    #[test]
    fn digest_tracks_content() {
        let a = FrameResult::no_incident(GateDecision::default());
        let b = FrameResult::no_incident(GateDecision::default());
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);

        let mut c = a.clone();
        c.accident_confidence = 0.5;
        assert_ne!(a.digest(), c.digest());
    }
}
