//! Per-frame incident pipeline.
//!
//! normalize → classify → gate, and only when the gate fires:
//! detect → filter → color → assemble.
//!
//! All components are constructed once by the caller and moved in; the
//! pipeline borrows each frame read-only and keeps no state between frames
//! other than counters.

use crate::classify::IncidentClassifier;
use crate::color::ColorClassifier;
use crate::detect::{DetectionFilter, ObjectDetector};
use crate::error::{PipelineError, Result};
use crate::frame::Frame;
use crate::gate::IncidentGate;
use crate::labels::LabelVocabulary;
use crate::preprocess::FrameNormalizer;
use crate::result::{FrameResult, ResultAssembler};

/// Running counters, for health logging only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_processed: u64,
    pub incidents: u64,
    pub detector_runs: u64,
    pub frames_failed: u64,
}

pub struct IncidentPipeline<C, D> {
    normalizer: FrameNormalizer,
    classifier: C,
    gate: IncidentGate,
    detector: D,
    filter: DetectionFilter,
    colors: ColorClassifier,
    labels: LabelVocabulary,
    assembler: ResultAssembler,
    stats: PipelineStats,
}

impl<C: IncidentClassifier, D: ObjectDetector> IncidentPipeline<C, D> {
    /// Pipeline with default normalizer, gate, filter and COCO labels.
    pub fn new(classifier: C, detector: D) -> Self {
        Self {
            normalizer: FrameNormalizer::default(),
            classifier,
            gate: IncidentGate::default(),
            detector,
            filter: DetectionFilter::default(),
            colors: ColorClassifier::new(),
            labels: LabelVocabulary::coco(),
            assembler: ResultAssembler::new(),
            stats: PipelineStats::default(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: FrameNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_gate(mut self, gate: IncidentGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_filter(mut self, filter: DetectionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_labels(mut self, labels: LabelVocabulary) -> Self {
        self.labels = labels;
        self
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Run backend warm-up hooks.
    pub fn warm_up(&mut self) -> anyhow::Result<()> {
        self.classifier.warm_up()?;
        self.detector.warm_up()?;
        log::info!(
            "pipeline ready: classifier={} detector={} preprocess={}",
            self.classifier.name(),
            self.detector.name(),
            self.normalizer.preprocess_name()
        );
        Ok(())
    }

    /// Process one frame.
    ///
    /// Errors are per-frame: the next frame is unaffected. The caller decides
    /// whether a `ModelOutputShape` error should stop the stream.
    pub fn process(&mut self, frame: &Frame) -> Result<FrameResult> {
        let outcome = self.run(frame);
        self.stats.frames_processed += 1;
        match &outcome {
            Ok(result) if result.incident_detected => self.stats.incidents += 1,
            Ok(_) => {}
            Err(_) => self.stats.frames_failed += 1,
        }
        outcome
    }

    /// Process one frame, degrading any failure to the "no incident" result.
    pub fn process_or_degrade(&mut self, frame: &Frame) -> FrameResult {
        match self.process(frame) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("frame degraded to no-incident: {}", err);
                FrameResult::degraded()
            }
        }
    }

    fn run(&mut self, frame: &Frame) -> Result<FrameResult> {
        let tensor = self.normalizer.normalize(frame)?;
        let scores = self
            .classifier
            .score(&tensor)
            .map_err(|err| PipelineError::backend("classifier", err))?;
        let decision = self.gate.decide(&scores.severity, &scores.accident)?;

        log::debug!(
            "gate: incident={} severity={} confidence={:.3}",
            decision.incident_detected,
            decision.severity,
            decision.accident_confidence
        );

        // Detection is the expensive stage; it only runs on flagged frames.
        if !decision.incident_detected {
            return Ok(FrameResult::no_incident(decision));
        }

        self.stats.detector_runs += 1;
        let candidates = self
            .detector
            .score(frame)
            .map_err(|err| PipelineError::backend("detector", err))?;
        let detections = self
            .filter
            .filter(&candidates, frame.width(), frame.height())?;

        log::debug!(
            "detector: {} candidates, {} kept",
            candidates.len(),
            detections.len()
        );

        Ok(self.assembler.assemble(
            decision,
            &detections,
            frame,
            &self.labels,
            &self.colors,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ClassifierOutput, ScriptedClassifier};
    use crate::detect::{RawCandidate, ScriptedDetector};
    use crate::frame::ChannelOrder;

    fn flagged() -> ClassifierOutput {
        ClassifierOutput::new(vec![0.0, 0.0, 0.0, 1.0], vec![0.05, 0.95])
    }

    #[test]
    fn quiet_frames_skip_the_detector() {
        let mut pipeline =
            IncidentPipeline::new(ScriptedClassifier::quiet(), ScriptedDetector::empty());
        let frame = Frame::filled(64, 48, ChannelOrder::Bgr, [90, 90, 90]);

        for _ in 0..3 {
            let result = pipeline.process(&frame).unwrap();
            assert!(!result.incident_detected);
        }
        assert_eq!(pipeline.detector().invocations(), 0);
        assert_eq!(pipeline.stats().frames_processed, 3);
        assert_eq!(pipeline.stats().detector_runs, 0);
    }

    #[test]
    fn invalid_frame_fails_before_classification() {
        let mut pipeline =
            IncidentPipeline::new(ScriptedClassifier::fixed(flagged()), ScriptedDetector::empty());
        let frame = Frame::new(Vec::new(), 0, 0, ChannelOrder::Bgr).unwrap();

        let err = pipeline.process(&frame).unwrap_err();
        assert!(err.is_invalid_frame());
        assert_eq!(pipeline.classifier().invocations(), 0);
        assert_eq!(pipeline.stats().frames_failed, 1);
    }

    #[test]
    fn shape_errors_propagate_and_degrade_on_request() {
        let bad = ClassifierOutput::new(vec![0.5, 0.5], vec![0.1, 0.9]);
        let mut pipeline =
            IncidentPipeline::new(ScriptedClassifier::fixed(bad), ScriptedDetector::empty());
        let frame = Frame::filled(8, 8, ChannelOrder::Rgb, [0, 0, 0]);

        assert!(matches!(
            pipeline.process(&frame),
            Err(PipelineError::ModelOutputShape { .. })
        ));
        assert_eq!(pipeline.process_or_degrade(&frame), FrameResult::degraded());
    }

    #[test]
    fn detector_failure_is_a_backend_error() {
        struct Broken;
        impl ObjectDetector for Broken {
            fn name(&self) -> &'static str {
                "broken"
            }
            fn score(&mut self, _frame: &Frame) -> anyhow::Result<Vec<RawCandidate>> {
                Err(anyhow::anyhow!("device lost"))
            }
        }

        let mut pipeline = IncidentPipeline::new(ScriptedClassifier::fixed(flagged()), Broken);
        let frame = Frame::filled(8, 8, ChannelOrder::Rgb, [0, 0, 0]);
        let err = pipeline.process(&frame).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Backend {
                stage: "detector",
                message: "device lost".to_string()
            }
        );
    }

    #[test]
    fn boxed_backends_plug_in() {
        let classifier: Box<dyn IncidentClassifier> = Box::new(ScriptedClassifier::fixed(flagged()));
        let detector: Box<dyn ObjectDetector> = Box::new(ScriptedDetector::new(vec![
            RawCandidate::one_hot(0.5, 0.5, 0.5, 0.5, 3, 0.9, 80),
        ]));
        let mut pipeline = IncidentPipeline::new(classifier, detector);
        let frame = Frame::filled(40, 40, ChannelOrder::Rgb, [0, 0, 0]);

        let result = pipeline.process(&frame).unwrap();
        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].vehicle_type, "motorbike");
        assert_eq!(pipeline.stats().incidents, 1);
    }
}
