use anyhow::Result;

use crate::detect::backend::ObjectDetector;
use crate::detect::result::RawCandidate;
use crate::frame::Frame;

/// Stub backend for tests and `stub://` runs. Replays a fixed candidate list.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDetector {
    candidates: Vec<RawCandidate>,
    invocations: u64,
}

impl ScriptedDetector {
    pub fn new(candidates: Vec<RawCandidate>) -> Self {
        Self {
            candidates,
            invocations: 0,
        }
    }

    /// Detector that never sees anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of `score` calls so far.
    pub fn invocations(&self) -> u64 {
        self.invocations
    }
}

impl ObjectDetector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn score(&mut self, _frame: &Frame) -> Result<Vec<RawCandidate>> {
        self.invocations += 1;
        Ok(self.candidates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ChannelOrder;

    #[test]
    fn scripted_detector_replays_and_counts() {
        let frame = Frame::filled(8, 8, ChannelOrder::Rgb, [0, 0, 0]);
        let candidate = RawCandidate::one_hot(0.5, 0.5, 0.5, 0.5, 2, 0.9, 80);
        let mut detector = ScriptedDetector::new(vec![candidate.clone()]);
        assert_eq!(detector.invocations(), 0);

        let r1 = detector.score(&frame).unwrap();
        let r2 = detector.score(&frame).unwrap();
        assert_eq!(r1, vec![candidate]);
        assert_eq!(r1, r2);
        assert_eq!(detector.invocations(), 2);
    }
}
