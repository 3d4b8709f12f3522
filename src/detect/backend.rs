use anyhow::Result;

use crate::detect::result::RawCandidate;
use crate::frame::Frame;

/// Object detector backend.
///
/// The detector is an opaque scoring function: it receives the raw capture
/// frame and returns every candidate row it produced. Confidence filtering,
/// geometry validation and suppression happen afterwards in
/// [`DetectionFilter`](crate::detect::DetectionFilter), so backends must not
/// pre-filter beyond what their model format requires.
///
/// Implementations treat the frame as read-only and must not keep it past the
/// `score` call.
pub trait ObjectDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Score a frame. Coordinates are fractions of the frame size in `[0, 1]`.
    fn score(&mut self, frame: &Frame) -> Result<Vec<RawCandidate>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<D: ObjectDetector + ?Sized> ObjectDetector for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn score(&mut self, frame: &Frame) -> Result<Vec<RawCandidate>> {
        (**self).score(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
