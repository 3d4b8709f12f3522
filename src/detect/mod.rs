//! Vehicle localization: detector backends and the detection filter.
//!
//! Detection only runs for frames the incident gate has already flagged.

mod backend;
mod backends;
mod filter;
mod result;

pub use backend::ObjectDetector;
pub use backends::ScriptedDetector;
#[cfg(feature = "backend-tract")]
pub use backends::TractDetector;
pub use filter::{
    DetectionFilter, FilterConfig, NmsMode, DEFAULT_DETECTION_CONFIDENCE_THRESHOLD,
    DEFAULT_NMS_IOU_THRESHOLD, DEFAULT_VEHICLE_CLASSES,
};
pub use result::{Detection, PixelBox, RawCandidate};
