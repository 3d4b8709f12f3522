//! Crash Vision
//!
//! Per-frame vehicle collision detection for traffic camera feeds.
//!
//! # Pipeline
//!
//! Every captured frame goes through the same fixed sequence:
//!
//! 1. **Normalize**: resize, reorder channels, preprocess, batch (`preprocess`)
//! 2. **Classify**: dual-head incident classifier scores severity and accident (`classify`)
//! 3. **Gate**: severity argmax plus accident confidence threshold (`gate`)
//! 4. **Detect**: vehicle detector, only for frames the gate flagged (`detect`)
//! 5. **Filter**: confidence, class whitelist, frame bounds, NMS (`detect`)
//! 6. **Color**: dominant color of each surviving box (`color`)
//! 7. **Assemble**: one `FrameResult` per frame (`result`)
//!
//! The scoring models are trait objects injected at construction, so the
//! pipeline runs the same way with ONNX models (feature `backend-tract`) or
//! with scripted stubs.
//!
//! # Module Structure
//!
//! - `frame`: owned capture frames and read-only regions
//! - `ingest`: capture sources (synthetic, image directories, FFmpeg)
//! - `pipeline`: `IncidentPipeline`, the per-frame orchestration
//! - `render`: result sinks (log, JSON lines)
//! - `config`: file + environment configuration for `crash_monitor`

pub mod classify;
pub mod color;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod gate;
pub mod ingest;
pub mod labels;
pub mod pipeline;
pub mod preprocess;
pub mod render;
pub mod result;

pub use classify::{ClassifierOutput, IncidentClassifier, ScriptedClassifier};
#[cfg(feature = "backend-tract")]
pub use classify::TractClassifier;
pub use color::{ColorClassifier, ColorLabel, ColorName};
pub use config::CrashVisionConfig;
pub use detect::{
    Detection, DetectionFilter, FilterConfig, NmsMode, ObjectDetector, PixelBox, RawCandidate,
    ScriptedDetector,
};
#[cfg(feature = "backend-tract")]
pub use detect::TractDetector;
pub use error::{PipelineError, Result};
pub use frame::{ChannelOrder, Frame, FrameRegion};
pub use gate::{GateConfig, GateDecision, IncidentGate, SeverityLevel};
pub use ingest::{open_source, FrameSource, SourceConfig, SourceStats};
pub use labels::LabelVocabulary;
pub use pipeline::{IncidentPipeline, PipelineStats};
pub use preprocess::{FrameNormalizer, NormalizedTensor, NormalizerConfig, Preprocess};
pub use render::{JsonLinesSink, LogSink, ResultSink};
pub use result::{AnnotatedDetection, FrameResult, ResultAssembler};

/// Crate version, for startup logs.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
