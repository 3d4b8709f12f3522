//! Incident gate.
//!
//! Turns the classifier's two distributions into the per-frame incident
//! decision. Both conditions must hold: the accident confidence has to clear
//! the threshold *and* the severity head has to say something other than
//! "none". Nothing is carried between frames.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Number of severity classes the classifier emits.
pub const SEVERITY_CLASSES: usize = 4;

pub const DEFAULT_ACCIDENT_CONFIDENCE_THRESHOLD: f32 = 0.70;

/// Ordinal damage estimate.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum SeverityLevel {
    #[default]
    None = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl SeverityLevel {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::None),
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Overlay color for renderers (RGB): gray, green, yellow, red.
    pub fn overlay_rgb(self) -> [u8; 3] {
        match self {
            Self::None => [128, 128, 128],
            Self::Low => [0, 255, 0],
            Self::Medium => [255, 255, 0],
            Self::High => [255, 0, 0],
        }
    }
}

impl From<SeverityLevel> for u8 {
    fn from(level: SeverityLevel) -> u8 {
        level.as_u8()
    }
}

impl TryFrom<u8> for SeverityLevel {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Self::from_index(value as usize).ok_or_else(|| format!("invalid severity level {}", value))
    }
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Gate thresholds.
#[derive(Clone, Debug, PartialEq)]
pub struct GateConfig {
    /// Accident confidence must be strictly greater than this.
    pub accident_confidence_threshold: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            accident_confidence_threshold: DEFAULT_ACCIDENT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Output of [`IncidentGate::decide`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub incident_detected: bool,
    pub severity: SeverityLevel,
    pub accident_confidence: f32,
}

#[derive(Clone, Debug, Default)]
pub struct IncidentGate {
    config: GateConfig,
}

impl IncidentGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Decide whether the frame shows an incident.
    ///
    /// Shape problems are caller bugs (wrong model wired in), not runtime
    /// conditions, and come back as `ModelOutputShape`.
    pub fn decide(&self, severity: &[f32], accident: &[f32]) -> Result<GateDecision> {
        if severity.len() != SEVERITY_CLASSES {
            return Err(PipelineError::model_output(
                "severity",
                format!(
                    "expected {} classes, got {}",
                    SEVERITY_CLASSES,
                    severity.len()
                ),
            ));
        }
        check_finite("severity", severity)?;
        check_finite("accident", accident)?;

        let (severity_index, _) = argmax(severity)
            .ok_or_else(|| PipelineError::model_output("severity", "empty distribution"))?;
        let (_, accident_confidence) = argmax(accident)
            .ok_or_else(|| PipelineError::model_output("accident", "empty distribution"))?;
        let severity = SeverityLevel::from_index(severity_index).unwrap_or_default();

        let incident_detected = accident_confidence > self.config.accident_confidence_threshold
            && severity > SeverityLevel::None;

        Ok(GateDecision {
            incident_detected,
            severity,
            accident_confidence,
        })
    }
}

/// Index and value of the largest element. The first maximum wins ties.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut iter = values.iter().copied().enumerate();
    let first = iter.next()?;
    Some(iter.fold(first, |best, (i, v)| if v > best.1 { (i, v) } else { best }))
}

fn check_finite(output: &'static str, values: &[f32]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(PipelineError::model_output(
            output,
            format!("non-finite value at index {}", index),
        )),
        None => Ok(()),
    }
}
