//! Frame-level incident classification.
//!
//! The classifier is an external dual-head model: one head scores severity
//! (none/low/medium/high), the other scores accident vs. no accident. The
//! core only consumes the two vectors; turning them into a decision is the
//! [`IncidentGate`](crate::gate::IncidentGate)'s job.

mod stub;
#[cfg(feature = "backend-tract")]
mod tract;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::preprocess::NormalizedTensor;

pub use stub::ScriptedClassifier;
#[cfg(feature = "backend-tract")]
pub use tract::TractClassifier;

/// Raw distributions from both classifier heads.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    pub severity: Vec<f32>,
    pub accident: Vec<f32>,
}

impl ClassifierOutput {
    pub fn new(severity: Vec<f32>, accident: Vec<f32>) -> Self {
        Self { severity, accident }
    }
}

/// Incident classifier backend.
///
/// Implementations receive an already-normalized tensor and must not retain
/// it past the call.
pub trait IncidentClassifier: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    fn score(&mut self, tensor: &NormalizedTensor) -> Result<ClassifierOutput>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<C: IncidentClassifier + ?Sized> IncidentClassifier for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn score(&mut self, tensor: &NormalizedTensor) -> Result<ClassifierOutput> {
        (**self).score(tensor)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
