use anyhow::{anyhow, Result};

use super::{ClassifierOutput, IncidentClassifier};
use crate::preprocess::NormalizedTensor;

/// Stub backend for tests and `stub://` runs.
///
/// Replays a fixed list of outputs in a loop, one per `score` call.
#[derive(Clone, Debug)]
pub struct ScriptedClassifier {
    script: Vec<ClassifierOutput>,
    cursor: usize,
    invocations: u64,
}

impl ScriptedClassifier {
    pub fn new(script: Vec<ClassifierOutput>) -> Self {
        Self {
            script,
            cursor: 0,
            invocations: 0,
        }
    }

    /// Always returns the same output.
    pub fn fixed(output: ClassifierOutput) -> Self {
        Self::new(vec![output])
    }

    /// Confidently reports "no accident, no severity" for every frame.
    pub fn quiet() -> Self {
        Self::fixed(ClassifierOutput::new(
            vec![1.0, 0.0, 0.0, 0.0],
            vec![1.0, 0.0],
        ))
    }

    pub fn invocations(&self) -> u64 {
        self.invocations
    }
}

impl Default for ScriptedClassifier {
    fn default() -> Self {
        Self::quiet()
    }
}

impl IncidentClassifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn score(&mut self, _tensor: &NormalizedTensor) -> Result<ClassifierOutput> {
        if self.script.is_empty() {
            return Err(anyhow!("scripted classifier has no outputs"));
        }
        let output = self.script[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.script.len();
        self.invocations += 1;
        Ok(output)
    }
}
