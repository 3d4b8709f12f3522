use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use tract_onnx::prelude::*;

use super::{ClassifierOutput, IncidentClassifier};
use crate::preprocess::NormalizedTensor;

type Plan = RunnableModel<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// Tract-based dual-head classifier for ONNX exports of a Keras model.
///
/// Input is NHWC `[1, H, W, 3]`. The first model output is the severity
/// head, the second the accident head; both are flattened.
pub struct TractClassifier {
    model: Plan,
    width: usize,
    height: usize,
}

impl TractClassifier {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let (width, height) = (width as usize, height as usize);
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, height, width, 3)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
        })
    }

    fn build_input(&self, tensor: &NormalizedTensor) -> Result<Tensor> {
        if tensor.width() != self.width || tensor.height() != self.height {
            bail!(
                "tensor size {}x{} does not match model input {}x{}",
                tensor.width(),
                tensor.height(),
                self.width,
                self.height
            );
        }
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, self.height, self.width, 3),
            |(_, y, x, c)| tensor.at(y, x, c),
        );
        Ok(input.into_tensor())
    }
}

fn flatten(outputs: &[TValue], index: usize, head: &str) -> Result<Vec<f32>> {
    let output = outputs
        .get(index)
        .ok_or_else(|| anyhow!("model produced no {} output", head))?;
    let view = output
        .to_array_view::<f32>()
        .with_context(|| format!("{} output tensor was not f32", head))?;
    Ok(view.iter().copied().collect())
}

impl IncidentClassifier for TractClassifier {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn score(&mut self, tensor: &NormalizedTensor) -> Result<ClassifierOutput> {
        let input = self.build_input(tensor)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX classifier inference failed")?;
        Ok(ClassifierOutput::new(
            flatten(&outputs, 0, "severity")?,
            flatten(&outputs, 1, "accident")?,
        ))
    }
}
