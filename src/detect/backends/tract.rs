#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use super::yolo::parse_rows;
use crate::detect::backend::ObjectDetector;
use crate::detect::result::RawCandidate;
use crate::frame::Frame;

type Plan = RunnableModel<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// Tract-based YOLO-style detector for ONNX exports.
///
/// Input is a square NCHW blob: the frame resized to `input_size` without
/// cropping, RGB order, scaled by 1/255. Every output tensor is read as rows
/// of `[cx, cy, w, h, objectness, class scores...]` with coordinates relative
/// to the input, which equals relative to the frame since no letterboxing is
/// applied. Objectness is ignored; the class scores alone decide.
pub struct TractDetector {
    model: Plan,
    input_size: u32,
}

impl TractDetector {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, input_size })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.is_empty() {
            bail!("cannot build detector blob from an empty frame");
        }
        let resized = imageops::resize(
            &frame.to_rgb_image(),
            self.input_size,
            self.input_size,
            FilterType::Triangle,
        );
        let side = self.input_size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn extract_candidates(&self, outputs: &[TValue]) -> Result<Vec<RawCandidate>> {
        if outputs.is_empty() {
            return Err(anyhow!("model produced no outputs"));
        }

        let mut candidates = Vec::new();
        for output in outputs {
            let view = output
                .to_array_view::<f32>()
                .context("detector output tensor was not f32")?;
            let row_len = *view
                .shape()
                .last()
                .ok_or_else(|| anyhow!("detector output is a scalar"))?;
            let flat: Vec<f32> = view.iter().copied().collect();
            candidates.extend(parse_rows(&flat, row_len)?);
        }
        Ok(candidates)
    }
}

impl ObjectDetector for TractDetector {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn score(&mut self, frame: &Frame) -> Result<Vec<RawCandidate>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX detector inference failed")?;
        self.extract_candidates(&outputs)
    }
}
