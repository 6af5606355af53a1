//! CPU inference of ONNX models via `tract`.

use std::{path::Path, sync::Arc};

use anyhow::Context;
use tract_onnx::prelude::{
    tvec, Framework, Graph, InferenceModelExt, SimplePlan, TValue, TypedFact, TypedOp,
};

use super::{Model, Tensor};

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// An ONNX network, optimized and ready for inference.
///
/// Parsing and optimization is done by `tract`, this type only adapts it to the [`Model`] trait.
pub struct OnnxModel {
    plan: Plan,
    input: Option<Tensor>,
    outputs: Vec<Tensor>,
}

impl OnnxModel {
    /// Loads a pre-trained model from an ONNX file path.
    ///
    /// The path must have a `.onnx` extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::from_path_impl(path.as_ref())
    }

    fn from_path_impl(path: &Path) -> anyhow::Result<Self> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => anyhow::bail!("neural network file must have `.onnx` extension"),
        }

        let model_data = std::fs::read(path)
            .with_context(|| format!("failed to read model from '{}'", path.display()))?;
        Self::from_onnx(&model_data)
            .with_context(|| format!("failed to load model '{}'", path.display()))
    }

    /// Loads a pre-trained model from an in-memory ONNX file.
    ///
    /// Returns an error if the network data is malformed, incomplete, or uses operations `tract`
    /// does not implement.
    pub fn from_onnx(raw: &[u8]) -> anyhow::Result<Self> {
        let graph = tract_onnx::onnx()
            .model_for_read(&mut &*raw)?
            .into_optimized()?;
        let plan = SimplePlan::new(graph)?;

        let this = Self {
            plan,
            input: None,
            outputs: Vec::new(),
        };
        this.log_tensors()?;
        Ok(this)
    }

    fn log_tensors(&self) -> anyhow::Result<()> {
        let model = self.plan.model();
        for (id, outlet) in model.input_outlets()?.iter().enumerate() {
            let fact = model.input_fact(id)?;
            log::debug!(
                "network input #{} '{}': {:?} {:?}",
                id,
                model.node(outlet.node).name,
                fact.datum_type,
                fact.shape,
            );
        }
        for (id, outlet) in model.output_outlets()?.iter().enumerate() {
            let fact = model.output_fact(id)?;
            log::debug!(
                "network output #{} '{}': {:?} {:?}",
                id,
                model.node(outlet.node).name,
                fact.datum_type,
                fact.shape,
            );
        }
        Ok(())
    }

    /// Returns the number of output tensors the network computes.
    pub fn num_outputs(&self) -> usize {
        self.plan.model().outputs.len()
    }
}

impl Model for OnnxModel {
    fn set_input(&mut self, input: &Tensor) {
        match &mut self.input {
            Some(stored) if stored.shape() == input.shape() => {
                stored.as_mut_slice().copy_from_slice(input.as_slice());
            }
            _ => self.input = Some(input.clone()),
        }
    }

    fn invoke(&mut self) -> anyhow::Result<()> {
        self.outputs.clear();

        let input = self
            .input
            .as_ref()
            .context("`invoke` called without an input tensor")?;
        let tract = tract_onnx::prelude::Tensor::from_shape(input.shape(), input.as_slice())?;
        let outputs = self.plan.run(tvec![TValue::from_const(Arc::new(tract))])?;

        for value in outputs {
            let data = value.as_slice::<f32>()?;
            self.outputs
                .push(Tensor::from_vec(value.shape(), data.to_vec())?);
        }

        Ok(())
    }

    fn output(&self, index: usize) -> Option<&Tensor> {
        self.outputs.get(index)
    }
}
