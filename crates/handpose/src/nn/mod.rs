//! Neural Network inference.
//!
//! The pipeline doesn't care how networks are executed. It only needs something implementing
//! [`Model`]: a unit that accepts an input [`Tensor`], can be invoked, and exposes its output
//! tensors afterwards. [`onnx::OnnxModel`] is the implementation shipped with this crate.

pub mod onnx;
pub mod resample;
pub mod tensor;

use std::{error::Error, fmt};

pub use tensor::Tensor;

/// A neural network that can be run on a single input tensor.
///
/// Calls happen in a fixed order: [`Model::set_input`], then [`Model::invoke`], then any number of
/// [`Model::output`] calls. Implementations must reject input tensors of the wrong shape in
/// [`Model::invoke`].
pub trait Model {
    /// Stores the input tensor for the next [`Model::invoke`] call.
    fn set_input(&mut self, input: &Tensor);

    /// Runs the network on the current input.
    ///
    /// Returns an error if the backend fails. In that case, the outputs are unspecified.
    fn invoke(&mut self) -> anyhow::Result<()>;

    /// Returns the output tensor at `index` computed by the last successful [`Model::invoke`].
    ///
    /// Returns [`None`] if there is no such output.
    fn output(&self, index: usize) -> Option<&Tensor>;
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn set_input(&mut self, input: &Tensor) {
        (**self).set_input(input);
    }

    fn invoke(&mut self) -> anyhow::Result<()> {
        (**self).invoke()
    }

    fn output(&self, index: usize) -> Option<&Tensor> {
        (**self).output(index)
    }
}

/// Error returned when running one of the pipeline's networks failed.
///
/// This covers backend failures as well as outputs that don't have the expected layout.
#[derive(Debug)]
pub struct InferenceError {
    network: &'static str,
    source: anyhow::Error,
}

impl InferenceError {
    pub(crate) fn new(network: &'static str, source: anyhow::Error) -> Self {
        Self { network, source }
    }

    /// Returns the name of the network that failed.
    pub fn network(&self) -> &'static str {
        self.network
    }
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} inference failed: {:#}", self.network, self.source)
    }
}

impl Error for InferenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

/// Fetches output `index` of `model` and checks that it has exactly `len` elements.
pub(crate) fn expect_output<'a, M: Model + ?Sized>(
    model: &'a M,
    index: usize,
    len: usize,
) -> anyhow::Result<&'a [f32]> {
    let Some(tensor) = model.output(index) else {
        anyhow::bail!("network has no output #{}", index);
    };
    if tensor.len() != len {
        anyhow::bail!(
            "output #{} has shape {:?} ({} elements), expected {} elements",
            index,
            tensor.shape(),
            tensor.len(),
            len,
        );
    }

    Ok(tensor.as_slice())
}
