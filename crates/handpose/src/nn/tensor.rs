//! Tensor API.
//!
//! Tensors are the inputs and outputs of neural networks. A tensor is nothing more than an
//! N-dimensional array of `f32`s, stored in row-major order.

use std::fmt;

use tinyvec::TinyVec;

/// A dynamically shaped, densely stored `f32` tensor.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    shape: TinyVec<[usize; 4]>,
    data: Box<[f32]>,
}

impl Tensor {
    /// Creates a tensor of the given shape with every element set to `0.0`.
    pub fn zeros(shape: &[usize]) -> Self {
        let len = shape.iter().product();
        Self {
            shape: TinyVec::from(shape),
            data: vec![0.0; len].into_boxed_slice(),
        }
    }

    /// Creates a tensor of the given shape from its row-major element data.
    ///
    /// Returns an error if the number of elements does not match `shape`.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> anyhow::Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            anyhow::bail!(
                "tensor of shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len(),
            );
        }

        Ok(Self {
            shape: TinyVec::from(shape),
            data: data.into_boxed_slice(),
        })
    }

    /// Returns the shape of this tensor.
    ///
    /// A tensor's shape is the number of entries in each dimension.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the flattened, row-major element data.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Sets every element to `0.0`.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Network tensors have thousands of elements, only print a prefix.
        const MAX_ELEMENTS: usize = 8;
        write!(f, "Tensor{:?}", self.shape())?;
        f.debug_list()
            .entries(self.data.iter().take(MAX_ELEMENTS))
            .finish()?;
        if self.data.len() > MAX_ELEMENTS {
            write!(f, "+{}", self.data.len() - MAX_ELEMENTS)?;
        }
        Ok(())
    }
}
