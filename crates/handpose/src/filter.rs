//! Temporal smoothing of per-frame estimates.

mod ema;
mod moving;

pub use ema::Ema;
pub use moving::MovingAvg;

use nalgebra::SVector;

/// A filter for values of type `V`.
pub trait Filter<V> {
    /// Adds a new value to the filter, returning the filtered value.
    fn push(&mut self, value: V) -> V;

    /// Resets the accumulated history and state of the filter to be identical to the state just
    /// after construction.
    fn reset(&mut self);
}

impl<V> Filter<V> for Box<dyn Filter<V>> {
    fn push(&mut self, value: V) -> V {
        (**self).push(value)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

/// Values that can be averaged component-wise.
///
/// Implemented for scalars, `nalgebra` vectors, arrays of averageable values, and the compound
/// estimates produced by the hand pipeline.
pub trait Average: Clone {
    /// Adds `other` to `self`, component by component.
    fn accumulate(&mut self, other: &Self);

    /// Divides every component of `self` by `divisor`.
    fn divide(&mut self, divisor: f32);
}

impl Average for f32 {
    #[inline]
    fn accumulate(&mut self, other: &Self) {
        *self += *other;
    }

    #[inline]
    fn divide(&mut self, divisor: f32) {
        *self /= divisor;
    }
}

impl<const D: usize> Average for SVector<f32, D> {
    #[inline]
    fn accumulate(&mut self, other: &Self) {
        *self += other;
    }

    #[inline]
    fn divide(&mut self, divisor: f32) {
        *self /= divisor;
    }
}

impl<T: Average, const N: usize> Average for [T; N] {
    fn accumulate(&mut self, other: &Self) {
        for (acc, value) in self.iter_mut().zip(other) {
            acc.accumulate(value);
        }
    }

    fn divide(&mut self, divisor: f32) {
        for value in self {
            value.divide(divisor);
        }
    }
}
