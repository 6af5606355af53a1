//! Utilities for numerics.

use std::f32::consts::{PI, TAU};

/// Applies the standard sigmoid/logistic function to the input.
pub fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

/// Wraps an angle in radians into the half-open range `(-π, π]`.
pub fn normalize_radians(angle: f32) -> f32 {
    angle - TAU * ((angle - PI) / TAU).ceil()
}
