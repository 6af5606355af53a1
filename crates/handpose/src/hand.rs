//! Detection and pose estimation of a single human hand.
//!
//! The pipeline has two stages: [`detection`] finds a palm in the whole frame, and [`landmark`]
//! estimates the hand's landmarks inside a rotated region around it, derived by [`roi`].
//! [`tracking`] ties both stages together and smooths their results over time.

pub mod detection;
pub mod landmark;
pub mod roi;
pub mod tracking;
