//! Two-stage hand pose estimation.
//!
//! A palm detector runs over the whole frame, its output is aggregated into a single palm box with
//! seven keypoints, and a rotated region of interest derived from that palm is resampled and fed to
//! a hand landmark network that estimates 21 3D landmarks. Both stages are smoothed over a few
//! frames to suppress jitter.
//!
//! The neural networks themselves are external: anything implementing [`nn::Model`] can be
//! plugged in. [`nn::onnx::OnnxModel`] runs ONNX models on the CPU.
//!
//! The entry point is [`hand::tracking::HandTracker`].
//!
//! # Coordinates
//!
//! Palm detections are normalized to the palm network's input (0.0 to 1.0 on both axes). Regions of
//! interest are derived in the network's input pixels, and everything the tracker publishes in the
//! end (the region of interest and the landmarks) is in pixels of the frame passed to
//! [`HandTracker::track`][hand::tracking::HandTracker::track], after the camera flip has been
//! applied.
//!
//! Landmark Z coordinates are relative depth values output by the network and do not have a
//! physical unit.

use log::LevelFilter;

pub mod detection;
pub mod filter;
pub mod hand;
pub mod image;
pub mod nn;
pub mod num;
pub mod rect;
pub mod timer;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and this library will log at *debug* level, `tract` will log at *warn* level.
/// The `RUST_LOG` environment variable can be used to override this.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
