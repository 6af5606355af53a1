//! Runs the hand tracker over a sequence of images.
//!
//! Usage: `hand_tracking <palm_detection.onnx> <hand_landmark.onnx> <image>...`
//!
//! The images are treated as consecutive frames of a video, so the results are smoothed across
//! them. Pass the same image several times to watch the outputs settle.

use anyhow::Context;
use handpose::{
    hand::{
        landmark::LandmarkIdx,
        tracking::{HandTracker, TrackerOptions},
    },
    image::Frame,
    nn::onnx::OnnxModel,
    timer::FpsCounter,
};

fn main() -> anyhow::Result<()> {
    handpose::init_logger!();

    let mut args = std::env::args().skip(1);
    let usage = "usage: hand_tracking <palm_detection.onnx> <hand_landmark.onnx> <image>...";
    let palm_path = args.next().context(usage)?;
    let landmark_path = args.next().context(usage)?;
    let images = args.collect::<Vec<_>>();
    if images.is_empty() {
        anyhow::bail!("{}", usage);
    }

    let palm = OnnxModel::from_path(&palm_path)?;
    let landmark = OnnxModel::from_path(&landmark_path)?;
    let mut tracker = HandTracker::new(palm, landmark, TrackerOptions::default())?;

    let mut fps = FpsCounter::new("hand tracker");
    for path in &images {
        let image = image::open(path)
            .with_context(|| format!("failed to open '{}'", path))?
            .to_rgb8();
        let frame = Frame::from(&image);

        let pose = tracker.track(&frame)?;
        let roi = pose.roi();
        log::info!(
            "{}: palm {}, hand {}, region at {:?} ({:.1}px, {:.1}°)",
            path,
            if pose.palm_updated() { "found" } else { "kept" },
            if pose.hand_present() { "present" } else { "absent" },
            roi.center(),
            roi.size().x,
            roi.angle().to_degrees(),
        );
        let landmarks = pose.landmarks();
        for idx in [LandmarkIdx::Wrist, LandmarkIdx::IndexFingerTip] {
            log::info!("  {:?}: {:?}", idx, landmarks.position(idx));
        }
        log::debug!(
            "  palm center {:?}, rotation {:.1}°",
            landmarks.palm_center(),
            landmarks.rotation_radians().to_degrees(),
        );

        fps.tick(&tracker.timers());
    }

    Ok(())
}
