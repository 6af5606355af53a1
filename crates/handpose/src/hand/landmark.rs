//! Hand landmark prediction.

use nalgebra::{Rotation2, Vector2, Vector3};

use crate::{filter::Average, image::Resolution};

use super::roi::HandRoi;

/// Number of landmarks estimated per hand.
pub const NUM_LANDMARKS: usize = 21;

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// The landmarks surrounding the palm.
pub const PALM_LANDMARKS: &[LandmarkIdx] = {
    use LandmarkIdx::*;
    &[
        Wrist,
        ThumbCmc,
        IndexFingerMcp,
        MiddleFingerMcp,
        RingFingerMcp,
        PinkyMcp,
    ]
};

/// Bones of the hand skeleton, as pairs of connected landmarks.
pub const CONNECTIVITY: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        // Surround the palm:
        (Wrist, ThumbCmc),
        (ThumbCmc, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (PinkyMcp, Wrist),
        // Thumb:
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        // Index:
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        // Middle:
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        // Ring:
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        // Pinky:
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};

/// The 21 landmarks of a hand.
///
/// X and Y are in frame pixels, Z is the relative depth output by the network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandLandmarks {
    positions: [Vector3<f32>; NUM_LANDMARKS],
}

impl Default for HandLandmarks {
    fn default() -> Self {
        Self {
            positions: [Vector3::zeros(); NUM_LANDMARKS],
        }
    }
}

impl HandLandmarks {
    pub fn new(positions: [Vector3<f32>; NUM_LANDMARKS]) -> Self {
        Self { positions }
    }

    #[inline]
    pub fn positions(&self) -> &[Vector3<f32>; NUM_LANDMARKS] {
        &self.positions
    }

    #[inline]
    pub fn position(&self, landmark: LandmarkIdx) -> Vector3<f32> {
        self.positions[landmark as usize]
    }

    /// Returns an iterator over the landmarks that surround the palm.
    pub fn palm_landmarks(&self) -> impl Iterator<Item = Vector3<f32>> + '_ {
        PALM_LANDMARKS.iter().map(|&lm| self.position(lm))
    }

    /// Computes the center position of the hand's palm by averaging some of the landmarks.
    pub fn palm_center(&self) -> Vector3<f32> {
        self.palm_landmarks().sum::<Vector3<f32>>() / PALM_LANDMARKS.len() as f32
    }

    /// Computes the clockwise rotation of the palm compared to an upright position.
    ///
    /// A rotation of 0° means that fingers are pointed upwards.
    pub fn rotation_radians(&self) -> f32 {
        let finger = self.position(LandmarkIdx::MiddleFingerMcp).xy();
        let wrist = self.position(LandmarkIdx::Wrist).xy();

        let rel = wrist - finger;
        Rotation2::rotation_between(&Vector2::y(), &rel).angle()
    }
}

impl Average for HandLandmarks {
    fn accumulate(&mut self, other: &Self) {
        self.positions.accumulate(&other.positions);
    }

    fn divide(&mut self, divisor: f32) {
        self.positions.divide(divisor);
    }
}

/// Decodes the output of the hand landmark network.
#[derive(Debug, Clone)]
pub struct LandmarkDecoder {
    presence_threshold: f32,
}

impl LandmarkDecoder {
    /// Default hand presence flag value at or above which the landmarks are used.
    pub const DEFAULT_PRESENCE_THRESHOLD: f32 = 0.1;

    pub fn new() -> Self {
        Self {
            presence_threshold: Self::DEFAULT_PRESENCE_THRESHOLD,
        }
    }

    /// Sets the minimum hand presence flag value.
    ///
    /// By default, [`Self::DEFAULT_PRESENCE_THRESHOLD`] is used.
    pub fn set_presence_threshold(&mut self, threshold: f32) {
        self.presence_threshold = threshold;
    }

    #[inline]
    pub fn presence_threshold(&self) -> f32 {
        self.presence_threshold
    }

    /// Decodes one network invocation.
    ///
    /// `raw` holds X/Y/Z triples in pixels of the network input (of resolution `input`), `presence`
    /// is the network's hand presence flag. The landmarks are mapped out of the crop described by
    /// `roi` and written to `landmarks`, and `true` is returned.
    ///
    /// If the presence flag is below the threshold, `landmarks` is left untouched and `false` is
    /// returned.
    ///
    /// # Panics
    ///
    /// Panics if `raw` does not contain exactly [`NUM_LANDMARKS`] triples.
    pub fn decode(
        &self,
        raw: &[f32],
        presence: f32,
        roi: &HandRoi,
        input: Resolution,
        landmarks: &mut HandLandmarks,
    ) -> bool {
        assert_eq!(raw.len(), NUM_LANDMARKS * 3, "wrong landmark count");

        if !(presence >= self.presence_threshold) {
            return false;
        }

        let inv_w = 1.0 / input.width() as f32;
        let inv_h = 1.0 / input.height() as f32;
        let size = roi.size();
        let center = roi.center();
        let (sin, cos) = roi.angle().sin_cos();

        for (xyz, out) in raw.chunks_exact(3).zip(&mut landmarks.positions) {
            let half_x = size.x * (xyz[0] * inv_w - 0.5);
            let half_y = size.y * (xyz[1] * inv_h - 0.5);
            *out = Vector3::new(
                center.x + (half_x * cos - half_y * sin),
                center.y + (half_x * sin + half_y * cos),
                xyz[2],
            );
        }

        true
    }
}

impl Default for LandmarkDecoder {
    fn default() -> Self {
        Self::new()
    }
}
