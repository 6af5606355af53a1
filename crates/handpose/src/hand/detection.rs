//! Palm detection output decoding.

use itertools::izip;
use nalgebra::Vector2;

use crate::{
    detection::{
        ssd::{Anchors, DetectorLayout, PALM_DETECTOR},
        Detection, WeightedCentroid,
    },
    filter::Average,
    num::sigmoid,
    rect::Rect,
};

/// Number of keypoints the palm detector predicts.
pub const NUM_KEYPOINTS: usize = PALM_DETECTOR.num_keypoints;

/// A keypoint of a [`PalmDetection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

/// A list of all [`Keypoint`]s.
pub const ALL_KEYPOINTS: &[Keypoint] = &[
    Keypoint::Wrist,
    Keypoint::IndexFingerMcp,
    Keypoint::MiddleFingerMcp,
    Keypoint::RingFingerMcp,
    Keypoint::PinkyMcp,
    Keypoint::ThumbCmc,
    Keypoint::ThumbMcp,
];

/// A palm bounding box and its keypoints, normalized to the palm detector's input (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalmDetection {
    rect: Rect,
    keypoints: [Vector2<f32>; NUM_KEYPOINTS],
}

impl PalmDetection {
    pub fn new(rect: Rect, keypoints: [Vector2<f32>; NUM_KEYPOINTS]) -> Self {
        Self { rect, keypoints }
    }

    /// Returns the palm's bounding box.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    #[inline]
    pub fn keypoints(&self) -> &[Vector2<f32>; NUM_KEYPOINTS] {
        &self.keypoints
    }

    #[inline]
    pub fn keypoint(&self, keypoint: Keypoint) -> Vector2<f32> {
        self.keypoints[keypoint as usize]
    }
}

impl Default for PalmDetection {
    fn default() -> Self {
        Self::new(Rect::default(), [Vector2::zeros(); NUM_KEYPOINTS])
    }
}

impl Average for PalmDetection {
    fn accumulate(&mut self, other: &Self) {
        self.rect.accumulate(&other.rect);
        self.keypoints.accumulate(&other.keypoints);
    }

    fn divide(&mut self, divisor: f32) {
        self.rect.divide(divisor);
        self.keypoints.divide(divisor);
    }
}

/// Decodes the raw output of the palm detection network into a single [`PalmDetection`].
///
/// Each anchor yields a candidate if its (clipped) score passes the confidence threshold. The
/// candidates are merged by a [`WeightedCentroid`] around the most confident one.
pub struct PalmDecoder {
    layout: DetectorLayout,
    score_threshold: f32,
    centroid: WeightedCentroid,
    candidates: Vec<Detection<NUM_KEYPOINTS>>,
}

impl PalmDecoder {
    /// Default confidence a candidate needs to be considered.
    pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.7;

    /// Raw scores are clamped to `-SCORE_CLIPPING..=SCORE_CLIPPING` before applying the sigmoid.
    pub const SCORE_CLIPPING: f32 = 100.0;

    /// Raw box and keypoint offsets are in units of `1 / COORD_SCALE` of the network input.
    pub const COORD_SCALE: f32 = 256.0;

    pub fn new() -> Self {
        Self {
            layout: PALM_DETECTOR,
            score_threshold: Self::DEFAULT_SCORE_THRESHOLD,
            centroid: WeightedCentroid::new(),
            candidates: Vec::new(),
        }
    }

    /// Sets the minimum confidence (after the sigmoid) a candidate needs.
    ///
    /// By default, [`Self::DEFAULT_SCORE_THRESHOLD`] is used.
    pub fn set_score_threshold(&mut self, threshold: f32) {
        self.score_threshold = threshold;
    }

    /// Sets the overlap a candidate needs with the most confident one to be merged into it.
    ///
    /// By default, [`WeightedCentroid::DEFAULT_MIN_SIMILARITY`] is used.
    pub fn set_min_similarity(&mut self, min_similarity: f32) {
        self.centroid.set_min_similarity(min_similarity);
    }

    #[inline]
    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }

    /// Returns the layout of the network outputs this decoder expects.
    #[inline]
    pub fn layout(&self) -> &DetectorLayout {
        &self.layout
    }

    /// Decodes one network invocation.
    ///
    /// `scores` holds one raw score per anchor, `boxes` holds
    /// [`DetectorLayout::coords_per_box`] values per anchor. If a palm was found, `palm` is
    /// overwritten and `true` is returned. Otherwise, `palm` is left untouched and `false` is
    /// returned.
    ///
    /// # Panics
    ///
    /// Panics if the lengths of `scores` or `boxes` don't match the anchor count.
    pub fn decode(
        &mut self,
        scores: &[f32],
        boxes: &[f32],
        anchors: &Anchors,
        palm: &mut PalmDetection,
    ) -> bool {
        let coords = self.layout.coords_per_box();
        let num_anchors = anchors.anchor_count();
        assert_eq!(scores.len(), num_anchors, "score count doesn't match anchors");
        assert_eq!(boxes.len(), num_anchors * coords, "box count doesn't match anchors");

        self.candidates.clear();
        for (&raw_score, raw, anchor) in izip!(scores, boxes.chunks_exact(coords), anchors.iter())
        {
            let score = sigmoid(raw_score.clamp(-Self::SCORE_CLIPPING, Self::SCORE_CLIPPING));
            // written this way so that NaN scores are discarded
            if !(score >= self.score_threshold) {
                continue;
            }

            let decode_x = |v: f32| v / Self::COORD_SCALE * anchor.w_scale();
            let decode_y = |v: f32| v / Self::COORD_SCALE * anchor.h_scale();

            let rect = Rect::from_center(
                decode_x(raw[0]) + anchor.x_center(),
                decode_y(raw[1]) + anchor.y_center(),
                decode_x(raw[2]),
                decode_y(raw[3]),
            );
            let keypoints = std::array::from_fn(|i| {
                let offset = DetectorLayout::BOX_COORDS + i * 2;
                Vector2::new(
                    decode_x(raw[offset]) + anchor.x_center(),
                    decode_y(raw[offset + 1]) + anchor.y_center(),
                )
            });

            self.candidates.push(Detection::new(score, rect, keypoints));
        }

        match self.centroid.aggregate(&self.candidates) {
            Some(merged) => {
                log::trace!(
                    "palm: {} candidates, best confidence {}, {:?}",
                    self.candidates.len(),
                    merged.confidence(),
                    merged.bounding_rect(),
                );
                *palm = PalmDetection::new(merged.bounding_rect(), *merged.keypoints());
                true
            }
            None => false,
        }
    }
}

impl Default for PalmDecoder {
    fn default() -> Self {
        Self::new()
    }
}
