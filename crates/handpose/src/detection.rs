//! Common functionality for single-shot object detection.
//!
//! Detector networks produce one candidate per anchor. Candidates whose confidence passes a
//! threshold are collected as [`Detection`]s and then merged into a single estimate with
//! [`WeightedCentroid`].

pub mod ssd;

use nalgebra::Vector2;

use crate::rect::Rect;

/// A detection candidate decoded from a single anchor, with `K` keypoints.
///
/// Coordinates are normalized to the network input (0.0 to 1.0).
#[derive(Debug, Clone, PartialEq)]
pub struct Detection<const K: usize> {
    confidence: f32,
    rect: Rect,
    keypoints: [Vector2<f32>; K],
}

impl<const K: usize> Detection<K> {
    pub fn new(confidence: f32, rect: Rect, keypoints: [Vector2<f32>; K]) -> Self {
        Self {
            confidence,
            rect,
            keypoints,
        }
    }

    /// Returns the detection's confidence score (0.0 to 1.0).
    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    #[inline]
    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }

    #[inline]
    pub fn keypoints(&self) -> &[Vector2<f32>; K] {
        &self.keypoints
    }
}

/// Merges overlapping detection candidates into one confidence-weighted estimate.
///
/// The candidate with the highest confidence is used as the reference. Every candidate whose
/// overlap with the reference (intersection over union) reaches the similarity threshold
/// contributes its box and keypoints, weighted by its confidence. Other candidates are ignored.
///
/// Only a single object is produced. Use this when the scene is known to contain at most one
/// object of interest.
#[derive(Debug, Clone)]
pub struct WeightedCentroid {
    min_similarity: f32,
}

impl WeightedCentroid {
    /// Default overlap a candidate needs with the reference to be averaged in.
    pub const DEFAULT_MIN_SIMILARITY: f32 = 0.3;

    pub fn new() -> Self {
        Self {
            min_similarity: Self::DEFAULT_MIN_SIMILARITY,
        }
    }

    /// Sets the intersection-over-union threshold at which a candidate is considered to belong to
    /// the reference detection.
    ///
    /// By default, [`Self::DEFAULT_MIN_SIMILARITY`] is used.
    pub fn set_min_similarity(&mut self, min_similarity: f32) {
        self.min_similarity = min_similarity;
    }

    #[inline]
    pub fn min_similarity(&self) -> f32 {
        self.min_similarity
    }

    /// Selects the reference candidate: the one with the highest confidence.
    ///
    /// Among candidates with equal confidence, the last one wins.
    pub fn reference<'a, const K: usize>(
        &self,
        candidates: &'a [Detection<K>],
    ) -> Option<&'a Detection<K>> {
        let mut best: Option<&Detection<K>> = None;
        for candidate in candidates {
            match best {
                Some(b) if candidate.confidence < b.confidence => {}
                _ => best = Some(candidate),
            }
        }
        best
    }

    /// Computes the weighted average of all candidates overlapping the reference.
    ///
    /// The returned detection carries the reference's confidence. Returns [`None`] if there are
    /// no candidates, or if the contributing candidates have a total confidence of 0.0.
    pub fn aggregate<const K: usize>(&self, candidates: &[Detection<K>]) -> Option<Detection<K>> {
        let reference = self.reference(candidates)?;
        let reference_rect = reference.bounding_rect();

        let mut total_score = 0.0;
        let [mut acc_x, mut acc_y, mut acc_w, mut acc_h] = [0.0f32; 4];
        let mut acc_keypoints = [Vector2::zeros(); K];
        for det in candidates {
            let rect = det.bounding_rect();
            if reference_rect.iou(&rect) < self.min_similarity {
                continue;
            }

            let score = det.confidence;
            total_score += score;
            acc_x += rect.x() * score;
            acc_y += rect.y() * score;
            acc_w += rect.width() * score;
            acc_h += rect.height() * score;
            for (acc, kp) in acc_keypoints.iter_mut().zip(&det.keypoints) {
                *acc += kp * score;
            }
        }

        if total_score == 0.0 {
            return None;
        }

        let inv_total = 1.0 / total_score;
        Some(Detection {
            confidence: reference.confidence,
            rect: Rect::from_top_left(
                acc_x * inv_total,
                acc_y * inv_total,
                acc_w * inv_total,
                acc_h * inv_total,
            ),
            keypoints: acc_keypoints.map(|kp| kp * inv_total),
        })
    }
}

impl Default for WeightedCentroid {
    fn default() -> Self {
        Self::new()
    }
}
