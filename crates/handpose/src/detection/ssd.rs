//! Anchor/Prior generation for Single Shot MultiBox Detectors (SSDs).
//!
//! Note that the implementation in this module is extremely limited and is only meant to work for
//! networks like the palm detector: every anchor has a fixed scale of 1.0, and the anchor center is
//! always placed in the middle of its feature map cell.

use std::ops::Index;

use crate::image::Resolution;

/// Static description of an SSD network's output layout.
///
/// The stride schedule determines the anchor table, the remaining fields determine how the
/// network's regressor output is laid out. Both have to agree with the network, so they are kept
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorLayout {
    /// Stride of each output layer, in input pixels.
    pub strides: &'static [u32],
    /// Number of anchors per feature map cell. Must be non-zero.
    pub anchors_per_cell: u32,
    /// Number of 2D keypoints predicted for each box.
    pub num_keypoints: usize,
    /// Number of boxes the network outputs for its native input resolution.
    pub num_boxes: usize,
}

/// Output layout of the palm detection network at its native 256x256 input resolution.
pub const PALM_DETECTOR: DetectorLayout = DetectorLayout {
    strides: &[8, 16, 32, 32, 32],
    anchors_per_cell: 2,
    num_keypoints: 7,
    num_boxes: 2944,
};

impl DetectorLayout {
    /// Number of box coordinates (center X/Y and size) preceding the keypoints.
    pub const BOX_COORDS: usize = 4;

    /// Returns the number of regressor values per box (box coordinates, then X/Y per keypoint).
    pub const fn coords_per_box(&self) -> usize {
        Self::BOX_COORDS + 2 * self.num_keypoints
    }

    /// Computes the number of anchors generated for an input of resolution `input`.
    pub fn anchor_count(&self, input: Resolution) -> usize {
        self.strides
            .iter()
            .map(|&stride| {
                let (w, h) = feature_map_size(input, stride);
                (w * h * self.anchors_per_cell) as usize
            })
            .sum()
    }
}

fn feature_map_size(input: Resolution, stride: u32) -> (u32, u32) {
    assert_ne!(stride, 0, "SSD layer stride must be non-zero");
    let ceil_div = |dim: u32| (dim + stride - 1) / stride;
    (ceil_div(input.width()), ceil_div(input.height()))
}

/// An anchor of an SSD network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    // values range from 0 to 1
    x_center: f32,
    y_center: f32,
    w_scale: f32,
    h_scale: f32,
}

impl Anchor {
    pub fn x_center(&self) -> f32 {
        self.x_center
    }

    pub fn y_center(&self) -> f32 {
        self.y_center
    }

    /// Returns the factor by which decoded box widths and X offsets are scaled.
    pub fn w_scale(&self) -> f32 {
        self.w_scale
    }

    /// Returns the factor by which decoded box heights and Y offsets are scaled.
    pub fn h_scale(&self) -> f32 {
        self.h_scale
    }
}

/// The anchor table of an SSD network.
///
/// Anchors are ordered by layer (in stride schedule order), then by feature map row and column,
/// with all anchors of a cell next to each other. Networks output their boxes in this exact order.
#[derive(Debug, Clone)]
pub struct Anchors {
    anchors: Vec<Anchor>,
}

impl Anchors {
    /// Computes the anchor table of a network with the given `layout`, running on inputs of
    /// resolution `input`.
    pub fn calculate(layout: &DetectorLayout, input: Resolution) -> Self {
        assert_ne!(layout.anchors_per_cell, 0);

        let mut anchors = Vec::with_capacity(layout.anchor_count(input));
        for &stride in layout.strides {
            let (width, height) = feature_map_size(input, stride);

            for y in 0..height {
                let y_center = (y as f32 + 0.5) / height as f32;
                for x in 0..width {
                    let x_center = (x as f32 + 0.5) / width as f32;
                    for _ in 0..layout.anchors_per_cell {
                        anchors.push(Anchor {
                            x_center,
                            y_center,
                            w_scale: 1.0,
                            h_scale: 1.0,
                        });
                    }
                }
            }
        }

        Self { anchors }
    }

    /// Returns the total number of SSD anchors/priors.
    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Anchor> {
        self.anchors.iter()
    }
}

impl Index<usize> for Anchors {
    type Output = Anchor;

    fn index(&self, index: usize) -> &Anchor {
        &self.anchors[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palm_anchor_count() {
        let anchors = Anchors::calculate(&PALM_DETECTOR, Resolution::NETWORK_INPUT);
        // 2 * (32² + 16² + 3 * 8²)
        assert_eq!(anchors.anchor_count(), 2944);
        assert_eq!(anchors.anchor_count(), PALM_DETECTOR.num_boxes);
        assert_eq!(
            PALM_DETECTOR.anchor_count(Resolution::NETWORK_INPUT),
            PALM_DETECTOR.num_boxes
        );
        assert_eq!(PALM_DETECTOR.coords_per_box(), 18);
    }

    #[test]
    fn anchor_order() {
        let anchors = Anchors::calculate(&PALM_DETECTOR, Resolution::NETWORK_INPUT);

        // Two anchors per cell, sharing a center.
        assert_eq!(anchors[0], anchors[1]);
        assert_eq!(anchors[0].x_center(), 0.5 / 32.0);
        assert_eq!(anchors[0].y_center(), 0.5 / 32.0);
        assert_eq!(anchors[0].w_scale(), 1.0);
        assert_eq!(anchors[0].h_scale(), 1.0);

        // Row-major: the next cell is to the right.
        assert_eq!(anchors[2].x_center(), 1.5 / 32.0);
        assert_eq!(anchors[2].y_center(), 0.5 / 32.0);
        // Second row starts after 32 cells.
        assert_eq!(anchors[64].x_center(), 0.5 / 32.0);
        assert_eq!(anchors[64].y_center(), 1.5 / 32.0);

        // The second layer (stride 16) starts after 2 * 32 * 32 anchors.
        assert_eq!(anchors[2047].x_center(), 31.5 / 32.0);
        assert_eq!(anchors[2048].x_center(), 0.5 / 16.0);
        assert_eq!(anchors[2048].y_center(), 0.5 / 16.0);

        // The last three layers are identical.
        let last = anchors.anchor_count() - 1;
        assert_eq!(anchors[last].x_center(), 7.5 / 8.0);
        assert_eq!(anchors[last].y_center(), 7.5 / 8.0);
        assert_eq!(anchors[last - 128], anchors[last]);
    }

    #[test]
    fn deterministic() {
        let a = Anchors::calculate(&PALM_DETECTOR, Resolution::NETWORK_INPUT);
        let b = Anchors::calculate(&PALM_DETECTOR, Resolution::NETWORK_INPUT);
        assert!(a.iter().eq(b.iter()));
    }

    #[test]
    fn non_square_input() {
        let input = Resolution::new(100, 40);
        let layout = DetectorLayout {
            strides: &[16],
            anchors_per_cell: 1,
            num_keypoints: 0,
            num_boxes: 0,
        };
        let anchors = Anchors::calculate(&layout, input);
        // ceil(100 / 16) = 7 columns, ceil(40 / 16) = 3 rows
        assert_eq!(anchors.anchor_count(), 21);
        assert_eq!(layout.anchor_count(input), 21);
        assert_eq!(anchors[6].x_center(), 6.5 / 7.0);
        assert_eq!(anchors[6].y_center(), 0.5 / 3.0);
        assert_eq!(anchors[7].x_center(), 0.5 / 7.0);
        assert_eq!(anchors[7].y_center(), 1.5 / 3.0);
    }
}
