//! Region of interest for hand landmark estimation.

use std::f32::consts::FRAC_PI_2;

use nalgebra::Vector2;

use crate::{
    image::Resolution,
    nn::resample::Letterbox,
    num::normalize_radians,
    rect::RotatedRect,
};

use super::detection::{Keypoint, PalmDetection};

/// A rotated, square region around a hand, used to crop the input of the landmark network.
///
/// The region is rotated so that the hand appears upright in the crop: an angle of 0 means that
/// the fingers point up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandRoi {
    rect: RotatedRect,
}

impl HandRoi {
    /// Factor by which the palm's longer side is enlarged to cover the whole hand.
    pub const SCALE: f32 = 2.6;

    /// Shift of the region's center along its own Y axis, relative to the palm height.
    ///
    /// Negative values move the region towards the fingers.
    pub const SHIFT_Y: f32 = -0.5;

    /// Keypoint at the start of the hand's axis.
    pub const START_KEYPOINT: Keypoint = Keypoint::Wrist;

    /// Keypoint at the end of the hand's axis.
    pub const END_KEYPOINT: Keypoint = Keypoint::MiddleFingerMcp;

    #[inline]
    pub fn new(center: Vector2<f32>, size: Vector2<f32>, radians: f32) -> Self {
        Self {
            rect: RotatedRect::new(center, size, radians),
        }
    }

    /// Derives the hand region from a palm detection.
    ///
    /// `palm` is normalized to a network input of resolution `input`, the returned region is in
    /// pixels of that input.
    pub fn derive(palm: &PalmDetection, input: Resolution) -> Self {
        let scale = Vector2::new(input.width() as f32, input.height() as f32);
        let start = palm.keypoint(Self::START_KEYPOINT).component_mul(&scale);
        let end = palm.keypoint(Self::END_KEYPOINT).component_mul(&scale);
        let radians = axis_angle(start, end);

        let rect = palm.rect();
        let w = scale.x * rect.width();
        let h = scale.y * rect.height();
        let mut center = rect.center().component_mul(&scale);

        // Shift along the rotated Y axis.
        let (sin, cos) = radians.sin_cos();
        center.x += -(h * Self::SHIFT_Y * sin);
        center.y += h * Self::SHIFT_Y * cos;

        let side = w.max(h) * Self::SCALE;
        Self::new(center, Vector2::new(side, side), radians)
    }

    /// Maps a region in network input pixels into the frame the input was resampled from.
    ///
    /// `crop` and `letterbox` are the crop and letterbox that were used to produce the network
    /// input.
    pub fn map_to_frame(&self, crop: &RotatedRect, letterbox: &Letterbox) -> Self {
        let center = letterbox.map_out(crop, self.center());
        let size = self.size().component_mul(&letterbox.scale(crop));
        let radians = normalize_radians(self.angle() + crop.rotation_radians());
        Self::new(center, size, radians)
    }

    #[inline]
    pub fn center(&self) -> Vector2<f32> {
        self.rect.center()
    }

    #[inline]
    pub fn size(&self) -> Vector2<f32> {
        self.rect.size()
    }

    /// Returns the clockwise rotation of the region, in radians, in the range `(-π, π]`.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.rect.rotation_radians()
    }

    /// Returns the rotated corners, starting at the top-left corner of the upright region and
    /// going clockwise.
    pub fn corners(&self) -> [Vector2<f32>; 4] {
        self.rect.rotated_corners()
    }

    /// Returns the region as a [`RotatedRect`], for resampling.
    #[inline]
    pub fn rotated_rect(&self) -> RotatedRect {
        self.rect
    }
}

impl Default for HandRoi {
    fn default() -> Self {
        Self::new(Vector2::zeros(), Vector2::zeros(), 0.0)
    }
}

/// Computes the rotation that makes the axis from `start` to `end` point up.
fn axis_angle(start: Vector2<f32>, end: Vector2<f32>) -> f32 {
    let d = end - start;
    if d.x == 0.0 && d.y == 0.0 {
        return FRAC_PI_2;
    }
    // Y points down in image coordinates, hence the negation.
    normalize_radians(FRAC_PI_2 - f32::atan2(-d.y, d.x))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use approx::assert_relative_eq;

    use crate::rect::Rect;

    use super::*;

    fn palm(rect: Rect, wrist: [f32; 2], middle_mcp: [f32; 2]) -> PalmDetection {
        let mut keypoints = [Vector2::zeros(); 7];
        keypoints[Keypoint::Wrist as usize] = wrist.into();
        keypoints[Keypoint::MiddleFingerMcp as usize] = middle_mcp.into();
        PalmDetection::new(rect, keypoints)
    }

    #[test]
    fn upright() {
        let palm = palm(
            Rect::from_top_left(0.25, 0.25, 0.5, 0.25),
            [0.5, 0.75],
            [0.5, 0.25],
        );
        let roi = HandRoi::derive(&palm, Resolution::NETWORK_INPUT);
        assert_eq!(roi.angle(), 0.0);
        // Palm center is at (128, 96), shifted up by half of the 64px palm height.
        assert_eq!(roi.center(), Vector2::new(128.0, 64.0));
        assert_relative_eq!(roi.size(), Vector2::new(332.8, 332.8));

        let [tl, tr, br, bl] = roi.corners();
        assert_relative_eq!(tl, Vector2::new(128.0 - 166.4, 64.0 - 166.4), epsilon = 1e-4);
        assert_relative_eq!(tr, Vector2::new(128.0 + 166.4, 64.0 - 166.4), epsilon = 1e-4);
        assert_relative_eq!(br, Vector2::new(128.0 + 166.4, 64.0 + 166.4), epsilon = 1e-4);
        assert_relative_eq!(bl, Vector2::new(128.0 - 166.4, 64.0 + 166.4), epsilon = 1e-4);
    }

    #[test]
    fn pointing_right() {
        let palm = palm(
            Rect::from_top_left(0.25, 0.25, 0.25, 0.5),
            [0.25, 0.5],
            [0.75, 0.5],
        );
        let roi = HandRoi::derive(&palm, Resolution::NETWORK_INPUT);
        assert_eq!(roi.angle(), FRAC_PI_2);
        // The shift now goes to the right: palm center (96, 128), palm height 128.
        assert_relative_eq!(roi.center(), Vector2::new(96.0 + 64.0, 128.0), epsilon = 1e-4);
        assert_relative_eq!(roi.size(), Vector2::new(332.8, 332.8));
    }

    #[test]
    fn pointing_down() {
        let palm = palm(
            Rect::from_top_left(0.25, 0.25, 0.5, 0.5),
            [0.5, 0.25],
            [0.5, 0.75],
        );
        let roi = HandRoi::derive(&palm, Resolution::NETWORK_INPUT);
        assert_relative_eq!(roi.angle(), PI);
    }

    #[test]
    fn coincident_keypoints() {
        let palm = palm(
            Rect::from_top_left(0.25, 0.25, 0.5, 0.5),
            [0.5, 0.5],
            [0.5, 0.5],
        );
        let roi = HandRoi::derive(&palm, Resolution::NETWORK_INPUT);
        assert_eq!(roi.angle(), FRAC_PI_2);
        assert!(roi.center().iter().all(|v| v.is_finite()));

        let roi = HandRoi::derive(&PalmDetection::default(), Resolution::NETWORK_INPUT);
        assert_eq!(roi.angle(), FRAC_PI_2);
        assert_eq!(roi.size(), Vector2::zeros());
        assert!(roi.center().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn angle_range() {
        let origin = Vector2::new(10.0, 10.0);
        for i in 0..64 {
            let a = i as f32 / 64.0 * std::f32::consts::TAU;
            let angle = axis_angle(origin, origin + Vector2::new(a.cos(), a.sin()) * 5.0);
            assert!(angle > -PI && angle <= PI, "{angle}");
        }
    }

    #[test]
    fn map_to_frame() {
        let roi = HandRoi::new(Vector2::new(100.0, 60.0), Vector2::new(50.0, 50.0), 0.5);

        // Full 256x256 frame: identity.
        let target = Resolution::NETWORK_INPUT;
        let crop = RotatedRect::new(Vector2::new(128.0, 128.0), Vector2::new(256.0, 256.0), 0.0);
        let letterbox = Letterbox::new(crop.size(), target);
        assert_eq!(roi.map_to_frame(&crop, &letterbox), roi);

        // Full 512x512 frame: everything scales by 2.
        let crop = RotatedRect::new(Vector2::new(256.0, 256.0), Vector2::new(512.0, 512.0), 0.0);
        let letterbox = Letterbox::new(crop.size(), target);
        let mapped = roi.map_to_frame(&crop, &letterbox);
        assert_eq!(mapped.center(), Vector2::new(200.0, 120.0));
        assert_eq!(mapped.size(), Vector2::new(100.0, 100.0));
        assert_eq!(mapped.angle(), 0.5);

        // 512x256 frame: letterboxed with 64 rows of padding at the top and bottom.
        let crop = RotatedRect::new(Vector2::new(256.0, 128.0), Vector2::new(512.0, 256.0), 0.0);
        let letterbox = Letterbox::new(crop.size(), target);
        let mapped = roi.map_to_frame(&crop, &letterbox);
        assert_relative_eq!(mapped.center(), Vector2::new(200.0, -8.0));
        assert_relative_eq!(mapped.size(), Vector2::new(100.0, 100.0));
    }
}
