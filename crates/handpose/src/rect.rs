//! Rectangle types.

use std::fmt;

use nalgebra::{Rotation2, Vector2};

use crate::filter::Average;

/// An axis-aligned rectangle, stored as its top-left corner and size.
///
/// Rectangles are allowed to have zero height and/or width.
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Rect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl Rect {
    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self {
            x: top_left_x,
            y: top_left_y,
            width,
            height,
        }
    }

    /// Creates a rectangle extending outwards from a center point.
    ///
    /// The corners are computed first, so the result is exactly what a detector produces when it
    /// converts a center/size pair into a min/max box.
    #[inline]
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        let (x_min, y_min) = (x_center - width * 0.5, y_center - height * 0.5);
        let (x_max, y_max) = (x_center + width * 0.5, y_center + height * 0.5);
        Self::from_top_left(x_min, y_min, x_max - x_min, y_max - y_min)
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    #[inline]
    pub fn center(&self) -> Vector2<f32> {
        Vector2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    fn intersection_area(&self, other: &Self) -> f32 {
        let min_x = f32::max(self.x, other.x);
        let max_x = f32::min(self.x + self.width, other.x + other.width);
        let min_y = f32::max(self.y, other.y);
        let max_y = f32::min(self.y + self.height, other.y + other.height);
        if min_x > max_x || min_y > max_y {
            return 0.0;
        }

        (max_x - min_x) * (max_y - min_y)
    }

    /// Computes the Intersection over Union (IOU) of `self` and `other`.
    ///
    /// Degenerate pairs whose union has zero area have an IOU of 0.0 rather than NaN.
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union == 0.0 {
            return 0.0;
        }

        intersection / union
    }
}

impl Average for Rect {
    fn accumulate(&mut self, other: &Self) {
        self.x += other.x;
        self.y += other.y;
        self.width += other.width;
        self.height += other.height;
    }

    fn divide(&mut self, divisor: f32) {
        self.x /= divisor;
        self.y /= divisor;
        self.width /= divisor;
        self.height /= divisor;
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// A rectangle rotated around its center.
///
/// Rotations are in radians and follow the image coordinate system (Y pointing down), so positive
/// angles rotate clockwise on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    center: Vector2<f32>,
    size: Vector2<f32>,
    radians: f32,
}

impl RotatedRect {
    #[inline]
    pub fn new(center: Vector2<f32>, size: Vector2<f32>, radians: f32) -> Self {
        Self {
            center,
            size,
            radians,
        }
    }

    #[inline]
    pub fn center(&self) -> Vector2<f32> {
        self.center
    }

    /// Returns the width and height of the rectangle before rotation.
    #[inline]
    pub fn size(&self) -> Vector2<f32> {
        self.size
    }

    #[inline]
    pub fn rotation_radians(&self) -> f32 {
        self.radians
    }

    #[inline]
    pub fn rotation_degrees(&self) -> f32 {
        self.radians.to_degrees()
    }

    /// Maps a point from the rectangle's local coordinate system to the outer one.
    ///
    /// The local coordinate system is centered on the rectangle and rotated along with it.
    pub fn transform_out(&self, local: Vector2<f32>) -> Vector2<f32> {
        self.center + Rotation2::new(self.radians) * local
    }

    /// Returns the rotated corners, starting at the (unrotated) top-left corner and going clockwise.
    pub fn rotated_corners(&self) -> [Vector2<f32>; 4] {
        let [hw, hh] = [self.size.x * 0.5, self.size.y * 0.5];
        [
            Vector2::new(-hw, -hh),
            Vector2::new(hw, -hh),
            Vector2::new(hw, hh),
            Vector2::new(-hw, hh),
        ]
        .map(|corner| self.transform_out(corner))
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn iou() {
        let a = Rect::from_top_left(0.0, 0.0, 2.0, 2.0);
        assert_eq!(a.iou(&a), 1.0);

        let b = Rect::from_top_left(1.0, 0.0, 2.0, 2.0);
        assert_relative_eq!(a.iou(&b), 2.0 / 6.0);

        let far = Rect::from_top_left(5.0, 5.0, 1.0, 1.0);
        assert_eq!(a.iou(&far), 0.0);
    }

    #[test]
    fn iou_degenerate() {
        let point = Rect::from_top_left(1.0, 1.0, 0.0, 0.0);
        assert_eq!(point.iou(&point), 0.0);
        assert_eq!(Rect::default().iou(&Rect::default()), 0.0);
    }

    #[test]
    fn from_center() {
        let rect = Rect::from_center(0.5, 0.5, 0.25, 0.5);
        assert_eq!(rect.x(), 0.375);
        assert_eq!(rect.y(), 0.25);
        assert_eq!(rect.width(), 0.25);
        assert_eq!(rect.height(), 0.5);
        assert_eq!(rect.center(), Vector2::new(0.5, 0.5));
    }

    #[test]
    fn rotated_corners() {
        let rect = RotatedRect::new(Vector2::new(10.0, 20.0), Vector2::new(4.0, 2.0), 0.0);
        assert_eq!(
            rect.rotated_corners(),
            [
                Vector2::new(8.0, 19.0),
                Vector2::new(12.0, 19.0),
                Vector2::new(12.0, 21.0),
                Vector2::new(8.0, 21.0),
            ]
        );

        // A quarter turn moves the top-left corner to the top-right (in image coordinates).
        let rect = RotatedRect::new(Vector2::new(0.0, 0.0), Vector2::new(4.0, 2.0), FRAC_PI_2);
        let [tl, ..] = rect.rotated_corners();
        assert_relative_eq!(tl, Vector2::new(1.0, -2.0), epsilon = 1e-6);
    }
}
