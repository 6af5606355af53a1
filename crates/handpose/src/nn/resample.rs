//! Conversion of camera frames into network input tensors.
//!
//! A [`Resampler`] cuts a (possibly rotated) crop out of a [`Frame`], scales it to the network's
//! input resolution while preserving its aspect ratio, and maps the 8-bit color values to the
//! floating point range the network expects.

use std::ops::RangeInclusive;

use nalgebra::Vector2;

use crate::image::{Frame, Resolution};
use crate::rect::RotatedRect;

use super::Tensor;

/// Lookup table mapping 8-bit channel values to network input values.
#[derive(Clone)]
pub struct ColorLut {
    table: [f32; 256],
}

impl ColorLut {
    /// Creates a lookup table that uniformly maps `0..=255` to `target_range`.
    ///
    /// Note that this operates on *non-linear* sRGB colors, but maps them linearly to the target
    /// range.
    pub fn linear(target_range: RangeInclusive<f32>) -> Self {
        let start = *target_range.start();
        let end = *target_range.end();
        assert!(end > start);

        let adjust_range = (end - start) / 255.0;
        Self {
            table: std::array::from_fn(|i| i as f32 * adjust_range + start),
        }
    }

    #[inline]
    pub fn map(&self, value: u8) -> f32 {
        self.table[usize::from(value)]
    }
}

/// Letterboxing applied to a crop when it is resampled.
///
/// The crop is scaled uniformly so that it fits into the target resolution, and centered. The
/// remaining border is left at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letterbox {
    pad_x: u32,
    pad_y: u32,
    target: Resolution,
}

impl Letterbox {
    /// Computes the letterbox needed to fit a crop of `crop_size` into `target`.
    ///
    /// Crops without a positive area are stretched over the whole target.
    pub fn new(crop_size: Vector2<f32>, target: Resolution) -> Self {
        let (cw, ch) = (crop_size.x, crop_size.y);
        let (dw, dh) = (target.width() as f32, target.height() as f32);

        let (pad_x, pad_y) = if !(cw > 0.0 && ch > 0.0) {
            (0, 0)
        } else if cw * dh >= ch * dw {
            // Crop is wider than the target, pad top and bottom.
            let content_h = dw * ch / cw;
            (0, ((dh - content_h) * 0.5) as u32)
        } else {
            let content_w = dh * cw / ch;
            (((dw - content_w) * 0.5) as u32, 0)
        };

        Self {
            pad_x,
            pad_y,
            target,
        }
    }

    /// Returns the number of padding columns on the left (and on the right).
    #[inline]
    pub fn pad_x(&self) -> u32 {
        self.pad_x
    }

    /// Returns the number of padding rows on the top (and on the bottom).
    #[inline]
    pub fn pad_y(&self) -> u32 {
        self.pad_y
    }

    /// Returns the size of the non-padded area in target pixels.
    #[inline]
    pub fn content_size(&self) -> Vector2<f32> {
        Vector2::new(
            (self.target.width() - 2 * self.pad_x) as f32,
            (self.target.height() - 2 * self.pad_y) as f32,
        )
    }

    /// Returns the factors converting lengths in target pixels to lengths in source pixels.
    pub fn scale(&self, crop: &RotatedRect) -> Vector2<f32> {
        crop.size().component_div(&self.content_size())
    }

    /// Maps a point in target pixels to the crop-local coordinate system (centered on the crop,
    /// not rotated).
    #[inline]
    fn to_crop_local(&self, crop_size: Vector2<f32>, x: f32, y: f32) -> Vector2<f32> {
        let content = self.content_size();
        let u = (x - self.pad_x as f32) / content.x;
        let v = (y - self.pad_y as f32) / content.y;
        Vector2::new(crop_size.x * u - crop_size.x * 0.5, crop_size.y * v - crop_size.y * 0.5)
    }

    /// Maps a point in target pixels back to the frame pixels it was sampled from.
    ///
    /// Like the crop itself, the result is in the coordinate system of the flipped frame.
    pub fn map_out(&self, crop: &RotatedRect, point: Vector2<f32>) -> Vector2<f32> {
        crop.transform_out(self.to_crop_local(crop.size(), point.x, point.y))
    }
}

/// Samples crops of camera frames into network input tensors.
///
/// Frames are assumed to come from a mirrored front camera, so by default both axes are flipped
/// while sampling. Sampling uses the nearest source pixel (coordinates are truncated). Target
/// pixels whose source position falls outside of the frame are left at zero instead of being
/// clamped to the edge.
#[derive(Clone)]
pub struct Resampler {
    target: Resolution,
    lut: ColorLut,
    flip_x: bool,
    flip_y: bool,
}

impl Resampler {
    /// Creates a resampler producing `[1, height, width, 3]` tensors with values in `-1.0..=1.0`.
    pub fn new(target: Resolution) -> Self {
        Self {
            target,
            lut: ColorLut::linear(-1.0..=1.0),
            flip_x: true,
            flip_y: true,
        }
    }

    /// Sets whether the source frame is flipped horizontally and/or vertically while sampling.
    pub fn set_flip(&mut self, horizontal: bool, vertical: bool) {
        self.flip_x = horizontal;
        self.flip_y = vertical;
    }

    /// Replaces the color lookup table.
    pub fn set_color_lut(&mut self, lut: ColorLut) {
        self.lut = lut;
    }

    #[inline]
    pub fn target_resolution(&self) -> Resolution {
        self.target
    }

    /// Returns the shape of the tensors produced by this resampler (NHWC).
    pub fn tensor_shape(&self) -> [usize; 4] {
        [
            1,
            self.target.height() as usize,
            self.target.width() as usize,
            3,
        ]
    }

    /// Returns the letterbox that will be used when resampling `crop`.
    pub fn letterbox(&self, crop: &RotatedRect) -> Letterbox {
        Letterbox::new(crop.size(), self.target)
    }

    /// Resamples `crop` from `frame` into a newly allocated tensor.
    ///
    /// `crop` is given in pixels of the flipped frame.
    pub fn resample(&self, frame: &Frame<'_>, crop: &RotatedRect) -> Tensor {
        let mut tensor = Tensor::zeros(&self.tensor_shape());
        self.resample_into(frame, crop, &mut tensor);
        tensor
    }

    /// Resamples `crop` from `frame` into an existing tensor.
    ///
    /// # Panics
    ///
    /// Panics if `out` does not have the shape returned by [`Resampler::tensor_shape`].
    pub fn resample_into(&self, frame: &Frame<'_>, crop: &RotatedRect, out: &mut Tensor) {
        assert_eq!(
            out.shape(),
            self.tensor_shape(),
            "resampling target has the wrong shape"
        );
        out.clear();

        let (src_w, src_h) = (frame.width() as i32, frame.height() as i32);
        let (dst_w, dst_h) = (self.target.width(), self.target.height());
        let letterbox = self.letterbox(crop);
        let (pad_x, pad_y) = (letterbox.pad_x(), letterbox.pad_y());
        let center = crop.center();
        let (sin, cos) = crop.rotation_radians().sin_cos();

        let data = out.as_mut_slice();
        for dst_y in pad_y..dst_h - pad_y {
            for dst_x in pad_x..dst_w - pad_x {
                let local = letterbox.to_crop_local(crop.size(), dst_x as f32, dst_y as f32);
                let global_x = (center.x + (local.x * cos - local.y * sin)) as i32;
                let global_y = (center.y + (local.x * sin + local.y * cos)) as i32;

                // Flipping maps the frame onto itself, so bounds can be checked first. `as i32`
                // saturates far outside the frame, and flipping `i32::MIN` would overflow.
                if !(0..src_w).contains(&global_x) || !(0..src_h).contains(&global_y) {
                    continue;
                }
                let src_x = if self.flip_x { (src_w - 1) - global_x } else { global_x };
                let src_y = if self.flip_y { (src_h - 1) - global_y } else { global_y };

                let rgb = frame.pixel(src_x as usize, src_y as usize);
                let start = (dst_y as usize * dst_w as usize + dst_x as usize) * 3;
                for (out, channel) in data[start..start + 3].iter_mut().zip(rgb) {
                    *out = self.lut.map(channel);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use image::{Rgb, RgbImage};

    use super::*;

    fn full_frame(image: &RgbImage) -> RotatedRect {
        let (w, h) = (image.width() as f32, image.height() as f32);
        RotatedRect::new(Vector2::new(w * 0.5, h * 0.5), Vector2::new(w, h), 0.0)
    }

    fn texel(tensor: &Tensor, width: usize, x: usize, y: usize) -> [f32; 3] {
        let start = (y * width + x) * 3;
        let s = tensor.as_slice();
        [s[start], s[start + 1], s[start + 2]]
    }

    #[test]
    fn color_lut() {
        let lut = ColorLut::linear(-1.0..=1.0);
        assert_eq!(lut.map(0), -1.0);
        assert_eq!(lut.map(255), 1.0);

        let lut = ColorLut::linear(1.0..=2.0);
        assert_eq!(lut.map(0), 1.0);
        assert_eq!(lut.map(255), 2.0);
    }

    #[test]
    fn letterbox() {
        let target = Resolution::new(256, 256);
        let lb = Letterbox::new(Vector2::new(640.0, 480.0), target);
        assert_eq!((lb.pad_x(), lb.pad_y()), (0, 32));
        assert_eq!(lb.content_size(), Vector2::new(256.0, 192.0));

        let lb = Letterbox::new(Vector2::new(480.0, 640.0), target);
        assert_eq!((lb.pad_x(), lb.pad_y()), (32, 0));

        let lb = Letterbox::new(Vector2::new(100.0, 100.0), target);
        assert_eq!((lb.pad_x(), lb.pad_y()), (0, 0));

        let lb = Letterbox::new(Vector2::new(0.0, 0.0), target);
        assert_eq!((lb.pad_x(), lb.pad_y()), (0, 0));
    }

    #[test]
    fn solid_color_with_padding() {
        let image = RgbImage::from_pixel(8, 4, Rgb([0, 128, 255]));
        let frame = Frame::from(&image);
        let resampler = Resampler::new(Resolution::new(8, 8));
        let tensor = resampler.resample(&frame, &full_frame(&image));
        assert_eq!(tensor.shape(), &[1, 8, 8, 3]);

        let lut = ColorLut::linear(-1.0..=1.0);
        let expected = [lut.map(0), lut.map(128), lut.map(255)];
        for y in 0..8 {
            for x in 0..8 {
                let padding = y < 2 || y >= 6;
                if padding {
                    assert_eq!(texel(&tensor, 8, x, y), [0.0; 3], "({x},{y})");
                } else {
                    assert_eq!(texel(&tensor, 8, x, y), expected, "({x},{y})");
                }
            }
        }
    }

    #[test]
    fn flips_both_axes() {
        let mut image = RgbImage::new(2, 2);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(1, 0, Rgb([0, 255, 0]));
        image.put_pixel(0, 1, Rgb([0, 0, 255]));
        image.put_pixel(1, 1, Rgb([255, 255, 255]));
        let frame = Frame::from(&image);

        let mut resampler = Resampler::new(Resolution::new(2, 2));
        let tensor = resampler.resample(&frame, &full_frame(&image));
        assert_eq!(texel(&tensor, 2, 0, 0), [1.0, 1.0, 1.0]);
        assert_eq!(texel(&tensor, 2, 1, 1), [1.0, -1.0, -1.0]);

        resampler.set_flip(false, false);
        let tensor = resampler.resample(&frame, &full_frame(&image));
        assert_eq!(texel(&tensor, 2, 0, 0), [1.0, -1.0, -1.0]);
        assert_eq!(texel(&tensor, 2, 1, 0), [-1.0, 1.0, -1.0]);
    }

    #[test]
    fn rotation() {
        // Left half is black, right half white. Without flips, a quarter turn of the crop maps
        // output rows to source columns, right to left.
        let mut image = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        for y in 0..4 {
            for x in 2..4 {
                image.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let frame = Frame::from(&image);
        let mut resampler = Resampler::new(Resolution::new(4, 4));
        resampler.set_flip(false, false);

        let crop = RotatedRect::new(Vector2::new(2.0, 2.0), Vector2::new(4.0, 4.0), FRAC_PI_2);
        let tensor = resampler.resample(&frame, &crop);
        // Row 0 lands on column 4, just outside the frame.
        assert_eq!(texel(&tensor, 4, 1, 0), [0.0; 3]);
        assert_eq!(texel(&tensor, 4, 1, 1), [1.0; 3]);
        assert_eq!(texel(&tensor, 4, 1, 3), [-1.0; 3]);
    }

    #[test]
    fn out_of_bounds_is_skipped() {
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let frame = Frame::from(&image);
        let resampler = Resampler::new(Resolution::new(4, 4));

        let crop = RotatedRect::new(Vector2::new(100.0, 100.0), Vector2::new(4.0, 4.0), 0.3);
        let tensor = resampler.resample(&frame, &crop);
        assert!(tensor.as_slice().iter().all(|&v| v == 0.0));

        // Half of the crop hangs off the right edge: those pixels stay zero, they are not
        // clamped to the edge color.
        let mut resampler = resampler;
        resampler.set_flip(false, false);
        let crop = RotatedRect::new(Vector2::new(4.0, 2.0), Vector2::new(4.0, 4.0), 0.0);
        let tensor = resampler.resample(&frame, &crop);
        for y in 0..4 {
            assert_eq!(texel(&tensor, 4, 0, y), [1.0; 3]);
            assert_eq!(texel(&tensor, 4, 3, y), [0.0; 3]);
        }
    }

    #[test]
    fn far_away_crops_are_empty() {
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let frame = Frame::from(&image);
        let mut resampler = Resampler::new(Resolution::new(4, 4));

        let centers = [
            Vector2::new(-1e10, 2.0),
            Vector2::new(2.0, -1e10),
            Vector2::new(1e10, 1e10),
            Vector2::new(f32::NEG_INFINITY, f32::INFINITY),
        ];
        for flip in [true, false] {
            resampler.set_flip(flip, flip);
            for center in centers {
                let crop = RotatedRect::new(center, Vector2::new(4.0, 4.0), 0.0);
                let tensor = resampler.resample(&frame, &crop);
                assert!(tensor.as_slice().iter().all(|&v| v == 0.0), "{center:?}");
            }
        }
    }

    #[test]
    fn map_out_matches_sampling() {
        let target = Resolution::new(256, 256);
        let crop = RotatedRect::new(
            Vector2::new(320.0, 240.0),
            Vector2::new(640.0, 480.0),
            0.0,
        );
        let lb = Letterbox::new(crop.size(), target);
        assert_eq!(lb.map_out(&crop, Vector2::new(0.0, 32.0)), Vector2::new(0.0, 0.0));
        assert_eq!(
            lb.map_out(&crop, Vector2::new(128.0, 128.0)),
            Vector2::new(320.0, 240.0)
        );
        assert_eq!(lb.scale(&crop), Vector2::new(2.5, 2.5));
    }
}
