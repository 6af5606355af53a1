//! Input frames.
//!
//! The pipeline consumes plain 8-bit RGB pixel buffers. [`Frame`] borrows such a buffer for the
//! duration of a single tick; it never outlives the call it was passed to.

use std::fmt;

use image::RgbImage;

/// Width and height of an image or network input, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// The input resolution of the palm detection and hand landmark networks.
    pub const NETWORK_INPUT: Self = Self::new(256, 256);

    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the number of pixels covered by this resolution.
    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A borrowed 8-bit RGB image, stored row by row without padding.
#[derive(Clone, Copy)]
pub struct Frame<'a> {
    pixels: &'a [u8],
    resolution: Resolution,
}

impl<'a> Frame<'a> {
    /// Number of bytes per pixel.
    pub const CHANNELS: usize = 3;

    /// Wraps a raw RGB buffer.
    ///
    /// Returns an error if `pixels` does not hold exactly `width * height` RGB pixels, or if the
    /// frame is empty.
    pub fn new(pixels: &'a [u8], width: u32, height: u32) -> anyhow::Result<Self> {
        let resolution = Resolution::new(width, height);
        if resolution.num_pixels() == 0 {
            anyhow::bail!("cannot process empty {} frame", resolution);
        }

        let expected = resolution.num_pixels() * Self::CHANNELS;
        if pixels.len() != expected {
            anyhow::bail!(
                "incorrect buffer size {} for {} RGB frame (expected {} bytes)",
                pixels.len(),
                resolution,
                expected,
            );
        }

        Ok(Self { pixels, resolution })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.resolution.height
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Returns the RGB bytes of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside of the frame.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let width = self.resolution.width as usize;
        assert!(x < width, "x={} out of bounds for {} frame", x, self.resolution);
        assert!(
            y < self.resolution.height as usize,
            "y={} out of bounds for {} frame",
            y,
            self.resolution
        );
        let start = (y * width + x) * Self::CHANNELS;
        [
            self.pixels[start],
            self.pixels[start + 1],
            self.pixels[start + 2],
        ]
    }

    /// Returns the raw pixel data.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.pixels
    }
}

impl<'a> From<&'a RgbImage> for Frame<'a> {
    fn from(image: &'a RgbImage) -> Self {
        Self {
            pixels: image.as_raw(),
            resolution: Resolution::new(image.width(), image.height()),
        }
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}
