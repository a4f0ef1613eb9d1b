//! Decoded frame values

use crate::{Error, Result};
use image::RgbaImage;
use std::path::Path;
use webpanim_core::{pixel, FrameTiming};

/// One canvas as pulled from the native decoder, copied into owned memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Packed RGBA pixels, one per canvas pixel, row-major
    pub pixels: Vec<u32>,
    /// Cumulative timestamp in milliseconds
    pub timestamp_ms: i32,
}

/// A fully composited canvas with its timing. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositedFrame {
    image: RgbaImage,
    timing: FrameTiming,
}

impl CompositedFrame {
    /// Wraps a raw frame into a `width` x `height` image.
    ///
    /// The packed pixels are unpacked once, straight into the image buffer.
    pub fn new(raw: RawFrame, width: u32, height: u32, timing: FrameTiming) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| Error::DecodeFailure(format!("canvas {width}x{height} too large")))?;
        if raw.pixels.len() != expected {
            return Err(Error::DecodeFailure(format!(
                "frame has {} pixels, canvas {}x{} needs {}",
                raw.pixels.len(),
                width,
                height,
                expected
            )));
        }
        let image = RgbaImage::from_raw(width, height, pixel::unpack_to_rgba_bytes(&raw.pixels))
            .ok_or_else(|| Error::DecodeFailure("pixel buffer does not fit canvas".into()))?;
        Ok(Self { image, timing })
    }

    /// The canvas image
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Consumes the frame, returning its image
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Timestamp and delay of this frame
    pub fn timing(&self) -> FrameTiming {
        self.timing
    }

    /// Milliseconds from the start of the animation
    pub fn timestamp_ms(&self) -> i32 {
        self.timing.timestamp_ms
    }

    /// How long to show this frame in milliseconds
    pub fn delay_ms(&self) -> i32 {
        self.timing.delay_ms
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Writes the canvas to `path`, format chosen by extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.image.save(path)?;
        Ok(())
    }

    /// Packed RGBA value of one pixel
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        pixel::pack(self.image.get_pixel(x, y).0)
    }
}
