//! Global animation information

use crate::{Error, Result};

/// Canvas-wide information about an animated (or still) WebP image.
///
/// Fetched once per decode session, before any frame is decoded. Every frame
/// shares the canvas dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationInfo {
    /// Canvas width in pixels
    pub canvas_width: u32,
    /// Canvas height in pixels
    pub canvas_height: u32,
    /// Number of times to play the animation (0 = forever)
    pub loop_count: u32,
    /// Background color hint as reported by the container
    pub background_color: u32,
    /// Number of frames declared by the container
    pub frame_count: u32,
}

impl AnimationInfo {
    /// Creates a new animation info, rejecting an empty or unaddressable canvas
    pub fn new(
        canvas_width: u32,
        canvas_height: u32,
        loop_count: u32,
        background_color: u32,
        frame_count: u32,
    ) -> Result<Self> {
        let info = Self {
            canvas_width,
            canvas_height,
            loop_count,
            background_color,
            frame_count,
        };
        info.validate()?;
        Ok(info)
    }

    /// Checks that both canvas dimensions are non-zero and that one RGBA
    /// canvas fits in memory
    pub fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(Error::InvalidCanvas {
                width: self.canvas_width,
                height: self.canvas_height,
            });
        }
        if self.canvas_bytes().is_none() {
            return Err(Error::CanvasTooLarge {
                width: self.canvas_width,
                height: self.canvas_height,
            });
        }
        Ok(())
    }

    /// Number of pixels on the canvas, `None` on overflow
    pub fn pixel_count(&self) -> Option<usize> {
        (self.canvas_width as usize).checked_mul(self.canvas_height as usize)
    }

    /// Size in bytes of one RGBA canvas, `None` on overflow
    pub fn canvas_bytes(&self) -> Option<usize> {
        self.pixel_count()?.checked_mul(4)
    }

    /// Whether the animation loops forever
    pub fn loops_forever(&self) -> bool {
        self.loop_count == 0
    }
}
