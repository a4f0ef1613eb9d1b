//! Whole-image decoding.
//!
//! Convenience entry points that decode every frame up front, for callers
//! that do not need random access.

use crate::codec::NativeCodec;
use crate::frame::CompositedFrame;
use crate::frame_cache::FrameCache;
use crate::libwebp::LibWebP;
use crate::Result;
use std::fmt;
use std::io::Read;
use std::path::Path;
use webpanim_core::container;

/// A fully decoded image: every frame plus the canvas-wide values
#[derive(Debug, Clone)]
pub struct WebPImage {
    /// Frames in display order (one for a still image)
    pub frames: Vec<CompositedFrame>,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Number of times to play the animation (0 = forever)
    pub loop_count: u32,
    pub background_color: u32,
    /// Frame count declared by the container
    pub frame_count: u32,
}

impl WebPImage {
    /// Whether the image has more than one frame
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    /// Timestamp of the last frame, i.e. the length of one loop
    pub fn duration_ms(&self) -> i32 {
        self.frames.last().map(|f| f.timestamp_ms()).unwrap_or(0)
    }
}

impl fmt::Display for WebPImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x {} / {} loops / {} frames",
            self.canvas_width, self.canvas_height, self.loop_count, self.frame_count
        )
    }
}

/// Decodes every frame of `bytes` with `codec`
pub fn decode_with<C: NativeCodec>(codec: C, bytes: &[u8]) -> Result<WebPImage> {
    let mut cache = FrameCache::open(codec, bytes)?;
    let info = cache.info()?;
    cache.frame_count(true)?;
    Ok(WebPImage {
        frames: cache.into_frames(),
        canvas_width: info.canvas_width,
        canvas_height: info.canvas_height,
        loop_count: info.loop_count,
        background_color: info.background_color,
        frame_count: info.frame_count,
    })
}

/// Decodes every frame of `bytes` with the process-wide libwebp
pub fn decode(bytes: &[u8]) -> Result<WebPImage> {
    decode_with(LibWebP::global()?, bytes)
}

/// Reads `reader` to the end and decodes it
pub fn decode_reader<R: Read>(mut reader: R) -> Result<WebPImage> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode(&bytes)
}

/// Reads the file at `path` and decodes it
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<WebPImage> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Whether `bytes` look like WebP and libwebp is available.
///
/// Never fails: any error means "cannot decode".
pub fn can_decode(bytes: &[u8]) -> bool {
    container::is_webp(bytes) && LibWebP::global().is_ok()
}
