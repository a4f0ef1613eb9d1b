//! Multi-image reader front end.
//!
//! [`WebPReader`] exposes the contract generic image readers expect: a frame
//! count, per-index dimensions and images, and an explicit dispose. The input
//! is opened lazily on the first call that needs it.

use crate::codec::NativeCodec;
use crate::frame::CompositedFrame;
use crate::frame_cache::FrameCache;
use crate::libwebp::LibWebP;
use crate::{Error, Result};
use log::debug;

/// Stream-level values a host framework may display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamMetadata {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub loop_count: u32,
    pub frame_count: u32,
}

/// Per-frame timing values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub delay_ms: i32,
    pub timestamp_ms: i32,
}

/// Reader over one compressed input at a time
pub struct WebPReader<C: NativeCodec + Clone> {
    codec: C,
    input: Option<Vec<u8>>,
    cache: Option<FrameCache<C>>,
}

impl WebPReader<&'static LibWebP> {
    /// Creates a reader backed by the process-wide libwebp
    pub fn with_libwebp() -> Result<Self> {
        Ok(Self::new(LibWebP::global()?))
    }
}

impl<C: NativeCodec + Clone> WebPReader<C> {
    /// Creates a reader with no input
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            input: None,
            cache: None,
        }
    }

    /// Replaces the input, closing any open session and dropping decoded frames
    pub fn set_input(&mut self, bytes: impl Into<Vec<u8>>) {
        self.reset();
        self.input = Some(bytes.into());
    }

    /// Whether an input is set
    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Number of frames.
    ///
    /// `None` unless the count is already known or `allow_search` permits
    /// decoding every remaining frame to find it.
    pub fn image_count(&mut self, allow_search: bool) -> Result<Option<usize>> {
        self.cache()?.frame_count(allow_search)
    }

    /// Width of frame `index`
    pub fn width(&mut self, index: usize) -> Result<u32> {
        self.cache()?.width(index)
    }

    /// Height of frame `index`
    pub fn height(&mut self, index: usize) -> Result<u32> {
        self.cache()?.height(index)
    }

    /// Composited frame `index`
    pub fn read(&mut self, index: usize) -> Result<&CompositedFrame> {
        self.cache()?.frame(index)
    }

    /// Canvas size, loop count and declared frame count
    pub fn stream_metadata(&mut self) -> Result<StreamMetadata> {
        let info = self.cache()?.info()?;
        Ok(StreamMetadata {
            canvas_width: info.canvas_width,
            canvas_height: info.canvas_height,
            loop_count: info.loop_count,
            frame_count: info.frame_count,
        })
    }

    /// Delay and timestamp of frame `index`
    pub fn image_metadata(&mut self, index: usize) -> Result<ImageMetadata> {
        let frame = self.read(index)?;
        Ok(ImageMetadata {
            delay_ms: frame.delay_ms(),
            timestamp_ms: frame.timestamp_ms(),
        })
    }

    /// Releases the native session and forgets the input
    pub fn dispose(&mut self) {
        self.reset();
        self.input = None;
    }

    fn reset(&mut self) {
        if let Some(mut cache) = self.cache.take() {
            debug!("releasing reader session after {} frames", cache.decoded_len());
            cache.close();
        }
    }

    fn cache(&mut self) -> Result<&mut FrameCache<C>> {
        if self.cache.is_none() {
            let input = self
                .input
                .as_deref()
                .ok_or(Error::IllegalState("no input set"))?;
            self.cache = Some(FrameCache::open(self.codec.clone(), input)?);
        }
        self.cache
            .as_mut()
            .ok_or(Error::IllegalState("no input set"))
    }
}
