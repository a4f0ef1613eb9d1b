//! Random-access frame cache over a sequential session.
//!
//! The native decoder can only move forward, so the cache keeps every frame
//! it has pulled. Asking for frame `N` decodes forward until `N` is reached;
//! asking again, or for any earlier frame, is served from memory.
//!
//! Memory grows with the highest index ever requested and is never trimmed:
//! a frame that was evicted could not be decoded again without reopening the
//! input.

use crate::codec::NativeCodec;
use crate::frame::CompositedFrame;
use crate::session::{AnimationSession, SessionState};
use crate::{Error, Result};
use webpanim_core::{AnimationInfo, FrameClock};

/// Append-only memo of composited frames in front of an [`AnimationSession`]
pub struct FrameCache<C: NativeCodec> {
    session: AnimationSession<C>,
    info: Option<AnimationInfo>,
    frames: Vec<CompositedFrame>,
    clock: FrameClock,
    exhausted: bool,
}

impl<C: NativeCodec> FrameCache<C> {
    /// Creates an empty cache in front of `session`
    pub fn new(session: AnimationSession<C>) -> Self {
        Self {
            session,
            info: None,
            frames: Vec::new(),
            clock: FrameClock::new(),
            exhausted: false,
        }
    }

    /// Opens a session over `bytes` and wraps it
    pub fn open(codec: C, bytes: &[u8]) -> Result<Self> {
        AnimationSession::open(codec, bytes).map(Self::new)
    }

    /// Global animation info. Stays available after the session closes.
    pub fn info(&mut self) -> Result<AnimationInfo> {
        if let Some(info) = self.info {
            return Ok(info);
        }
        let info = self.session.info()?;
        self.info = Some(info);
        Ok(info)
    }

    /// Total number of frames.
    ///
    /// Without `allow_decode` this is `None` until the end of the stream has
    /// been seen. With it, every remaining frame is decoded first.
    pub fn frame_count(&mut self, allow_decode: bool) -> Result<Option<usize>> {
        if !self.exhausted && !allow_decode {
            return Ok(None);
        }
        while !self.exhausted {
            self.pull()?;
        }
        Ok(Some(self.frames.len()))
    }

    /// Returns frame `index`, decoding forward as far as needed
    pub fn frame(&mut self, index: usize) -> Result<&CompositedFrame> {
        self.decode_to(index)?;
        Ok(&self.frames[index])
    }

    /// Canvas width, once frame `index` is known to exist
    pub fn width(&mut self, index: usize) -> Result<u32> {
        self.decode_to(index)?;
        Ok(self.info()?.canvas_width)
    }

    /// Canvas height, once frame `index` is known to exist
    pub fn height(&mut self, index: usize) -> Result<u32> {
        self.decode_to(index)?;
        Ok(self.info()?.canvas_height)
    }

    /// Frames decoded so far, in stream order
    pub fn frames(&self) -> &[CompositedFrame] {
        &self.frames
    }

    /// Number of frames decoded so far
    pub fn decoded_len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the end of the stream has been seen
    pub fn is_complete(&self) -> bool {
        self.exhausted
    }

    /// State of the underlying session
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Closes the underlying session. Decoded frames stay readable.
    pub fn close(&mut self) {
        self.session.close();
    }

    /// Consumes the cache, closing the session and returning its frames
    pub fn into_frames(mut self) -> Vec<CompositedFrame> {
        self.session.close();
        std::mem::take(&mut self.frames)
    }

    fn decode_to(&mut self, index: usize) -> Result<()> {
        while self.frames.len() <= index {
            if self.exhausted {
                return Err(Error::IndexOutOfRange {
                    index,
                    count: self.frames.len(),
                });
            }
            self.pull()?;
        }
        Ok(())
    }

    fn pull(&mut self) -> Result<()> {
        let info = self.info()?;
        match self.session.next()? {
            Some(raw) => {
                let timing = self.clock.tick(raw.timestamp_ms);
                let frame = CompositedFrame::new(raw, info.canvas_width, info.canvas_height, timing)?;
                self.frames.push(frame);
                // Peek so the count is known as soon as the last frame lands,
                // then let the session observe its own end of stream.
                if !self.session.has_next()? {
                    self.session.next()?;
                    self.exhausted = true;
                }
            }
            None => self.exhausted = true,
        }
        Ok(())
    }
}
