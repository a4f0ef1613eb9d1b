//! Sequential animation decode session.
//!
//! An [`AnimationSession`] owns exactly one native byte buffer and one native
//! decoder built over it. Frames come out strictly in order. A failed decode
//! step closes the session, and so does dropping it; teardown always destroys
//! the decoder before freeing the bytes it points into.

use crate::codec::NativeCodec;
use crate::frame::RawFrame;
use crate::{Error, Result};
use log::{debug, trace, warn};
use webpanim_core::{pixel, AnimationInfo, WebPHeader};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Opened, no frame pulled yet
    Fresh,
    /// At least one frame pulled, more may follow
    Active,
    /// The decoder reported end of stream
    Exhausted,
    /// Native handles released; terminal
    Closed,
}

/// Owner of one native decoder and the byte buffer it reads from
pub struct AnimationSession<C: NativeCodec> {
    codec: C,
    data: Option<C::Data>,
    decoder: Option<C::Decoder>,
    info: Option<AnimationInfo>,
    state: SessionState,
    frames_read: usize,
    last_timestamp_ms: i32,
}

impl<C: NativeCodec> AnimationSession<C> {
    /// Copies `bytes` into native memory and builds a decoder over them.
    ///
    /// The container header is checked before anything native is touched. The
    /// caller's buffer is not referenced after this returns.
    pub fn open(codec: C, bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidInput("empty input".into()));
        }
        WebPHeader::sniff(bytes)?;

        let data = codec.alloc_data(bytes)?;
        // From here on, dropping `session` releases whatever was acquired.
        let mut session = Self {
            codec,
            data: Some(data),
            decoder: None,
            info: None,
            state: SessionState::Fresh,
            frames_read: 0,
            last_timestamp_ms: 0,
        };

        let decoder = session
            .data
            .as_ref()
            .and_then(|data| session.codec.new_decoder(data))
            .ok_or_else(|| Error::InvalidInput("failed initializing decoder".into()))?;
        session.decoder = Some(decoder);

        debug!("opened animation session over {} bytes", bytes.len());
        Ok(session)
    }

    /// Global animation info, queried from the native decoder on first call
    pub fn info(&mut self) -> Result<AnimationInfo> {
        if self.state == SessionState::Closed {
            return Err(Error::IllegalState("session is closed"));
        }
        if let Some(info) = self.info {
            return Ok(info);
        }

        let decoder = self
            .decoder
            .as_ref()
            .ok_or(Error::IllegalState("session is closed"))?;
        let info = self
            .codec
            .get_info(decoder)
            .ok_or_else(|| Error::DecodeFailure("failed getting decoder info".into()))?;
        info.validate()
            .map_err(|e| Error::DecodeFailure(e.to_string()))?;

        debug!(
            "animation info: {}x{}, {} frames, loop count {}",
            info.canvas_width, info.canvas_height, info.frame_count, info.loop_count
        );
        self.info = Some(info);
        Ok(info)
    }

    /// Whether the native decoder has frames left
    pub fn has_next(&self) -> Result<bool> {
        match self.state {
            SessionState::Closed => Err(Error::IllegalState("session is closed")),
            SessionState::Exhausted => Ok(false),
            SessionState::Fresh | SessionState::Active => {
                let decoder = self
                    .decoder
                    .as_ref()
                    .ok_or(Error::IllegalState("session is closed"))?;
                Ok(self.codec.has_more_frames(decoder))
            }
        }
    }

    /// Decodes exactly one more frame.
    ///
    /// Returns `Ok(None)` once at end of stream; any call after that, or after
    /// the session closed, is an [`Error::IllegalState`]. A native failure
    /// closes the session before the error is returned.
    pub fn next(&mut self) -> Result<Option<RawFrame>> {
        match self.state {
            SessionState::Closed => return Err(Error::IllegalState("session is closed")),
            SessionState::Exhausted => return Err(Error::IllegalState("stream already exhausted")),
            SessionState::Fresh | SessionState::Active => {}
        }

        let info = self.info()?;
        if !self.has_next()? {
            debug!("end of stream after {} frames", self.frames_read);
            self.state = SessionState::Exhausted;
            return Ok(None);
        }
        self.state = SessionState::Active;

        // `info()` validated the canvas, so this only fails on a broken invariant.
        let canvas_bytes = info
            .canvas_bytes()
            .ok_or_else(|| Error::DecodeFailure("canvas too large".into()))?;
        let copied = match self.decoder.as_mut() {
            Some(decoder) => self.codec.next_frame(decoder, canvas_bytes).map(|borrowed| {
                // The native canvas is only valid until the next call; copy it now.
                if borrowed.rgba.len() == canvas_bytes {
                    Ok((pixel::pack_rgba_bytes(borrowed.rgba), borrowed.timestamp_ms))
                } else {
                    Err(borrowed.rgba.len())
                }
            }),
            None => return Err(Error::IllegalState("session is closed")),
        };

        let (pixels, timestamp_ms) = match copied {
            Some(Ok(copied)) => copied,
            Some(Err(len)) => {
                return Err(self.fail(format!(
                    "frame {} has {} bytes, expected {}",
                    self.frames_read, len, canvas_bytes
                )));
            }
            None => {
                return Err(self.fail(format!("error decoding frame {}", self.frames_read)));
            }
        };
        if timestamp_ms < self.last_timestamp_ms {
            return Err(self.fail(format!(
                "frame {} timestamp {} ms precedes previous {} ms",
                self.frames_read, timestamp_ms, self.last_timestamp_ms
            )));
        }

        trace!("decoded frame {} at {} ms", self.frames_read, timestamp_ms);
        self.last_timestamp_ms = timestamp_ms;
        self.frames_read += 1;
        Ok(Some(RawFrame {
            pixels,
            timestamp_ms,
        }))
    }

    /// Releases the decoder, then the byte buffer. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(decoder) = self.decoder.take() {
            self.codec.delete_decoder(decoder);
        }
        if let Some(data) = self.data.take() {
            self.codec.free_data(data);
        }
        if self.state != SessionState::Closed {
            debug!("closed animation session after {} frames", self.frames_read);
            self.state = SessionState::Closed;
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of frames pulled so far
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    fn fail(&mut self, message: String) -> Error {
        warn!("{message}; closing session");
        self.close();
        Error::DecodeFailure(message)
    }
}

impl<C: NativeCodec> Drop for AnimationSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{webp_bytes, FakeCodec};
    use crate::ErrorKind;

    #[test]
    fn test_open_rejects_empty_input() {
        let codec = FakeCodec::animation(4, 4, &[100]);
        let err = AnimationSession::open(&codec, &[]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(codec.allocs(), 0);
    }

    #[test]
    fn test_malformed_input_never_reaches_decoder() {
        let codec = FakeCodec::animation(4, 4, &[100]);
        let err = AnimationSession::open(&codec, &[0, 0, 0, 0]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(codec.decoders_created(), 0);
        assert!(codec.is_balanced());
    }

    #[test]
    fn test_rejected_bitstream_frees_buffer() {
        let codec = FakeCodec::animation(4, 4, &[100]).rejecting_decoder();
        let err = AnimationSession::open(&codec, &webp_bytes()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(codec.allocs(), 1);
        assert_eq!(codec.frees(), 1);
    }

    #[test]
    fn test_allocation_failure() {
        let codec = FakeCodec::animation(4, 4, &[100]).failing_alloc();
        let err = AnimationSession::open(&codec, &webp_bytes()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ResourceExhaustion);
        assert!(codec.is_balanced());
    }

    #[test]
    fn test_info_is_queried_once() {
        let codec = FakeCodec::animation(16, 16, &[480, 1760]).with_loop_count(1);
        let mut session = AnimationSession::open(&codec, &webp_bytes()).unwrap();
        let first = session.info().unwrap();
        let second = session.info().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.loop_count, 1);
        assert_eq!(first.frame_count, 2);
        assert_eq!(codec.info_calls(), 1);
    }

    #[test]
    fn test_info_failure_is_decode_failure() {
        let codec = FakeCodec::animation(4, 4, &[100]).failing_info();
        {
            let mut session = AnimationSession::open(&codec, &webp_bytes()).unwrap();
            assert_eq!(session.info().unwrap_err().kind(), ErrorKind::DecodeFailure);
        }
        assert!(codec.is_balanced());
    }

    #[test]
    fn test_unaddressable_canvas_is_decode_failure() {
        let codec = FakeCodec::animation(2, 2, &[100]).reporting_canvas(u32::MAX, u32::MAX);
        {
            let mut session = AnimationSession::open(&codec, &webp_bytes()).unwrap();
            assert_eq!(session.info().unwrap_err().kind(), ErrorKind::DecodeFailure);
            assert_eq!(session.next().unwrap_err().kind(), ErrorKind::DecodeFailure);
        }
        assert_eq!(codec.next_calls(), 0);
        assert!(codec.is_balanced());
    }

    #[test]
    fn test_frames_in_order_then_end_of_stream() {
        let codec = FakeCodec::animation(2, 2, &[480, 1760]);
        let mut session = AnimationSession::open(&codec, &webp_bytes()).unwrap();
        assert_eq!(session.state(), SessionState::Fresh);

        let first = session.next().unwrap().unwrap();
        assert_eq!(first.timestamp_ms, 480);
        assert_eq!(first.pixels.len(), 4);
        assert_eq!(first.pixels[0], pixel::pack(FakeCodec::frame_rgba(0)));
        assert_eq!(session.state(), SessionState::Active);

        let second = session.next().unwrap().unwrap();
        assert_eq!(second.timestamp_ms, 1760);
        assert!(!session.has_next().unwrap());

        assert!(session.next().unwrap().is_none());
        assert_eq!(session.state(), SessionState::Exhausted);
        assert_eq!(session.next().unwrap_err().kind(), ErrorKind::IllegalState);
        assert_eq!(session.frames_read(), 2);
    }

    #[test]
    fn test_decode_failure_closes_session() {
        let codec = FakeCodec::animation(2, 2, &[100, 200, 300]).failing_at(1);
        let mut session = AnimationSession::open(&codec, &webp_bytes()).unwrap();
        assert!(session.next().unwrap().is_some());
        assert_eq!(session.next().unwrap_err().kind(), ErrorKind::DecodeFailure);
        assert_eq!(session.state(), SessionState::Closed);
        assert!(codec.is_balanced());

        assert_eq!(session.next().unwrap_err().kind(), ErrorKind::IllegalState);
        assert_eq!(session.has_next().unwrap_err().kind(), ErrorKind::IllegalState);
        assert_eq!(session.info().unwrap_err().kind(), ErrorKind::IllegalState);
    }

    #[test]
    fn test_backwards_timestamp_is_decode_failure() {
        let codec = FakeCodec::animation(2, 2, &[200, 100]);
        let mut session = AnimationSession::open(&codec, &webp_bytes()).unwrap();
        assert!(session.next().unwrap().is_some());
        assert_eq!(session.next().unwrap_err().kind(), ErrorKind::DecodeFailure);
        assert!(codec.is_balanced());
    }

    #[test]
    fn test_close_is_idempotent_and_ordered() {
        let codec = FakeCodec::animation(2, 2, &[100]);
        let mut session = AnimationSession::open(&codec, &webp_bytes()).unwrap();
        session.close();
        session.close();
        drop(session);
        assert_eq!(codec.frees(), 1);
        assert_eq!(codec.decoders_deleted(), 1);
        assert_eq!(
            codec.events(),
            vec!["alloc_data", "new_decoder", "delete_decoder", "free_data"]
        );
    }

    #[test]
    fn test_drop_releases_handles() {
        let codec = FakeCodec::animation(2, 2, &[100, 200]);
        {
            let mut session = AnimationSession::open(&codec, &webp_bytes()).unwrap();
            session.next().unwrap();
        }
        assert!(codec.is_balanced());
        assert_eq!(codec.allocs(), 1);
    }
}
