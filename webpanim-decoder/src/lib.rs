//! webpanim Decoder Library
//!
//! Random-access decoding of animated WebP images on top of a strictly
//! sequential native animation decoder.
//!
//! The layers, from the native boundary up:
//!
//! - [`NativeCodec`]: the capability surface of the native decoder. [`LibWebP`]
//!   implements it by loading libwebp at runtime.
//! - [`AnimationSession`]: owns one native byte buffer and one native decoder,
//!   pulls frames strictly in order and releases both handles on close or drop.
//! - [`FrameCache`]: memoizes every frame pulled from a session so callers can
//!   ask for frame `N` in any order.
//! - [`WebPReader`]: the width/height/image-at-index/count contract used by
//!   multi-image reader front ends.

pub mod animation;
pub mod codec;
pub mod frame;
pub mod frame_cache;
pub mod libwebp;
pub mod reader;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use animation::{can_decode, decode, decode_file, decode_reader, decode_with, WebPImage};
pub use codec::{BorrowedFrame, NativeCodec};
pub use frame::{CompositedFrame, RawFrame};
pub use frame_cache::FrameCache;
pub use libwebp::{LibWebP, LibraryConfig};
pub use reader::{ImageMetadata, StreamMetadata, WebPReader};
pub use session::{AnimationSession, SessionState};
pub use webpanim_core::AnimationInfo;

/// Result type for webpanim-decoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for webpanim-decoder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Container error: {0}")]
    Container(#[from] webpanim_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] ::image::ImageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    #[error("Frame index {index} out of range (frames: {count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Illegal state: {0}")]
    IllegalState(&'static str),

    #[error("Native allocation failed: {0}")]
    ResourceExhaustion(String),

    #[error("Native library error: {0}")]
    Library(String),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty or malformed compressed data
    InvalidInput,
    /// The native decoder rejected a frame after a successful open
    DecodeFailure,
    /// The stream holds fewer frames than the requested index
    IndexOutOfRange,
    /// Operation on a closed, exhausted or failed session
    IllegalState,
    /// Native allocation failed
    ResourceExhaustion,
    /// Reading the input or writing an image failed
    Io,
    /// The native library could not be loaded
    Library,
}

impl Error {
    /// Returns the category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Container(webpanim_core::Error::Io(_)) | Error::Io(_) | Error::Image(_) => {
                ErrorKind::Io
            }
            Error::Container(_) | Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::DecodeFailure(_) => ErrorKind::DecodeFailure,
            Error::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Error::IllegalState(_) => ErrorKind::IllegalState,
            Error::ResourceExhaustion(_) => ErrorKind::ResourceExhaustion,
            Error::Library(_) => ErrorKind::Library,
        }
    }
}
