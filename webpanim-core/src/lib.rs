//! webpanim Core Library
//!
//! This library provides the plain data structures shared by the animated
//! WebP decoder: RIFF container sniffing, global animation info, frame timing
//! and the packed RGBA pixel layout.

pub mod container;
pub mod info;
pub mod pixel;
pub mod timing;

pub use container::{ChunkKind, WebPHeader};
pub use info::AnimationInfo;
pub use timing::{FrameClock, FrameTiming};

/// Result type for webpanim-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for webpanim-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input too short: {0} bytes, expected at least 16")]
    TooShort(usize),

    #[error("Invalid magic bytes, expected 'RIFF'")]
    InvalidMagic,

    #[error("Invalid format magic, expected 'WEBP'")]
    InvalidFormatMagic,

    #[error("Unsupported first chunk: {0:?}")]
    UnsupportedChunk([u8; 4]),

    #[error("Invalid canvas dimensions: {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("Canvas too large to address: {width}x{height}")]
    CanvasTooLarge { width: u32, height: u32 },
}
