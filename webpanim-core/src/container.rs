//! RIFF/WebP container header sniffing

use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Magic bytes for the RIFF container: "RIFF"
pub const RIFF_MAGIC: [u8; 4] = *b"RIFF";

/// Magic bytes for the WebP form type: "WEBP"
pub const WEBP_MAGIC: [u8; 4] = *b"WEBP";

/// Size of the header inspected by [`WebPHeader::read`]
pub const HEADER_LEN: usize = 16;

/// Chunk types that may open a WebP file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// `VP8 ` lossy bitstream
    Lossy,
    /// `VP8L` lossless bitstream
    Lossless,
    /// `VP8X` extended format (animation, alpha, metadata)
    Extended,
}

impl ChunkKind {
    /// Maps a chunk FourCC onto a recognized kind
    pub fn from_fourcc(fourcc: [u8; 4]) -> Option<Self> {
        match &fourcc {
            b"VP8 " => Some(Self::Lossy),
            b"VP8L" => Some(Self::Lossless),
            b"VP8X" => Some(Self::Extended),
            _ => None,
        }
    }

    /// Returns the chunk FourCC
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            Self::Lossy => *b"VP8 ",
            Self::Lossless => *b"VP8L",
            Self::Extended => *b"VP8X",
        }
    }
}

/// The fixed 16-byte prefix of a WebP file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebPHeader {
    /// RIFF payload size as declared by the file (not validated)
    pub riff_size: u32,
    /// Type of the first chunk after the form type
    pub first_chunk: ChunkKind,
}

impl WebPHeader {
    /// Reads a header from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        // Read and validate magic bytes
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != RIFF_MAGIC {
            return Err(Error::InvalidMagic);
        }

        // Size field is informational only
        let riff_size = reader.read_u32::<LittleEndian>()?;

        let mut form = [0u8; 4];
        reader.read_exact(&mut form)?;
        if form != WEBP_MAGIC {
            return Err(Error::InvalidFormatMagic);
        }

        let mut fourcc = [0u8; 4];
        reader.read_exact(&mut fourcc)?;
        let first_chunk = ChunkKind::from_fourcc(fourcc).ok_or(Error::UnsupportedChunk(fourcc))?;

        Ok(Self {
            riff_size,
            first_chunk,
        })
    }

    /// Parses the header at the start of an in-memory buffer
    pub fn sniff(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::TooShort(data.len()));
        }
        Self::read(&mut Cursor::new(data))
    }
}

/// Returns true when `data` starts with a recognized WebP header
pub fn is_webp(data: &[u8]) -> bool {
    WebPHeader::sniff(data).is_ok()
}
