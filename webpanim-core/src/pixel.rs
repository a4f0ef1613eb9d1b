//! Packed RGBA pixel layout.
//!
//! One `u32` per pixel with red in bits 0-7, green in 8-15, blue in 16-23 and
//! alpha in 24-31. This is the little-endian reading of an `R, G, B, A` byte
//! sequence.

use byteorder::{ByteOrder, LittleEndian};

/// Packs one RGBA quadruple
pub fn pack(rgba: [u8; 4]) -> u32 {
    u32::from_le_bytes(rgba)
}

/// Unpacks one pixel into its RGBA bytes
pub fn unpack(pixel: u32) -> [u8; 4] {
    pixel.to_le_bytes()
}

/// Converts an `R, G, B, A` byte buffer into packed pixels.
///
/// Trailing bytes that do not form a whole pixel are ignored.
pub fn pack_rgba_bytes(rgba: &[u8]) -> Vec<u32> {
    let mut pixels = vec![0u32; rgba.len() / 4];
    LittleEndian::read_u32_into(&rgba[..pixels.len() * 4], &mut pixels);
    pixels
}

/// Converts packed pixels back into an `R, G, B, A` byte buffer
pub fn unpack_to_rgba_bytes(pixels: &[u32]) -> Vec<u8> {
    let mut rgba = vec![0u8; pixels.len() * 4];
    LittleEndian::write_u32_into(pixels, &mut rgba);
    rgba
}
