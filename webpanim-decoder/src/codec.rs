//! Native codec boundary.
//!
//! [`NativeCodec`] is the capability surface of a sequential native animation
//! decoder. Sessions receive a codec explicitly, so tests can substitute an
//! instrumented fake for the runtime-loaded libwebp.

use crate::Result;
use webpanim_core::AnimationInfo;

/// A decoded canvas still owned by the native decoder.
///
/// The pixels live in decoder-owned memory that the next mutating call on the
/// same decoder invalidates. The lifetime ties the borrow to `&mut Decoder`, so
/// the only way to keep the pixels past that point is to copy them.
#[derive(Debug, Clone, Copy)]
pub struct BorrowedFrame<'d> {
    /// `R, G, B, A` bytes of the full canvas, row-major
    pub rgba: &'d [u8],
    /// Cumulative timestamp in milliseconds
    pub timestamp_ms: i32,
}

/// Operations a native animated WebP decoder provides.
///
/// Handles are opaque to callers. A `Data` handle must outlive every `Decoder`
/// built from it; releasing them is the caller's job, in decoder-then-data
/// order.
pub trait NativeCodec {
    /// Natively owned copy of the compressed bytes
    type Data;
    /// Native decoder instance
    type Decoder;

    /// Allocates native memory and copies `bytes` into it
    fn alloc_data(&self, bytes: &[u8]) -> Result<Self::Data>;

    /// Releases a byte buffer returned by [`alloc_data`](Self::alloc_data)
    fn free_data(&self, data: Self::Data);

    /// Builds a decoder over `data`, or `None` if the bitstream is rejected
    fn new_decoder(&self, data: &Self::Data) -> Option<Self::Decoder>;

    /// Fetches the global animation info
    fn get_info(&self, decoder: &Self::Decoder) -> Option<AnimationInfo>;

    /// Whether frames remain. Has no side effects.
    fn has_more_frames(&self, decoder: &Self::Decoder) -> bool;

    /// Decodes the next fully composited canvas of `canvas_bytes` bytes
    fn next_frame<'d>(
        &self,
        decoder: &'d mut Self::Decoder,
        canvas_bytes: usize,
    ) -> Option<BorrowedFrame<'d>>;

    /// Destroys a decoder returned by [`new_decoder`](Self::new_decoder)
    fn delete_decoder(&self, decoder: Self::Decoder);
}

impl<T: NativeCodec + ?Sized> NativeCodec for &T {
    type Data = T::Data;
    type Decoder = T::Decoder;

    fn alloc_data(&self, bytes: &[u8]) -> Result<Self::Data> {
        (**self).alloc_data(bytes)
    }

    fn free_data(&self, data: Self::Data) {
        (**self).free_data(data)
    }

    fn new_decoder(&self, data: &Self::Data) -> Option<Self::Decoder> {
        (**self).new_decoder(data)
    }

    fn get_info(&self, decoder: &Self::Decoder) -> Option<AnimationInfo> {
        (**self).get_info(decoder)
    }

    fn has_more_frames(&self, decoder: &Self::Decoder) -> bool {
        (**self).has_more_frames(decoder)
    }

    fn next_frame<'d>(
        &self,
        decoder: &'d mut Self::Decoder,
        canvas_bytes: usize,
    ) -> Option<BorrowedFrame<'d>> {
        (**self).next_frame(decoder, canvas_bytes)
    }

    fn delete_decoder(&self, decoder: Self::Decoder) {
        (**self).delete_decoder(decoder)
    }
}
