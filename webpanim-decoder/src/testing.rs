//! Instrumented in-memory codec for tests

use crate::codec::{BorrowedFrame, NativeCodec};
use crate::{Error, Result};
use std::cell::{Cell, RefCell};
use webpanim_core::AnimationInfo;

/// Bytes that pass the container sniff
pub(crate) fn webp_bytes() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"RIFF");
    data.extend_from_slice(&24u32.to_le_bytes());
    data.extend_from_slice(b"WEBP");
    data.extend_from_slice(b"VP8X");
    data.extend_from_slice(&[0u8; 16]);
    data
}

pub(crate) struct FakeData {
    _bytes: Vec<u8>,
}

pub(crate) struct FakeDecoder {
    cursor: usize,
    canvas: Vec<u8>,
}

/// Scripted stand-in for libwebp that counts every native call
pub(crate) struct FakeCodec {
    width: u32,
    height: u32,
    loop_count: u32,
    frames: Vec<(Vec<u8>, i32)>,
    fail_alloc: bool,
    reject_decoder: bool,
    fail_info: bool,
    fail_at: Option<usize>,
    allocs: Cell<usize>,
    frees: Cell<usize>,
    created: Cell<usize>,
    deleted: Cell<usize>,
    info_calls: Cell<usize>,
    next_calls: Cell<usize>,
    events: RefCell<Vec<&'static str>>,
}

impl FakeCodec {
    /// A `width` x `height` animation with one frame per timestamp. Every
    /// pixel of frame `i` is `[i, 0x10, 0x20, 0xff]`.
    pub(crate) fn animation(width: u32, height: u32, timestamps: &[i32]) -> Self {
        let frames = timestamps
            .iter()
            .enumerate()
            .map(|(i, &ts)| {
                let canvas = Self::frame_rgba(i)
                    .into_iter()
                    .cycle()
                    .take(width as usize * height as usize * 4)
                    .collect();
                (canvas, ts)
            })
            .collect();
        Self {
            width,
            height,
            loop_count: 0,
            frames,
            fail_alloc: false,
            reject_decoder: false,
            fail_info: false,
            fail_at: None,
            allocs: Cell::new(0),
            frees: Cell::new(0),
            created: Cell::new(0),
            deleted: Cell::new(0),
            info_calls: Cell::new(0),
            next_calls: Cell::new(0),
            events: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn frame_rgba(index: usize) -> [u8; 4] {
        [index as u8, 0x10, 0x20, 0xff]
    }

    pub(crate) fn with_loop_count(mut self, loop_count: u32) -> Self {
        self.loop_count = loop_count;
        self
    }

    /// Reports a different canvas size without touching the scripted frames
    pub(crate) fn reporting_canvas(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub(crate) fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub(crate) fn failing_alloc(mut self) -> Self {
        self.fail_alloc = true;
        self
    }

    pub(crate) fn rejecting_decoder(mut self) -> Self {
        self.reject_decoder = true;
        self
    }

    pub(crate) fn failing_info(mut self) -> Self {
        self.fail_info = true;
        self
    }

    pub(crate) fn allocs(&self) -> usize {
        self.allocs.get()
    }

    pub(crate) fn frees(&self) -> usize {
        self.frees.get()
    }

    pub(crate) fn decoders_created(&self) -> usize {
        self.created.get()
    }

    pub(crate) fn decoders_deleted(&self) -> usize {
        self.deleted.get()
    }

    pub(crate) fn info_calls(&self) -> usize {
        self.info_calls.get()
    }

    pub(crate) fn next_calls(&self) -> usize {
        self.next_calls.get()
    }

    pub(crate) fn events(&self) -> Vec<&'static str> {
        self.events.borrow().clone()
    }

    /// Every allocation was freed and every decoder destroyed
    pub(crate) fn is_balanced(&self) -> bool {
        self.allocs() == self.frees() && self.decoders_created() == self.decoders_deleted()
    }

    fn bump(counter: &Cell<usize>) {
        counter.set(counter.get() + 1);
    }
}

impl NativeCodec for FakeCodec {
    type Data = FakeData;
    type Decoder = FakeDecoder;

    fn alloc_data(&self, bytes: &[u8]) -> Result<FakeData> {
        if self.fail_alloc {
            return Err(Error::ResourceExhaustion("fake allocation failure".into()));
        }
        Self::bump(&self.allocs);
        self.events.borrow_mut().push("alloc_data");
        Ok(FakeData {
            _bytes: bytes.to_vec(),
        })
    }

    fn free_data(&self, _data: FakeData) {
        Self::bump(&self.frees);
        self.events.borrow_mut().push("free_data");
    }

    fn new_decoder(&self, _data: &FakeData) -> Option<FakeDecoder> {
        if self.reject_decoder {
            return None;
        }
        Self::bump(&self.created);
        self.events.borrow_mut().push("new_decoder");
        Some(FakeDecoder {
            cursor: 0,
            canvas: Vec::new(),
        })
    }

    fn get_info(&self, _decoder: &FakeDecoder) -> Option<AnimationInfo> {
        Self::bump(&self.info_calls);
        if self.fail_info {
            return None;
        }
        Some(AnimationInfo {
            canvas_width: self.width,
            canvas_height: self.height,
            loop_count: self.loop_count,
            background_color: 0xffff_ffff,
            frame_count: self.frames.len() as u32,
        })
    }

    fn has_more_frames(&self, decoder: &FakeDecoder) -> bool {
        decoder.cursor < self.frames.len()
    }

    fn next_frame<'d>(
        &self,
        decoder: &'d mut FakeDecoder,
        _canvas_bytes: usize,
    ) -> Option<BorrowedFrame<'d>> {
        Self::bump(&self.next_calls);
        let index = decoder.cursor;
        let (rgba, timestamp_ms) = self.frames.get(index)?;
        decoder.cursor += 1;
        if self.fail_at == Some(index) {
            return None;
        }
        decoder.canvas.clear();
        decoder.canvas.extend_from_slice(rgba);
        Some(BorrowedFrame {
            rgba: &decoder.canvas,
            timestamp_ms: *timestamp_ms,
        })
    }

    fn delete_decoder(&self, _decoder: FakeDecoder) {
        Self::bump(&self.deleted);
        self.events.borrow_mut().push("delete_decoder");
    }
}
