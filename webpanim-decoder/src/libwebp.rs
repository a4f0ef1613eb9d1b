//! Runtime bindings for the libwebp animation decoder.
//!
//! libwebp is loaded with `libloading` once per process and never unloaded.
//! [`LibWebP::init`] picks the library files; [`LibWebP::global`] loads from
//! the environment on first use. Only the handful of `demux.h` entry points
//! the animation session needs are bound.

use crate::codec::{BorrowedFrame, NativeCodec};
use crate::{Error, Result};
use libc::{c_int, c_void, size_t};
use libloading::Library;
use log::debug;
use std::path::PathBuf;
use std::ptr::{self, NonNull};
use std::sync::OnceLock;
use webpanim_core::AnimationInfo;

/// ABI version passed to `WebPAnimDecoderNewInternal` (libwebp >= 0.5)
pub const WEBP_DEMUX_ABI_VERSION: c_int = 0x0107;

/// Environment variable overriding the libwebpdemux path
pub const DEMUX_PATH_ENV: &str = "WEBPANIM_LIBWEBPDEMUX";

/// Environment variable overriding the libwebp path
pub const WEBP_PATH_ENV: &str = "WEBPANIM_LIBWEBP";

#[cfg(target_os = "windows")]
const DEFAULT_DEMUX_NAMES: &[&str] = &["libwebpdemux.dll", "webpdemux.dll"];
#[cfg(target_os = "windows")]
const DEFAULT_WEBP_NAMES: &[&str] = &["libwebp.dll", "webp.dll"];

#[cfg(target_os = "macos")]
const DEFAULT_DEMUX_NAMES: &[&str] = &["libwebpdemux.2.dylib", "libwebpdemux.dylib"];
#[cfg(target_os = "macos")]
const DEFAULT_WEBP_NAMES: &[&str] = &["libwebp.7.dylib", "libwebp.dylib"];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_DEMUX_NAMES: &[&str] = &["libwebpdemux.so.2", "libwebpdemux.so"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_WEBP_NAMES: &[&str] = &["libwebp.so.7", "libwebp.so"];

// [webp/mux_types.h] struct WebPData
#[repr(C)]
struct WebPData {
    bytes: *const u8,
    size: size_t,
}

// [webp/demux.h] struct WebPAnimInfo
#[repr(C)]
#[derive(Default)]
struct WebPAnimInfo {
    canvas_width: u32,
    canvas_height: u32,
    loop_count: u32,
    bgcolor: u32,
    frame_count: u32,
    pad: [u32; 4],
}

type WebPMallocFn = unsafe extern "C" fn(size: size_t) -> *mut c_void;
type WebPFreeFn = unsafe extern "C" fn(ptr: *mut c_void);
type AnimDecoderNewFn =
    unsafe extern "C" fn(data: *const WebPData, options: *const c_void, version: c_int) -> *mut c_void;
type AnimDecoderGetInfoFn = unsafe extern "C" fn(dec: *const c_void, info: *mut WebPAnimInfo) -> c_int;
type AnimDecoderHasMoreFramesFn = unsafe extern "C" fn(dec: *const c_void) -> c_int;
type AnimDecoderGetNextFn =
    unsafe extern "C" fn(dec: *mut c_void, buf: *mut *mut u8, timestamp: *mut c_int) -> c_int;
type AnimDecoderDeleteFn = unsafe extern "C" fn(dec: *mut c_void);

static LIBWEBP: OnceLock<std::result::Result<LibWebP, String>> = OnceLock::new();

/// Where to find the native libraries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Explicit path to libwebpdemux; platform names are tried when `None`
    pub demux_path: Option<PathBuf>,
    /// Explicit path to libwebp, only needed when libwebpdemux does not
    /// expose `WebPMalloc`/`WebPFree` itself
    pub webp_path: Option<PathBuf>,
}

impl LibraryConfig {
    /// Reads overrides from `WEBPANIM_LIBWEBPDEMUX` and `WEBPANIM_LIBWEBP`
    pub fn from_env() -> Self {
        Self {
            demux_path: std::env::var_os(DEMUX_PATH_ENV).map(PathBuf::from),
            webp_path: std::env::var_os(WEBP_PATH_ENV).map(PathBuf::from),
        }
    }

    /// Candidate file names for libwebpdemux, in load order
    pub fn demux_candidates(&self) -> Vec<PathBuf> {
        candidates(&self.demux_path, DEFAULT_DEMUX_NAMES)
    }

    /// Candidate file names for libwebp, in load order
    pub fn webp_candidates(&self) -> Vec<PathBuf> {
        candidates(&self.webp_path, DEFAULT_WEBP_NAMES)
    }
}

fn candidates(explicit: &Option<PathBuf>, defaults: &[&str]) -> Vec<PathBuf> {
    match explicit {
        Some(path) => vec![path.clone()],
        None => defaults.iter().map(PathBuf::from).collect(),
    }
}

fn open_first(candidates: &[PathBuf]) -> std::result::Result<(Library, PathBuf), String> {
    let mut last_error = String::from("no candidates");
    for path in candidates {
        // SAFETY: libwebp has no load-time initializers with preconditions.
        match unsafe { Library::new(path) } {
            Ok(lib) => return Ok((lib, path.clone())),
            Err(e) => last_error = format!("{}: {e}", path.display()),
        }
    }
    Err(last_error)
}

/// Looks a symbol up and copies out the function pointer.
///
/// # Safety
///
/// `T` must match the C signature of `name`, and the returned pointer must not
/// outlive `lib`.
unsafe fn symbol<T: Copy>(lib: &Library, name: &[u8]) -> std::result::Result<T, libloading::Error> {
    lib.get::<T>(name).map(|sym| *sym)
}

/// The loaded libwebp animation decoder entry points
pub struct LibWebP {
    malloc: WebPMallocFn,
    free: WebPFreeFn,
    anim_decoder_new: AnimDecoderNewFn,
    anim_decoder_get_info: AnimDecoderGetInfoFn,
    anim_decoder_has_more_frames: AnimDecoderHasMoreFramesFn,
    anim_decoder_get_next: AnimDecoderGetNextFn,
    anim_decoder_delete: AnimDecoderDeleteFn,
    // Keep the libraries mapped for as long as the function pointers exist.
    _demux: Library,
    _webp: Option<Library>,
}

impl std::fmt::Debug for LibWebP {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibWebP")
            .field("has_separate_webp", &self._webp.is_some())
            .finish_non_exhaustive()
    }
}

impl LibWebP {
    /// Loads the libraries described by `config`.
    ///
    /// Prefer [`init`](Self::init) / [`global`](Self::global), which load once
    /// per process.
    pub fn load(config: &LibraryConfig) -> Result<Self> {
        let (demux, demux_path) = open_first(&config.demux_candidates()).map_err(Error::Library)?;
        debug!("loaded libwebpdemux from {}", demux_path.display());

        let missing = |e: libloading::Error| Error::Library(format!("missing symbol: {e}"));

        // SAFETY: the aliases above mirror the declarations in webp/demux.h.
        let anim_decoder_new =
            unsafe { symbol::<AnimDecoderNewFn>(&demux, b"WebPAnimDecoderNewInternal\0") }.map_err(missing)?;
        let anim_decoder_get_info =
            unsafe { symbol::<AnimDecoderGetInfoFn>(&demux, b"WebPAnimDecoderGetInfo\0") }.map_err(missing)?;
        let anim_decoder_has_more_frames =
            unsafe { symbol::<AnimDecoderHasMoreFramesFn>(&demux, b"WebPAnimDecoderHasMoreFrames\0") }
                .map_err(missing)?;
        let anim_decoder_get_next =
            unsafe { symbol::<AnimDecoderGetNextFn>(&demux, b"WebPAnimDecoderGetNext\0") }.map_err(missing)?;
        let anim_decoder_delete =
            unsafe { symbol::<AnimDecoderDeleteFn>(&demux, b"WebPAnimDecoderDelete\0") }.map_err(missing)?;

        // WebPMalloc/WebPFree live in libwebp; libwebpdemux usually resolves
        // them through its own dependencies.
        // SAFETY: signatures mirror webp/types.h.
        let (malloc, free, webp) = match unsafe {
            (
                symbol::<WebPMallocFn>(&demux, b"WebPMalloc\0"),
                symbol::<WebPFreeFn>(&demux, b"WebPFree\0"),
            )
        } {
            (Ok(malloc), Ok(free)) => (malloc, free, None),
            _ => {
                let (webp, webp_path) = open_first(&config.webp_candidates()).map_err(Error::Library)?;
                debug!("loaded libwebp from {}", webp_path.display());
                // SAFETY: as above.
                let (malloc, free) = unsafe {
                    (
                        symbol::<WebPMallocFn>(&webp, b"WebPMalloc\0").map_err(missing)?,
                        symbol::<WebPFreeFn>(&webp, b"WebPFree\0").map_err(missing)?,
                    )
                };
                (malloc, free, Some(webp))
            }
        };

        Ok(Self {
            malloc,
            free,
            anim_decoder_new,
            anim_decoder_get_info,
            anim_decoder_has_more_frames,
            anim_decoder_get_next,
            anim_decoder_delete,
            _demux: demux,
            _webp: webp,
        })
    }

    /// Loads the process-wide instance with `config`.
    ///
    /// Only the first call in a process loads anything; later calls return the
    /// same instance (or the same failure) whatever `config` they pass.
    pub fn init(config: LibraryConfig) -> Result<&'static LibWebP> {
        LIBWEBP
            .get_or_init(|| LibWebP::load(&config).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| Error::Library(e.clone()))
    }

    /// Returns the process-wide instance, loading it from the environment if
    /// nothing has been loaded yet
    pub fn global() -> Result<&'static LibWebP> {
        Self::init(LibraryConfig::from_env())
    }
}

/// Compressed bytes copied into `WebPMalloc` memory
#[derive(Debug)]
pub struct NativeData {
    raw: WebPData,
}

/// A live `WebPAnimDecoder*`
#[derive(Debug)]
pub struct NativeDecoder {
    ptr: NonNull<c_void>,
}

impl std::fmt::Debug for WebPData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebPData").field("size", &self.size).finish()
    }
}

impl NativeCodec for LibWebP {
    type Data = NativeData;
    type Decoder = NativeDecoder;

    fn alloc_data(&self, bytes: &[u8]) -> Result<NativeData> {
        // SAFETY: WebPMalloc returns either NULL or `bytes.len()` writable bytes.
        let dst = unsafe { (self.malloc)(bytes.len()) } as *mut u8;
        if dst.is_null() {
            return Err(Error::ResourceExhaustion(format!(
                "WebPMalloc({}) returned NULL",
                bytes.len()
            )));
        }
        // SAFETY: `dst` was just allocated with room for `bytes.len()` bytes.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len()) };
        Ok(NativeData {
            raw: WebPData {
                bytes: dst,
                size: bytes.len(),
            },
        })
    }

    fn free_data(&self, data: NativeData) {
        // SAFETY: the pointer came from WebPMalloc and is freed exactly once
        // because `data` is consumed.
        unsafe { (self.free)(data.raw.bytes as *mut c_void) };
    }

    fn new_decoder(&self, data: &NativeData) -> Option<NativeDecoder> {
        // SAFETY: `data.raw` points at a live WebPMalloc buffer; NULL options
        // select RGBA output.
        let ptr = unsafe { (self.anim_decoder_new)(&data.raw, ptr::null(), WEBP_DEMUX_ABI_VERSION) };
        NonNull::new(ptr).map(|ptr| NativeDecoder { ptr })
    }

    fn get_info(&self, decoder: &NativeDecoder) -> Option<AnimationInfo> {
        let mut raw = WebPAnimInfo::default();
        // SAFETY: `decoder` is live and `raw` matches the C layout.
        if unsafe { (self.anim_decoder_get_info)(decoder.ptr.as_ptr(), &mut raw) } == 0 {
            return None;
        }
        Some(AnimationInfo {
            canvas_width: raw.canvas_width,
            canvas_height: raw.canvas_height,
            loop_count: raw.loop_count,
            background_color: raw.bgcolor,
            frame_count: raw.frame_count,
        })
    }

    fn has_more_frames(&self, decoder: &NativeDecoder) -> bool {
        // SAFETY: `decoder` is live.
        unsafe { (self.anim_decoder_has_more_frames)(decoder.ptr.as_ptr()) != 0 }
    }

    fn next_frame<'d>(
        &self,
        decoder: &'d mut NativeDecoder,
        canvas_bytes: usize,
    ) -> Option<BorrowedFrame<'d>> {
        let mut buf: *mut u8 = ptr::null_mut();
        let mut timestamp: c_int = 0;
        // SAFETY: `decoder` is live and exclusively borrowed.
        let ok = unsafe { (self.anim_decoder_get_next)(decoder.ptr.as_ptr(), &mut buf, &mut timestamp) };
        if ok == 0 || buf.is_null() {
            return None;
        }
        // SAFETY: libwebp returns a canvas of width * height * 4 bytes that
        // stays valid until the next call on this decoder, which the `'d`
        // borrow rules out.
        let rgba = unsafe { std::slice::from_raw_parts(buf as *const u8, canvas_bytes) };
        Some(BorrowedFrame {
            rgba,
            timestamp_ms: timestamp,
        })
    }

    fn delete_decoder(&self, decoder: NativeDecoder) {
        // SAFETY: consumed, so deleted exactly once.
        unsafe { (self.anim_decoder_delete)(decoder.ptr.as_ptr()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_is_the_only_candidate() {
        let config = LibraryConfig {
            demux_path: Some(PathBuf::from("/opt/webp/libwebpdemux.so")),
            webp_path: None,
        };
        assert_eq!(
            config.demux_candidates(),
            vec![PathBuf::from("/opt/webp/libwebpdemux.so")]
        );
        assert_eq!(config.webp_candidates().len(), DEFAULT_WEBP_NAMES.len());
    }

    #[test]
    fn test_load_missing_library_fails() {
        let config = LibraryConfig {
            demux_path: Some(PathBuf::from("/nonexistent/libwebpdemux-missing.so")),
            webp_path: None,
        };
        let err = LibWebP::load(&config).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Library);
    }

    #[test]
    fn test_anim_info_layout() {
        assert_eq!(std::mem::size_of::<WebPAnimInfo>(), 9 * 4);
        assert_eq!(
            std::mem::size_of::<WebPData>(),
            2 * std::mem::size_of::<usize>()
        );
    }
}
