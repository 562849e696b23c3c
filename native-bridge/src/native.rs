//! Boundary to the native library.
//!
//! The one-to-one function catalogue of the native library lives outside this
//! crate. Everything the bridge needs from it is collected in the
//! [`NativeBackend`] trait: open/close primitives, the event-queue pop, the
//! error channel, the callback registration primitives, and the few forwarded
//! calls the object wrappers expose.

use std::ffi::{CStr, c_char, c_int, c_void};

use crate::events::RawEvent;
use crate::handle::{NativeHandle, ObjectKind};

/// Native log sink signature.
pub type LogOutputFn = unsafe extern "C" fn(
    userdata: *mut c_void,
    category: c_int,
    priority: c_int,
    message: *const c_char,
);

/// Native per-window hit-test signature.
pub type HitTestFn =
    unsafe extern "C" fn(window: *mut c_void, area: *const RawPoint, data: *mut c_void) -> c_int;

/// Native timer signature. The return value is the next interval; 0 cancels.
pub type TimerFn = unsafe extern "C" fn(interval: u32, param: *mut c_void) -> u32;

pub type IoSizeFn = unsafe extern "C" fn(context: *mut RawIo) -> i64;
pub type IoSeekFn = unsafe extern "C" fn(context: *mut RawIo, offset: i64, whence: c_int) -> i64;
pub type IoReadFn =
    unsafe extern "C" fn(context: *mut RawIo, ptr: *mut c_void, size: usize, maxnum: usize) -> usize;
pub type IoWriteFn =
    unsafe extern "C" fn(context: *mut RawIo, ptr: *const c_void, size: usize, num: usize) -> usize;
pub type IoCloseFn = unsafe extern "C" fn(context: *mut RawIo) -> c_int;

/// Seek origins used by the native I/O object.
pub const IO_SEEK_SET: c_int = 0;
pub const IO_SEEK_CUR: c_int = 1;
pub const IO_SEEK_END: c_int = 2;

/// Type tag of an I/O object whose operations are implemented by the client.
pub const IO_KIND_USER: u32 = 0;

/// The native custom I/O object: a table of function-pointer slots that the
/// native library calls through. The pointer to this struct is the handle.
#[repr(C)]
#[derive(Debug)]
pub struct RawIo {
    pub size: Option<IoSizeFn>,
    pub seek: Option<IoSeekFn>,
    pub read: Option<IoReadFn>,
    pub write: Option<IoWriteFn>,
    pub close: Option<IoCloseFn>,
    pub kind: u32,
}

impl RawIo {
    pub const fn empty() -> Self {
        Self {
            size: None,
            seek: None,
            read: None,
            write: None,
            close: None,
            kind: IO_KIND_USER,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawPoint {
    pub x: c_int,
    pub y: c_int,
}

/// Audio format requested when opening an audio device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioSpec {
    pub freq: i32,
    pub format: u16,
    pub channels: u8,
    pub samples: u16,
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self {
            freq: 48_000,
            format: 0x8120, // signed 16-bit, little endian
            channels: 2,
            samples: 4096,
        }
    }
}

/// Format and dimensions of a texture, queried once at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureInfo {
    pub format: u32,
    pub access: i32,
    pub width: i32,
    pub height: i32,
}

/// Arguments of the native open/create primitives, one variant per kind.
///
/// Timers and I/O streams are not opened through this path: they come from
/// [`NativeBackend::add_timer`] and [`NativeBackend::alloc_io`].
#[derive(Clone, Copy, Debug)]
pub enum OpenRequest<'a> {
    Window {
        title: &'a CStr,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        flags: u32,
    },
    Renderer {
        window: NativeHandle,
        index: i32,
        flags: u32,
    },
    Texture {
        renderer: NativeHandle,
        format: u32,
        access: i32,
        width: i32,
        height: i32,
    },
    Cursor {
        system: u32,
    },
    Joystick {
        device_index: i32,
    },
    GameController {
        device_index: i32,
    },
    Haptic {
        device_index: i32,
    },
    AudioDevice {
        device: Option<&'a CStr>,
        capture: bool,
        spec: AudioSpec,
    },
}

impl OpenRequest<'_> {
    pub fn kind(&self) -> ObjectKind {
        match self {
            OpenRequest::Window { .. } => ObjectKind::Window,
            OpenRequest::Renderer { .. } => ObjectKind::Renderer,
            OpenRequest::Texture { .. } => ObjectKind::Texture,
            OpenRequest::Cursor { .. } => ObjectKind::Cursor,
            OpenRequest::Joystick { .. } => ObjectKind::Joystick,
            OpenRequest::GameController { .. } => ObjectKind::GameController,
            OpenRequest::Haptic { .. } => ObjectKind::Haptic,
            OpenRequest::AudioDevice { .. } => ObjectKind::AudioDevice,
        }
    }
}

/// The native library as seen by the bridge.
///
/// Implementations must tolerate calls from any thread: trampolines and
/// collector-driven releases do not run on the owner thread.
pub trait NativeBackend: Send + Sync + 'static {
    /// Create a native object. Returns [`NativeHandle::NULL`] on failure, with
    /// the reason left in the error channel.
    fn open(&self, request: &OpenRequest<'_>) -> NativeHandle;

    /// Destroy a native object created by [`NativeBackend::open`].
    fn close(&self, kind: ObjectKind, handle: NativeHandle);

    /// The numeric id events use for this object (window id, joystick
    /// instance id). Only called for kinds with a secondary index.
    fn object_id(&self, kind: ObjectKind, handle: NativeHandle) -> u32;

    /// Pop one record from the native event queue.
    fn poll_event(&self) -> Option<RawEvent>;

    fn set_error(&self, message: &str);

    fn take_error(&self) -> Option<String>;

    fn set_log_output(&self, callback: Option<LogOutputFn>, userdata: *mut c_void);

    /// Returns 0 on success.
    fn set_hit_test(
        &self,
        window: NativeHandle,
        callback: Option<HitTestFn>,
        data: *mut c_void,
    ) -> c_int;

    /// Returns the timer id, or 0 on failure.
    fn add_timer(&self, interval_ms: u32, callback: TimerFn, param: *mut c_void) -> i32;

    fn remove_timer(&self, id: i32) -> bool;

    /// Allocate an empty custom I/O object. Null on failure.
    fn alloc_io(&self) -> *mut RawIo;

    fn free_io(&self, io: *mut RawIo);

    fn set_window_title(&self, window: NativeHandle, title: &CStr);

    fn window_size(&self, window: NativeHandle) -> (i32, i32);

    fn render_clear(&self, renderer: NativeHandle) -> c_int;

    fn render_present(&self, renderer: NativeHandle);

    fn set_render_draw_color(&self, renderer: NativeHandle, r: u8, g: u8, b: u8, a: u8) -> c_int;

    fn render_copy(&self, renderer: NativeHandle, texture: NativeHandle) -> c_int;

    fn query_texture(&self, texture: NativeHandle) -> TextureInfo;

    fn set_cursor(&self, cursor: NativeHandle);

    /// Device name of a joystick or game controller.
    fn device_name(&self, kind: ObjectKind, handle: NativeHandle) -> Option<String>;

    /// Rumble a joystick or game controller. Returns 0 on success.
    fn rumble(
        &self,
        kind: ObjectKind,
        handle: NativeHandle,
        low_frequency: u16,
        high_frequency: u16,
        duration_ms: u32,
    ) -> c_int;

    fn haptic_rumble_init(&self, haptic: NativeHandle) -> c_int;

    fn haptic_rumble_play(&self, haptic: NativeHandle, strength: f32, length_ms: u32) -> c_int;

    fn pause_audio_device(&self, device: u32, pause: bool);
}
