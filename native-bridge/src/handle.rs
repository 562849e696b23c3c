//! Native handles and object kinds.
//!
//! A [`NativeHandle`] is the opaque, pointer-sized value the native library
//! hands out for every object it owns. The bridge only ever compares handles
//! by value and passes them back to the native side; it never dereferences
//! them.

use std::ffi::c_void;
use std::fmt;

/// Opaque identifier of a native-library-owned object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NativeHandle(usize);

impl NativeHandle {
    /// The invalid handle. Open primitives return this on failure.
    pub const NULL: NativeHandle = NativeHandle(0);

    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> usize {
        self.0
    }

    /// Handle for a pointer-valued native object.
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    /// Handle for an integer-valued native object (audio devices, timers).
    pub const fn from_id(id: u32) -> Self {
        Self(id as usize)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle({:#x})", self.0)
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Every kind of native object the bridge wraps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Window,
    Renderer,
    Texture,
    Cursor,
    Joystick,
    GameController,
    Haptic,
    AudioDevice,
    Timer,
    IoStream,
}

impl ObjectKind {
    pub const fn name(self) -> &'static str {
        match self {
            ObjectKind::Window => "window",
            ObjectKind::Renderer => "renderer",
            ObjectKind::Texture => "texture",
            ObjectKind::Cursor => "cursor",
            ObjectKind::Joystick => "joystick",
            ObjectKind::GameController => "game controller",
            ObjectKind::Haptic => "haptic",
            ObjectKind::AudioDevice => "audio device",
            ObjectKind::Timer => "timer",
            ObjectKind::IoStream => "io stream",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
