//! native-bridge - Safe ownership and callback plumbing for a C-ABI multimedia library
//!
//! The native library hands out opaque handles, reports events by numeric id
//! and calls back through function pointers on threads of its choosing. This
//! crate keeps managed wrappers of those objects consistent with the native
//! side:
//!
//! - [`registry`] - handle (and id) to live wrapper, non-owning
//! - [`lifecycle`] - the release-exactly-once protocol shared by every kind
//! - [`trampoline`] - static `extern "C"` entry points with fault containment
//! - [`events`] - decoding of the native event record and per-object routing
//! - [`objects`] - the wrapped kinds: windows, renderers, textures, devices, timers, I/O
//! - [`runtime`] - backend installation, configuration and the owner thread
//!
//! The native library itself is reached through the [`NativeBackend`] trait.

pub mod error;
pub mod events;
mod handle;
pub mod lifecycle;
pub mod native;
pub mod objects;
pub mod registry;
pub mod runtime;
pub mod trampoline;

pub use error::{Error, Result};
pub use events::{Event, EventKind, RawEvent, drain_events, pump_events};
pub use handle::{NativeHandle, ObjectKind};
pub use lifecycle::{ReleasePath, Wrapper};
pub use native::{NativeBackend, OpenRequest};
pub use objects::{
    AnyObject, AudioDevice, Cursor, GameController, Haptic, IoSource, IoStream, Joystick, Renderer,
    Texture, Timer, Window, open,
};
pub use runtime::{BridgeBuilder, BridgeConfig, init, run_on_owner_thread, shutdown};
pub use trampoline::hit_test::HitTest;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::events::{
        Event, EventKind, WindowEvent, drain_events, on_device_added, on_global_event, on_touch,
        pump_events,
    };
    pub use crate::handle::{NativeHandle, ObjectKind};
    pub use crate::objects::{
        AudioDevice, Cursor, GameController, Haptic, IoSource, IoStream, Joystick, Renderer,
        Texture, Timer, Window,
    };
    pub use crate::runtime::{BridgeBuilder, run_on_owner_thread};
    pub use crate::trampoline::hit_test::HitTest;
}
