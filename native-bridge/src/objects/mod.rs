//! The wrapped native object kinds.
//!
//! Every kind is a [`Wrapper`] over its own state type, which implements
//! [`NativeObject`] to plug into the shared registry and disposal protocol.
//! Kinds that receive events also implement [`EventTarget`] and submit a
//! dispatcher for their route family.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::events::{Dispatch, Event};
use crate::handle::{NativeHandle, ObjectKind};
use crate::lifecycle::{NativeObject, Slot, Wrapper};
use crate::native::OpenRequest;
use crate::registry::SecondaryIndex;
use crate::trampoline::CallbackCell;

pub mod audio;
pub mod controller;
pub mod cursor;
pub mod haptic;
pub mod io;
pub mod joystick;
pub mod renderer;
pub mod texture;
pub mod timer;
pub mod window;

pub use audio::{AudioDevice, AudioDeviceState};
pub use controller::{GameController, GameControllerState};
pub use cursor::{Cursor, CursorState, SystemCursor};
pub use haptic::{Haptic, HapticState};
pub use io::{IoSource, IoState, IoStream, ReadSeek, WriteSeek};
pub use joystick::{Joystick, JoystickState};
pub use renderer::{Renderer, RendererState};
pub use texture::{Texture, TextureState};
pub use timer::{Timer, TimerHandler, TimerState};
pub use window::{Window, WindowState};

/// Per-object event handler.
pub type EventHandler<T> = dyn Fn(&Wrapper<T>, &Event) + Send + Sync;

/// A kind whose events are routed to a per-object handler.
pub trait EventTarget: NativeObject {
    fn event_handler(&self) -> &CallbackCell<EventHandler<Self>>;
}

impl<T: EventTarget> Wrapper<T> {
    /// Install the handler for events addressed to this object, replacing
    /// any previous one.
    pub fn on_event(
        &self,
        handler: impl Fn(&Wrapper<T>, &Event) + Send + Sync + 'static,
    ) -> Result<()> {
        self.slot().ensure_live()?;
        self.state().event_handler().set(Arc::new(handler));
        Ok(())
    }

    pub fn clear_event_handler(&self) -> bool {
        self.state().event_handler().clear()
    }
}

/// Deliver `event` to the object registered for `id` in `index`.
pub(crate) fn dispatch_indexed<T: EventTarget>(
    index: &SecondaryIndex<Slot<T>>,
    id: u32,
    event: &Event,
) -> Dispatch {
    let Some(slot) = index.lookup(id) else {
        return Dispatch::Unrouted;
    };
    let target = Wrapper::from_slot(slot);
    if target.is_disposed() {
        return Dispatch::Unrouted;
    }
    match target.state().event_handler().get() {
        Some(handler) => {
            handler(&target, event);
            Dispatch::Delivered
        }
        None => Dispatch::NoHandler,
    }
}

/// Error for a forwarded call that reported failure, carrying the native
/// error text.
pub(crate) fn native_failure<T: NativeObject>(object: &Wrapper<T>, operation: &'static str) -> Error {
    let message = object
        .slot()
        .backend()
        .take_error()
        .unwrap_or_else(|| "unknown native error".to_string());
    Error::Native { operation, message }
}

/// A wrapper of any kind, as returned by [`open`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnyObject {
    Window(Window),
    Renderer(Renderer),
    Texture(Texture),
    Cursor(Cursor),
    Joystick(Joystick),
    GameController(GameController),
    Haptic(Haptic),
    AudioDevice(AudioDevice),
}

macro_rules! each_object {
    ($self:expr, $object:ident => $body:expr) => {
        match $self {
            AnyObject::Window($object) => $body,
            AnyObject::Renderer($object) => $body,
            AnyObject::Texture($object) => $body,
            AnyObject::Cursor($object) => $body,
            AnyObject::Joystick($object) => $body,
            AnyObject::GameController($object) => $body,
            AnyObject::Haptic($object) => $body,
            AnyObject::AudioDevice($object) => $body,
        }
    };
}

impl AnyObject {
    pub fn kind(&self) -> ObjectKind {
        each_object!(self, object => object.kind())
    }

    pub fn handle(&self) -> Result<NativeHandle> {
        each_object!(self, object => object.handle())
    }

    pub fn dispose(&self) -> bool {
        each_object!(self, object => object.dispose())
    }

    pub fn is_disposed(&self) -> bool {
        each_object!(self, object => object.is_disposed())
    }

    pub fn into_window(self) -> Option<Window> {
        match self {
            AnyObject::Window(window) => Some(window),
            _ => None,
        }
    }
}

/// Open any kind of object from its native open arguments.
///
/// Renderers and textures name their parent by handle; the parent must be a
/// live wrapper.
pub fn open(request: &OpenRequest<'_>) -> Result<AnyObject> {
    Ok(match *request {
        OpenRequest::Window {
            title,
            x,
            y,
            width,
            height,
            flags,
        } => AnyObject::Window(Window::open_c(title, x, y, width, height, flags)?),
        OpenRequest::Renderer {
            window,
            index,
            flags,
        } => {
            let parent =
                Window::lookup(window).ok_or_else(|| Error::lookup_miss(ObjectKind::Window, window))?;
            AnyObject::Renderer(Renderer::create(&parent, index, flags)?)
        }
        OpenRequest::Texture {
            renderer,
            format,
            access,
            width,
            height,
        } => {
            let parent = Renderer::lookup(renderer)
                .ok_or_else(|| Error::lookup_miss(ObjectKind::Renderer, renderer))?;
            AnyObject::Texture(Texture::create(&parent, format, access, width, height)?)
        }
        OpenRequest::Cursor { system } => AnyObject::Cursor(Cursor::system(SystemCursor(system))?),
        OpenRequest::Joystick { device_index } => AnyObject::Joystick(Joystick::open(device_index)?),
        OpenRequest::GameController { device_index } => {
            AnyObject::GameController(GameController::open(device_index)?)
        }
        OpenRequest::Haptic { device_index } => AnyObject::Haptic(Haptic::open(device_index)?),
        OpenRequest::AudioDevice {
            device,
            capture,
            spec,
        } => AnyObject::AudioDevice(AudioDevice::open_c(device, capture, spec)?),
    })
}

/// Live wrappers per kind.
pub fn live_counts() -> [(ObjectKind, usize); 10] {
    [
        (ObjectKind::Window, window::WINDOWS.live_count()),
        (ObjectKind::Renderer, renderer::RENDERERS.live_count()),
        (ObjectKind::Texture, texture::TEXTURES.live_count()),
        (ObjectKind::Cursor, cursor::CURSORS.live_count()),
        (ObjectKind::Joystick, joystick::JOYSTICKS.live_count()),
        (ObjectKind::GameController, controller::CONTROLLERS.live_count()),
        (ObjectKind::Haptic, haptic::HAPTICS.live_count()),
        (ObjectKind::AudioDevice, audio::AUDIO_DEVICES.live_count()),
        (ObjectKind::Timer, timer::TIMERS.live_count()),
        (ObjectKind::IoStream, io::IO_STREAMS.live_count()),
    ]
}

/// Log every kind that still has live wrappers.
pub(crate) fn report_live() {
    for (kind, live) in live_counts() {
        if live > 0 {
            tracing::warn!(%kind, live, "objects still alive at shutdown");
        }
    }
}
