//! Windows.
//!
//! Window events carry the numeric window id, not the handle, so every window
//! is also registered in the window-id index. A window owns the renderers
//! created for it; they are released before the window itself.

use std::ffi::CStr;
use std::ffi::CString;
use std::sync::Arc;

use super::renderer::RendererState;
use super::{EventHandler, EventTarget, dispatch_indexed, native_failure};
use crate::error::{Error, Result};
use crate::events::{self, Dispatch, Event, Route, RouteFamily, RouteSpec};
use crate::handle::ObjectKind;
use crate::lifecycle::{Children, NativeObject, ReleasePath, Slot, Wrapper, adopt};
use crate::native::{OpenRequest, RawPoint};
use crate::registry::{HandleRegistry, Registry, SecondaryIndex};
use crate::runtime;
use crate::trampoline::CallbackCell;
use crate::trampoline::hit_test::{HitTest, HitTestHandler, hit_test_trampoline};

pub(crate) static WINDOWS: HandleRegistry<Slot<WindowState>> = Registry::new(ObjectKind::Window);
static WINDOW_IDS: SecondaryIndex<Slot<WindowState>> = Registry::new(ObjectKind::Window);

pub type Window = Wrapper<WindowState>;

pub struct WindowState {
    id: u32,
    hit_test: CallbackCell<HitTestHandler>,
    events: CallbackCell<EventHandler<WindowState>>,
    pub(crate) renderers: Children<RendererState>,
}

impl WindowState {
    pub(crate) fn hit_test_handler(&self) -> Option<Arc<HitTestHandler>> {
        self.hit_test.get()
    }
}

impl NativeObject for WindowState {
    const KIND: ObjectKind = ObjectKind::Window;

    fn registry() -> &'static HandleRegistry<Slot<Self>> {
        &WINDOWS
    }

    fn index(slot: &Arc<Slot<Self>>) {
        WINDOW_IDS.register(slot.state().id, slot);
    }

    fn unindex(slot: &Slot<Self>) {
        WINDOW_IDS.unregister(slot.state().id, slot);
    }

    fn release_children(slot: &Slot<Self>, _path: ReleasePath) {
        slot.state().renderers.release_all(ReleasePath::ParentReleased);
    }

    fn destroy(slot: &Slot<Self>) {
        if slot.state().hit_test.clear() {
            slot.backend()
                .set_hit_test(slot.raw_handle(), None, std::ptr::null_mut());
        }
        slot.backend().close(Self::KIND, slot.raw_handle());
    }

    fn retired(slot: &Slot<Self>) {
        events::retire_route(slot.backend(), Route::Window(slot.state().id));
    }
}

impl EventTarget for WindowState {
    fn event_handler(&self) -> &CallbackCell<EventHandler<Self>> {
        &self.events
    }
}

fn dispatch_window(route: Route, event: &Event) -> Dispatch {
    match route {
        Route::Window(id) => dispatch_indexed(&WINDOW_IDS, id, event),
        _ => Dispatch::Unrouted,
    }
}

inventory::submit! { RouteSpec::new(RouteFamily::Window, dispatch_window) }

impl Wrapper<WindowState> {
    /// Create a window.
    pub fn open(title: &str, x: i32, y: i32, width: i32, height: i32, flags: u32) -> Result<Window> {
        let title = CString::new(title)
            .map_err(|_| Error::InvalidArgument("window title contains a NUL byte".to_string()))?;
        Self::open_c(&title, x, y, width, height, flags)
    }

    pub fn open_c(title: &CStr, x: i32, y: i32, width: i32, height: i32, flags: u32) -> Result<Window> {
        let backend = runtime::backend_for_open()?;
        let handle = backend.open(&OpenRequest::Window {
            title,
            x,
            y,
            width,
            height,
            flags,
        });
        adopt(backend, handle, |backend, handle| WindowState {
            id: backend.object_id(ObjectKind::Window, handle),
            hit_test: CallbackCell::new(),
            events: CallbackCell::new(),
            renderers: Children::new(),
        })
    }

    /// The live window with the given window id.
    pub fn from_id(id: u32) -> Option<Window> {
        WINDOW_IDS.lookup(id).map(Wrapper::from_slot)
    }

    /// The numeric id window events carry.
    pub fn id(&self) -> Result<u32> {
        self.slot().ensure_live()?;
        Ok(self.state().id)
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        let title = CString::new(title)
            .map_err(|_| Error::InvalidArgument("window title contains a NUL byte".to_string()))?;
        self.with_live(|backend, handle| backend.set_window_title(handle, &title))
    }

    pub fn size(&self) -> Result<(i32, i32)> {
        self.with_live(|backend, handle| backend.window_size(handle))
    }

    /// Install a hit-test handler. The native library calls it on its own
    /// schedule, possibly from another thread.
    pub fn set_hit_test(
        &self,
        handler: impl Fn(&Window, RawPoint) -> HitTest + Send + Sync + 'static,
    ) -> Result<()> {
        self.slot().ensure_live()?;
        self.state().hit_test.set(Arc::new(handler));
        let status = self.with_live(|backend, handle| {
            backend.set_hit_test(handle, Some(hit_test_trampoline), std::ptr::null_mut())
        })?;
        if status != 0 {
            self.state().hit_test.clear();
            return Err(native_failure(self, "set_hit_test"));
        }
        Ok(())
    }

    pub fn clear_hit_test(&self) -> Result<()> {
        self.with_live(|backend, handle| {
            backend.set_hit_test(handle, None, std::ptr::null_mut())
        })?;
        self.state().hit_test.clear();
        Ok(())
    }

    /// Number of live renderers attached to this window.
    pub fn renderer_count(&self) -> usize {
        self.state().renderers.live_count()
    }
}
