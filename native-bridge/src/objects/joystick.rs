//! Joysticks.
//!
//! Joystick events carry the instance id the native library assigned when
//! the device was opened, which differs from both the device index used to
//! open it and the handle.
//!
//! Opening a device that is already open yields the existing wrapper.

use std::sync::Arc;

use super::{EventHandler, EventTarget, dispatch_indexed, native_failure};
use crate::error::Result;
use crate::events::{self, Dispatch, Event, Route, RouteFamily, RouteSpec};
use crate::handle::ObjectKind;
use crate::lifecycle::{NativeObject, Slot, Wrapper, adopt};
use crate::native::OpenRequest;
use crate::registry::{HandleRegistry, Registry, SecondaryIndex};
use crate::runtime;
use crate::trampoline::CallbackCell;

pub(crate) static JOYSTICKS: HandleRegistry<Slot<JoystickState>> = Registry::new(ObjectKind::Joystick);
static JOYSTICK_IDS: SecondaryIndex<Slot<JoystickState>> = Registry::new(ObjectKind::Joystick);

pub type Joystick = Wrapper<JoystickState>;

pub struct JoystickState {
    instance_id: u32,
    events: CallbackCell<EventHandler<JoystickState>>,
}

impl NativeObject for JoystickState {
    const KIND: ObjectKind = ObjectKind::Joystick;
    const SHARED_OPEN: bool = true;

    fn registry() -> &'static HandleRegistry<Slot<Self>> {
        &JOYSTICKS
    }

    fn index(slot: &Arc<Slot<Self>>) {
        JOYSTICK_IDS.register(slot.state().instance_id, slot);
    }

    fn unindex(slot: &Slot<Self>) {
        JOYSTICK_IDS.unregister(slot.state().instance_id, slot);
    }

    fn destroy(slot: &Slot<Self>) {
        slot.backend().close(Self::KIND, slot.raw_handle());
    }

    fn retired(slot: &Slot<Self>) {
        events::retire_route(slot.backend(), Route::Joystick(slot.state().instance_id));
    }
}

impl EventTarget for JoystickState {
    fn event_handler(&self) -> &CallbackCell<EventHandler<Self>> {
        &self.events
    }
}

fn dispatch_joystick(route: Route, event: &Event) -> Dispatch {
    match route {
        Route::Joystick(id) => dispatch_indexed(&JOYSTICK_IDS, id, event),
        _ => Dispatch::Unrouted,
    }
}

inventory::submit! { RouteSpec::new(RouteFamily::Joystick, dispatch_joystick) }

impl Wrapper<JoystickState> {
    pub fn open(device_index: i32) -> Result<Joystick> {
        let backend = runtime::backend_for_open()?;
        let handle = backend.open(&OpenRequest::Joystick { device_index });
        adopt(backend, handle, |backend, handle| JoystickState {
            instance_id: backend.object_id(ObjectKind::Joystick, handle),
            events: CallbackCell::new(),
        })
    }

    pub fn from_instance_id(instance_id: u32) -> Option<Joystick> {
        JOYSTICK_IDS.lookup(instance_id).map(Wrapper::from_slot)
    }

    pub fn instance_id(&self) -> Result<u32> {
        self.slot().ensure_live()?;
        Ok(self.state().instance_id)
    }

    pub fn name(&self) -> Result<Option<String>> {
        self.with_live(|backend, handle| backend.device_name(ObjectKind::Joystick, handle))
    }

    pub fn rumble(&self, low_frequency: u16, high_frequency: u16, duration_ms: u32) -> Result<()> {
        let status = self.with_live(|backend, handle| {
            backend.rumble(ObjectKind::Joystick, handle, low_frequency, high_frequency, duration_ms)
        })?;
        if status != 0 {
            return Err(native_failure(self, "rumble"));
        }
        Ok(())
    }
}
