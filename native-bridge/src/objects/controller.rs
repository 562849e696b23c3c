//! Game controllers: joysticks with a known button mapping. Their events
//! come tagged with the underlying joystick's instance id.

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

pub(crate) static CONTROLLERS: HandleRegistry<Slot<GameControllerState>> =
    Registry::new(ObjectKind::GameController);
static CONTROLLER_IDS: SecondaryIndex<Slot<GameControllerState>> =
    Registry::new(ObjectKind::GameController);

pub type GameController = Wrapper<GameControllerState>;

pub struct GameControllerState {
    instance_id: u32,
    events: CallbackCell<EventHandler<GameControllerState>>,
}

impl NativeObject for GameControllerState {
    const KIND: ObjectKind = ObjectKind::GameController;
    const SHARED_OPEN: bool = true;

    fn registry() -> &'static HandleRegistry<Slot<Self>> {
        &CONTROLLERS
    }

    fn index(slot: &Arc<Slot<Self>>) {
        CONTROLLER_IDS.register(slot.state().instance_id, slot);
    }

    fn unindex(slot: &Slot<Self>) {
        CONTROLLER_IDS.unregister(slot.state().instance_id, slot);
    }

    fn destroy(slot: &Slot<Self>) {
        slot.backend().close(Self::KIND, slot.raw_handle());
    }

    fn retired(slot: &Slot<Self>) {
        events::retire_route(slot.backend(), Route::Controller(slot.state().instance_id));
    }
}

impl EventTarget for GameControllerState {
    fn event_handler(&self) -> &CallbackCell<EventHandler<Self>> {
        &self.events
    }
}

fn dispatch_controller(route: Route, event: &Event) -> Dispatch {
    match route {
        Route::Controller(id) => dispatch_indexed(&CONTROLLER_IDS, id, event),
        _ => Dispatch::Unrouted,
    }
}

inventory::submit! { RouteSpec::new(RouteFamily::Controller, dispatch_controller) }

impl Wrapper<GameControllerState> {
    pub fn open(device_index: i32) -> Result<GameController> {
        let backend = runtime::backend_for_open()?;
        let handle = backend.open(&OpenRequest::GameController { device_index });
        adopt(backend, handle, |backend, handle| GameControllerState {
            instance_id: backend.object_id(ObjectKind::GameController, handle),
            events: CallbackCell::new(),
        })
    }

    pub fn from_instance_id(instance_id: u32) -> Option<GameController> {
        CONTROLLER_IDS.lookup(instance_id).map(Wrapper::from_slot)
    }

    pub fn instance_id(&self) -> Result<u32> {
        self.slot().ensure_live()?;
        Ok(self.state().instance_id)
    }

    pub fn name(&self) -> Result<Option<String>> {
        self.with_live(|backend, handle| backend.device_name(ObjectKind::GameController, handle))
    }

    pub fn rumble(&self, low_frequency: u16, high_frequency: u16, duration_ms: u32) -> Result<()> {
        let status = self.with_live(|backend, handle| {
            backend.rumble(
                ObjectKind::GameController,
                handle,
                low_frequency,
                high_frequency,
                duration_ms,
            )
        })?;
        if status != 0 {
            return Err(native_failure(self, "rumble"));
        }
        Ok(())
    }
}
