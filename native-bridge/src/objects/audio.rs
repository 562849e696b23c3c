//! Audio devices.
//!
//! The native library identifies an open audio device by a small integer id
//! rather than a pointer; 0 means the open failed. The id is both the handle
//! and the key "device removed" events carry.

use std::ffi::CStr;
use std::ffi::CString;
use std::sync::Arc;

use super::{EventHandler, EventTarget, dispatch_indexed};
use crate::error::{Error, Result};
use crate::events::{self, Dispatch, Event, Route, RouteFamily, RouteSpec};
use crate::handle::ObjectKind;
use crate::lifecycle::{NativeObject, Slot, Wrapper, adopt};
use crate::native::{AudioSpec, OpenRequest};
use crate::registry::{HandleRegistry, Registry, SecondaryIndex};
use crate::runtime;
use crate::trampoline::CallbackCell;

pub(crate) static AUDIO_DEVICES: HandleRegistry<Slot<AudioDeviceState>> =
    Registry::new(ObjectKind::AudioDevice);
static AUDIO_DEVICE_IDS: SecondaryIndex<Slot<AudioDeviceState>> =
    Registry::new(ObjectKind::AudioDevice);

pub type AudioDevice = Wrapper<AudioDeviceState>;

pub struct AudioDeviceState {
    id: u32,
    capture: bool,
    spec: AudioSpec,
    events: CallbackCell<EventHandler<AudioDeviceState>>,
}

impl NativeObject for AudioDeviceState {
    const KIND: ObjectKind = ObjectKind::AudioDevice;

    fn registry() -> &'static HandleRegistry<Slot<Self>> {
        &AUDIO_DEVICES
    }

    fn index(slot: &Arc<Slot<Self>>) {
        AUDIO_DEVICE_IDS.register(slot.state().id, slot);
    }

    fn unindex(slot: &Slot<Self>) {
        AUDIO_DEVICE_IDS.unregister(slot.state().id, slot);
    }

    fn destroy(slot: &Slot<Self>) {
        slot.backend().close(Self::KIND, slot.raw_handle());
    }

    fn retired(slot: &Slot<Self>) {
        events::retire_route(slot.backend(), Route::AudioDevice(slot.state().id));
    }
}

impl EventTarget for AudioDeviceState {
    fn event_handler(&self) -> &CallbackCell<EventHandler<Self>> {
        &self.events
    }
}

fn dispatch_audio_device(route: Route, event: &Event) -> Dispatch {
    match route {
        Route::AudioDevice(id) => dispatch_indexed(&AUDIO_DEVICE_IDS, id, event),
        _ => Dispatch::Unrouted,
    }
}

inventory::submit! { RouteSpec::new(RouteFamily::AudioDevice, dispatch_audio_device) }

impl Wrapper<AudioDeviceState> {
    /// Open an audio device by name, or the default device with `None`.
    pub fn open(device: Option<&str>, capture: bool, spec: AudioSpec) -> Result<AudioDevice> {
        let device = device
            .map(CString::new)
            .transpose()
            .map_err(|_| Error::InvalidArgument("audio device name contains a NUL byte".to_string()))?;
        Self::open_c(device.as_deref(), capture, spec)
    }

    pub fn open_c(device: Option<&CStr>, capture: bool, spec: AudioSpec) -> Result<AudioDevice> {
        let backend = runtime::backend_for_open()?;
        let handle = backend.open(&OpenRequest::AudioDevice {
            device,
            capture,
            spec,
        });
        adopt(backend, handle, |_, handle| AudioDeviceState {
            id: handle.as_raw() as u32,
            capture,
            spec,
            events: CallbackCell::new(),
        })
    }

    pub fn from_id(id: u32) -> Option<AudioDevice> {
        AUDIO_DEVICE_IDS.lookup(id).map(Wrapper::from_slot)
    }

    pub fn id(&self) -> Result<u32> {
        self.slot().ensure_live()?;
        Ok(self.state().id)
    }

    pub fn is_capture(&self) -> bool {
        self.state().capture
    }

    /// The format the device was opened with.
    pub fn spec(&self) -> AudioSpec {
        self.state().spec
    }

    pub fn pause(&self) -> Result<()> {
        let id = self.state().id;
        self.with_live(|backend, _| backend.pause_audio_device(id, true))
    }

    pub fn resume(&self) -> Result<()> {
        let id = self.state().id;
        self.with_live(|backend, _| backend.pause_audio_device(id, false))
    }
}
