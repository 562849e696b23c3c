use std::sync::atomic::{AtomicBool, Ordering};

use super::native_failure;
use crate::error::{Error, Result};
use crate::handle::ObjectKind;
use crate::lifecycle::{NativeObject, Slot, Wrapper, adopt};
use crate::native::OpenRequest;
use crate::registry::{HandleRegistry, Registry};
use crate::runtime;

pub(crate) static HAPTICS: HandleRegistry<Slot<HapticState>> = Registry::new(ObjectKind::Haptic);

pub type Haptic = Wrapper<HapticState>;

pub struct HapticState {
    rumble_ready: AtomicBool,
}

impl NativeObject for HapticState {
    const KIND: ObjectKind = ObjectKind::Haptic;
    const SHARED_OPEN: bool = true;

    fn registry() -> &'static HandleRegistry<Slot<Self>> {
        &HAPTICS
    }

    fn destroy(slot: &Slot<Self>) {
        slot.backend().close(Self::KIND, slot.raw_handle());
    }
}

impl Wrapper<HapticState> {
    pub fn open(device_index: i32) -> Result<Haptic> {
        let backend = runtime::backend_for_open()?;
        let handle = backend.open(&OpenRequest::Haptic { device_index });
        adopt(backend, handle, |_, _| HapticState {
            rumble_ready: AtomicBool::new(false),
        })
    }

    /// Prepare the simple rumble effect. Required once before
    /// [`Haptic::rumble_play`].
    pub fn rumble_init(&self) -> Result<()> {
        let status = self.with_live(|backend, handle| backend.haptic_rumble_init(handle))?;
        if status != 0 {
            return Err(native_failure(self, "haptic_rumble_init"));
        }
        self.state().rumble_ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Play the rumble effect. `strength` is clamped to `0.0..=1.0`.
    pub fn rumble_play(&self, strength: f32, length_ms: u32) -> Result<()> {
        self.slot().ensure_live()?;
        if !self.state().rumble_ready.load(Ordering::Acquire) {
            return Err(Error::InvalidArgument(
                "rumble_init must succeed before rumble_play".to_string(),
            ));
        }
        let strength = if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) };
        let status =
            self.with_live(|backend, handle| backend.haptic_rumble_play(handle, strength, length_ms))?;
        if status != 0 {
            return Err(native_failure(self, "haptic_rumble_play"));
        }
        Ok(())
    }
}
