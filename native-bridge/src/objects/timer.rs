//! Timers.
//!
//! The handle of a timer is the native timer id. The trampoline never sees
//! that id: it receives the context token chosen before the timer was added,
//! and resolves it through the token index.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::handle::{NativeHandle, ObjectKind};
use crate::lifecycle::{NativeObject, Slot, Wrapper, adopt};
use crate::registry::{HandleRegistry, Registry, SecondaryIndex};
use crate::runtime;
use crate::trampoline::CallbackCell;
use crate::trampoline::timer::{next_token, timer_trampoline, token_param};

pub(crate) static TIMERS: HandleRegistry<Slot<TimerState>> = Registry::new(ObjectKind::Timer);
static TIMER_TOKENS: SecondaryIndex<Slot<TimerState>> = Registry::new(ObjectKind::Timer);

/// Held from `add_timer` until the new timer is registered, so an expiry on
/// another thread cannot miss a timer that is still being set up.
static STARTING: Mutex<()> = parking_lot::const_mutex(());

pub type Timer = Wrapper<TimerState>;

/// Called on expiry with the current interval; returns the next interval, or
/// 0 to stop the timer.
pub type TimerHandler = dyn Fn(&Timer, u32) -> u32 + Send + Sync;

pub struct TimerState {
    token: u32,
    interval: u32,
    handler: CallbackCell<TimerHandler>,
}

impl TimerState {
    pub(crate) fn handler(&self) -> Option<Arc<TimerHandler>> {
        self.handler.get()
    }
}

impl NativeObject for TimerState {
    const KIND: ObjectKind = ObjectKind::Timer;

    fn registry() -> &'static HandleRegistry<Slot<Self>> {
        &TIMERS
    }

    fn index(slot: &Arc<Slot<Self>>) {
        TIMER_TOKENS.register(slot.state().token, slot);
    }

    fn unindex(slot: &Slot<Self>) {
        TIMER_TOKENS.unregister(slot.state().token, slot);
    }

    fn destroy(slot: &Slot<Self>) {
        let id = slot.raw_handle().as_raw() as i32;
        if !slot.backend().remove_timer(id) {
            tracing::debug!(id, "timer was already gone natively");
        }
    }
}

pub(crate) fn lookup_token(token: u32) -> Option<Timer> {
    let _starting = STARTING.lock();
    TIMER_TOKENS.lookup(token).map(Wrapper::from_slot)
}

impl Wrapper<TimerState> {
    /// Start a timer that fires after `interval_ms` and then at whatever
    /// interval `handler` returns. Dropping or disposing the timer stops it.
    pub fn start(
        interval_ms: u32,
        handler: impl Fn(&Timer, u32) -> u32 + Send + Sync + 'static,
    ) -> Result<Timer> {
        let backend = runtime::backend_for_open()?;
        let token = next_token();
        let handler: Arc<TimerHandler> = Arc::new(handler);

        let _starting = STARTING.lock();
        let id = backend.add_timer(interval_ms, timer_trampoline, token_param(token));
        let handle = match u32::try_from(id) {
            Ok(id) => NativeHandle::from_id(id),
            Err(_) => NativeHandle::NULL,
        };
        adopt(backend, handle, move |_, _| {
            let state = TimerState {
                token,
                interval: interval_ms,
                handler: CallbackCell::new(),
            };
            state.handler.set(handler);
            state
        })
    }

    /// The native timer id.
    pub fn id(&self) -> Result<i32> {
        Ok(self.handle()?.as_raw() as i32)
    }

    /// The interval the timer was started with.
    pub fn initial_interval(&self) -> u32 {
        self.state().interval
    }

    /// Stop the timer. Same as [`Timer::dispose`].
    pub fn cancel(&self) -> bool {
        self.dispose()
    }
}
