//! Event demultiplexer.
//!
//! Each object kind that receives events submits a [`RouteSpec`] for its
//! route family; the table is collected once via `inventory`. A pump step pops
//! one record, decodes it, and hands it to the dispatcher of its family, which
//! resolves the target through its secondary index. Events for ids with no
//! live target are dropped without error.
//!
//! Releasing a routing target retires its route: every event still waiting in
//! the native queue is moved into a pending buffer and those addressed to the
//! released id are discarded. The pump serves the pending buffer before the
//! native queue, so an id the native library hands out again never receives
//! an event queued for its previous owner.
//!
//! Only the owner thread pops the native queue. A route retired on any other
//! thread (a finalizer, a callback thread) is recorded and settled by the
//! owner at its next pump step or open, whichever comes first.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use spin::RwLock;

use super::event::{Event, Route, RouteFamily};
use crate::error::Result;
use crate::native::NativeBackend;
use crate::runtime;
use crate::trampoline::CallbackCell;

/// Outcome of dispatching one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler ran.
    Delivered,
    /// The target exists but has no handler installed.
    NoHandler,
    /// No live target for the event's id.
    Unrouted,
}

/// Dispatcher of one route family, collected with `inventory`.
#[derive(Clone, Copy)]
pub struct RouteSpec {
    family: RouteFamily,
    dispatch: fn(Route, &Event) -> Dispatch,
}

impl RouteSpec {
    pub const fn new(family: RouteFamily, dispatch: fn(Route, &Event) -> Dispatch) -> Self {
        Self { family, dispatch }
    }

    pub const fn family(&self) -> RouteFamily {
        self.family
    }
}

inventory::collect!(RouteSpec);

static ROUTES: Lazy<BTreeMap<RouteFamily, fn(Route, &Event) -> Dispatch>> = Lazy::new(|| {
    let mut routes = BTreeMap::new();
    for spec in inventory::iter::<RouteSpec> {
        if routes.insert(spec.family, spec.dispatch).is_some() {
            tracing::error!(family = ?spec.family, "duplicate route registration");
        }
    }
    routes
});

/// Events moved out of the native queue when a route was retired.
static PENDING: Mutex<VecDeque<Event>> = parking_lot::const_mutex(VecDeque::new());

/// Routes released since the owner last settled them.
static RETIRED: Mutex<Vec<Route>> = parking_lot::const_mutex(Vec::new());

static DEPTH: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemuxState {
    Idle,
    Draining,
}

/// Whether a pump step is in progress.
pub fn state() -> DemuxState {
    if DEPTH.load(Ordering::Acquire) == 0 {
        DemuxState::Idle
    } else {
        DemuxState::Draining
    }
}

struct Draining;

impl Draining {
    fn enter() -> Self {
        DEPTH.fetch_add(1, Ordering::AcqRel);
        Draining
    }
}

impl Drop for Draining {
    fn drop(&mut self) {
        DEPTH.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Pop and route exactly one event. Returns `false` once the queue is empty.
///
/// Tasks queued with [`crate::run_on_owner_thread`] run first.
pub fn pump_events() -> Result<bool> {
    let runtime = runtime::get_runtime()?;
    runtime.run_owner_tasks();

    settle_retired_routes(&**runtime.backend());
    let _draining = Draining::enter();
    let Some(event) = next_event(&**runtime.backend()) else {
        return Ok(false);
    };
    let route = event.route();
    let outcome = dispatch(route, &event);
    if outcome == Dispatch::Unrouted && runtime.config().trace_unrouted_events {
        tracing::trace!(?route, timestamp = event.timestamp, "dropped unrouted event");
    }
    Ok(true)
}

/// Pump until the queue is empty. Returns the number of events handled.
pub fn drain_events() -> Result<usize> {
    let mut handled = 0;
    while pump_events()? {
        handled += 1;
    }
    Ok(handled)
}

fn next_event(backend: &dyn NativeBackend) -> Option<Event> {
    if let Some(event) = PENDING.lock().pop_front() {
        return Some(event);
    }
    backend.poll_event().map(|raw| raw.decode())
}

fn dispatch(route: Route, event: &Event) -> Dispatch {
    match ROUTES.get(&route.family()) {
        Some(dispatch) => dispatch(route, event),
        None => Dispatch::Unrouted,
    }
}

/// Drop every queued event addressed to `route`. Called once the target's
/// native object is gone.
///
/// On the owner thread this happens immediately. Elsewhere the route is only
/// recorded: popping the native queue belongs to the owner.
pub(crate) fn retire_route(backend: &dyn NativeBackend, route: Route) {
    let Ok(runtime) = runtime::get_runtime() else {
        return;
    };
    RETIRED.lock().push(route);
    if runtime.owner_thread() == std::thread::current().id() {
        settle_retired_routes(backend);
    } else {
        tracing::trace!(?route, "route retired off the owner thread");
    }
}

/// Move the native queue into the pending buffer and drop every event
/// addressed to a retired route. Owner thread only.
pub(crate) fn settle_retired_routes(backend: &dyn NativeBackend) {
    let retired = std::mem::take(&mut *RETIRED.lock());
    if retired.is_empty() {
        return;
    }

    let mut pending = PENDING.lock();
    while let Some(raw) = backend.poll_event() {
        pending.push_back(raw.decode());
    }
    let before = pending.len();
    pending.retain(|event| !retired.contains(&event.route()));
    let dropped = before - pending.len();
    drop(pending);

    if dropped > 0 {
        tracing::debug!(?retired, dropped, "discarded events queued for released objects");
    }
}

pub type GlobalHandler = dyn Fn(&Event) + Send + Sync;

static GLOBAL: CallbackCell<GlobalHandler> = CallbackCell::new();
static DEVICE_ADDED: CallbackCell<GlobalHandler> = CallbackCell::new();
static TOUCH: RwLock<BTreeMap<i64, Arc<GlobalHandler>>> = RwLock::new(BTreeMap::new());

/// Handle quit, locale changes and undecoded events.
pub fn on_global_event(handler: impl Fn(&Event) + Send + Sync + 'static) {
    GLOBAL.set(Arc::new(handler));
}

pub fn clear_global_handler() -> bool {
    GLOBAL.clear()
}

/// Handle joystick, controller and audio "device added" announcements.
pub fn on_device_added(handler: impl Fn(&Event) + Send + Sync + 'static) {
    DEVICE_ADDED.set(Arc::new(handler));
}

pub fn clear_device_added_handler() -> bool {
    DEVICE_ADDED.clear()
}

/// Handle finger events of one touch device.
pub fn on_touch(touch_id: i64, handler: impl Fn(&Event) + Send + Sync + 'static) {
    TOUCH.write().insert(touch_id, Arc::new(handler));
}

pub fn clear_touch_handler(touch_id: i64) -> bool {
    TOUCH.write().remove(&touch_id).is_some()
}

fn run_cell(cell: &CallbackCell<GlobalHandler>, event: &Event) -> Dispatch {
    match cell.get() {
        Some(handler) => {
            handler(event);
            Dispatch::Delivered
        }
        None => Dispatch::NoHandler,
    }
}

fn dispatch_global(_route: Route, event: &Event) -> Dispatch {
    run_cell(&GLOBAL, event)
}

fn dispatch_device_added(_route: Route, event: &Event) -> Dispatch {
    run_cell(&DEVICE_ADDED, event)
}

fn dispatch_touch(route: Route, event: &Event) -> Dispatch {
    let Route::Touch(touch_id) = route else {
        return Dispatch::Unrouted;
    };
    let handler = TOUCH.read().get(&touch_id).cloned();
    match handler {
        Some(handler) => {
            handler(event);
            Dispatch::Delivered
        }
        None => Dispatch::Unrouted,
    }
}

inventory::submit! { RouteSpec::new(RouteFamily::Global, dispatch_global) }
inventory::submit! { RouteSpec::new(RouteFamily::DeviceAdded, dispatch_device_added) }
inventory::submit! { RouteSpec::new(RouteFamily::Touch, dispatch_touch) }

/// Drop every process-wide handler, pending event and unsettled retirement.
pub(crate) fn reset() {
    GLOBAL.clear();
    DEVICE_ADDED.clear();
    TOUCH.write().clear();
    RETIRED.lock().clear();
    PENDING.lock().clear();
}

/// Whether every route family has a registered dispatcher.
pub fn routes_complete() -> bool {
    [
        RouteFamily::Global,
        RouteFamily::Window,
        RouteFamily::Joystick,
        RouteFamily::Controller,
        RouteFamily::Touch,
        RouteFamily::AudioDevice,
        RouteFamily::DeviceAdded,
    ]
    .iter()
    .all(|family| ROUTES.contains_key(family))
}
