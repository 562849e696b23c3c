//! Native events: the raw record, its decoded form, and the demultiplexer
//! that routes decoded events to per-object handlers.

mod demux;
mod event;
mod raw;

pub use demux::{
    DemuxState, Dispatch, GlobalHandler, RouteSpec, clear_device_added_handler,
    clear_global_handler, clear_touch_handler, drain_events, on_device_added, on_global_event,
    on_touch, pump_events, routes_complete, state,
};
pub use event::{Event, EventKind, FingerPhase, Route, RouteFamily, WindowEvent};
pub use raw::{RAW_PAYLOAD_LEN, RawEvent, tags};

pub(crate) use demux::{reset, retire_route, settle_retired_routes};
