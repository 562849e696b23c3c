//! Native-callable entry points.
//!
//! The native library stores callback addresses independently of any object,
//! so every callback kind has exactly one static `extern "C"` function. The
//! per-object state is never captured: the trampoline receives a handle or
//! context token and resolves it through the registry. Nothing that happens
//! inside a trampoline unwinds back into native frames; failures are written
//! to the native error channel and the callback's neutral value is returned.

use std::any::Any;
use std::fmt::Display;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use spin::RwLock;

use crate::error::Error;
use crate::handle::ObjectKind;
use crate::native::NativeBackend;

pub mod io;
pub mod log;
pub mod timer;

/// A replaceable user callback.
///
/// The callback is cloned out under the lock and invoked after it is
/// released, so a callback may replace or clear itself, or trigger other
/// callbacks, without deadlocking.
pub struct CallbackCell<F: ?Sized> {
    inner: RwLock<Option<Arc<F>>>,
}

impl<F: ?Sized> CallbackCell<F> {
    pub(crate) const fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    pub(crate) fn set(&self, callback: Arc<F>) {
        *self.inner.write() = Some(callback);
    }

    pub(crate) fn clear(&self) -> bool {
        self.inner.write().take().is_some()
    }

    pub(crate) fn get(&self) -> Option<Arc<F>> {
        self.inner.read().clone()
    }

    pub(crate) fn is_set(&self) -> bool {
        self.inner.read().is_some()
    }
}

impl<F: ?Sized> Default for CallbackCell<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "callback panicked".to_string()
    }
}

/// Run a user callback inside the fault boundary.
///
/// A panic or an `Err` is converted to [`Error::CallbackFault`], written to
/// the native error channel and logged; `None` tells the trampoline to return
/// its neutral value.
pub(crate) fn contain<R, E: Display>(
    callback_name: &'static str,
    backend: &dyn NativeBackend,
    callback: impl FnOnce() -> Result<R, E>,
) -> Option<R> {
    let message = match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(value)) => return Some(value),
        Ok(Err(err)) => err.to_string(),
        Err(payload) => panic_message(&*payload),
    };
    report(
        backend,
        &Error::CallbackFault {
            callback: callback_name,
            message,
        },
    );
    None
}

/// A trampoline was invoked with a handle or token that resolves to nothing.
pub(crate) fn report_miss(kind: ObjectKind, key: impl Display) {
    let err = Error::lookup_miss(kind, key);
    match crate::runtime::backend() {
        Ok(backend) => report(&*backend, &err),
        Err(_) => tracing::error!(error = %err, "callback arrived with no runtime installed"),
    }
}

/// Write an error to the native error channel.
pub(crate) fn report(backend: &dyn NativeBackend, err: &Error) {
    match err {
        Error::LookupMiss { .. } => tracing::error!(error = %err, "native callback for unknown object"),
        _ => tracing::warn!(error = %err, "native callback failed"),
    }
    backend.set_error(&err.to_string());
}

/// Outermost guard of every trampoline body: even a fault in the bridge
/// itself must not unwind into the native caller.
pub(crate) fn guard<R>(callback_name: &'static str, neutral: R, body: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(payload) => {
            let err = Error::CallbackFault {
                callback: callback_name,
                message: panic_message(&*payload),
            };
            if let Ok(backend) = crate::runtime::backend() {
                report(&*backend, &err);
            } else {
                tracing::error!(error = %err, "trampoline fault with no runtime installed");
            }
            neutral
        }
    }
}
