//! Native log output.
//!
//! The log sink is process-wide: the native library keeps one function
//! pointer and no object handle. The default sink forwards native log lines
//! to `tracing`.

use std::convert::Infallible;
use std::ffi::{CStr, c_char, c_int, c_void};
use std::sync::Arc;

use super::{CallbackCell, contain, guard};
use crate::native::NativeBackend;

/// Severity of a native log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogPriority {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl LogPriority {
    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            1 => LogPriority::Verbose,
            2 => LogPriority::Debug,
            4 => LogPriority::Warn,
            5 => LogPriority::Error,
            6 => LogPriority::Critical,
            _ => LogPriority::Info,
        }
    }

    pub fn as_raw(self) -> c_int {
        match self {
            LogPriority::Verbose => 1,
            LogPriority::Debug => 2,
            LogPriority::Info => 3,
            LogPriority::Warn => 4,
            LogPriority::Error => 5,
            LogPriority::Critical => 6,
        }
    }
}

/// Native log category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LogCategory(pub c_int);

impl LogCategory {
    pub const APPLICATION: LogCategory = LogCategory(0);
    pub const ERROR: LogCategory = LogCategory(1);
    pub const ASSERT: LogCategory = LogCategory(2);
    pub const SYSTEM: LogCategory = LogCategory(3);
    pub const AUDIO: LogCategory = LogCategory(4);
    pub const VIDEO: LogCategory = LogCategory(5);
    pub const RENDER: LogCategory = LogCategory(6);
    pub const INPUT: LogCategory = LogCategory(7);
}

pub type LogHandler = dyn Fn(LogCategory, LogPriority, &str) + Send + Sync;

static LOG_SINK: CallbackCell<LogHandler> = CallbackCell::new();

/// Route native log output to `handler` and point the native log slot at
/// the log trampoline.
pub fn set_log_handler(
    backend: &dyn NativeBackend,
    handler: impl Fn(LogCategory, LogPriority, &str) + Send + Sync + 'static,
) {
    LOG_SINK.set(Arc::new(handler));
    backend.set_log_output(Some(log_output_trampoline), std::ptr::null_mut());
}

/// Route native log output to `tracing`.
pub fn forward_to_tracing(backend: &dyn NativeBackend) {
    set_log_handler(backend, |category, priority, message| match priority {
        LogPriority::Verbose => tracing::trace!(target: "native", category = category.0, "{message}"),
        LogPriority::Debug => tracing::debug!(target: "native", category = category.0, "{message}"),
        LogPriority::Info => tracing::info!(target: "native", category = category.0, "{message}"),
        LogPriority::Warn => tracing::warn!(target: "native", category = category.0, "{message}"),
        LogPriority::Error | LogPriority::Critical => {
            tracing::error!(target: "native", category = category.0, "{message}")
        }
    });
}

/// Detach the log sink from the native library.
pub fn clear_log_handler(backend: &dyn NativeBackend) {
    backend.set_log_output(None, std::ptr::null_mut());
    LOG_SINK.clear();
}

pub fn has_log_handler() -> bool {
    LOG_SINK.is_set()
}

/// Fixed native entry point for log output.
///
/// # Safety
///
/// `message` must be null or point to a NUL-terminated string valid for the
/// duration of the call.
pub unsafe extern "C" fn log_output_trampoline(
    _userdata: *mut c_void,
    category: c_int,
    priority: c_int,
    message: *const c_char,
) {
    guard("log output", (), || {
        let Some(sink) = LOG_SINK.get() else {
            return;
        };
        if message.is_null() {
            return;
        }
        // SAFETY: the native caller passes a NUL-terminated string that
        // outlives this call.
        let text = unsafe { CStr::from_ptr(message) }.to_string_lossy();
        let category = LogCategory(category);
        let priority = LogPriority::from_raw(priority);

        if let Ok(backend) = crate::runtime::backend() {
            contain::<(), Infallible>("log output", &*backend, || {
                sink(category, priority, &text);
                Ok(())
            });
        } else {
            sink(category, priority, &text);
        }
    })
}
