//! Timer expiry.
//!
//! The native `param` of a timer is not a pointer: it carries a per-timer
//! token that the trampoline resolves through the timer token index. The
//! token is allocated before the native timer exists, so it can be handed to
//! `add_timer` up front.

use std::convert::Infallible;
use std::ffi::c_void;
use std::sync::atomic::{AtomicU32, Ordering};

use super::{contain, guard, report_miss};
use crate::handle::ObjectKind;
use crate::lifecycle::ReleasePath;
use crate::objects::timer;

static NEXT_TOKEN: AtomicU32 = AtomicU32::new(1);

/// Allocate a timer context token. Never 0.
pub(crate) fn next_token() -> u32 {
    loop {
        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        if token != 0 {
            return token;
        }
    }
}

pub(crate) fn token_param(token: u32) -> *mut c_void {
    token as usize as *mut c_void
}

/// Fixed native entry point for timer expiry. Returns the next interval in
/// milliseconds; 0 cancels the timer.
///
/// # Safety
///
/// Only meant to be registered through [`crate::Timer::start`]; `param` must be a
/// token produced by it.
pub unsafe extern "C" fn timer_trampoline(interval: u32, param: *mut c_void) -> u32 {
    guard("timer", 0, || {
        let token = param as usize as u32;
        let Some(timer) = timer::lookup_token(token) else {
            report_miss(ObjectKind::Timer, token);
            return 0;
        };
        if timer.is_disposed() {
            // The release in progress removes the native timer.
            return interval;
        }

        let next = timer
            .state()
            .handler()
            .and_then(|handler| {
                contain::<_, Infallible>("timer", timer.slot().backend(), || {
                    Ok(handler(&timer, interval))
                })
            })
            .unwrap_or(0);

        if next == 0 {
            // The native library drops a timer whose callback returns 0, so
            // its id must never be passed to remove_timer again.
            timer.slot().invalidate(ReleasePath::NativeClosed);
        }
        next
    })
}
