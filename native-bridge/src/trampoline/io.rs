//! Custom I/O operations.
//!
//! The context pointer the native library passes to every I/O slot is the
//! `RawIo` object itself, which doubles as the stream's handle. Byte ranges
//! coming from the native side are validated before a slice is formed over
//! them, and transferred counts are clamped to what was requested.

use std::ffi::{c_int, c_void};
use std::io::{self, SeekFrom};

use super::{contain, guard, report, report_miss};
use crate::error::Error;
use crate::handle::{NativeHandle, ObjectKind};
use crate::lifecycle::ReleasePath;
use crate::native::{IO_SEEK_CUR, IO_SEEK_END, IO_SEEK_SET, NativeBackend, RawIo};
use crate::objects::io::IoStream;

/// The live stream for `context`. A stream that is being released resolves
/// to `None` without a report.
fn resolve(context: *mut RawIo) -> Option<IoStream> {
    let handle = NativeHandle::from_ptr(context);
    match IoStream::lookup(handle) {
        Some(stream) if !stream.is_disposed() => Some(stream),
        Some(_) => None,
        None => {
            report_miss(ObjectKind::IoStream, handle);
            None
        }
    }
}

/// Total byte length of `count` elements of `size` bytes, or `None` if the
/// range cannot be turned into a slice.
fn byte_len(ptr: *const c_void, size: usize, count: usize) -> Option<usize> {
    if ptr.is_null() || size == 0 {
        return None;
    }
    size.checked_mul(count).filter(|len| *len <= isize::MAX as usize)
}

fn reject_range(backend: &dyn NativeBackend, operation: &str, size: usize, count: usize) {
    report(
        backend,
        &Error::InvalidArgument(format!(
            "{operation}: rejected byte range of {count} x {size} bytes"
        )),
    );
}

fn seek_from(offset: i64, whence: c_int) -> Option<SeekFrom> {
    match whence {
        IO_SEEK_SET => u64::try_from(offset).ok().map(SeekFrom::Start),
        IO_SEEK_CUR => Some(SeekFrom::Current(offset)),
        IO_SEEK_END => Some(SeekFrom::End(offset)),
        _ => None,
    }
}

fn to_offset(position: u64) -> io::Result<i64> {
    i64::try_from(position).map_err(|_| io::Error::other("position does not fit the native offset type"))
}

/// # Safety
///
/// Called by the native library with the `RawIo` it was registered on.
pub unsafe extern "C" fn io_size_trampoline(context: *mut RawIo) -> i64 {
    guard("io size", -1, || {
        let Some(stream) = resolve(context) else {
            return -1;
        };
        contain("io size", stream.slot().backend(), || {
            stream.state().with_source(|source| source.size())?.and_then(to_offset)
        })
        .unwrap_or(-1)
    })
}

/// # Safety
///
/// Called by the native library with the `RawIo` it was registered on.
pub unsafe extern "C" fn io_seek_trampoline(context: *mut RawIo, offset: i64, whence: c_int) -> i64 {
    guard("io seek", -1, || {
        let Some(stream) = resolve(context) else {
            return -1;
        };
        let Some(position) = seek_from(offset, whence) else {
            report(
                stream.slot().backend(),
                &Error::InvalidArgument(format!("io seek: offset {offset} with origin {whence}")),
            );
            return -1;
        };
        contain("io seek", stream.slot().backend(), || {
            stream
                .state()
                .with_source(|source| source.seek(position))?
                .and_then(to_offset)
        })
        .unwrap_or(-1)
    })
}

/// Reads up to `maxnum` elements of `size` bytes into `ptr`. Returns the
/// number of whole elements read.
///
/// # Safety
///
/// `ptr` must be valid for writes of `size * maxnum` bytes.
pub unsafe extern "C" fn io_read_trampoline(
    context: *mut RawIo,
    ptr: *mut c_void,
    size: usize,
    maxnum: usize,
) -> usize {
    guard("io read", 0, || {
        let Some(stream) = resolve(context) else {
            return 0;
        };
        let backend = stream.slot().backend();
        let Some(len) = byte_len(ptr, size, maxnum) else {
            reject_range(backend, "io read", size, maxnum);
            return 0;
        };
        if len == 0 {
            return 0;
        }
        // SAFETY: non-null, length checked for overflow, and the native
        // caller guarantees the buffer covers `size * maxnum` bytes.
        let buf = unsafe { std::slice::from_raw_parts_mut(ptr.cast::<u8>(), len) };

        let read = contain("io read", backend, || {
            stream.state().with_source(|source| {
                let mut filled = 0;
                while filled < buf.len() {
                    match source.read(&mut buf[filled..]) {
                        Ok(0) => break,
                        Ok(n) => filled += n.min(buf.len() - filled),
                        Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                        Err(err) if filled > 0 => {
                            tracing::debug!(error = %err, filled, "short io read");
                            break;
                        }
                        Err(err) => return Err(err),
                    }
                }
                Ok(filled)
            })?
        });
        read.unwrap_or(0).min(len) / size
    })
}

/// Writes `num` elements of `size` bytes from `ptr`. Returns the number of
/// whole elements written.
///
/// # Safety
///
/// `ptr` must be valid for reads of `size * num` bytes.
pub unsafe extern "C" fn io_write_trampoline(
    context: *mut RawIo,
    ptr: *const c_void,
    size: usize,
    num: usize,
) -> usize {
    guard("io write", 0, || {
        let Some(stream) = resolve(context) else {
            return 0;
        };
        let backend = stream.slot().backend();
        let Some(len) = byte_len(ptr, size, num) else {
            reject_range(backend, "io write", size, num);
            return 0;
        };
        if len == 0 {
            return 0;
        }
        // SAFETY: as for reads.
        let buf = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) };

        let written = contain("io write", backend, || {
            stream.state().with_source(|source| {
                let mut written = 0;
                while written < buf.len() {
                    match source.write(&buf[written..]) {
                        Ok(0) => break,
                        Ok(n) => written += n.min(buf.len() - written),
                        Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                        Err(err) if written > 0 => {
                            tracing::debug!(error = %err, written, "short io write");
                            break;
                        }
                        Err(err) => return Err(err),
                    }
                }
                Ok(written)
            })?
        });
        written.unwrap_or(0).min(len) / size
    })
}

/// Runs the source's close hook, then releases the stream. The stream is
/// released even if the hook fails; the failure is reported afterwards.
///
/// # Safety
///
/// Called by the native library with the `RawIo` it was registered on.
/// `context` is freed before this returns.
pub unsafe extern "C" fn io_close_trampoline(context: *mut RawIo) -> c_int {
    guard("io close", -1, || {
        let Some(stream) = resolve(context) else {
            return -1;
        };

        let outcome = stream.state().close_source();
        stream.slot().release(ReleasePath::NativeClosed);

        let backend = stream.slot().backend();
        match outcome {
            Ok(Ok(())) => 0,
            Ok(Err(err)) => {
                report(
                    backend,
                    &Error::CallbackFault {
                        callback: "io close",
                        message: err.to_string(),
                    },
                );
                -1
            }
            Err(message) => {
                report(
                    backend,
                    &Error::CallbackFault {
                        callback: "io close",
                        message,
                    },
                );
                -1
            }
        }
    })
}
