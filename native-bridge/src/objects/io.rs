//! Custom I/O streams: a native I/O object whose operations are served by a
//! Rust [`IoSource`].

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::Result;
use crate::handle::{NativeHandle, ObjectKind};
use crate::lifecycle::{NativeObject, Slot, Wrapper, adopt};
use crate::native::{IO_KIND_USER, RawIo};
use crate::registry::{HandleRegistry, Registry};
use crate::runtime;
use crate::trampoline::io::{
    io_close_trampoline, io_read_trampoline, io_seek_trampoline, io_size_trampoline,
    io_write_trampoline,
};
use crate::trampoline::panic_message;

pub(crate) static IO_STREAMS: HandleRegistry<Slot<IoState>> = Registry::new(ObjectKind::IoStream);

pub type IoStream = Wrapper<IoState>;

/// The operations behind a custom I/O stream.
///
/// Unimplemented operations report [`io::ErrorKind::Unsupported`], which the
/// native side sees as the operation's failure value.
pub trait IoSource: Send + 'static {
    /// Total size in bytes. Defaults to seeking to the end and back.
    fn size(&mut self) -> io::Result<u64> {
        let current = self.seek(SeekFrom::Current(0))?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(current))?;
        Ok(end)
    }

    fn seek(&mut self, _position: SeekFrom) -> io::Result<u64> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::ErrorKind::Unsupported.into())
    }

    /// Called once, when the native side closes the stream or the stream is
    /// released.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read-only source over any `Read + Seek`.
pub struct ReadSeek<R>(pub R);

impl<R: Read + Seek + Send + 'static> IoSource for ReadSeek<R> {
    fn seek(&mut self, position: SeekFrom) -> io::Result<u64> {
        self.0.seek(position)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

/// Write-only source over any `Write + Seek`. Flushed on close.
pub struct WriteSeek<W>(pub W);

impl<W: Write + Seek + Send + 'static> IoSource for WriteSeek<W> {
    fn seek(&mut self, position: SeekFrom) -> io::Result<u64> {
        self.0.seek(position)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl IoSource for io::Cursor<Vec<u8>> {
    fn seek(&mut self, position: SeekFrom) -> io::Result<u64> {
        Seek::seek(self, position)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(self, buf)
    }
}

pub struct IoState {
    raw: *mut RawIo,
    source: Mutex<Box<dyn IoSource>>,
    closed: AtomicBool,
}

// SAFETY: `raw` is only passed back to the native library, which owns it and
// tolerates calls from any thread; the source itself is behind a mutex.
unsafe impl Send for IoState {}
unsafe impl Sync for IoState {}

impl IoState {
    /// Run `f` on the source. Fails once the source was closed.
    pub(crate) fn with_source<R>(&self, f: impl FnOnce(&mut dyn IoSource) -> R) -> io::Result<R> {
        if self.closed.load(Ordering::Acquire) {
            return Err(io::Error::other("io stream is closed"));
        }
        let mut source = self.source.lock();
        Ok(f(&mut **source))
    }

    /// Run the source's close hook, once. A panic is returned as its message.
    pub(crate) fn close_source(&self) -> std::result::Result<io::Result<()>, String> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(Ok(()));
        }
        let mut source = self.source.lock();
        catch_unwind(AssertUnwindSafe(|| source.close())).map_err(|payload| panic_message(&*payload))
    }
}

impl NativeObject for IoState {
    const KIND: ObjectKind = ObjectKind::IoStream;

    fn registry() -> &'static HandleRegistry<Slot<Self>> {
        &IO_STREAMS
    }

    fn destroy(slot: &Slot<Self>) {
        match slot.state().close_source() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "io source failed to close"),
            Err(message) => tracing::warn!(%message, "io source panicked while closing"),
        }
        slot.backend().free_io(slot.state().raw);
    }
}

impl Wrapper<IoState> {
    /// Allocate a native I/O object served by `source`.
    pub fn new(source: impl IoSource) -> Result<IoStream> {
        let backend = runtime::backend_for_open()?;
        let raw = backend.alloc_io();
        if !raw.is_null() {
            // SAFETY: freshly allocated by the native library and not yet
            // shared with anything.
            unsafe {
                raw.write(RawIo {
                    size: Some(io_size_trampoline),
                    seek: Some(io_seek_trampoline),
                    read: Some(io_read_trampoline),
                    write: Some(io_write_trampoline),
                    close: Some(io_close_trampoline),
                    kind: IO_KIND_USER,
                });
            }
        }
        let source: Box<dyn IoSource> = Box::new(source);
        adopt(backend, NativeHandle::from_ptr(raw), move |_, _| IoState {
            raw,
            source: Mutex::new(source),
            closed: AtomicBool::new(false),
        })
    }

    /// The native I/O object, for handing to native loaders.
    pub fn as_raw(&self) -> Result<*mut RawIo> {
        self.slot().ensure_live()?;
        Ok(self.state().raw)
    }
}
