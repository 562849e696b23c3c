//! Disposal protocol shared by every object kind.
//!
//! A [`Slot`] is the managed-side identity of one native object: its handle,
//! an atomic `disposed` flag, the backend that created it, and the per-kind
//! state. Explicit disposal ([`Wrapper::dispose`]) and collection (dropping the
//! last [`Wrapper`]) both funnel into [`Slot::release`], which swaps the flag
//! once and only the winner of that swap touches the native library. The flag
//! is also what keeps the drop path quiet after an explicit dispose.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::error::{Error, Result};
use crate::handle::{NativeHandle, ObjectKind};
use crate::native::NativeBackend;
use crate::registry::HandleRegistry;

/// Why a slot is being released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleasePath {
    /// `dispose()` was called.
    Explicit,
    /// The last wrapper was dropped without disposal.
    Finalized,
    /// The parent object released the native resource implicitly.
    ParentReleased,
    /// The native library announced that it is done with the object.
    NativeClosed,
}

/// Per-kind behaviour plugged into the shared disposal protocol.
pub trait NativeObject: Sized + Send + Sync + 'static {
    const KIND: ObjectKind;

    /// The open primitive returns the handle of an already open object again
    /// and counts references natively; each extra reference needs a close.
    const SHARED_OPEN: bool = false;

    /// Primary registry of this kind.
    fn registry() -> &'static HandleRegistry<Slot<Self>>;

    /// Register secondary keys of a freshly opened object.
    fn index(_slot: &Arc<Slot<Self>>) {}

    /// Remove secondary keys. Runs together with the primary removal.
    fn unindex(_slot: &Slot<Self>) {}

    /// Release or invalidate dependent objects before the native destroy.
    fn release_children(_slot: &Slot<Self>, _path: ReleasePath) {}

    /// Invoke the native destroy primitive.
    fn destroy(slot: &Slot<Self>);

    /// Runs after the native object is gone.
    fn retired(_slot: &Slot<Self>) {}
}

pub struct Slot<T: NativeObject> {
    handle: NativeHandle,
    disposed: AtomicBool,
    backend: Arc<dyn NativeBackend>,
    state: T,
}

impl<T: NativeObject> Slot<T> {
    pub(crate) fn new(handle: NativeHandle, backend: Arc<dyn NativeBackend>, state: T) -> Self {
        Self {
            handle,
            disposed: AtomicBool::new(false),
            backend,
            state,
        }
    }

    /// The handle, without the liveness check. Only for the release path and
    /// for registry keys.
    pub(crate) fn raw_handle(&self) -> NativeHandle {
        self.handle
    }

    pub(crate) fn backend(&self) -> &dyn NativeBackend {
        &*self.backend
    }

    pub(crate) fn backend_arc(&self) -> &Arc<dyn NativeBackend> {
        &self.backend
    }

    pub(crate) fn state(&self) -> &T {
        &self.state
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::UseAfterRelease { kind: T::KIND });
        }
        Ok(())
    }

    /// Run a native call with the handle, unless the object was released.
    pub(crate) fn with_live<R>(&self, f: impl FnOnce(&dyn NativeBackend, NativeHandle) -> R) -> Result<R> {
        self.ensure_live()?;
        Ok(f(&*self.backend, self.handle))
    }

    /// Release the native resource. Returns `true` for the single call that
    /// actually released it.
    pub(crate) fn release(&self, path: ReleasePath) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            tracing::trace!(kind = %T::KIND, handle = %self.handle, ?path, "already released");
            return false;
        }

        self.detach();
        T::release_children(self, path);
        T::destroy(self);
        T::retired(self);
        tracing::debug!(kind = %T::KIND, handle = %self.handle, ?path, "released");
        true
    }

    /// Mark the slot released without calling the native destroy primitive,
    /// because the native object is already gone (its parent took it down, or
    /// it never finished construction).
    pub(crate) fn invalidate(&self, path: ReleasePath) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.detach();
        T::release_children(self, ReleasePath::ParentReleased);
        T::retired(self);
        tracing::debug!(kind = %T::KIND, handle = %self.handle, ?path, "invalidated");
        true
    }

    fn detach(&self) {
        T::registry().unregister(self.handle, self as *const Self);
        T::unindex(self);
    }
}

impl<T: NativeObject> Drop for Slot<T> {
    fn drop(&mut self) {
        self.release(ReleasePath::Finalized);
    }
}

/// Create and register the slot for a handle an open primitive returned.
///
/// A null handle is a construction failure: nothing is registered and the
/// native error text is carried in the error. A handle that a live wrapper
/// already owns yields that wrapper for kinds with [`NativeObject::SHARED_OPEN`]
/// and a construction failure for every other kind; a handle never has two
/// live wrappers.
pub(crate) fn adopt<T: NativeObject>(
    backend: Arc<dyn NativeBackend>,
    handle: NativeHandle,
    state: impl FnOnce(&dyn NativeBackend, NativeHandle) -> T,
) -> Result<Wrapper<T>> {
    if handle.is_null() {
        return Err(construction_failure(T::KIND, &*backend));
    }

    let state = state(&*backend, handle);
    let native = backend.clone();
    let registered = T::registry().register_unless_live(
        handle,
        |slot| !slot.is_disposed(),
        move || Arc::new(Slot::new(handle, backend, state)),
    );
    match registered {
        Ok(slot) => {
            T::index(&slot);
            tracing::debug!(kind = %T::KIND, handle = %handle, "opened");
            Ok(Wrapper { slot })
        }
        Err(existing) if T::SHARED_OPEN => {
            // The open took another native reference; the existing wrapper
            // already holds one.
            native.close(T::KIND, handle);
            tracing::debug!(kind = %T::KIND, handle = %handle, "open returned a wrapped handle; sharing it");
            Ok(Wrapper { slot: existing })
        }
        Err(_) => {
            tracing::error!(kind = %T::KIND, handle = %handle, "native library reissued a handle that is still wrapped");
            Err(Error::ConstructionFailure {
                kind: T::KIND,
                message: format!("handle {handle} is already owned by a live wrapper"),
            })
        }
    }
}

pub(crate) fn construction_failure(kind: ObjectKind, backend: &dyn NativeBackend) -> Error {
    let message = backend
        .take_error()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| "native library returned an invalid handle".to_string());
    tracing::debug!(%kind, %message, "open failed");
    Error::ConstructionFailure { kind, message }
}

/// Managed-side wrapper of one native object.
///
/// Clones share one identity: a registry lookup for the handle yields a
/// wrapper equal to every clone. When the last clone is dropped without
/// [`Wrapper::dispose`], the native object is released by the drop path.
pub struct Wrapper<T: NativeObject> {
    slot: Arc<Slot<T>>,
}

impl<T: NativeObject> Wrapper<T> {
    pub(crate) fn from_slot(slot: Arc<Slot<T>>) -> Self {
        Self { slot }
    }

    pub(crate) fn slot(&self) -> &Arc<Slot<T>> {
        &self.slot
    }

    pub(crate) fn state(&self) -> &T {
        &self.slot.state
    }

    pub fn kind(&self) -> ObjectKind {
        T::KIND
    }

    /// Release the native object now. Returns `false` if it was already
    /// released, in which case nothing reaches the native library.
    pub fn dispose(&self) -> bool {
        self.slot.release(ReleasePath::Explicit)
    }

    pub fn is_disposed(&self) -> bool {
        self.slot.is_disposed()
    }

    /// The native handle, for passing to the native library directly.
    pub fn handle(&self) -> Result<NativeHandle> {
        self.slot.ensure_live()?;
        Ok(self.slot.handle)
    }

    /// The live wrapper registered for `handle`, if any.
    pub fn lookup(handle: NativeHandle) -> Option<Self> {
        T::registry().lookup(handle).map(Self::from_slot)
    }

    /// Whether both wrappers are the same managed identity.
    pub fn same_object(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    pub(crate) fn with_live<R>(&self, f: impl FnOnce(&dyn NativeBackend, NativeHandle) -> R) -> Result<R> {
        self.slot.with_live(f)
    }
}

impl<T: NativeObject> Clone for Wrapper<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T: NativeObject> PartialEq for Wrapper<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_object(other)
    }
}

impl<T: NativeObject> Eq for Wrapper<T> {}

impl<T: NativeObject> fmt::Debug for Wrapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapper")
            .field("kind", &T::KIND)
            .field("handle", &self.slot.handle)
            .field("disposed", &self.slot.is_disposed())
            .finish()
    }
}

/// Sub-resources owned by a parent object.
pub(crate) struct Children<T: NativeObject> {
    list: spin::Mutex<Vec<Weak<Slot<T>>>>,
}

impl<T: NativeObject> Children<T> {
    pub(crate) const fn new() -> Self {
        Self {
            list: spin::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn adopt(&self, child: &Arc<Slot<T>>) {
        let mut list = self.list.lock();
        list.retain(|weak| weak.strong_count() > 0);
        list.push(Arc::downgrade(child));
    }

    fn take_live(&self) -> Vec<Arc<Slot<T>>> {
        let taken = std::mem::take(&mut *self.list.lock());
        taken.iter().filter_map(Weak::upgrade).collect()
    }

    /// Release every child that the parent does not take down with it.
    pub(crate) fn release_all(&self, path: ReleasePath) -> usize {
        self.take_live()
            .iter()
            .filter(|child| child.release(path))
            .count()
    }

    /// Mark every child released; the parent's destroy frees them natively.
    pub(crate) fn invalidate_all(&self) -> usize {
        self.take_live()
            .iter()
            .filter(|child| child.invalidate(ReleasePath::ParentReleased))
            .count()
    }

    /// Run `f` while no child can be invalidated concurrently.
    pub(crate) fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.list.lock();
        f()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.list
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
