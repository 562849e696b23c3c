//! Handle registry: native handle (or numeric id) to live wrapper.
//!
//! Entries are non-owning back-references. A wrapper that was collected
//! without being disposed leaves a dead entry behind; it is treated as "not
//! found" and purged the next time its key is looked up.
//!
//! All operations take a short `spin` lock and never run wrapper code while
//! holding it, so they are safe from any thread, including threads the
//! native library invokes callbacks on.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::{Arc, Weak};

use spin::RwLock;

use crate::handle::{NativeHandle, ObjectKind};

/// Registry keyed by native handle.
pub type HandleRegistry<T> = Registry<NativeHandle, T>;

/// Auxiliary index keyed by the numeric id events carry (window id,
/// joystick instance id, audio device id, timer token).
pub type SecondaryIndex<T> = Registry<u32, T>;

pub struct Registry<K, T> {
    kind: ObjectKind,
    entries: RwLock<BTreeMap<K, Weak<T>>>,
}

impl<K, T> Registry<K, T>
where
    K: Copy + Ord + Display,
{
    pub const fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Insert or replace the entry for `key`.
    ///
    /// A native allocator may reissue a key after its previous owner was
    /// released, so any existing entry is dropped first. Replacing an entry
    /// whose target is still alive means two wrappers claim one key; the
    /// newer one wins and the event is logged. Primary handles go through
    /// [`Registry::register_unless_live`] instead.
    pub fn register(&self, key: K, target: &Arc<T>) {
        let previous = self.entries.write().insert(key, Arc::downgrade(target));

        if let Some(previous) = previous {
            if previous.strong_count() > 0 && !Weak::ptr_eq(&previous, &Arc::downgrade(target)) {
                tracing::error!(
                    kind = %self.kind,
                    key = %key,
                    "registered over a live wrapper; the previous wrapper no longer resolves"
                );
            } else {
                tracing::trace!(kind = %self.kind, key = %key, "replaced stale registry entry");
            }
        }
        tracing::trace!(kind = %self.kind, key = %key, "registered");
    }

    /// Register the target `make` builds, unless `key` already resolves to a
    /// target `is_live` accepts. Returns that existing target as `Err`.
    ///
    /// The check and the insert happen under one write lock, so two opens
    /// that receive the same handle cannot both register.
    pub fn register_unless_live(
        &self,
        key: K,
        is_live: impl Fn(&T) -> bool,
        make: impl FnOnce() -> Arc<T>,
    ) -> Result<Arc<T>, Arc<T>> {
        // Declared before the guard so an upgraded target is dropped after
        // it: dropping the last strong reference releases, which takes this
        // lock.
        let existing: Option<Arc<T>>;
        let mut entries = self.entries.write();
        existing = entries.get(&key).and_then(Weak::upgrade);
        if let Some(live) = existing.as_ref().filter(|target| is_live(target)) {
            return Err(live.clone());
        }

        let target = make();
        entries.insert(key, Arc::downgrade(&target));
        drop(entries);
        tracing::trace!(kind = %self.kind, key = %key, "registered");
        Ok(target)
    }

    /// Resolve `key` to its live wrapper.
    ///
    /// A target that is being or has been collected resolves to `None`, and
    /// its dead entry is purged.
    pub fn lookup(&self, key: K) -> Option<Arc<T>> {
        let (found, dead) = {
            let entries = self.entries.read();
            match entries.get(&key) {
                Some(weak) => match weak.upgrade() {
                    Some(target) => (Some(target), false),
                    None => (None, true),
                },
                None => (None, false),
            }
        };

        if dead {
            self.purge(key);
        }
        found
    }

    /// Remove the entry for `key` unconditionally.
    pub fn remove(&self, key: K) -> bool {
        let removed = self.entries.write().remove(&key).is_some();
        if removed {
            tracing::trace!(kind = %self.kind, key = %key, "removed");
        }
        removed
    }

    /// Remove the entry for `key` only if it still refers to `target`.
    ///
    /// Releases go through this so that a wrapper being torn down can never
    /// evict a newer wrapper that was registered under a recycled key.
    pub fn unregister(&self, key: K, target: *const T) -> bool {
        let mut entries = self.entries.write();
        let matches = entries
            .get(&key)
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), target));
        if matches {
            entries.remove(&key);
            drop(entries);
            tracing::trace!(kind = %self.kind, key = %key, "unregistered");
        }
        matches
    }

    /// Whether `key` currently resolves to `target`.
    pub fn resolves_to(&self, key: K, target: *const T) -> bool {
        self.entries
            .read()
            .get(&key)
            .is_some_and(|weak| weak.strong_count() > 0 && std::ptr::eq(weak.as_ptr(), target))
    }

    /// Drop every entry whose target is gone. Returns how many were purged.
    pub fn purge_stale(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, weak| weak.strong_count() > 0);
        before - entries.len()
    }

    /// Number of entries whose target is still alive.
    pub fn live_count(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Snapshot of every live target.
    pub fn live(&self) -> Vec<Arc<T>> {
        let weaks: Vec<Weak<T>> = self.entries.read().values().cloned().collect();
        weaks.iter().filter_map(Weak::upgrade).collect()
    }

    fn purge(&self, key: K) {
        let mut entries = self.entries.write();
        if entries.get(&key).is_some_and(|weak| weak.strong_count() == 0) {
            entries.remove(&key);
            drop(entries);
            tracing::trace!(kind = %self.kind, key = %key, "purged stale entry");
        }
    }
}
