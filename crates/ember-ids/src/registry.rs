use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::error::{RegistryError, Result};
use crate::handle::Handle;

type Shared = Arc<dyn Any + Send + Sync>;

struct Entry {
    type_id: TypeId,
    object: Shared,
}

struct Table {
    entries: BTreeMap<u32, Entry>,
    /// Next allocation candidate. Monotonic with wraparound; occupied values
    /// and 0 are skipped by probing.
    next: u32,
    /// Maximum number of live entries; allocation fails once reached. Equal
    /// to the full non-null handle space, and lowered by tests to make
    /// exhaustion reachable.
    capacity: usize,
}

/// Handle-keyed registry of heterogeneous, ref-counted runtime objects.
///
/// Every entry is tagged with the static type it was inserted as; lookups
/// verify the tag before downcasting, so a stale handle that now refers to an
/// object of a different type resolves to `None` rather than type-confusing.
///
/// Ownership of each object is shared between the registry and any caller
/// that obtained an `Arc` from a lookup. [`IdRegistry::remove`] drops only
/// the registry's reference; the object itself is destroyed when the last
/// holder lets go. A `Weak` retained across a remove observes its own
/// allocation only: after the handle's numeric value is reused for a new
/// object, the old weak still upgrades to `None`, never to the newcomer.
///
/// All operations take one internal mutex for the duration of the table
/// access. The critical section covers bookkeeping only; objects are dropped
/// after the lock is released, because dropping an emulated CPU thread can
/// join its host worker and that worker may itself be touching the registry.
pub struct IdRegistry {
    table: Mutex<Table>,
    /// Bumped on every removal. Thread-local lookup hints compare against it
    /// and fall back to the locked path when it moved.
    generation: AtomicU64,
    /// Distinguishes registry instances so a hint recorded against one can
    /// never satisfy a lookup on another.
    registry_id: u64,
}

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

struct LookupHint {
    registry_id: u64,
    handle: u32,
    generation: u64,
    type_id: TypeId,
    object: Weak<dyn Any + Send + Sync>,
}

thread_local! {
    /// Last successful [`IdRegistry::get_cached`] resolution on this worker.
    static LAST_LOOKUP: RefCell<Option<LookupHint>> = const { RefCell::new(None) };
}

impl IdRegistry {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table {
                entries: BTreeMap::new(),
                next: 1,
                capacity: u32::MAX as usize,
            }),
            generation: AtomicU64::new(0),
            registry_id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Register `value` under a freshly allocated handle.
    pub fn insert<T: Any + Send + Sync>(&self, value: T) -> Result<Handle> {
        self.insert_arc(Arc::new(value))
    }

    /// Register an already-shared object under a freshly allocated handle.
    pub fn insert_arc<T: Any + Send + Sync>(&self, object: Arc<T>) -> Result<Handle> {
        let shared: Shared = object;
        let mut table = self.table.lock().unwrap();
        let handle = alloc_handle(&mut table)?;
        table.entries.insert(
            handle,
            Entry {
                type_id: TypeId::of::<T>(),
                object: shared,
            },
        );
        drop(table);
        log::trace!("idm: inserted {} as {:#x}", type_name::<T>(), handle);
        Ok(Handle::from_raw(handle))
    }

    /// Register an object that needs to know its own handle.
    ///
    /// The constructor runs under the registry lock and must therefore stay
    /// cheap; anything that blocks or re-enters the registry belongs in
    /// [`IdRegistry::insert_arc`] with the handle patched in afterwards.
    pub fn insert_with<T, F>(&self, build: F) -> Result<(Handle, Arc<T>)>
    where
        T: Any + Send + Sync,
        F: FnOnce(Handle) -> T,
    {
        let mut table = self.table.lock().unwrap();
        let raw = alloc_handle(&mut table)?;
        let handle = Handle::from_raw(raw);
        let object = Arc::new(build(handle));
        table.entries.insert(
            raw,
            Entry {
                type_id: TypeId::of::<T>(),
                object: object.clone(),
            },
        );
        drop(table);
        log::trace!("idm: inserted {} as {handle}", type_name::<T>());
        Ok((handle, object))
    }

    /// Resolve a handle to a live object of type `T`.
    ///
    /// Absent handles and handles of a different type both yield `None`.
    pub fn get<T: Any + Send + Sync>(&self, handle: Handle) -> Option<Arc<T>> {
        if handle.is_null() {
            return None;
        }
        let table = self.table.lock().unwrap();
        let entry = table.entries.get(&handle.raw())?;
        if entry.type_id != TypeId::of::<T>() {
            return None;
        }
        entry.object.clone().downcast::<T>().ok()
    }

    /// [`IdRegistry::get`] with a per-worker fast path.
    ///
    /// Each host worker caches its last resolution; a repeat lookup of the
    /// same handle skips the lock entirely when no removal has happened since
    /// the hint was recorded. The hint is only ever that: a stale one costs
    /// one redundant lock round-trip and falls back to the authoritative
    /// table, it cannot produce a wrong object.
    pub fn get_cached<T: Any + Send + Sync>(&self, handle: Handle) -> Option<Arc<T>> {
        if handle.is_null() {
            return None;
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let hit = LAST_LOOKUP.with(|slot| {
            let slot = slot.borrow();
            let hint = slot.as_ref()?;
            if hint.registry_id == self.registry_id
                && hint.handle == handle.raw()
                && hint.generation == generation
                && hint.type_id == TypeId::of::<T>()
            {
                hint.object.upgrade()
            } else {
                None
            }
        });
        if let Some(object) = hit {
            return object.downcast::<T>().ok();
        }

        let resolved = self.get::<T>(handle)?;
        let shared: Shared = resolved.clone();
        LAST_LOOKUP.with(|slot| {
            // Tagged with the generation loaded *before* the locked lookup:
            // if a removal raced in between, the hint is born stale and the
            // next lookup simply takes the lock again.
            *slot.borrow_mut() = Some(LookupHint {
                registry_id: self.registry_id,
                handle: handle.raw(),
                generation,
                type_id: TypeId::of::<T>(),
                object: Arc::downgrade(&shared),
            });
        });
        Some(resolved)
    }

    /// Snapshot of every live object of type `T`, in handle order.
    ///
    /// This is the enumeration the execution driver iterates each scheduling
    /// pass; the lock is held only while the snapshot is assembled.
    pub fn get_all<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        let table = self.table.lock().unwrap();
        table
            .entries
            .values()
            .filter(|entry| entry.type_id == TypeId::of::<T>())
            .filter_map(|entry| entry.object.clone().downcast::<T>().ok())
            .collect()
    }

    /// Drop the registry's reference to `handle`.
    ///
    /// Returns whether an entry existed. Once this returns, no later lookup
    /// observes the removed instance, even if the numeric handle value is
    /// immediately reused.
    pub fn remove(&self, handle: Handle) -> bool {
        let removed = {
            let mut table = self.table.lock().unwrap();
            table.entries.remove(&handle.raw())
        };
        match removed {
            Some(entry) => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                log::trace!("idm: removed {handle}");
                // Dropped outside the lock: this may be the last reference.
                drop(entry);
                true
            }
            None => false,
        }
    }

    /// Remove `handle` only if it currently holds a `T`, handing the
    /// registry's reference to the caller.
    pub fn remove_typed<T: Any + Send + Sync>(&self, handle: Handle) -> Option<Arc<T>> {
        let removed = {
            let mut table = self.table.lock().unwrap();
            let matches = table
                .entries
                .get(&handle.raw())
                .is_some_and(|entry| entry.type_id == TypeId::of::<T>());
            if matches {
                table.entries.remove(&handle.raw())
            } else {
                None
            }
        }?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        log::trace!("idm: withdrew {handle}");
        removed.object.downcast::<T>().ok()
    }

    /// Session-reset teardown: drop every entry.
    pub fn clear(&self) {
        let old = {
            let mut table = self.table.lock().unwrap();
            std::mem::take(&mut table.entries)
        };
        if !old.is_empty() {
            self.generation.fetch_add(1, Ordering::SeqCst);
            log::trace!("idm: cleared {} entries", old.len());
        }
        drop(old);
    }

    pub fn len(&self) -> usize {
        self.table.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for IdRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocate the next free handle.
///
/// The counter increases monotonically and wraps; 0 and occupied values are
/// skipped. The length pre-check guarantees at least one free value exists,
/// which bounds the probe loop, and a failed allocation mutates nothing
/// beyond the counter position.
fn alloc_handle(table: &mut Table) -> Result<u32> {
    if table.entries.len() >= table.capacity {
        return Err(RegistryError::HandleSpaceExhausted);
    }
    loop {
        let candidate = table.next;
        table.next = table.next.wrapping_add(1);
        if candidate != 0 && !table.entries.contains_key(&candidate) {
            return Ok(candidate);
        }
    }
}
