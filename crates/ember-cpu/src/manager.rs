use std::sync::{Arc, Mutex, OnceLock, Weak};

use ember_ids::IdRegistry;

use crate::debug::{DebugCommand, DebugHook};
use crate::error::{Result, ThreadError};
use crate::thread::{CpuKind, CpuThread};

/// Number of directly-addressed raw thread slots the guest hardware exposes.
pub const RAW_SLOT_COUNT: usize = 5;

#[derive(Default)]
pub struct ThreadManagerOptions {
    /// Debugger hook to install at construction. Can also be installed later
    /// with [`ThreadManager::install_debug_hook`], but must be in place
    /// before worker threads run.
    pub debug_hook: Option<Arc<dyn DebugHook>>,
}

/// Owner of CPU-thread lifecycle.
///
/// Threads are registered in the injected [`IdRegistry`] like every other
/// kernel object; the manager adds the bounded raw-slot table on top. Raw
/// slots hold *weak* references: the registry (plus any caller) owns the
/// thread, and a slot whose thread has been destroyed silently reads as
/// empty and is free for reuse.
///
/// Lock discipline: the slot-table mutex may be held while taking the
/// registry lock (slot reservation and registration are one step), never the
/// reverse, and neither lock is ever held while waiting for a thread to
/// stop. A stopping worker deregistering itself therefore cannot deadlock
/// against [`ThreadManager::close`].
pub struct ThreadManager {
    registry: Arc<IdRegistry>,
    slots: Mutex<[Option<Weak<CpuThread>>; RAW_SLOT_COUNT]>,
    hook: OnceLock<Arc<dyn DebugHook>>,
}

impl ThreadManager {
    pub fn new(registry: Arc<IdRegistry>) -> Self {
        Self::with_options(registry, ThreadManagerOptions::default())
    }

    pub fn with_options(registry: Arc<IdRegistry>, options: ThreadManagerOptions) -> Self {
        let hook = OnceLock::new();
        if let Some(h) = options.debug_hook {
            let _ = hook.set(h);
        }
        Self {
            registry,
            slots: Mutex::new(Default::default()),
            hook,
        }
    }

    /// Install the debugger hook. Returns `false` if one is already
    /// installed; the existing hook is never replaced.
    pub fn install_debug_hook(&self, hook: Arc<dyn DebugHook>) -> bool {
        self.hook.set(hook).is_ok()
    }

    /// Forward a command to the installed debugger hook, if any.
    pub fn send_debug(&self, command: DebugCommand, thread: Option<&Arc<CpuThread>>) {
        if let Some(hook) = self.hook.get() {
            hook.on_command(command, thread);
        }
    }

    /// Create a handle-addressed thread.
    pub fn new_thread(&self, name: impl Into<String>, kind: CpuKind) -> Result<Arc<CpuThread>> {
        let name = name.into();
        let (handle, thread) = self
            .registry
            .insert_with(|h| CpuThread::new(h, name, kind))?;
        log::trace!("created cpu thread {handle} ({:?})", thread.kind());
        self.notify_created(&thread);
        Ok(thread)
    }

    /// Create a raw thread in the first free slot.
    ///
    /// A slot is free when it is empty or its thread has been destroyed.
    /// Fails with [`ThreadError::NoFreeSlot`] when all slots hold live
    /// threads.
    pub fn new_raw_thread(&self, name: impl Into<String>) -> Result<Arc<CpuThread>> {
        let name = name.into();
        let mut slots = self.slots.lock().unwrap();
        let index = slots
            .iter()
            .position(|slot| !slot_live(slot))
            .ok_or(ThreadError::NoFreeSlot)?;
        let thread = self.create_raw_in_slot(&mut slots, index, name)?;
        drop(slots);
        self.notify_created(&thread);
        Ok(thread)
    }

    /// Create a raw thread in a specific slot.
    pub fn new_raw_thread_at(
        &self,
        index: usize,
        name: impl Into<String>,
    ) -> Result<Arc<CpuThread>> {
        let name = name.into();
        let mut slots = self.slots.lock().unwrap();
        if index >= slots.len() {
            return Err(ThreadError::SlotOutOfRange { index });
        }
        if slot_live(&slots[index]) {
            return Err(ThreadError::SlotOccupied { index });
        }
        let thread = self.create_raw_in_slot(&mut slots, index, name)?;
        drop(slots);
        self.notify_created(&thread);
        Ok(thread)
    }

    /// Caller holds the slot lock; the debugger notification happens after
    /// it is released.
    fn create_raw_in_slot(
        &self,
        slots: &mut [Option<Weak<CpuThread>>; RAW_SLOT_COUNT],
        index: usize,
        name: String,
    ) -> Result<Arc<CpuThread>> {
        let (handle, thread) = self
            .registry
            .insert_with(|h| CpuThread::new(h, name, CpuKind::Raw(index as u8)))?;
        slots[index] = Some(Arc::downgrade(&thread));
        log::trace!("created raw thread {handle} in slot {index}");
        Ok(thread)
    }

    fn notify_created(&self, thread: &Arc<CpuThread>) {
        self.send_debug(
            DebugCommand::ThreadCreated {
                handle: thread.handle().raw(),
            },
            Some(thread),
        );
    }

    /// Resolve a raw slot to its thread.
    ///
    /// `None` means the slot is empty, out of range, or its thread has been
    /// destroyed since: "not currently running", never an error.
    pub fn get_raw_thread(&self, index: usize) -> Option<Arc<CpuThread>> {
        let slots = self.slots.lock().unwrap();
        slots.get(index)?.as_ref()?.upgrade()
    }

    /// Every live thread object, raw and handle-addressed alike, in handle
    /// order. This is the set the execution driver iterates each scheduling
    /// pass.
    pub fn get_all_threads(&self) -> Vec<Arc<CpuThread>> {
        self.registry.get_all::<CpuThread>()
    }

    /// Deregister a thread (its exit path, or explicit destruction).
    ///
    /// Drops the registry's reference and clears the thread's raw slot if it
    /// still points at this instance. Returns whether the thread was still
    /// registered.
    pub fn remove_thread(&self, thread: &Arc<CpuThread>) -> bool {
        let existed = self.registry.remove(thread.handle());
        if let CpuKind::Raw(index) = thread.kind() {
            let mut slots = self.slots.lock().unwrap();
            if let Some(slot) = slots.get_mut(index as usize) {
                let points_here = slot
                    .as_ref()
                    .is_some_and(|weak| weak.as_ptr() == Arc::as_ptr(thread));
                if points_here {
                    *slot = None;
                }
            }
        }
        if existed {
            self.send_debug(
                DebugCommand::ThreadRemoved {
                    handle: thread.handle().raw(),
                },
                Some(thread),
            );
        }
        existed
    }

    /// Stop every live thread and tear the tables down.
    ///
    /// Stop requests go out first, then the manager waits for each worker
    /// with no lock held; a slow guest delays this, a thread deregistering
    /// itself concurrently is fine. After this returns every thread has
    /// fully stopped and [`ThreadManager::get_all_threads`] is empty.
    pub fn close(&self) {
        let threads = self.get_all_threads();
        log::debug!("closing thread manager, {} live threads", threads.len());

        for thread in &threads {
            thread.request_stop();
        }
        for thread in &threads {
            thread.wait_stopped();
            self.send_debug(
                DebugCommand::ThreadStopped {
                    handle: thread.handle().raw(),
                },
                Some(thread),
            );
        }
        for thread in &threads {
            self.remove_thread(thread);
        }

        let mut slots = self.slots.lock().unwrap();
        slots.fill(None);
    }
}

fn slot_live(slot: &Option<Weak<CpuThread>>) -> bool {
    slot.as_ref().is_some_and(|weak| weak.strong_count() > 0)
}
