use std::collections::BTreeMap;
use std::sync::{Arc, MutexGuard};

use ember_cpu::{CpuThread, GuestRegs};
use thiserror::Error;

use crate::error::SyscallError;

/// First general-purpose register of the syscall argument window; the same
/// register carries the return value back to the guest.
const ARG_BASE: usize = 3;
/// Arguments travel in gpr[3]..gpr[10].
pub const MAX_ARGS: usize = 8;

pub type SyscallResult = Result<i64, SyscallError>;

type Handler = Box<dyn Fn(&mut SyscallContext<'_>) -> SyscallResult + Send + Sync>;

/// View of the issuing thread a handler operates on.
///
/// Holds the thread's register lock for the duration of the call; handlers
/// must go through this context rather than locking the thread's registers
/// themselves.
pub struct SyscallContext<'a> {
    thread: &'a Arc<CpuThread>,
    regs: MutexGuard<'a, GuestRegs>,
}

impl<'a> SyscallContext<'a> {
    fn new(thread: &'a Arc<CpuThread>) -> Self {
        Self {
            thread,
            regs: thread.regs(),
        }
    }

    pub fn thread(&self) -> &Arc<CpuThread> {
        self.thread
    }

    /// Read syscall argument `n` (0-based).
    pub fn arg(&self, n: usize) -> u64 {
        assert!(n < MAX_ARGS, "syscall argument index out of range: {n}");
        self.regs.gpr[ARG_BASE + n]
    }

    /// Write the guest-visible return register.
    pub fn set_return(&mut self, value: i64) {
        self.regs.gpr[ARG_BASE] = value as u64;
    }

    pub fn return_value(&self) -> u64 {
        self.regs.gpr[ARG_BASE]
    }
}

struct TableEntry {
    name: &'static str,
    handler: Handler,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("syscall code {code} registered twice")]
    DuplicateCode { code: u32 },
}

/// Assembles a [`SyscallTable`] at startup.
#[derive(Default)]
pub struct SyscallTableBuilder {
    entries: Vec<(u32, &'static str, Handler)>,
}

impl SyscallTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn syscall<F>(mut self, code: u32, name: &'static str, handler: F) -> Self
    where
        F: Fn(&mut SyscallContext<'_>) -> SyscallResult + Send + Sync + 'static,
    {
        self.entries.push((code, name, Box::new(handler)));
        self
    }

    pub fn build(self) -> Result<SyscallTable, TableError> {
        let mut entries = BTreeMap::new();
        for (code, name, handler) in self.entries {
            if entries.insert(code, TableEntry { name, handler }).is_some() {
                return Err(TableError::DuplicateCode { code });
            }
        }
        log::debug!("syscall table built, {} entries", entries.len());
        Ok(SyscallTable { entries })
    }
}

/// Immutable code → named-handler map.
pub struct SyscallTable {
    entries: BTreeMap<u32, TableEntry>,
}

impl std::fmt::Debug for SyscallTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(code, entry)| (code, entry.name)))
            .finish()
    }
}

impl SyscallTable {
    pub fn builder() -> SyscallTableBuilder {
        SyscallTableBuilder::new()
    }

    /// Dispatch `code` against `thread`.
    ///
    /// On success the handler's value is written to the thread's return
    /// register. A guest errno is written there too before the error is
    /// propagated; an unknown code modifies nothing.
    pub fn execute(&self, thread: &Arc<CpuThread>, code: u32) -> Result<i64, SyscallError> {
        let Some(entry) = self.entries.get(&code) else {
            log::warn!(
                "unknown syscall {code} ({code:#x}) from thread '{}'",
                thread.name()
            );
            return Err(SyscallError::Unknown { code });
        };

        let mut ctx = SyscallContext::new(thread);
        match (entry.handler)(&mut ctx) {
            Ok(value) => {
                ctx.set_return(value);
                log::trace!("syscall '{}' ({code}) finished, r3={value:#x}", entry.name);
                Ok(value)
            }
            Err(SyscallError::Guest { errno }) => {
                ctx.set_return(errno);
                log::trace!("syscall '{}' ({code}) -> guest errno {errno:#x}", entry.name);
                Err(SyscallError::Guest { errno })
            }
            Err(other) => Err(other),
        }
    }

    /// Stable human-readable identifier for a mapped code. Diagnostics only.
    pub fn name_for(&self, code: u32) -> Option<&'static str> {
        self.entries.get(&code).map(|entry| entry.name)
    }

    /// Mapped codes in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
