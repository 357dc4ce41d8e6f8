//! Emulated CPU-thread objects and their lifecycle manager.
//!
//! Each guest hardware thread is backed by a [`CpuThread`]: the shared state
//! block a host worker polls while interpreting guest code. Threads live in
//! the injected [`IdRegistry`](ember_ids::IdRegistry) like every other kernel
//! object; on top of that, [`ThreadManager`] keeps a small fixed table of
//! *raw* threads addressed by slot index 0..5 rather than by handle, mirrors
//! of the directly-addressed execution units of the guest hardware.
//!
//! Shutdown is cooperative: [`ThreadManager::close`] requests a stop on every
//! live thread and then waits, holding no lock, until each worker has
//! acknowledged. A debugger front-end can observe lifecycle transitions and
//! inject control commands through the [`DebugHook`] strategy.

mod debug;
mod error;
mod manager;
mod thread;

pub use debug::{DebugCommand, DebugHook};
pub use error::{Result, ThreadError};
pub use manager::{ThreadManager, ThreadManagerOptions, RAW_SLOT_COUNT};
pub use thread::{CpuKind, CpuThread, GuestRegs, RunPhase, GPR_COUNT};
