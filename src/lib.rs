//! Umbrella crate for the ember emulator runtime core.
//!
//! Re-exports the member crates so integration code (and the cross-crate
//! tests under `tests/`) can depend on a single package:
//!
//! - [`ids`]: typed identity registry and singleton registry.
//! - [`cpu`]: CPU-thread objects, raw-slot manager, debugger hook.
//! - [`syscalls`]: guest system-call dispatch.

pub use ember_cpu as cpu;
pub use ember_ids as ids;
pub use ember_syscalls as syscalls;
