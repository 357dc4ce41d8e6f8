//! Guest system-call dispatch.
//!
//! Guest code traps into the emulator with a numeric code; the
//! [`SyscallTable`] maps that code to a named handler and runs it against the
//! issuing thread's register block. The table is process-wide configuration:
//! assembled once at startup via [`SyscallTableBuilder`] and immutable
//! afterwards.
//!
//! Both failure modes are guest-visible and recoverable by the guest-thread
//! fault path — an unmapped code must not take the host down:
//!
//! - [`SyscallError::Unknown`]: no handler for the code; the thread's
//!   registers are left untouched.
//! - [`SyscallError::Guest`]: the handler signalled a guest errno, which is
//!   also written to the return register the way a successful result would
//!   be.

mod error;
mod table;

pub use error::SyscallError;
pub use table::{SyscallContext, SyscallResult, SyscallTable, SyscallTableBuilder, TableError};
