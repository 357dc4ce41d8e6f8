//! Typed runtime object registries for the emulator core.
//!
//! Emulated kernel objects (threads, sync primitives, memory containers) are
//! handed to guest code as small integer handles. This crate provides the two
//! tables that back those handles:
//!
//! - [`IdRegistry`]: handle-keyed, type-tagged storage for heterogeneous
//!   ref-counted objects. A handle always resolves to a live, correctly-typed
//!   object or to nothing; it never type-confuses.
//! - [`FixedRegistry`]: type-keyed storage for at-most-one-per-process
//!   services (the active debugger attach object, backend handles, ...).
//!
//! Both are explicit service objects rather than process globals: the owner
//! constructs them at session start, injects them into the components that
//! need them, and drops (or [`IdRegistry::clear`]s) them on session reset.
//! Nothing is swept automatically; an entry that is never removed is a leak by
//! policy, not something the registry papers over.

mod error;
mod handle;
mod registry;
mod singletons;

#[cfg(test)]
mod proptests;

pub use error::{RegistryError, Result};
pub use handle::Handle;
pub use registry::IdRegistry;
pub use singletons::FixedRegistry;
