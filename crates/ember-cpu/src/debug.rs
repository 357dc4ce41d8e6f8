use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::thread::CpuThread;

/// Commands and lifecycle notifications exchanged with a debugger front-end.
///
/// Serde-tagged so a front-end can transport them as JSON. `handle` fields
/// carry the raw registry handle value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DebugCommand {
    RequestPause,
    RequestResume,
    RequestStep,
    ThreadCreated { handle: u32 },
    ThreadStopped { handle: u32 },
    ThreadRemoved { handle: u32 },
}

/// Strategy object a debugger installs to intercept thread-control traffic.
///
/// Replaces a bare global callback pointer: "no hook installed" is an
/// explicit state, and [`ThreadManager::send_debug`](crate::ThreadManager::send_debug)
/// is a no-op in it. Installation happens once during bring-up, before
/// concurrent CPU threads exist.
pub trait DebugHook: Send + Sync {
    /// `thread` is the target for thread-scoped commands and `None` for
    /// process-wide ones.
    fn on_command(&self, command: DebugCommand, thread: Option<&Arc<CpuThread>>);
}
