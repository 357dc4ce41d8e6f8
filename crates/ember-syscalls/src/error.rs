use thiserror::Error;

/// Guest-visible syscall faults. Neither variant is fatal to the host; both
/// are routed to the issuing thread's fault-handling path.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// The code maps to no handler. Registers are untouched.
    #[error("unknown syscall {code} ({code:#x})")]
    Unknown { code: u32 },

    /// The handler signalled a guest error condition (an errno-style code,
    /// also placed in the return register).
    #[error("guest error {errno:#x}")]
    Guest { errno: i64 },
}
