use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

use ember_ids::Handle;

pub const GPR_COUNT: usize = 32;

/// Which execution unit a [`CpuThread`] models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuKind {
    /// The guest's primary thread.
    Main,
    /// A general handle-addressed worker thread.
    Worker,
    /// A directly-addressed execution unit, reachable through its slot index
    /// in the manager's raw table as well as through its handle.
    Raw(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Created but no host worker has entered its execution loop yet.
    NotStarted,
    Running,
    Stopped,
}

/// Guest-visible register block.
///
/// Only what the syscall layer needs: the general-purpose registers syscall
/// arguments and return values travel through. The full architectural state
/// (FPR, vector, SPR) belongs to the execution engine, which is a separate
/// subsystem.
#[derive(Debug)]
pub struct GuestRegs {
    pub gpr: [u64; GPR_COUNT],
}

/// Shared state block of one emulated hardware thread.
///
/// The host worker that interprets guest code for this thread owns the
/// execution loop; everything here is the cross-thread control surface:
/// a cooperative stop flag, the run phase other threads can wait on, and the
/// register block syscall handlers operate on.
///
/// Stopping is a request, never preemption. The worker polls
/// [`CpuThread::stop_requested`] between instruction batches and calls
/// [`CpuThread::mark_stopped`] on its way out; how quickly that happens is
/// bounded only by guest code responsiveness.
pub struct CpuThread {
    handle: Handle,
    name: String,
    kind: CpuKind,
    stop: AtomicBool,
    phase: Mutex<RunPhase>,
    phase_edge: Condvar,
    regs: Mutex<GuestRegs>,
}

impl CpuThread {
    pub fn new(handle: Handle, name: impl Into<String>, kind: CpuKind) -> Self {
        Self {
            handle,
            name: name.into(),
            kind,
            stop: AtomicBool::new(false),
            phase: Mutex::new(RunPhase::NotStarted),
            phase_edge: Condvar::new(),
            regs: Mutex::new(GuestRegs {
                gpr: [0; GPR_COUNT],
            }),
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CpuKind {
        self.kind
    }

    /// Ask the thread to stop. Sticky; there is no un-request.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Called by the host worker when it enters its execution loop.
    pub fn mark_running(&self) {
        let mut phase = self.phase.lock().unwrap();
        *phase = RunPhase::Running;
    }

    /// Called by the host worker when its execution loop exits.
    pub fn mark_stopped(&self) {
        let mut phase = self.phase.lock().unwrap();
        *phase = RunPhase::Stopped;
        drop(phase);
        self.phase_edge.notify_all();
        log::trace!("cpu thread {} ({}) stopped", self.name, self.handle);
    }

    pub fn run_phase(&self) -> RunPhase {
        *self.phase.lock().unwrap()
    }

    pub fn is_stopped(&self) -> bool {
        self.run_phase() == RunPhase::Stopped
    }

    /// Block until the thread's worker has exited its execution loop.
    ///
    /// Returns immediately for a thread that never started. Callers pairing
    /// this with [`CpuThread::request_stop`] set the flag first, so a worker
    /// that starts late sees the request on its first poll.
    pub fn wait_stopped(&self) {
        let mut phase = self.phase.lock().unwrap();
        while *phase == RunPhase::Running {
            phase = self.phase_edge.wait(phase).unwrap();
        }
    }

    /// Lock the guest register block.
    pub fn regs(&self) -> MutexGuard<'_, GuestRegs> {
        self.regs.lock().unwrap()
    }
}

impl std::fmt::Debug for CpuThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuThread")
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("phase", &self.run_phase())
            .finish_non_exhaustive()
    }
}
