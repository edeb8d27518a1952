//! A single office-worker's state.
//!
//! Invariant enforced here: `available == true` iff the worker holds no
//! in-flight conversion *and* its backend process is running. `available`
//! is only ever flipped by `Supervisor::convert` (clear on entry, set on
//! exit) and by the exit handler (clear on crash); readers (the
//! dispatcher) only ever load it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub struct Worker {
    pub port: u16,
    pub pid_file: PathBuf,
    pub profile_dir: PathBuf,
    pub restart_count: AtomicU32,
    pub available: AtomicBool,
    /// OS pid of the currently-running backend process, 0 if none. Used by
    /// `convert()` to force-kill a stuck backend on a render timeout
    /// without needing to share the `Child` handle itself across tasks.
    pub backend_pid: AtomicU32,
}

impl Worker {
    pub fn new(port: u16, temp_root: &std::path::Path, token: &str) -> Self {
        Self {
            port,
            pid_file: temp_root.join(format!("office-{port}.pid")),
            profile_dir: temp_root.join(format!("office-{port}-{token}")),
            restart_count: AtomicU32::new(0),
            available: AtomicBool::new(false),
            backend_pid: AtomicU32::new(0),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Atomically claim this worker for a conversion. Returns `true` if
    /// this caller won the claim (compare-and-swap from `true` to
    /// `false`), ensuring two dispatchers never simultaneously win the
    /// same worker.
    pub fn try_claim(&self) -> bool {
        self.available
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn release(&self) {
        self.available.store(true, Ordering::SeqCst);
    }

    pub fn mark_unavailable(&self) {
        self.available.store(false, Ordering::SeqCst);
    }

    pub fn set_backend_pid(&self, pid: u32) {
        self.backend_pid.store(pid, Ordering::SeqCst);
    }

    pub fn backend_pid(&self) -> Option<u32> {
        match self.backend_pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }
}
