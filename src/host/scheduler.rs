// src/host/scheduler.rs
//! One-shot deferred actions on the tokio runtime

use super::Scheduler;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};

/// Run blocking work (process spawns, TCP probes) from code that may sit on a runtime worker.
///
/// On a multi-thread runtime the worker hands its other tasks off first, so
/// timers and signal handlers keep running. Elsewhere `f` simply runs inline.
pub fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Runs deferred actions as tasks on a tokio runtime.
///
/// Holds a runtime handle so it can be called from threads that are not
/// runtime workers, e.g. a serial feed callback.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler bound to the runtime this is called from. Panics outside a runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_one_shot(&self, delay: Duration, action: Box<dyn FnOnce() + Send>) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
    }
}
