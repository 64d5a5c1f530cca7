use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use uuid::Uuid;

use crate::invoke::ReceiverId;
use crate::scheduler::job::Job;

/// Per-thread bookkeeping: a single-slot assignment cell, the wait handle
/// the worker blocks on while idle, and a liveness flag for orderly
/// shutdown. Owned by the scheduler, never exposed externally.
#[derive(Debug)]
pub(crate) struct WorkerContext {
    pub(crate) index: usize,
    /// At most one job; holds the reference for the job's whole run, so
    /// lookups and `cancel_and_wait` can observe in-flight work.
    pub(crate) slot: Mutex<Option<Arc<Job>>>,
    pub(crate) wake: Condvar,
    pub(crate) alive: AtomicBool,
}

impl WorkerContext {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            slot: Mutex::new(None),
            wake: Condvar::new(),
            alive: AtomicBool::new(true),
        }
    }

    /// Place `job` in the slot if it is empty and wake the worker.
    /// Reports whether the assignment happened.
    pub(crate) fn try_assign(&self, job: &Arc<Job>) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(Arc::clone(job));
        self.wake.notify_one();
        true
    }

    /// Whether the slot currently references the job with `id`.
    pub(crate) fn holds(&self, id: Uuid) -> bool {
        self.slot.lock().as_ref().is_some_and(|j| j.id() == id)
    }

    /// Job currently in the slot matching the lookup pair, if any.
    pub(crate) fn find(&self, receiver: ReceiverId, method: &str) -> Option<Arc<Job>> {
        self.slot
            .lock()
            .as_ref()
            .filter(|j| j.targets(receiver, method))
            .map(Arc::clone)
    }

    /// Clear the liveness flag and wake the worker so it can observe it.
    /// The slot lock is taken so the notify cannot race a worker that has
    /// checked the flag but not yet parked.
    pub(crate) fn request_stop(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let _slot = self.slot.lock();
        self.wake.notify_one();
    }
}
