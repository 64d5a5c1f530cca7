//! Worker-thread execution engine (threaded mode).
//!
//! Each worker thread owns one [`WorkerContext`]: a single-slot assignment
//! cell paired with a private wait handle. The scheduler fills the slot and
//! signals the handle; the worker runs the job fully outside any lock,
//! clears the slot, refills itself from the queue head, and reports
//! completion.
//!
//! # Worker states
//!
//! - **Idle**: slot empty, blocked on the wait handle.
//! - **Running**: slot holds the job being executed.
//! - **ShuttingDown**: liveness flag cleared; the worker wakes, observes the
//!   flag and exits its loop. Teardown joins every worker thread.

pub(crate) mod context;
pub(crate) mod executor;

pub(crate) use context::WorkerContext;
