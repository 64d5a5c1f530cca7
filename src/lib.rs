//! Hybrid job scheduler: one submission API, two execution strategies.
//!
//! Jobs target a method on a host object (via the [`Invocable`] seam) and
//! are executed either by a fixed pool of worker threads, or — when
//! threading is disabled — cooperatively, a time-sliced amount per tick of
//! the host's frame loop.
//!
//! # Components
//!
//! - [`Scheduler`]: submission, dispatch, cancellation, lookup, and the
//!   cooperative per-tick executor.
//! - [`JobHandle`]: cloneable view of a submitted job's lifecycle.
//! - [`JobContext`]: staging protocol for resumable callables.
//! - [`TickDriver`]: subscribes the cooperative executor to the host's
//!   frame signal.

pub mod config;
pub mod error;
pub mod invoke;
pub mod scheduler;
pub mod ticker;

pub(crate) mod worker;

pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use invoke::{Invocable, ReceiverId, Value, MAX_ARGS};
pub use scheduler::{JobContext, JobHandle, JobKind, Scheduler};
pub use ticker::{FrameLoop, TickDriver};
