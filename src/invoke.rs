//! The seam between the scheduler and the host's invocation system.
//!
//! The scheduler never runs native closures; every job targets a method on a
//! host object, identified by a [`ReceiverId`] and a method name. The host
//! plugs in an [`Invocable`] at scheduler construction, and the scheduler
//! only ever asks it two things: "does this receiver expose this method?"
//! and "call it with these arguments".
//!
//! Argument contents are opaque to the scheduler; they are forwarded as-is.

use std::fmt;

use crate::error::Result;
use crate::scheduler::job::JobContext;

/// Maximum number of positional arguments a job invocation may carry.
pub const MAX_ARGS: usize = 5;

/// Opaque handle identifying a receiver object inside the host.
///
/// The scheduler never dereferences this; it only forwards it back to the
/// host's [`Invocable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiverId(pub u64);

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dynamically-typed call argument. The scheduler treats these as opaque.
pub type Value = serde_json::Value;

/// The host's method invocation capability, injected into the scheduler.
///
/// **Contract:**
/// - `has_method` is consulted once, at submission time. The host is trusted
///   not to retract a method while a job targeting it is in flight; if it
///   does anyway, `call` should return an error, which marks the job
///   complete and surfaces through the error log.
/// - `call` receives a [`JobContext`] carrying the staging protocol. A
///   staged implementation drives `should_skip` / `should_continue` and
///   calls `mark_complete` when all of its sub-steps are done; a one-shot
///   implementation can ignore the context entirely.
/// - `call` may run on a worker thread, so implementations must be
///   `Send + Sync`.
pub trait Invocable: Send + Sync {
    /// Whether `receiver` currently exposes `method`.
    fn has_method(&self, receiver: ReceiverId, method: &str) -> bool;

    /// Invoke `method` on `receiver` with up to [`MAX_ARGS`] arguments.
    fn call(
        &self,
        receiver: ReceiverId,
        method: &str,
        args: &[Value],
        ctx: &mut JobContext<'_>,
    ) -> Result<()>;
}

impl fmt::Debug for dyn Invocable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invocable")
    }
}
