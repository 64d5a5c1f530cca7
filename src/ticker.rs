//! Adapter between the host's per-frame signal and the cooperative
//! executor.

use std::sync::Arc;

use crate::scheduler::Scheduler;

/// The host's frame loop, consumed (not exposed) by the scheduler: a
/// registration point for a callback invoked once per frame with no
/// arguments.
pub trait FrameLoop {
    fn register_tick(&mut self, callback: Box<dyn FnMut() + Send>);
}

/// Subscribes [`Scheduler::tick`] to the host frame loop.
pub struct TickDriver;

impl TickDriver {
    /// Register the scheduler's cooperative executor with `host`. Does
    /// nothing in threaded mode, where no per-frame driving is needed;
    /// returns whether the subscription happened.
    pub fn attach(scheduler: &Arc<Scheduler>, host: &mut dyn FrameLoop) -> bool {
        if scheduler.is_threaded() {
            tracing::debug!("Threaded mode, not subscribing to frame ticks");
            return false;
        }

        let scheduler = Arc::clone(scheduler);
        host.register_tick(Box::new(move || scheduler.tick()));
        tracing::debug!("Cooperative executor subscribed to frame ticks");
        true
    }
}
