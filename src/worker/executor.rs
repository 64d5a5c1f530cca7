use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::scheduler::Shared;
use crate::worker::WorkerContext;

/// Worker thread loop.
///
/// Blocks on the context's wait handle until a job is assigned or shutdown
/// is requested. Each assigned job is executed exactly once, outside any
/// lock; a staged job that wants to finish must loop its own sub-steps
/// inside that single call, which it will, because time limiting is
/// disabled on this path. After the run the worker refills its slot from
/// the queue head and signals completion for `cancel_and_wait` callers.
pub(crate) fn run(ctx: Arc<WorkerContext>, shared: Arc<Shared>) {
    tracing::debug!(worker = ctx.index, "Worker started");

    loop {
        let job = {
            let mut slot = ctx.slot.lock();
            loop {
                if !ctx.alive.load(Ordering::SeqCst) {
                    tracing::debug!(worker = ctx.index, "Worker stopping");
                    return;
                }
                if let Some(job) = slot.as_ref() {
                    break Arc::clone(job);
                }
                ctx.wake.wait(&mut slot);
            }
        };

        // Threaded policy: the job gets one call and the whole thread, no
        // time slicing.
        job.set_time_limited(false);
        job.execute(shared.invoker.as_ref());

        tracing::debug!(
            worker = ctx.index,
            job_id = %job.id(),
            complete = job.is_complete(),
            "Job run finished"
        );

        // The slot update stays under the queue lock: either this refill
        // observes a concurrently queued job, or the submitter's dispatch
        // scan observes the emptied slot. Lock order is queue, then slot,
        // everywhere.
        {
            let mut queue = shared.queue.lock();
            *ctx.slot.lock() = queue.dequeue_next();
        }

        // Wake anyone blocked in cancel_and_wait; the slot no longer
        // references the finished job.
        let _done = shared.done_lock.lock();
        shared.done_cv.notify_all();
    }
}
