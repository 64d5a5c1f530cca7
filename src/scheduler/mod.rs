//! The scheduler: submission, dispatch, cancellation, lookup, and the
//! cooperative per-tick executor.
//!
//! # Execution modes
//!
//! - **Threaded**: a fixed pool of worker threads. A submission is handed
//!   straight to an idle worker when one exists, otherwise it waits in FIFO
//!   order in the job queue; workers refill themselves from the queue head
//!   as they finish.
//! - **Cooperative**: no threads. [`Scheduler::tick`], driven once per host
//!   frame, drains queue entries under a per-tick time budget; an
//!   incomplete staged job stays at the queue head and resumes next tick.
//!
//! The mode is fixed at construction. The queue and worker bookkeeping are
//! guarded by a single scheduler-wide lock held only for O(1)/O(threads)
//! operations; job execution always happens outside it.

pub mod job;
pub mod queue;

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::invoke::{Invocable, ReceiverId, Value, MAX_ARGS};
use crate::worker::{executor, WorkerContext};

pub use job::{JobContext, JobHandle, JobKind};
pub use queue::JobQueue;

use job::Job;

/// State shared between the scheduler and its worker threads.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) invoker: Arc<dyn Invocable>,
    pub(crate) queue: Mutex<JobQueue>,
    /// Completion signal: workers notify after clearing their slot, waiters
    /// in `cancel_and_wait` block here.
    pub(crate) done_lock: Mutex<()>,
    pub(crate) done_cv: Condvar,
}

/// Hybrid job scheduler. See the [module docs](self) for the execution
/// model.
///
/// Explicitly constructed and explicitly owned; dropping it (or calling
/// [`shutdown`](Scheduler::shutdown)) stops and joins every worker thread.
#[derive(Debug)]
pub struct Scheduler {
    threaded: bool,
    max_time_per_frame: Duration,
    shared: Arc<Shared>,
    workers: Vec<Arc<WorkerContext>>,
    joins: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Build a scheduler from `config` (sanitized first) and the host's
    /// invocation capability. Spawns the worker pool in threaded mode.
    pub fn new(config: PoolConfig, invoker: Arc<dyn Invocable>) -> Result<Self> {
        let config = config.sanitized();

        let shared = Arc::new(Shared {
            invoker,
            queue: Mutex::new(JobQueue::with_capacity(
                config.initial_queue_capacity,
                config.queue_growth_step,
            )),
            done_lock: Mutex::new(()),
            done_cv: Condvar::new(),
        });

        let mut workers = Vec::new();
        let mut joins = Vec::new();
        if config.use_threads {
            let count = config.effective_thread_count();
            tracing::info!(threads = count, "Starting scheduler in threaded mode");
            for index in 0..count {
                let ctx = Arc::new(WorkerContext::new(index));
                let join = std::thread::Builder::new()
                    .name(format!("framepool-worker-{index}"))
                    .spawn({
                        let ctx = Arc::clone(&ctx);
                        let shared = Arc::clone(&shared);
                        move || executor::run(ctx, shared)
                    })
                    .map_err(PoolError::WorkerSpawn)?;
                workers.push(ctx);
                joins.push(join);
            }
        } else {
            tracing::info!(
                max_time_per_frame = ?config.max_time_per_frame(),
                "Starting scheduler in cooperative mode"
            );
        }

        Ok(Self {
            threaded: config.use_threads,
            max_time_per_frame: config.max_time_per_frame(),
            shared,
            workers,
            joins: Mutex::new(joins),
        })
    }

    pub fn is_threaded(&self) -> bool {
        self.threaded
    }

    pub fn max_time_per_frame(&self) -> Duration {
        self.max_time_per_frame
    }

    /// Submit a staged job: its callable may yield partial progress and be
    /// resumed across cooperative ticks. Dispatched to a worker thread it
    /// gets exactly one call with time limiting disabled, so it runs its
    /// sub-steps to completion there.
    pub fn submit_staged(
        &self,
        receiver: ReceiverId,
        method: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<JobHandle> {
        self.submit(JobKind::Staged, receiver, method.into(), args)
    }

    /// Submit a one-shot job: a single call, run to full completion,
    /// time-budget hints ignored.
    pub fn submit_oneshot(
        &self,
        receiver: ReceiverId,
        method: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<JobHandle> {
        self.submit(JobKind::OneShot, receiver, method.into(), args)
    }

    fn submit(
        &self,
        kind: JobKind,
        receiver: ReceiverId,
        method: String,
        args: Vec<Value>,
    ) -> Result<JobHandle> {
        if args.len() > MAX_ARGS {
            return Err(PoolError::TooManyArgs(args.len()));
        }

        if !self.shared.invoker.has_method(receiver, &method) {
            tracing::error!(
                receiver = %receiver,
                method = %method,
                "Submission target absent or method not exposed; job is a no-op"
            );
            let job = Arc::new(Job::invalid(kind, receiver, method, args));
            return Ok(JobHandle::new(job));
        }

        let job = Arc::new(Job::new(kind, receiver, method, args));
        let handle = JobHandle::new(Arc::clone(&job));

        // Dispatch scan and enqueue are one atomic step under the queue
        // lock; a worker's refill holds the same lock, so a submission can
        // never fall between a worker's empty dequeue and its park.
        let mut queue = self.shared.queue.lock();
        if self.threaded {
            for ctx in &self.workers {
                if ctx.try_assign(&job) {
                    tracing::debug!(
                        job_id = %job.id(),
                        worker = ctx.index,
                        kind = %job.kind(),
                        "Job dispatched to idle worker"
                    );
                    return Ok(handle);
                }
            }
        }

        queue.enqueue(job);
        tracing::debug!(job_id = %handle.id(), kind = %handle.kind(), "Job queued");
        Ok(handle)
    }

    /// Cooperative executor: run queued work for up to the per-tick budget.
    ///
    /// The head job is handed the remaining budget each iteration; a
    /// time-limited staged job yields once it is spent and stays at the
    /// head for the next tick. A one-shot job always runs to completion and
    /// may overrun the budget by its own cost; the overrun ends the tick.
    pub fn tick(&self) {
        if self.threaded {
            return;
        }

        let budget = self.max_time_per_frame;
        let mut remaining = budget.as_secs_f64();

        while remaining > 0.0 {
            let job = match self.shared.queue.lock().peek_head() {
                Some(job) => job,
                None => break,
            };

            if job.is_complete() || job.is_cancelled() {
                job.force_complete();
                self.shared.queue.lock().remove(job.id());
                continue;
            }

            job.set_max_allocated_time(Duration::from_secs_f64(remaining));
            job.execute(self.shared.invoker.as_ref());
            remaining -= job.last_execution_time().as_secs_f64();

            if job.is_complete() {
                // Release by identity: the callable may have re-entrantly
                // cancelled jobs (this one included) during execute, so the
                // head slot is not guaranteed to still hold this job.
                self.shared.queue.lock().remove(job.id());
            } else {
                // Budget for this tick went to the head job; it resumes
                // next tick.
                break;
            }
        }
    }

    /// Cancel `handle`. A still-queued job is removed before it ever runs;
    /// an in-flight job only has its advisory flag set and is expected to
    /// observe it and stop promptly. Cancelling an already-finished or
    /// already-removed job is a no-op.
    pub fn cancel(&self, handle: &JobHandle) {
        handle.job.set_cancelled();
        let removed = self.shared.queue.lock().remove(handle.id());
        if removed {
            handle.job.force_complete();
            tracing::debug!(job_id = %handle.id(), "Cancelled queued job before execution");
        } else {
            tracing::debug!(job_id = %handle.id(), "Cancellation flagged for in-flight job");
        }
    }

    /// [`cancel`](Scheduler::cancel), then block until no worker slot
    /// references the job, so the caller observes it fully stopped.
    ///
    /// A job that never checks its cancellation flag keeps this blocked
    /// until the job finishes of its own accord. Must not be called from
    /// the worker thread executing the job (self-deadlock).
    pub fn cancel_and_wait(&self, handle: &JobHandle) {
        self.cancel(handle);
        if !self.threaded {
            // Single-threaded: nothing can be mid-flight while the caller
            // holds this thread.
            return;
        }

        let id = handle.id();
        let mut done = self.shared.done_lock.lock();
        while self.workers.iter().any(|ctx| ctx.holds(id)) {
            self.shared.done_cv.wait(&mut done);
        }
    }

    /// Job currently executing for the (receiver, method) pair. In
    /// cooperative mode this is the job at the queue head, there being no
    /// worker set.
    pub fn find_running(&self, receiver: ReceiverId, method: &str) -> Option<JobHandle> {
        if self.threaded {
            self.workers
                .iter()
                .find_map(|ctx| ctx.find(receiver, method))
                .map(JobHandle::new)
        } else {
            self.shared
                .queue
                .lock()
                .peek_head()
                .filter(|j| j.targets(receiver, method))
                .map(JobHandle::new)
        }
    }

    /// First queued job matching the (receiver, method) pair, in queue
    /// order.
    pub fn find_queued(&self, receiver: ReceiverId, method: &str) -> Option<JobHandle> {
        self.shared
            .queue
            .lock()
            .find(receiver, method)
            .map(JobHandle::new)
    }

    /// Running-then-queued lookup for the pair.
    pub fn get_job(&self, receiver: ReceiverId, method: &str) -> Option<JobHandle> {
        self.find_running(receiver, method)
            .or_else(|| self.find_queued(receiver, method))
    }

    /// Number of jobs waiting in the queue (excluding in-flight work).
    pub fn queued_len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// True when nothing is queued and no worker holds a job.
    pub fn is_idle(&self) -> bool {
        self.shared.queue.lock().is_empty()
            && self.workers.iter().all(|ctx| ctx.slot.lock().is_none())
    }

    /// Stop and join every worker thread. Queued jobs that never started
    /// are dropped unexecuted. Idempotent; also invoked on drop.
    pub fn shutdown(&self) {
        for ctx in &self.workers {
            ctx.request_stop();
        }
        let joins: Vec<_> = self.joins.lock().drain(..).collect();
        for join in joins {
            if join.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
