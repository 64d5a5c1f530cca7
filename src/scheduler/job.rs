use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::invoke::{Invocable, ReceiverId, Value};

/// How a job's `execute` call relates to its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Resumable: the callable may yield partial progress and be re-invoked
    /// later, picking up at the recorded stage.
    Staged,
    /// Runs its entire body in one `execute` call; staging and time-budget
    /// hints are ignored.
    OneShot,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Staged => write!(f, "staged"),
            JobKind::OneShot => write!(f, "oneshot"),
        }
    }
}

/// A unit of deferred work targeting one host method.
///
/// A job is owned by exactly one of the job queue or a worker's assignment
/// slot at a time, and by neither once complete and released; handles only
/// observe it. Flags are atomic because cancellation and completion checks
/// cross threads; the stage counters are only ever touched by the single
/// executor currently running the job.
#[derive(Debug)]
pub struct Job {
    id: Uuid,
    kind: JobKind,
    receiver: ReceiverId,
    method: String,
    args: Vec<Value>,
    created_at: DateTime<Utc>,

    complete: AtomicBool,
    cancelled: AtomicBool,

    limit_execution_time: AtomicBool,
    /// Time budget for the current run, in nanoseconds.
    max_allocated_nanos: AtomicU64,
    /// Duration of the most recent `execute` call, in nanoseconds.
    last_run_nanos: AtomicU64,
    run_started: Mutex<Option<Instant>>,

    current_run_stage: AtomicU32,
    stage: AtomicU32,
}

impl Job {
    pub(crate) fn new(
        kind: JobKind,
        receiver: ReceiverId,
        method: String,
        args: Vec<Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            receiver,
            method,
            args,
            created_at: Utc::now(),
            complete: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            limit_execution_time: AtomicBool::new(false),
            max_allocated_nanos: AtomicU64::new(0),
            last_run_nanos: AtomicU64::new(0),
            run_started: Mutex::new(None),
            current_run_stage: AtomicU32::new(0),
            stage: AtomicU32::new(0),
        }
    }

    /// A job whose target was absent at submission time. Starts complete, so
    /// it is never enqueued or executed: a no-op from birth.
    pub(crate) fn invalid(
        kind: JobKind,
        receiver: ReceiverId,
        method: String,
        args: Vec<Value>,
    ) -> Self {
        let job = Self::new(kind, receiver, method, args);
        job.complete.store(true, Ordering::SeqCst);
        job
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn receiver(&self) -> ReceiverId {
        self.receiver
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn set_cancelled(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub(crate) fn force_complete(&self) {
        self.complete.store(true, Ordering::SeqCst);
    }

    /// Whether a (receiver, method) lookup pair matches this job.
    pub(crate) fn targets(&self, receiver: ReceiverId, method: &str) -> bool {
        self.receiver == receiver && self.method == method
    }

    pub fn is_time_limited(&self) -> bool {
        self.limit_execution_time.load(Ordering::SeqCst)
    }

    pub(crate) fn set_time_limited(&self, limited: bool) {
        self.limit_execution_time.store(limited, Ordering::SeqCst);
    }

    pub fn max_allocated_time(&self) -> Duration {
        Duration::from_nanos(self.max_allocated_nanos.load(Ordering::SeqCst))
    }

    pub(crate) fn set_max_allocated_time(&self, budget: Duration) {
        self.max_allocated_nanos
            .store(budget.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Duration of the most recent `execute` call.
    pub fn last_execution_time(&self) -> Duration {
        Duration::from_nanos(self.last_run_nanos.load(Ordering::SeqCst))
    }

    /// Persisted stage cursor: how many sub-steps have been performed across
    /// all runs so far.
    pub fn stage(&self) -> u32 {
        self.stage.load(Ordering::SeqCst)
    }

    pub fn current_run_stage(&self) -> u32 {
        self.current_run_stage.load(Ordering::SeqCst)
    }

    /// Time elapsed since the current run started, or zero when not running.
    pub fn current_execution_time(&self) -> Duration {
        match *self.run_started.lock() {
            Some(start) => start.elapsed(),
            None => Duration::ZERO,
        }
    }

    /// Run the job's callable once.
    ///
    /// One-shot jobs are complete when this returns, whatever the callable
    /// did. Staged jobs are complete only if the callable said so via
    /// [`JobContext::mark_complete`], unless the call failed, in which case
    /// the job is forced complete so it reaches a terminal state.
    pub(crate) fn execute(&self, invoker: &dyn Invocable) {
        if self.is_complete() {
            return;
        }
        if self.is_cancelled() {
            // Cancelled before any executor picked it up.
            self.force_complete();
            return;
        }

        self.current_run_stage.store(0, Ordering::SeqCst);
        *self.run_started.lock() = Some(Instant::now());

        let mut ctx = JobContext { job: self };
        let result = invoker.call(self.receiver, &self.method, &self.args, &mut ctx);

        let elapsed = {
            let mut started = self.run_started.lock();
            let elapsed = match *started {
                Some(start) => start.elapsed(),
                None => Duration::ZERO,
            };
            *started = None;
            elapsed
        };
        self.last_run_nanos
            .store(elapsed.as_nanos() as u64, Ordering::SeqCst);

        if let Err(e) = result {
            tracing::error!(
                job_id = %self.id,
                receiver = %self.receiver,
                method = %self.method,
                error = %e,
                "Job invocation failed"
            );
            self.force_complete();
            return;
        }

        if self.kind == JobKind::OneShot {
            self.force_complete();
        }
    }
}

/// Staging protocol handed to the callable for the duration of one
/// `execute` call.
///
/// A staged implementation writes its work as a deterministic sequence of
/// sub-steps, prefixing each with [`should_skip`](Self::should_skip) and
/// polling [`should_continue`](Self::should_continue) between sub-steps:
///
/// ```ignore
/// for i in 0..sub_steps {
///     if ctx.is_cancelled() {
///         return Ok(());
///     }
///     if !ctx.should_skip() {
///         do_sub_step(i);
///     }
///     if !ctx.should_continue() {
///         return Ok(()); // yield; resumed on a later run
///     }
/// }
/// ctx.mark_complete();
/// ```
#[derive(Debug)]
pub struct JobContext<'a> {
    pub(crate) job: &'a Job,
}

impl JobContext<'_> {
    /// Sub-step gate. Returns true while the in-run cursor is behind the
    /// persisted stage counter (the sub-step already ran in a prior
    /// resumption, skip its body); once caught up, advances both counters
    /// together and returns false (do the sub-step now).
    pub fn should_skip(&mut self) -> bool {
        let current = self.job.current_run_stage.load(Ordering::SeqCst);
        if current < self.job.stage.load(Ordering::SeqCst) {
            self.job
                .current_run_stage
                .store(current + 1, Ordering::SeqCst);
            return true;
        }

        self.job
            .current_run_stage
            .store(current + 1, Ordering::SeqCst);
        self.job.stage.fetch_add(1, Ordering::SeqCst);
        false
    }

    /// Whether the job may keep working. False once a time-limited job has
    /// exhausted its allotted budget; always true for unlimited jobs, so a
    /// staged job dispatched to a worker thread runs to completion in its
    /// single `execute` call.
    pub fn should_continue(&self) -> bool {
        if !self.job.is_time_limited() {
            return true;
        }
        self.job.current_execution_time() < self.job.max_allocated_time()
    }

    /// Advisory cancellation flag. Well-behaved callables poll this between
    /// sub-steps and stop generating new ones once it is set.
    pub fn is_cancelled(&self) -> bool {
        self.job.is_cancelled()
    }

    /// Declare all sub-steps done. The scheduler releases the job after the
    /// current run returns.
    pub fn mark_complete(&mut self) {
        self.job.force_complete();
    }

    pub fn stage(&self) -> u32 {
        self.job.stage()
    }

    pub fn current_run_stage(&self) -> u32 {
        self.job.current_run_stage()
    }

    pub fn current_execution_time(&self) -> Duration {
        self.job.current_execution_time()
    }
}

/// Cheaply cloneable public view of a submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub(crate) job: Arc<Job>,
}

impl JobHandle {
    pub(crate) fn new(job: Arc<Job>) -> Self {
        Self { job }
    }

    pub fn id(&self) -> Uuid {
        self.job.id()
    }

    pub fn kind(&self) -> JobKind {
        self.job.kind()
    }

    pub fn receiver(&self) -> ReceiverId {
        self.job.receiver()
    }

    pub fn method(&self) -> &str {
        self.job.method()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.job.created_at()
    }

    pub fn is_complete(&self) -> bool {
        self.job.is_complete()
    }

    pub fn is_cancelled(&self) -> bool {
        self.job.is_cancelled()
    }

    /// Opt a staged job in or out of per-tick time-boxing. Only meaningful
    /// in cooperative mode; worker threads always run unlimited.
    pub fn set_time_limited(&self, limited: bool) {
        self.job.set_time_limited(limited);
    }

    pub fn is_time_limited(&self) -> bool {
        self.job.is_time_limited()
    }

    pub fn stage(&self) -> u32 {
        self.job.stage()
    }

    pub fn current_run_stage(&self) -> u32 {
        self.job.current_run_stage()
    }

    pub fn current_execution_time(&self) -> Duration {
        self.job.current_execution_time()
    }

    pub fn last_execution_time(&self) -> Duration {
        self.job.last_execution_time()
    }
}

impl PartialEq for JobHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.job, &other.job)
    }
}

impl Eq for JobHandle {}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged_job() -> Job {
        Job::new(
            JobKind::Staged,
            ReceiverId(1),
            "work".to_string(),
            Vec::new(),
        )
    }

    #[test]
    fn should_skip_advances_on_fresh_job() {
        let job = staged_job();
        let mut ctx = JobContext { job: &job };

        // No prior progress: every sub-step runs, both counters advance.
        assert!(!ctx.should_skip());
        assert!(!ctx.should_skip());
        assert_eq!(job.stage(), 2);
        assert_eq!(job.current_run_stage(), 2);
    }

    #[test]
    fn should_skip_replays_past_stages_after_resume() {
        let job = staged_job();

        // First run performs two sub-steps.
        {
            let mut ctx = JobContext { job: &job };
            assert!(!ctx.should_skip());
            assert!(!ctx.should_skip());
        }

        // Resumption: the in-run cursor restarts, the first two sub-steps
        // are skipped, the third runs.
        job.current_run_stage.store(0, Ordering::SeqCst);
        let mut ctx = JobContext { job: &job };
        assert!(ctx.should_skip());
        assert!(ctx.should_skip());
        assert!(!ctx.should_skip());
        assert_eq!(job.stage(), 3);
    }

    #[test]
    fn should_continue_unlimited_by_default() {
        let job = staged_job();
        let ctx = JobContext { job: &job };
        assert!(ctx.should_continue());
    }

    #[test]
    fn should_continue_false_once_budget_spent() {
        let job = staged_job();
        job.set_time_limited(true);
        job.set_max_allocated_time(Duration::from_millis(1));
        *job.run_started.lock() = Some(Instant::now() - Duration::from_millis(10));

        let ctx = JobContext { job: &job };
        assert!(!ctx.should_continue());
    }

    #[test]
    fn invalid_job_starts_complete() {
        let job = Job::invalid(
            JobKind::OneShot,
            ReceiverId(9),
            "missing".to_string(),
            Vec::new(),
        );
        assert!(job.is_complete());
    }
}
