use std::time::Duration;

/// Configuration for a [`Scheduler`](crate::Scheduler).
///
/// All knobs are read once at construction; the scheduler never re-reads
/// them. Invalid values are corrected by [`PoolConfig::sanitized`] with a
/// diagnostic rather than failing construction.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Execute jobs on a fixed pool of worker threads. When false, jobs run
    /// cooperatively, a time-sliced amount per host frame tick.
    pub use_threads: bool,

    /// Number of worker threads. Zero or negative means "derive from the
    /// host's available parallelism", falling back to
    /// `fallback_thread_count` if the host cannot report it.
    pub thread_count: i32,

    /// Floor for the derived thread count. Sanitized to at least 1.
    pub fallback_thread_count: i32,

    /// Share of one frame interval the cooperative executor may consume,
    /// in percent (0–100).
    pub max_work_per_frame_percent: f32,

    /// Duration of one host frame at the target frame rate.
    pub target_frame_time: Duration,

    /// Initial capacity of the job queue's backing array.
    pub initial_queue_capacity: usize,

    /// Number of slots added when the backing array grows.
    pub queue_growth_step: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            use_threads: true,
            thread_count: 4,
            fallback_thread_count: 1,
            max_work_per_frame_percent: 25.0,
            // 60 fps
            target_frame_time: Duration::from_nanos(16_666_667),
            initial_queue_capacity: 8,
            queue_growth_step: 8,
        }
    }
}

impl PoolConfig {
    /// Cooperative-mode configuration with the given per-frame work share.
    pub fn cooperative(max_work_per_frame_percent: f32) -> Self {
        Self {
            use_threads: false,
            max_work_per_frame_percent,
            ..Default::default()
        }
    }

    /// Threaded-mode configuration with an explicit thread count.
    pub fn threaded(thread_count: i32) -> Self {
        Self {
            use_threads: true,
            thread_count,
            ..Default::default()
        }
    }

    pub fn with_target_frame_time(mut self, frame_time: Duration) -> Self {
        self.target_frame_time = frame_time;
        self
    }

    pub fn with_queue_capacity(mut self, initial: usize, growth_step: usize) -> Self {
        self.initial_queue_capacity = initial;
        self.queue_growth_step = growth_step;
        self
    }

    /// Correct out-of-range values, logging a diagnostic for each fix.
    /// Nothing here is fatal.
    pub fn sanitized(mut self) -> Self {
        if self.fallback_thread_count < 1 {
            tracing::warn!(
                fallback_thread_count = self.fallback_thread_count,
                "Non-positive fallback thread count, correcting to 1"
            );
            self.fallback_thread_count = 1;
        }
        if !(0.0..=100.0).contains(&self.max_work_per_frame_percent) {
            let clamped = self.max_work_per_frame_percent.clamp(0.0, 100.0);
            tracing::warn!(
                max_work_per_frame_percent = self.max_work_per_frame_percent,
                clamped,
                "Frame work percentage out of range, clamping"
            );
            self.max_work_per_frame_percent = clamped;
        }
        if self.initial_queue_capacity == 0 {
            tracing::warn!("Zero initial queue capacity, correcting to 1");
            self.initial_queue_capacity = 1;
        }
        if self.queue_growth_step == 0 {
            tracing::warn!("Zero queue growth step, correcting to 1");
            self.queue_growth_step = 1;
        }
        self
    }

    /// Time budget for one cooperative tick: the configured share of one
    /// frame interval.
    pub fn max_time_per_frame(&self) -> Duration {
        self.target_frame_time
            .mul_f64(f64::from(self.max_work_per_frame_percent) / 100.0)
    }

    /// Worker threads to spawn. `thread_count` if positive, otherwise the
    /// host-reported parallelism, floored at `fallback_thread_count`.
    ///
    /// Expects a sanitized config (`fallback_thread_count >= 1`).
    pub fn effective_thread_count(&self) -> usize {
        if self.thread_count > 0 {
            return self.thread_count as usize;
        }
        match std::thread::available_parallelism() {
            Ok(n) => n.get().max(self.fallback_thread_count as usize),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback = self.fallback_thread_count,
                    "Host cannot report available parallelism, using fallback"
                );
                self.fallback_thread_count as usize
            }
        }
    }
}
