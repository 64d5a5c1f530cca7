//! Shared fake host for scheduler integration tests.
//!
//! Implements [`Invocable`] with canned per-method behaviors and
//! deterministic per-step sleeps, and records every observable side effect
//! so tests can assert on execution order.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use framepool::{Invocable, JobContext, PoolError, ReceiverId, Value};

/// Canned behavior of one registered host method.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// One-shot body: sleep `cost`, record one call.
    OneShot { cost: Duration },
    /// Staged body of `steps` sub-steps, each sleeping `cost`. Observes the
    /// time budget and the cancellation flag between sub-steps.
    Staged { steps: u32, cost: Duration },
    /// Always fails with an invocation error.
    Failing,
}

/// Fake host. Methods are keyed by (receiver, name); side effects are
/// recorded as `"receiver:method"` (one-shot) or `"receiver:method:step"`
/// (staged) entries.
pub struct TestHost {
    methods: HashMap<(ReceiverId, String), Behavior>,
    calls: Mutex<Vec<String>>,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_method(mut self, receiver: ReceiverId, name: &str, behavior: Behavior) -> Self {
        self.methods.insert((receiver, name.to_string()), behavior);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, entry: String) {
        self.calls.lock().unwrap().push(entry);
    }
}

impl Invocable for TestHost {
    fn has_method(&self, receiver: ReceiverId, method: &str) -> bool {
        self.methods.contains_key(&(receiver, method.to_string()))
    }

    fn call(
        &self,
        receiver: ReceiverId,
        method: &str,
        _args: &[Value],
        ctx: &mut JobContext<'_>,
    ) -> framepool::Result<()> {
        let behavior = self
            .methods
            .get(&(receiver, method.to_string()))
            .cloned()
            .ok_or_else(|| PoolError::Invoke {
                method: method.to_string(),
                message: "method disappeared mid-flight".to_string(),
            })?;

        match behavior {
            Behavior::OneShot { cost } => {
                std::thread::sleep(cost);
                self.record(format!("{receiver}:{method}"));
                Ok(())
            }
            Behavior::Staged { steps, cost } => {
                for i in 0..steps {
                    if ctx.is_cancelled() {
                        return Ok(());
                    }
                    if !ctx.should_continue() {
                        // Yield; resumed on a later run.
                        return Ok(());
                    }
                    if !ctx.should_skip() {
                        std::thread::sleep(cost);
                        self.record(format!("{receiver}:{method}:{i}"));
                    }
                }
                ctx.mark_complete();
                Ok(())
            }
            Behavior::Failing => Err(PoolError::Invoke {
                method: method.to_string(),
                message: "host rejected the call".to_string(),
            }),
        }
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn assert_eventually(timeout: Duration, mut cond: impl FnMut() -> bool, msg: &str) {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("condition not met within {timeout:?}: {msg}");
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
