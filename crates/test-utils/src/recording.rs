use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gradflow::dag::Operator;
use gradflow::errors::{GradflowError, Result};

/// Shared, ordered log of what every `RecordingOperator` did.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Index of `event` in the log, if it happened.
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// Whether `first` was logged before `second`.
    pub fn before(&self, first: &str, second: &str) -> bool {
        match (self.position(first), self.position(second)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }
}

/// A fake operator that:
/// - appends `fwd:<name>`, `bwd:<name>` and `seed:<name>` to a shared log
/// - counts how often each body actually ran, and how often its input
///   gradients were cleared
/// - can be told to fail its forward step.
pub struct RecordingOperator {
    name: String,
    log: EventLog,
    computed: AtomicBool,
    backward_computed: AtomicBool,
    forward_runs: AtomicUsize,
    backward_runs: AtomicUsize,
    seeds: AtomicUsize,
    clears: AtomicUsize,
    fail_forward: bool,
}

impl RecordingOperator {
    pub fn new(name: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self::build(name, log, false))
    }

    pub fn failing(name: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self::build(name, log, true))
    }

    fn build(name: &str, log: &EventLog, fail_forward: bool) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            computed: AtomicBool::new(false),
            backward_computed: AtomicBool::new(false),
            forward_runs: AtomicUsize::new(0),
            backward_runs: AtomicUsize::new(0),
            seeds: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
            fail_forward,
        }
    }

    pub fn forward_runs(&self) -> usize {
        self.forward_runs.load(Ordering::SeqCst)
    }

    pub fn backward_runs(&self) -> usize {
        self.backward_runs.load(Ordering::SeqCst)
    }

    pub fn seeds(&self) -> usize {
        self.seeds.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl Operator for RecordingOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self) -> Result<()> {
        if self.fail_forward {
            return Err(GradflowError::shape_mismatch(&self.name, "forced failure"));
        }
        if !self.computed.load(Ordering::Acquire) {
            self.forward_runs.fetch_add(1, Ordering::SeqCst);
            self.log.push(format!("fwd:{}", self.name));
        }
        self.computed.store(true, Ordering::Release);
        Ok(())
    }

    fn init_grad(&self) {
        self.seeds.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("seed:{}", self.name));
    }

    fn clear_input_grads(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn backward_compute(&self) -> Result<()> {
        if !self.backward_computed.load(Ordering::Acquire) {
            self.backward_runs.fetch_add(1, Ordering::SeqCst);
            self.log.push(format!("bwd:{}", self.name));
        }
        self.backward_computed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_computed(&self) -> bool {
        self.computed.load(Ordering::Acquire)
    }

    fn is_backward_computed(&self) -> bool {
        self.backward_computed.load(Ordering::Acquire)
    }
}
