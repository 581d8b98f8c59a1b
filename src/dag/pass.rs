// src/dag/pass.rs

//! Per-pass bookkeeping shared between the scheduler and its worker jobs.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::errors::{GradflowError, Result};
use crate::pool::WorkerPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Backward => f.write_str("backward"),
        }
    }
}

/// State shared by every job of one pass.
///
/// The first fatal operator error is kept and raises `aborted`, which every
/// job still waiting on its readiness predicate checks so it can give up
/// instead of waiting on a node that will never finish.
#[derive(Debug)]
pub struct PassState {
    direction: Direction,
    aborted: AtomicBool,
    completed: AtomicUsize,
    error: Mutex<Option<GradflowError>>,
}

impl PassState {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            aborted: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
            error: Mutex::new(None),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub fn node_finished(&self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
    }

    /// Record a fatal error from `node` and abort the pass. Only the first
    /// error is kept.
    pub fn fail(&self, node: &str, err: GradflowError) {
        error!(
            op = %node,
            direction = %self.direction,
            error = %err,
            "operator failed; aborting pass"
        );
        let mut slot = self.error.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
        self.aborted.store(true, Ordering::Release);
    }

    fn take_error(&self) -> Option<GradflowError> {
        self.error.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

/// Outcome of a pass that ran every node.
#[derive(Debug, Clone, Copy)]
pub struct PassSummary {
    pub direction: Direction,
    /// Nodes whose body ran in this pass.
    pub nodes: usize,
    pub elapsed: Duration,
}

/// A pass whose jobs have been submitted but not necessarily finished.
#[must_use = "a pass handle reports operator errors only through `wait`"]
pub struct PassHandle<P: WorkerPool> {
    pool: Arc<P>,
    state: Arc<PassState>,
    nodes: usize,
    started: Instant,
}

impl<P: WorkerPool> PassHandle<P> {
    pub(crate) fn new(pool: Arc<P>, state: Arc<PassState>, nodes: usize) -> Self {
        Self {
            pool,
            state,
            nodes,
            started: Instant::now(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.state.is_aborted()
    }

    /// Block until the pool drains, then report the pass outcome.
    pub fn wait(self) -> Result<PassSummary> {
        self.pool.wait();

        if let Some(err) = self.state.take_error() {
            return Err(err);
        }

        let completed = self.state.completed();
        if completed != self.nodes {
            return Err(GradflowError::PassAborted(format!(
                "{} pass finished {} of {} nodes",
                self.state.direction(),
                completed,
                self.nodes
            )));
        }

        let summary = PassSummary {
            direction: self.state.direction(),
            nodes: completed,
            elapsed: self.started.elapsed(),
        };
        info!(
            direction = %summary.direction,
            nodes = summary.nodes,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "pass finished"
        );
        Ok(summary)
    }
}
