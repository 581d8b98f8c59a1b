// src/dag/scheduler.rs

use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info, trace, warn};

use crate::dag::graph::DependencyGraph;
use crate::dag::node::Operator;
use crate::dag::pass::{Direction, PassHandle, PassState, PassSummary};
use crate::dag::readiness::{is_ready_backward, is_ready_forward};
use crate::errors::{GradflowError, Result};
use crate::pool::WorkerPool;
use crate::types::{BackwardReadiness, Dispatch};

/// Knobs that change how a pass is driven, not what it computes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub backward_readiness: BackwardReadiness,
    pub dispatch: Dispatch,
}

/// Drives forward and backward passes over a [`DependencyGraph`] using a
/// shared worker pool.
///
/// Every node contributes exactly one job per pass. How that job waits for
/// its dependencies depends on [`Dispatch`]:
/// - `Polling`: all jobs are submitted up front in registration order and
///   each one polls its readiness predicate until it holds.
/// - `Counted`: a job is only submitted once its dependency counter drops
///   to zero, so no worker ever sits on an unmet predicate.
///
/// The scheduler never checks for cycles. A cyclic graph, or a polling pass
/// on a pool narrower than the graph's widest anti-chain, waits forever.
pub struct Scheduler<P: WorkerPool> {
    pool: Arc<P>,
    options: SchedulerOptions,
}

impl<P: WorkerPool> Scheduler<P> {
    pub fn new(pool: Arc<P>) -> Self {
        Self::with_options(pool, SchedulerOptions::default())
    }

    pub fn with_options(pool: Arc<P>, options: SchedulerOptions) -> Self {
        Self { pool, options }
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    /// Submit the forward pass and return without waiting for it.
    pub fn forward<N: Operator + 'static>(&self, graph: &DependencyGraph<N>) -> PassHandle<P> {
        self.start_pass(graph, Direction::Forward)
    }

    /// Run the forward pass and block until every node has computed.
    pub fn forward_synced<N: Operator + 'static>(
        &self,
        graph: &DependencyGraph<N>,
    ) -> Result<PassSummary> {
        self.forward(graph).wait()
    }

    /// Run the backward pass and block until it finishes.
    ///
    /// Requires a finished forward pass: outstanding pool work is drained
    /// first, and the call fails if any node is still uncomputed. Input
    /// gradients of nodes that have not run backward yet are zeroed before
    /// any job is submitted; sinks are then seeded with ones.
    pub fn backward<N: Operator + 'static>(
        &self,
        graph: &DependencyGraph<N>,
    ) -> Result<PassSummary> {
        self.pool.wait();

        if let Some(node) = graph.nodes().iter().find(|n| !n.is_computed()) {
            return Err(GradflowError::PassAborted(format!(
                "backward requested before '{}' finished its forward step",
                node.name()
            )));
        }

        // Inputs shared by several consumers collect one contribution per
        // consumer, so every gradient a pending node writes starts at zero.
        for node in graph.nodes().iter().filter(|n| !n.is_backward_computed()) {
            node.clear_input_grads();
        }

        self.start_pass(graph, Direction::Backward).wait()
    }

    fn start_pass<N: Operator + 'static>(
        &self,
        graph: &DependencyGraph<N>,
        direction: Direction,
    ) -> PassHandle<P> {
        let state = Arc::new(PassState::new(direction));

        info!(
            direction = %direction,
            nodes = graph.len(),
            edges = graph.edges().len(),
            workers = self.pool.size(),
            dispatch = ?self.options.dispatch,
            "starting pass"
        );

        match self.options.dispatch {
            Dispatch::Polling => {
                if self.pool.size() < graph.len() {
                    warn!(
                        workers = self.pool.size(),
                        nodes = graph.len(),
                        "polling dispatch with fewer workers than nodes; the pass \
                         starves if more nodes than workers are waiting at once"
                    );
                }
                self.submit_polling(graph, &state);
            }
            Dispatch::Counted => self.submit_counted(graph, &state),
        }

        PassHandle::new(Arc::clone(&self.pool), state, graph.len())
    }

    fn submit_polling<N: Operator + 'static>(
        &self,
        graph: &DependencyGraph<N>,
        state: &Arc<PassState>,
    ) {
        let direction = state.direction();
        let policy = self.options.backward_readiness;

        for node in graph.nodes() {
            let node = Arc::clone(node);
            let state = Arc::clone(state);
            let neighbours = match direction {
                Direction::Forward => graph.predecessors_of(&node),
                Direction::Backward => graph.successors_of(&node),
            };

            trace!(op = %node.name(), direction = %direction, "submitting polling job");

            self.pool.schedule(Box::new(move || {
                let mut backoff = Backoff::default();
                loop {
                    let ready = match direction {
                        Direction::Forward => is_ready_forward(&neighbours),
                        Direction::Backward => is_ready_backward(&neighbours, policy),
                    };
                    if ready {
                        break;
                    }
                    if state.is_aborted() {
                        debug!(op = %node.name(), "pass aborted while waiting; giving up");
                        return;
                    }
                    backoff.snooze();
                }

                let is_sink = direction == Direction::Backward && neighbours.is_empty();
                run_node(&*node, direction, is_sink, &state);
            }));
        }
    }

    fn submit_counted<N: Operator + 'static>(
        &self,
        graph: &DependencyGraph<N>,
        state: &Arc<PassState>,
    ) {
        let plan = Arc::new(CountedPlan::build(
            graph,
            state.direction(),
            self.options.backward_readiness,
        ));

        let roots: Vec<usize> = (0..plan.nodes.len())
            .filter(|&i| plan.pending[i].load(Ordering::Acquire) == 0)
            .collect();
        debug!(direction = %state.direction(), roots = roots.len(), "counted dispatch roots");

        for idx in roots {
            schedule_counted(Arc::clone(&self.pool), Arc::clone(&plan), Arc::clone(state), idx);
        }
    }
}

/// Run one node's body for `direction`, recording success or failure.
///
/// Returns `true` when the node finished. A panic inside the body is turned
/// into a pass failure so that nodes waiting on this one stop waiting.
fn run_node<N: Operator>(node: &N, direction: Direction, is_sink: bool, state: &PassState) -> bool {
    if state.is_aborted() {
        return false;
    }

    let outcome = catch_unwind(AssertUnwindSafe(|| match direction {
        Direction::Forward => node.compute(),
        Direction::Backward => {
            if is_sink {
                node.init_grad();
            }
            node.backward_compute()
        }
    }));

    match outcome {
        Ok(Ok(())) => {
            state.node_finished();
            true
        }
        Ok(Err(err)) => {
            state.fail(node.name(), err);
            false
        }
        Err(_) => {
            state.fail(
                node.name(),
                GradflowError::PassAborted(format!("operator '{}' panicked", node.name())),
            );
            false
        }
    }
}

/// Dependency counters for one counted pass.
struct CountedPlan<N: Operator> {
    nodes: Vec<Arc<N>>,
    /// Outstanding dependencies per node; the node is submitted at zero.
    pending: Vec<AtomicUsize>,
    /// Nodes whose counter drops when this node finishes.
    releases: Vec<Vec<usize>>,
    /// Backward only: nodes with no successors, seeded before running.
    sinks: Vec<bool>,
    direction: Direction,
}

impl<N: Operator> CountedPlan<N> {
    fn build(graph: &DependencyGraph<N>, direction: Direction, policy: BackwardReadiness) -> Self {
        let len = graph.len();
        let mut pending = vec![0usize; len];
        let mut releases: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); len];
        let mut sinks = vec![false; len];

        for idx in 0..len {
            match direction {
                Direction::Forward => {
                    let preds: BTreeSet<usize> =
                        graph.predecessor_indices(idx).into_iter().collect();
                    pending[idx] = preds.len();
                    for p in preds {
                        releases[p].insert(idx);
                    }
                }
                Direction::Backward => {
                    let succs = graph.successor_indices(idx);
                    sinks[idx] = succs.is_empty();
                    match policy {
                        BackwardReadiness::FirstSuccessor => {
                            if let Some(&first) = succs.first() {
                                pending[idx] = 1;
                                releases[first].insert(idx);
                            }
                        }
                        BackwardReadiness::AllSuccessors => {
                            let distinct: BTreeSet<usize> = succs.into_iter().collect();
                            pending[idx] = distinct.len();
                            for s in distinct {
                                releases[s].insert(idx);
                            }
                        }
                    }
                }
            }
        }

        Self {
            nodes: graph.nodes().to_vec(),
            pending: pending.into_iter().map(AtomicUsize::new).collect(),
            releases: releases.into_iter().map(|s| s.into_iter().collect()).collect(),
            sinks,
            direction,
        }
    }
}

fn schedule_counted<P: WorkerPool, N: Operator + 'static>(
    pool: Arc<P>,
    plan: Arc<CountedPlan<N>>,
    state: Arc<PassState>,
    idx: usize,
) {
    trace!(op = %plan.nodes[idx].name(), direction = %plan.direction, "submitting counted job");

    let submitter = Arc::clone(&pool);
    submitter.schedule(Box::new(move || {
        let node = &plan.nodes[idx];
        if !run_node(&**node, plan.direction, plan.sinks[idx], &state) {
            return;
        }

        for &next in &plan.releases[idx] {
            if plan.pending[next].fetch_sub(1, Ordering::AcqRel) == 1 {
                schedule_counted(Arc::clone(&pool), Arc::clone(&plan), Arc::clone(&state), next);
            }
        }
    }));
}

/// Spin briefly, then start yielding the thread between polls.
#[derive(Default)]
struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;

    fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..(1 << self.step) {
                std::hint::spin_loop();
            }
            self.step += 1;
        } else {
            std::thread::yield_now();
        }
    }
}
