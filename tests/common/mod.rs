#![allow(dead_code)]

use std::sync::Arc;

use gradflow::dag::{DependencyGraph, Operator, Scheduler, SchedulerOptions};
use gradflow::pool::RayonWorkerPool;
use gradflow::types::{BackwardReadiness, Dispatch};

pub use gradflow_test_utils::builders;
pub use gradflow_test_utils::init_tracing;
pub use gradflow_test_utils::recording::{EventLog, RecordingOperator};

pub fn scheduler(workers: usize) -> Scheduler<RayonWorkerPool> {
    scheduler_with(workers, Dispatch::Polling, BackwardReadiness::FirstSuccessor)
}

pub fn scheduler_with(
    workers: usize,
    dispatch: Dispatch,
    backward_readiness: BackwardReadiness,
) -> Scheduler<RayonWorkerPool> {
    let pool = Arc::new(RayonWorkerPool::new(workers).expect("pool should start"));
    Scheduler::with_options(
        pool,
        SchedulerOptions {
            backward_readiness,
            dispatch,
        },
    )
}

/// Names of a graph's nodes in registration order.
pub fn node_names<N: Operator>(graph: &DependencyGraph<N>) -> Vec<String> {
    graph.nodes().iter().map(|n| n.name().to_string()).collect()
}
