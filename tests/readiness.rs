// tests/readiness.rs

mod common;

use gradflow::dag::readiness::{is_ready_backward, is_ready_forward};
use gradflow::dag::{DependencyGraph, Operator};
use gradflow::types::BackwardReadiness;

use crate::common::{EventLog, RecordingOperator};

#[test]
fn forward_requires_every_predecessor() {
    let log = EventLog::new();
    let a = RecordingOperator::new("a", &log);
    let b = RecordingOperator::new("b", &log);
    let m = RecordingOperator::new("m", &log);

    let mut graph = DependencyGraph::new();
    graph.add_edge(&a, &m);
    graph.add_edge(&b, &m);

    assert!(graph.is_ready_forward(&a));
    assert!(!graph.is_ready_forward(&m));

    a.compute().unwrap();
    assert!(!graph.is_ready_forward(&m), "one producer is not enough");

    b.compute().unwrap();
    assert!(graph.is_ready_forward(&m));
}

#[test]
fn forward_predicate_on_empty_predecessors_is_true() {
    let none: Vec<std::sync::Arc<RecordingOperator>> = Vec::new();
    assert!(is_ready_forward(&none));
}

#[test]
fn sinks_are_backward_ready_under_both_policies() {
    let none: Vec<std::sync::Arc<RecordingOperator>> = Vec::new();
    assert!(is_ready_backward(&none, BackwardReadiness::FirstSuccessor));
    assert!(is_ready_backward(&none, BackwardReadiness::AllSuccessors));
}

#[test]
fn backward_policies_diverge_on_fan_out() {
    let log = EventLog::new();
    let src = RecordingOperator::new("src", &log);
    let left = RecordingOperator::new("left", &log);
    let right = RecordingOperator::new("right", &log);

    let mut graph = DependencyGraph::new();
    graph.add_edge(&src, &left);
    graph.add_edge(&src, &right);

    assert!(!graph.is_ready_backward(&src, BackwardReadiness::FirstSuccessor));
    assert!(!graph.is_ready_backward(&src, BackwardReadiness::AllSuccessors));

    left.backward_compute().unwrap();

    // Only the first successor in edge order is consulted.
    assert!(graph.is_ready_backward(&src, BackwardReadiness::FirstSuccessor));
    assert!(!graph.is_ready_backward(&src, BackwardReadiness::AllSuccessors));

    right.backward_compute().unwrap();
    assert!(graph.is_ready_backward(&src, BackwardReadiness::AllSuccessors));
}

#[test]
fn first_successor_ignores_later_successors_even_when_done() {
    let log = EventLog::new();
    let src = RecordingOperator::new("src", &log);
    let left = RecordingOperator::new("left", &log);
    let right = RecordingOperator::new("right", &log);

    let mut graph = DependencyGraph::new();
    graph.add_edge(&src, &left);
    graph.add_edge(&src, &right);

    right.backward_compute().unwrap();

    assert!(!graph.is_ready_backward(&src, BackwardReadiness::FirstSuccessor));
}
