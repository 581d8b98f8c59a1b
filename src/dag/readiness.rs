// src/dag/readiness.rs

//! Per-pass readiness predicates.
//!
//! Both predicates are non-blocking reads of the neighbours' atomic flags.
//! The scheduler polls them (or counts them down) before running a node.

use std::sync::Arc;

use crate::dag::graph::DependencyGraph;
use crate::dag::node::Operator;
use crate::types::BackwardReadiness;

/// A node may run its forward step once every producer feeding it has
/// computed. Nodes without producers are immediately ready.
pub fn is_ready_forward<N: Operator>(predecessors: &[Arc<N>]) -> bool {
    predecessors.iter().all(|p| p.is_computed())
}

/// A node may run its backward step once its successors allow it.
///
/// `successors` must be in edge order: under
/// [`BackwardReadiness::FirstSuccessor`] only the first entry is consulted.
/// A sink (no successors) is always ready.
pub fn is_ready_backward<N: Operator>(successors: &[Arc<N>], policy: BackwardReadiness) -> bool {
    match policy {
        BackwardReadiness::FirstSuccessor => successors
            .first()
            .is_none_or(|s| s.is_backward_computed()),
        BackwardReadiness::AllSuccessors => successors.iter().all(|s| s.is_backward_computed()),
    }
}

impl<N: Operator> DependencyGraph<N> {
    pub fn is_ready_forward(&self, node: &Arc<N>) -> bool {
        is_ready_forward(&self.predecessors_of(node))
    }

    pub fn is_ready_backward(&self, node: &Arc<N>, policy: BackwardReadiness) -> bool {
        is_ready_backward(&self.successors_of(node), policy)
    }

    /// Nodes without successors; these get their gradient seeded before
    /// their own backward step.
    pub fn is_sink(&self, node: &Arc<N>) -> bool {
        self.successors_of(node).is_empty()
    }
}
