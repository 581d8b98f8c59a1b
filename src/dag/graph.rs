// src/dag/graph.rs

use std::sync::Arc;

use crate::dag::node::Operator;

/// Directed edge `(producer, consumer)`, stored as indices into the node list.
pub type EdgeIndex = (usize, usize);

/// Operator nodes plus the producer → consumer edges between them.
///
/// Nodes are kept in first-seen order across registrations and compared by
/// `Arc` identity. Duplicate edges are kept as-is; they only change the edge
/// count, never predecessor or successor membership as seen by the
/// readiness predicates.
///
/// Acyclicity is a caller obligation. A cycle makes every pass over the
/// graph wait forever.
#[derive(Debug)]
pub struct DependencyGraph<N: Operator> {
    nodes: Vec<Arc<N>>,
    edges: Vec<EdgeIndex>,
}

impl<N: Operator> DependencyGraph<N> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Append the edge `producer → consumer`, registering either endpoint if
    /// it has not been seen yet (producer first).
    pub fn add_edge(&mut self, producer: &Arc<N>, consumer: &Arc<N>) {
        let from = self.register(producer);
        let to = self.register(consumer);
        self.edges.push((from, to));
    }

    /// Register a node without any edge. Useful for isolated nodes, which
    /// would otherwise never be part of a pass.
    pub fn add_node(&mut self, node: &Arc<N>) {
        self.register(node);
    }

    pub fn nodes(&self) -> &[Arc<N>] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeIndex] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: &Arc<N>) -> bool {
        self.index_of(node).is_some()
    }

    /// Position of `node` in registration order.
    pub fn index_of(&self, node: &Arc<N>) -> Option<usize> {
        self.nodes.iter().position(|n| Arc::ptr_eq(n, node))
    }

    /// Producers feeding `node`, one entry per edge, in edge order.
    pub fn predecessors_of(&self, node: &Arc<N>) -> Vec<Arc<N>> {
        match self.index_of(node) {
            Some(idx) => self
                .predecessor_indices(idx)
                .into_iter()
                .map(|i| Arc::clone(&self.nodes[i]))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Consumers fed by `node`, one entry per edge, in edge order.
    pub fn successors_of(&self, node: &Arc<N>) -> Vec<Arc<N>> {
        match self.index_of(node) {
            Some(idx) => self
                .successor_indices(idx)
                .into_iter()
                .map(|i| Arc::clone(&self.nodes[i]))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn predecessor_indices(&self, idx: usize) -> Vec<usize> {
        self.edges
            .iter()
            .filter(|(_, to)| *to == idx)
            .map(|(from, _)| *from)
            .collect()
    }

    pub fn successor_indices(&self, idx: usize) -> Vec<usize> {
        self.edges
            .iter()
            .filter(|(from, _)| *from == idx)
            .map(|(_, to)| *to)
            .collect()
    }

    fn register(&mut self, node: &Arc<N>) -> usize {
        match self.index_of(node) {
            Some(idx) => idx,
            None => {
                self.nodes.push(Arc::clone(node));
                self.nodes.len() - 1
            }
        }
    }
}

impl<N: Operator> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}
