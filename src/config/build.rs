// src/config/build.rs

//! Materialise a validated graph file into buffers, nodes and a graph.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::buffer::Buffer;
use crate::config::model::ConfigFile;
use crate::config::validate::topological_order;
use crate::dag::{DependencyGraph, OperatorNode};
use crate::errors::{GradflowError, Result};

/// Everything a graph file describes, ready to hand to a scheduler.
#[derive(Debug)]
pub struct BuiltGraph {
    pub buffers: BTreeMap<String, Arc<Buffer>>,
    pub nodes: BTreeMap<String, Arc<OperatorNode>>,
    pub graph: DependencyGraph<OperatorNode>,
}

impl BuiltGraph {
    pub fn buffer(&self, name: &str) -> Option<&Arc<Buffer>> {
        self.buffers.get(name)
    }

    pub fn node(&self, name: &str) -> Option<&Arc<OperatorNode>> {
        self.nodes.get(name)
    }
}

/// Build buffers, operator nodes and the dependency graph.
///
/// Nodes are registered in topological order before any edge is added, so
/// polling jobs reach the pool producers-first.
pub fn build_graph(cfg: &ConfigFile) -> Result<BuiltGraph> {
    let buffers: BTreeMap<String, Arc<Buffer>> = cfg
        .buffer
        .iter()
        .map(|(name, b)| (name.clone(), Arc::new(Buffer::with_fill(b.rows, b.cols, b.fill))))
        .collect();

    let lookup = |name: &str| -> Result<Arc<Buffer>> {
        buffers
            .get(name)
            .cloned()
            .ok_or_else(|| GradflowError::UnknownBuffer(name.to_string()))
    };

    let mut nodes: BTreeMap<String, Arc<OperatorNode>> = BTreeMap::new();
    for (name, op) in cfg.op.iter() {
        let inputs = op
            .inputs
            .iter()
            .map(|b| lookup(b))
            .collect::<Result<Vec<_>>>()?;
        let output = lookup(&op.output)?;
        nodes.insert(
            name.clone(),
            Arc::new(OperatorNode::new(name.clone(), op.kind, inputs, output)),
        );
    }

    let mut graph = DependencyGraph::new();
    for name in topological_order(&cfg.op)? {
        graph.add_node(node_ref(&nodes, name)?);
    }
    for (name, op) in cfg.op.iter() {
        for dep in op.after.iter() {
            graph.add_edge(node_ref(&nodes, dep)?, node_ref(&nodes, name)?);
        }
    }

    debug!(
        buffers = buffers.len(),
        nodes = graph.len(),
        edges = graph.edges().len(),
        "built operator graph"
    );

    Ok(BuiltGraph {
        buffers,
        nodes,
        graph,
    })
}

fn node_ref<'a>(
    nodes: &'a BTreeMap<String, Arc<OperatorNode>>,
    name: &str,
) -> Result<&'a Arc<OperatorNode>> {
    nodes
        .get(name)
        .ok_or_else(|| GradflowError::UnknownOperator(name.to_string()))
}
