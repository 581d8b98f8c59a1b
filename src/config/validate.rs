// src/config/validate.rs

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, OpConfig, RawConfigFile};
use crate::errors::{GradflowError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::GradflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.buffer, raw.op))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_ops(cfg)?;
    validate_global_config(cfg)?;
    validate_op_buffers(cfg)?;
    validate_op_dependencies(cfg)?;
    validate_writers(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_ops(cfg: &RawConfigFile) -> Result<()> {
    if cfg.op.is_empty() {
        return Err(GradflowError::ConfigError(
            "graph file must contain at least one [op.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    // backward_readiness and dispatch are enums and already checked by serde.
    if cfg.config.workers == 0 {
        return Err(GradflowError::ConfigError(
            "[config].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_op_buffers(cfg: &RawConfigFile) -> Result<()> {
    for (name, op) in cfg.op.iter() {
        if !cfg.buffer.contains_key(&op.output) {
            return Err(GradflowError::UnknownBuffer(format!(
                "op '{}' writes unknown buffer '{}'",
                name, op.output
            )));
        }

        for input in op.inputs.iter() {
            if !cfg.buffer.contains_key(input) {
                return Err(GradflowError::UnknownBuffer(format!(
                    "op '{}' reads unknown buffer '{}'",
                    name, input
                )));
            }
            if *input == op.output {
                return Err(GradflowError::ConfigError(format!(
                    "op '{}' both reads and writes buffer '{}'",
                    name, input
                )));
            }
        }

        if op.inputs.len() != op.kind.arity() {
            return Err(GradflowError::ConfigError(format!(
                "op '{}' of kind {} takes {} input(s), {} given",
                name,
                op.kind,
                op.kind.arity(),
                op.inputs.len()
            )));
        }
    }
    Ok(())
}

fn validate_op_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, op) in cfg.op.iter() {
        for dep in op.after.iter() {
            if !cfg.op.contains_key(dep) {
                return Err(GradflowError::UnknownOperator(format!(
                    "op '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(GradflowError::ConfigError(format!(
                    "op '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

/// Every buffer has at most one writer, and every reader of a written
/// buffer lists that writer in `after`. Without the edge, the reader could
/// run before the data it needs exists.
fn validate_writers(cfg: &RawConfigFile) -> Result<()> {
    let mut writers: HashMap<&str, &str> = HashMap::new();
    for (name, op) in cfg.op.iter() {
        if let Some(previous) = writers.insert(op.output.as_str(), name.as_str()) {
            return Err(GradflowError::ConfigError(format!(
                "buffer '{}' is written by both '{}' and '{}'",
                op.output, previous, name
            )));
        }
    }

    for (name, op) in cfg.op.iter() {
        for input in op.inputs.iter() {
            if let Some(writer) = writers.get(input.as_str()) {
                if !op.after.iter().any(|dep| dep == writer) {
                    return Err(GradflowError::ConfigError(format!(
                        "op '{}' reads buffer '{}' written by '{}' but does not list it in `after`",
                        name, input, writer
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    topological_order(&cfg.op).map(|_order| ())
}

/// Operator names in an order where every op follows everything in its
/// `after` list. Fails with [`GradflowError::DagCycle`] on a cycle.
pub(crate) fn topological_order(ops: &BTreeMap<String, OpConfig>) -> Result<Vec<&str>> {
    // Edge direction: dep -> op
    // For:
    //   [op.sum]
    //   after = ["mul"]
    // we add edge mul -> sum.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in ops.keys() {
        graph.add_node(name.as_str());
    }

    for (name, op) in ops.iter() {
        for dep in op.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    toposort(&graph, None).map_err(|cycle| {
        GradflowError::DagCycle(format!(
            "cycle detected in operator graph involving op '{}'",
            cycle.node_id()
        ))
    })
}
