use std::str::FromStr;

use serde::Deserialize;

/// How a freshly constructed buffer's data array is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// Every element starts at `0.0`.
    Zero,
    /// Every element is drawn uniformly from `[0, 1)`.
    Uniform,
}

impl Default for FillMode {
    fn default() -> Self {
        FillMode::Zero
    }
}

/// When a node becomes eligible for its backward step.
///
/// - `FirstSuccessor`: only the first successor in edge order is consulted.
///   A node whose first successor has finished its backward step is ready,
///   regardless of any later successors. This is exact for chain-shaped
///   graphs and is the default.
/// - `AllSuccessors`: every successor must have finished its backward step,
///   mirroring the forward predicate over predecessors.
///
/// Sinks (no successors) are ready under both policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackwardReadiness {
    FirstSuccessor,
    AllSuccessors,
}

impl Default for BackwardReadiness {
    fn default() -> Self {
        BackwardReadiness::FirstSuccessor
    }
}

impl FromStr for BackwardReadiness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "first_successor" => Ok(BackwardReadiness::FirstSuccessor),
            "all_successors" => Ok(BackwardReadiness::AllSuccessors),
            other => Err(format!(
                "invalid backward_readiness: {other} (expected \"first_successor\" or \"all_successors\")"
            )),
        }
    }
}

/// How node tasks are handed to the worker pool during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dispatch {
    /// Submit one task per node up front; each task busy-polls its readiness
    /// predicate before running. The pool must be wider than the graph's
    /// largest anti-chain or the pass can starve.
    Polling,
    /// Keep a pending-dependency counter per node and submit a node's task
    /// only once the counter reaches zero. No worker ever waits on a
    /// predicate, so any pool size terminates.
    Counted,
}

impl Default for Dispatch {
    fn default() -> Self {
        Dispatch::Polling
    }
}

impl FromStr for Dispatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "polling" => Ok(Dispatch::Polling),
            "counted" => Ok(Dispatch::Counted),
            other => Err(format!(
                "invalid dispatch: {other} (expected \"polling\" or \"counted\")"
            )),
        }
    }
}
