// src/dag/mod.rs

//! Operator graph representation and pass scheduling.
//!
//! - [`node`] defines the [`Operator`] task contract and the concrete
//!   [`OperatorNode`].
//! - [`graph`] holds the node list and producer → consumer edges.
//! - [`readiness`] contains the forward and backward readiness predicates.
//! - [`scheduler`] drives passes over a graph on a worker pool.
//! - [`pass`] holds the per-pass state and result types.

pub mod graph;
pub mod node;
pub mod pass;
pub mod readiness;
pub mod scheduler;

pub use graph::DependencyGraph;
pub use node::{Operator, OperatorNode};
pub use pass::{Direction, PassHandle, PassSummary};
pub use scheduler::{Scheduler, SchedulerOptions};
