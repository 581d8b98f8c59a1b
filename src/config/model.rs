// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::dag::SchedulerOptions;
use crate::ops::OpKind;
use crate::types::{BackwardReadiness, Dispatch, FillMode};

/// Graph file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// workers = 4
/// backward_readiness = "first_successor"
/// dispatch = "polling"
///
/// [buffer.a]
/// rows = 2
/// cols = 3
///
/// [op.init_a]
/// kind = "random_init"
/// output = "a"
///
/// [op.mul]
/// kind = "matmul"
/// inputs = ["a", "b"]
/// output = "c"
/// after = ["init_a", "init_b"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All buffers from `[buffer.<name>]`.
    #[serde(default)]
    pub buffer: BTreeMap<String, BufferConfig>,

    /// All operators from `[op.<name>]`.
    #[serde(default)]
    pub op: BTreeMap<String, OpConfig>,
}

/// Validated graph file. Only constructible through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub buffer: BTreeMap<String, BufferConfig>,
    pub op: BTreeMap<String, OpConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        buffer: BTreeMap<String, BufferConfig>,
        op: BTreeMap<String, OpConfig>,
    ) -> Self {
        Self { config, buffer, op }
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            backward_readiness: self.config.backward_readiness,
            dispatch: self.config.dispatch,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Worker threads in the pool. Defaults to available parallelism.
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub backward_readiness: BackwardReadiness,

    #[serde(default)]
    pub dispatch: Dispatch,
}

fn default_workers() -> usize {
    crate::pool::rayon_pool::default_worker_count()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            backward_readiness: BackwardReadiness::default(),
            dispatch: Dispatch::default(),
        }
    }
}

/// `[buffer.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferConfig {
    pub rows: usize,
    pub cols: usize,
    #[serde(default)]
    pub fill: FillMode,
}

/// `[op.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpConfig {
    pub kind: OpKind,

    /// Buffers read by the operator, in operand order.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Buffer written by the operator.
    pub output: String,

    /// Operators that must finish before this one (producer → this edges).
    #[serde(default)]
    pub after: Vec<String>,
}
