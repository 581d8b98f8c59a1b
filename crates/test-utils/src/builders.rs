#![allow(dead_code)]

use std::collections::BTreeMap;

use gradflow::config::{BufferConfig, ConfigFile, ConfigSection, OpConfig, RawConfigFile};
use gradflow::errors::Result;
use gradflow::ops::OpKind;
use gradflow::types::{BackwardReadiness, Dispatch, FillMode};

/// Builder for `ConfigFile` to simplify test setup.
pub struct GraphFileBuilder {
    config: RawConfigFile,
}

impl GraphFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                buffer: BTreeMap::new(),
                op: BTreeMap::new(),
            },
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.config.workers = workers;
        self
    }

    pub fn backward_readiness(mut self, policy: BackwardReadiness) -> Self {
        self.config.config.backward_readiness = policy;
        self
    }

    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.config.config.dispatch = dispatch;
        self
    }

    pub fn with_buffer(mut self, name: &str, rows: usize, cols: usize) -> Self {
        self.config.buffer.insert(
            name.to_string(),
            BufferConfig {
                rows,
                cols,
                fill: FillMode::Zero,
            },
        );
        self
    }

    pub fn with_filled_buffer(mut self, name: &str, rows: usize, cols: usize, fill: FillMode) -> Self {
        self.config
            .buffer
            .insert(name.to_string(), BufferConfig { rows, cols, fill });
        self
    }

    pub fn with_op(mut self, name: &str, op: OpConfig) -> Self {
        self.config.op.insert(name.to_string(), op);
        self
    }

    /// The unvalidated file, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid graph file from builder")
    }
}

impl Default for GraphFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `OpConfig`.
pub struct OpConfigBuilder {
    op: OpConfig,
}

impl OpConfigBuilder {
    pub fn new(kind: OpKind, output: &str) -> Self {
        Self {
            op: OpConfig {
                kind,
                inputs: vec![],
                output: output.to_string(),
                after: vec![],
            },
        }
    }

    pub fn input(mut self, buffer: &str) -> Self {
        self.op.inputs.push(buffer.to_string());
        self
    }

    pub fn after(mut self, op: &str) -> Self {
        self.op.after.push(op.to_string());
        self
    }

    pub fn build(self) -> OpConfig {
        self.op
    }
}

/// The A → M → S chain: `init_a`, `init_b` feed a matmul `mul` into `c`,
/// which `total` sums into `d`.
pub fn matmul_sum_chain() -> GraphFileBuilder {
    GraphFileBuilder::new()
        .workers(4)
        .with_buffer("a", 2, 3)
        .with_buffer("b", 3, 2)
        .with_buffer("c", 2, 2)
        .with_buffer("d", 1, 1)
        .with_op("init_a", OpConfigBuilder::new(OpKind::RandomInit, "a").build())
        .with_op("init_b", OpConfigBuilder::new(OpKind::RandomInit, "b").build())
        .with_op(
            "mul",
            OpConfigBuilder::new(OpKind::MatMul, "c")
                .input("a")
                .input("b")
                .after("init_a")
                .after("init_b")
                .build(),
        )
        .with_op(
            "total",
            OpConfigBuilder::new(OpKind::Sum, "d")
                .input("c")
                .after("mul")
                .build(),
        )
}
