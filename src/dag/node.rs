// src/dag/node.rs

//! Operator nodes: the units of work the scheduler drives.
//!
//! The scheduler only sees the [`Operator`] trait. [`OperatorNode`] is the
//! concrete node used by graph files and the demo binary: an [`OpKind`]
//! bound to its input and output buffers plus two completion flags.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use crate::buffer::Buffer;
use crate::errors::Result;
use crate::ops::OpKind;
use crate::ops::kernels::Operand;

/// Common task contract for anything the scheduler can run.
///
/// Implementations must make `compute` and `backward_compute` idempotent:
/// a second call after the matching flag is set leaves the data untouched.
/// The flag stores must use `Release` and the accessors `Acquire`, since
/// the flags are the only thing publishing buffer writes to other workers.
pub trait Operator: Send + Sync {
    fn name(&self) -> &str;

    /// Read inputs, write outputs, then mark the node computed.
    fn compute(&self) -> Result<()>;

    /// Seed the output gradient with ones. Used on sinks before backward.
    fn init_grad(&self);

    /// Zero every input gradient this node writes during its backward step.
    /// The scheduler calls it before a backward pass, so a stale value left
    /// in a gradient array never leaks into the result.
    fn clear_input_grads(&self);

    /// Read output gradients and forward values, add this node's
    /// contribution to each input gradient, then mark the node
    /// backward-computed.
    fn backward_compute(&self) -> Result<()>;

    fn is_computed(&self) -> bool;

    fn is_backward_computed(&self) -> bool;
}

#[derive(Debug)]
pub struct OperatorNode {
    name: String,
    kind: OpKind,
    inputs: Vec<Arc<Buffer>>,
    output: Arc<Buffer>,
    computed: AtomicBool,
    backward_computed: AtomicBool,
}

impl OperatorNode {
    /// Bind `kind` to its buffers. Shapes are not checked here; a mismatch
    /// surfaces from the first `compute()`. The output must not also be
    /// listed as an input.
    pub fn new(
        name: impl Into<String>,
        kind: OpKind,
        inputs: Vec<Arc<Buffer>>,
        output: Arc<Buffer>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs,
            output,
            computed: AtomicBool::new(false),
            backward_computed: AtomicBool::new(false),
        }
    }

    pub fn matmul(name: &str, a: &Arc<Buffer>, b: &Arc<Buffer>, out: &Arc<Buffer>) -> Self {
        Self::new(name, OpKind::MatMul, vec![a.clone(), b.clone()], out.clone())
    }

    pub fn add(name: &str, a: &Arc<Buffer>, b: &Arc<Buffer>, out: &Arc<Buffer>) -> Self {
        Self::new(name, OpKind::Add, vec![a.clone(), b.clone()], out.clone())
    }

    pub fn sum(name: &str, input: &Arc<Buffer>, out: &Arc<Buffer>) -> Self {
        Self::new(name, OpKind::Sum, vec![input.clone()], out.clone())
    }

    pub fn random_init(name: &str, out: &Arc<Buffer>) -> Self {
        Self::new(name, OpKind::RandomInit, Vec::new(), out.clone())
    }

    pub fn relu(name: &str, input: &Arc<Buffer>, out: &Arc<Buffer>) -> Self {
        Self::new(name, OpKind::Relu, vec![input.clone()], out.clone())
    }

    pub fn softmax(name: &str, input: &Arc<Buffer>, out: &Arc<Buffer>) -> Self {
        Self::new(name, OpKind::Softmax, vec![input.clone()], out.clone())
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn inputs(&self) -> &[Arc<Buffer>] {
        &self.inputs
    }

    /// Output buffers without waiting for the forward step.
    pub fn outputs(&self) -> &[Arc<Buffer>] {
        std::slice::from_ref(&self.output)
    }

    /// Spin until this node is computed, then return its outputs.
    ///
    /// Only for callers outside the worker pool. Calling this from a pool
    /// task can starve the pool: every worker may end up waiting on a flag
    /// that no free worker is left to set.
    pub fn wait_outputs(&self) -> &[Arc<Buffer>] {
        while !self.is_computed() {
            std::hint::spin_loop();
            std::thread::yield_now();
        }
        self.outputs()
    }

    fn check_shapes(&self) -> Result<()> {
        let input_shapes: Vec<(usize, usize)> = self.inputs.iter().map(|b| b.shape()).collect();
        self.kind
            .check_shapes(&self.name, &input_shapes, self.output.shape())
    }
}

impl Operator for OperatorNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self) -> Result<()> {
        self.check_shapes()?;

        if self.computed.load(Ordering::Acquire) {
            trace!(op = %self.name, "already computed; skipping forward body");
        } else {
            // Input guards are released before the output lock is taken.
            let values = {
                let guards: Vec<_> = self.inputs.iter().map(|b| b.read_data()).collect();
                let operands: Vec<Operand<'_>> = self
                    .inputs
                    .iter()
                    .zip(&guards)
                    .map(|(b, g)| Operand::new(b.rows(), b.cols(), g.as_slice()))
                    .collect();
                self.kind.forward(&operands, self.output.len())
            };
            self.output.write_data().copy_from_slice(&values);
            debug!(op = %self.name, kind = %self.kind, "forward body finished");
        }

        self.computed.store(true, Ordering::Release);
        Ok(())
    }

    fn init_grad(&self) {
        self.output.write_grad().fill(1.0);
        debug!(op = %self.name, "seeded output gradient with ones");
    }

    fn clear_input_grads(&self) {
        for buffer in self.inputs.iter() {
            buffer.write_grad().fill(0.0);
        }
        trace!(op = %self.name, inputs = self.inputs.len(), "cleared input gradients");
    }

    fn backward_compute(&self) -> Result<()> {
        if self.backward_computed.load(Ordering::Acquire) {
            trace!(op = %self.name, "already backward-computed; skipping backward body");
            return Ok(());
        }

        self.check_shapes()?;

        let contributions = {
            let input_guards: Vec<_> = self.inputs.iter().map(|b| b.read_data()).collect();
            let operands: Vec<Operand<'_>> = self
                .inputs
                .iter()
                .zip(&input_guards)
                .map(|(b, g)| Operand::new(b.rows(), b.cols(), g.as_slice()))
                .collect();
            let out_data = self.output.read_data();
            let out_grad = self.output.read_grad();
            let output = Operand::new(self.output.rows(), self.output.cols(), out_data.as_slice());
            self.kind.backward(&operands, output, out_grad.as_slice())
        };

        for (buffer, contribution) in self.inputs.iter().zip(contributions) {
            let mut grad = buffer.write_grad();
            for (g, c) in grad.iter_mut().zip(contribution) {
                *g += c;
            }
        }
        debug!(op = %self.name, kind = %self.kind, "backward body finished");

        self.backward_computed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_computed(&self) -> bool {
        self.computed.load(Ordering::Acquire)
    }

    fn is_backward_computed(&self) -> bool {
        self.backward_computed.load(Ordering::Acquire)
    }
}
