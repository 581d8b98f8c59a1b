// src/ops/mod.rs

//! The closed set of operator kinds a node can carry.
//!
//! An [`OpKind`] only knows its arity, its shape preconditions and its
//! numeric formulas. Everything to do with scheduling (flags, buffers,
//! readiness) lives in [`crate::dag`].

pub mod kernels;

use std::fmt;

use serde::Deserialize;

use crate::errors::{GradflowError, Result};
use kernels::Operand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Matrix product `C = A · B`.
    #[serde(alias = "mul")]
    MatMul,
    /// Elementwise `C = A + B`.
    Add,
    /// Reduction of every element into a 1×1 output.
    Sum,
    /// Fills its output with uniform `[0, 1)` values; takes no inputs.
    RandomInit,
    Relu,
    /// Softmax over each column independently.
    Softmax,
}

impl OpKind {
    /// Number of input buffers this kind consumes.
    pub fn arity(self) -> usize {
        match self {
            OpKind::MatMul | OpKind::Add => 2,
            OpKind::Sum | OpKind::Relu | OpKind::Softmax => 1,
            OpKind::RandomInit => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::MatMul => "matmul",
            OpKind::Add => "add",
            OpKind::Sum => "sum",
            OpKind::RandomInit => "random_init",
            OpKind::Relu => "relu",
            OpKind::Softmax => "softmax",
        }
    }

    /// Verify that the given input shapes and output shape fit this kind.
    ///
    /// `op` is only used to label the error.
    pub fn check_shapes(
        self,
        op: &str,
        inputs: &[(usize, usize)],
        output: (usize, usize),
    ) -> Result<()> {
        if inputs.len() != self.arity() {
            return Err(GradflowError::shape_mismatch(
                op,
                format!(
                    "{} expects {} input(s), got {}",
                    self,
                    self.arity(),
                    inputs.len()
                ),
            ));
        }

        let mismatch = |detail: String| Err(GradflowError::shape_mismatch(op, detail));

        match self {
            OpKind::MatMul => {
                let (a, b) = (inputs[0], inputs[1]);
                if a.1 != b.0 {
                    return mismatch(format!(
                        "inner dimensions differ: {}x{} · {}x{}",
                        a.0, a.1, b.0, b.1
                    ));
                }
                if output != (a.0, b.1) {
                    return mismatch(format!(
                        "output is {}x{}, product is {}x{}",
                        output.0, output.1, a.0, b.1
                    ));
                }
            }
            OpKind::Add => {
                let (a, b) = (inputs[0], inputs[1]);
                if a != b {
                    return mismatch(format!(
                        "operands differ: {}x{} vs {}x{}",
                        a.0, a.1, b.0, b.1
                    ));
                }
                if output != a {
                    return mismatch(format!(
                        "output is {}x{}, operands are {}x{}",
                        output.0, output.1, a.0, a.1
                    ));
                }
            }
            OpKind::Sum => {
                if output != (1, 1) {
                    return mismatch(format!(
                        "sum output must be 1x1, got {}x{}",
                        output.0, output.1
                    ));
                }
            }
            OpKind::Relu | OpKind::Softmax => {
                if output != inputs[0] {
                    return mismatch(format!(
                        "output is {}x{}, input is {}x{}",
                        output.0, output.1, inputs[0].0, inputs[0].1
                    ));
                }
            }
            OpKind::RandomInit => {}
        }

        Ok(())
    }

    /// Forward formula. Shapes must already have passed [`check_shapes`].
    ///
    /// [`check_shapes`]: OpKind::check_shapes
    pub fn forward(self, inputs: &[Operand<'_>], output_len: usize) -> Vec<f32> {
        match self {
            OpKind::MatMul => kernels::matmul(inputs[0], inputs[1]),
            OpKind::Add => kernels::add(inputs[0], inputs[1]),
            OpKind::Sum => vec![kernels::sum(inputs[0])],
            OpKind::RandomInit => kernels::uniform(output_len),
            OpKind::Relu => kernels::relu(inputs[0]),
            OpKind::Softmax => kernels::softmax_columns(inputs[0]),
        }
    }

    /// Gradient contribution for each input, in input order.
    ///
    /// `output` is the forward result and `grad_out` its gradient.
    pub fn backward(
        self,
        inputs: &[Operand<'_>],
        output: Operand<'_>,
        grad_out: &[f32],
    ) -> Vec<Vec<f32>> {
        match self {
            OpKind::MatMul => {
                let (da, db) = kernels::matmul_backward(inputs[0], inputs[1], grad_out);
                vec![da, db]
            }
            OpKind::Add => vec![grad_out.to_vec(), grad_out.to_vec()],
            OpKind::Sum => {
                let g = grad_out.first().copied().unwrap_or(0.0);
                vec![vec![g; inputs[0].data.len()]]
            }
            OpKind::RandomInit => Vec::new(),
            OpKind::Relu => vec![kernels::relu_backward(inputs[0], grad_out)],
            OpKind::Softmax => vec![kernels::softmax_columns_backward(output, grad_out)],
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
