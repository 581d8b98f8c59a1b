// src/ops/kernels.rs

//! Numeric bodies for the operator kinds.
//!
//! Every function here is pure: it reads borrowed row-major slices and
//! returns a freshly allocated result. Locking and flag bookkeeping live in
//! `dag::node`.

use rand::Rng;

/// Borrowed row-major view of one operand.
#[derive(Debug, Clone, Copy)]
pub struct Operand<'a> {
    pub rows: usize,
    pub cols: usize,
    pub data: &'a [f32],
}

impl<'a> Operand<'a> {
    pub fn new(rows: usize, cols: usize, data: &'a [f32]) -> Self {
        Self { rows, cols, data }
    }

    fn at(&self, r: usize, c: usize) -> f32 {
        self.data[r * self.cols + c]
    }
}

/// `a · b` for `a: m×k`, `b: k×n`.
pub fn matmul(a: Operand<'_>, b: Operand<'_>) -> Vec<f32> {
    let (m, k, n) = (a.rows, a.cols, b.cols);
    let mut out = vec![0.0; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0;
            for p in 0..k {
                sum += a.at(i, p) * b.at(p, j);
            }
            out[i * n + j] = sum;
        }
    }
    out
}

/// Gradients of `c = a · b`: returns `(dc · bᵀ, aᵀ · dc)`.
pub fn matmul_backward(a: Operand<'_>, b: Operand<'_>, grad_out: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let (m, k, n) = (a.rows, a.cols, b.cols);
    let dc = Operand::new(m, n, grad_out);

    let mut da = vec![0.0; m * k];
    for i in 0..m {
        for p in 0..k {
            let mut sum = 0.0;
            for j in 0..n {
                sum += dc.at(i, j) * b.at(p, j);
            }
            da[i * k + p] = sum;
        }
    }

    let mut db = vec![0.0; k * n];
    for p in 0..k {
        for j in 0..n {
            let mut sum = 0.0;
            for i in 0..m {
                sum += a.at(i, p) * dc.at(i, j);
            }
            db[p * n + j] = sum;
        }
    }

    (da, db)
}

pub fn add(a: Operand<'_>, b: Operand<'_>) -> Vec<f32> {
    a.data.iter().zip(b.data).map(|(x, y)| x + y).collect()
}

pub fn sum(a: Operand<'_>) -> f32 {
    a.data.iter().sum()
}

pub fn uniform(len: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(0.0..1.0)).collect()
}

pub fn relu(a: Operand<'_>) -> Vec<f32> {
    a.data.iter().map(|&x| if x >= 0.0 { x } else { 0.0 }).collect()
}

pub fn relu_backward(a: Operand<'_>, grad_out: &[f32]) -> Vec<f32> {
    a.data
        .iter()
        .zip(grad_out)
        .map(|(&x, &g)| if x > 0.0 { g } else { 0.0 })
        .collect()
}

/// Softmax applied independently to every column.
pub fn softmax_columns(a: Operand<'_>) -> Vec<f32> {
    let mut out = vec![0.0; a.rows * a.cols];
    for c in 0..a.cols {
        // Shift by the column max so large inputs stay finite.
        let max = (0..a.rows)
            .map(|r| a.at(r, c))
            .fold(f32::NEG_INFINITY, f32::max);
        let mut total = 0.0;
        for r in 0..a.rows {
            let e = (a.at(r, c) - max).exp();
            out[r * a.cols + c] = e;
            total += e;
        }
        for r in 0..a.rows {
            out[r * a.cols + c] /= total;
        }
    }
    out
}

/// Gradient of column softmax given its forward output `y`.
pub fn softmax_columns_backward(y: Operand<'_>, grad_out: &[f32]) -> Vec<f32> {
    let dy = Operand::new(y.rows, y.cols, grad_out);
    let mut dx = vec![0.0; y.rows * y.cols];
    for c in 0..y.cols {
        let dot: f32 = (0..y.rows).map(|r| y.at(r, c) * dy.at(r, c)).sum();
        for r in 0..y.rows {
            dx[r * y.cols + c] = y.at(r, c) * (dy.at(r, c) - dot);
        }
    }
    dx
}
