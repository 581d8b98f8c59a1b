// src/buffer.rs

//! Two-dimensional `f32` storage shared between operator nodes.
//!
//! A [`Buffer`] carries a row-major data array and a gradient array of the
//! same extent. Nodes hold `Arc<Buffer>` handles; the producing node is the
//! only writer of the data array and it publishes its writes by flipping its
//! `computed` flag. Both arrays sit behind their own `RwLock`, which is never
//! contended as long as the edge discipline is respected.

use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::ops::kernels;
use crate::types::FillMode;

#[derive(Debug)]
pub struct Buffer {
    rows: usize,
    cols: usize,
    data: RwLock<Vec<f32>>,
    grad: RwLock<Vec<f32>>,
}

impl Buffer {
    /// Zero-filled buffer of the given extent, with a zeroed gradient.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_fill(rows, cols, FillMode::Zero)
    }

    pub fn with_fill(rows: usize, cols: usize, fill: FillMode) -> Self {
        let len = rows * cols;
        let data = match fill {
            FillMode::Zero => vec![0.0; len],
            FillMode::Uniform => kernels::uniform(len),
        };

        Self {
            rows,
            cols,
            data: RwLock::new(data),
            grad: RwLock::new(vec![0.0; len]),
        }
    }

    /// Zero-extent placeholder with no storage.
    pub fn empty() -> Self {
        Self::new(0, 0)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        debug_assert!(row < self.rows, "row {row} out of range ({})", self.rows);
        debug_assert!(col < self.cols, "col {col} out of range ({})", self.cols);
        self.read_data()[row * self.cols + col]
    }

    pub fn set(&self, row: usize, col: usize, value: f32) {
        debug_assert!(row < self.rows, "row {row} out of range ({})", self.rows);
        debug_assert!(col < self.cols, "col {col} out of range ({})", self.cols);
        self.write_data()[row * self.cols + col] = value;
    }

    pub fn grad_at(&self, row: usize, col: usize) -> f32 {
        debug_assert!(row < self.rows && col < self.cols);
        self.read_grad()[row * self.cols + col]
    }

    /// Snapshot of the data array.
    pub fn data(&self) -> Vec<f32> {
        self.read_data().clone()
    }

    /// Snapshot of the gradient array.
    pub fn grad(&self) -> Vec<f32> {
        self.read_grad().clone()
    }

    pub fn read_data(&self) -> RwLockReadGuard<'_, Vec<f32>> {
        // A poisoned lock only means a kernel panicked mid-write; the
        // extent is still intact, so keep serving the contents.
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn write_data(&self) -> RwLockWriteGuard<'_, Vec<f32>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn read_grad(&self) -> RwLockReadGuard<'_, Vec<f32>> {
        self.grad.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn write_grad(&self) -> RwLockWriteGuard<'_, Vec<f32>> {
        self.grad.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Renders the gradient array in the same layout as `Display`.
    pub fn display_grad(&self) -> GradDisplay<'_> {
        GradDisplay(self)
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::empty()
    }
}

fn write_matrix(f: &mut fmt::Formatter<'_>, rows: usize, cols: usize, values: &[f32]) -> fmt::Result {
    writeln!(f, "[{rows}x{cols}]")?;
    for r in 0..rows {
        let row = &values[r * cols..(r + 1) * cols];
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>10.6}")).collect();
        writeln!(f, "  {}", cells.join(" "))?;
    }
    Ok(())
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_matrix(f, self.rows, self.cols, &self.read_data())
    }
}

pub struct GradDisplay<'a>(&'a Buffer);

impl fmt::Display for GradDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_matrix(f, self.0.rows, self.0.cols, &self.0.read_grad())
    }
}
