//! Caller-supplied tensor payloads

use crate::error::{ForgeResult, NpuForgeError};
use crate::invalid_argument;

/// Unpadded int8 tensor data in row-major order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorData {
    shape: Vec<usize>,
    values: Vec<i8>,
}

impl TensorData {
    /// 1-D payload
    pub fn vector(values: Vec<i8>) -> Self {
        Self {
            shape: vec![values.len()],
            values,
        }
    }

    /// 2-D payload from a flat row-major buffer
    pub fn matrix(rows: usize, cols: usize, values: Vec<i8>) -> ForgeResult<Self> {
        if rows.checked_mul(cols) != Some(values.len()) {
            return Err(invalid_argument!(
                "matrix payload of {} value(s) cannot have shape {}x{}",
                values.len(),
                rows,
                cols
            ));
        }
        Ok(Self {
            shape: vec![rows, cols],
            values,
        })
    }

    /// 2-D payload from nested rows; every row must have the same length
    pub fn from_rows(rows: &[Vec<i8>]) -> ForgeResult<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().position(|row| row.len() != cols) {
            return Err(invalid_argument!(
                "ragged matrix payload: row {} has {} value(s), expected {}",
                bad,
                rows[bad].len(),
                cols
            ));
        }
        Self::matrix(rows.len(), cols, rows.concat())
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[i8] {
        &self.values
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Fail unless the payload shape equals `expected` exactly
    pub fn ensure_shape(&self, expected: &[usize]) -> ForgeResult<()> {
        if self.shape != expected {
            return Err(NpuForgeError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: self.shape.clone(),
            });
        }
        Ok(())
    }

    pub fn into_values(self) -> Vec<i8> {
        self.values
    }
}
