//! Tensor descriptors: logical shape, padded shape and bank placement

use std::fmt;

use super::data::TensorData;
use super::padding;
use crate::arch::ArchParams;
use crate::error::{ForgeResult, NpuForgeError};
use crate::invalid_argument;
use crate::memory::BankId;

/// Logical or padded extent of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorShape {
    Vector { len: usize },
    Matrix { rows: usize, cols: usize },
}

impl TensorShape {
    /// Build a shape from one or two positive dimensions
    pub fn from_dims(dims: &[usize]) -> ForgeResult<Self> {
        if let Some(pos) = dims.iter().position(|&d| d == 0) {
            return Err(invalid_argument!(
                "dimension {} of shape {:?} must be positive",
                pos,
                dims
            ));
        }
        match *dims {
            [len] => Ok(TensorShape::Vector { len }),
            [rows, cols] => Ok(TensorShape::Matrix { rows, cols }),
            _ => Err(invalid_argument!(
                "tensors have one or two dimensions, got {:?}",
                dims
            )),
        }
    }

    pub fn dims(&self) -> Vec<usize> {
        match *self {
            TensorShape::Vector { len } => vec![len],
            TensorShape::Matrix { rows, cols } => vec![rows, cols],
        }
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, TensorShape::Matrix { .. })
    }

    pub fn element_count(&self) -> usize {
        self.dims().iter().product()
    }
}

/// Allocation lifecycle of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationState {
    Unallocated,
    /// Terminal: the base address never changes afterwards
    Allocated { base: usize },
}

/// A tensor together with its hardware-padded layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDescriptor {
    name: String,
    shape: TensorShape,
    bank: BankId,
    padded_shape: TensorShape,
    word_count: usize,
    state: AllocationState,
    payload: Vec<i8>,
    padded_payload: Vec<i8>,
}

impl TensorDescriptor {
    /// Padded shape and word count of `shape` in `bank`, without building any buffer
    ///
    /// # Errors
    /// - `InvalidArgument` when the bank kind does not match the shape, or the
    ///   padded extent does not fit in a `usize`
    pub fn padded_geometry(
        shape: TensorShape,
        bank: BankId,
        arch: &ArchParams,
    ) -> ForgeResult<(TensorShape, usize)> {
        match shape {
            TensorShape::Vector { len } => {
                if bank.is_weight() {
                    return Err(invalid_argument!(
                        "vectors cannot be placed in the weight bank {}",
                        bank
                    ));
                }
                let (padded, word_count) = if bank.is_primary_vector() {
                    let padded = padding::pad_primary_vector(len, arch);
                    (padded, padded.map(|p| padding::primary_vector_words(p, arch)))
                } else {
                    let padded = padding::pad_auxiliary_vector(len, arch);
                    (padded, padded.map(|p| padding::auxiliary_vector_words(p, arch)))
                };
                match (padded, word_count) {
                    (Some(len), Some(word_count)) => {
                        Ok((TensorShape::Vector { len }, word_count))
                    }
                    _ => Err(invalid_argument!(
                        "vector of {} element(s) is too large to pad",
                        len
                    )),
                }
            }
            TensorShape::Matrix { rows, cols } => {
                if !bank.is_weight() {
                    return Err(invalid_argument!(
                        "matrices must be placed in the weight bank, not {}",
                        bank
                    ));
                }
                let padded_rows = padding::pad_matrix_rows(rows, arch);
                let padded_cols = padding::pad_matrix_cols(cols, arch);
                match (padded_rows, padded_cols) {
                    (Some(r), Some(c)) if r.checked_mul(c).is_some() => Ok((
                        TensorShape::Matrix { rows: r, cols: c },
                        padding::matrix_words(r, c, arch),
                    )),
                    _ => Err(invalid_argument!(
                        "matrix of {}x{} element(s) is too large to pad",
                        rows,
                        cols
                    )),
                }
            }
        }
    }

    /// Describe a vector of `len` elements destined for `bank`
    ///
    /// Without a payload the vector is all zeros. A vector that could not fit
    /// even the empty bank is rejected before any buffer is built.
    pub fn vector(
        name: impl Into<String>,
        len: usize,
        bank: BankId,
        payload: Option<TensorData>,
        arch: &ArchParams,
    ) -> ForgeResult<Self> {
        let name = name.into();
        if len == 0 {
            return Err(invalid_argument!("vector '{}' must have a positive length", name));
        }
        let shape = TensorShape::Vector { len };
        let (padded_shape, word_count) = Self::padded_geometry(shape, bank, arch)?;
        check_capacity(bank, word_count, arch)?;

        let payload = match payload {
            Some(data) => {
                data.ensure_shape(&[len])?;
                data.into_values()
            }
            None => vec![0; len],
        };

        let mut padded_payload = vec![0; padded_shape.element_count()];
        padded_payload[..len].copy_from_slice(&payload);

        Ok(Self {
            name,
            shape,
            bank,
            padded_shape,
            word_count,
            state: AllocationState::Unallocated,
            payload,
            padded_payload,
        })
    }

    /// Describe a `rows × cols` weight matrix; the payload is mandatory
    pub fn matrix(
        name: impl Into<String>,
        rows: usize,
        cols: usize,
        bank: BankId,
        payload: TensorData,
        arch: &ArchParams,
    ) -> ForgeResult<Self> {
        let name = name.into();
        if rows == 0 || cols == 0 {
            return Err(invalid_argument!(
                "matrix '{}' must have positive dimensions, got {}x{}",
                name,
                rows,
                cols
            ));
        }
        let shape = TensorShape::Matrix { rows, cols };
        let (padded_shape, word_count) = Self::padded_geometry(shape, bank, arch)?;
        payload.ensure_shape(&[rows, cols])?;
        check_capacity(bank, word_count, arch)?;

        let padded_cols = match padded_shape {
            TensorShape::Matrix { cols, .. } => cols,
            TensorShape::Vector { len } => len,
        };
        let payload = payload.into_values();
        let mut padded_payload = vec![0; padded_shape.element_count()];
        for (row, values) in payload.chunks_exact(cols).enumerate() {
            let start = row * padded_cols;
            padded_payload[start..start + cols].copy_from_slice(values);
        }

        Ok(Self {
            name,
            shape,
            bank,
            padded_shape,
            word_count,
            state: AllocationState::Unallocated,
            payload,
            padded_payload,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    pub fn padded_shape(&self) -> TensorShape {
        self.padded_shape
    }

    pub fn bank(&self) -> BankId {
        self.bank
    }

    /// Words this tensor occupies in its bank
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn state(&self) -> AllocationState {
        self.state
    }

    pub fn is_allocated(&self) -> bool {
        matches!(self.state, AllocationState::Allocated { .. })
    }

    pub fn base_address(&self) -> Option<usize> {
        match self.state {
            AllocationState::Allocated { base } => Some(base),
            AllocationState::Unallocated => None,
        }
    }

    /// Unpadded data
    pub fn payload(&self) -> &[i8] {
        &self.payload
    }

    /// Zero-padded data in padded row-major order
    pub fn padded_payload(&self) -> &[i8] {
        &self.padded_payload
    }

    pub(crate) fn mark_allocated(&mut self, base: usize) -> ForgeResult<()> {
        if self.is_allocated() {
            return Err(NpuForgeError::AlreadyAllocated(self.name.clone()));
        }
        self.state = AllocationState::Allocated { base };
        Ok(())
    }

    /// Swap in new vector data of the same length
    pub(crate) fn replace_vector_data(&mut self, values: Vec<i8>) -> ForgeResult<()> {
        let len = match self.shape {
            TensorShape::Vector { len } => len,
            TensorShape::Matrix { .. } => {
                return Err(invalid_argument!(
                    "'{}' is a matrix; only vector data can be replaced",
                    self.name
                ))
            }
        };
        if values.len() != len {
            return Err(NpuForgeError::ShapeMismatch {
                expected: vec![len],
                actual: vec![values.len()],
            });
        }
        self.padded_payload[..len].copy_from_slice(&values);
        self.payload = values;
        Ok(())
    }
}

/// A tensor wider than the whole bank can never be placed
fn check_capacity(bank: BankId, word_count: usize, arch: &ArchParams) -> ForgeResult<()> {
    let depth = bank.depth_in(arch);
    if word_count > depth {
        return Err(NpuForgeError::AllocationFailed {
            bank,
            requested: word_count,
            largest_free_run: depth,
        });
    }
    Ok(())
}

impl fmt::Display for TensorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self
            .base_address()
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-1".to_string());
        match self.shape {
            TensorShape::Vector { len } => write!(
                f,
                "Vector {} , Size: {} element(s), Mem Space: {}, Base Address: {}, Word Count: {}",
                self.name, len, self.bank, base, self.word_count
            ),
            TensorShape::Matrix { rows, cols } => write!(
                f,
                "Matrix {} , Size: {}x{} element(s), Mem Space: {}, Base Address: {}, Word Count: {}",
                self.name, cols, rows, self.bank, base, self.word_count
            ),
        }
    }
}
