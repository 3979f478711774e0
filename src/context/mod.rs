//! Accelerator context: the allocation entry point of a compilation session
//!
//! An [`AcceleratorContext`] owns everything that describes the accelerator's
//! memory during one compilation: the architecture parameters, the seven
//! banks with their region descriptors, and the physical storage arrays.
//! Nothing is shared between contexts, so independent compilations can run
//! on separate threads, each with its own context.
//!
//! # Example
//!
//! ```ignore
//! use npuforge::{AcceleratorContext, ArchParams, BankId, TensorData};
//!
//! let mut ctx = AcceleratorContext::new(ArchParams::default())?;
//! let weights = TensorData::matrix(64, 100, vec![1; 6400])?;
//! let w = ctx.allocate_tensor("fc1.weight", &[64, 100], BankId::Weight, Some(weights))?;
//! let x = ctx.allocate_tensor("fc1.input", &[100], BankId::PrimaryVector, None)?;
//! println!("{}\n{}", w, x);
//! ```

use std::collections::HashMap;

use crate::arch::ArchParams;
use crate::error::{ForgeResult, NpuForgeError};
use crate::invalid_argument;
use crate::layout;
use crate::memory::{BankId, BankSet, BankStats, Cell};
use crate::storage::PhysicalStorage;
use crate::tensor::{TensorData, TensorDescriptor, TensorShape};

/// Where a named tensor ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorRecord {
    pub bank: BankId,
    pub base: usize,
    pub word_count: usize,
}

/// Memory state of one accelerator for one compilation session
#[derive(Debug, Clone)]
pub struct AcceleratorContext {
    arch: ArchParams,
    banks: BankSet,
    storage: PhysicalStorage,
    /// Allocated tensors by name, oldest first; names may repeat
    records: HashMap<String, Vec<TensorRecord>>,
}

impl AcceleratorContext {
    /// Create a context with empty banks and zeroed storage
    pub fn new(arch: ArchParams) -> ForgeResult<Self> {
        arch.validate()?;

        tracing::info!(
            tiles = arch.tiles,
            compute_units = arch.compute_units,
            lanes = arch.lanes,
            vector_depth = arch.vector_depth,
            weight_depth = arch.weight_depth,
            "AcceleratorContext created"
        );

        Ok(Self {
            banks: BankSet::new(&arch),
            storage: PhysicalStorage::new(&arch),
            records: HashMap::new(),
            arch,
        })
    }

    pub fn arch(&self) -> &ArchParams {
        &self.arch
    }

    pub fn banks(&self) -> &BankSet {
        &self.banks
    }

    pub fn storage(&self) -> &PhysicalStorage {
        &self.storage
    }

    /// Allocate a vector (one dimension) or a weight matrix (two dimensions)
    ///
    /// The tensor is padded, given a contiguous run in `bank`, and written
    /// into physical storage before this returns. Matrices require a payload
    /// of exactly `shape`; vectors without a payload are zero-filled.
    ///
    /// # Errors
    /// - `InvalidArgument` / `ShapeMismatch` for malformed requests, before any mutation
    /// - `AllocationFailed` when `bank` has no room; nothing is modified
    /// - `InternalInconsistency` when the bank's descriptors are corrupt
    pub fn allocate_tensor(
        &mut self,
        name: &str,
        shape: &[usize],
        bank: BankId,
        payload: Option<TensorData>,
    ) -> ForgeResult<TensorDescriptor> {
        let described = match TensorShape::from_dims(shape)? {
            TensorShape::Vector { len } => {
                TensorDescriptor::vector(name, len, bank, payload, &self.arch)
            }
            TensorShape::Matrix { rows, cols } => {
                let payload = payload.ok_or_else(|| {
                    invalid_argument!("matrix '{}' requires a payload", name)
                })?;
                TensorDescriptor::matrix(name, rows, cols, bank, payload, &self.arch)
            }
        };
        // Descriptors only know the bank depth; report the live free run instead
        let mut desc = described.map_err(|err| match err {
            NpuForgeError::AllocationFailed {
                bank, requested, ..
            } => {
                let largest_free_run = self.banks.bank(bank).largest_free_run();
                tracing::warn!(
                    tensor = name,
                    bank = %bank,
                    requested,
                    largest_free_run,
                    "Tensor is larger than its bank"
                );
                NpuForgeError::AllocationFailed {
                    bank,
                    requested,
                    largest_free_run,
                }
            }
            other => other,
        })?;

        let base = self.banks.allocate(bank, desc.word_count())?;
        desc.mark_allocated(base)?;

        if desc.shape().is_matrix() {
            layout::place_matrix(&mut self.storage, &desc, &self.arch)?;
        } else {
            layout::place_vector(&mut self.storage, &desc, &self.arch)?;
        }

        let record = TensorRecord {
            bank,
            base,
            word_count: desc.word_count(),
        };
        let records = self.records.entry(name.to_string()).or_default();
        if let Some(previous) = records.last() {
            tracing::warn!(
                tensor = name,
                previous_bank = %previous.bank,
                previous_base = previous.base,
                "Tensor name reused; both placements are kept"
            );
        }
        records.push(record);

        tracing::debug!(
            tensor = name,
            bank = %bank,
            base,
            word_count = desc.word_count(),
            padded = ?desc.padded_shape(),
            "Allocated tensor"
        );
        Ok(desc)
    }

    /// Same as [`allocate_tensor`](Self::allocate_tensor) with the bank given by name
    pub fn allocate_tensor_in(
        &mut self,
        name: &str,
        shape: &[usize],
        bank: &str,
        payload: Option<TensorData>,
    ) -> ForgeResult<TensorDescriptor> {
        let bank: BankId = bank.parse()?;
        self.allocate_tensor(name, shape, bank, payload)
    }

    /// Reserve `size` raw words in `bank` without a tensor
    pub fn allocate_words(&mut self, bank: BankId, size: usize) -> ForgeResult<usize> {
        self.banks.allocate(bank, size)
    }

    /// Replace the data of an allocated vector and rewrite it in place
    pub fn update_vector(
        &mut self,
        desc: &mut TensorDescriptor,
        values: Vec<i8>,
    ) -> ForgeResult<()> {
        self.ensure_owned(desc)?;
        desc.replace_vector_data(values)?;
        layout::place_vector(&mut self.storage, desc, &self.arch)
    }

    /// The descriptor must name a live region that this context handed out
    fn ensure_owned(&self, desc: &TensorDescriptor) -> ForgeResult<()> {
        let base = desc
            .base_address()
            .ok_or_else(|| invalid_argument!("'{}' has not been allocated", desc.name()))?;
        let record = TensorRecord {
            bank: desc.bank(),
            base,
            word_count: desc.word_count(),
        };
        let header = self.banks.bank(desc.bank()).cell(base);
        let recorded = self
            .records
            .get(desc.name())
            .is_some_and(|records| records.contains(&record));
        if header != Some(Cell::Header {
            length: desc.word_count(),
        }) || !recorded
        {
            return Err(invalid_argument!(
                "'{}' at {} offset {} was not allocated by this context",
                desc.name(),
                desc.bank(),
                base
            ));
        }
        Ok(())
    }

    /// Read an allocated vector back from storage (padded length)
    pub fn read_vector(&self, desc: &TensorDescriptor) -> ForgeResult<Vec<i8>> {
        layout::gather_vector(&self.storage, desc, &self.arch)
    }

    /// Read an allocated matrix back from storage (padded row-major)
    pub fn read_matrix(&self, desc: &TensorDescriptor) -> ForgeResult<Vec<i8>> {
        layout::gather_matrix(&self.storage, desc, &self.arch)
    }

    /// Total words allocated in the weight bank this session
    pub fn weight_filled_depth(&self) -> usize {
        self.banks.weight_filled_depth()
    }

    pub fn bank_stats(&self, bank: BankId) -> BankStats {
        self.banks.stats(bank)
    }

    /// Latest placement of a tensor called `name`
    pub fn tensor_record(&self, name: &str) -> Option<TensorRecord> {
        self.records.get(name).and_then(|records| records.last().copied())
    }

    /// Every placement made under `name`, oldest first
    pub fn tensor_records(&self, name: &str) -> &[TensorRecord] {
        self.records.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tensor_names(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ArchPreset;

    fn tiny() -> AcceleratorContext {
        AcceleratorContext::new(ArchParams::from_preset(ArchPreset::Tiny)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_arch() {
        let arch = ArchParams::from_preset(ArchPreset::Tiny).with_lanes(0);
        assert!(AcceleratorContext::new(arch).unwrap_err().is_user_error());
    }

    #[test]
    fn test_vector_scenario() {
        let mut ctx = tiny();
        let desc = ctx
            .allocate_tensor("x", &[10], BankId::PrimaryVector, None)
            .unwrap();
        assert_eq!(desc.padded_shape(), TensorShape::Vector { len: 16 });
        assert_eq!(desc.word_count(), 2);
        assert_eq!(desc.base_address(), Some(0));
        assert_eq!(
            ctx.tensor_record("x"),
            Some(TensorRecord {
                bank: BankId::PrimaryVector,
                base: 0,
                word_count: 2,
            })
        );
    }

    #[test]
    fn test_matrix_requires_payload() {
        let mut ctx = tiny();
        let err = ctx
            .allocate_tensor("w", &[3, 5], BankId::Weight, None)
            .unwrap_err();
        assert!(err.is_user_error());
        assert_eq!(ctx.bank_stats(BankId::Weight).used, 0);
    }

    #[test]
    fn test_unknown_bank_name() {
        let mut ctx = tiny();
        let err = ctx
            .allocate_tensor_in("x", &[4], "invalid_space", None)
            .unwrap_err();
        assert!(err.is_user_error());
        assert!(ctx
            .allocate_tensor_in("x", &[4], "evrf", None)
            .is_ok());
    }

    #[test]
    fn test_update_vector_rewrites_storage() {
        let mut ctx = tiny();
        let mut desc = ctx
            .allocate_tensor("h", &[3], BankId::Mfu0Add, None)
            .unwrap();
        ctx.update_vector(&mut desc, vec![4, 5, 6]).unwrap();
        assert_eq!(ctx.read_vector(&desc).unwrap(), vec![4, 5, 6]);
        assert!(ctx.update_vector(&mut desc, vec![1, 2]).is_err());
    }

    #[test]
    fn test_update_vector_requires_own_region() {
        let mut ctx = tiny();
        let mut desc = ctx
            .allocate_tensor("h", &[3], BankId::Mfu0Add, None)
            .unwrap();
        // Same name and bank, but the region is not the one recorded
        ctx.banks.bank_mut(BankId::Mfu0Add).set_cell(0, Cell::Header { length: 2 });
        let err = ctx.update_vector(&mut desc, vec![1, 2, 3]).unwrap_err();
        assert!(err.is_user_error());
        assert_eq!(ctx.storage().array(BankId::Mfu0Add).count_nonzero(), 0);
    }

    #[test]
    fn test_repeated_name_keeps_both_records() {
        let mut ctx = tiny();
        ctx.allocate_tensor("x", &[4], BankId::Mfu1Add, None).unwrap();
        ctx.allocate_tensor("x", &[4], BankId::Mfu1Add, None).unwrap();
        let bases: Vec<_> = ctx.tensor_records("x").iter().map(|r| r.base).collect();
        assert_eq!(bases, vec![0, 1]);
        assert_eq!(ctx.tensor_record("x").map(|r| r.base), Some(1));
        assert!(ctx.tensor_records("y").is_empty());
    }

    #[test]
    fn test_corrupt_bank_aborts() {
        let mut ctx = tiny();
        ctx.banks.bank_mut(BankId::Weight).set_cell(0, Cell::Continuation);
        let data = TensorData::matrix(4, 8, vec![1; 32]).unwrap();
        let err = ctx
            .allocate_tensor("w", &[4, 8], BankId::Weight, Some(data))
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(ctx.storage().weights().count_nonzero(), 0);
        assert!(ctx.tensor_record("w").is_none());
    }
}
