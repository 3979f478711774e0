//! Physical on-chip memory contents
//!
//! Shapes follow the hardware:
//! - weight bank: tiles × compute_units × weight_depth × lanes
//! - primary vector bank: tiles × vector_depth × lanes
//! - each auxiliary vector bank: vector_depth × lanes

pub mod array;

pub use array::StorageArray;

use crate::arch::ArchParams;
use crate::memory::BankId;

/// Storage arrays owned by one accelerator context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalStorage {
    weights: StorageArray,
    primary_vectors: StorageArray,
    /// Indexed by `BankId::index() - 2` (extension vector, then the four MFU files)
    auxiliary: Vec<StorageArray>,
}

impl PhysicalStorage {
    pub fn new(arch: &ArchParams) -> Self {
        let auxiliary = BankId::ALL
            .into_iter()
            .filter(|b| b.is_auxiliary())
            .map(|_| StorageArray::zeros(vec![arch.vector_depth, arch.lanes]))
            .collect();
        Self {
            weights: StorageArray::zeros(vec![
                arch.tiles,
                arch.compute_units,
                arch.weight_depth,
                arch.lanes,
            ]),
            primary_vectors: StorageArray::zeros(vec![arch.tiles, arch.vector_depth, arch.lanes]),
            auxiliary,
        }
    }

    /// The array backing `bank`
    pub fn array(&self, bank: BankId) -> &StorageArray {
        match bank {
            BankId::Weight => &self.weights,
            BankId::PrimaryVector => &self.primary_vectors,
            aux => &self.auxiliary[Self::aux_slot(aux)],
        }
    }

    pub(crate) fn array_mut(&mut self, bank: BankId) -> &mut StorageArray {
        match bank {
            BankId::Weight => &mut self.weights,
            BankId::PrimaryVector => &mut self.primary_vectors,
            aux => &mut self.auxiliary[Self::aux_slot(aux)],
        }
    }

    pub fn weights(&self) -> &StorageArray {
        &self.weights
    }

    pub fn primary_vectors(&self) -> &StorageArray {
        &self.primary_vectors
    }

    fn aux_slot(bank: BankId) -> usize {
        debug_assert!(bank.is_auxiliary());
        bank.index() - 2
    }
}
