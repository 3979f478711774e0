//! The seven banks of one accelerator and the weight fill counter

use super::allocator::{BankAllocator, FirstFit};
use super::bank::{BankId, BankStats, MemoryBank};
use crate::arch::ArchParams;
use crate::error::ForgeResult;

/// All memory banks of one compilation session
#[derive(Debug, Clone)]
pub struct BankSet {
    banks: Vec<MemoryBank>,
    allocator: FirstFit,
    /// Words handed out from the weight bank so far
    weight_filled_depth: usize,
}

impl BankSet {
    /// Create empty banks sized for `arch`
    pub fn new(arch: &ArchParams) -> Self {
        let banks = BankId::ALL
            .into_iter()
            .map(|id| MemoryBank::new(id, id.depth_in(arch)))
            .collect();
        Self {
            banks,
            allocator: FirstFit::new(),
            weight_filled_depth: 0,
        }
    }

    pub fn bank(&self, id: BankId) -> &MemoryBank {
        &self.banks[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryBank> {
        self.banks.iter()
    }

    /// Reserve `size` contiguous words in `id`
    ///
    /// Successful weight-bank allocations also advance the fill counter.
    pub fn allocate(&mut self, id: BankId, size: usize) -> ForgeResult<usize> {
        let base = self.allocator.allocate(&mut self.banks[id.index()], size)?;
        if id.is_weight() {
            self.weight_filled_depth += size;
        }
        Ok(base)
    }

    /// Total words successfully allocated in the weight bank
    pub fn weight_filled_depth(&self) -> usize {
        self.weight_filled_depth
    }

    pub fn stats(&self, id: BankId) -> BankStats {
        self.bank(id).stats()
    }

    #[cfg(test)]
    pub(crate) fn bank_mut(&mut self, id: BankId) -> &mut MemoryBank {
        &mut self.banks[id.index()]
    }
}
