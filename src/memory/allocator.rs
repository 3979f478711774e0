//! First-fit space allocation over a bank's region descriptors
//!
//! # Algorithm
//!
//! The scan starts at offset 0 and walks run by run:
//! - At a header cell it jumps over the whole allocated run
//! - At a free cell it checks whether the next `size` cells are free. If a
//!   header blocks the check at `idx + i`, the scan resumes right after that
//!   run (`idx + i + length`) instead of advancing one cell
//! - Running off the end of the bank ends the search
//!
//! Every cell is therefore visited a bounded number of times and a search
//! costs O(depth) regardless of how many runs are allocated.
//!
//! The bank is only written once a fit is found, so a failed request leaves
//! the descriptors exactly as they were.

use super::bank::{Cell, MemoryBank};
use crate::error::{ForgeResult, NpuForgeError};
use crate::invalid_argument;

/// Placement policy for reserving contiguous word runs in a bank
pub trait BankAllocator {
    /// Find the base offset for `size` words without mutating the bank
    fn find(&self, bank: &MemoryBank, size: usize) -> ForgeResult<Option<usize>>;

    /// Reserve `size` contiguous words and return the base offset
    fn allocate(&self, bank: &mut MemoryBank, size: usize) -> ForgeResult<usize> {
        if size == 0 {
            return Err(invalid_argument!(
                "allocation size must be at least one word (bank {})",
                bank.id()
            ));
        }

        match self.find(bank, size)? {
            Some(base) => {
                bank.commit_run(base, size);
                tracing::trace!(
                    bank = %bank.id(),
                    base,
                    size,
                    "Reserved word run"
                );
                Ok(base)
            }
            None => {
                let largest_free_run = bank.largest_free_run();
                tracing::warn!(
                    bank = %bank.id(),
                    requested = size,
                    largest_free_run,
                    "No contiguous free run large enough"
                );
                Err(NpuForgeError::AllocationFailed {
                    bank: bank.id(),
                    requested: size,
                    largest_free_run,
                })
            }
        }
    }
}

/// First-fit allocator with run-length skipping
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self
    }

    /// Where the scan resumes after a cell that is not free
    ///
    /// Only a header may sit at a run boundary; a continuation there means the
    /// partition is broken.
    fn skip_past(bank: &MemoryBank, offset: usize) -> ForgeResult<usize> {
        match bank.cells()[offset] {
            Cell::Header { length } if length >= 1 && offset + length <= bank.depth() => {
                Ok(offset + length)
            }
            Cell::Header { length } => Err(inconsistency(
                bank,
                offset,
                format!(
                    "header length {} does not fit a bank of depth {}",
                    length,
                    bank.depth()
                ),
            )),
            Cell::Continuation => Err(inconsistency(
                bank,
                offset,
                "continuation marker where a run must start".to_string(),
            )),
            Cell::Free => Ok(offset + 1),
        }
    }
}

impl BankAllocator for FirstFit {
    fn find(&self, bank: &MemoryBank, size: usize) -> ForgeResult<Option<usize>> {
        let depth = bank.depth();
        let cells = bank.cells();
        let mut idx = 0;

        'scan: while idx < depth {
            if !cells[idx].is_free() {
                idx = Self::skip_past(bank, idx)?;
                continue;
            }

            for i in 1..size {
                if idx + i >= depth {
                    // Every later free cell is even closer to the end
                    return Ok(None);
                }
                if !cells[idx + i].is_free() {
                    idx = Self::skip_past(bank, idx + i)?;
                    continue 'scan;
                }
            }
            return Ok(Some(idx));
        }

        Ok(None)
    }
}

fn inconsistency(bank: &MemoryBank, offset: usize, detail: String) -> NpuForgeError {
    tracing::error!(bank = %bank.id(), offset, %detail, "Region descriptors corrupted");
    NpuForgeError::InternalInconsistency {
        bank: bank.id(),
        offset,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BankId;

    const C: Cell = Cell::Continuation;
    const F: Cell = Cell::Free;

    fn h(length: usize) -> Cell {
        Cell::Header { length }
    }

    #[test]
    fn test_first_allocation_at_zero() {
        let mut bank = MemoryBank::new(BankId::PrimaryVector, 16);
        let addr = FirstFit.allocate(&mut bank, 3).unwrap();
        assert_eq!(addr, 0);
        assert_eq!(&bank.cells()[..4], &[h(3), C, C, F]);
    }

    #[test]
    fn test_sequential_allocations_pack() {
        let mut bank = MemoryBank::new(BankId::ExtensionVector, 16);
        assert_eq!(FirstFit.allocate(&mut bank, 2).unwrap(), 0);
        assert_eq!(FirstFit.allocate(&mut bank, 3).unwrap(), 2);
        assert_eq!(&bank.cells()[..6], &[h(2), C, h(3), C, C, F]);
    }

    #[test]
    fn test_size_one_and_full_depth() {
        let mut bank = MemoryBank::new(BankId::Mfu0Mul, 4);
        assert_eq!(FirstFit.allocate(&mut bank, 1).unwrap(), 0);
        assert_eq!(FirstFit.allocate(&mut bank, 3).unwrap(), 1);
        assert!(FirstFit.allocate(&mut bank, 1).is_err());

        let mut bank = MemoryBank::new(BankId::Mfu0Mul, 4);
        assert_eq!(FirstFit.allocate(&mut bank, 4).unwrap(), 0);
    }

    #[test]
    fn test_over_allocation_leaves_bank_unchanged() {
        let mut bank = MemoryBank::new(BankId::Mfu0Add, 4);
        assert_eq!(FirstFit.allocate(&mut bank, 3).unwrap(), 0);
        assert_eq!(bank.cells(), &[h(3), C, C, F]);

        let before = bank.clone();
        let err = FirstFit.allocate(&mut bank, 2).unwrap_err();
        assert!(matches!(
            err,
            NpuForgeError::AllocationFailed {
                bank: BankId::Mfu0Add,
                requested: 2,
                largest_free_run: 1,
            }
        ));
        assert_eq!(bank, before);
    }

    #[test]
    fn test_larger_than_depth_fails() {
        let mut bank = MemoryBank::new(BankId::Mfu1Add, 4);
        assert!(FirstFit.allocate(&mut bank, 5).unwrap_err().is_recoverable());
        assert!(bank.cells().iter().all(Cell::is_free));
    }

    #[test]
    fn test_zero_size_rejected() {
        let mut bank = MemoryBank::new(BankId::Mfu1Add, 4);
        assert!(FirstFit.allocate(&mut bank, 0).unwrap_err().is_user_error());
    }

    #[test]
    fn test_skips_blocking_run_and_reuses_gap() {
        let mut bank = MemoryBank::new(BankId::Mfu1Mul, 16);
        assert_eq!(FirstFit.allocate(&mut bank, 2).unwrap(), 0);
        assert_eq!(FirstFit.allocate(&mut bank, 1).unwrap(), 2);
        assert_eq!(FirstFit.allocate(&mut bank, 1).unwrap(), 3);

        // Release offset 2: free gap of one word between two runs
        bank.set_cell(2, F);
        assert_eq!(&bank.cells()[..5], &[h(2), C, F, h(1), F]);

        // Size 3 cannot use the gap; the scan jumps over the run at offset 3
        assert_eq!(FirstFit.allocate(&mut bank, 3).unwrap(), 4);
        // Size 1 lands in the gap
        assert_eq!(FirstFit.allocate(&mut bank, 1).unwrap(), 2);
        assert_eq!(&bank.cells()[..8], &[h(2), C, h(1), h(1), h(3), C, C, F]);
    }

    #[test]
    fn test_find_skips_by_run_length() {
        let mut bank = MemoryBank::new(BankId::Weight, 12);
        bank.commit_run(1, 6);
        // A 2-word request blocked at offset 1 must resume at 7, not 2
        assert_eq!(FirstFit.find(&bank, 2).unwrap(), Some(7));
        assert_eq!(FirstFit.find(&bank, 1).unwrap(), Some(0));
        assert_eq!(FirstFit.find(&bank, 6).unwrap(), None);
    }

    #[test]
    fn test_continuation_at_run_start_is_fatal() {
        let mut bank = MemoryBank::new(BankId::PrimaryVector, 8);
        bank.set_cell(0, C);
        let before = bank.clone();

        let err = FirstFit.allocate(&mut bank, 1).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            NpuForgeError::InternalInconsistency { offset: 0, .. }
        ));
        assert_eq!(bank, before);
    }

    #[test]
    fn test_continuation_blocking_check_is_fatal() {
        let mut bank = MemoryBank::new(BankId::PrimaryVector, 8);
        bank.set_cell(2, C);
        let err = FirstFit.allocate(&mut bank, 4).unwrap_err();
        assert!(matches!(
            err,
            NpuForgeError::InternalInconsistency { offset: 2, .. }
        ));
    }

    #[test]
    fn test_overlong_header_is_fatal() {
        let mut bank = MemoryBank::new(BankId::Weight, 4);
        bank.set_cell(1, h(9));
        let err = FirstFit.allocate(&mut bank, 2).unwrap_err();
        assert!(matches!(
            err,
            NpuForgeError::InternalInconsistency { offset: 1, .. }
        ));
    }
}
