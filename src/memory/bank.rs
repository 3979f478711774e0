//! Memory bank identifiers and region-descriptor storage

use std::fmt;
use std::str::FromStr;

use crate::arch::ArchParams;
use crate::error::NpuForgeError;

/// One of the seven on-chip memory banks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BankId {
    /// Matrix-vector unit input vector register file (tiled)
    PrimaryVector,
    /// Matrix register file holding weights
    Weight,
    /// Extension vector register file
    ExtensionVector,
    /// Multi-function unit 0, add operand file
    Mfu0Add,
    /// Multi-function unit 0, multiply operand file
    Mfu0Mul,
    /// Multi-function unit 1, add operand file
    Mfu1Add,
    /// Multi-function unit 1, multiply operand file
    Mfu1Mul,
}

impl BankId {
    /// Every bank, in allocation-table order
    pub const ALL: [BankId; 7] = [
        BankId::PrimaryVector,
        BankId::Weight,
        BankId::ExtensionVector,
        BankId::Mfu0Add,
        BankId::Mfu0Mul,
        BankId::Mfu1Add,
        BankId::Mfu1Mul,
    ];

    /// Canonical hardware name
    pub fn name(self) -> &'static str {
        match self {
            BankId::PrimaryVector => "mvu_vrf",
            BankId::Weight => "mvu_mrf",
            BankId::ExtensionVector => "evrf",
            BankId::Mfu0Add => "mfu0_add",
            BankId::Mfu0Mul => "mfu0_mul",
            BankId::Mfu1Add => "mfu1_add",
            BankId::Mfu1Mul => "mfu1_mul",
        }
    }

    fn alias(self) -> &'static str {
        match self {
            BankId::PrimaryVector => "primary-vector",
            BankId::Weight => "weight",
            BankId::ExtensionVector => "extension-vector",
            BankId::Mfu0Add => "mfu0-add",
            BankId::Mfu0Mul => "mfu0-mul",
            BankId::Mfu1Add => "mfu1-add",
            BankId::Mfu1Mul => "mfu1-mul",
        }
    }

    /// Depth of this bank for the given architecture
    pub fn depth_in(self, arch: &ArchParams) -> usize {
        match self {
            BankId::Weight => arch.weight_depth,
            _ => arch.vector_depth,
        }
    }

    pub fn is_weight(self) -> bool {
        self == BankId::Weight
    }

    pub fn is_primary_vector(self) -> bool {
        self == BankId::PrimaryVector
    }

    /// Single-array vector banks outside the tiled matrix-vector unit
    pub fn is_auxiliary(self) -> bool {
        !self.is_weight() && !self.is_primary_vector()
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BankId {
    type Err = NpuForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        BankId::ALL
            .into_iter()
            .find(|bank| bank.name() == needle || bank.alias() == needle)
            .ok_or_else(|| NpuForgeError::UnknownBank(s.to_string()))
    }
}

/// One region-descriptor cell
///
/// The descriptors of a bank always partition it into runs: a free run is a
/// sequence of `Free` cells, an allocated run is a `Header` followed by
/// `length - 1` `Continuation` cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Free,
    /// First cell of an allocated run
    Header { length: usize },
    /// Non-first cell of an allocated run
    Continuation,
}

impl Cell {
    pub fn is_free(&self) -> bool {
        matches!(self, Cell::Free)
    }

    /// Length of the run this cell starts, if it is a header
    pub fn run_length(&self) -> Option<usize> {
        match self {
            Cell::Header { length } => Some(*length),
            _ => None,
        }
    }
}

/// Occupancy summary of one bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BankStats {
    pub depth: usize,
    pub used: usize,
    pub free: usize,
    pub allocated_runs: usize,
    pub largest_free_run: usize,
}

impl BankStats {
    /// Fragmentation ratio (0.0 = one contiguous free run)
    pub fn fragmentation(&self) -> f32 {
        if self.free == 0 {
            return 0.0;
        }
        1.0 - (self.largest_free_run as f32 / self.free as f32)
    }
}

/// A fixed-depth bank and its in-place region descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBank {
    id: BankId,
    cells: Vec<Cell>,
}

impl MemoryBank {
    /// Create an empty bank of `depth` words
    pub fn new(id: BankId, depth: usize) -> Self {
        Self {
            id,
            cells: vec![Cell::Free; depth],
        }
    }

    pub fn id(&self) -> BankId {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.cells.len()
    }

    /// Region descriptors, one per word
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, offset: usize) -> Option<Cell> {
        self.cells.get(offset).copied()
    }

    /// Mark `[base, base + size)` as one allocated run
    ///
    /// Callers must have checked that the whole range is free.
    pub(crate) fn commit_run(&mut self, base: usize, size: usize) {
        debug_assert!(size >= 1 && base + size <= self.cells.len());
        debug_assert!(self.cells[base..base + size].iter().all(Cell::is_free));

        self.cells[base] = Cell::Header { length: size };
        for cell in &mut self.cells[base + 1..base + size] {
            *cell = Cell::Continuation;
        }
    }

    /// Overwrite a single descriptor cell
    ///
    /// Only used to build fixtures (gaps, corrupt descriptors) in tests.
    #[cfg(test)]
    pub(crate) fn set_cell(&mut self, offset: usize, cell: Cell) {
        self.cells[offset] = cell;
    }

    /// Length of the longest run of free cells
    pub fn largest_free_run(&self) -> usize {
        let mut best = 0;
        let mut current = 0;
        for cell in &self.cells {
            if cell.is_free() {
                current += 1;
                best = best.max(current);
            } else {
                current = 0;
            }
        }
        best
    }

    /// Summarize occupancy
    pub fn stats(&self) -> BankStats {
        let free = self.cells.iter().filter(|c| c.is_free()).count();
        let allocated_runs = self
            .cells
            .iter()
            .filter(|c| matches!(c, Cell::Header { .. }))
            .count();
        BankStats {
            depth: self.depth(),
            used: self.depth() - free,
            free,
            allocated_runs,
            largest_free_run: self.largest_free_run(),
        }
    }
}
