//! On-chip memory bank management
//!
//! Each bank is a fixed number of words. Allocation state lives in the bank
//! itself as one region descriptor per word, so a bank can always be scanned
//! run by run without a side table.
//!
//! # Pattern
//!
//! 1. [`BankSet`] owns the seven banks of a session
//! 2. [`FirstFit`] scans a bank for the first free run of the requested size
//! 3. The run is committed only after the whole range has been checked
//!
//! There is no free operation: tensors live for the whole compilation.

pub mod allocator;
pub mod bank;
pub mod banks;

pub use allocator::{BankAllocator, FirstFit};
pub use bank::{BankId, BankStats, Cell, MemoryBank};
pub use banks::BankSet;
