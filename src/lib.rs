//! NPUForge - on-chip memory management for an NPU compiler
//!
//! Tensors headed for the accelerator are padded to the hardware's lane and
//! compute-unit granularity, given a contiguous run of words in one of seven
//! fixed-depth memory banks, and written into the physical storage arrays the
//! instruction generator later reads.
//!
//! Everything hangs off an [`AcceleratorContext`]; there is no global state.

#![allow(clippy::needless_range_loop)]

pub mod arch;
pub mod context;
pub mod error;
pub mod layout;
pub mod logging;
pub mod memory;
pub mod storage;
pub mod tensor;

pub use arch::{ArchParams, ArchPreset};
pub use context::{AcceleratorContext, TensorRecord};
pub use error::{ErrorCategory, ForgeResult, NpuForgeError};
pub use layout::{MatrixLayout, PhysicalCoord};
pub use logging::{init_logging_default, init_logging_from_env, init_with_config, LoggingConfig};
pub use memory::{BankAllocator, BankId, BankSet, BankStats, Cell, FirstFit, MemoryBank};
pub use storage::{PhysicalStorage, StorageArray};
pub use tensor::{AllocationState, TensorData, TensorDescriptor, TensorShape};
