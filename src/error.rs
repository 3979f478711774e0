//! Unified error handling for NpuForge
//!
//! Every fallible operation in the crate returns [`ForgeResult`]. Errors are
//! grouped into categories so the compiler driver can decide what to do:
//! - User errors (bad shapes, unknown banks, bad configuration) are rejected
//!   before any bank or storage is touched
//! - Recoverable errors (a bank has no room) leave all state unchanged; the
//!   caller may pick another bank or abort the compilation
//! - Internal errors mean the region descriptors of a bank are corrupt. They
//!   must stop the compilation run, since any address handed out afterwards
//!   could be wrong
//! - Config errors come from reading or parsing architecture files

use std::fmt;

use crate::memory::BankId;

// Re-export thiserror for convenience
pub use thiserror;

/// Unified error type for NpuForge
#[derive(Debug, thiserror::Error)]
pub enum NpuForgeError {
    // ========== User Errors ==========
    /// Malformed allocation request (zero dimension, missing payload, wrong bank kind)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Bank identifier outside the fixed set of seven
    #[error("Unknown memory bank: {0}")]
    UnknownBank(String),

    /// Payload shape differs from the requested logical shape
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Architecture parameters rejected during validation
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ========== Allocation Errors ==========
    /// No contiguous free run of the requested size exists in the bank
    #[error("Allocation of {requested} word(s) failed in {bank}: largest free run is {largest_free_run}")]
    AllocationFailed {
        bank: BankId,
        requested: usize,
        largest_free_run: usize,
    },

    // ========== Internal Errors ==========
    /// A region descriptor violates the partition invariant
    #[error("Internal inconsistency in {bank} at offset {offset}: {detail}")]
    InternalInconsistency {
        bank: BankId,
        offset: usize,
        detail: String,
    },

    /// A descriptor was handed an address twice
    #[error("Tensor already allocated: {0}")]
    AlreadyAllocated(String),

    // ========== Config I/O Errors ==========
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NpuForgeError {
    /// Categorize the error for handling decisions
    pub fn category(&self) -> ErrorCategory {
        match self {
            NpuForgeError::InvalidArgument(_)
            | NpuForgeError::UnknownBank(_)
            | NpuForgeError::ShapeMismatch { .. }
            | NpuForgeError::InvalidConfiguration(_) => ErrorCategory::User,

            NpuForgeError::AllocationFailed { .. } => ErrorCategory::Recoverable,

            NpuForgeError::InternalInconsistency { .. } | NpuForgeError::AlreadyAllocated(_) => {
                ErrorCategory::Internal
            }

            NpuForgeError::Io(_) | NpuForgeError::Serialization(_) => ErrorCategory::Config,
        }
    }

    /// Check if this error leaves the context usable
    ///
    /// Recoverable errors never mutate a bank, so the caller may retry with a
    /// different bank or a smaller request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Recoverable)
    }

    /// Check if this is a user-facing error (bad request or configuration)
    pub fn is_user_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::User)
    }

    /// Check if this error must abort the compilation run
    pub fn is_fatal(&self) -> bool {
        matches!(self.category(), ErrorCategory::Internal)
    }
}

/// Error category for handling decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid input; rejected before any mutation
    User,
    /// Bank exhausted; state unchanged
    Recoverable,
    /// Allocator corruption; abort the compilation
    Internal,
    /// Configuration file problem
    Config,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::User => write!(f, "User"),
            ErrorCategory::Recoverable => write!(f, "Recoverable"),
            ErrorCategory::Internal => write!(f, "Internal"),
            ErrorCategory::Config => write!(f, "Config"),
        }
    }
}

// Helper type alias for Results using NpuForgeError
pub type ForgeResult<T> = std::result::Result<T, NpuForgeError>;

/// Create an invalid-argument error with context
///
/// # Examples
/// ```ignore
/// return Err(invalid_argument!("vector length must be positive"));
/// ```
#[macro_export]
macro_rules! invalid_argument {
    ($msg:expr) => {
        $crate::error::NpuForgeError::InvalidArgument($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::NpuForgeError::InvalidArgument(format!($fmt, $($arg)*))
    };
}

/// Create an invalid-configuration error with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::NpuForgeError::InvalidConfiguration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::NpuForgeError::InvalidConfiguration(format!($fmt, $($arg)*))
    };
}

/// Wrap an IO error with context
///
/// # Examples
/// ```ignore
/// let text = std::fs::read_to_string(path).map_err(|e| io_context(e, "reading arch file"))?;
/// ```
pub fn io_context(err: std::io::Error, msg: &str) -> NpuForgeError {
    NpuForgeError::Io(std::io::Error::new(err.kind(), format!("{}: {}", msg, err)))
}
