//! Error types for slabmap
//!
//! Uses thiserror for clean, idiomatic error definitions. Every fallible
//! operation in this crate returns [`MemoryResult`]; "key not found" is an
//! expected signal and is surfaced as `Option`/`bool`, never as an error.

use thiserror::Error;

/// Memory management errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The underlying block allocation failed.
    #[error("memory allocation failed: {size} bytes with {align} byte alignment")]
    AllocationFailed { size: usize, align: usize },

    /// A configuration field is out of its valid domain.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },

    /// A requested alignment is not a power of two.
    #[error("invalid alignment: {alignment}")]
    InvalidAlignment { alignment: usize },

    /// Layout arithmetic would wrap around `usize`.
    #[error("size overflow while computing {operation}")]
    SizeOverflow { operation: &'static str },
}

impl MemoryError {
    /// Check if the error is retryable (the caller may free memory and retry).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }

    /// Get a stable error code for categorisation.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AllocationFailed { .. } => "MEM:ALLOC:FAILED",
            Self::InvalidConfig { .. } => "MEM:CONFIG:INVALID",
            Self::InvalidAlignment { .. } => "MEM:CONFIG:ALIGN",
            Self::SizeOverflow { .. } => "MEM:LAYOUT:OVERFLOW",
        }
    }
}

/// Result alias for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            MemoryError::AllocationFailed { size: 64, align: 8 }.code(),
            "MEM:ALLOC:FAILED"
        );
        assert_eq!(
            MemoryError::SizeOverflow { operation: "block layout" }.code(),
            "MEM:LAYOUT:OVERFLOW"
        );
    }

    #[test]
    fn only_oom_is_retryable() {
        assert!(MemoryError::AllocationFailed { size: 1, align: 1 }.is_retryable());
        assert!(!MemoryError::InvalidAlignment { alignment: 3 }.is_retryable());
    }
}
