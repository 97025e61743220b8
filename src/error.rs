use crate::datatypes::DataType;
use crate::memory::AllocationError;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("memory error: {0}")]
    Allocation(#[from] AllocationError),
    #[error("index {index} out of bound (value count {value_count})")]
    IndexOutOfBounds { index: usize, value_count: usize },
    #[error("range {start}..{start}+{length} out of bound (value count {value_count})")]
    OutOfRange {
        start: usize,
        length: usize,
        value_count: usize,
    },
    #[error("total value length {0} does not fit in the offset type")]
    OffsetOverflow(usize),
    #[error("expected a field of type {expected}, found {found}")]
    TypeMismatch { expected: DataType, found: DataType },
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
    #[error("invalid UTF-8 at index {index}: {source}")]
    Utf8 {
        index: usize,
        source: std::str::Utf8Error,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A slot whose content violates the scalar rule of its type.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidScalar {
    pub index: usize,
    pub reason: String,
}

/// The result of a full content scan that found invalid scalars.
#[derive(Debug, Clone, Error, PartialEq)]
pub struct ValidationError {
    pub failures: Vec<InvalidScalar>,
}

impl ValidationError {
    /// Returns the indices of the offending slots, in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.failures.iter().map(|f| f.index)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid value(s)", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; at position {}: {}", failure.index, failure.reason)?;
        }
        Ok(())
    }
}
