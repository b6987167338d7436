//! Error types for the heap module.

use std::fmt;

use crate::codec::CodecError;
use crate::datum::SchemaError;

/// Errors from heap file operations.
#[derive(Debug)]
pub enum HeapError {
    /// Underlying storage failure.
    Io(std::io::Error),
    /// Page footer inconsistent with its payload, or a schema-guided
    /// parse overran the page bytes.
    CorruptPage(String),
    /// A single row cannot fit in a page after footer and slot
    /// reservation.
    RowTooLarge {
        /// Encoded row bytes plus slot charge.
        size: usize,
        /// Largest chargeable row size.
        max: usize,
    },
    /// Page assembly was asked to hold more than a page's capacity.
    PageFull {
        /// Payload bytes requested.
        required: usize,
        /// Payload bytes available.
        available: usize,
    },
    /// A row does not conform to the table schema.
    Schema(SchemaError),
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::Io(err) => write!(f, "io error: {}", err),
            HeapError::CorruptPage(reason) => write!(f, "corrupt page: {}", reason),
            HeapError::RowTooLarge { size, max } => {
                write!(f, "row of {} bytes exceeds page capacity of {}", size, max)
            }
            HeapError::PageFull {
                required,
                available,
            } => {
                write!(
                    f,
                    "page full: need {} payload bytes, have {}",
                    required, available
                )
            }
            HeapError::Schema(err) => write!(f, "schema violation: {}", err),
        }
    }
}

impl std::error::Error for HeapError {}

impl From<std::io::Error> for HeapError {
    fn from(err: std::io::Error) -> Self {
        HeapError::Io(err)
    }
}

impl From<SchemaError> for HeapError {
    fn from(err: SchemaError) -> Self {
        HeapError::Schema(err)
    }
}

impl From<CodecError> for HeapError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::StringTooLong(len) => HeapError::Schema(SchemaError::StringTooLong(len)),
            other => HeapError::CorruptPage(other.to_string()),
        }
    }
}
