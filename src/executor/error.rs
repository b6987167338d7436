//! Error types for the executor module.

use std::fmt;

use crate::catalog::CatalogError;
use crate::datum::{SchemaError, Type};
use crate::heap::HeapError;

use super::plan::CompareOp;

/// Errors from plan construction and execution.
#[derive(Debug)]
pub enum ExecutorError {
    /// An operator references a column absent from its input.
    UnknownColumn(String),
    /// A join strategy was given a predicate it cannot execute.
    UnsupportedOp {
        /// Operator that rejected the predicate.
        operator: &'static str,
        /// The offending comparison.
        op: CompareOp,
    },
    /// A join or merge references a step key not bound in the
    /// environment.
    MissingStep(String),
    /// A comparison or aggregate met a value of the wrong type.
    TypeMismatch {
        /// What the operation needed.
        expected: String,
        /// Type of the value it got.
        found: Type,
    },
    /// Integer aggregate overflowed 32 bits.
    IntegerOverflow,
    /// Heap file failure.
    Heap(HeapError),
    /// Catalog failure.
    Catalog(CatalogError),
    /// CSV reader failure.
    Csv(csv::Error),
    /// Underlying file system failure.
    Io(std::io::Error),
    /// A value failed schema-driven parsing or validation.
    Schema(SchemaError),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::UnknownColumn(name) => write!(f, "unknown column: {}", name),
            ExecutorError::UnsupportedOp { operator, op } => {
                write!(f, "{} does not support the {} predicate", operator, op)
            }
            ExecutorError::MissingStep(key) => {
                write!(f, "step {:?} is not bound in the environment", key)
            }
            ExecutorError::TypeMismatch { expected, found } => {
                write!(f, "expected {}, found a {} value", expected, found)
            }
            ExecutorError::IntegerOverflow => write!(f, "integer aggregate overflow"),
            ExecutorError::Heap(err) => write!(f, "heap error: {}", err),
            ExecutorError::Catalog(err) => write!(f, "catalog error: {}", err),
            ExecutorError::Csv(err) => write!(f, "csv error: {}", err),
            ExecutorError::Io(err) => write!(f, "io error: {}", err),
            ExecutorError::Schema(err) => write!(f, "schema violation: {}", err),
        }
    }
}

impl std::error::Error for ExecutorError {}

impl From<HeapError> for ExecutorError {
    fn from(err: HeapError) -> Self {
        ExecutorError::Heap(err)
    }
}

impl From<CatalogError> for ExecutorError {
    fn from(err: CatalogError) -> Self {
        ExecutorError::Catalog(err)
    }
}

impl From<csv::Error> for ExecutorError {
    fn from(err: csv::Error) -> Self {
        ExecutorError::Csv(err)
    }
}

impl From<std::io::Error> for ExecutorError {
    fn from(err: std::io::Error) -> Self {
        ExecutorError::Io(err)
    }
}

impl From<SchemaError> for ExecutorError {
    fn from(err: SchemaError) -> Self {
        ExecutorError::Schema(err)
    }
}
