//! Table metadata and its on-disk store.
//!
//! A [`Catalog`] pairs a table's ordered column names with a parallel list
//! of column types. It is created with the table, persisted as a small
//! JSON document at `<table>_catalog`, and read-only thereafter.
//!
//! This module also owns the file-naming scheme: the heap file lives at
//! `<table>_table.cljdb` and the CSV source at `<table>_table.csv`, all
//! resolved against an explicit data directory.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::datum::Type;
use crate::tuple::ColumnIndex;

/// File suffix of the catalog document.
pub const CATALOG_SUFFIX: &str = "_catalog";
/// File suffix of the heap file.
pub const HEAP_SUFFIX: &str = "_table.cljdb";
/// File suffix of the CSV source.
pub const CSV_SUFFIX: &str = "_table.csv";

/// Errors from catalog persistence.
#[derive(Debug)]
pub enum CatalogError {
    /// Underlying file system failure.
    Io(std::io::Error),
    /// Malformed catalog document.
    Json(serde_json::Error),
    /// Column and schema lists differ in length.
    ArityMismatch {
        /// Number of column names.
        columns: usize,
        /// Number of schema entries.
        schema: usize,
    },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io(err) => write!(f, "catalog io error: {}", err),
            CatalogError::Json(err) => write!(f, "catalog document error: {}", err),
            CatalogError::ArityMismatch { columns, schema } => {
                write!(
                    f,
                    "catalog has {} columns but {} schema entries",
                    columns, schema
                )
            }
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Json(err)
    }
}

/// Per-table metadata: ordered column names and their types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Column types, parallel to `columns`.
    pub schema: Vec<Type>,
}

impl Catalog {
    /// Creates a catalog, validating that both lists have the same arity.
    pub fn new(columns: Vec<String>, schema: Vec<Type>) -> Result<Self, CatalogError> {
        if columns.len() != schema.len() {
            return Err(CatalogError::ArityMismatch {
                columns: columns.len(),
                schema: schema.len(),
            });
        }
        Ok(Self { columns, schema })
    }

    /// Returns the number of columns.
    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// Returns a column index over this catalog's columns.
    pub fn column_index(&self) -> ColumnIndex {
        ColumnIndex::new(self.columns.clone())
    }

    /// Loads the catalog document for `table` from `dir`.
    pub fn read(dir: &Path, table: &str) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(catalog_path(dir, table))?;
        let catalog: Catalog = serde_json::from_str(&content)?;
        if catalog.columns.len() != catalog.schema.len() {
            return Err(CatalogError::ArityMismatch {
                columns: catalog.columns.len(),
                schema: catalog.schema.len(),
            });
        }
        Ok(catalog)
    }

    /// Writes the catalog document for `table` into `dir`.
    pub fn write(&self, dir: &Path, table: &str) -> Result<(), CatalogError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(catalog_path(dir, table), content)?;
        Ok(())
    }
}

/// Path of the catalog document for `table`.
pub fn catalog_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{}{}", table, CATALOG_SUFFIX))
}

/// Path of the heap file for `table`.
pub fn heap_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{}{}", table, HEAP_SUFFIX))
}

/// Path of the CSV source for `table`.
pub fn csv_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{}{}", table, CSV_SUFFIX))
}
