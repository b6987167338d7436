//! Lazy full scan over a heap file.
//!
//! [`HeapScan`] walks absolute page indices in order, skipping directory
//! pages, and parses one data page at a time into typed rows. Pages are
//! only read as the iterator is pulled, so a scan that is dropped early
//! never touches the rest of the file.
//!
//! The scan is single-pass: it owns its reader and cannot be restarted.
//! Callers wanting a fresh scan reopen the file.

use std::io::{Read, Seek};

use crate::catalog::Catalog;
use crate::datum::Type;
use crate::tuple::Row;

use super::error::HeapError;
use super::io::read_page;
use super::layout::is_directory_page;
use super::page::take_data_rows;

/// Lazy row iterator over every data page of a heap file.
pub struct HeapScan<R> {
    reader: R,
    schema: Vec<Type>,
    /// Next absolute page index to read.
    next_index: u64,
    /// Rows parsed from the current page (ownership-based, no clone).
    buffered: std::vec::IntoIter<Row>,
    done: bool,
}

impl<R: Read + Seek> HeapScan<R> {
    /// Creates a scan over `reader` using the table's catalog.
    ///
    /// The first data page lives at absolute index 1; index 0 is the
    /// first section's directory.
    pub fn new(reader: R, catalog: &Catalog) -> Self {
        Self {
            reader,
            schema: catalog.schema.clone(),
            next_index: 1,
            buffered: Vec::new().into_iter(),
            done: false,
        }
    }

    /// Reads and parses pages until one yields rows or the file ends.
    fn refill(&mut self) -> Result<bool, HeapError> {
        loop {
            let index = self.next_index;
            self.next_index += 1;
            if is_directory_page(index) {
                continue;
            }
            let Some(page) = read_page(&mut self.reader, index)? else {
                self.done = true;
                return Ok(false);
            };
            let rows = take_data_rows(&self.schema, &page[..]).map_err(|err| match err {
                HeapError::CorruptPage(reason) => {
                    HeapError::CorruptPage(format!("page {}: {}", index, reason))
                }
                other => other,
            })?;
            if !rows.is_empty() {
                self.buffered = rows.into_iter();
                return Ok(true);
            }
        }
    }
}

impl<R: Read + Seek> Iterator for HeapScan<R> {
    type Item = Result<Row, HeapError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffered.next() {
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }
            match self.refill() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
