//! Positioned whole-page reads and writes.
//!
//! The heap layer is generic over seekable byte streams so that tests can
//! run against an in-memory cursor and production code against a file.
//! Pages beyond end-of-file read as zeroed on the write path (appending
//! into a fresh section is legal); the scan path instead stops at the
//! first zero-byte read.

use std::io::{Read, Seek, SeekFrom, Write};

use super::error::HeapError;
use super::layout::{page_offset, PAGE_SIZE};

/// Reads the page at `index`, or `None` at end-of-file.
///
/// A read that ends mid-page is a corrupt file: heap files are always a
/// whole number of pages.
pub fn read_page<R: Read + Seek>(
    reader: &mut R,
    index: u64,
) -> Result<Option<Box<[u8; PAGE_SIZE]>>, HeapError> {
    reader.seek(SeekFrom::Start(page_offset(index)))?;
    let mut page = Box::new([0u8; PAGE_SIZE]);
    let mut filled = 0;
    while filled < PAGE_SIZE {
        match reader.read(&mut page[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    match filled {
        0 => Ok(None),
        n if n == PAGE_SIZE => Ok(Some(page)),
        n => Err(HeapError::CorruptPage(format!(
            "page {}: short read of {} bytes",
            index, n
        ))),
    }
}

/// Reads the page at `index`, substituting a zeroed page past end-of-file.
pub fn read_page_or_empty<R: Read + Seek>(
    reader: &mut R,
    index: u64,
) -> Result<Box<[u8; PAGE_SIZE]>, HeapError> {
    Ok(read_page(reader, index)?.unwrap_or_else(|| Box::new([0u8; PAGE_SIZE])))
}

/// Writes a full page at `index`.
pub fn write_page<W: Write + Seek>(
    writer: &mut W,
    index: u64,
    page: &[u8],
) -> Result<(), HeapError> {
    debug_assert_eq!(page.len(), PAGE_SIZE);
    writer.seek(SeekFrom::Start(page_offset(index)))?;
    writer.write_all(page)?;
    Ok(())
}
