//! Per-section page directories.
//!
//! The first page of every section is a directory of 2048 big-endian
//! `u16` entries, one per data page, each recording that page's free
//! bytes. A fresh directory reports [`PAGE_CAPACITY`] for every page,
//! the free space of a zeroed data page.

use bytes::BytesMut;

use crate::codec;

use super::error::HeapError;
use super::layout::{PAGE_CAPACITY, PAGE_DIRECTORY_ENTRIES, PAGE_SIZE};

/// Free-space map for one section's data pages.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDirectory {
    free: Vec<u16>,
}

impl PageDirectory {
    /// Returns the directory of a fresh section: every data page reports
    /// the full capacity of an empty page.
    pub fn empty() -> Self {
        Self {
            free: vec![PAGE_CAPACITY as u16; PAGE_DIRECTORY_ENTRIES],
        }
    }

    /// Decodes a directory from its on-disk page image.
    pub fn decode(page: &[u8]) -> Result<Self, HeapError> {
        if page.len() != PAGE_SIZE {
            return Err(HeapError::CorruptPage(format!(
                "directory page of {} bytes",
                page.len()
            )));
        }
        let mut free = Vec::with_capacity(PAGE_DIRECTORY_ENTRIES);
        for chunk in 0..PAGE_DIRECTORY_ENTRIES {
            let (entry, _) = codec::get_u16(&page[chunk * 2..])?;
            free.push(entry);
        }
        Ok(Self { free })
    }

    /// Encodes this directory as a full page image.
    pub fn encode(&self) -> Vec<u8> {
        let mut page = BytesMut::with_capacity(PAGE_SIZE);
        for &entry in &self.free {
            codec::put_u16(&mut page, entry);
        }
        page.to_vec()
    }

    /// Free bytes recorded for the `slot`-th data page (0-based).
    pub fn free_bytes(&self, slot: usize) -> usize {
        self.free[slot] as usize
    }

    /// Charges `bytes` against the `slot`-th data page's free count.
    pub fn charge(&mut self, slot: usize, bytes: usize) {
        debug_assert!(bytes <= self.free[slot] as usize);
        self.free[slot] -= bytes as u16;
    }
}
