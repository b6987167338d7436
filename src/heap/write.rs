//! Appending multi-section writes.
//!
//! [`write_rows`] packs queued rows into data pages greedily, in
//! directory order, touching only the pages that receive rows and the
//! section directory that tracks them. Each section pass modifies at
//! most [`SECTION_WRITE_BATCH`](super::SECTION_WRITE_BATCH) data pages
//! before the remaining rows spill into the next section; sparse files
//! are legal, so a spilled section's untouched pages simply read as
//! zeroed.
//!
//! Implemented as a free function because insertion is stateless: no
//! cursor position or buffered data survives the call.

use std::collections::VecDeque;
use std::io::{Read, Seek, Write};

use tracing::debug;

use crate::catalog::Catalog;
use crate::tuple::Row;

use super::directory::PageDirectory;
use super::error::HeapError;
use super::io::{read_page, read_page_or_empty, write_page};
use super::layout::{
    data_page_index, section_start, MAX_ROW_SIZE, PAGE_DIRECTORY_ENTRIES, SECTION_WRITE_BATCH,
    SLOT_SIZE,
};
use super::page::{build_page, row_cost, take_data_rows};

/// Appends `rows` to a heap file, spanning sections as needed.
///
/// Every row is validated against the catalog schema before any byte is
/// written, so a failed call either writes nothing or stops at a page
/// boundary. The file may be empty or previously written; existing pages
/// keep their rows and only gain new ones.
///
/// # Errors
///
/// Returns `HeapError::Schema` for rows that do not match the schema,
/// `HeapError::RowTooLarge` for a row that cannot fit any page, and
/// `HeapError::CorruptPage`/`HeapError::Io` for a damaged or unreadable
/// file.
pub fn write_rows<F: Read + Write + Seek>(
    file: &mut F,
    catalog: &Catalog,
    rows: Vec<Row>,
) -> Result<(), HeapError> {
    for row in &rows {
        row.check_schema(&catalog.schema)?;
        let size = row.encoded_size();
        if size > MAX_ROW_SIZE {
            return Err(HeapError::RowTooLarge {
                size,
                max: MAX_ROW_SIZE,
            });
        }
    }

    let mut queue: VecDeque<Row> = rows.into();
    let mut section = 0u64;
    while !queue.is_empty() {
        let placed = write_section_pass(file, catalog, section, &mut queue)?;
        debug!(section, rows = placed, remaining = queue.len(), "section pass");
        section += 1;
    }
    Ok(())
}

/// Runs one packing pass over `section`, returning the rows placed.
fn write_section_pass<F: Read + Write + Seek>(
    file: &mut F,
    catalog: &Catalog,
    section: u64,
    queue: &mut VecDeque<Row>,
) -> Result<usize, HeapError> {
    let dir_index = section_start(section);
    let mut directory = match read_page(file, dir_index)? {
        Some(page) => PageDirectory::decode(&page[..])?,
        None => PageDirectory::empty(),
    };

    // Greedy packing in directory order: take rows off the front of the
    // queue while they fit, so insertion order survives the page walk.
    let mut placements: Vec<(usize, Vec<Row>)> = Vec::new();
    for slot in 0..PAGE_DIRECTORY_ENTRIES {
        if queue.is_empty() {
            break;
        }
        let mut free = directory.free_bytes(slot);
        let mut placed = Vec::new();
        while queue.front().is_some_and(|row| row_cost(row) <= free) {
            if let Some(row) = queue.pop_front() {
                free -= row_cost(&row);
                placed.push(row);
            }
        }
        if !placed.is_empty() {
            placements.push((slot, placed));
            if placements.len() == SECTION_WRITE_BATCH {
                break;
            }
        }
    }

    if placements.is_empty() {
        return Ok(0);
    }

    let mut placed_total = 0;
    for (slot, new_rows) in &placements {
        let index = data_page_index(section, *slot);
        let existing_page = read_page_or_empty(file, index)?;
        let mut page_rows = take_data_rows(&catalog.schema, existing_page.as_ref())?;

        let payload_added: usize = new_rows.iter().map(Row::encoded_size).sum();
        directory.charge(*slot, payload_added + new_rows.len() * SLOT_SIZE);

        placed_total += new_rows.len();
        page_rows.extend(new_rows.iter().cloned());
        write_page(file, index, &build_page(&page_rows)?)?;
    }
    write_page(file, dir_index, &directory.encode())?;

    Ok(placed_total)
}
