//! Data page parsing and assembly.
//!
//! A data page is parsed by walking its payload left to right, guided by
//! the table schema repeated cyclically: string fields carry a one-byte
//! length prefix, fixed types their natural width. The footer's row count
//! must agree with the recovered rows, otherwise the page is corrupt.

use bytes::{BufMut, BytesMut};

use crate::codec;
use crate::datum::{Type, Value};
use crate::tuple::Row;

use super::error::HeapError;
use super::layout::{COUNT_SIZE, FOOTER_SIZE, PAGE_CAPACITY, PAGE_SIZE, SLOT_SIZE};

/// Bytes a row charges against a page's free space: its encoded payload
/// plus the per-row slot reservation.
pub fn row_cost(row: &Row) -> usize {
    row.encoded_size() + SLOT_SIZE
}

/// Reads the footer of a page image.
///
/// Returns `(row_count, free_offset)`.
fn read_footer(page: &[u8]) -> Result<(usize, usize), HeapError> {
    debug_assert_eq!(page.len(), PAGE_SIZE);
    let (row_count, _) = codec::get_u16(&page[PAGE_SIZE - FOOTER_SIZE..])?;
    let (free_offset, _) = codec::get_u16(&page[PAGE_SIZE - FOOTER_SIZE + COUNT_SIZE..])?;
    Ok((row_count as usize, free_offset as usize))
}

/// Parses a page image into its typed rows.
///
/// # Errors
///
/// Returns `HeapError::CorruptPage` when the footer offset exceeds the
/// payload area, a field decode overruns the payload, fields do not
/// divide evenly into rows, or the footer row count disagrees with the
/// recovered rows.
pub fn take_data_rows(schema: &[Type], page: &[u8]) -> Result<Vec<Row>, HeapError> {
    let (row_count, free_offset) = read_footer(page)?;
    if free_offset > PAGE_CAPACITY {
        return Err(HeapError::CorruptPage(format!(
            "free offset {} exceeds payload area of {}",
            free_offset, PAGE_CAPACITY
        )));
    }
    let payload = &page[..free_offset];

    if schema.is_empty() {
        if row_count != 0 || free_offset != 0 {
            return Err(HeapError::CorruptPage(
                "non-empty page for an empty schema".to_string(),
            ));
        }
        return Ok(Vec::new());
    }

    let mut rows = Vec::with_capacity(row_count);
    let mut current = Vec::with_capacity(schema.len());
    let mut offset = 0;
    while offset < payload.len() {
        let ty = schema[current.len()];
        let (value, consumed) = Value::decode(&payload[offset..], ty)
            .map_err(|err| HeapError::CorruptPage(format!("field at offset {}: {}", offset, err)))?;
        offset += consumed;
        current.push(value);
        if current.len() == schema.len() {
            rows.push(Row::new(std::mem::take(&mut current)));
        }
    }

    if !current.is_empty() {
        return Err(HeapError::CorruptPage(format!(
            "payload ends mid-row after {} of {} fields",
            current.len(),
            schema.len()
        )));
    }
    if rows.len() != row_count {
        return Err(HeapError::CorruptPage(format!(
            "footer claims {} rows, payload holds {}",
            row_count,
            rows.len()
        )));
    }
    Ok(rows)
}

/// Assembles a full page image holding `rows`.
///
/// Emits the concatenated encoded rows, zero padding, then the footer
/// `(row_count, free_offset)`. The result is always exactly
/// [`PAGE_SIZE`] bytes.
///
/// # Errors
///
/// Returns `HeapError::PageFull` if the rows (with their slot charges)
/// exceed the page capacity.
pub fn build_page(rows: &[Row]) -> Result<Vec<u8>, HeapError> {
    let payload_bytes: usize = rows.iter().map(Row::encoded_size).sum();
    let required = payload_bytes + rows.len() * SLOT_SIZE;
    if required > PAGE_CAPACITY {
        return Err(HeapError::PageFull {
            required,
            available: PAGE_CAPACITY,
        });
    }

    let mut page = BytesMut::with_capacity(PAGE_SIZE);
    for row in rows {
        for value in &row.values {
            value.encode(&mut page)?;
        }
    }
    debug_assert_eq!(page.len(), payload_bytes);
    page.put_bytes(0, PAGE_CAPACITY - payload_bytes);
    codec::put_u16(&mut page, rows.len() as u16);
    codec::put_u16(&mut page, payload_bytes as u16);
    Ok(page.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_schema() -> Vec<Type> {
        vec![Type::String, Type::Int, Type::String]
    }

    fn person_row(name: &str, age: i32, city: &str) -> Row {
        Row::new(vec![
            Value::String(name.into()),
            Value::Int(age),
            Value::String(city.into()),
        ])
    }

    #[test]
    fn test_empty_page_parses_to_no_rows() {
        let page = vec![0u8; PAGE_SIZE];
        assert!(take_data_rows(&person_schema(), &page).unwrap().is_empty());
    }

    #[test]
    fn test_build_take_roundtrip() {
        let rows = vec![
            person_row("Ana", 80, "Athens"),
            person_row("Bob", 40, "Paris"),
        ];
        let page = build_page(&rows).unwrap();
        assert_eq!(page.len(), PAGE_SIZE);

        let parsed = take_data_rows(&person_schema(), &page).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn test_footer_layout() {
        let rows = vec![person_row("Ana", 80, "Athens")];
        let page = build_page(&rows).unwrap();
        // "Ana" (1+3) + age (4) + "Athens" (1+6) = 15 payload bytes
        assert_eq!(&page[PAGE_SIZE - 4..], &[0, 1, 0, 15]);
        // slack between payload and footer is zeroed
        assert!(page[15..PAGE_SIZE - 4].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_build_page_full() {
        // 5 rows of a single max-width string: 256 payload + 2 slot each
        let row = Row::new(vec![Value::String("x".repeat(255))]);
        let rows = vec![row; 16];
        // 16 × 258 = 4128 > 4092
        assert!(matches!(
            build_page(&rows),
            Err(HeapError::PageFull { required: 4128, .. })
        ));
    }

    #[test]
    fn test_corrupt_row_count() {
        let rows = vec![person_row("Ana", 80, "Athens")];
        let mut page = build_page(&rows).unwrap();
        page[PAGE_SIZE - 3] = 9;
        assert!(matches!(
            take_data_rows(&person_schema(), &page),
            Err(HeapError::CorruptPage(_))
        ));
    }

    #[test]
    fn test_corrupt_free_offset_overrun() {
        let rows = vec![person_row("Ana", 80, "Athens")];
        let mut page = build_page(&rows).unwrap();
        // free offset points past the payload area
        page[PAGE_SIZE - 2] = 0xFF;
        page[PAGE_SIZE - 1] = 0xFF;
        assert!(matches!(
            take_data_rows(&person_schema(), &page),
            Err(HeapError::CorruptPage(_))
        ));
    }

    #[test]
    fn test_corrupt_truncated_field() {
        let rows = vec![person_row("Ana", 80, "Athens")];
        let mut page = build_page(&rows).unwrap();
        // shrink the free offset so the last string is cut mid-field
        page[PAGE_SIZE - 2] = 0;
        page[PAGE_SIZE - 1] = 12;
        assert!(matches!(
            take_data_rows(&person_schema(), &page),
            Err(HeapError::CorruptPage(_))
        ));
    }

    #[test]
    fn test_row_cost_includes_slot_charge() {
        let row = person_row("Ana", 80, "Athens");
        assert_eq!(row_cost(&row), row.encoded_size() + SLOT_SIZE);
    }
}
