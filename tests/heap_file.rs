//! Integration tests for the heap file storage engine.

use std::fs::{File, OpenOptions};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

use quern::catalog::{heap_path, Catalog};
use quern::datum::{Type, Value};
use quern::heap::{
    is_directory_page, take_data_rows, write_rows, HeapScan, PageDirectory, PAGE_CAPACITY,
    PAGE_SIZE, SECTION_STRIDE, SLOT_SIZE,
};
use quern::tuple::Row;

fn open_rw(path: &Path) -> File {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .unwrap()
}

fn person_catalog() -> Catalog {
    Catalog::new(
        vec![
            "name".into(),
            "age".into(),
            "city".into(),
            "country".into(),
        ],
        vec![Type::String, Type::Int, Type::String, Type::String],
    )
    .unwrap()
}

fn person(name: &str, age: i32, city: &str, country: &str) -> Row {
    Row::new(vec![
        Value::String(name.into()),
        Value::Int(age),
        Value::String(city.into()),
        Value::String(country.into()),
    ])
}

fn person_rows() -> Vec<Row> {
    vec![
        person("Ana", 80, "Athens", "Greece"),
        person("Charlie", 50, "Berlin", "Germany"),
        person("Alice", 30, "London", "UK"),
        person("David", 60, "Madrid", "Spain"),
        person("Bob", 40, "Paris", "France"),
        person("Eve", 70, "Rome", "Italy"),
    ]
}

fn scan_file(path: &Path, catalog: &Catalog) -> Vec<Row> {
    HeapScan::new(File::open(path).unwrap(), catalog)
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn test_write_scan_roundtrip_on_disk() {
    let dir = tempdir().unwrap();
    let path = heap_path(dir.path(), "person");
    let catalog = person_catalog();

    let mut file = open_rw(&path);
    write_rows(&mut file, &catalog, person_rows()).unwrap();
    drop(file);

    assert_eq!(scan_file(&path, &catalog), person_rows());
}

#[test]
fn test_reopen_and_append() {
    let dir = tempdir().unwrap();
    let path = heap_path(dir.path(), "person");
    let catalog = person_catalog();

    {
        let mut file = open_rw(&path);
        write_rows(&mut file, &catalog, person_rows()).unwrap();
    }
    {
        let mut file = open_rw(&path);
        write_rows(
            &mut file,
            &catalog,
            vec![person("Zoe", 20, "Oslo", "Norway")],
        )
        .unwrap();
    }

    let mut expected = person_rows();
    expected.push(person("Zoe", 20, "Oslo", "Norway"));
    assert_eq!(scan_file(&path, &catalog), expected);
}

#[test]
fn test_file_size_is_whole_pages() {
    let dir = tempdir().unwrap();
    let path = heap_path(dir.path(), "person");
    let catalog = person_catalog();

    let mut file = open_rw(&path);
    write_rows(&mut file, &catalog, person_rows()).unwrap();
    drop(file);

    let len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(len % PAGE_SIZE as u64, 0);
    // one directory page plus one data page for six small rows
    assert_eq!(len, 2 * PAGE_SIZE as u64);
}

/// Decodes every section of a heap file and checks that each directory
/// entry equals the page capacity minus the page's payload and slot
/// charges.
fn assert_directory_invariant(path: &Path, catalog: &Catalog) {
    let bytes = std::fs::read(path).unwrap();
    let pages: Vec<&[u8]> = bytes.chunks(PAGE_SIZE).collect();

    let mut directory: Option<PageDirectory> = None;
    let mut slot = 0usize;
    for (index, page) in pages.iter().enumerate() {
        if is_directory_page(index as u64) {
            directory = Some(PageDirectory::decode(page).unwrap());
            slot = 0;
            continue;
        }
        let dir = directory.as_ref().expect("data page before any directory");
        let rows = take_data_rows(&catalog.schema, page).unwrap();
        let payload: usize = rows.iter().map(Row::encoded_size).sum();
        assert_eq!(
            dir.free_bytes(slot),
            PAGE_CAPACITY - payload - rows.len() * SLOT_SIZE,
            "directory entry {} of page {}",
            slot,
            index
        );
        slot += 1;
    }
}

#[test]
fn test_directory_tracks_free_space() {
    let dir = tempdir().unwrap();
    let path = heap_path(dir.path(), "person");
    let catalog = person_catalog();

    let mut file = open_rw(&path);
    write_rows(&mut file, &catalog, person_rows()).unwrap();
    write_rows(
        &mut file,
        &catalog,
        vec![person("Zoe", 20, "Oslo", "Norway")],
    )
    .unwrap();
    drop(file);

    assert_directory_invariant(&path, &catalog);
}

#[test]
fn test_large_write_spills_across_sections() {
    let dir = tempdir().unwrap();
    let path = heap_path(dir.path(), "wide");
    let catalog = Catalog::new(vec!["payload".into()], vec![Type::String]).unwrap();

    // each row costs 258 bytes, 15 fit per page; 40 rows need three
    // pages, one more than a single section pass will touch
    let rows: Vec<Row> = (0..40)
        .map(|i| Row::new(vec![Value::String(format!("{:0>255}", i))]))
        .collect();

    let mut file = open_rw(&path);
    write_rows(&mut file, &catalog, rows.clone()).unwrap();
    drop(file);

    // the spill created a second section
    let len = std::fs::metadata(&path).unwrap().len();
    assert!(len > SECTION_STRIDE * PAGE_SIZE as u64);

    assert_eq!(scan_file(&path, &catalog), rows);
    assert_directory_invariant(&path, &catalog);
}

#[test]
fn test_random_batches_roundtrip() {
    let dir = tempdir().unwrap();
    let path = heap_path(dir.path(), "mixed");
    let catalog = Catalog::new(
        vec!["label".into(), "count".into(), "ratio".into()],
        vec![Type::String, Type::Int, Type::Float],
    )
    .unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let mut written = Vec::new();
    let mut file = open_rw(&path);
    for _ in 0..20 {
        let batch: Vec<Row> = (0..rng.gen_range(1..60))
            .map(|_| {
                let label_len = rng.gen_range(0..200);
                Row::new(vec![
                    Value::String("x".repeat(label_len)),
                    Value::Int(rng.gen()),
                    Value::Float(rng.gen::<f32>()),
                ])
            })
            .collect();
        write_rows(&mut file, &catalog, batch.clone()).unwrap();
        written.extend(batch);
    }
    drop(file);

    // later batches may back-fill pages an earlier batch left partial,
    // so cross-batch order is not contractual; the multiset is
    let key = |row: &Row| {
        (
            match &row.values[1] {
                Value::Int(n) => *n,
                _ => unreachable!(),
            },
            match &row.values[2] {
                Value::Float(f) => f.to_bits(),
                _ => unreachable!(),
            },
        )
    };
    let mut scanned = scan_file(&path, &catalog);
    scanned.sort_unstable_by_key(key);
    written.sort_unstable_by_key(key);
    assert_eq!(scanned, written);
    assert_directory_invariant(&path, &catalog);
}

#[test]
fn test_scan_of_missing_file_via_empty_reader() {
    let dir = tempdir().unwrap();
    let path = heap_path(dir.path(), "person");
    let catalog = person_catalog();

    // an empty file scans as an empty table
    open_rw(&path);
    assert!(scan_file(&path, &catalog).is_empty());
}
