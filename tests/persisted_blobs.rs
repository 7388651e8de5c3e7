//! Cursor blobs and key/value blobs are this runtime's only on-disk
//! formats (spec.md §6, "Persisted state layout"). These tests round-trip
//! both through an actual file on disk rather than an in-memory `Vec`, to
//! exercise the same "write now, read back in a later process" path a
//! `BLOB` column backs in production.

use cql_runtime::blob_codec::{decode_cursor, encode_cursor, ColumnShape};
use cql_runtime::{bcreatekey, bgetkey, CoreType, KvType, KvValue, ScalarValue};
use std::io::{Read, Write};

#[test]
fn cursor_blob_round_trips_through_a_file() {
    let shapes = vec![
        ColumnShape { core: CoreType::Int32, not_null: true },
        ColumnShape { core: CoreType::Double, not_null: true },
    ];
    let encoded = encode_cursor(&shapes, &[ScalarValue::Int32(7), ScalarValue::Double(2.5)], &[]);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&encoded).unwrap();
    file.flush().unwrap();

    let mut from_disk = Vec::new();
    std::fs::File::open(file.path())
        .unwrap()
        .read_to_end(&mut from_disk)
        .unwrap();

    assert_eq!(from_disk, encoded);
    let decoded = decode_cursor(&from_disk, &shapes).unwrap();
    assert!(decoded.has_row);
}

#[test]
fn key_blob_round_trips_through_a_file() {
    let blob = bcreatekey(
        7,
        &[(KvType::String, KvValue::String("persisted".into()))],
    )
    .unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&blob).unwrap();
    file.flush().unwrap();

    let mut from_disk = Vec::new();
    std::fs::File::open(file.path())
        .unwrap()
        .read_to_end(&mut from_disk)
        .unwrap();

    assert_eq!(bgetkey(&from_disk, 0), Some(KvValue::String("persisted".into())));
}
