//! Drives the `bcreatekey`/`bgetkey`/`bupdatekey` and
//! `bcreateval`/`bgetval`/`bupdateval` family as registered scalar SQL
//! functions against a live connection, matching spec.md §8 scenarios 4
//! and 5 end-to-end through SQL text rather than direct Rust calls.

use cql_runtime::register_kv_blob_functions;
use rusqlite::Connection;

fn conn() -> Connection {
    let c = Connection::open_in_memory().unwrap();
    register_kv_blob_functions(&c).unwrap();
    c
}

#[test]
fn scenario_4_bcreatekey_and_bgetkey_round_trip_through_sql() {
    let c = conn();
    // KvType codes: String = 4, Int32 = 1 (see src/kv_blob.rs).
    let blob: Vec<u8> = c
        .query_row("SELECT bcreatekey(42, 'alice', 4, 7, 1)", [], |r| r.get(0))
        .unwrap();

    let record_type: i64 = c
        .query_row(
            "SELECT (substr(?, 1, 8) = x'000000000000002a')",
            [&blob],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(record_type, 1, "record_type header should carry 42 big-endian");

    let name: String = c.query_row("SELECT bgetkey(?, 0)", [&blob], |r| r.get(0)).unwrap();
    assert_eq!(name, "alice");

    let age: i64 = c.query_row("SELECT bgetkey(?, 1)", [&blob], |r| r.get(0)).unwrap();
    assert_eq!(age, 7);

    let missing: Option<i64> = c
        .query_row("SELECT bgetkey(?, 2)", [&blob], |r| r.get(0))
        .unwrap();
    assert_eq!(missing, None);
}

#[test]
fn scenario_5_bupdateval_deletes_a_field_through_sql() {
    let c = conn();
    let created: Vec<u8> = c
        .query_row(
            "SELECT bcreateval(1, 10, 'x', 4, 20, 5, 1)",
            [],
            |r| r.get(0),
        )
        .unwrap();

    let updated: Vec<u8> = c
        .query_row("SELECT bupdateval(?, 20, NULL, 1)", [&created], |r| r.get(0))
        .unwrap();

    let field10: String = c
        .query_row("SELECT bgetval(?, 10)", [&updated], |r| r.get(0))
        .unwrap();
    assert_eq!(field10, "x");

    let field20: Option<i64> = c
        .query_row("SELECT bgetval(?, 20)", [&updated], |r| r.get(0))
        .unwrap();
    assert_eq!(field20, None);
}

#[test]
fn malformed_arguments_yield_sql_null_not_an_error() {
    let c = conn();
    let result: Option<Vec<u8>> = c
        .query_row("SELECT bcreatekey(1, 'x', 99)", [], |r| r.get(0))
        .unwrap();
    assert!(result.is_none(), "unknown type code should produce SQL NULL");
}
