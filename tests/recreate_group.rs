//! Drives `recreate_group` against a real `rusqlite::Connection` rather
//! than the in-memory `Recorder` used by `src/recreate.rs`'s unit tests,
//! matching scenario 6: after recreating, `sqlite_master` reports both
//! tables and the index.

use cql_runtime::recreate_group;
use rusqlite::Connection;

fn table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |r| r.get(0))
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

fn index_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='index' ORDER BY name")
        .unwrap();
    stmt.query_map([], |r| r.get(0))
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

#[test]
fn scenario_6_recreate_group_against_a_live_connection() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut conn = Connection::open_in_memory().unwrap();

    let tables = [
        "CREATE TABLE a(x INTEGER PRIMARY KEY)",
        "CREATE TABLE b(x INTEGER REFERENCES a(x))",
    ];
    let indices = ["CREATE INDEX ai ON a(x)"];

    let result = recreate_group(&mut conn, &tables, &indices, &[]).unwrap();
    assert!(!result, "recreate_group always reports 'recreated, not rebuilt'");

    assert_eq!(table_names(&conn), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(index_names(&conn), vec!["ai".to_string()]);
}

#[test]
fn recreate_group_is_idempotent_when_run_twice() {
    let mut conn = Connection::open_in_memory().unwrap();
    let tables = ["CREATE TABLE a(x INTEGER PRIMARY KEY)"];
    let indices = ["CREATE INDEX ai ON a(x)"];

    recreate_group(&mut conn, &tables, &indices, &[]).unwrap();
    recreate_group(&mut conn, &tables, &indices, &[]).unwrap();

    assert_eq!(table_names(&conn), vec!["a".to_string()]);
    assert_eq!(index_names(&conn), vec!["ai".to_string()]);
}

#[test]
fn deletes_run_before_drops_and_recreates() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE legacy_view_backing(x INTEGER);
         CREATE TABLE a(x INTEGER PRIMARY KEY);",
    )
    .unwrap();

    let tables = ["CREATE TABLE a(x INTEGER PRIMARY KEY)"];
    let deletes = ["DROP TABLE IF EXISTS legacy_view_backing"];

    recreate_group(&mut conn, &tables, &[], &deletes).unwrap();

    assert_eq!(table_names(&conn), vec!["a".to_string()]);
}
