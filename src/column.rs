//! Column codec: moves typed values between an engine row/statement and
//! this crate's row representation, per spec.md §4.D. Grounded on
//! `cql_multifetch`/`cql_multifetch_meta`/`cql_multibind` in
//! `original_source/sources/cqlrt_common.c`, which dispatch column access
//! by a per-column type vector the same way [`multifetch`]/[`multibind`]
//! do here.

use rusqlite::types::ValueRef;
use rusqlite::{Row, Statement};

use crate::cursor::{CoreType, ScalarValue, TypeByte};
use crate::error::{throw_status, Result};
use crate::value::{CqlBlob, CqlString, RefValue};

fn fetch_scalar(row: &Row, col: usize, core: CoreType) -> Result<ScalarValue> {
    let v = row
        .get_ref(col)
        .map_err(|e| throw_status("multifetch", e))?;
    Ok(match (core, v) {
        (_, ValueRef::Null) => ScalarValue::Null,
        (CoreType::Bool, ValueRef::Integer(i)) => ScalarValue::Bool(i != 0),
        (CoreType::Int32, ValueRef::Integer(i)) => ScalarValue::Int32(i as i32),
        (CoreType::Int64, ValueRef::Integer(i)) => ScalarValue::Int64(i),
        (CoreType::Double, ValueRef::Real(d)) => ScalarValue::Double(d),
        (core, v) => panic!("column {col} declared as {core:?} but engine returned {v:?}"),
    })
}

fn fetch_ref(row: &Row, col: usize, core: CoreType) -> Result<Option<RefValue>> {
    let v = row
        .get_ref(col)
        .map_err(|e| throw_status("multifetch", e))?;
    Ok(match (core, v) {
        (_, ValueRef::Null) => None,
        (CoreType::String, ValueRef::Text(bytes)) => Some(RefValue::String(CqlString::new(
            String::from_utf8_lossy(bytes).into_owned(),
        ))),
        (CoreType::Blob, ValueRef::Blob(bytes)) => Some(RefValue::Blob(CqlBlob::new(bytes.to_vec()))),
        (core, v) => panic!("column {col} declared as {core:?} but engine returned {v:?}"),
    })
}

/// Reads every column of the statement's current row into a fresh
/// scalar/reference pair of vectors, dispatching per `types`. `predicate`,
/// when given, has one entry per column; a `false` entry skips reading
/// that column but its destination slot is still consumed (left at its
/// zero value), matching "absent entries are skipped; their argument
/// storage is still consumed."
pub fn multifetch(
    row: &Row,
    types: &[TypeByte],
    predicate: Option<&[bool]>,
) -> Result<(Vec<ScalarValue>, Vec<Option<RefValue>>)> {
    if let Some(p) = predicate {
        assert_eq!(p.len(), types.len(), "predicate length must match column count");
    }

    let scalar_count = types.iter().filter(|t| !t.core().is_reference()).count();
    let ref_count = types.len() - scalar_count;
    let mut scalars = vec![ScalarValue::Null; scalar_count];
    let mut refs = vec![None; ref_count];

    let mut scalar_slot = 0;
    let mut ref_slot = 0;
    for (col, t) in types.iter().enumerate() {
        let participates = predicate.map_or(true, |p| p[col]);
        if t.core().is_reference() {
            if participates {
                refs[ref_slot] = fetch_ref(row, col, t.core())?;
            }
            ref_slot += 1;
        } else {
            if participates {
                scalars[scalar_slot] = fetch_scalar(row, col, t.core())?;
            }
            scalar_slot += 1;
        }
    }
    Ok((scalars, refs))
}

fn bind_scalar(stmt: &mut Statement, one_based: usize, value: ScalarValue) -> Result<()> {
    let r = match value {
        ScalarValue::Null => stmt.raw_bind_parameter(one_based, rusqlite::types::Null),
        ScalarValue::Bool(b) => stmt.raw_bind_parameter(one_based, b),
        ScalarValue::Int32(i) => stmt.raw_bind_parameter(one_based, i),
        ScalarValue::Int64(i) => stmt.raw_bind_parameter(one_based, i),
        ScalarValue::Double(d) => stmt.raw_bind_parameter(one_based, d),
    };
    r.map_err(|e| throw_status("multibind", e))
}

fn bind_ref(stmt: &mut Statement, one_based: usize, core: CoreType, value: &Option<RefValue>) -> Result<()> {
    let r = match (core, value) {
        (_, None) => stmt.raw_bind_parameter(one_based, rusqlite::types::Null),
        (CoreType::String, Some(RefValue::String(s))) => stmt.raw_bind_parameter(one_based, s.as_str()),
        (CoreType::Blob, Some(RefValue::Blob(b))) => stmt.raw_bind_parameter(one_based, b.as_bytes()),
        (core, _) => panic!("bind_ref called with non-reference-compatible core type {core:?}"),
    };
    r.map_err(|e| throw_status("multibind", e))
}

/// Binds every parameter of `stmt` from `scalars`/`refs`, dispatching per
/// `types` (1-based SQL parameter positions follow `types`' declaration
/// order). `predicate` behaves as in [`multifetch`].
pub fn multibind(
    stmt: &mut Statement,
    types: &[TypeByte],
    scalars: &[ScalarValue],
    refs: &[Option<RefValue>],
    predicate: Option<&[bool]>,
) -> Result<()> {
    if let Some(p) = predicate {
        assert_eq!(p.len(), types.len(), "predicate length must match column count");
    }

    let mut scalar_slot = 0;
    let mut ref_slot = 0;
    for (col, t) in types.iter().enumerate() {
        let participates = predicate.map_or(true, |p| p[col]);
        if t.core().is_reference() {
            let value = &refs[ref_slot];
            ref_slot += 1;
            if participates {
                bind_ref(stmt, col + 1, t.core(), value)?;
            }
        } else {
            let value = scalars[scalar_slot];
            scalar_slot += 1;
            if participates {
                bind_scalar(stmt, col + 1, value)?;
            }
        }
    }
    Ok(())
}
