//! Thin binding to the embedded `rusqlite` engine: statement prepare/exec
//! and registration of the key/value blob codec as scalar SQL functions.
//! Grounded on `cql_exec`/`cql_prepare`/`cql_best_error` in
//! `original_source/sources/cqlrt_common.c`; `throw_status` (in
//! `crate::error`) is this crate's `cql_best_error`.

use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, Statement};

use crate::error::{throw_status, Result};
use crate::kv_blob::{self, KvType, KvValue};
use crate::recreate::DdlExecutor;

/// Runs one statement with no result rows expected (`cql_exec`).
pub fn exec(conn: &Connection, sql: &str) -> Result<()> {
    conn.execute(sql, []).map(|_| ()).map_err(|e| throw_status("exec", e))
}

/// Runs a `;`-separated batch of statements in one call (what generated
/// code uses for DDL groups), delegating to `rusqlite`'s own batch runner
/// rather than hand-splitting.
pub fn exec_batch(conn: &Connection, sql: &str) -> Result<()> {
    conn.execute_batch(sql).map_err(|e| throw_status("exec_batch", e))
}

/// Prepares `sql` against `conn` (`cql_prepare`, minus the "finalize a
/// statement the caller already held" step: that's just letting the old
/// `Statement` drop in this binding).
pub fn prepare<'c>(conn: &'c Connection, sql: &str) -> Result<Statement<'c>> {
    conn.prepare(sql).map_err(|e| throw_status("prepare", e))
}

impl DdlExecutor for Connection {
    fn exec(&mut self, sql: &str) -> Result<()> {
        exec(self, sql)
    }
}

fn kv_value_from_sql(v: ValueRef, declared: KvType) -> Option<KvValue> {
    match (declared, v) {
        (KvType::Bool, ValueRef::Integer(i)) => Some(KvValue::Bool(i != 0)),
        (KvType::Int32, ValueRef::Integer(i)) => Some(KvValue::Int32(i as i32)),
        (KvType::Int64, ValueRef::Integer(i)) => Some(KvValue::Int64(i)),
        (KvType::Double, ValueRef::Real(d)) => Some(KvValue::Double(d)),
        (KvType::String, ValueRef::Text(t)) => Some(KvValue::String(String::from_utf8_lossy(t).into_owned())),
        (KvType::Blob, ValueRef::Blob(b)) => Some(KvValue::Blob(b.to_vec())),
        _ => None,
    }
}

fn kv_value_to_sql(v: Option<KvValue>) -> Value {
    match v {
        None => Value::Null,
        Some(KvValue::Bool(b)) => Value::Integer(b as i64),
        Some(KvValue::Int32(i)) => Value::Integer(i64::from(i)),
        Some(KvValue::Int64(i)) => Value::Integer(i),
        Some(KvValue::Double(d)) => Value::Real(d),
        Some(KvValue::String(s)) => Value::Text(s),
        Some(KvValue::Blob(b)) => Value::Blob(b),
    }
}

fn kv_type_code_arg(ctx: &rusqlite::functions::Context<'_>, i: usize) -> rusqlite::Result<Option<KvType>> {
    Ok(KvType::from_code(ctx.get::<i64>(i)? as u8))
}

/// Registers `bcreatekey`/`bgetkey`/`bgetkey_type`/`bupdatekey` and
/// `bcreateval`/`bgetval`/`bgetval_type`/`bupdateval` as scalar SQL
/// functions against `conn`, per spec.md §4.G. Each function's argument
/// convention mirrors the pure codec in [`crate::kv_blob`]: type
/// arguments are the `KvType` code an equivalent `bgetkey_type` call
/// would return.
pub fn register_kv_blob_functions(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("bcreatekey", -1, flags, |ctx| {
        let n = ctx.len();
        if n < 1 || (n - 1) % 2 != 0 {
            return Ok(Value::Null);
        }
        let record_type = ctx.get::<i64>(0)? as u64;
        let mut columns = Vec::new();
        let mut i = 1;
        while i < n {
            let Some(declared) = kv_type_code_arg(ctx, i + 1)? else {
                return Ok(Value::Null);
            };
            let Some(value) = kv_value_from_sql(ctx.get_raw(i), declared) else {
                return Ok(Value::Null);
            };
            columns.push((declared, value));
            i += 2;
        }
        Ok(kv_blob::bcreatekey(record_type, &columns)
            .map(Value::Blob)
            .unwrap_or(Value::Null))
    })?;

    conn.create_scalar_function("bgetkey", 2, flags, |ctx| {
        let blob = ctx.get::<Vec<u8>>(0)?;
        let i = ctx.get::<i64>(1)? as usize;
        Ok(kv_value_to_sql(kv_blob::bgetkey(&blob, i)))
    })?;

    conn.create_scalar_function("bgetkey_type", 2, flags, |ctx| {
        let blob = ctx.get::<Vec<u8>>(0)?;
        let i = ctx.get::<i64>(1)? as usize;
        Ok(kv_blob::bgetkey_type(&blob, i).map_or(Value::Null, |t| Value::Integer(i64::from(t.code()))))
    })?;

    conn.create_scalar_function("bupdatekey", -1, flags, |ctx| {
        let n = ctx.len();
        if n < 1 || (n - 1) % 3 != 0 {
            return Ok(Value::Null);
        }
        let blob = ctx.get::<Vec<u8>>(0)?;
        let mut updates = Vec::new();
        let mut i = 1;
        while i < n {
            let col = ctx.get::<i64>(i)? as usize;
            let Some(declared) = kv_type_code_arg(ctx, i + 2)? else {
                return Ok(Value::Null);
            };
            let Some(value) = kv_value_from_sql(ctx.get_raw(i + 1), declared) else {
                return Ok(Value::Null);
            };
            updates.push((col, value));
            i += 3;
        }
        Ok(kv_blob::bupdatekey(&blob, &updates)
            .map(Value::Blob)
            .unwrap_or(Value::Null))
    })?;

    conn.create_scalar_function("bcreateval", -1, flags, |ctx| {
        let n = ctx.len();
        if n < 1 || (n - 1) % 3 != 0 {
            return Ok(Value::Null);
        }
        let record_type = ctx.get::<i64>(0)? as u64;
        let mut fields = Vec::new();
        let mut i = 1;
        while i < n {
            let field_id = ctx.get::<i64>(i)? as u64;
            let Some(declared) = kv_type_code_arg(ctx, i + 2)? else {
                return Ok(Value::Null);
            };
            let raw = ctx.get_raw(i + 1);
            let value = if matches!(raw, ValueRef::Null) {
                None
            } else {
                match kv_value_from_sql(raw, declared) {
                    Some(v) => Some(v),
                    None => return Ok(Value::Null),
                }
            };
            fields.push((field_id, declared, value));
            i += 3;
        }
        Ok(kv_blob::bcreateval(record_type, &fields)
            .map(Value::Blob)
            .unwrap_or(Value::Null))
    })?;

    conn.create_scalar_function("bgetval", 2, flags, |ctx| {
        let blob = ctx.get::<Vec<u8>>(0)?;
        let field_id = ctx.get::<i64>(1)? as u64;
        Ok(kv_value_to_sql(kv_blob::bgetval(&blob, field_id)))
    })?;

    conn.create_scalar_function("bgetval_type", 2, flags, |ctx| {
        let blob = ctx.get::<Vec<u8>>(0)?;
        let field_id = ctx.get::<i64>(1)? as u64;
        Ok(kv_blob::bgetval_type(&blob, field_id).map_or(Value::Null, |t| Value::Integer(i64::from(t.code()))))
    })?;

    conn.create_scalar_function("bupdateval", -1, flags, |ctx| {
        let n = ctx.len();
        if n < 1 || (n - 1) % 3 != 0 {
            return Ok(Value::Null);
        }
        let blob = ctx.get::<Vec<u8>>(0)?;
        let mut updates = Vec::new();
        let mut i = 1;
        while i < n {
            let field_id = ctx.get::<i64>(i)? as u64;
            let Some(declared) = kv_type_code_arg(ctx, i + 2)? else {
                return Ok(Value::Null);
            };
            let raw = ctx.get_raw(i + 1);
            let value = if matches!(raw, ValueRef::Null) {
                None
            } else {
                match kv_value_from_sql(raw, declared) {
                    Some(v) => Some(v),
                    None => return Ok(Value::Null),
                }
            };
            updates.push((field_id, declared, value));
            i += 3;
        }
        Ok(kv_blob::bupdateval(&blob, &updates)
            .map(Value::Blob)
            .unwrap_or(Value::Null))
    })?;

    Ok(())
}
