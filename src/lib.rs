//! `cql-runtime` is an embeddable runtime for generated SQL glue code: a
//! ref-counted value model, a dynamic cursor descriptor, a typed rowset
//! representation, versioned cursor/key/value blob codecs, a handful of
//! hand-rolled containers, a row partitioner for parent/child joins, and a
//! schema recreate-group helper, all bound to an embedded `rusqlite`
//! connection.

mod boxed;
mod containers;
mod cursor;
mod error;
mod format;
mod hash;
mod kv_blob;
mod partition;
mod recreate;
mod refcount;
mod rowset;
mod value;

#[cfg(feature = "engine")]
mod column;
#[cfg(feature = "engine")]
mod engine;

pub mod blob_codec;

pub use self::{
    boxed::CqlBox,
    containers::{BlobDictionary, BlobList, Facets, LongDictionary, LongList, ObjectDictionary, ObjectList, RealDictionary, RealList, StringDictionary, StringList},
    cursor::{CoreType, DynamicCursor, ScalarValue, TypeByte},
    error::{DecodeError, Error, Result},
    format::{cursor_diff_col, cursor_diff_index, cursor_diff_val, cursor_format, ColumnEncoder},
    kv_blob::{bcreatekey, bcreateval, bgetkey, bgetkey_type, bgetval, bgetval_type, bupdatekey, bupdateval, KvType, KvValue},
    partition::Partitioner,
    recreate::{recreate_group, recreate_group_from_sql_text, split_statements, DdlExecutor},
    refcount::{outstanding_refs, Ref, RefKind},
    rowset::{Meta, Row, RowSet, RowSetBuilder},
    value::{ref_equal, ref_equal_opt, ref_hash, CqlBlob, CqlObject, CqlString, RefValue},
};

#[cfg(feature = "engine")]
pub use self::{
    column::{multibind, multifetch},
    engine::{exec, exec_batch, prepare, register_kv_blob_functions},
};
