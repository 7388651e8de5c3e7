//! Scalar value types: [`CqlString`], [`CqlBlob`], and [`CqlObject`], plus
//! [`RefValue`], the type-erased union of every kind of reference the
//! runtime passes around (used by row reference columns, the box, and
//! container values).

mod blob;
mod object;
mod string;

pub use blob::CqlBlob;
pub use object::CqlObject;
pub use string::CqlString;

use crate::refcount::{Ref, RefKind};

/// A type-erased reference to any of the runtime's heap-allocated kinds.
/// This is the "uniform reference type" from the design: code that needs
/// to retain/release/compare a column generically (the rowset's
/// reference-suffix teardown, the box, dictionary values) works through
/// this enum instead of through one concrete type.
#[derive(Debug, Clone)]
pub enum RefValue {
    String(Ref<CqlString>),
    Blob(Ref<CqlBlob>),
    Object(Ref<CqlObject>),
    ResultSet(Ref<crate::rowset::RowSet>),
}

impl RefValue {
    pub fn kind(&self) -> RefKind {
        match self {
            RefValue::String(_) => RefKind::String,
            RefValue::Blob(_) => RefKind::Blob,
            RefValue::Object(_) => RefKind::Object,
            RefValue::ResultSet(_) => RefKind::ResultSet,
        }
    }
}

/// Reference equality: two references of the same kind are equal if
/// pointer-equal; otherwise dispatch by kind to the kind's equality
/// function. Equality is only defined for `String` and `Blob` — generic
/// objects and result sets compare by identity alone.
pub fn ref_equal(a: &RefValue, b: &RefValue) -> bool {
    match (a, b) {
        (RefValue::String(a), RefValue::String(b)) => {
            Ref::ptr_eq(a, b) || string::string_equal(Some(a), Some(b))
        }
        (RefValue::Blob(a), RefValue::Blob(b)) => {
            Ref::ptr_eq(a, b) || blob::blob_equal(Some(a), Some(b))
        }
        (RefValue::Object(a), RefValue::Object(b)) => Ref::ptr_eq(a, b),
        (RefValue::ResultSet(a), RefValue::ResultSet(b)) => Ref::ptr_eq(a, b),
        _ => false,
    }
}

/// Reference equality over optional (nilable) references. `ref_equal(nil,
/// nil) = true`; either-nil-but-not-both is `false`.
pub fn ref_equal_opt(a: &Option<RefValue>, b: &Option<RefValue>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => ref_equal(a, b),
        _ => false,
    }
}

/// Dispatches hashing by kind. Generic objects and result sets are not
/// hashable in the original design; this runtime falls back to hashing
/// their allocation address so they can still participate in a
/// metadata-driven row hash without special-casing every caller (hash
/// collisions across distinct objects are acceptable, equality never
/// claims they are equal).
pub fn ref_hash(v: &RefValue) -> u64 {
    match v {
        RefValue::String(s) => s.hash(),
        RefValue::Blob(b) => b.hash(),
        RefValue::Object(o) => ptr_hash(o),
        RefValue::ResultSet(r) => ptr_hash(r),
    }
}

fn ptr_hash<T: ?Sized>(r: &Ref<T>) -> u64 {
    crate::hash::djb2(&Ref::addr(r).to_le_bytes())
}
