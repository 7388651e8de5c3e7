//! The boxed any-value type: a fixed-size tagged record holding any
//! scalar or reference value, per spec.md §3/§4.J. Generated code uses
//! this wherever a column's static type is not known until runtime (e.g.
//! a dynamically typed out-parameter).

use crate::cursor::CoreType;
use crate::refcount::Ref;
use crate::value::{CqlBlob, CqlObject, CqlString};

/// A box is always non-nil after construction: a box *of* SQL `NULL` is
/// represented by `CqlBox::null()`, never by the absence of a `Box` itself.
#[derive(Debug, Clone)]
pub enum CqlBox {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(Ref<CqlString>),
    Blob(Ref<CqlBlob>),
    Object(Ref<CqlObject>),
}

impl CqlBox {
    pub fn null() -> Self {
        CqlBox::Null
    }

    /// Boxes an optional scalar: `None` produces [`CqlBox::Null`], matching
    /// "creating a box from a null nullable stores Null."
    pub fn from_bool(v: Option<bool>) -> Self {
        v.map_or(CqlBox::Null, CqlBox::Bool)
    }

    pub fn from_int32(v: Option<i32>) -> Self {
        v.map_or(CqlBox::Null, CqlBox::Int32)
    }

    pub fn from_int64(v: Option<i64>) -> Self {
        v.map_or(CqlBox::Null, CqlBox::Int64)
    }

    pub fn from_double(v: Option<f64>) -> Self {
        v.map_or(CqlBox::Null, CqlBox::Double)
    }

    pub fn from_string(v: Option<Ref<CqlString>>) -> Self {
        v.map_or(CqlBox::Null, CqlBox::String)
    }

    pub fn from_blob(v: Option<Ref<CqlBlob>>) -> Self {
        v.map_or(CqlBox::Null, CqlBox::Blob)
    }

    pub fn from_object(v: Option<Ref<CqlObject>>) -> Self {
        v.map_or(CqlBox::Null, CqlBox::Object)
    }

    /// `Null` for a nil box (there is no such thing — every `Box` is a
    /// valid value — but a freshly constructed `CqlBox::Null` reports
    /// `CoreType::Null`, matching "`box_get_type` returns `Null` for a
    /// nil box").
    pub fn get_type(&self) -> CoreType {
        match self {
            CqlBox::Null => CoreType::Null,
            CqlBox::Bool(_) => CoreType::Bool,
            CqlBox::Int32(_) => CoreType::Int32,
            CqlBox::Int64(_) => CoreType::Int64,
            CqlBox::Double(_) => CoreType::Double,
            CqlBox::String(_) => CoreType::String,
            CqlBox::Blob(_) => CoreType::Blob,
            CqlBox::Object(_) => CoreType::Object,
        }
    }

    /// Unboxing with the wrong requested type returns `None` for
    /// nullable primitives (or `nil`, i.e. `None`, for references) rather
    /// than panicking: the box is a dynamically-typed value by design.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CqlBox::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int32(&self) -> Option<i32> {
        match self {
            CqlBox::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int64(&self) -> Option<i64> {
        match self {
            CqlBox::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            CqlBox::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<Ref<CqlString>> {
        match self {
            CqlBox::String(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<Ref<CqlBlob>> {
        match self {
            CqlBox::Blob(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<Ref<CqlObject>> {
        match self {
            CqlBox::Object(v) => Some(v.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_box_reports_null_type() {
        assert_eq!(CqlBox::null().get_type(), CoreType::Null);
        assert_eq!(CqlBox::from_int32(None).get_type(), CoreType::Null);
    }

    #[test]
    fn unboxing_wrong_type_returns_none() {
        let b = CqlBox::Int32(7);
        assert_eq!(b.as_int32(), Some(7));
        assert_eq!(b.as_int64(), None);
        assert_eq!(b.as_string(), None);
    }

    #[test]
    fn boxing_a_present_value_round_trips() {
        let b = CqlBox::from_string(Some(CqlString::new("hi")));
        assert_eq!(b.get_type(), CoreType::String);
        assert_eq!(b.as_string().unwrap().as_str(), "hi");
    }
}
