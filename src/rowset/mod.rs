//! The typed, contiguous result set ("rowset") representation: a fixed
//! shape ([`meta::Meta`]) plus a random-access sequence of rows sharing
//! that shape, reference-counted as one object.
//!
//! The original C runtime lays every row out as a single byte buffer
//! (non-reference columns first, reference columns in a trailing region,
//! tail padding zero-filled) so that row hash/equal reduce to a memcmp
//! over the prefix plus a pointer-typed compare loop over the suffix.
//! This crate keeps that prefix/suffix split conceptually (see
//! `Meta::scalar_slot`/`Meta::ref_slot`) but represents each row as two
//! plain `Vec`s — one of [`crate::cursor::ScalarValue`], one of
//! `Option<RefValue>` — rather than raw bytes at a computed offset, per
//! Design Note 9: "the contract is the layout, not the arithmetic."

mod meta;

pub use meta::Meta;

use std::rc::Rc;

use crate::cursor::{CoreType, ScalarValue};
use crate::refcount::Ref;
use crate::value::{ref_equal_opt, RefValue};

/// One row of a [`RowSet`]: the scalar prefix and the reference suffix,
/// stored separately but addressed through the same logical column index
/// via [`Meta::scalar_slot`]/[`Meta::ref_slot`].
#[derive(Debug, Clone)]
pub struct Row {
    scalars: Vec<ScalarValue>,
    refs: Vec<Option<RefValue>>,
}

impl Row {
    /// Builds a row directly from its scalar and reference columns.
    /// Used by the partitioner, which accumulates rows outside of a
    /// `RowSetBuilder` while a key's bucket is still being populated.
    pub(crate) fn new(scalars: Vec<ScalarValue>, refs: Vec<Option<RefValue>>) -> Row {
        Row { scalars, refs }
    }

    pub(crate) fn scalars(&self) -> &[ScalarValue] {
        &self.scalars
    }

    pub(crate) fn refs(&self) -> &[Option<RefValue>] {
        &self.refs
    }

    /// A row with every scalar column `Null` and every reference column
    /// nil, matching the "zero-initialized bytes" starting point the
    /// design describes for a freshly allocated row slot.
    fn zeroed(meta: &Meta) -> Row {
        let scalar_count = (0..meta.column_count())
            .filter(|&c| !meta.type_byte(c).core().is_reference())
            .count();
        let ref_count = meta.column_count() - scalar_count;
        Row {
            scalars: vec![ScalarValue::Null; scalar_count],
            refs: vec![None; ref_count],
        }
    }
}

/// A typed, contiguous, reference-counted sequence of rows of identical
/// shape. Created by [`RowSetBuilder`] (the streaming constructor,
/// `fetch_all` in the design) or [`RowSet::from_rows`]
/// (`results_from_data`); mutated only through the typed setters below.
#[derive(Debug)]
pub struct RowSet {
    meta: Rc<Meta>,
    rows: Vec<Row>,
}

impl RowSet {
    /// `results_from_data`: wraps pre-built rows under `meta` without any
    /// engine involvement. Every row must declare exactly `meta`'s scalar
    /// and reference column counts.
    pub fn from_rows(meta: Rc<Meta>, rows: Vec<Row>) -> Ref<RowSet> {
        for row in &rows {
            assert_eq!(row.scalars.len() + row.refs.len(), meta.column_count());
        }
        Ref::new(RowSet { meta, rows })
    }

    pub fn meta(&self) -> &Rc<Meta> {
        &self.meta
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn row(&self, row: usize) -> &Row {
        assert!(row < self.rows.len(), "row index out of range");
        &self.rows[row]
    }

    /// Asserts that column `col`'s core type matches `expected`, matching
    /// the design's "asserts that the core type of column col matches the
    /// requested type."
    fn check_type(&self, col: usize, expected: CoreType) {
        assert!(col < self.meta.column_count(), "column index out of range");
        let actual = self.meta.type_byte(col).core();
        assert_eq!(actual, expected, "column {col} type mismatch");
    }

    /// `true` iff column `col` of `row` is SQL NULL: the null flag for a
    /// nullable scalar, or `true` iff the stored reference is nil.
    pub fn is_null(&self, row: usize, col: usize) -> bool {
        let r = self.row(row);
        if self.meta.type_byte(col).core().is_reference() {
            r.refs[self.meta.ref_slot(col)].is_none()
        } else {
            r.scalars[self.meta.scalar_slot(col)].is_null()
        }
    }

    pub fn get_bool(&self, row: usize, col: usize) -> Option<bool> {
        self.check_type(col, CoreType::Bool);
        match self.row(row).scalars[self.meta.scalar_slot(col)] {
            ScalarValue::Bool(b) => Some(b),
            ScalarValue::Null => None,
            _ => unreachable!(),
        }
    }

    pub fn get_int32(&self, row: usize, col: usize) -> Option<i32> {
        self.check_type(col, CoreType::Int32);
        match self.row(row).scalars[self.meta.scalar_slot(col)] {
            ScalarValue::Int32(v) => Some(v),
            ScalarValue::Null => None,
            _ => unreachable!(),
        }
    }

    pub fn get_int64(&self, row: usize, col: usize) -> Option<i64> {
        self.check_type(col, CoreType::Int64);
        match self.row(row).scalars[self.meta.scalar_slot(col)] {
            ScalarValue::Int64(v) => Some(v),
            ScalarValue::Null => None,
            _ => unreachable!(),
        }
    }

    pub fn get_double(&self, row: usize, col: usize) -> Option<f64> {
        self.check_type(col, CoreType::Double);
        match self.row(row).scalars[self.meta.scalar_slot(col)] {
            ScalarValue::Double(v) => Some(v),
            ScalarValue::Null => None,
            _ => unreachable!(),
        }
    }

    pub fn get_string(&self, row: usize, col: usize) -> Option<Ref<crate::value::CqlString>> {
        self.check_type(col, CoreType::String);
        match &self.row(row).refs[self.meta.ref_slot(col)] {
            Some(RefValue::String(s)) => Some(s.clone()),
            None => None,
            _ => unreachable!(),
        }
    }

    pub fn get_blob(&self, row: usize, col: usize) -> Option<Ref<crate::value::CqlBlob>> {
        self.check_type(col, CoreType::Blob);
        match &self.row(row).refs[self.meta.ref_slot(col)] {
            Some(RefValue::Blob(b)) => Some(b.clone()),
            None => None,
            _ => unreachable!(),
        }
    }

    pub fn get_object(&self, row: usize, col: usize) -> Option<Ref<crate::value::CqlObject>> {
        self.check_type(col, CoreType::Object);
        match &self.row(row).refs[self.meta.ref_slot(col)] {
            Some(RefValue::Object(o)) => Some(o.clone()),
            None => None,
            _ => unreachable!(),
        }
    }

    // --- typed setters, for tests -------------------------------------

    pub fn set_bool(&mut self, row: usize, col: usize, value: Option<bool>) {
        self.check_type(col, CoreType::Bool);
        let slot = self.meta.scalar_slot(col);
        self.rows[row].scalars[slot] = value.map_or(ScalarValue::Null, ScalarValue::Bool);
    }

    pub fn set_int32(&mut self, row: usize, col: usize, value: Option<i32>) {
        self.check_type(col, CoreType::Int32);
        let slot = self.meta.scalar_slot(col);
        self.rows[row].scalars[slot] = value.map_or(ScalarValue::Null, ScalarValue::Int32);
    }

    pub fn set_int64(&mut self, row: usize, col: usize, value: Option<i64>) {
        self.check_type(col, CoreType::Int64);
        let slot = self.meta.scalar_slot(col);
        self.rows[row].scalars[slot] = value.map_or(ScalarValue::Null, ScalarValue::Int64);
    }

    pub fn set_double(&mut self, row: usize, col: usize, value: Option<f64>) {
        self.check_type(col, CoreType::Double);
        let slot = self.meta.scalar_slot(col);
        self.rows[row].scalars[slot] = value.map_or(ScalarValue::Null, ScalarValue::Double);
    }

    /// Reference setters release the prior value (by dropping it) before
    /// storing the new one, which is exactly retain-then-release-prior in
    /// this crate's `Rc`-backed model: the new `Option<Ref<_>>` already
    /// holds the caller's retain.
    pub fn set_string(&mut self, row: usize, col: usize, value: Option<Ref<crate::value::CqlString>>) {
        self.check_type(col, CoreType::String);
        let slot = self.meta.ref_slot(col);
        self.rows[row].refs[slot] = value.map(RefValue::String);
    }

    pub fn set_blob(&mut self, row: usize, col: usize, value: Option<Ref<crate::value::CqlBlob>>) {
        self.check_type(col, CoreType::Blob);
        let slot = self.meta.ref_slot(col);
        self.rows[row].refs[slot] = value.map(RefValue::Blob);
    }

    pub fn set_object(&mut self, row: usize, col: usize, value: Option<Ref<crate::value::CqlObject>>) {
        self.check_type(col, CoreType::Object);
        let slot = self.meta.ref_slot(col);
        self.rows[row].refs[slot] = value.map(RefValue::Object);
    }

    /// Two rows (of this rowset, compared by row index) are equal iff
    /// every scalar column is bitwise-equal and every reference column is
    /// `ref_equal`. Both rows must share this rowset's meta by
    /// construction (the single-shape contract), so only row indices are
    /// needed rather than a second rowset argument.
    pub fn row_equal(&self, a: usize, b: usize) -> bool {
        let ra = self.row(a);
        let rb = self.row(b);
        crate::hash::rows_equal(&ra.scalars, &ra.refs, &rb.scalars, &rb.refs)
    }

    /// Row hash: DJB2 over the scalar prefix's byte representation,
    /// combined with each reference column's hash in order, per §4.E.
    pub fn row_hash(&self, row: usize) -> u64 {
        let r = self.row(row);
        crate::hash::hash_row(&r.scalars, &r.refs)
    }

    /// "Same row" identity: compares only the meta's declared identity
    /// columns (falling back to full equality when none are declared).
    /// `a_set` and `b_set` must share the same meta (single-shape
    /// contract) — they may be the same rowset or two different ones.
    pub fn row_same(a_set: &RowSet, a: usize, b_set: &RowSet, b: usize) -> bool {
        assert!(Rc::ptr_eq(&a_set.meta, &b_set.meta), "same requires identical meta");
        match a_set.meta.identity_columns() {
            None => a_set.row_equal_cross(a, b_set, b),
            Some(cols) => cols.iter().all(|&col| {
                if a_set.meta.type_byte(col).core().is_reference() {
                    let slot = a_set.meta.ref_slot(col);
                    ref_equal_opt(&a_set.row(a).refs[slot], &b_set.row(b).refs[slot])
                } else {
                    let slot = a_set.meta.scalar_slot(col);
                    a_set.row(a).scalars[slot] == b_set.row(b).scalars[slot]
                }
            }),
        }
    }

    fn row_equal_cross(&self, a: usize, other: &RowSet, b: usize) -> bool {
        let ra = self.row(a);
        let rb = other.row(b);
        crate::hash::rows_equal(&ra.scalars, &ra.refs, &rb.scalars, &rb.refs)
    }

    /// Produces a new rowset containing rows `[from, from+count)`, each
    /// reference column retained once (an `Rc::clone`, which bumps
    /// `outstanding_refs`).
    pub fn slice(&self, from: usize, count: usize) -> Ref<RowSet> {
        assert!(from + count <= self.rows.len(), "slice out of range");
        let rows = self.rows[from..from + count].to_vec();
        RowSet::from_rows(self.meta.clone(), rows)
    }
}

/// Streaming builder used while stepping an engine statement: allocates a
/// zeroed row per step, hands the caller a mutable `Row` to multifetch
/// into, and on completion (or on error, via `discard`) hands over (or
/// tears down) the accumulated rows.
pub struct RowSetBuilder {
    meta: Rc<Meta>,
    rows: Vec<Row>,
}

impl RowSetBuilder {
    pub fn new(meta: Rc<Meta>) -> Self {
        RowSetBuilder {
            meta,
            rows: Vec::new(),
        }
    }

    /// Allocates the next zero-initialized row and returns it for the
    /// caller to multifetch into.
    pub fn push_row(&mut self) -> &mut Row {
        let row = Row::zeroed(&self.meta);
        self.rows.push(row);
        self.rows.last_mut().unwrap()
    }

    pub fn set_scalar(row: &mut Row, slot: usize, value: ScalarValue) {
        row.scalars[slot] = value;
    }

    pub fn set_ref(row: &mut Row, slot: usize, value: Option<RefValue>) {
        row.refs[slot] = value;
    }

    /// Hands the accumulated rows to a new rowset. On the error path the
    /// caller simply drops the builder instead: every materialized row's
    /// references are released as each `Row` (and its `Option<RefValue>`
    /// cells) drops, matching "on error, every materialized row's
    /// references are released and the buffer is freed."
    pub fn finish(self) -> Ref<RowSet> {
        RowSet::from_rows(self.meta, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::TypeByte;
    use crate::value::CqlString;

    fn meta() -> Rc<Meta> {
        Rc::new(Meta::new(
            vec![
                ("flag".into(), TypeByte::new(CoreType::Bool, false, false)),
                ("n".into(), TypeByte::new(CoreType::Int32, true, false)),
                ("name".into(), TypeByte::new(CoreType::String, false, false)),
                ("payload".into(), TypeByte::new(CoreType::Blob, false, false)),
            ],
            None,
        ))
    }

    fn four_rows() -> Ref<RowSet> {
        let m = meta();
        let mut b = RowSetBuilder::new(m.clone());
        for i in 0..4i32 {
            let row = b.push_row();
            if i == 3 {
                // row 3 has nulls in every nullable column
                RowSetBuilder::set_scalar(row, 0, ScalarValue::Null);
                RowSetBuilder::set_ref(row, 0, None);
                RowSetBuilder::set_ref(row, 1, None);
            } else {
                RowSetBuilder::set_scalar(row, 0, ScalarValue::Bool(i % 2 == 0));
                RowSetBuilder::set_ref(
                    row,
                    0,
                    Some(RefValue::String(CqlString::new(format!("row{i}")))),
                );
                RowSetBuilder::set_ref(
                    row,
                    1,
                    Some(RefValue::Blob(crate::value::CqlBlob::new(vec![i as u8]))),
                );
            }
            RowSetBuilder::set_scalar(row, 1, ScalarValue::Int32(i));
        }
        b.finish()
    }

    #[test]
    fn scenario_1_build_read_nulls_and_slice() {
        let rs = four_rows();
        assert_eq!(rs.count(), 4);
        assert!(rs.is_null(3, 0));
        assert!(rs.is_null(3, 2));
        assert!(rs.is_null(3, 3));
        assert_eq!(rs.get_int32(3, 1), Some(3));

        let sliced = rs.slice(1, 2);
        assert_eq!(sliced.count(), 2);
        assert!(sliced.row_equal(0, 0));
        assert_eq!(sliced.get_int32(0, 1), rs.get_int32(1, 1));
        assert_eq!(
            sliced.get_string(0, 2).unwrap().as_str(),
            rs.get_string(1, 2).unwrap().as_str()
        );
    }

    #[test]
    fn row_equal_implies_row_hash_equal() {
        let rs = four_rows();
        let dup = rs.slice(0, 4);
        for i in 0..4 {
            assert!(rs.row_equal(i, i));
            assert_eq!(rs.row_hash(i), dup.row_hash(i));
        }
    }

    #[test]
    fn concatenated_slices_row_equal_the_source() {
        let rs = four_rows();
        let a = rs.slice(0, 2);
        let b = rs.slice(2, 2);
        let check = |slice: &Ref<RowSet>, slice_row: usize, src_row: usize| {
            let s = slice.row(slice_row);
            let r = rs.row(src_row);
            assert!(crate::hash::rows_equal(&s.scalars, &s.refs, &r.scalars, &r.refs));
        };
        check(&a, 0, 0);
        check(&a, 1, 1);
        check(&b, 0, 2);
        check(&b, 1, 3);
    }

    #[test]
    #[should_panic]
    fn getter_type_mismatch_panics() {
        let rs = four_rows();
        rs.get_int64(0, 1);
    }

    #[test]
    fn row_same_uses_identity_columns() {
        let m = Rc::new(Meta::new(
            vec![
                ("id".into(), TypeByte::new(CoreType::Int32, true, false)),
                ("v".into(), TypeByte::new(CoreType::Int32, true, false)),
            ],
            Some(vec![0]),
        ));
        let mut b = RowSetBuilder::new(m.clone());
        {
            let row = b.push_row();
            RowSetBuilder::set_scalar(row, 0, ScalarValue::Int32(1));
            RowSetBuilder::set_scalar(row, 1, ScalarValue::Int32(100));
        }
        {
            let row = b.push_row();
            RowSetBuilder::set_scalar(row, 0, ScalarValue::Int32(1));
            RowSetBuilder::set_scalar(row, 1, ScalarValue::Int32(200));
        }
        let rs = b.finish();
        assert!(RowSet::row_same(&rs, 0, &rs, 1));
        assert!(!rs.row_equal(0, 1));
    }
}
