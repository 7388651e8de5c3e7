//! Groups rows by a key cursor and extracts per-key child rowsets, per
//! spec.md §4.I. Grounded on `cql_partition_cursor`/`cql_extract_partition`
//! in `original_source/sources/cqlrt_common.c`: a hash table keyed by the
//! key-cursor's bytes, whose payload is either a growable buffer of
//! appended value rows (before first extract) or a materialized rowset
//! (after), with a low-bit tag distinguishing the two states.
//!
//! This is what powers parent/child joins: stream the child query through
//! [`Partitioner::partition_cursor`] keyed on the parent's join columns,
//! then pair each parent row with [`Partitioner::extract_partition`] to
//! get that parent row's nested child rowset.

use std::rc::Rc;

use crate::cursor::ScalarValue;
use crate::hash::rows_equal;
use crate::refcount::Ref;
use crate::rowset::{Meta, Row, RowSet, RowSetBuilder};
use crate::value::RefValue;

enum Entry {
    Buffering(Vec<Row>),
    Extracted(Ref<RowSet>),
}

/// Constructed empty via [`Partitioner::new`]. `partition_cursor` appends
/// values under their key's bucket; once any `extract_partition` call
/// has happened the partition is frozen and further `partition_cursor`
/// calls panic (a contract violation, per spec.md §4.I: "after the first
/// extract_partition, further partition_cursor calls are rejected").
pub struct Partitioner {
    val_meta: Option<Rc<Meta>>,
    key_shape: Option<(usize, usize)>,
    // Linear-scan buckets keyed by key-row value equality. A real
    // `cql_partition` hashes first and only falls back to comparison on
    // collision; this crate keeps the same externally observable
    // behavior (lookup by key-row equality) without reimplementing a
    // second hash table alongside `ClosedHashMap` for a structure this
    // small in practice (one bucket per distinct join key).
    buckets: Vec<(Row, Entry)>,
    extracting: bool,
    empty_result: Option<Ref<RowSet>>,
}

impl Partitioner {
    pub fn new() -> Self {
        Partitioner {
            val_meta: None,
            key_shape: None,
            buckets: Vec::new(),
            extracting: false,
            empty_result: None,
        }
    }

    fn find_bucket(&self, key_scalars: &[ScalarValue], key_refs: &[Option<RefValue>]) -> Option<usize> {
        self.buckets
            .iter()
            .position(|(k, _)| rows_equal(k.scalars(), k.refs(), key_scalars, key_refs))
    }

    /// Appends one `(key, value)` pair. `val_meta` describes the value
    /// row's shape and is recorded on the first call; subsequent calls
    /// assert the same meta (pointer-equal, the rowset single-shape
    /// contract) and the same key arity.
    pub fn partition_cursor(
        &mut self,
        key_scalars: &[ScalarValue],
        key_refs: &[Option<RefValue>],
        val_meta: &Rc<Meta>,
        val_scalars: &[ScalarValue],
        val_refs: &[Option<RefValue>],
    ) {
        assert!(
            !self.extracting,
            "partition_cursor called after extract_partition began"
        );

        match (&self.key_shape, &self.val_meta) {
            (None, None) => {
                self.key_shape = Some((key_scalars.len(), key_refs.len()));
                self.val_meta = Some(val_meta.clone());
            }
            (Some(shape), Some(meta)) => {
                assert_eq!(*shape, (key_scalars.len(), key_refs.len()), "key shape changed mid-partition");
                assert!(Rc::ptr_eq(meta, val_meta), "value meta changed mid-partition");
            }
            _ => unreachable!("key_shape and val_meta are always set together"),
        }

        let value_row = Row::new(val_scalars.to_vec(), val_refs.to_vec());
        match self.find_bucket(key_scalars, key_refs) {
            Some(i) => match &mut self.buckets[i].1 {
                Entry::Buffering(rows) => rows.push(value_row),
                Entry::Extracted(_) => unreachable!("frozen once extracting is true"),
            },
            None => {
                let key_row = Row::new(key_scalars.to_vec(), key_refs.to_vec());
                self.buckets.push((key_row, Entry::Buffering(vec![value_row])));
            }
        }
    }

    /// Materializes (on first call for this key) or returns the cached
    /// rowset of values submitted under `key`, in the order submitted.
    /// A key never seen by `partition_cursor` gets a shared, lazily
    /// built empty rowset — the same pointer on every call.
    pub fn extract_partition(&mut self, key_scalars: &[ScalarValue], key_refs: &[Option<RefValue>]) -> Ref<RowSet> {
        self.extracting = true;

        if let Some(i) = self.find_bucket(key_scalars, key_refs) {
            if let Entry::Extracted(rs) = &self.buckets[i].1 {
                return rs.clone();
            }
            let meta = self
                .val_meta
                .clone()
                .expect("value meta recorded by the first partition_cursor call");
            let rows = match std::mem::replace(&mut self.buckets[i].1, Entry::Extracted(empty_rowset(meta.clone()))) {
                Entry::Buffering(rows) => rows,
                Entry::Extracted(_) => unreachable!(),
            };
            let rs = RowSet::from_rows(meta, rows);
            self.buckets[i].1 = Entry::Extracted(rs.clone());
            return rs;
        }

        if let Some(rs) = &self.empty_result {
            return rs.clone();
        }
        let meta = self.val_meta.clone().unwrap_or_else(|| Rc::new(Meta::new(Vec::new(), None)));
        let rs = empty_rowset(meta);
        self.empty_result = Some(rs.clone());
        rs
    }
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_rowset(meta: Rc<Meta>) -> Ref<RowSet> {
    RowSetBuilder::new(meta).finish()
}
