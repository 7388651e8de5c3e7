//! The single DJB2-variant hash family shared by strings, blobs, row
//! prefixes, and the partitioner's key-cursor hash. Grounded on
//! `cql_hash_buffer` in `cqlrt_common.c`, which is the one routine behind
//! `cql_row_hash`, `cql_key_cursor_hash`, and the scalar string/blob
//! hashers.

/// Stable 64-bit DJB2 hash over an arbitrary byte slice. Not
/// cryptographically strong by design (see the crate's non-goals).
pub fn djb2(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 5381;
    for &b in bytes {
        hash = hash.wrapping_mul(33).wrapping_add(u64::from(b));
    }
    hash
}

/// Combines an already-computed hash with another, used when folding the
/// reference-column suffix of a row into the DJB2 hash of its
/// non-reference prefix.
pub fn combine(hash: u64, other: u64) -> u64 {
    djb2(&other.to_le_bytes()).wrapping_add(hash.rotate_left(1))
}

/// Hashes a row's scalar prefix and reference suffix together: DJB2 over
/// the scalar values' byte representation, combined in order with each
/// reference column's own hash. Shared by [`crate::rowset::RowSet::row_hash`]
/// and the partitioner's key-cursor hash, per `cql_hash_buffer` in the
/// original runtime being the one routine behind both.
pub fn hash_row(scalars: &[crate::cursor::ScalarValue], refs: &[Option<crate::value::RefValue>]) -> u64 {
    use crate::cursor::ScalarValue;

    let mut prefix = Vec::new();
    for s in scalars {
        match s {
            ScalarValue::Null => prefix.push(0u8),
            ScalarValue::Bool(b) => prefix.push(*b as u8),
            ScalarValue::Int32(v) => prefix.extend_from_slice(&v.to_le_bytes()),
            ScalarValue::Int64(v) => prefix.extend_from_slice(&v.to_le_bytes()),
            ScalarValue::Double(v) => prefix.extend_from_slice(&v.to_le_bytes()),
        }
    }
    let mut hash = djb2(&prefix);
    for r in refs {
        let h = r.as_ref().map_or(0, crate::value::ref_hash);
        hash = combine(hash, h);
    }
    hash
}

/// `true` iff two rows (each a scalar prefix plus reference suffix) are
/// equal: scalars compared directly, references compared with
/// `ref_equal`. Shared by row equality and the partitioner's key
/// equality.
pub fn rows_equal(
    scalars_a: &[crate::cursor::ScalarValue],
    refs_a: &[Option<crate::value::RefValue>],
    scalars_b: &[crate::cursor::ScalarValue],
    refs_b: &[Option<crate::value::RefValue>],
) -> bool {
    scalars_a == scalars_b
        && refs_a
            .iter()
            .zip(refs_b)
            .all(|(x, y)| crate::value::ref_equal_opt(x, y))
}
