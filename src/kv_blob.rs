//! Key/value blob codec, registered as scalar SQL functions so generated
//! code can pack typed structured records into ordinary BLOB columns, per
//! spec.md §4.G. Grounded on `bcreatekey`/`bgetkey`/`bupdatekey` and
//! `bcreateval`/`bgetval`/`bupdateval` in
//! `original_source/sources/cqlrt_common.c`; the 16-byte header and
//! `CQL_BLOB_MAGIC` constant there are kept verbatim.

const MAGIC: u32 = 0x524d_3030;
const HEADER_LEN: usize = 16;

const TYPE_BOOL: u8 = 0;
const TYPE_INT32: u8 = 1;
const TYPE_INT64: u8 = 2;
const TYPE_DOUBLE: u8 = 3;
const TYPE_STRING: u8 = 4;
const TYPE_BLOB: u8 = 5;
const DIRTY_BIT: u8 = 0x80;

/// The declared core type of one key/value blob column, independent of
/// whether a value is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvType {
    Bool,
    Int32,
    Int64,
    Double,
    String,
    Blob,
}

impl KvType {
    pub(crate) fn code(self) -> u8 {
        match self {
            KvType::Bool => TYPE_BOOL,
            KvType::Int32 => TYPE_INT32,
            KvType::Int64 => TYPE_INT64,
            KvType::Double => TYPE_DOUBLE,
            KvType::String => TYPE_STRING,
            KvType::Blob => TYPE_BLOB,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<KvType> {
        Some(match code & !DIRTY_BIT {
            TYPE_BOOL => KvType::Bool,
            TYPE_INT32 => KvType::Int32,
            TYPE_INT64 => KvType::Int64,
            TYPE_DOUBLE => KvType::Double,
            TYPE_STRING => KvType::String,
            TYPE_BLOB => KvType::Blob,
            _ => return None,
        })
    }
}

/// An owned value of one of the six core kinds this codec understands.
/// Distinct from [`crate::cursor::ScalarValue`]/[`crate::value::RefValue`]:
/// this module serializes raw argument values passed to scalar SQL
/// functions, not live cursor/rowset data.
#[derive(Debug, Clone, PartialEq)]
pub enum KvValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
}

impl KvValue {
    fn kv_type(&self) -> KvType {
        match self {
            KvValue::Bool(_) => KvType::Bool,
            KvValue::Int32(_) => KvType::Int32,
            KvValue::Int64(_) => KvType::Int64,
            KvValue::Double(_) => KvType::Double,
            KvValue::String(_) => KvType::String,
            KvValue::Blob(_) => KvType::Blob,
        }
    }
}

/// `true` iff `value`'s runtime kind is the one `declared` calls for —
/// the Rust stand-in for `cql_blobtype_vs_argtype_compat`, which in the
/// original also reconciles integer/real argument widths against a
/// declared column affinity.
fn compatible(value: &KvValue, declared: KvType) -> bool {
    value.kv_type() == declared
}

fn cell_bytes(value: &KvValue, var_offset: u64) -> [u8; 8] {
    let word: u64 = match value {
        KvValue::Bool(b) => u64::from(*b),
        KvValue::Int32(i) => i64::from(*i) as u64,
        KvValue::Int64(i) => *i as u64,
        KvValue::Double(d) => d.to_bits(),
        KvValue::String(s) => (var_offset << 32) | s.len() as u64,
        KvValue::Blob(b) => (var_offset << 32) | b.len() as u64,
    };
    word.to_be_bytes()
}

fn variable_bytes(value: &KvValue) -> Vec<u8> {
    match value {
        KvValue::String(s) => {
            let mut v = s.as_bytes().to_vec();
            v.push(0);
            v
        }
        KvValue::Blob(b) => b.clone(),
        _ => Vec::new(),
    }
}

fn write_header(out: &mut Vec<u8>, record_type: u64, column_count: u32) {
    out.extend_from_slice(&record_type.to_be_bytes());
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&column_count.to_be_bytes());
}

struct Header {
    record_type: u64,
    column_count: usize,
}

fn read_header(blob: &[u8]) -> Option<Header> {
    if blob.len() < HEADER_LEN {
        return None;
    }
    let record_type = u64::from_be_bytes(blob[0..8].try_into().unwrap());
    let magic = u32::from_be_bytes(blob[8..12].try_into().unwrap());
    if magic != MAGIC {
        return None;
    }
    let column_count = u32::from_be_bytes(blob[12..16].try_into().unwrap()) as usize;
    Some(Header { record_type, column_count })
}

fn read_cell(blob: &[u8], col: usize) -> u64 {
    let at = HEADER_LEN + col * 8;
    u64::from_be_bytes(blob[at..at + 8].try_into().unwrap())
}

fn decode_value(kv_type: KvType, cell: u64, variable_area: &[u8]) -> Option<KvValue> {
    Some(match kv_type {
        KvType::Bool => KvValue::Bool(cell != 0),
        KvType::Int32 => KvValue::Int32(cell as i64 as i32),
        KvType::Int64 => KvValue::Int64(cell as i64),
        KvType::Double => KvValue::Double(f64::from_bits(cell)),
        KvType::String => {
            let offset = (cell >> 32) as usize;
            let len = (cell & 0xffff_ffff) as usize;
            let bytes = variable_area.get(offset..offset + len)?;
            KvValue::String(std::str::from_utf8(bytes).ok()?.to_string())
        }
        KvType::Blob => {
            let offset = (cell >> 32) as usize;
            let len = (cell & 0xffff_ffff) as usize;
            KvValue::Blob(variable_area.get(offset..offset + len)?.to_vec())
        }
    })
}

// --- key blob: fixed positional schema, every column always present ----

/// Builds a key blob: validates argument-count parity against `columns`'
/// declared types, checks each value is compatible with its declared
/// type, and lays out storage/types/variable-area in column order.
/// Returns `None` on any validation failure (the caller sets a NULL SQL
/// result, per spec.md §4.G: "set a NULL SQL result on any validation
/// failure").
pub fn bcreatekey(record_type: u64, columns: &[(KvType, KvValue)]) -> Option<Vec<u8>> {
    for (declared, value) in columns {
        if !compatible(value, *declared) {
            return None;
        }
    }

    let n = columns.len();
    let mut variable_area = Vec::new();
    let mut offsets = Vec::with_capacity(n);
    for (_, value) in columns {
        offsets.push(variable_area.len() as u64);
        variable_area.extend(variable_bytes(value));
    }

    let mut out = Vec::with_capacity(HEADER_LEN + n * 9 + variable_area.len());
    write_header(&mut out, record_type, n as u32);
    for ((_, value), offset) in columns.iter().zip(&offsets) {
        out.extend_from_slice(&cell_bytes(value, *offset));
    }
    for (declared, _) in columns {
        out.push(declared.code());
    }
    out.extend(variable_area);
    Some(out)
}

fn key_variable_area(blob: &[u8], column_count: usize) -> &[u8] {
    let storage_end = HEADER_LEN + column_count * 8;
    let types_end = storage_end + column_count;
    &blob[types_end..]
}

/// Reads column `i` of a key blob. Returns `None` on magic mismatch,
/// out-of-range index, or truncated storage.
pub fn bgetkey(blob: &[u8], i: usize) -> Option<KvValue> {
    let header = read_header(blob)?;
    if i >= header.column_count {
        return None;
    }
    let types_start = HEADER_LEN + header.column_count * 8;
    let kv_type = KvType::from_code(*blob.get(types_start + i)?)?;
    let cell = read_cell(blob, i);
    let variable_area = key_variable_area(blob, header.column_count);
    decode_value(kv_type, cell, variable_area)
}

/// The declared type of column `i`, independent of its value.
pub fn bgetkey_type(blob: &[u8], i: usize) -> Option<KvType> {
    let header = read_header(blob)?;
    if i >= header.column_count {
        return None;
    }
    let types_start = HEADER_LEN + header.column_count * 8;
    KvType::from_code(*blob.get(types_start + i)?)
}

/// Replaces the values at the given column indices and re-lays-out the
/// blob with variable-length items always written in column order
/// (never argument order), so a given logical key has one canonical
/// byte representation regardless of which columns were touched or in
/// what order — required because key blob identity backs uniqueness
/// constraints.
pub fn bupdatekey(blob: &[u8], updates: &[(usize, KvValue)]) -> Option<Vec<u8>> {
    let header = read_header(blob)?;
    let n = header.column_count;
    let types_start = HEADER_LEN + n * 8;
    let variable_area = key_variable_area(blob, n).to_vec();

    let mut types: Vec<KvType> = (0..n).map(|i| KvType::from_code(blob[types_start + i])).collect::<Option<_>>()?;
    let mut values: Vec<KvValue> = (0..n)
        .map(|i| decode_value(types[i], read_cell(blob, i), &variable_area))
        .collect::<Option<_>>()?;

    for (col, value) in updates {
        if *col >= n || !compatible(value, types[*col]) {
            return None;
        }
    }
    for (col, value) in updates {
        types[*col] = value.kv_type();
        values[*col] = value.clone();
    }

    let columns: Vec<(KvType, KvValue)> = types.into_iter().zip(values).collect();
    bcreatekey(header.record_type, &columns)
}

// --- value blob: self-describing, named fields, nulls simply absent ----

/// Builds a value blob, omitting any `(field_id, value)` pair whose
/// value is `None` (absence is the null signal for value blobs).
pub fn bcreateval(record_type: u64, fields: &[(u64, KvType, Option<KvValue>)]) -> Option<Vec<u8>> {
    let present: Vec<&(u64, KvType, Option<KvValue>)> = fields.iter().filter(|(_, _, v)| v.is_some()).collect();
    for (_, declared, value) in &present {
        if !compatible(value.as_ref().unwrap(), *declared) {
            return None;
        }
    }

    let m = present.len();
    let mut variable_area = Vec::new();
    let mut offsets = Vec::with_capacity(m);
    for (_, _, value) in &present {
        offsets.push(variable_area.len() as u64);
        variable_area.extend(variable_bytes(value.as_ref().unwrap()));
    }

    let mut out = Vec::new();
    write_header(&mut out, record_type, m as u32);
    for (field_id, _, _) in &present {
        out.extend_from_slice(&field_id.to_be_bytes());
    }
    for ((_, _, value), offset) in present.iter().zip(&offsets) {
        out.extend_from_slice(&cell_bytes(value.as_ref().unwrap(), *offset));
    }
    for (_, declared, _) in &present {
        out.push(declared.code());
    }
    out.extend(variable_area);
    Some(out)
}

struct ValFields {
    field_ids: Vec<u64>,
    types: Vec<KvType>,
    cells: Vec<u64>,
    variable_area: Vec<u8>,
}

fn read_val_fields(blob: &[u8]) -> Option<(Header, ValFields)> {
    let header = read_header(blob)?;
    let m = header.column_count;
    let field_ids_start = HEADER_LEN;
    let storage_start = field_ids_start + m * 8;
    let types_start = storage_start + m * 8;
    let variable_start = types_start + m;

    let field_ids = (0..m)
        .map(|i| {
            let at = field_ids_start + i * 8;
            u64::from_be_bytes(blob.get(at..at + 8)?.try_into().ok()?)
        })
        .collect::<Option<Vec<_>>>()?;
    let types = (0..m)
        .map(|i| KvType::from_code(*blob.get(types_start + i)?))
        .collect::<Option<Vec<_>>>()?;
    let cells = (0..m)
        .map(|i| {
            let at = storage_start + i * 8;
            u64::from_be_bytes(blob.get(at..at + 8)?.try_into().ok()?)
        })
        .collect::<Option<Vec<_>>>()?;
    let variable_area = blob.get(variable_start..)?.to_vec();

    Some((
        header,
        ValFields {
            field_ids,
            types,
            cells,
            variable_area,
        },
    ))
}

/// Searches `field_ids` linearly and returns the stored value, or `None`
/// if `field_id` is absent (the only representation of a null field).
pub fn bgetval(blob: &[u8], field_id: u64) -> Option<KvValue> {
    let (_, fields) = read_val_fields(blob)?;
    let i = fields.field_ids.iter().position(|&f| f == field_id)?;
    decode_value(fields.types[i], fields.cells[i], &fields.variable_area)
}

pub fn bgetval_type(blob: &[u8], field_id: u64) -> Option<KvType> {
    let (_, fields) = read_val_fields(blob)?;
    let i = fields.field_ids.iter().position(|&f| f == field_id)?;
    Some(fields.types[i])
}

/// Applies a batch of field updates: overwrite an existing field (value
/// must be type-compatible with the stored field), delete a field by
/// passing `None`, or add a new field with a new id. Passing the same
/// field id twice in one call is rejected (the "dirty bit" in spec.md
/// §4.G). Untouched fields keep their original relative order; touched
/// fields are placed using the update's own order, so the result has no
/// duplicate writes and is fully determined by `blob` and `updates`.
pub fn bupdateval(blob: &[u8], updates: &[(u64, KvType, Option<KvValue>)]) -> Option<Vec<u8>> {
    let (header, fields) = read_val_fields(blob)?;

    let mut seen = std::collections::HashSet::new();
    for (field_id, _, _) in updates {
        if !seen.insert(*field_id) {
            return None;
        }
    }

    let mut existing: Vec<(u64, KvType, Option<KvValue>)> = (0..fields.field_ids.len())
        .map(|i| {
            (
                fields.field_ids[i],
                fields.types[i],
                decode_value(fields.types[i], fields.cells[i], &fields.variable_area),
            )
        })
        .collect();

    for (field_id, declared, value) in updates {
        if let Some(value) = value {
            if !compatible(value, *declared) {
                return None;
            }
        }
        match existing.iter_mut().find(|(id, ..)| id == field_id) {
            Some(slot) => {
                if value.is_some() && slot.1 != *declared {
                    return None;
                }
                slot.1 = *declared;
                slot.2 = value.clone();
            }
            None => existing.push((*field_id, *declared, value.clone())),
        }
    }

    let out: Vec<(u64, KvType, Option<KvValue>)> = existing;
    bcreateval(header.record_type, &out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_4_create_and_read_back_key_columns() {
        let blob = bcreatekey(
            42,
            &[
                (KvType::String, KvValue::String("alice".into())),
                (KvType::Int32, KvValue::Int32(7)),
            ],
        )
        .unwrap();

        assert_eq!(u64::from_be_bytes(blob[0..8].try_into().unwrap()), 42);
        assert_eq!(u32::from_be_bytes(blob[8..12].try_into().unwrap()), MAGIC);
        assert_eq!(u32::from_be_bytes(blob[12..16].try_into().unwrap()), 2);

        assert_eq!(bgetkey(&blob, 0), Some(KvValue::String("alice".into())));
        assert_eq!(bgetkey(&blob, 1), Some(KvValue::Int32(7)));
        assert_eq!(bgetkey(&blob, 2), None);
    }

    #[test]
    fn bcreatekey_rejects_type_incompatible_values() {
        assert!(bcreatekey(1, &[(KvType::Int32, KvValue::String("x".into()))]).is_none());
    }

    #[test]
    fn property_bupdatekey_matches_bcreatekey_over_effective_values() {
        let original = bcreatekey(
            1,
            &[
                (KvType::Int32, KvValue::Int32(1)),
                (KvType::String, KvValue::String("a".into())),
                (KvType::Blob, KvValue::Blob(vec![9, 9])),
            ],
        )
        .unwrap();

        let updated = bupdatekey(
            &original,
            &[
                (1, KvValue::String("zzz".into())),
                (0, KvValue::Int32(2)),
            ],
        )
        .unwrap();

        let expected = bcreatekey(
            1,
            &[
                (KvType::Int32, KvValue::Int32(2)),
                (KvType::String, KvValue::String("zzz".into())),
                (KvType::Blob, KvValue::Blob(vec![9, 9])),
            ],
        )
        .unwrap();

        assert_eq!(updated, expected);
    }

    #[test]
    fn bupdatekey_rejects_type_change() {
        let blob = bcreatekey(1, &[(KvType::Int32, KvValue::Int32(1))]).unwrap();
        assert!(bupdatekey(&blob, &[(0, KvValue::String("x".into()))]).is_none());
    }

    #[test]
    fn scenario_5_bupdateval_deletes_a_field() {
        let created = bcreateval(
            1,
            &[
                (10, KvType::String, Some(KvValue::String("x".into()))),
                (20, KvType::Int32, Some(KvValue::Int32(5))),
            ],
        )
        .unwrap();

        let updated = bupdateval(&created, &[(20, KvType::Int32, None)]).unwrap();

        assert_eq!(bgetval(&updated, 10), Some(KvValue::String("x".into())));
        assert_eq!(bgetval(&updated, 20), None);
        assert_eq!(u32::from_be_bytes(updated[12..16].try_into().unwrap()), 1);
    }

    #[test]
    fn property_bupdateval_add_then_delete_is_byte_identical() {
        let v = bcreateval(1, &[(10, KvType::String, Some(KvValue::String("x".into())))]).unwrap();
        let added = bupdateval(&v, &[(20, KvType::Int32, Some(KvValue::Int32(99)))]).unwrap();
        let removed = bupdateval(&added, &[(20, KvType::Int32, None)]).unwrap();
        assert_eq!(removed, v);
    }

    #[test]
    fn bgetval_absent_field_is_none() {
        let v = bcreateval(1, &[(10, KvType::Int32, Some(KvValue::Int32(1)))]).unwrap();
        assert_eq!(bgetval(&v, 999), None);
    }

    #[test]
    fn bupdateval_rejects_duplicate_field_in_one_call() {
        let v = bcreateval(1, &[(10, KvType::Int32, Some(KvValue::Int32(1)))]).unwrap();
        assert!(bupdateval(
            &v,
            &[
                (10, KvType::Int32, Some(KvValue::Int32(2))),
                (10, KvType::Int32, Some(KvValue::Int32(3))),
            ]
        )
        .is_none());
    }

    #[test]
    fn bupdateval_rejects_type_mismatch_on_overwrite() {
        let v = bcreateval(1, &[(10, KvType::Int32, Some(KvValue::Int32(1)))]).unwrap();
        assert!(bupdateval(&v, &[(10, KvType::String, Some(KvValue::String("x".into())))]).is_none());
    }

    #[test]
    fn malformed_magic_is_rejected_everywhere() {
        let mut blob = bcreatekey(1, &[(KvType::Int32, KvValue::Int32(1))]).unwrap();
        blob[8] ^= 0xff;
        assert_eq!(bgetkey(&blob, 0), None);
        assert!(bupdatekey(&blob, &[(0, KvValue::Int32(2))]).is_none());
    }

    #[test]
    fn value_blob_preserves_untouched_field_order_across_updates() {
        let v = bcreateval(
            1,
            &[
                (1, KvType::Int32, Some(KvValue::Int32(1))),
                (2, KvType::Int32, Some(KvValue::Int32(2))),
                (3, KvType::Int32, Some(KvValue::Int32(3))),
            ],
        )
        .unwrap();
        let updated = bupdateval(&v, &[(2, KvType::Int32, Some(KvValue::Int32(20)))]).unwrap();
        let (_, fields) = read_val_fields(&updated).unwrap();
        assert_eq!(fields.field_ids, vec![1, 2, 3]);
    }
}
