//! The versioned cursor blob codec: encodes one filled
//! [`DynamicCursor`](crate::cursor::DynamicCursor) row so it can be
//! stored in a BLOB column and later rehydrated into a cursor of the same
//! conceptual shape, possibly produced by a different build of the
//! compiler (hence "versioned" — extra/missing trailing columns are
//! tolerated under the rules below).
//!
//! Grounded on `cql_cursor_to_bytebuf`/`cql_cursor_from_bytes` in
//! `original_source/sources/cqlrt_common.c`, following spec.md §4.F's byte
//! layout exactly (the original's byte-for-byte format differs in its type
//! tags; the distilled layout here is the one this crate implements).

use crate::cursor::{CoreType, ScalarValue, TypeByte};
use crate::error::DecodeError;
use crate::value::{CqlBlob, CqlString, RefValue};

/// One column's encoded value, produced by decoding a cursor blob. Scalar
/// columns carry their decoded [`ScalarValue`]; reference columns carry
/// an owned [`RefValue`] (or `None` for nil/absent).
#[derive(Debug, Clone)]
pub enum DecodedColumn {
    Scalar(ScalarValue),
    Ref(Option<RefValue>),
}

/// A fully decoded cursor row: `has_row` plus one [`DecodedColumn`] per
/// consumer-declared column, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct DecodedCursor {
    pub has_row: bool,
    pub columns: Vec<DecodedColumn>,
}

fn type_letter(core: CoreType) -> u8 {
    match core {
        CoreType::Int32 => b'I',
        CoreType::Int64 => b'L',
        CoreType::Double => b'D',
        CoreType::Bool => b'F',
        CoreType::String => b'S',
        CoreType::Blob => b'B',
        CoreType::Null | CoreType::Object => {
            panic!("cursor blobs cannot carry Null-core or Object columns")
        }
    }
}

fn letter_core(letter: u8) -> Option<(CoreType, bool)> {
    let nullable = letter.is_ascii_lowercase();
    let upper = letter.to_ascii_uppercase();
    let core = match upper {
        b'I' => CoreType::Int32,
        b'L' => CoreType::Int64,
        b'D' => CoreType::Double,
        b'F' => CoreType::Bool,
        b'S' => CoreType::String,
        b'B' => CoreType::Blob,
        _ => return None,
    };
    Some((core, nullable))
}

/// Zigzag-encodes a signed 64-bit integer into an unsigned one so small
/// magnitude values (positive or negative) both produce short varints.
fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

fn write_varint(out: &mut Vec<u8>, mut v: u64) {
    loop {
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if v == 0 {
            break;
        }
    }
}

fn read_varint(bytes: &[u8], pos: &mut usize, index: usize) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        let byte = *bytes
            .get(*pos)
            .ok_or(DecodeError::Truncated { index })?;
        *pos += 1;
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 63 {
            return Err(DecodeError::Truncated { index });
        }
    }
    Ok(result)
}

/// One column's declared shape for encode/decode purposes: its core type
/// and nullability. Built from a [`TypeByte`] by callers.
#[derive(Debug, Clone, Copy)]
pub struct ColumnShape {
    pub core: CoreType,
    pub not_null: bool,
}

impl ColumnShape {
    pub fn from_type_byte(t: TypeByte) -> Self {
        ColumnShape {
            core: t.core(),
            not_null: t.not_null(),
        }
    }
}

/// Encodes one cursor row per spec.md §4.F. `has_row` must be `true` —
/// there is no blob representation of "no row" (callers store `NULL`
/// instead, as the design's "decode failures surface as no current row,
/// identical to an empty query" already implies).
pub fn encode_cursor(shapes: &[ColumnShape], scalars: &[ScalarValue], refs: &[Option<RefValue>]) -> Vec<u8> {
    let mut out = Vec::new();

    // 1. type-code preamble, zero-terminated.
    for s in shapes {
        let mut letter = type_letter(s.core);
        if !s.not_null {
            letter = letter.to_ascii_lowercase();
        }
        out.push(letter);
    }
    out.push(0);

    // 2. presence + bool bitvector: first N_nullable bits mark presence
    // (declaration order, nullable columns only), next N_bool bits carry
    // the boolean value (declaration order, all bool columns).
    let nullable_count = shapes.iter().filter(|s| !s.not_null).count();
    let bool_count = shapes.iter().filter(|s| s.core == CoreType::Bool).count();
    let mut bits = vec![0u8; (nullable_count + bool_count).div_ceil(8)];

    let mut scalar_i = 0;
    let mut ref_i = 0;
    let mut nullable_index = 0;
    let mut bool_index = 0;
    let mut present = vec![false; shapes.len()];
    for (col, s) in shapes.iter().enumerate() {
        let is_present = if s.core.is_reference() {
            let p = refs[ref_i].is_some();
            ref_i += 1;
            p
        } else {
            let v = scalars[scalar_i];
            scalar_i += 1;
            if s.core == CoreType::Bool {
                if let ScalarValue::Bool(true) = v {
                    set_bit(&mut bits, nullable_count + bool_index);
                }
                bool_index += 1;
            }
            !v.is_null()
        };
        present[col] = is_present;
        if !s.not_null {
            if is_present {
                set_bit(&mut bits, nullable_index);
            }
            nullable_index += 1;
        }
    }
    out.extend_from_slice(&bits);

    // 3. payload.
    scalar_i = 0;
    ref_i = 0;
    for (col, s) in shapes.iter().enumerate() {
        if s.core.is_reference() {
            let r = &refs[ref_i];
            ref_i += 1;
            if present[col] {
                match r.as_ref().unwrap() {
                    RefValue::String(string) => {
                        out.extend_from_slice(string.as_str().as_bytes());
                        out.push(0);
                    }
                    RefValue::Blob(blob) => {
                        write_varint(&mut out, blob.len() as u64);
                        out.extend_from_slice(blob.as_bytes());
                    }
                    RefValue::Object(_) | RefValue::ResultSet(_) => {
                        panic!("cursor blobs cannot carry Object-typed columns")
                    }
                }
            }
        } else {
            let v = scalars[scalar_i];
            scalar_i += 1;
            if present[col] {
                match v {
                    ScalarValue::Int32(i) => write_varint(&mut out, zigzag_encode(i64::from(i))),
                    ScalarValue::Int64(i) => write_varint(&mut out, zigzag_encode(i)),
                    ScalarValue::Double(d) => out.extend_from_slice(&d.to_be_bytes()),
                    ScalarValue::Bool(_) => {} // value lives in the bitvector
                    ScalarValue::Null => unreachable!("present implies non-null"),
                }
            }
        }
    }

    out
}

fn set_bit(bits: &mut [u8], index: usize) {
    bits[index / 8] |= 1 << (index % 8);
}

fn get_bit(bits: &[u8], index: usize) -> bool {
    bits[index / 8] & (1 << (index % 8)) != 0
}

/// Decodes `bytes` against the consumer's declared `shapes`, applying the
/// versioning rules from spec.md §4.F:
///
/// - extra trailing producer columns are skipped once the consumer's
///   columns are all read;
/// - missing trailing consumer columns must be nullable and decode to
///   null;
/// - overlapping columns must share a core type; nullability may only be
///   relaxed (producer not-null -> consumer nullable), never tightened.
pub fn decode_cursor(bytes: &[u8], shapes: &[ColumnShape]) -> Result<DecodedCursor, DecodeError> {
    // 1. read the producer's type-code preamble.
    let mut pos = 0;
    let mut producer: Vec<(CoreType, bool)> = Vec::new();
    loop {
        let byte = *bytes.get(pos).ok_or(DecodeError::Truncated { index: producer.len() })?;
        pos += 1;
        if byte == 0 {
            break;
        }
        let (core, nullable) = letter_core(byte).ok_or(DecodeError::UnknownTypeByte(byte))?;
        producer.push((core, nullable));
    }

    // Validate overlap against the consumer's declared shapes.
    for (i, shape) in shapes.iter().enumerate() {
        match producer.get(i) {
            Some(&(core, producer_nullable)) => {
                if core != shape.core {
                    return Err(DecodeError::TypeMismatch {
                        index: i,
                        producer: core,
                        consumer: shape.core,
                    });
                }
                // Consumer may relax nullability (accept not-null into a
                // nullable slot) but never tighten it.
                if producer_nullable && shape.not_null {
                    return Err(DecodeError::NullabilityTightened { index: i });
                }
            }
            None => {
                if shape.not_null {
                    return Err(DecodeError::MissingNotNullColumn { index: i });
                }
            }
        }
    }

    let overlap = producer.len().min(shapes.len());

    // 2. presence + bool bitvector, sized off the *producer's* shape.
    let producer_nullable_count = producer.iter().filter(|(_, n)| *n).count();
    let producer_bool_count = producer.iter().filter(|(c, _)| *c == CoreType::Bool).count();
    let bit_count = producer_nullable_count + producer_bool_count;
    let bits_len = bit_count.div_ceil(8);
    let bits = bytes
        .get(pos..pos + bits_len)
        .ok_or(DecodeError::Truncated { index: 0 })?;
    pos += bits_len;

    let mut nullable_index = 0;
    let mut producer_present = vec![false; producer.len()];
    for (i, (_core, nullable)) in producer.iter().enumerate() {
        let present = if *nullable {
            let p = get_bit(bits, nullable_index);
            nullable_index += 1;
            p
        } else {
            true
        };
        producer_present[i] = present;
    }

    // 3. payload, producer-shape order; collect decoded columns for the
    // overlapping prefix, discard the rest.
    let mut decoded: Vec<DecodedColumn> = Vec::with_capacity(shapes.len());
    let mut bool_slot = 0usize;
    for (i, (core, _nullable)) in producer.iter().enumerate() {
        let present = producer_present[i];
        // encode_cursor reserves one value bit per bool column regardless
        // of presence (its bool_index always advances), so the decoder's
        // counter must advance the same way or every bool after an absent
        // one reads the wrong bit.
        let bool_bit_idx = if *core == CoreType::Bool {
            let idx = producer_nullable_count + bool_slot;
            bool_slot += 1;
            Some(idx)
        } else {
            None
        };
        let value: Option<DecodedColumn> = if !present {
            if i < overlap {
                Some(match core {
                    CoreType::Bool => DecodedColumn::Scalar(ScalarValue::Null),
                    CoreType::Int32 | CoreType::Int64 | CoreType::Double => {
                        DecodedColumn::Scalar(ScalarValue::Null)
                    }
                    CoreType::String | CoreType::Blob => DecodedColumn::Ref(None),
                    CoreType::Null | CoreType::Object => unreachable!(),
                })
            } else {
                None
            }
        } else {
            match core {
                CoreType::Bool => {
                    let v = get_bit(bits, bool_bit_idx.unwrap());
                    if i < overlap {
                        Some(DecodedColumn::Scalar(ScalarValue::Bool(v)))
                    } else {
                        None
                    }
                }
                CoreType::Int32 => {
                    let raw = read_varint(bytes, &mut pos, i)?;
                    if i < overlap {
                        Some(DecodedColumn::Scalar(ScalarValue::Int32(zigzag_decode(raw) as i32)))
                    } else {
                        None
                    }
                }
                CoreType::Int64 => {
                    let raw = read_varint(bytes, &mut pos, i)?;
                    if i < overlap {
                        Some(DecodedColumn::Scalar(ScalarValue::Int64(zigzag_decode(raw))))
                    } else {
                        None
                    }
                }
                CoreType::Double => {
                    let slice = bytes
                        .get(pos..pos + 8)
                        .ok_or(DecodeError::Truncated { index: i })?;
                    pos += 8;
                    if i < overlap {
                        let arr: [u8; 8] = slice.try_into().unwrap();
                        Some(DecodedColumn::Scalar(ScalarValue::Double(f64::from_be_bytes(arr))))
                    } else {
                        None
                    }
                }
                CoreType::String => {
                    let start = pos;
                    let end = bytes[pos..]
                        .iter()
                        .position(|&b| b == 0)
                        .map(|o| pos + o)
                        .ok_or(DecodeError::Truncated { index: i })?;
                    pos = end + 1;
                    if i < overlap {
                        let s = std::str::from_utf8(&bytes[start..end])
                            .map_err(|_| DecodeError::Truncated { index: i })?;
                        Some(DecodedColumn::Ref(Some(RefValue::String(CqlString::new(s)))))
                    } else {
                        None
                    }
                }
                CoreType::Blob => {
                    let len = read_varint(bytes, &mut pos, i)? as usize;
                    let slice = bytes
                        .get(pos..pos + len)
                        .ok_or(DecodeError::Truncated { index: i })?;
                    pos += len;
                    if i < overlap {
                        Some(DecodedColumn::Ref(Some(RefValue::Blob(CqlBlob::new(slice.to_vec())))))
                    } else {
                        None
                    }
                }
                CoreType::Null | CoreType::Object => unreachable!(),
            }
        };
        if let Some(v) = value {
            decoded.push(v);
        }
    }

    // Trailing consumer-only columns (consumer longer than producer).
    for shape in &shapes[overlap..] {
        decoded.push(match shape.core {
            CoreType::String | CoreType::Blob => DecodedColumn::Ref(None),
            _ => DecodedColumn::Scalar(ScalarValue::Null),
        });
    }

    Ok(DecodedCursor {
        has_row: true,
        columns: decoded,
    })
}

/// Packs a list of cursor blobs into one blob per spec.md §4.F's
/// blob-stream wrapper: a 32-bit count, then `count + 1` little-endian
/// 32-bit offsets (each blob's start offset plus an end sentinel).
pub fn make_blob_stream(blobs: &[Vec<u8>]) -> Vec<u8> {
    let count = blobs.len() as u32;
    let mut out = Vec::new();
    out.extend_from_slice(&count.to_le_bytes());

    let header_size = (2 + blobs.len()) as u32 * 4;
    let mut offset = header_size;
    out.extend_from_slice(&offset.to_le_bytes());
    for b in blobs {
        offset += b.len() as u32;
        out.extend_from_slice(&offset.to_le_bytes());
    }
    for b in blobs {
        out.extend_from_slice(b);
    }
    out
}

/// Number of cursor blobs packed into `stream`.
pub fn blob_stream_count(stream: &[u8]) -> Result<usize, DecodeError> {
    let bytes: [u8; 4] = stream
        .get(0..4)
        .ok_or(DecodeError::BadBlobStream)?
        .try_into()
        .unwrap();
    Ok(u32::from_le_bytes(bytes) as usize)
}

/// Reads the `index`-th cursor blob out of a blob stream produced by
/// [`make_blob_stream`].
pub fn blob_stream_get(stream: &[u8], index: usize) -> Result<&[u8], DecodeError> {
    let count = blob_stream_count(stream)?;
    if index >= count {
        return Err(DecodeError::BadBlobStream);
    }
    let offsets_start = 4;
    let read_offset = |i: usize| -> Result<u32, DecodeError> {
        let at = offsets_start + i * 4;
        let bytes: [u8; 4] = stream
            .get(at..at + 4)
            .ok_or(DecodeError::BadBlobStream)?
            .try_into()
            .unwrap();
        Ok(u32::from_le_bytes(bytes))
    };
    let start = read_offset(index)? as usize;
    let end = read_offset(index + 1)? as usize;
    stream.get(start..end).ok_or(DecodeError::BadBlobStream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn shapes(specs: &[(CoreType, bool)]) -> Vec<ColumnShape> {
        specs
            .iter()
            .map(|&(core, not_null)| ColumnShape { core, not_null })
            .collect()
    }

    #[test]
    fn scenario_2_encode_then_decode_matches_design_example() {
        let shapes = shapes(&[
            (CoreType::Int32, true),
            (CoreType::String, true),
            (CoreType::Blob, false),
        ]);
        let scalars = [ScalarValue::Int32(42)];
        let refs: Vec<Option<RefValue>> = vec![Some(RefValue::String(CqlString::new("hello"))), None];
        let blob = encode_cursor(&shapes, &scalars, &refs);

        assert_eq!(&blob[0..4], b"ISb\0");
        // 1-bit bitvector (only the blob column is nullable) -> one zero byte
        assert_eq!(blob[4], 0);
        // varint(zigzag(42)) then "hello\0"
        assert_eq!(blob[5], (42i64 << 1) as u8);
        assert_eq!(&blob[6..12], b"hello\0");

        let decoded = decode_cursor(&blob, &shapes).unwrap();
        assert!(decoded.has_row);
        match decoded.columns[0] {
            DecodedColumn::Scalar(ScalarValue::Int32(42)) => {}
            ref other => panic!("unexpected {other:?}"),
        }
        match &decoded.columns[1] {
            DecodedColumn::Ref(Some(RefValue::String(s))) => assert_eq!(s.as_str(), "hello"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(decoded.columns[2], DecodedColumn::Ref(None)));
    }

    #[test]
    fn extra_trailing_producer_columns_are_skipped() {
        let producer_shapes = shapes(&[(CoreType::Int32, true), (CoreType::Int64, true)]);
        let blob = encode_cursor(
            &producer_shapes,
            &[ScalarValue::Int32(1), ScalarValue::Int64(2)],
            &[],
        );
        let consumer_shapes = shapes(&[(CoreType::Int32, true)]);
        let decoded = decode_cursor(&blob, &consumer_shapes).unwrap();
        assert_eq!(decoded.columns.len(), 1);
    }

    #[test]
    fn missing_trailing_consumer_columns_must_be_nullable() {
        let producer_shapes = shapes(&[(CoreType::Int32, true)]);
        let blob = encode_cursor(&producer_shapes, &[ScalarValue::Int32(1)], &[]);

        let ok_consumer = shapes(&[(CoreType::Int32, true), (CoreType::Int64, false)]);
        let decoded = decode_cursor(&blob, &ok_consumer).unwrap();
        assert!(matches!(decoded.columns[1], DecodedColumn::Scalar(ScalarValue::Null)));

        let bad_consumer = shapes(&[(CoreType::Int32, true), (CoreType::Int64, true)]);
        assert_eq!(
            decode_cursor(&blob, &bad_consumer).unwrap_err(),
            DecodeError::MissingNotNullColumn { index: 1 }
        );
    }

    #[test]
    fn core_type_mismatch_is_rejected() {
        let producer_shapes = shapes(&[(CoreType::Int32, true)]);
        let blob = encode_cursor(&producer_shapes, &[ScalarValue::Int32(1)], &[]);
        let consumer = shapes(&[(CoreType::Int64, true)]);
        assert_eq!(
            decode_cursor(&blob, &consumer).unwrap_err(),
            DecodeError::TypeMismatch {
                index: 0,
                producer: CoreType::Int32,
                consumer: CoreType::Int64,
            }
        );
    }

    #[test]
    fn nullability_cannot_be_tightened() {
        let producer_shapes = shapes(&[(CoreType::Int32, false)]);
        let blob = encode_cursor(&producer_shapes, &[ScalarValue::Int32(1)], &[]);
        let consumer = shapes(&[(CoreType::Int32, true)]);
        assert_eq!(
            decode_cursor(&blob, &consumer).unwrap_err(),
            DecodeError::NullabilityTightened { index: 0 }
        );
    }

    #[test]
    fn bool_after_absent_nullable_bool_reads_its_own_bit() {
        // Two nullable bools, col0 absent (null), col1 present and true.
        // encode_cursor reserves a value bit for both bools regardless of
        // presence, so col1's bit must land at nullable_count + 1, not + 0.
        let shapes = shapes(&[(CoreType::Bool, false), (CoreType::Bool, false)]);
        let refs: Vec<Option<RefValue>> = vec![];
        let scalars = [ScalarValue::Null, ScalarValue::Bool(true)];
        let blob = encode_cursor(&shapes, &scalars, &refs);
        let decoded = decode_cursor(&blob, &shapes).unwrap();
        assert!(matches!(decoded.columns[0], DecodedColumn::Scalar(ScalarValue::Null)));
        match decoded.columns[1] {
            DecodedColumn::Scalar(ScalarValue::Bool(true)) => {}
            ref other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_column_cursor_round_trips_to_empty_has_row_true() {
        let blob = encode_cursor(&[], &[], &[]);
        assert_eq!(blob, vec![0u8]);
        let decoded = decode_cursor(&blob, &[]).unwrap();
        assert!(decoded.has_row);
        assert!(decoded.columns.is_empty());
    }

    #[test]
    fn empty_string_and_blob_survive_round_trip_distinct_from_null() {
        let shapes = shapes(&[(CoreType::String, false), (CoreType::Blob, false)]);
        let refs: Vec<Option<RefValue>> = vec![
            Some(RefValue::String(CqlString::new(""))),
            Some(RefValue::Blob(CqlBlob::new(Vec::new()))),
        ];
        let blob = encode_cursor(&shapes, &[], &refs);
        let decoded = decode_cursor(&blob, &shapes).unwrap();
        match &decoded.columns[0] {
            DecodedColumn::Ref(Some(RefValue::String(s))) => assert_eq!(s.as_str(), ""),
            other => panic!("unexpected {other:?}"),
        }
        match &decoded.columns[1] {
            DecodedColumn::Ref(Some(RefValue::Blob(b))) => assert_eq!(b.as_bytes(), b""),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn blob_stream_round_trips_each_index() {
        let blobs = vec![
            encode_cursor(&shapes(&[(CoreType::Int32, true)]), &[ScalarValue::Int32(1)], &[]),
            encode_cursor(&shapes(&[(CoreType::Int32, true)]), &[ScalarValue::Int32(2)], &[]),
            encode_cursor(&shapes(&[(CoreType::Int32, true)]), &[ScalarValue::Int32(3)], &[]),
        ];
        let stream = make_blob_stream(&blobs);
        assert_eq!(blob_stream_count(&stream).unwrap(), 3);
        for (i, original) in blobs.iter().enumerate() {
            assert_eq!(blob_stream_get(&stream, i).unwrap(), original.as_slice());
        }
        assert!(blob_stream_get(&stream, 3).is_err());
    }

    #[test_case(42i64, "matches a positive int32"; "positive")]
    #[test_case(-42i64, "matches a negative int32"; "negative")]
    #[test_case(0i64, "matches zero"; "zero")]
    #[test_case(i64::from(i32::MAX), "matches i32::MAX"; "max")]
    #[test_case(i64::from(i32::MIN), "matches i32::MIN"; "min")]
    fn zigzag_int32_round_trips(value: i64, _why: &str) {
        let shapes = shapes(&[(CoreType::Int32, true)]);
        let blob = encode_cursor(&shapes, &[ScalarValue::Int32(value as i32)], &[]);
        let decoded = decode_cursor(&blob, &shapes).unwrap();
        match decoded.columns[0] {
            DecodedColumn::Scalar(ScalarValue::Int32(v)) => assert_eq!(i64::from(v), value),
            ref other => panic!("unexpected {other:?}"),
        }
    }
}
