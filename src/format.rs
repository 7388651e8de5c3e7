//! Human-readable rendering and first-difference reporting for cursors,
//! per spec.md §4.K. Grounded on `cql_cursor_format`/`cql_cursor_diff_*`
//! in `original_source/sources/cqlrt_common.c`.

use crate::cursor::{CoreType, DynamicCursor, ScalarValue};
use crate::value::RefValue;

fn format_scalar(v: ScalarValue) -> String {
    match v {
        ScalarValue::Null => "null".to_string(),
        ScalarValue::Bool(b) => b.to_string(),
        ScalarValue::Int32(i) => i.to_string(),
        ScalarValue::Int64(i) => i.to_string(),
        ScalarValue::Double(d) => format!("{d}"),
    }
}

fn format_ref(v: &Option<RefValue>) -> String {
    match v {
        None => "null".to_string(),
        Some(RefValue::String(s)) => s.as_str().to_string(),
        Some(RefValue::Blob(b)) => format!("length {} blob", b.len()),
        Some(RefValue::Object(_)) => "generic object".to_string(),
        Some(RefValue::ResultSet(_)) => "generic object".to_string(),
    }
}

fn format_column(c: &DynamicCursor, i: usize) -> String {
    let core = c.types[i].core();
    if core.is_reference() {
        let slot = c.types[..i].iter().filter(|t| t.core().is_reference()).count();
        format_ref(&c.refs[slot])
    } else {
        let slot = c.types[..i].iter().filter(|t| !t.core().is_reference()).count();
        format_scalar(c.scalars[slot])
    }
}

/// Renders `name1:value1|name2:value2|...` for every column of `c`, or
/// an empty string for a cursor with no columns.
pub fn cursor_format(c: &DynamicCursor) -> String {
    let mut out = String::new();
    for i in 0..c.column_count() {
        if i != 0 {
            out.push('|');
        }
        out.push_str(c.fields[i]);
        out.push(':');
        out.push_str(&format_column(c, i));
    }
    out
}

fn columns_equal(c1: &DynamicCursor, c2: &DynamicCursor, i: usize) -> bool {
    let core = c1.types[i].core();
    debug_assert_eq!(core, c2.types[i].core(), "diff requires identical shapes");
    if core.is_reference() {
        let slot = c1.types[..i].iter().filter(|t| t.core().is_reference()).count();
        crate::value::ref_equal_opt(&c1.refs[slot], &c2.refs[slot])
    } else {
        let slot = c1.types[..i].iter().filter(|t| !t.core().is_reference()).count();
        c1.scalars[slot] == c2.scalars[slot]
    }
}

/// `-2` if `has_row` differs between the two cursors; `-1` if both are
/// empty or every column is equal; otherwise the zero-based index of the
/// first differing column. Both cursors must share the same shape.
pub fn cursor_diff_index(c1: &DynamicCursor, c2: &DynamicCursor) -> i32 {
    if c1.has_row != c2.has_row {
        return -2;
    }
    if !c1.has_row {
        return -1;
    }
    assert_eq!(c1.column_count(), c2.column_count(), "diff requires identical shapes");
    for i in 0..c1.column_count() {
        if !columns_equal(c1, c2, i) {
            return i as i32;
        }
    }
    -1
}

const HAS_ROW_SENTINEL: &str = "_has_row_";

/// The name of the first differing column, the sentinel `"_has_row_"` if
/// the cursors differ in whether they have a row at all, or `None` if
/// they're equal.
pub fn cursor_diff_col(c1: &DynamicCursor, c2: &DynamicCursor) -> Option<String> {
    match cursor_diff_index(c1, c2) {
        i if i >= 0 => Some(c1.fields[i as usize].to_string()),
        -2 => Some(HAS_ROW_SENTINEL.to_string()),
        _ => None,
    }
}

/// `column:<name> c1:<v1> c2:<v2>` for the first differing column (or
/// the has-row sentinel), or `None` if the cursors are equal.
pub fn cursor_diff_val(c1: &DynamicCursor, c2: &DynamicCursor) -> Option<String> {
    match cursor_diff_index(c1, c2) {
        i if i >= 0 => {
            let idx = i as usize;
            Some(format!(
                "column:{} c1:{} c2:{}",
                c1.fields[idx],
                format_column(c1, idx),
                format_column(c2, idx)
            ))
        }
        -2 => Some(format!(
            "column:{HAS_ROW_SENTINEL} c1:{} c2:{}",
            c1.has_row, c2.has_row
        )),
        _ => None,
    }
}

/// Advisory encode/decode hook points for privacy-tooling-style column
/// encoding (spec.md §9 "Encoded columns"). The runtime exposes only the
/// hook *points*; the naive default bodies (bit-flip/byte-swap/
/// append-sentinel) are test fixtures, not part of the public API.
pub trait ColumnEncoder {
    fn encode_bool(&self, v: bool) -> bool;
    fn decode_bool(&self, v: bool) -> bool;
    fn encode_int32(&self, v: i32) -> i32;
    fn decode_int32(&self, v: i32) -> i32;
    fn encode_int64(&self, v: i64) -> i64;
    fn decode_int64(&self, v: i64) -> i64;
    fn encode_double(&self, v: f64) -> f64;
    fn decode_double(&self, v: f64) -> f64;
    fn encode_string(&self, v: &str) -> String;
    fn decode_string(&self, v: &str) -> String;
    fn encode_blob(&self, v: &[u8]) -> Vec<u8>;
    fn decode_blob(&self, v: &[u8]) -> Vec<u8>;
}

#[cfg(test)]
pub mod encoders {
    //! Naive default encode/decode hooks used purely as test fixtures,
    //! per Design Note 9: "the runtime provides naive defaults (bit-flip,
    //! byte-swap, append-sentinel) purely as test fixtures."
    use super::ColumnEncoder;

    pub struct NaiveEncoder;

    impl ColumnEncoder for NaiveEncoder {
        fn encode_bool(&self, v: bool) -> bool {
            !v
        }
        fn decode_bool(&self, v: bool) -> bool {
            !v
        }
        fn encode_int32(&self, v: i32) -> i32 {
            v.swap_bytes()
        }
        fn decode_int32(&self, v: i32) -> i32 {
            v.swap_bytes()
        }
        fn encode_int64(&self, v: i64) -> i64 {
            v.swap_bytes()
        }
        fn decode_int64(&self, v: i64) -> i64 {
            v.swap_bytes()
        }
        fn encode_double(&self, v: f64) -> f64 {
            f64::from_bits(v.to_bits().swap_bytes())
        }
        fn decode_double(&self, v: f64) -> f64 {
            f64::from_bits(v.to_bits().swap_bytes())
        }
        fn encode_string(&self, v: &str) -> String {
            format!("{v}\u{1}")
        }
        fn decode_string(&self, v: &str) -> String {
            v.strip_suffix('\u{1}').unwrap_or(v).to_string()
        }
        fn encode_blob(&self, v: &[u8]) -> Vec<u8> {
            let mut out = v.to_vec();
            out.push(1);
            out
        }
        fn decode_blob(&self, v: &[u8]) -> Vec<u8> {
            let mut out = v.to_vec();
            out.pop();
            out
        }
    }

    #[test]
    fn bit_flip_bool_round_trips() {
        let e = NaiveEncoder;
        assert!(e.decode_bool(e.encode_bool(true)));
        assert!(!e.decode_bool(e.encode_bool(false)));
    }

    #[test]
    fn byte_swap_int_round_trips() {
        let e = NaiveEncoder;
        assert_eq!(e.decode_int64(e.encode_int64(123456789)), 123456789);
    }

    #[test]
    fn append_sentinel_string_round_trips() {
        let e = NaiveEncoder;
        assert_eq!(e.decode_string(&e.encode_string("hi")), "hi");
    }
}
