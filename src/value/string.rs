use std::cell::RefCell;
use std::collections::HashMap;

use crate::hash::djb2;
use crate::refcount::Ref;

thread_local! {
    /// Backs [`CqlString::literal`]: the C runtime gives string literals a
    /// sentinel ref-count that prevents deallocation so repeated uses of
    /// the same literal never re-allocate; `Ref`'s ordinary `Rc` accounting
    /// makes the sentinel unnecessary; this cache gets the "never
    /// re-allocate the same literal" behavior back instead. Thread-local
    /// (not a shared `OnceLock`) because `Ref` is `Rc`-backed and the
    /// runtime is single-threaded per connection by design (spec.md §5).
    static LITERALS: RefCell<HashMap<&'static str, Ref<CqlString>>> = RefCell::new(HashMap::new());
}

/// An immutable, UTF-8 byte sequence. Equality is byte-wise (`strcmp`
/// semantics on the original C type); ordering is byte-wise; hash is
/// DJB2 over the bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CqlString(String);

impl CqlString {
    pub fn new(value: impl Into<String>) -> Ref<CqlString> {
        Ref::new(CqlString(value.into()))
    }

    /// Returns an interned handle for a `&'static str` literal: the first
    /// call for a given literal allocates it once, every later call for
    /// the same literal returns a retained clone of that one allocation.
    /// This is the Rust substitute for the C runtime's sentinel-ref-count
    /// string literals (`cql_string_literal`), which exist purely so a
    /// literal used in a hot loop isn't re-copied on every use.
    pub fn literal(value: &'static str) -> Ref<CqlString> {
        LITERALS.with(|cache| {
            cache
                .borrow_mut()
                .entry(value)
                .or_insert_with(|| CqlString::new(value))
                .clone()
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn hash(&self) -> u64 {
        djb2(self.0.as_bytes())
    }

    /// Delegates to a SQL `LIKE` pattern match. The runtime does not
    /// implement its own pattern matcher: this is explicitly a thin
    /// wrapper around the caller-supplied matcher (the embedded engine's
    /// own `LIKE` semantics), matching the design's "a LIKE helper
    /// delegates to the engine's pattern matcher".
    pub fn like(&self, pattern: &str, matcher: impl Fn(&str, &str) -> bool) -> bool {
        matcher(&self.0, pattern)
    }
}

impl std::fmt::Display for CqlString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `string_equal(nil, nil) = true`; either-nil-but-not-both is `false`;
/// both non-nil falls back to `==`.
pub fn string_equal(a: Option<&Ref<CqlString>>, b: Option<&Ref<CqlString>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.as_str() == b.as_str(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_safety_contract() {
        let s = CqlString::new("x");
        assert!(string_equal(None, None));
        assert!(!string_equal(Some(&s), None));
        assert!(!string_equal(None, Some(&s)));
        assert!(string_equal(Some(&s), Some(&s)));
    }

    #[test]
    fn equality_and_ordering_are_byte_wise() {
        let a = CqlString::new("abc");
        let b = CqlString::new("abd");
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn hash_is_djb2_over_bytes() {
        let s = CqlString::new("hello");
        assert_eq!(s.hash(), djb2(b"hello"));
    }

    #[test]
    fn literal_interns_the_same_allocation() {
        let a = CqlString::literal("schema_version");
        let b = CqlString::literal("schema_version");
        assert!(Ref::ptr_eq(&a, &b));
        let c = CqlString::literal("other");
        assert!(!Ref::ptr_eq(&a, &c));
    }
}
