//! Dictionary specializations of [`ClosedHashMap`] exposed to generated
//! code, per spec.md §4.H: facets (schema-migration bookkeeping), and
//! string/long/real/object/blob dictionaries keyed by string.
//!
//! All of them key on a plain `String` hashed with the crate's shared
//! DJB2 routine ([`crate::hash::djb2`]) so that lookups agree with
//! `CqlString::hash` byte-for-byte.

use crate::containers::hash_map::ClosedHashMap;
use crate::refcount::Ref;
use crate::value::{CqlBlob, CqlObject, CqlString};

fn hash_key(key: &String) -> u64 {
    crate::hash::djb2(key.as_bytes())
}

fn eq_key(a: &String, b: &String) -> bool {
    a == b
}

/// `string -> int64` with insert-or-get-existing semantics: a second call
/// for the same key returns the value from the *first* call rather than
/// overwriting it, matching the "suitable for schema-migration
/// bookkeeping" use case in spec.md §4.H (a fact recorded about a name
/// should not change just because it's looked up again).
pub struct Facets(ClosedHashMap<String, i64>);

impl Facets {
    pub fn new() -> Self {
        Facets(ClosedHashMap::new(hash_key, eq_key))
    }

    /// Returns the existing value for `key` if present, otherwise
    /// inserts `value` and returns it.
    pub fn get_or_add(&mut self, key: &str, value: i64) -> i64 {
        if let Some(existing) = self.0.find(&key.to_string()) {
            return *existing;
        }
        self.0.add(key.to_string(), value);
        value
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.0.find(&key.to_string()).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Facets {
    fn default() -> Self {
        Self::new()
    }
}

/// `string -> string`.
pub struct StringDictionary(ClosedHashMap<String, Ref<CqlString>>);

impl StringDictionary {
    pub fn new() -> Self {
        StringDictionary(ClosedHashMap::new(hash_key, eq_key))
    }

    pub fn set(&mut self, key: &str, value: Ref<CqlString>) {
        self.0.upsert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<Ref<CqlString>> {
        self.0.find(&key.to_string()).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for StringDictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// `string -> int64`.
pub struct LongDictionary(ClosedHashMap<String, i64>);

impl LongDictionary {
    pub fn new() -> Self {
        LongDictionary(ClosedHashMap::new(hash_key, eq_key))
    }

    pub fn set(&mut self, key: &str, value: i64) {
        self.0.upsert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.0.find(&key.to_string()).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Default for LongDictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// `string -> double`. Stores the bit pattern in the underlying int64
/// slot, per spec.md §9's "type punning for double in the real
/// dictionary" note: encapsulated here behind `f64::to_bits`/
/// `f64::from_bits` so round-trip equivalence holds without callers ever
/// seeing the bit pattern.
pub struct RealDictionary(ClosedHashMap<String, i64>);

impl RealDictionary {
    pub fn new() -> Self {
        RealDictionary(ClosedHashMap::new(hash_key, eq_key))
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.0.upsert(key.to_string(), value.to_bits() as i64);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0
            .find(&key.to_string())
            .map(|bits| f64::from_bits(*bits as u64))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Default for RealDictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// `string -> object`.
pub struct ObjectDictionary(ClosedHashMap<String, Ref<CqlObject>>);

impl ObjectDictionary {
    pub fn new() -> Self {
        ObjectDictionary(ClosedHashMap::new(hash_key, eq_key))
    }

    pub fn set(&mut self, key: &str, value: Ref<CqlObject>) {
        self.0.upsert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<Ref<CqlObject>> {
        self.0.find(&key.to_string()).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Default for ObjectDictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// `string -> blob`.
pub struct BlobDictionary(ClosedHashMap<String, Ref<CqlBlob>>);

impl BlobDictionary {
    pub fn new() -> Self {
        BlobDictionary(ClosedHashMap::new(hash_key, eq_key))
    }

    pub fn set(&mut self, key: &str, value: Ref<CqlBlob>) {
        self.0.upsert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<Ref<CqlBlob>> {
        self.0.find(&key.to_string()).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Default for BlobDictionary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facets_insert_or_get_existing() {
        let mut f = Facets::new();
        assert_eq!(f.get_or_add("schema_crc", 100), 100);
        // second call with a different value does not overwrite
        assert_eq!(f.get_or_add("schema_crc", 999), 100);
        assert_eq!(f.get("schema_crc"), Some(100));
    }

    #[test]
    fn string_dictionary_overwrites_on_set() {
        let mut d = StringDictionary::new();
        d.set("k", CqlString::new("v1"));
        d.set("k", CqlString::new("v2"));
        assert_eq!(d.get("k").unwrap().as_str(), "v2");
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn real_dictionary_round_trips_bit_pattern() {
        let mut d = RealDictionary::new();
        d.set("pi", std::f64::consts::PI);
        d.set("nan", f64::NAN);
        assert_eq!(d.get("pi"), Some(std::f64::consts::PI));
        assert!(d.get("nan").unwrap().is_nan());
    }

    #[test]
    fn object_dictionary_stores_by_identity() {
        let mut d = ObjectDictionary::new();
        let obj = CqlObject::new(42i64);
        d.set("o", obj.clone());
        assert!(Ref::ptr_eq(&d.get("o").unwrap(), &obj));
    }
}
