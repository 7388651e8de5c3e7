//! The closed (open-addressing, linear-probing, tombstone-free) hash map
//! that backs every dictionary specialization in [`crate::containers`].
//!
//! Grounded on `symtab_add`/`symtab_find`/`symtab_rehash` in
//! `original_source/sources/symtab.c`: same probing discipline, same
//! "insert-only for the compiler's lifetime" simplification (no deletes,
//! so rehash never has to skip tombstones), same load-factor threshold.
//! The six callbacks spec.md §3 describes (key hash, key compare, key
//! retain, value retain, key release, value release) become, in Rust,
//! two caller-supplied function pointers (hash, compare) plus ordinary
//! `Clone`/`Drop` for retain/release — the same substitution
//! [`crate::refcount::Ref`] makes for the ref-count core.

const INIT_CAPACITY: usize = 4;
const LOAD_FACTOR_NUM: usize = 3;
const LOAD_FACTOR_DEN: usize = 4;

/// Hashes a key to a 64-bit value. Keys with equal `cmp` must hash equal.
pub type HashFn<K> = fn(&K) -> u64;
/// `true` iff `a` and `b` denote the same key.
pub type CmpFn<K> = fn(&K, &K) -> bool;

/// A closed hash map over `(K, V)` pairs. Never deletes a key once
/// inserted; `rehash` grows capacity and re-inserts every live entry.
pub struct ClosedHashMap<K, V> {
    hash_fn: HashFn<K>,
    cmp_fn: CmpFn<K>,
    slots: Vec<Option<(K, V)>>,
    count: usize,
}

impl<K: Clone, V> ClosedHashMap<K, V> {
    pub fn new(hash_fn: HashFn<K>, cmp_fn: CmpFn<K>) -> Self {
        ClosedHashMap {
            hash_fn,
            cmp_fn,
            slots: (0..INIT_CAPACITY).map(|_| None).collect(),
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn probe_from(&self, key: &K) -> usize {
        (self.hash_fn)(key) as usize % self.slots.len()
    }

    /// Inserts `key -> value` and returns `true`, or returns `false`
    /// without modifying the map if `key` is already present.
    pub fn add(&mut self, key: K, value: V) -> bool {
        if self.add_inner(key, value) {
            if self.count * LOAD_FACTOR_DEN > self.slots.len() * LOAD_FACTOR_NUM {
                self.rehash();
            }
            true
        } else {
            false
        }
    }

    fn add_inner(&mut self, key: K, value: V) -> bool {
        let mut offset = self.probe_from(&key);
        loop {
            match &self.slots[offset] {
                None => {
                    self.slots[offset] = Some((key, value));
                    self.count += 1;
                    return true;
                }
                Some((existing, _)) if (self.cmp_fn)(existing, &key) => return false,
                Some(_) => {
                    offset = (offset + 1) % self.slots.len();
                }
            }
        }
    }

    /// Inserts or replaces the value for `key`, retaining the old key on
    /// an update (the value's prior owner is dropped, which is this
    /// crate's substitute for explicit value release).
    pub fn upsert(&mut self, key: K, value: V) {
        if let Some(slot) = self.find_slot_mut(&key) {
            slot.1 = value;
            return;
        }
        self.add(key, value);
    }

    fn find_slot_mut(&mut self, key: &K) -> Option<&mut (K, V)> {
        let mut offset = self.probe_from(key);
        let start = offset;
        loop {
            match &self.slots[offset] {
                None => return None,
                Some((existing, _)) if (self.cmp_fn)(existing, key) => {
                    return self.slots[offset].as_mut();
                }
                _ => {
                    offset = (offset + 1) % self.slots.len();
                    if offset == start {
                        return None;
                    }
                }
            }
        }
    }

    pub fn find(&self, key: &K) -> Option<&V> {
        let mut offset = self.probe_from(key);
        let start = offset;
        loop {
            match &self.slots[offset] {
                None => return None,
                Some((existing, value)) if (self.cmp_fn)(existing, key) => return Some(value),
                _ => {
                    offset = (offset + 1) % self.slots.len();
                    if offset == start {
                        return None;
                    }
                }
            }
        }
    }

    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        self.find_slot_mut(key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    fn rehash(&mut self) {
        let old_capacity = self.slots.len();
        let old_slots = std::mem::replace(
            &mut self.slots,
            (0..old_capacity * 2).map(|_| None).collect(),
        );
        self.count = 0;
        for slot in old_slots.into_iter().flatten() {
            self.add_inner(slot.0, slot.1);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, V)> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn djb2_str(s: &String) -> u64 {
        crate::hash::djb2(s.as_bytes())
    }

    fn eq_str(a: &String, b: &String) -> bool {
        a == b
    }

    #[test]
    fn add_rejects_duplicate_keys() {
        let mut m: ClosedHashMap<String, i64> = ClosedHashMap::new(djb2_str, eq_str);
        assert!(m.add("a".into(), 1));
        assert!(!m.add("a".into(), 2));
        assert_eq!(m.find(&"a".into()), Some(&1));
    }

    #[test]
    fn upsert_replaces_existing_value() {
        let mut m: ClosedHashMap<String, i64> = ClosedHashMap::new(djb2_str, eq_str);
        m.upsert("a".into(), 1);
        m.upsert("a".into(), 2);
        assert_eq!(m.find(&"a".into()), Some(&2));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn all_inserted_keys_are_findable_after_rehashing_twice() {
        let mut m: ClosedHashMap<String, i64> = ClosedHashMap::new(djb2_str, eq_str);
        let keys: Vec<String> = (0..40).map(|i| format!("key{i}")).collect();
        for (i, k) in keys.iter().enumerate() {
            assert!(m.add(k.clone(), i as i64));
        }
        assert!(m.capacity() >= 40, "capacity should have grown past the initial size");
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(m.find(k), Some(&(i as i64)));
        }
    }

    #[test]
    fn missing_key_is_not_found() {
        let m: ClosedHashMap<String, i64> = ClosedHashMap::new(djb2_str, eq_str);
        assert_eq!(m.find(&"nope".to_string()), None);
    }
}
