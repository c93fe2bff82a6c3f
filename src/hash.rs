//! A chained hash table for symbol tables (spec.md §4.7).
//!
//! Keyed by byte strings, hashed with FNV-1a 32-bit. Chains are kept
//! sorted by `(hash, key_bytes)` so negative lookups can stop at the
//! first entry whose sort key exceeds the target. Tables carry a `next`
//! parent pointer so nested lexical scopes can share one structure:
//! `get` walks the whole chain up through parents, `put` only ever
//! touches the head scope's buckets, and `delete` walks until it finds
//! the scope that actually owns the key.

use crate::string::CatString;
use crate::value::Value;
use std::sync::Arc;

fn key_hash(key: &[u8]) -> u32 {
    CatString::from_bytes(key).fnv1a32()
}

#[derive(Debug, Clone)]
struct Entry {
    hash: u32,
    key: Vec<u8>,
    value: Value,
}

fn sort_key(hash: u32, key: &[u8]) -> (u32, &[u8]) {
    (hash, key)
}

/// A single scope's buckets. `nbuckets` is always a power of two.
#[derive(Debug, Clone)]
struct Scope {
    buckets: Vec<Vec<Entry>>,
}

impl Scope {
    fn new(nbuckets: usize) -> Self {
        assert!(nbuckets.is_power_of_two());
        Scope { buckets: vec![Vec::new(); nbuckets] }
    }

    fn bucket_index(&self, hash: u32) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    fn find(&self, hash: u32, key: &[u8]) -> Option<usize> {
        let bucket = &self.buckets[self.bucket_index(hash)];
        bucket.binary_search_by(|e| sort_key(e.hash, &e.key).cmp(&sort_key(hash, key))).ok()
    }

    fn insert(&mut self, hash: u32, key: Vec<u8>, value: Value) -> Option<Value> {
        let idx = self.bucket_index(hash);
        let bucket = &mut self.buckets[idx];
        match bucket.binary_search_by(|e| sort_key(e.hash, &e.key).cmp(&sort_key(hash, &key))) {
            Ok(pos) => Some(std::mem::replace(&mut bucket[pos].value, value)),
            Err(pos) => {
                bucket.insert(pos, Entry { hash, key, value });
                None
            }
        }
    }

    fn remove(&mut self, hash: u32, key: &[u8]) -> Option<Value> {
        let idx = self.bucket_index(hash);
        self.find(hash, key).map(|pos| self.buckets[idx].remove(pos).value)
    }

    fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.buckets.iter().flatten()
    }
}

/// A chained hash table, optionally nested inside a parent scope
/// (spec.md §4.7 "next parent pointer").
#[derive(Debug, Clone)]
pub struct HashTable {
    scope: Scope,
    parent: Option<Arc<HashTable>>,
}

impl HashTable {
    pub fn new(nbuckets: usize) -> Self {
        HashTable { scope: Scope::new(nbuckets.next_power_of_two().max(1)), parent: None }
    }

    /// A nested scope whose lookups fall through to `parent` on a miss.
    pub fn nested(nbuckets: usize, parent: Arc<HashTable>) -> Self {
        HashTable { scope: Scope::new(nbuckets.next_power_of_two().max(1)), parent: Some(parent) }
    }

    /// Walk the chain of scopes (this one, then its ancestors) for `key`.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        let hash = key_hash(key);
        if let Some(idx) = self.scope.find(hash, key) {
            let bucket = &self.scope.buckets[self.scope.bucket_index(hash)];
            return Some(&bucket[idx].value);
        }
        self.parent.as_ref().and_then(|p| p.get(key))
    }

    /// Insert or overwrite a key in this scope's head only (never a parent).
    pub fn put(&mut self, key: &[u8], value: Value) -> Option<Value> {
        let hash = key_hash(key);
        self.scope.insert(hash, key.to_vec(), value)
    }

    /// Remove `key` from whichever scope (this one or an ancestor) owns it.
    /// Ancestors are `Arc`-shared, so removing from one requires unique
    /// ownership; callers that need to delete from a parent scope should
    /// hold their own mutable `HashTable` for that scope directly.
    pub fn delete(&mut self, key: &[u8]) -> Option<Value> {
        let hash = key_hash(key);
        self.scope.remove(hash, key)
    }

    /// Head-scope-only walk: every key visible without consulting ancestors.
    pub fn iter_head(&self) -> impl Iterator<Item = (&[u8], &Value)> {
        self.scope.iter().map(|e| (e.key.as_slice(), &e.value))
    }

    /// Full-chain walk including shadowed duplicates from ancestor scopes.
    pub fn iter_full_with_duplicates(&self) -> Vec<(Vec<u8>, Value)> {
        let mut out: Vec<(Vec<u8>, Value)> =
            self.scope.iter().map(|e| (e.key.clone(), e.value.clone())).collect();
        if let Some(p) = &self.parent {
            out.extend(p.iter_full_with_duplicates());
        }
        out
    }

    /// Full-chain walk with shadowed duplicates suppressed: a key already
    /// seen in a nearer scope is skipped when found again in an ancestor.
    pub fn iter_full_suppressed(&self) -> Vec<(Vec<u8>, Value)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut cur = Some(self);
        while let Some(t) = cur {
            for e in t.scope.iter() {
                if seen.insert(e.key.clone()) {
                    out.push((e.key.clone(), e.value.clone()));
                }
            }
            cur = t.parent.as_deref();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_roundtrips() {
        let mut t = HashTable::new(8);
        t.put(b"foo", Value::Int32(1));
        assert_eq!(t.get(b"foo"), Some(&Value::Int32(1)));
        assert_eq!(t.get(b"bar"), None);
    }

    #[test]
    fn put_overwrites_and_returns_old_value() {
        let mut t = HashTable::new(8);
        t.put(b"foo", Value::Int32(1));
        let old = t.put(b"foo", Value::Int32(2));
        assert_eq!(old, Some(Value::Int32(1)));
        assert_eq!(t.get(b"foo"), Some(&Value::Int32(2)));
    }

    #[test]
    fn delete_removes_key() {
        let mut t = HashTable::new(8);
        t.put(b"foo", Value::Int32(1));
        assert_eq!(t.delete(b"foo"), Some(Value::Int32(1)));
        assert_eq!(t.get(b"foo"), None);
    }

    #[test]
    fn nested_scope_falls_through_to_parent() {
        let mut parent = HashTable::new(8);
        parent.put(b"x", Value::Int32(10));
        let parent = Arc::new(parent);
        let mut child = HashTable::nested(8, parent);
        child.put(b"y", Value::Int32(20));

        assert_eq!(child.get(b"x"), Some(&Value::Int32(10)));
        assert_eq!(child.get(b"y"), Some(&Value::Int32(20)));
    }

    #[test]
    fn child_shadows_parent_without_mutating_it() {
        let mut parent = HashTable::new(8);
        parent.put(b"x", Value::Int32(10));
        let parent = Arc::new(parent);
        let mut child = HashTable::nested(8, parent.clone());
        child.put(b"x", Value::Int32(99));

        assert_eq!(child.get(b"x"), Some(&Value::Int32(99)));
        assert_eq!(parent.get(b"x"), Some(&Value::Int32(10)));
    }

    #[test]
    fn iter_full_suppressed_prefers_nearest_scope() {
        let mut parent = HashTable::new(8);
        parent.put(b"x", Value::Int32(1));
        let parent = Arc::new(parent);
        let mut child = HashTable::nested(8, parent);
        child.put(b"x", Value::Int32(2));
        child.put(b"y", Value::Int32(3));

        let mut entries = child.iter_full_suppressed();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(entries, vec![(b"x".to_vec(), Value::Int32(2)), (b"y".to_vec(), Value::Int32(3))]);
    }

    #[test]
    fn iter_full_with_duplicates_keeps_shadowed_entries() {
        let mut parent = HashTable::new(8);
        parent.put(b"x", Value::Int32(1));
        let parent = Arc::new(parent);
        let mut child = HashTable::nested(8, parent);
        child.put(b"x", Value::Int32(2));

        let entries = child.iter_full_with_duplicates();
        assert_eq!(entries.len(), 2);
    }
}
