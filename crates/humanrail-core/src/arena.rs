//! Keyed record arena with single-writer-per-key mutation
//!
//! Each record sits behind its own [`Mutex`]; the index is a [`RwLock`] that is
//! only write-locked to insert a new key. Mutations of different keys never
//! contend, and a mutation of one key is serialized against every other
//! mutation of that key. Readers take a cloned snapshot.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Arena of records keyed by `K`
#[derive(Debug)]
pub struct KeyedArena<K, V> {
    index: RwLock<HashMap<K, Arc<Mutex<V>>>>,
}

impl<K, V> Default for KeyedArena<K, V> {
    fn default() -> Self {
        Self {
            index: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> KeyedArena<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under a fresh key. Returns the value back if the key is taken.
    pub fn insert_new(&self, key: K, value: V) -> Result<(), V> {
        let mut index = self.index.write();
        if index.contains_key(&key) {
            return Err(value);
        }
        index.insert(key, Arc::new(Mutex::new(value)));
        Ok(())
    }

    fn slot(&self, key: &K) -> Option<Arc<Mutex<V>>> {
        self.index.read().get(key).cloned()
    }

    /// Whether `key` is present
    pub fn contains(&self, key: &K) -> bool {
        self.index.read().contains_key(key)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// True if the arena holds no records
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Run `f` with shared access to the record.
    pub fn with<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        let slot = self.slot(key)?;
        let guard = slot.lock();
        Some(f(&guard))
    }

    /// Run `f` with exclusive access to the record. This is the only write path.
    pub fn with_mut<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let slot = self.slot(key)?;
        let mut guard = slot.lock();
        Some(f(&mut guard))
    }

    /// Run `f` on the record for `key`, creating it with `init` first if absent.
    pub fn upsert_with<R>(
        &self,
        key: K,
        init: impl FnOnce() -> V,
        f: impl FnOnce(&mut V) -> R,
    ) -> R {
        let slot = match self.slot(&key) {
            Some(slot) => slot,
            None => self
                .index
                .write()
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(init())))
                .clone(),
        };
        let mut guard = slot.lock();
        f(&mut guard)
    }

    /// Keys currently present, in arbitrary order
    pub fn keys(&self) -> Vec<K> {
        self.index.read().keys().cloned().collect()
    }
}

impl<K, V> KeyedArena<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Snapshot of one record
    pub fn get(&self, key: &K) -> Option<V> {
        self.with(key, V::clone)
    }

    /// Snapshots of every record matching `pred`
    pub fn filter_cloned(&self, mut pred: impl FnMut(&V) -> bool) -> Vec<V> {
        let slots: Vec<_> = self.index.read().values().cloned().collect();
        slots
            .iter()
            .filter_map(|slot| {
                let guard = slot.lock();
                pred(&guard).then(|| guard.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_new_rejects_duplicate() {
        let arena = KeyedArena::new();
        assert!(arena.insert_new(1u32, "a").is_ok());
        assert_eq!(arena.insert_new(1u32, "b"), Err("b"));
        assert_eq!(arena.get(&1), Some("a"));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_with_mut_missing_key() {
        let arena: KeyedArena<u32, u64> = KeyedArena::new();
        assert!(arena.with_mut(&7, |v| *v += 1).is_none());
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let arena: KeyedArena<&str, u64> = KeyedArena::new();
        arena.upsert_with("k", || 10, |v| *v += 1);
        arena.upsert_with("k", || 10, |v| *v += 1);
        assert_eq!(arena.get(&"k"), Some(12));
    }

    #[test]
    fn test_concurrent_mutation_is_serialized() {
        let arena: KeyedArena<u8, u64> = KeyedArena::new();
        arena.insert_new(0, 0).unwrap();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        arena.with_mut(&0, |v| *v += 1);
                    }
                });
            }
        });
        assert_eq!(arena.get(&0), Some(8000));
    }

    #[test]
    fn test_filter_cloned() {
        let arena = KeyedArena::new();
        for i in 0..6u32 {
            arena.insert_new(i, i).unwrap();
        }
        let mut evens = arena.filter_cloned(|v| v % 2 == 0);
        evens.sort_unstable();
        assert_eq!(evens, vec![0, 2, 4]);
    }
}
