//! # Generic In-Memory Store
//!
//! Thread-safe, cloneable keyed store. All operations are synchronous
//! (the RwLock is `parking_lot`, not `tokio::sync`) because the lock is
//! never held across `.await` points. `parking_lot::RwLock` is
//! non-poisonable — a panicking writer does not permanently corrupt the
//! store.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

/// Thread-safe, cloneable in-memory key-value store.
#[derive(Debug)]
pub struct Store<K: Eq + Hash + Copy, T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K: Eq + Hash + Copy, T: Clone + Send + Sync> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Copy, T: Clone + Send + Sync> Store<K, T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// List records matching a predicate.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Update a record in place. Returns the updated record, or `None`
    /// if not found.
    pub fn update(&self, id: &K, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure receives a `&mut T` and may inspect the current
    /// state, validate preconditions, mutate the record, and return
    /// `Ok(R)` or `Err(E)`. The entire operation runs under a single
    /// write lock, eliminating TOCTOU races between read and update —
    /// this is the compare-and-set primitive the booking transitions
    /// are built on.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)`
    /// with the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &K) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Copy, T: Clone + Send + Sync> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_update() {
        let store: Store<u32, String> = Store::new();
        assert!(store.insert(1, "a".into()).is_none());
        assert_eq!(store.get(&1), Some("a".into()));

        let updated = store.update(&1, |v| v.push('b'));
        assert_eq!(updated, Some("ab".into()));
        assert!(store.update(&2, |_| ()).is_none());
    }

    #[test]
    fn try_update_propagates_closure_result() {
        let store: Store<u32, i64> = Store::new();
        store.insert(7, 10);

        let ok: Option<Result<i64, &str>> = store.try_update(&7, |v| {
            *v += 1;
            Ok(*v)
        });
        assert_eq!(ok, Some(Ok(11)));

        let rejected: Option<Result<(), &str>> = store.try_update(&7, |v| {
            if *v > 10 {
                Err("too big")
            } else {
                *v += 1;
                Ok(())
            }
        });
        assert_eq!(rejected, Some(Err("too big")));
        assert_eq!(store.get(&7), Some(11));

        let missing: Option<Result<(), &str>> = store.try_update(&99, |_| Ok(()));
        assert!(missing.is_none());
    }

    #[test]
    fn filter_selects_matching() {
        let store: Store<u32, i64> = Store::new();
        for i in 0..10 {
            store.insert(i, i64::from(i));
        }
        let evens = store.filter(|v| v % 2 == 0);
        assert_eq!(evens.len(), 5);
    }

    #[test]
    fn clones_share_data() {
        let store: Store<u32, i64> = Store::new();
        let clone = store.clone();
        store.insert(1, 42);
        assert_eq!(clone.get(&1), Some(42));
    }
}
