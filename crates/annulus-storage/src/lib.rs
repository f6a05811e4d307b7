//! # annulus-storage: the local storage seam
//!
//! The coordination engine in `annulus-core` never touches a concrete
//! storage engine directly — it only depends on the [`KvStorage`] trait.
//! This crate supplies that trait plus [`MemoryStorage`], a `HashMap`-backed
//! reference implementation used by the simulation harness and by any
//! single-process deployment that does not need durability across restarts.
//!
//! A production deployment is expected to provide its own `KvStorage`
//! implementation (an LSM tree, a `sled` database, whatever fits) without
//! touching `annulus-core`.

use std::collections::HashMap;

use annulus_types::{Entry, ReplicaType};

/// The local key-value storage interface THE CORE depends on (§6).
///
/// Implementations are not expected to be thread-safe on their own; the
/// core only ever calls them from within a single node's `tick()`.
pub trait KvStorage {
    /// Inserts `key` with `entry`. Returns `false` without modifying
    /// storage if `key` is already present.
    fn create(&mut self, key: &str, entry: Entry) -> bool;

    /// Returns the entry for `key`, or `None` if absent.
    fn read(&self, key: &str) -> Option<&Entry>;

    /// Overwrites `key`'s entry. Returns `true` iff `key` was present.
    fn update(&mut self, key: &str, entry: Entry) -> bool;

    /// Removes `key`. Returns `true` iff `key` was present.
    fn delete(&mut self, key: &str) -> bool;

    /// True iff storage holds no keys.
    fn is_empty(&self) -> bool;

    /// Iterates over the locally-held entries whose replica type is
    /// [`ReplicaType::Primary`] — the set stabilization re-replicates.
    fn primary_entries(&self) -> Box<dyn Iterator<Item = (&str, &Entry)> + '_>;
}

/// An in-memory [`KvStorage`] backed by a `HashMap`. No persistence: the
/// contents are lost when the node process exits, which matches the scope
/// of this engine's in-process simulation harness.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, Entry>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl KvStorage for MemoryStorage {
    fn create(&mut self, key: &str, entry: Entry) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_string(), entry);
        true
    }

    fn read(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    fn update(&mut self, key: &str, entry: Entry) -> bool {
        if !self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_string(), entry);
        true
    }

    fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn primary_entries(&self) -> Box<dyn Iterator<Item = (&str, &Entry)> + '_> {
        Box::new(
            self.entries
                .iter()
                .filter(|(_, e)| e.replica == ReplicaType::Primary)
                .map(|(k, v)| (k.as_str(), v)),
        )
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Whatever value is created for a key is exactly what a subsequent
        /// read returns, for any key/value pair.
        #[test]
        fn create_then_read_round_trips_for_arbitrary_key_and_value(
            key in "[a-zA-Z0-9_]{1,16}",
            value in "[a-zA-Z0-9_]{0,32}",
        ) {
            let mut s = MemoryStorage::new();
            prop_assert!(s.create(&key, Entry::new(value.clone(), 0, ReplicaType::Primary)));
            prop_assert_eq!(&s.read(&key).unwrap().value, &value);
        }

        /// Overwriting an existing key via `update` replaces its value, and
        /// deleting it afterward always leaves it absent.
        #[test]
        fn update_then_delete_leaves_no_trace(
            key in "[a-zA-Z0-9_]{1,16}",
            first in "[a-zA-Z0-9_]{0,32}",
            second in "[a-zA-Z0-9_]{0,32}",
        ) {
            let mut s = MemoryStorage::new();
            s.create(&key, Entry::new(first, 0, ReplicaType::Primary));
            prop_assert!(s.update(&key, Entry::new(second.clone(), 0, ReplicaType::Primary)));
            prop_assert_eq!(&s.read(&key).unwrap().value, &second);
            prop_assert!(s.delete(&key));
            prop_assert!(s.read(&key).is_none());
        }
    }
}
