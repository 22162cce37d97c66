//! Name and arity keyed lookup tables.

use std::sync::Arc;

use rustc_hash::FxHashMap;

/// Entries keyed by `(name, arity)`.
///
/// Names map to a small arity table, so lookups borrow the name instead of
/// building an owned key.
pub struct BindingTable<T> {
    entries: FxHashMap<String, FxHashMap<usize, Arc<T>>>,
    len: usize,
}

impl<T> BindingTable<T> {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            len: 0,
        }
    }

    /// Insert an entry. Returns `false`, leaving the table unchanged, if an
    /// entry with the same name and arity exists.
    pub fn insert(&mut self, name: &str, arity: usize, entry: Arc<T>) -> bool {
        let by_arity = self.entries.entry(name.to_string()).or_default();
        if by_arity.contains_key(&arity) {
            return false;
        }
        by_arity.insert(arity, entry);
        self.len += 1;
        true
    }

    pub fn get(&self, name: &str, arity: usize) -> Option<&Arc<T>> {
        self.entries.get(name)?.get(&arity)
    }

    pub fn contains(&self, name: &str, arity: usize) -> bool {
        self.get(name, arity).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over all entries, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.values().flat_map(|by_arity| by_arity.values())
    }
}

impl<T> Default for BindingTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_different_arity() {
        let mut table = BindingTable::new();
        assert!(table.insert("f", 1, Arc::new("one")));
        assert!(table.insert("f", 2, Arc::new("two")));

        assert_eq!(table.get("f", 1).map(|e| **e), Some("one"));
        assert_eq!(table.get("f", 2).map(|e| **e), Some("two"));
        assert!(table.get("f", 3).is_none());
        assert!(table.get("g", 1).is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut table = BindingTable::new();
        assert!(table.insert("f", 1, Arc::new(1)));
        assert!(!table.insert("f", 1, Arc::new(2)));
        assert_eq!(table.get("f", 1).map(|e| **e), Some(1));
        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().count(), 1);
    }
}
