//! Key directory implementation
//!
//! HashMap for point lookups plus a lazily sorted Vec for ordered search.

use std::collections::HashMap;

use super::DirEntry;

/// Live keys and their directory entries
#[derive(Debug)]
pub struct KeyDir {
    entries: HashMap<Vec<u8>, DirEntry>,

    /// Raw bytes of every live key, exactly once each
    keys: Vec<Vec<u8>>,

    /// Whether `keys` is currently in unsigned byte order
    sorted: bool,
}

impl KeyDir {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            keys: Vec::new(),
            sorted: true,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &[u8]) -> Option<&DirEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace the entry for `key`, returning the previous one.
    ///
    /// New keys are appended to the key list without sorting.
    pub fn insert(&mut self, key: Vec<u8>, entry: DirEntry) -> Option<DirEntry> {
        if let Some(slot) = self.entries.get_mut(&key) {
            return Some(std::mem::replace(slot, entry));
        }

        if self.sorted {
            if let Some(last) = self.keys.last() {
                if key < *last {
                    self.sorted = false;
                }
            }
        }
        self.keys.push(key.clone());
        self.entries.insert(key, entry);
        None
    }

    /// Drop `key` from both the map and the key list
    pub fn remove(&mut self, key: &[u8]) -> Option<DirEntry> {
        let entry = self.entries.remove(key)?;
        if let Some(pos) = self.find_exact(key) {
            self.keys.remove(pos);
        }
        Some(entry)
    }

    /// Sort the key list if an insert left it out of order
    pub fn ensure_sorted(&mut self) {
        if !self.sorted {
            self.keys.sort_unstable();
            self.sorted = true;
        }
    }

    /// Whether the next search will have to sort first
    pub fn needs_sort(&self) -> bool {
        !self.sorted
    }

    /// The key list in ascending byte order
    pub fn sorted_keys(&mut self) -> &[Vec<u8>] {
        self.ensure_sorted();
        &self.keys
    }

    /// Position of `key` in the sorted key list
    pub fn find_exact(&mut self, key: &[u8]) -> Option<usize> {
        self.ensure_sorted();
        self.keys.binary_search_by(|k| k.as_slice().cmp(key)).ok()
    }

    /// Start position for a prefix scan.
    ///
    /// Ascending: the first key >= `prefix`, by binary search.
    /// Descending: the last key starting with `prefix`, by scanning back from
    /// the tail. Either way `None` unless that key actually starts with `prefix`.
    pub fn find_prefix(&mut self, prefix: &[u8], ascending: bool) -> Option<usize> {
        self.ensure_sorted();
        if ascending {
            let pos = self.keys.partition_point(|k| k.as_slice() < prefix);
            match self.keys.get(pos) {
                Some(k) if k.starts_with(prefix) => Some(pos),
                _ => None,
            }
        } else {
            self.keys.iter().rposition(|k| k.starts_with(prefix))
        }
    }

    /// Iterate over live keys and their entries in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &DirEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_slice(), e))
    }
}

impl Default for KeyDir {
    fn default() -> Self {
        Self::new()
    }
}
