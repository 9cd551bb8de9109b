use listsync_models::{MediaItem, MediaKey};
use std::collections::HashSet;
use std::hash::Hash;

/// Something with an identity that survives across pages and calls
pub trait StableKey {
    type Key: Eq + Hash + Clone;

    fn stable_key(&self) -> Self::Key;
}

impl StableKey for MediaItem {
    type Key = MediaKey;

    fn stable_key(&self) -> MediaKey {
        self.key()
    }
}

/// Tracks which keys have already been accepted while results accumulate
#[derive(Debug)]
pub struct Deduplicator<K> {
    seen: HashSet<K>,
}

impl<K: Eq + Hash + Clone> Deduplicator<K> {
    pub fn new() -> Self {
        Self { seen: HashSet::new() }
    }

    pub fn contains<T: StableKey<Key = K>>(&self, item: &T) -> bool {
        self.seen.contains(&item.stable_key())
    }

    /// True when the item had not been seen before
    pub fn insert<T: StableKey<Key = K>>(&mut self, item: &T) -> bool {
        self.seen.insert(item.stable_key())
    }

    /// Appends the items not seen yet to `out`, keeping their order
    pub fn extend_unique<T: StableKey<Key = K>>(&mut self, out: &mut Vec<T>, items: impl IntoIterator<Item = T>) {
        for item in items {
            if self.insert(&item) {
                out.push(item);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for Deduplicator<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the first occurrence of every key, in input order
pub fn dedup_by_key<T: StableKey>(items: Vec<T>) -> Vec<T> {
    let mut seen = Deduplicator::new();
    let mut unique = Vec::with_capacity(items.len());
    seen.extend_unique(&mut unique, items);
    unique
}
