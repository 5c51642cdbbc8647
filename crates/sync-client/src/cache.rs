//! Ordered local cache keyed by entity id
//!
//! Every entry carries whether it is a local guess (`Optimistic`) or the
//! server's canonical value (`Confirmed`). Lookups, replacements and removals
//! are always by id, so applying the same canonical value twice is a no-op.

use std::cmp::Ordering;

use uuid::Uuid;

use taskflow_core::hackathon::HackathonView;
use taskflow_core::task::TaskView;

/// Anything the cache can key by id.
pub trait Identified {
    fn id(&self) -> Uuid;
}

impl Identified for TaskView {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Identified for HackathonView {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Optimistic,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub state: EntryState,
}

impl<T> Cached<T> {
    pub fn confirmed(value: T) -> Self {
        Self {
            value,
            state: EntryState::Confirmed,
        }
    }

    pub fn optimistic(value: T) -> Self {
        Self {
            value,
            state: EntryState::Optimistic,
        }
    }

    pub fn is_optimistic(&self) -> bool {
        self.state == EntryState::Optimistic
    }
}

/// An entry taken out of the cache, with the position it held.
#[derive(Debug, Clone)]
pub struct Removed<T> {
    pub index: usize,
    pub entry: Cached<T>,
}

#[derive(Debug, Clone)]
pub struct EntityCache<T> {
    entries: Vec<Cached<T>>,
}

impl<T> Default for EntityCache<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Identified + Clone> EntityCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Cached<T>] {
        &self.entries
    }

    pub fn values(&self) -> Vec<T> {
        self.entries.iter().map(|entry| entry.value.clone()).collect()
    }

    pub fn get(&self, id: Uuid) -> Option<&Cached<T>> {
        self.entries.iter().find(|entry| entry.value.id() == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.position(id).is_some()
    }

    /// Drop everything and take `values` as confirmed, in order.
    pub fn replace_all(&mut self, values: Vec<T>) {
        self.entries = values.into_iter().map(Cached::confirmed).collect();
    }

    /// Replace by id, or append when the id is new.
    pub fn upsert(&mut self, entry: Cached<T>) {
        match self.position(entry.value.id()) {
            Some(index) => self.entries[index] = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn upsert_confirmed(&mut self, value: T) {
        self.upsert(Cached::confirmed(value));
    }

    /// Swap a placeholder for the server's entity.
    ///
    /// If the server entity already arrived (a broadcast beat the response),
    /// the placeholder is dropped and the existing entry refreshed instead.
    pub fn confirm_placeholder(&mut self, placeholder: Uuid, value: T) {
        let server_id = value.id();
        if server_id != placeholder && self.contains(server_id) {
            self.remove(placeholder);
            self.upsert_confirmed(value);
            return;
        }
        match self.position(placeholder) {
            Some(index) => self.entries[index] = Cached::confirmed(value),
            None => self.upsert_confirmed(value),
        }
    }

    /// Change an entry in place, marking it optimistic.
    ///
    /// Returns the entry as it was before the change.
    pub fn modify<F>(&mut self, id: Uuid, f: F) -> Option<Cached<T>>
    where
        F: FnOnce(&mut T),
    {
        let index = self.position(id)?;
        let previous = self.entries[index].clone();
        let entry = &mut self.entries[index];
        f(&mut entry.value);
        entry.state = EntryState::Optimistic;
        Some(previous)
    }

    /// Change an entry in place without touching its state.
    pub fn update<F>(&mut self, id: Uuid, f: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        match self.position(id) {
            Some(index) => {
                f(&mut self.entries[index].value);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Removed<T>> {
        let index = self.position(id)?;
        let entry = self.entries.remove(index);
        Some(Removed { index, entry })
    }

    /// Undo an optimistic change.
    ///
    /// Only entries that are still optimistic are rolled back; a confirmed
    /// value that arrived in the meantime wins.
    pub fn revert(&mut self, previous: Cached<T>) {
        if let Some(index) = self.position(previous.value.id()) {
            if self.entries[index].is_optimistic() {
                self.entries[index] = previous;
            }
        }
    }

    /// Put a removed entry back where it was, unless its id reappeared.
    pub fn restore(&mut self, removed: Removed<T>) {
        if self.contains(removed.entry.value.id()) {
            return;
        }
        let index = removed.index.min(self.entries.len());
        self.entries.insert(index, removed.entry);
    }

    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.entries.sort_by(|a, b| compare(&a.value, &b.value));
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.entries.iter().position(|entry| entry.value.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: Uuid,
        label: &'static str,
    }

    impl Identified for Item {
        fn id(&self) -> Uuid {
            self.id
        }
    }

    fn item(label: &'static str) -> Item {
        Item {
            id: Uuid::new_v4(),
            label,
        }
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut cache = EntityCache::new();
        let a = item("a");
        cache.upsert_confirmed(a.clone());
        cache.upsert_confirmed(a.clone());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(a.id).unwrap().value, a);
    }

    #[test]
    fn test_placeholder_replaced_in_place() {
        let mut cache = EntityCache::new();
        let first = item("first");
        let placeholder = item("draft");
        cache.upsert_confirmed(first.clone());
        cache.upsert(Cached::optimistic(placeholder.clone()));

        let server = item("draft");
        cache.confirm_placeholder(placeholder.id, server.clone());

        assert_eq!(cache.values(), vec![first, server.clone()]);
        assert!(!cache.contains(placeholder.id));
        assert_eq!(cache.get(server.id).unwrap().state, EntryState::Confirmed);
    }

    #[test]
    fn test_placeholder_dropped_when_echo_arrived_first() {
        let mut cache = EntityCache::new();
        let placeholder = item("draft");
        cache.upsert(Cached::optimistic(placeholder.clone()));
        let server = item("draft");
        cache.upsert_confirmed(server.clone());

        cache.confirm_placeholder(placeholder.id, server.clone());
        assert_eq!(cache.values(), vec![server]);
    }

    #[test]
    fn test_revert_skips_confirmed_entries() {
        let mut cache = EntityCache::new();
        let a = item("a");
        cache.upsert_confirmed(a.clone());

        let previous = cache.modify(a.id, |value| value.label = "guess").unwrap();
        assert!(cache.get(a.id).unwrap().is_optimistic());
        cache.revert(previous.clone());
        assert_eq!(cache.get(a.id).unwrap().value.label, "a");

        cache.modify(a.id, |value| value.label = "guess").unwrap();
        let canonical = Item {
            id: a.id,
            label: "server",
        };
        cache.upsert_confirmed(canonical.clone());
        cache.revert(previous);
        assert_eq!(cache.get(a.id).unwrap().value, canonical);
    }

    #[test]
    fn test_restore_returns_entry_to_its_slot() {
        let mut cache = EntityCache::new();
        let (a, b, c) = (item("a"), item("b"), item("c"));
        cache.replace_all(vec![a.clone(), b.clone(), c.clone()]);

        let removed = cache.remove(b.id).unwrap();
        assert_eq!(removed.index, 1);
        cache.restore(removed.clone());
        assert_eq!(cache.values(), vec![a, b, c]);

        cache.restore(removed);
        assert_eq!(cache.len(), 3);
    }
}
