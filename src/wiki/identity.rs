// src/wiki/identity.rs
//! The resource identity map: a partial bijection between page ids and
//! titles, plus the known-missing set.
//!
//! Ids and titles are cross-registered the moment any API response
//! reveals a pair, and entries are only added within a run. A page is
//! either mapped or known missing, never both.

use super::types::PageKey;
use crate::types::PageId;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct IdentityMap {
    names_to_ids: HashMap<String, PageId>,
    ids_to_names: HashMap<PageId, String>,
    missing: HashSet<String>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an id↔title pair.
    ///
    /// If either half was previously paired with something else, the
    /// stale reverse entry is dropped so the bijection holds: a known
    /// id's title always round-trips to the same id.
    pub fn record(&mut self, id: PageId, title: &str) {
        if let Some(old_title) = self.ids_to_names.get(&id) {
            if old_title != title {
                self.names_to_ids.remove(old_title.as_str());
            }
        }
        if let Some(old_id) = self.names_to_ids.get(title) {
            if *old_id != id {
                self.ids_to_names.remove(old_id);
            }
        }
        self.names_to_ids.insert(title.to_string(), id);
        self.ids_to_names.insert(id, title.to_string());
        self.missing.remove(title);
        self.missing.remove(&id.to_string());
    }

    pub fn id_of(&self, title: &str) -> Option<PageId> {
        self.names_to_ids.get(title).copied()
    }

    pub fn title_of(&self, id: PageId) -> Option<&str> {
        self.ids_to_names.get(&id).map(String::as_str)
    }

    /// Resolves a key to a page id, when one is known.
    pub fn resolve(&self, key: &PageKey) -> Option<PageId> {
        match key {
            PageKey::Id(id) => Some(*id),
            PageKey::Title(title) => self.id_of(title),
        }
    }

    /// Records a page as confirmed absent upstream. A page we have a
    /// mapping for is never marked missing.
    pub fn mark_missing(&mut self, key: &str) {
        if self.names_to_ids.contains_key(key) {
            return;
        }
        if let Ok(id) = key.parse::<i64>() {
            if self.ids_to_names.contains_key(&PageId(id)) {
                return;
            }
        }
        self.missing.insert(key.to_string());
    }

    pub fn is_missing(&self, key: &PageKey) -> bool {
        self.missing.contains(&key.missing_key())
    }

    pub fn entries(&self) -> impl Iterator<Item = (PageId, &str)> {
        self.ids_to_names.iter().map(|(id, t)| (*id, t.as_str()))
    }

    pub fn missing_entries(&self) -> impl Iterator<Item = &str> {
        self.missing.iter().map(String::as_str)
    }

    pub fn restore_missing(&mut self, key: String) {
        self.missing.insert(key);
    }

    pub fn clear_missing(&mut self) {
        self.missing.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_and_title_round_trip() {
        let mut map = IdentityMap::new();
        map.record(PageId(101), "Dark Magician");
        assert_eq!(map.id_of("Dark Magician"), Some(PageId(101)));
        assert_eq!(map.title_of(PageId(101)), Some("Dark Magician"));
        assert_eq!(
            map.id_of(map.title_of(PageId(101)).unwrap()),
            Some(PageId(101))
        );
    }

    #[test]
    fn no_id_maps_to_two_titles() {
        let mut map = IdentityMap::new();
        map.record(PageId(101), "Old Title");
        map.record(PageId(101), "New Title");
        assert_eq!(map.title_of(PageId(101)), Some("New Title"));
        // The stale title no longer resolves.
        assert_eq!(map.id_of("Old Title"), None);
        assert_eq!(map.id_of("New Title"), Some(PageId(101)));
    }

    #[test]
    fn recording_clears_missing_status() {
        let mut map = IdentityMap::new();
        map.mark_missing("Phantom Page");
        assert!(map.is_missing(&PageKey::from("Phantom Page")));
        map.record(PageId(55), "Phantom Page");
        assert!(!map.is_missing(&PageKey::from("Phantom Page")));
    }

    #[test]
    fn known_pages_are_never_marked_missing() {
        let mut map = IdentityMap::new();
        map.record(PageId(55), "Real Page");
        map.mark_missing("Real Page");
        map.mark_missing("55");
        assert!(!map.is_missing(&PageKey::from("Real Page")));
        assert!(!map.is_missing(&PageKey::from(55i64)));
    }
}
