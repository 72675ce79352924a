// src/wiki/cache.rs
//! Disk-backed cache store for the sync engine.
//!
//! Each namespace persists as one JSON file under the temp-data
//! directory, loaded when the batcher starts and fully rewritten on
//! every save. There is no eviction and no TTL: staleness is controlled
//! by the caller, either through the batcher's cache-bypass flag or the
//! full-recrawl threshold.

use super::identity::IdentityMap;
use super::types::CategoryMember;
use crate::constants::{
    CAT_MEMBERS_FILENAME, CONTENTS_FILENAME, IMAGE_URLS_FILENAME, MISSING_PAGES_FILENAME,
    PAGES_FILENAME, PAGE_CATS_FILENAME,
};
use crate::error::Result;
use crate::types::PageId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The in-memory data namespaces.
#[derive(Debug, Default)]
pub struct Caches {
    pub contents: HashMap<PageId, String>,
    pub categories: HashMap<PageId, Vec<PageId>>,
    pub images: HashMap<PageId, String>,
    pub members: HashMap<PageId, Vec<CategoryMember>>,
}

impl Caches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.contents.clear();
        self.categories.clear();
        self.images.clear();
        self.members.clear();
    }
}

#[derive(Serialize, Deserialize)]
struct PageRecord {
    id: PageId,
    name: String,
}

/// The on-disk home of the cache namespaces.
pub struct CacheDir {
    dir: PathBuf,
}

impl CacheDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Loads every namespace. Missing files yield empty caches; a
    /// corrupt file is logged and treated as empty rather than aborting
    /// the run — a broken cache never prevents fresh fetches.
    pub fn load(&self) -> (Caches, IdentityMap) {
        let mut caches = Caches::new();
        let mut identity = IdentityMap::new();

        if let Some(pages) = self.read_file::<Vec<PageRecord>>(PAGES_FILENAME) {
            for page in pages {
                identity.record(page.id, &page.name);
            }
        }
        if let Some(missing) = self.read_file::<Vec<String>>(MISSING_PAGES_FILENAME) {
            for key in missing {
                identity.restore_missing(key);
            }
        }
        if let Some(contents) = self.read_file(CONTENTS_FILENAME) {
            caches.contents = contents;
        }
        if let Some(categories) = self.read_file(PAGE_CATS_FILENAME) {
            caches.categories = categories;
        }
        if let Some(members) = self.read_file(CAT_MEMBERS_FILENAME) {
            caches.members = members;
        }
        if let Some(images) = self.read_file(IMAGE_URLS_FILENAME) {
            caches.images = images;
        }

        (caches, identity)
    }

    /// Writes every namespace back out, creating the directory on first
    /// save. Full rewrites: re-saving unchanged state reproduces the
    /// same logical content.
    pub fn save(&self, caches: &Caches, identity: &IdentityMap) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let pages: Vec<PageRecord> = identity
            .entries()
            .map(|(id, name)| PageRecord {
                id,
                name: name.to_string(),
            })
            .collect();
        self.write_file(PAGES_FILENAME, &pages)?;

        let missing: Vec<&str> = identity.missing_entries().collect();
        self.write_file(MISSING_PAGES_FILENAME, &missing)?;

        self.write_file(CONTENTS_FILENAME, &caches.contents)?;
        self.write_file(PAGE_CATS_FILENAME, &caches.categories)?;
        self.write_file(CAT_MEMBERS_FILENAME, &caches.members)?;
        self.write_file(IMAGE_URLS_FILENAME, &caches.images)?;
        Ok(())
    }

    fn read_file<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        let path = self.dir.join(name);
        if !path.exists() {
            return None;
        }
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Could not read cache file {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Corrupt cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_file<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::types::MemberKind;

    #[test]
    fn save_then_load_yields_identical_values() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = CacheDir::new(dir.path());

        let mut caches = Caches::new();
        caches
            .contents
            .insert(PageId(101), "{{CardTable2|name=Example}}".to_string());
        caches
            .categories
            .insert(PageId(101), vec![PageId(7), PageId(8)]);
        caches
            .images
            .insert(PageId(101), "https://img.example/101.png".to_string());
        caches.members.insert(
            PageId(7),
            vec![CategoryMember {
                id: PageId(101),
                title: "Example".to_string(),
                kind: MemberKind::Page,
            }],
        );
        let mut identity = IdentityMap::new();
        identity.record(PageId(101), "Example");
        identity.mark_missing("Nonexistent Page");

        cache_dir.save(&caches, &identity).unwrap();

        let (reloaded, reloaded_identity) = cache_dir.load();
        assert_eq!(reloaded.contents, caches.contents);
        assert_eq!(reloaded.categories, caches.categories);
        assert_eq!(reloaded.images, caches.images);
        assert_eq!(reloaded.members, caches.members);
        assert_eq!(reloaded_identity.id_of("Example"), Some(PageId(101)));
        assert!(reloaded_identity.is_missing(&"Nonexistent Page".into()));
    }

    #[test]
    fn missing_directory_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = CacheDir::new(dir.path().join("never_created"));
        let (caches, identity) = cache_dir.load();
        assert!(caches.contents.is_empty());
        assert_eq!(identity.entries().count(), 0);
    }

    #[test]
    fn resave_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = CacheDir::new(dir.path());
        let mut caches = Caches::new();
        caches.contents.insert(PageId(1), "text".to_string());
        let identity = IdentityMap::new();

        cache_dir.save(&caches, &identity).unwrap();
        let first = fs::read_to_string(dir.path().join(CONTENTS_FILENAME)).unwrap();
        cache_dir.save(&caches, &identity).unwrap();
        let second = fs::read_to_string(dir.path().join(CONTENTS_FILENAME)).unwrap();
        assert_eq!(first, second);
    }
}
