// src/store/mod.rs
//! The entity store — every canonical card, set, and series, plus the
//! per-source lookup indices the reconciliation ladders walk.
//!
//! Indices are refreshed on every upsert, so lookups within one run
//! always see entities added earlier in the same run. Persistence is a
//! full rewrite: a card-list file, one JSON per entity, and aggregate
//! arrays for consumers who want a single file.

pub mod reconcile;

use crate::constants::{
    AGGREGATE_DIRNAME, CARDLIST_FILENAME, CARDS_DIRNAME, SETLIST_FILENAME, SETS_DIRNAME,
    SYNC_STATE_FILENAME,
};
use crate::error::{AppError, Result};
use crate::model::{Card, Series, Set};
use crate::types::{CardId, PageId, SeriesId, SetId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Per-source last-successful-sync timestamps.
///
/// A timestamp only advances when its importer finishes without a
/// transport error, so a failed run retries the same window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiki_last_read: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yamlyugi_last_read: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prodeck_last_read: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct CardStore {
    cards: IndexMap<CardId, Card>,
    sets: IndexMap<SetId, Set>,
    series: IndexMap<SeriesId, Series>,

    cards_by_wiki_id: HashMap<PageId, CardId>,
    cards_by_konami_id: HashMap<i64, CardId>,
    cards_by_password: HashMap<String, CardId>,
    cards_by_en_name: HashMap<String, CardId>,
    cards_by_prodeck_id: HashMap<i64, CardId>,
    cards_by_yamlyugi_id: HashMap<i64, CardId>,

    sets_by_wiki_id: HashMap<PageId, SetId>,
    sets_by_konami_id: HashMap<i64, SetId>,
    sets_by_en_name: HashMap<String, SetId>,

    pub sync: SyncState,
}

impl CardStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Cards ---

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.get(id)
    }

    /// In-place mutable access for non-key fields (image URLs, text).
    /// Changes to lookup-key fields must go through [`Self::upsert_card`]
    /// so the indices stay current.
    pub fn card_mut(&mut self, id: &CardId) -> Option<&mut Card> {
        self.cards.get_mut(id)
    }

    /// Inserts or replaces a card and refreshes every index it appears in.
    pub fn upsert_card(&mut self, card: Card) {
        if let Some(wiki_id) = card.external.wiki_id {
            self.cards_by_wiki_id.insert(wiki_id, card.id);
        }
        if let Some(konami_id) = card.external.konami_id {
            self.cards_by_konami_id.insert(konami_id, card.id);
        }
        if let Some(prodeck_id) = card.external.prodeck_id {
            self.cards_by_prodeck_id.insert(prodeck_id, card.id);
        }
        if let Some(yamlyugi_id) = card.external.yamlyugi_id {
            self.cards_by_yamlyugi_id.insert(yamlyugi_id, card.id);
        }
        for password in &card.passwords {
            self.cards_by_password.insert(password.clone(), card.id);
        }
        if let Some(name) = card.en_name() {
            self.cards_by_en_name.insert(name.to_string(), card.id);
        }
        self.cards.insert(card.id, card);
    }

    pub fn card_by_wiki_id(&self, id: PageId) -> Option<CardId> {
        self.cards_by_wiki_id.get(&id).copied()
    }

    pub fn card_by_konami_id(&self, id: i64) -> Option<CardId> {
        self.cards_by_konami_id.get(&id).copied()
    }

    pub fn card_by_password(&self, password: &str) -> Option<CardId> {
        self.cards_by_password.get(password).copied()
    }

    pub fn card_by_en_name(&self, name: &str) -> Option<CardId> {
        self.cards_by_en_name.get(name).copied()
    }

    pub fn card_by_prodeck_id(&self, id: i64) -> Option<CardId> {
        self.cards_by_prodeck_id.get(&id).copied()
    }

    pub fn card_by_yamlyugi_id(&self, id: i64) -> Option<CardId> {
        self.cards_by_yamlyugi_id.get(&id).copied()
    }

    // --- Sets ---

    pub fn sets(&self) -> impl Iterator<Item = &Set> {
        self.sets.values()
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn set(&self, id: &SetId) -> Option<&Set> {
        self.sets.get(id)
    }

    pub fn upsert_set(&mut self, set: Set) {
        if let Some(wiki_id) = set.external.wiki_id {
            self.sets_by_wiki_id.insert(wiki_id, set.id);
        }
        for konami_id in &set.konami_ids {
            self.sets_by_konami_id.insert(*konami_id, set.id);
        }
        if let Some(name) = set.en_name() {
            self.sets_by_en_name.insert(name.to_string(), set.id);
        }
        self.sets.insert(set.id, set);
    }

    pub fn set_by_wiki_id(&self, id: PageId) -> Option<SetId> {
        self.sets_by_wiki_id.get(&id).copied()
    }

    pub fn set_by_konami_id(&self, id: i64) -> Option<SetId> {
        self.sets_by_konami_id.get(&id).copied()
    }

    pub fn set_by_en_name(&self, name: &str) -> Option<SetId> {
        self.sets_by_en_name.get(name).copied()
    }

    // --- Series ---

    pub fn series(&self) -> impl Iterator<Item = &Series> {
        self.series.values()
    }

    pub fn upsert_series(&mut self, series: Series) {
        self.series.insert(series.id, series);
    }

    // --- Persistence ---

    /// Loads a store from the data directory, preferring the aggregate
    /// files and falling back to per-entity files. A missing directory
    /// yields an empty store.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut store = Self::new();

        let aggregate_cards = data_dir.join(AGGREGATE_DIRNAME).join(CARDLIST_FILENAME);
        if aggregate_cards.exists() {
            let cards: Vec<Card> = read_json(&aggregate_cards)?;
            for card in cards {
                store.upsert_card(card);
            }
        } else {
            for id in load_id_list(&data_dir.join(CARDLIST_FILENAME))? {
                let path = card_path(data_dir, &id);
                store.upsert_card(read_json(&path)?);
            }
        }

        let aggregate_sets = data_dir.join(AGGREGATE_DIRNAME).join(SETLIST_FILENAME);
        if aggregate_sets.exists() {
            let sets: Vec<Set> = read_json(&aggregate_sets)?;
            for set in sets {
                store.upsert_set(set);
            }
        } else {
            for id in load_id_list(&data_dir.join(SETLIST_FILENAME))? {
                let path = set_path(data_dir, &id);
                store.upsert_set(read_json(&path)?);
            }
        }

        let state_path = data_dir.join(SYNC_STATE_FILENAME);
        if state_path.exists() {
            store.sync = read_json(&state_path)?;
        }

        Ok(store)
    }

    /// Writes the whole store back out. Every file is a full rewrite, so
    /// re-saving unchanged state reproduces the same content.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir.join(CARDS_DIRNAME))?;
        fs::create_dir_all(data_dir.join(SETS_DIRNAME))?;
        fs::create_dir_all(data_dir.join(AGGREGATE_DIRNAME))?;

        let card_ids: Vec<&Uuid> = self.cards.keys().map(|id| id.as_uuid()).collect();
        write_json(&data_dir.join(CARDLIST_FILENAME), &card_ids)?;
        for card in self.cards.values() {
            write_json(&card_path(data_dir, &card.id), card)?;
        }
        let all_cards: Vec<&Card> = self.cards.values().collect();
        write_json(
            &data_dir.join(AGGREGATE_DIRNAME).join(CARDLIST_FILENAME),
            &all_cards,
        )?;

        let set_ids: Vec<&Uuid> = self.sets.keys().map(|id| id.as_uuid()).collect();
        write_json(&data_dir.join(SETLIST_FILENAME), &set_ids)?;
        for set in self.sets.values() {
            write_json(&set_path(data_dir, &set.id), set)?;
        }
        let all_sets: Vec<&Set> = self.sets.values().collect();
        write_json(
            &data_dir.join(AGGREGATE_DIRNAME).join(SETLIST_FILENAME),
            &all_sets,
        )?;

        write_json(&data_dir.join(SYNC_STATE_FILENAME), &self.sync)?;
        Ok(())
    }
}

fn card_path(data_dir: &Path, id: &CardId) -> PathBuf {
    data_dir
        .join(CARDS_DIRNAME)
        .join(format!("{}.json", id.as_uuid()))
}

fn set_path(data_dir: &Path, id: &SetId) -> PathBuf {
    data_dir
        .join(SETS_DIRNAME)
        .join(format!("{}.json", id.as_uuid()))
}

fn load_id_list<T: From<Uuid>>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = read_json(path)?;
    Ok(ids.into_iter().map(T::from).collect())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::Store(format!("{}: {}", path.display(), e)))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Store(format!("{}: {}", path.display(), e)))?;
    fs::write(path, content)?;
    Ok(())
}
