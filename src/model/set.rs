// src/model/set.rs
//! The canonical set entity — a product release containing card printings.

use crate::types::{CardId, PageId, SetId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Localized set name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetText {
    pub name: String,
}

/// One printing of a card within a set.
///
/// The code/rarity detail comes from gallery extraction, which lives
/// outside this importer; the structure is here so merged data from
/// other sources has a place to land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Printing {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
}

/// Per-source identifiers for one set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetExternalIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiki_id: Option<PageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiki_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Set {
    pub id: SetId,
    /// Locale code to localized name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub text: BTreeMap<String, SetText>,
    /// Konami database ids — one per regional release of the product.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub konami_ids: Vec<i64>,
    /// Locale code to regional release date.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub release_dates: BTreeMap<String, NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub printings: Vec<Printing>,
    #[serde(default, rename = "externalIds")]
    pub external: SetExternalIds,
}

impl Set {
    pub fn new(id: SetId) -> Self {
        Self {
            id,
            text: BTreeMap::new(),
            konami_ids: Vec::new(),
            release_dates: BTreeMap::new(),
            printings: Vec::new(),
            external: SetExternalIds::default(),
        }
    }

    pub fn en_name(&self) -> Option<&str> {
        self.text.get("en").map(|t| t.name.as_str())
    }

    /// Sets the name for a locale (scalars overwrite on merge).
    pub fn set_name(&mut self, locale: &str, name: &str) {
        self.text
            .entry(locale.to_string())
            .and_modify(|t| t.name = name.to_string())
            .or_insert_with(|| SetText {
                name: name.to_string(),
            });
    }

    /// Adds a Konami id if not already present (union semantics).
    pub fn add_konami_id(&mut self, id: i64) {
        if !self.konami_ids.contains(&id) {
            self.konami_ids.push(id);
        }
    }
}
