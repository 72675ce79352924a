// src/model/series.rs

use crate::types::{PageId, SeriesId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An archetype or series a card belongs to ("Blue-Eyes", "HERO", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: SeriesId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub name: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiki_id: Option<PageId>,
}

impl Series {
    pub fn new(id: SeriesId) -> Self {
        Self {
            id,
            name: BTreeMap::new(),
            wiki_id: None,
        }
    }
}
