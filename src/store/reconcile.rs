// src/store/reconcile.rs
//! Cross-source identity reconciliation.
//!
//! Each importer extracts whatever lookup keys its source offers into a
//! key bundle, then walks a source-specific priority ladder: the first
//! key kind with a hit wins, and a draft with no hit at all mints a new
//! entity. Ladders are deliberately kept per source rather than unified —
//! the orders differ, and the differences are observable behavior.

use super::CardStore;
use crate::types::{CardId, PageId, SetId};

/// One rung of a card-lookup ladder, most stable id kinds first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardLookup {
    WikiId,
    KonamiId,
    ProdeckId,
    YamlyugiId,
    Password,
    Name,
}

/// Lookup keys extracted from one draft card record.
///
/// Key kinds that can carry several values from one source (an id and a
/// beta id, several names) hold them in priority order.
#[derive(Debug, Clone, Default)]
pub struct CardKeys {
    pub wiki_id: Option<PageId>,
    pub konami_id: Option<i64>,
    pub prodeck_ids: Vec<i64>,
    pub yamlyugi_id: Option<i64>,
    pub passwords: Vec<String>,
    pub names: Vec<String>,
}

/// Ladder for cards coming from the wiki importer.
pub const WIKI_CARD_LADDER: &[CardLookup] = &[
    CardLookup::WikiId,
    CardLookup::KonamiId,
    CardLookup::Password,
    CardLookup::Name,
];

/// Ladder for cards coming from the YAML Yugi dump.
pub const YAMLYUGI_CARD_LADDER: &[CardLookup] = &[
    CardLookup::KonamiId,
    CardLookup::WikiId,
    CardLookup::YamlyugiId,
    CardLookup::Password,
    CardLookup::Name,
];

/// Ladder for cards coming from the YGOPRODeck API.
pub const PRODECK_CARD_LADDER: &[CardLookup] = &[
    CardLookup::ProdeckId,
    CardLookup::KonamiId,
    CardLookup::Password,
    CardLookup::Name,
];

/// Walks the ladder and returns the first matching canonical card.
///
/// Deterministic regardless of how the indices were populated: only the
/// ladder order decides which key wins.
pub fn find_card(store: &CardStore, ladder: &[CardLookup], keys: &CardKeys) -> Option<CardId> {
    for rung in ladder {
        let hit = match rung {
            CardLookup::WikiId => keys.wiki_id.and_then(|id| store.card_by_wiki_id(id)),
            CardLookup::KonamiId => keys.konami_id.and_then(|id| store.card_by_konami_id(id)),
            CardLookup::ProdeckId => keys
                .prodeck_ids
                .iter()
                .find_map(|id| store.card_by_prodeck_id(*id)),
            CardLookup::YamlyugiId => keys
                .yamlyugi_id
                .and_then(|id| store.card_by_yamlyugi_id(id)),
            CardLookup::Password => keys
                .passwords
                .iter()
                .find_map(|pw| store.card_by_password(pw)),
            CardLookup::Name => keys.names.iter().find_map(|n| store.card_by_en_name(n)),
        };
        if hit.is_some() {
            return hit;
        }
    }
    None
}

/// One rung of a set-lookup ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetLookup {
    WikiId,
    KonamiId,
    Name,
}

#[derive(Debug, Clone, Default)]
pub struct SetKeys {
    pub wiki_id: Option<PageId>,
    pub konami_ids: Vec<i64>,
    pub names: Vec<String>,
}

/// Ladder for sets coming from the wiki importer.
pub const WIKI_SET_LADDER: &[SetLookup] =
    &[SetLookup::WikiId, SetLookup::KonamiId, SetLookup::Name];

pub fn find_set(store: &CardStore, ladder: &[SetLookup], keys: &SetKeys) -> Option<SetId> {
    for rung in ladder {
        let hit = match rung {
            SetLookup::WikiId => keys.wiki_id.and_then(|id| store.set_by_wiki_id(id)),
            SetLookup::KonamiId => keys
                .konami_ids
                .iter()
                .find_map(|id| store.set_by_konami_id(*id)),
            SetLookup::Name => keys.names.iter().find_map(|n| store.set_by_en_name(n)),
        };
        if hit.is_some() {
            return hit;
        }
    }
    None
}
