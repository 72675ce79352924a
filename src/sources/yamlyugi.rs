// src/sources/yamlyugi.rs
//! Importer for the YAML Yugi aggregate dump.
//!
//! One JSON file covers every card with per-language text and the
//! cross-source ids that make it the best first importer to run: once
//! its Konami/wiki ids are in the indices, the other sources rarely
//! fall through to name matching.

use super::download_text;
use crate::constants::{MAX_REAL_PASSWORD, YAMLYUGI_CARDS_FILENAME, YAMLYUGI_CARDS_URL};
use crate::error::Result;
use crate::model::{
    Ability, Attribute, Card, CardType, Classification, Legality, LinkArrow, MonsterType, Race,
    SpellTrapKind, Stat,
};
use crate::store::reconcile::{self, CardKeys, YAMLYUGI_CARD_LADDER};
use crate::store::CardStore;
use crate::types::{CardId, PageId};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const MONSTER_TYPES: &[(&str, MonsterType)] = &[
    ("Ritual", MonsterType::Ritual),
    ("Fusion", MonsterType::Fusion),
    ("Synchro", MonsterType::Synchro),
    ("Xyz", MonsterType::Xyz),
    ("Pendulum", MonsterType::Pendulum),
    ("Link", MonsterType::Link),
];

const CLASSIFICATIONS: &[(&str, Classification)] = &[
    ("Normal", Classification::Normal),
    ("Effect", Classification::Effect),
    ("Pendulum", Classification::Pendulum),
    ("Tuner", Classification::Tuner),
];

const ABILITIES: &[(&str, Ability)] = &[
    ("Toon", Ability::Toon),
    ("Spirit", Ability::Spirit),
    ("Union", Ability::Union),
    ("Gemini", Ability::Gemini),
    ("Flip", Ability::Flip),
];

/// The dump spells link arrows as direction glyphs.
const LINK_ARROWS: &[(&str, LinkArrow)] = &[
    ("↖", LinkArrow::Topleft),
    ("⬆", LinkArrow::Topcenter),
    ("↗", LinkArrow::Topright),
    ("⬅", LinkArrow::Middleleft),
    ("➡", LinkArrow::Middleright),
    ("↙", LinkArrow::Bottomleft),
    ("⬇", LinkArrow::Bottomcenter),
    ("↘", LinkArrow::Bottomright),
];

const LEGALITIES: &[(&str, Legality)] = &[
    ("Limited 3", Legality::Unlimited),
    ("Unlimited", Legality::Unlimited),
    ("Limited 2", Legality::Semilimited),
    ("Semi-Limited", Legality::Semilimited),
    ("Limited 1", Legality::Limited),
    ("Limited", Legality::Limited),
    ("Limited 0", Legality::Forbidden),
    ("Forbidden", Legality::Forbidden),
    ("Not yet released", Legality::Unreleased),
];

#[derive(Debug, Deserialize)]
struct YamlCard {
    #[serde(default)]
    name: BTreeMap<String, Option<String>>,
    #[serde(default)]
    text: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pendulum_effect: BTreeMap<String, Option<String>>,
    #[serde(default)]
    card_type: Option<String>,
    #[serde(default)]
    monster_type_line: Option<String>,
    #[serde(default)]
    attribute: Option<String>,
    #[serde(default)]
    level: Option<i32>,
    #[serde(default)]
    rank: Option<i32>,
    #[serde(default)]
    atk: Option<Stat>,
    #[serde(default, rename = "def")]
    def_: Option<Stat>,
    #[serde(default)]
    pendulum_scale: Option<i32>,
    #[serde(default)]
    link_arrows: Option<Vec<String>>,
    #[serde(default)]
    property: Option<String>,
    #[serde(default)]
    password: Option<i64>,
    #[serde(default)]
    limit_regulation: Option<BTreeMap<String, Option<String>>>,
    #[serde(default)]
    konami_id: Option<i64>,
    #[serde(default)]
    yugipedia_page_id: Option<i64>,
}

/// Returns the dump, downloading it only when no cached copy exists.
fn load_dump(temp_dir: &Path) -> Result<Vec<YamlCard>> {
    let path = temp_dir.join(YAMLYUGI_CARDS_FILENAME);
    let text = if path.exists() {
        fs::read_to_string(&path)?
    } else {
        log::info!("Downloading YAML Yugi card dump");
        let body = download_text(YAMLYUGI_CARDS_URL, &[])?;
        fs::create_dir_all(temp_dir)?;
        fs::write(&path, &body)?;
        body
    };
    Ok(serde_json::from_str(&text)?)
}

/// Imports every card in the dump. Returns (updated, new) counts.
pub fn import_from_yamlyugi(
    store: &mut CardStore,
    temp_dir: &Path,
    now: DateTime<Utc>,
) -> Result<(u32, u32)> {
    let dump = load_dump(temp_dir)?;
    let mut found = 0u32;
    let mut created = 0u32;

    for entry in &dump {
        let keys = card_keys(entry);
        let existing = reconcile::find_card(store, YAMLYUGI_CARD_LADDER, &keys);
        let mut card = match existing {
            Some(id) => match store.card(&id) {
                Some(card) => card.clone(),
                None => continue,
            },
            None => {
                let Some(card_type) = entry
                    .card_type
                    .as_deref()
                    .and_then(|ct| parse_card_type(&ct.to_lowercase()))
                else {
                    log::warn!("Skipping record with card type {:?}", entry.card_type);
                    continue;
                };
                Card::new(CardId::new_v4(), card_type)
            }
        };
        write_card(entry, &mut card);
        store.upsert_card(card);
        if existing.is_some() {
            found += 1;
        } else {
            created += 1;
        }
    }

    store.sync.yamlyugi_last_read = Some(now);
    Ok((found, created))
}

fn parse_card_type(value: &str) -> Option<CardType> {
    match value {
        "monster" => Some(CardType::Monster),
        "spell" => Some(CardType::Spell),
        "trap" => Some(CardType::Trap),
        _ => None,
    }
}

fn card_keys(entry: &YamlCard) -> CardKeys {
    let mut keys = CardKeys {
        konami_id: entry.konami_id,
        wiki_id: entry.yugipedia_page_id.map(PageId),
        yamlyugi_id: entry.password,
        ..Default::default()
    };
    if let Some(password) = entry.password {
        keys.passwords.push(format!("{:08}", password));
    }
    if let Some(Some(name)) = entry.name.get("en") {
        keys.names.push(name.clone());
    }
    keys
}

/// Merges one dump record onto the canonical card. This source is
/// authoritative for the typeline, so the derived collections are
/// rebuilt rather than unioned.
fn write_card(entry: &YamlCard, card: &mut Card) {
    for (lang, name) in &entry.name {
        // Sub-tagged languages like "en_us" are romanizations, not locales.
        if lang.contains('_') {
            continue;
        }
        if let Some(name) = name {
            card.text_mut(lang, name);
        }
    }
    for (lang, text) in &entry.text {
        if lang.contains('_') {
            continue;
        }
        if let (Some(text), Some(slot)) = (text, card.text.get_mut(lang)) {
            slot.effect = Some(text.clone());
        }
    }
    for (lang, text) in &entry.pendulum_effect {
        if lang.contains('_') {
            continue;
        }
        if let (Some(text), Some(slot)) = (text, card.text.get_mut(lang)) {
            slot.pendulum_effect = Some(text.clone());
        }
    }

    if card.card_type == CardType::Monster {
        let typeline: Vec<&str> = entry
            .monster_type_line
            .as_deref()
            .unwrap_or("")
            .split(" / ")
            .map(str::trim)
            .collect();

        if let Some(attribute) = entry
            .attribute
            .as_deref()
            .and_then(|a| Attribute::parse(&a.to_lowercase()))
        {
            card.attribute = Some(attribute);
        }

        card.monster_types = MONSTER_TYPES
            .iter()
            .filter(|(key, _)| typeline.contains(key))
            .map(|(_, value)| *value)
            .collect();
        card.race = typeline
            .iter()
            .find_map(|part| Race::parse(&part.to_lowercase().replace(['-', ' '], "")));
        if card.race.is_none() {
            log::warn!(
                "Card {:?} has no race; typeline: {:?}",
                card.en_name(),
                entry.monster_type_line
            );
        }
        card.classifications = CLASSIFICATIONS
            .iter()
            .filter(|(key, _)| typeline.contains(key))
            .map(|(_, value)| *value)
            .collect();
        card.abilities = ABILITIES
            .iter()
            .filter(|(key, _)| typeline.contains(key))
            .map(|(_, value)| *value)
            .collect();

        if entry.level.is_some() {
            card.level = entry.level;
        }
        if entry.rank.is_some() {
            card.rank = entry.rank;
        }
        if entry.atk.is_some() {
            card.atk = entry.atk;
        }
        if entry.def_.is_some() {
            card.def_ = entry.def_;
        }
        if entry.pendulum_scale.is_some() {
            card.scale = entry.pendulum_scale;
        }
        if let Some(arrows) = &entry.link_arrows {
            card.link_arrows = arrows
                .iter()
                .filter_map(|glyph| {
                    LINK_ARROWS
                        .iter()
                        .find(|(key, _)| key == glyph)
                        .map(|(_, value)| *value)
                })
                .collect();
        }
    } else if matches!(card.card_type, CardType::Spell | CardType::Trap) {
        let property = entry.property.as_deref().unwrap_or("normal");
        match SpellTrapKind::parse(&property.to_lowercase().replace('-', "")) {
            Some(kind) => card.spell_trap_kind = Some(kind),
            None => log::warn!(
                "Unknown spell/trap property {:?} on {:?}",
                property,
                card.en_name()
            ),
        }
    }

    if let Some(password) = entry.password.filter(|p| *p <= MAX_REAL_PASSWORD) {
        card.add_password(&format!("{:08}", password));
    }

    for (format, regulation) in entry.limit_regulation.iter().flatten() {
        let Some(regulation) = regulation else { continue };
        match LEGALITIES
            .iter()
            .find(|(key, _)| key == regulation)
            .map(|(_, value)| *value)
        {
            Some(legality) => {
                card.legality.insert(format.clone(), legality);
            }
            None => log::warn!(
                "Unknown limit regulation {:?} for format {}",
                regulation,
                format
            ),
        }
    }

    if entry.yugipedia_page_id.is_some() {
        card.external.wiki_id = entry.yugipedia_page_id.map(PageId);
    }
    if entry.konami_id.is_some() {
        card.external.konami_id = entry.konami_id;
    }
    if entry.password.is_some() {
        card.external.yamlyugi_id = entry.password;
    }
}
