// src/sources/prodeck.rs
//! Importer for the YGOPRODeck card API.
//!
//! The API serves one big card array (with `misc=yes` for the beta ids
//! and Konami ids the ladder wants). The download is cached on disk and
//! refetched only after the refresh window passes. This source is the
//! preferred origin for card art.

use super::download_text;
use crate::constants::{
    MAX_REAL_PASSWORD, PRODECK_API_URL, PRODECK_CARDS_FILENAME, PRODECK_REFRESH_SECS,
};
use crate::error::Result;
use crate::model::{
    Ability, Attribute, Card, CardType, Classification, LinkArrow, MonsterType, Race,
    SpellTrapKind, Stat,
};
use crate::store::reconcile::{self, CardKeys, PRODECK_CARD_LADDER};
use crate::store::CardStore;
use crate::types::CardId;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

const MONSTER_TYPES: &[(&str, MonsterType)] = &[
    ("Ritual", MonsterType::Ritual),
    ("Fusion", MonsterType::Fusion),
    ("Synchro", MonsterType::Synchro),
    ("XYZ", MonsterType::Xyz),
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

const LINK_ARROWS: &[(&str, LinkArrow)] = &[
    ("Top-Left", LinkArrow::Topleft),
    ("Top", LinkArrow::Topcenter),
    ("Top-Right", LinkArrow::Topright),
    ("Left", LinkArrow::Middleleft),
    ("Right", LinkArrow::Middleright),
    ("Bottom-Left", LinkArrow::Bottomleft),
    ("Bottom", LinkArrow::Bottomcenter),
    ("Bottom-Right", LinkArrow::Bottomright),
];

#[derive(Debug, Deserialize)]
struct ProdeckResponse {
    data: Vec<ProdeckCard>,
}

#[derive(Debug, Deserialize)]
struct ProdeckCard {
    id: i64,
    name: String,
    #[serde(default, rename = "type")]
    type_line: String,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    pend_desc: Option<String>,
    #[serde(default)]
    attribute: Option<String>,
    #[serde(default)]
    race: Option<String>,
    #[serde(default)]
    level: Option<i32>,
    #[serde(default)]
    atk: Option<Stat>,
    #[serde(default, rename = "def")]
    def_: Option<Stat>,
    #[serde(default)]
    scale: Option<i32>,
    #[serde(default)]
    linkmarkers: Option<Vec<String>>,
    #[serde(default)]
    card_images: Vec<ProdeckImage>,
    #[serde(default)]
    misc_info: Vec<ProdeckMiscInfo>,
    #[serde(default)]
    ygoprodeck_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProdeckImage {
    id: i64,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    image_url_cropped: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ProdeckMiscInfo {
    #[serde(default)]
    beta_id: Option<i64>,
    #[serde(default)]
    konami_id: Option<i64>,
    #[serde(default)]
    beta_name: Option<String>,
}

/// Returns the card dump, downloading when the cached copy is older
/// than the refresh window.
fn load_dump(temp_dir: &Path) -> Result<Vec<ProdeckCard>> {
    let path = temp_dir.join(PRODECK_CARDS_FILENAME);
    if path.exists() {
        let age = fs::metadata(&path)?
            .modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok());
        if age.is_some_and(|age| age <= Duration::from_secs(PRODECK_REFRESH_SECS)) {
            let text = fs::read_to_string(&path)?;
            return Ok(serde_json::from_str(&text)?);
        }
    }
    log::info!("Downloading YGOPRODeck card dump");
    let body = download_text(PRODECK_API_URL, &[("misc", "yes")])?;
    let response: ProdeckResponse = serde_json::from_str(&body)?;
    // Cache only the data array, not the response envelope.
    let data = serde_json::from_str::<serde_json::Value>(&body)?
        .get("data")
        .cloned()
        .unwrap_or_default();
    fs::create_dir_all(temp_dir)?;
    fs::write(&path, serde_json::to_string_pretty(&data)?)?;
    Ok(response.data)
}

/// Imports every card in the dump. Returns (updated, new) counts.
pub fn import_from_prodeck(
    store: &mut CardStore,
    temp_dir: &Path,
    now: DateTime<Utc>,
) -> Result<(u32, u32)> {
    let dump = load_dump(temp_dir)?;
    let mut found = 0u32;
    let mut created = 0u32;

    for entry in &dump {
        // Skills and tokens are served by this API but are not usable
        // card records here; the wiki covers them.
        let Some(card_type) = parse_card_type(&entry.type_line) else {
            continue;
        };
        let keys = card_keys(entry);
        let existing = reconcile::find_card(store, PRODECK_CARD_LADDER, &keys);
        let mut card = match existing {
            Some(id) => match store.card(&id) {
                Some(card) => card.clone(),
                None => continue,
            },
            None => Card::new(CardId::new_v4(), card_type),
        };
        write_card(entry, &mut card);
        store.upsert_card(card);
        if existing.is_some() {
            found += 1;
        } else {
            created += 1;
        }
    }

    store.sync.prodeck_last_read = Some(now);
    Ok((found, created))
}

fn parse_card_type(type_line: &str) -> Option<CardType> {
    if type_line.contains("Skill") || type_line.contains("Token") {
        return None;
    }
    if type_line.contains("Monster") {
        Some(CardType::Monster)
    } else if type_line.contains("Spell") {
        Some(CardType::Spell)
    } else if type_line.contains("Trap") {
        Some(CardType::Trap)
    } else {
        log::warn!("Unknown card type: {}", type_line);
        None
    }
}

fn card_keys(entry: &ProdeckCard) -> CardKeys {
    let mut keys = CardKeys {
        prodeck_ids: vec![entry.id],
        names: vec![entry.name.clone()],
        ..Default::default()
    };
    if let [misc] = entry.misc_info.as_slice() {
        keys.prodeck_ids.extend(misc.beta_id);
        keys.konami_id = misc.konami_id;
        keys.names.extend(misc.beta_name.clone());
    }
    keys.passwords.push(format!("{:08}", entry.id));
    keys
}

/// Merges one API record onto the canonical card. This source is
/// authoritative for the typeline, so the derived collections are
/// rebuilt rather than unioned.
fn write_card(entry: &ProdeckCard, card: &mut Card) {
    let text = card.text_mut("en", &entry.name);
    if let Some(desc) = &entry.desc {
        text.effect = Some(desc.clone());
    }
    if let Some(pend_desc) = &entry.pend_desc {
        text.pendulum_effect = Some(pend_desc.clone());
    }

    if card.card_type == CardType::Monster {
        let typeline: Vec<&str> = entry.type_line.split(' ').collect();

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
        if let Some(race) = entry
            .race
            .as_deref()
            .and_then(|r| Race::parse(&r.to_lowercase().replace(['-', ' '], "")))
        {
            card.race = Some(race);
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

        if card.monster_types.contains(&MonsterType::Xyz) {
            card.rank = entry.level;
        } else if entry.level.is_some() {
            card.level = entry.level;
        }
        if entry.atk.is_some() {
            card.atk = entry.atk;
        }
        if entry.def_.is_some() {
            card.def_ = entry.def_;
        }
        if entry.scale.is_some() {
            card.scale = entry.scale;
        }
        if card.monster_types.contains(&MonsterType::Link) {
            if let Some(markers) = &entry.linkmarkers {
                card.link_arrows = markers
                    .iter()
                    .filter_map(|marker| {
                        LINK_ARROWS
                            .iter()
                            .find(|(key, _)| key == marker)
                            .map(|(_, value)| *value)
                    })
                    .collect();
            }
        }
    } else if let Some(race) = &entry.race {
        match SpellTrapKind::parse(&race.to_lowercase().replace('-', "")) {
            Some(kind) => card.spell_trap_kind = Some(kind),
            None => log::warn!("Unknown spell/trap property {:?} on {}", race, entry.name),
        }
    }

    if entry.id <= MAX_REAL_PASSWORD {
        card.add_password(&format!("{:08}", entry.id));
    }

    for in_image in &entry.card_images {
        // Image ids are either the password of the art variant or an
        // invented value in the password range; match by password, then
        // by URL, before minting a new slot.
        let password = format!("{:08}", in_image.id);
        let known_password =
            card.passwords.contains(&password) || card.passwords.len() == 1;
        let image = card.image_mut(Some(password.as_str()), in_image.image_url.as_deref());
        if known_password {
            image.password = Some(password);
        }
        if in_image.image_url.is_some() {
            image.card_art = in_image.image_url.clone();
        }
        if in_image.image_url_cropped.is_some() {
            image.crop_art = in_image.image_url_cropped.clone();
        }
    }

    card.external.prodeck_id = Some(entry.id);
    if let Some(page_url) = &entry.ygoprodeck_url {
        // The URL's last path segment is the card's stable slug.
        card.external.prodeck_name = url::Url::parse(page_url)
            .ok()
            .and_then(|parsed| {
                parsed
                    .path_segments()
                    .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
                    .map(str::to_string)
            })
            .or_else(|| Some(page_url.clone()));
    }
    match entry.misc_info.as_slice() {
        [] => {}
        [misc] => {
            if misc.konami_id.is_some() {
                card.external.konami_id = misc.konami_id;
            }
        }
        more => log::warn!("Card {} has {} misc_info entries", entry.name, more.len()),
    }
}
