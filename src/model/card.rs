// src/model/card.rs
//! The canonical card entity and its component types.

use crate::types::{CardId, PageId, SeriesId, SetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Monster,
    Spell,
    Trap,
    Token,
    Skill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Light,
    Dark,
    Fire,
    Water,
    Wind,
    Earth,
    Divine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonsterType {
    Ritual,
    Fusion,
    Synchro,
    Xyz,
    Pendulum,
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Race {
    Beastwarrior,
    Zombie,
    Fiend,
    Dinosaur,
    Dragon,
    Beast,
    Illusion,
    Insect,
    Wingedbeast,
    Warrior,
    Seaserpent,
    Aqua,
    Pyro,
    Thunder,
    Spellcaster,
    Plant,
    Rock,
    Reptile,
    Fairy,
    Fish,
    Machine,
    Divinebeast,
    Psychic,
    Creatorgod,
    Wyrm,
    Cyberse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Normal,
    Effect,
    Pendulum,
    Tuner,
    Specialsummon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Toon,
    Spirit,
    Union,
    Gemini,
    Flip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkArrow {
    Topleft,
    Topcenter,
    Topright,
    Middleleft,
    Middleright,
    Bottomleft,
    Bottomcenter,
    Bottomright,
}

/// Spell/trap property ("Continuous", "Quick-Play", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpellTrapKind {
    Normal,
    Continuous,
    Equip,
    Quickplay,
    Field,
    Ritual,
    Counter,
}

/// Where a card currently stands on one format's limit regulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Legality {
    Unlimited,
    Semilimited,
    Limited,
    Forbidden,
    Unreleased,
    Unknown,
}

/// Parses an enum's canonical lowercase form by reusing its serde
/// encoding, so the string tables live in exactly one place.
macro_rules! parse_from_serde {
    ($($name:ident),*) => {
        $(impl $name {
            pub fn parse(value: &str) -> Option<Self> {
                serde_json::from_value(serde_json::Value::String(value.to_string())).ok()
            }
        })*
    };
}

parse_from_serde!(Attribute, Race, SpellTrapKind, Legality, LinkArrow);

/// An ATK or DEF value. Some cards print "?" instead of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Value(i32),
    Unknown,
}

impl Serialize for Stat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Stat::Value(v) => serializer.serialize_i32(*v),
            Stat::Unknown => serializer.serialize_str("?"),
        }
    }
}

impl<'de> Deserialize<'de> for Stat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(|v| Stat::Value(v as i32))
                .ok_or_else(|| serde::de::Error::custom("non-integer stat")),
            serde_json::Value::String(s) if s == "?" => Ok(Stat::Unknown),
            other => Err(serde::de::Error::custom(format!(
                "bad stat value: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Value(v) => write!(f, "{}", v),
            Stat::Unknown => write!(f, "?"),
        }
    }
}

/// Localized card text. One per locale the card has been printed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardText {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pendulum_effect: Option<String>,
    /// False when the translation is fan-made rather than printed.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub official: bool,
}

impl CardText {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            effect: None,
            pendulum_effect: None,
            official: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_true(v: &bool) -> bool {
    *v
}

/// One piece of card artwork. Image ids are stable even when source URLs
/// rot, so merges match on password or URL, never on the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardImage {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_art: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_art: Option<String>,
}

impl CardImage {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            password: None,
            crop_art: None,
            card_art: None,
        }
    }
}

impl Default for CardImage {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-source identifiers for one card. Filled in progressively as each
/// importer observes the card; never cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardExternalIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiki_id: Option<PageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiki_title: Option<String>,
    /// Konami's official database id, shared across several sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub konami_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prodeck_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prodeck_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yamlyugi_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub card_type: CardType,
    /// Locale code ("en", "ja", "zh-TW", ...) to localized text.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub text: BTreeMap<String, CardText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monster_types: Vec<MonsterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race: Option<Race>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classifications: Vec<Classification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub abilities: Vec<Ability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atk: Option<Stat>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "def")]
    pub def_: Option<Stat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link_arrows: Vec<LinkArrow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spell_trap_kind: Option<SpellTrapKind>,
    /// Skill cards only: the character the skill belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub passwords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<CardImage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sets: Vec<SetId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<SeriesId>,
    /// Format code ("tcg", "ocg", "speed", ...) to current legality.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub legality: BTreeMap<String, Legality>,
    /// Cards that exist on paper but are not legal for play anywhere.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub illegal: bool,
    #[serde(default, rename = "externalIds")]
    pub external: CardExternalIds,
}

impl Card {
    pub fn new(id: CardId, card_type: CardType) -> Self {
        Self {
            id,
            card_type,
            text: BTreeMap::new(),
            attribute: None,
            monster_types: Vec::new(),
            race: None,
            classifications: Vec::new(),
            abilities: Vec::new(),
            level: None,
            rank: None,
            atk: None,
            def_: None,
            scale: None,
            link_arrows: Vec::new(),
            spell_trap_kind: None,
            character: None,
            skill_type: None,
            passwords: Vec::new(),
            images: Vec::new(),
            sets: Vec::new(),
            series: Vec::new(),
            legality: BTreeMap::new(),
            illegal: false,
            external: CardExternalIds::default(),
        }
    }

    /// The English name, when known.
    pub fn en_name(&self) -> Option<&str> {
        self.text.get("en").map(|t| t.name.as_str())
    }

    /// Returns the text entry for a locale, creating it with the given
    /// name if absent. An existing entry keeps its effect text but takes
    /// the new name (scalars overwrite on merge).
    pub fn text_mut(&mut self, locale: &str, name: &str) -> &mut CardText {
        let entry = self
            .text
            .entry(locale.to_string())
            .or_insert_with(|| CardText::named(name));
        entry.name = name.to_string();
        entry
    }

    /// Adds a password if not already present (union semantics).
    pub fn add_password(&mut self, password: &str) {
        if !self.passwords.iter().any(|p| p == password) {
            self.passwords.push(password.to_string());
        }
    }

    /// Finds an existing image by password, then by card-art URL, or
    /// appends a new one. Keeps repeated imports idempotent.
    pub fn image_mut(&mut self, password: Option<&str>, card_art: Option<&str>) -> &mut CardImage {
        let position = self
            .images
            .iter()
            .position(|img| {
                (password.is_some() && img.password.as_deref() == password)
                    || (card_art.is_some() && img.card_art.as_deref() == card_art)
            })
            .unwrap_or_else(|| {
                self.images.push(CardImage::new());
                self.images.len() - 1
            });
        &mut self.images[position]
    }
}
