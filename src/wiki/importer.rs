// src/wiki/importer.rs
//! The wiki importer: synchronize → fetch → parse → reconcile → merge.
//!
//! Card pages need their categories (token/skill classification) and
//! their content; both arrive through the batch engine, so the per-page
//! work is a chain of continuations: categories → contents → parse →
//! find-or-create the canonical card → merge fields → queue image-URL
//! lookups. Set pages only need content. The store is shared into the
//! continuations via `Rc<RefCell<…>>` — the run is single-threaded, the
//! batcher just interleaves whose turn it is.
//!
//! Parsing problems are local: log a warning with the page title and
//! skip the record. Transport problems abort the whole import before
//! the sync timestamp advances.

use super::batcher::PageBatcher;
use super::changes::synchronize;
use super::wikitext::{self, strip_markup, Template};
use crate::constants::{
    CAT_OCG_CARDS, CAT_OCG_SETS, CAT_SKILLS, CAT_TCG_CARDS, CAT_TCG_SETS, CAT_TOKENS,
};
use crate::error::Result;
use crate::model::{
    Ability, Attribute, Card, CardImage, CardType, Classification, LinkArrow, MonsterType, Race,
    Set, SpellTrapKind, Stat,
};
use crate::store::reconcile::{self, CardKeys, SetKeys};
use crate::store::CardStore;
use crate::types::{CardId, PageId, SetId};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use uuid::Uuid;

const CARD_CATEGORIES: &[&str] = &[CAT_TCG_CARDS, CAT_OCG_CARDS];
const SET_CATEGORIES: &[&str] = &[CAT_TCG_SETS, CAT_OCG_SETS];

/// Card-table argument prefix to locale code. The empty prefix is the
/// unprefixed English argument set.
const LOCALES: &[(&str, &str)] = &[
    ("", "en"),
    ("en", "en"),
    ("fr", "fr"),
    ("de", "de"),
    ("it", "it"),
    ("pt", "pt"),
    ("es", "es"),
    ("ja", "ja"),
    ("ko", "ko"),
    ("tc", "zh-TW"),
    ("sc", "zh-CN"),
];

/// Spelled-out language names used by the Unofficial name/lore templates.
const LOCALES_FULL: &[(&str, &str)] = &[("English", "en")];

const MONSTER_TYPES: &[(&str, MonsterType)] = &[
    ("Ritual", MonsterType::Ritual),
    ("Fusion", MonsterType::Fusion),
    ("Synchro", MonsterType::Synchro),
    ("Xyz", MonsterType::Xyz),
    ("Pendulum", MonsterType::Pendulum),
    ("Link", MonsterType::Link),
];

const RACES: &[(&str, Race)] = &[
    ("Beast-Warrior", Race::Beastwarrior),
    ("Zombie", Race::Zombie),
    ("Fiend", Race::Fiend),
    ("Dinosaur", Race::Dinosaur),
    ("Dragon", Race::Dragon),
    ("Beast", Race::Beast),
    ("Illusion", Race::Illusion),
    ("Insect", Race::Insect),
    ("Winged Beast", Race::Wingedbeast),
    ("Warrior", Race::Warrior),
    ("Sea Serpent", Race::Seaserpent),
    ("Aqua", Race::Aqua),
    ("Pyro", Race::Pyro),
    ("Thunder", Race::Thunder),
    ("Spellcaster", Race::Spellcaster),
    ("Plant", Race::Plant),
    ("Rock", Race::Rock),
    ("Reptile", Race::Reptile),
    ("Fairy", Race::Fairy),
    ("Fish", Race::Fish),
    ("Machine", Race::Machine),
    ("Divine-Beast", Race::Divinebeast),
    ("Psychic", Race::Psychic),
    ("Creator God", Race::Creatorgod),
    ("Wyrm", Race::Wyrm),
    ("Cyberse", Race::Cyberse),
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

/// Printed stand-ins for an unknown ATK/DEF.
const MYSTERY_STATS: &[&str] = &["?", "????", "X000"];

/// Typeline entries that are placeholders rather than classifications.
const TYPELINE_PLACEHOLDERS: &[&str] = &["?", "???", "Token", "Counter"];

static LEADING_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+").expect("digits regex"));
static DATE_FULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\s+(\d+),\s*(\d+)").expect("date regex"));
static DATE_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\s+(\d+)").expect("date regex"));
static DATE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d\d\d\d)").expect("date regex"));

#[derive(Debug, Clone, Copy, Default)]
pub struct WikiImportReport {
    pub cards_found: u32,
    pub cards_created: u32,
    pub sets_found: u32,
    pub sets_created: u32,
}

/// Runs the wiki import end to end. The sync timestamp advances and the
/// caches checkpoint only after every phase succeeded.
pub fn import_from_wiki(
    batcher: &mut PageBatcher,
    store: &Rc<RefCell<CardStore>>,
    now: DateTime<Utc>,
    with_cards: bool,
    with_sets: bool,
) -> Result<WikiImportReport> {
    let mut report = WikiImportReport::default();

    if with_cards {
        let (found, created) = import_cards(batcher, store, now)?;
        report.cards_found = found;
        report.cards_created = created;
        log::info!("Wiki cards: {} updated, {} new", found, created);
    }
    if with_sets {
        let (found, created) = import_sets(batcher, store, now)?;
        report.sets_found = found;
        report.sets_created = created;
        log::info!("Wiki sets: {} updated, {} new", found, created);
    }

    store.borrow_mut().sync.wiki_last_read = Some(now);
    batcher.save_caches()?;
    Ok(report)
}

fn import_cards(
    batcher: &mut PageBatcher,
    store: &Rc<RefCell<CardStore>>,
    now: DateTime<Utc>,
) -> Result<(u32, u32)> {
    let last_sync = store.borrow().sync.wiki_last_read;
    let outcome = synchronize(batcher, last_sync, now, CARD_CATEGORIES, false)?;
    if !outcome.full_recrawl {
        batcher.invalidate_pages(&outcome.changed);
    }
    log::info!(
        "Importing {} card pages ({})",
        outcome.changed.len(),
        if outcome.full_recrawl {
            "full re-crawl"
        } else {
            "incremental"
        }
    );

    let found = Rc::new(Cell::new(0u32));
    let created = Rc::new(Cell::new(0u32));
    for page in outcome.changed {
        let store = Rc::clone(store);
        let found = Rc::clone(&found);
        let created = Rc::clone(&created);
        batcher.page_categories(
            page,
            Box::new(move |batcher, categories| {
                batcher.page_contents(
                    page,
                    Box::new(move |batcher, content| {
                        absorb_card_page(
                            batcher, &store, page, &categories, &content, &found, &created,
                        )
                    }),
                )
            }),
        )?;
    }
    batcher.flush()?;
    Ok((found.get(), created.get()))
}

fn absorb_card_page(
    batcher: &mut PageBatcher,
    store: &Rc<RefCell<CardStore>>,
    page: PageId,
    categories: &[PageId],
    content: &str,
    found: &Cell<u32>,
    created: &Cell<u32>,
) -> Result<()> {
    let title = batcher
        .identity
        .title_of(page)
        .unwrap_or_default()
        .to_string();
    let templates = wikitext::parse_templates(content);
    let Some(table) = wikitext::find_template(&templates, "cardtable2") else {
        log::warn!("Found card without card table: {}", title);
        return Ok(());
    };

    let in_category = |category: &str| {
        batcher
            .identity
            .id_of(category)
            .is_some_and(|id| categories.contains(&id))
    };
    let mut kind = table
        .arg_trimmed("card_type")
        .unwrap_or("monster")
        .to_lowercase();
    if kind == "counter" || in_category(CAT_TOKENS) {
        kind = "token".to_string();
    }
    if in_category(CAT_SKILLS) {
        kind = "skill".to_string();
    }
    let card_type = match kind.as_str() {
        "monster" => CardType::Monster,
        "spell" => CardType::Spell,
        "trap" => CardType::Trap,
        "token" => CardType::Token,
        "skill" => CardType::Skill,
        other => {
            log::warn!("Found card with illegal card type '{}': {}", other, title);
            return Ok(());
        }
    };

    let keys = card_keys(table, page, &title);
    let existing = reconcile::find_card(&store.borrow(), reconcile::WIKI_CARD_LADDER, &keys);
    let mut card = match existing {
        Some(id) => match store.borrow().card(&id) {
            Some(card) => card.clone(),
            None => return Ok(()),
        },
        None => Card::new(CardId::new_v4(), card_type),
    };

    if !write_card(&mut card, table, &templates, &title, page) {
        return Ok(());
    }
    let image_requests = collect_image_requests(&mut card, table, &title);
    let card_id = card.id;
    store.borrow_mut().upsert_card(card);
    if existing.is_some() {
        found.set(found.get() + 1);
    } else {
        created.set(created.get() + 1);
    }

    queue_card_images(batcher, store, card_id, image_requests)
}

/// Extracts the reconciliation keys the wiki offers for a card page.
fn card_keys(table: &Template, page: PageId, title: &str) -> CardKeys {
    let mut keys = CardKeys {
        wiki_id: Some(page),
        konami_id: table.arg("database_id").and_then(leading_digits),
        ..Default::default()
    };
    if let Some(password) = table.arg_trimmed("password").and_then(leading_digit_str) {
        keys.passwords.push(password.to_string());
    }
    // Dozens of unrelated token cards are titled exactly "Token"; name
    // matching would glue them all together.
    if title != "Token" && !title.is_empty() {
        keys.names.push(title.to_string());
    }
    keys
}

/// Merges a card page's fields onto the canonical card. Returns false
/// when the page turns out not to describe a usable card.
fn write_card(
    card: &mut Card,
    table: &Template,
    templates: &[Template],
    title: &str,
    page: PageId,
) -> bool {
    for (prefix, locale) in LOCALES {
        let arg_name = |suffix: &str| {
            if prefix.is_empty() {
                suffix.to_string()
            } else {
                format!("{}_{}", prefix, suffix)
            }
        };

        let mut name = table.arg_trimmed(&arg_name("name")).map(strip_markup);
        if prefix.is_empty() && name.is_none() {
            name = Some(title.to_string());
        }
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            card.text_mut(locale, &name);
        }

        if let Some(lore) = table.arg_trimmed(&arg_name("lore")) {
            if let Some(text) = card.text.get_mut(*locale) {
                text.effect = Some(strip_markup(lore));
            }
        }
        if let Some(pendulum) = table.arg_trimmed(&arg_name("pendulum_effect")) {
            if let Some(text) = card.text.get_mut(*locale) {
                text.pendulum_effect = Some(strip_markup(pendulum));
            }
        }

        let unofficial = templates.iter().any(|t| {
            (t.name == "Unofficial name" || t.name == "Unofficial lore")
                && t.positional(0)
                    .map(str::trim)
                    .and_then(|language| {
                        LOCALES_FULL
                            .iter()
                            .find(|(full, _)| *full == language)
                            .map(|(_, code)| *code)
                    })
                    == Some(*locale)
        });
        if unofficial {
            if let Some(text) = card.text.get_mut(*locale) {
                text.official = false;
            }
        }
    }

    if matches!(card.card_type, CardType::Monster | CardType::Token)
        && !write_monster_stats(card, table, title)
    {
        return false;
    }

    match card.card_type {
        CardType::Monster => {
            if !write_monster_extras(card, table, title) {
                return false;
            }
        }
        CardType::Spell | CardType::Trap => {
            let Some(value) = table.arg_trimmed("property") else {
                log::warn!("Spell/trap has no subcategory: {}", title);
                return false;
            };
            match parse_spell_trap_kind(value) {
                Some(kind) => card.spell_trap_kind = Some(kind),
                None => {
                    log::warn!("Unknown spell/trap property '{}' in {}", value, title);
                    return false;
                }
            }
        }
        CardType::Token => {}
        CardType::Skill => {
            if let Some(character) = table.arg_trimmed("character") {
                card.character = Some(character.to_string());
            }
            let typeline: Vec<&str> = table
                .arg_trimmed("types")
                .unwrap_or("")
                .split('/')
                .map(str::trim)
                .filter(|x| !x.is_empty())
                .collect();
            if typeline.len() == 3 {
                card.skill_type = Some(typeline[2].to_string());
            } else if typeline.len() > 3 {
                log::warn!("Found skill card {} with weird typeline: {:?}", title, typeline);
            }
        }
    }

    if let Some(value) = table.arg_trimmed("password") {
        if leading_digit_str(value).is_some() {
            card.add_password(value);
        } else if value != "none" {
            log::warn!("Bad password '{}' in card {}", value, title);
        }
    }

    if table.arg_trimmed("limitation_text").is_some() {
        card.illegal = true;
    }

    card.external.wiki_id = Some(page);
    card.external.wiki_title = Some(title.to_string());
    if let Some(konami_id) = table.arg("database_id").and_then(leading_digits) {
        card.external.konami_id = Some(konami_id);
    }

    true
}

/// Attribute, typeline, level, ATK, DEF — shared by monsters and tokens.
fn write_monster_stats(card: &mut Card, table: &Template, title: &str) -> bool {
    let is_token = card.card_type == CardType::Token;
    let typeline_raw = table.arg_trimmed("types").unwrap_or("").to_string();
    if typeline_raw.is_empty() && !is_token {
        log::warn!("Monster has no typeline: {}", title);
        return false;
    }

    if let Some(value) = table.arg_trimmed("attribute") {
        let value = value.to_lowercase();
        // "???" means attribute to be announced; omit it.
        if value != "???" {
            match Attribute::parse(&value) {
                Some(attribute) => card.attribute = Some(attribute),
                None => {
                    if !is_token {
                        log::warn!("Unknown attribute '{}' in {}", value, title);
                    }
                }
            }
        }
    }

    let typeline: Vec<&str> = typeline_raw
        .split('/')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .collect();
    for part in &typeline {
        let known = TYPELINE_PLACEHOLDERS.contains(part)
            || MONSTER_TYPES.iter().any(|(k, _)| k == part)
            || RACES.iter().any(|(k, _)| k == part)
            || CLASSIFICATIONS.iter().any(|(k, _)| k == part)
            || ABILITIES.iter().any(|(k, _)| k == part);
        if !known {
            log::warn!("Monster typeline bit unknown in {}: {}", title, part);
        }
    }
    for (key, value) in MONSTER_TYPES {
        if typeline.contains(key) && !card.monster_types.contains(value) {
            card.monster_types.push(*value);
        }
    }
    for (key, value) in RACES {
        if typeline.contains(key) {
            card.race = Some(*value);
        }
    }
    for (key, value) in CLASSIFICATIONS {
        if typeline.contains(key) && !card.classifications.contains(value) {
            card.classifications.push(*value);
        }
    }
    for (key, value) in ABILITIES {
        if typeline.contains(key) && !card.abilities.contains(value) {
            card.abilities.push(*value);
        }
    }

    if let Some(value) = table.arg_trimmed("level") {
        if value != "???" {
            match value.parse() {
                Ok(level) => card.level = Some(level),
                Err(_) => {
                    if !is_token {
                        log::warn!("Unknown level '{}' in {}", value, title);
                        return false;
                    }
                }
            }
        }
    }
    let atk = match read_stat(table, "atk", title, is_token) {
        Ok(stat) => stat,
        Err(()) => return false,
    };
    if atk.is_some() {
        card.atk = atk;
    }
    let def = match read_stat(table, "def", title, is_token) {
        Ok(stat) => stat,
        Err(()) => return false,
    };
    if def.is_some() {
        card.def_ = def;
    }

    true
}

/// Reads an ATK/DEF argument. `Err` means the value was garbage on a
/// card that must have one; `Ok(None)` means absent or to-be-announced.
fn read_stat(table: &Template, arg: &str, title: &str, is_token: bool) -> Result<Option<Stat>, ()> {
    let Some(value) = table.arg_trimmed(arg) else {
        return Ok(None);
    };
    if value == "???" {
        return Ok(None);
    }
    match parse_stat(value) {
        Some(stat) => Ok(Some(stat)),
        None => {
            log::warn!("Unknown {} '{}' in {}", arg.to_uppercase(), value, title);
            if is_token {
                Ok(None)
            } else {
                Err(())
            }
        }
    }
}

/// Rank, pendulum scale, link arrows — monsters only.
fn write_monster_extras(card: &mut Card, table: &Template, title: &str) -> bool {
    if let Some(value) = table.arg_trimmed("rank") {
        if value != "???" {
            match value.parse() {
                Ok(rank) => card.rank = Some(rank),
                Err(_) => {
                    log::warn!("Unknown rank '{}' in {}", value, title);
                    return false;
                }
            }
        }
    }
    if let Some(value) = table.arg_trimmed("pendulum_scale") {
        if value != "???" {
            match value.parse() {
                Ok(scale) => card.scale = Some(scale),
                Err(_) => {
                    log::warn!("Unknown scale '{}' in {}", value, title);
                    return false;
                }
            }
        }
    }
    if let Some(value) = table.arg_trimmed("link_arrows") {
        card.link_arrows = value
            .split(',')
            .filter_map(|arrow| {
                let normalized = arrow.trim().to_lowercase().replace('-', "");
                let parsed = parse_link_arrow(&normalized);
                if parsed.is_none() {
                    log::warn!("Unknown link arrow '{}' in {}", arrow.trim(), title);
                }
                parsed
            })
            .collect();
    }
    true
}

/// Pairs the card table's image entries with the card's image slots,
/// appending slots as needed, and returns the (slot, file page) pairs
/// whose URLs need fetching.
///
/// Generic art is better sourced from the bulk importers; wiki art only
/// fills in when nothing better is present.
fn collect_image_requests(
    card: &mut Card,
    table: &Template,
    title: &str,
) -> Vec<(Uuid, String)> {
    let only_wiki_art = card.images.iter().all(|image| {
        (image.card_art.is_none() && image.crop_art.is_none())
            || image
                .card_art
                .as_deref()
                .is_some_and(|url| url.contains("yugipedia.com"))
    });
    if !only_wiki_art {
        return Vec::new();
    }
    let Some(raw) = table.arg("image") else {
        return Vec::new();
    };

    // Each line is "file", "code; file", or "code; file; caption".
    let mut files: Vec<String> = Vec::new();
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        let parts: Vec<&str> = line.split(';').map(str::trim).collect();
        match parts.len() {
            1 => files.push(parts[0].to_string()),
            2 | 3 => files.push(parts[1].to_string()),
            _ => log::warn!("Weird image string for {}: {}", title, line.trim()),
        }
    }

    let single_password = (card.passwords.len() == 1).then(|| card.passwords[0].clone());
    let mut files = files.into_iter();
    let mut requests: Vec<(Uuid, String)> = Vec::new();
    for image in &card.images {
        let Some(file) = files.next() else { break };
        requests.push((image.id, file));
    }
    for file in files {
        let mut image = CardImage::new();
        image.password = single_password.clone();
        requests.push((image.id, file));
        card.images.push(image);
    }
    requests
}

fn queue_card_images(
    batcher: &mut PageBatcher,
    store: &Rc<RefCell<CardStore>>,
    card_id: CardId,
    requests: Vec<(Uuid, String)>,
) -> Result<()> {
    for (image_id, file) in requests {
        let store = Rc::clone(store);
        batcher.image_url(
            format!("File:{}", file),
            Box::new(move |_batcher, url| {
                let mut store = store.borrow_mut();
                if let Some(card) = store.card_mut(&card_id) {
                    if let Some(image) = card.images.iter_mut().find(|i| i.id == image_id) {
                        image.card_art = Some(url);
                    }
                }
                Ok(())
            }),
        )?;
    }
    Ok(())
}

// --- Sets -------------------------------------------------------------

fn import_sets(
    batcher: &mut PageBatcher,
    store: &Rc<RefCell<CardStore>>,
    now: DateTime<Utc>,
) -> Result<(u32, u32)> {
    let last_sync = store.borrow().sync.wiki_last_read;
    let outcome = synchronize(batcher, last_sync, now, SET_CATEGORIES, true)?;
    if !outcome.full_recrawl {
        batcher.invalidate_pages(&outcome.changed);
    }
    log::info!(
        "Importing {} set pages ({})",
        outcome.changed.len(),
        if outcome.full_recrawl {
            "full re-crawl"
        } else {
            "incremental"
        }
    );

    let found = Rc::new(Cell::new(0u32));
    let created = Rc::new(Cell::new(0u32));
    for page in outcome.changed {
        let store = Rc::clone(store);
        let found = Rc::clone(&found);
        let created = Rc::clone(&created);
        batcher.page_contents(
            page,
            Box::new(move |batcher, content| {
                absorb_set_page(batcher, &store, page, &content, &found, &created)
            }),
        )?;
    }
    batcher.flush()?;
    Ok((found.get(), created.get()))
}

fn absorb_set_page(
    batcher: &mut PageBatcher,
    store: &Rc<RefCell<CardStore>>,
    page: PageId,
    content: &str,
    found: &Cell<u32>,
    created: &Cell<u32>,
) -> Result<()> {
    let title = batcher
        .identity
        .title_of(page)
        .unwrap_or_default()
        .to_string();
    let templates = wikitext::parse_templates(content);
    let Some(table) = wikitext::find_template(&templates, "infobox set") else {
        log::warn!("Found set without set table: {}", title);
        return Ok(());
    };

    let keys = set_keys(table, page, &title);
    let existing = reconcile::find_set(&store.borrow(), reconcile::WIKI_SET_LADDER, &keys);
    let mut set = match existing {
        Some(id) => match store.borrow().set(&id) {
            Some(set) => set.clone(),
            None => return Ok(()),
        },
        None => Set::new(SetId::new_v4()),
    };

    write_set(&mut set, table, &title, page);
    store.borrow_mut().upsert_set(set);
    if existing.is_some() {
        found.set(found.get() + 1);
    } else {
        created.set(created.get() + 1);
    }
    Ok(())
}

fn set_keys(table: &Template, page: PageId, title: &str) -> SetKeys {
    let mut keys = SetKeys {
        wiki_id: Some(page),
        ..Default::default()
    };
    for (name, value) in table.named_args() {
        if name.ends_with("_database_id") {
            keys.konami_ids.extend(parse_konami_id_lines(value, name, title));
        }
    }
    if let Some(en_name) = table.arg_trimmed("en_name") {
        keys.names.push(strip_markup(en_name));
    } else if !title.is_empty() {
        keys.names.push(title.to_string());
    }
    keys
}

fn write_set(set: &mut Set, table: &Template, title: &str, page: PageId) {
    for (name, value) in table.named_args() {
        if let Some(prefix) = name.strip_suffix("_name") {
            let cleaned = strip_markup(value);
            if !cleaned.trim().is_empty() {
                set.set_name(locale_code(prefix), cleaned.trim());
            }
        } else if let Some(prefix) = name.strip_suffix("_release_date") {
            if let Some(date) = parse_release_date(value) {
                set.release_dates.insert(locale_code(prefix).to_string(), date);
            }
        } else if name.ends_with("_database_id") {
            for id in parse_konami_id_lines(value, name, title) {
                set.add_konami_id(id);
            }
        }
    }
    if set.en_name().is_none() && !title.is_empty() {
        set.set_name("en", title);
    }
    set.external.wiki_id = Some(page);
    set.external.wiki_title = Some(title.to_string());
}

/// A `*_database_id` value is a bullet list of numeric Konami set ids.
fn parse_konami_id_lines(value: &str, arg_name: &str, title: &str) -> Vec<i64> {
    let mut ids = Vec::new();
    for line in value.replace('*', "").lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<i64>() {
            Ok(id) => ids.push(id),
            Err(_) => {
                if line != "none" {
                    log::warn!(
                        "Unparsable konami set ID for {} in {}: \"{}\"",
                        arg_name,
                        title,
                        line
                    );
                }
            }
        }
    }
    ids
}

// --- Parse helpers ----------------------------------------------------

fn parse_spell_trap_kind(value: &str) -> Option<SpellTrapKind> {
    SpellTrapKind::parse(&value.to_lowercase().replace('-', ""))
}

fn parse_link_arrow(normalized: &str) -> Option<LinkArrow> {
    match normalized {
        "top" => Some(LinkArrow::Topcenter),
        "left" => Some(LinkArrow::Middleleft),
        "right" => Some(LinkArrow::Middleright),
        "bottom" => Some(LinkArrow::Bottomcenter),
        other => LinkArrow::parse(other),
    }
}

fn parse_stat(value: &str) -> Option<Stat> {
    if MYSTERY_STATS.contains(&value) {
        return Some(Stat::Unknown);
    }
    value.parse().ok().map(Stat::Value)
}

fn leading_digits(value: &str) -> Option<i64> {
    LEADING_DIGITS
        .find(value.trim())
        .and_then(|m| m.as_str().parse().ok())
}

fn leading_digit_str(value: &str) -> Option<&str> {
    LEADING_DIGITS.find(value).map(|m| m.as_str())
}

fn locale_code(prefix: &str) -> &str {
    LOCALES
        .iter()
        .find(|(p, _)| *p == prefix && !p.is_empty())
        .map(|(_, code)| *code)
        .unwrap_or(prefix)
}

fn parse_month(value: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    let lower = value.to_lowercase();
    for (index, month) in MONTHS.iter().enumerate() {
        if *month == lower || (lower.len() == 3 && month.starts_with(&lower)) {
            return Some(index as u32 + 1);
        }
    }
    lower.parse().ok()
}

/// Parses the free-form dates set infoboxes carry: "January 25, 2024",
/// "March 2004", or a bare year.
pub fn parse_release_date(value: &str) -> Option<NaiveDate> {
    let (month, day, year) = if let Some(captures) = DATE_FULL.captures(value) {
        (
            captures[1].to_string(),
            captures[2].to_string(),
            captures[3].to_string(),
        )
    } else if let Some(captures) = DATE_MONTH_YEAR.captures(value) {
        (captures[1].to_string(), "1".to_string(), captures[2].to_string())
    } else if let Some(captures) = DATE_YEAR.captures(value) {
        ("1".to_string(), "1".to_string(), captures[1].to_string())
    } else {
        return None;
    };

    NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        parse_month(&month)?,
        day.parse().ok()?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_date_formats() {
        assert_eq!(
            parse_release_date("January 25, 2024"),
            NaiveDate::from_ymd_opt(2024, 1, 25)
        );
        assert_eq!(
            parse_release_date("March 2004"),
            NaiveDate::from_ymd_opt(2004, 3, 1)
        );
        assert_eq!(
            parse_release_date("sometime in 1999"),
            NaiveDate::from_ymd_opt(1999, 1, 1)
        );
        assert_eq!(parse_release_date("unreleased"), None);
    }

    #[test]
    fn leading_digit_extraction() {
        assert_eq!(leading_digits(" 12345 (alt) "), Some(12345));
        assert_eq!(leading_digits("none"), None);
        assert_eq!(leading_digit_str("46986414?"), Some("46986414"));
    }

    #[test]
    fn stats_parse_mystery_values() {
        assert_eq!(parse_stat("2500"), Some(Stat::Value(2500)));
        assert_eq!(parse_stat("?"), Some(Stat::Unknown));
        assert_eq!(parse_stat("X000"), Some(Stat::Unknown));
        assert_eq!(parse_stat("strong"), None);
    }

    #[test]
    fn locale_prefix_mapping() {
        assert_eq!(locale_code("tc"), "zh-TW");
        assert_eq!(locale_code("ja"), "ja");
        assert_eq!(locale_code("na"), "na");
    }
}
