// tests/integration/sync_flow.rs
//! End-to-end wiki import: enumerate → fetch → parse → reconcile → merge.

use crate::common::{batcher_over, FakeWiki};
use cardvault::wiki::importer::import_from_wiki;
use cardvault::{
    Attribute, Card, CardId, CardStore, CardType, PageId, Race, SpellTrapKind, Stat,
};
use chrono::Utc;
use std::cell::RefCell;
use std::rc::Rc;

const DARK_MAGICIAN: &str = "{{CardTable2
| name = Dark Magician
| ja_name = ブラック・マジシャン
| card_type = Monster
| attribute = DARK
| types = Spellcaster / Normal
| level = 7
| atk = 2500
| def = 2100
| lore = The ultimate wizard in terms of attack and defense.
| password = 46986414
| database_id = 4041
| image = DarkMagician.png
}}";

const TYPHOON: &str = "{{CardTable2
| name = Mystical Space Typhoon
| card_type = Spell
| property = Quick-Play
| lore = Destroy 1 Spell/Trap on the field.
}}";

const BLUE_EYES_SET: &str = "{{Infobox set
| en_name = Legend of Blue Eyes White Dragon
| ja_name = 青眼の白龍伝説
| en_database_id = 23
| en_release_date = March 8, 2002
| ja_release_date = 1999
}}";

fn full_wiki() -> FakeWiki {
    let mut wiki = FakeWiki::new();
    wiki.add_page(101, "Dark Magician", DARK_MAGICIAN);
    wiki.add_page(102, "Mystical Space Typhoon", TYPHOON);
    wiki.add_category(1, "Category:TCG cards", &[101, 102]);
    wiki.add_category(2, "Category:OCG cards", &[]);
    wiki.set_page_categories(101, &[1]);
    wiki.set_page_categories(102, &[1]);
    let image = wiki.add_page(500, "File:DarkMagician.png", "");
    image.image_url = Some("https://img.example/dm.png".to_string());

    wiki.add_page(201, "Legend of Blue Eyes White Dragon", BLUE_EYES_SET);
    wiki.add_category(5, "Category:TCG sets", &[201]);
    wiki.add_category(6, "Category:OCG sets", &[]);
    wiki
}

fn shared_store() -> Rc<RefCell<CardStore>> {
    Rc::new(RefCell::new(CardStore::new()))
}

#[test]
fn full_import_builds_reconciled_entities() {
    let (_wiki, mut batcher) = batcher_over(full_wiki());
    let store = shared_store();
    let now = Utc::now();

    let report = import_from_wiki(&mut batcher, &store, now, true, true).unwrap();
    assert_eq!(report.cards_created, 2);
    assert_eq!(report.cards_found, 0);
    assert_eq!(report.sets_created, 1);

    let store = store.borrow();
    assert_eq!(store.card_count(), 2);
    assert_eq!(store.set_count(), 1);
    assert_eq!(store.sync.wiki_last_read, Some(now));

    let magician_id = store.card_by_wiki_id(PageId(101)).unwrap();
    let magician = store.card(&magician_id).unwrap();
    assert_eq!(magician.card_type, CardType::Monster);
    assert_eq!(magician.en_name(), Some("Dark Magician"));
    assert_eq!(
        magician.text.get("ja").map(|t| t.name.as_str()),
        Some("ブラック・マジシャン")
    );
    assert_eq!(magician.attribute, Some(Attribute::Dark));
    assert_eq!(magician.race, Some(Race::Spellcaster));
    assert_eq!(magician.level, Some(7));
    assert_eq!(magician.atk, Some(Stat::Value(2500)));
    assert_eq!(magician.passwords, vec!["46986414"]);
    assert_eq!(magician.external.konami_id, Some(4041));
    assert_eq!(
        magician.images[0].card_art.as_deref(),
        Some("https://img.example/dm.png")
    );

    let typhoon_id = store.card_by_wiki_id(PageId(102)).unwrap();
    let typhoon = store.card(&typhoon_id).unwrap();
    assert_eq!(typhoon.card_type, CardType::Spell);
    assert_eq!(typhoon.spell_trap_kind, Some(SpellTrapKind::Quickplay));

    let set_id = store.set_by_konami_id(23).unwrap();
    let set = store.set(&set_id).unwrap();
    assert_eq!(set.en_name(), Some("Legend of Blue Eyes White Dragon"));
    assert_eq!(
        set.release_dates.get("en").map(|d| d.to_string()),
        Some("2002-03-08".to_string())
    );
    assert_eq!(
        set.release_dates.get("ja").map(|d| d.to_string()),
        Some("1999-01-01".to_string())
    );
}

#[test]
fn second_import_with_no_changes_touches_nothing() {
    let (_wiki, mut batcher) = batcher_over(full_wiki());
    let store = shared_store();
    let first_run = Utc::now();
    import_from_wiki(&mut batcher, &store, first_run, true, true).unwrap();
    let cards_before = store.borrow().card_count();
    let magician_before = store.borrow().card_by_wiki_id(PageId(101)).unwrap();

    // Same wiki, empty changelog: the second run finds nothing to do.
    let second_run = first_run + chrono::Duration::hours(2);
    let report = import_from_wiki(&mut batcher, &store, second_run, true, true).unwrap();
    assert_eq!(report.cards_found, 0);
    assert_eq!(report.cards_created, 0);
    assert_eq!(store.borrow().card_count(), cards_before);
    // Entity ids are stable across runs.
    assert_eq!(
        store.borrow().card_by_wiki_id(PageId(101)).unwrap(),
        magician_before
    );
    // The sync window advanced.
    assert_eq!(store.borrow().sync.wiki_last_read, Some(second_run));
}

#[test]
fn wiki_record_folds_into_entity_seeded_by_another_source() {
    let (_wiki, mut batcher) = batcher_over(full_wiki());
    let store = shared_store();

    // Another source already contributed this card, known by its
    // Konami id but not by any wiki id.
    let mut seeded = Card::new(CardId::new_v4(), CardType::Monster);
    seeded.external.konami_id = Some(4041);
    seeded.add_password("46986414");
    let seeded_id = seeded.id;
    store.borrow_mut().upsert_card(seeded);

    let report = import_from_wiki(&mut batcher, &store, Utc::now(), true, false).unwrap();
    assert_eq!(report.cards_found, 1);
    assert_eq!(report.cards_created, 1); // the typhoon is genuinely new

    let store = store.borrow();
    assert_eq!(store.card_count(), 2);
    // The wiki record enriched the seeded entity instead of minting.
    assert_eq!(store.card_by_wiki_id(PageId(101)), Some(seeded_id));
    let merged = store.card(&seeded_id).unwrap();
    assert_eq!(merged.en_name(), Some("Dark Magician"));
    assert_eq!(merged.external.wiki_id, Some(PageId(101)));
    assert_eq!(merged.external.konami_id, Some(4041));
}

#[test]
fn name_only_match_reuses_the_existing_entity() {
    let (_wiki, mut batcher) = batcher_over(full_wiki());
    let store = shared_store();

    // No shared ids at all, only the normalized display name.
    let mut seeded = Card::new(CardId::new_v4(), CardType::Spell);
    seeded.text_mut("en", "Mystical Space Typhoon");
    let seeded_id = seeded.id;
    store.borrow_mut().upsert_card(seeded);

    import_from_wiki(&mut batcher, &store, Utc::now(), true, false).unwrap();

    let store = store.borrow();
    assert_eq!(store.card_count(), 2);
    assert_eq!(store.card_by_wiki_id(PageId(102)), Some(seeded_id));
}
