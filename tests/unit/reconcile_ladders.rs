// tests/unit/reconcile_ladders.rs
//! Ladder ordering across sources, and index freshness within a run.

use cardvault::store::reconcile::{
    find_card, CardKeys, PRODECK_CARD_LADDER, WIKI_CARD_LADDER, YAMLYUGI_CARD_LADDER,
};
use cardvault::store::CardStore;
use cardvault::{Card, CardId, CardType, PageId};
use pretty_assertions::assert_eq;

fn card(build: impl FnOnce(&mut Card)) -> Card {
    let mut card = Card::new(CardId::new_v4(), CardType::Monster);
    build(&mut card);
    card
}

#[test]
fn ladders_disagree_on_purpose() {
    // One card known by wiki id, another by konami id. A draft carrying
    // both keys resolves differently per source ladder.
    let mut store = CardStore::new();
    let by_wiki = card(|c| c.external.wiki_id = Some(PageId(77)));
    let by_konami = card(|c| c.external.konami_id = Some(4007));
    let wiki_hit = by_wiki.id;
    let konami_hit = by_konami.id;
    store.upsert_card(by_wiki);
    store.upsert_card(by_konami);

    let keys = CardKeys {
        wiki_id: Some(PageId(77)),
        konami_id: Some(4007),
        ..Default::default()
    };
    assert_eq!(find_card(&store, WIKI_CARD_LADDER, &keys), Some(wiki_hit));
    assert_eq!(
        find_card(&store, YAMLYUGI_CARD_LADDER, &keys),
        Some(konami_hit)
    );
}

#[test]
fn resolution_ignores_index_population_order() {
    // The same entity carries every key; whichever order the indices
    // were filled, the draft resolves to it via its top rung.
    for flip in [false, true] {
        let mut store = CardStore::new();
        let mut entity = card(|c| {
            c.external.konami_id = Some(5000);
            c.add_password("00000001");
        });
        if flip {
            entity.text_mut("en", "Some Card");
        }
        let id = entity.id;
        store.upsert_card(entity);

        let keys = CardKeys {
            konami_id: Some(5000),
            passwords: vec!["00000001".to_string()],
            names: vec!["Some Card".to_string()],
            ..Default::default()
        };
        assert_eq!(find_card(&store, PRODECK_CARD_LADDER, &keys), Some(id));
    }
}

#[test]
fn entities_added_earlier_in_a_run_are_visible_immediately() {
    let mut store = CardStore::new();

    // First record of the run mints an entity...
    let keys_one = CardKeys {
        konami_id: Some(9001),
        ..Default::default()
    };
    assert_eq!(find_card(&store, WIKI_CARD_LADDER, &keys_one), None);
    let minted = card(|c| c.external.konami_id = Some(9001));
    let minted_id = minted.id;
    store.upsert_card(minted);

    // ...and a later record in the same run finds it at once.
    assert_eq!(
        find_card(&store, WIKI_CARD_LADDER, &keys_one),
        Some(minted_id)
    );
}

#[test]
fn name_rung_is_last_resort_everywhere() {
    let mut store = CardStore::new();
    let named = card(|c| {
        c.text_mut("en", "Summoned Skull");
    });
    let named_id = named.id;
    store.upsert_card(named);

    let keys = CardKeys {
        konami_id: Some(123),
        passwords: vec!["70781052".to_string()],
        names: vec!["Summoned Skull".to_string()],
        ..Default::default()
    };
    for ladder in [WIKI_CARD_LADDER, YAMLYUGI_CARD_LADDER, PRODECK_CARD_LADDER] {
        assert_eq!(find_card(&store, ladder, &keys), Some(named_id));
    }
}
