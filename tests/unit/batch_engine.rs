// tests/unit/batch_engine.rs
//! Batch engine behavior: coalescing, caching, fan-in, missing pages.

use crate::common::{batcher_over, FakeWiki};
use cardvault::{PageId, PageKey};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn wiki_with_pages(count: i64) -> FakeWiki {
    let mut wiki = FakeWiki::new();
    for id in 1..=count {
        wiki.add_page(id, &format!("Page {}", id), &format!("content {}", id));
    }
    wiki
}

#[test]
fn n_keys_cost_ceil_n_over_50_calls() {
    let (wiki, mut batcher) = batcher_over(wiki_with_pages(120));
    let fired = Rc::new(Cell::new(0u32));

    for id in 1..=120i64 {
        let fired = Rc::clone(&fired);
        batcher
            .page_contents(id, Box::new(move |_b, _content| {
                fired.set(fired.get() + 1);
                Ok(())
            }))
            .unwrap();
    }
    batcher.flush().unwrap();

    assert_eq!(fired.get(), 120);
    // 120 distinct ids: two auto-triggered batches of 50, one flush of 20.
    assert_eq!(wiki.borrow().count_calls("revisions"), 3);
}

#[test]
fn each_continuation_fires_exactly_once() {
    let (_wiki, mut batcher) = batcher_over(wiki_with_pages(3));
    let fired = Rc::new(Cell::new(0u32));

    // Two callers fan in on the same key before the batch runs.
    for _ in 0..2 {
        let fired = Rc::clone(&fired);
        batcher
            .page_contents(2, Box::new(move |_b, content| {
                assert_eq!(content, "content 2");
                fired.set(fired.get() + 1);
                Ok(())
            }))
            .unwrap();
    }
    batcher.flush().unwrap();
    batcher.flush().unwrap();

    assert_eq!(fired.get(), 2);
}

#[test]
fn cached_value_answers_synchronously_without_network() {
    let (wiki, mut batcher) = batcher_over(wiki_with_pages(3));

    batcher
        .page_contents(1, Box::new(|_b, _c| Ok(())))
        .unwrap();
    batcher.flush().unwrap();
    let calls_before = wiki.borrow().calls.len();

    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);
    batcher
        .page_contents(1, Box::new(move |_b, content| {
            assert_eq!(content, "content 1");
            flag.set(true);
            Ok(())
        }))
        .unwrap();

    // Continuation already ran, synchronously, with no new call.
    assert!(fired.get());
    assert_eq!(wiki.borrow().calls.len(), calls_before);
}

#[test]
fn cache_bypass_forces_refetch_but_still_writes() {
    let (wiki, mut batcher) = batcher_over(wiki_with_pages(3));

    batcher.page_contents(1, Box::new(|_b, _c| Ok(()))).unwrap();
    batcher.flush().unwrap();
    assert_eq!(wiki.borrow().count_calls("revisions"), 1);

    batcher.use_cache = false;
    batcher.page_contents(1, Box::new(|_b, _c| Ok(()))).unwrap();
    batcher.flush().unwrap();
    assert_eq!(wiki.borrow().count_calls("revisions"), 2);

    // The bypassed fetch refilled the cache for cached readers.
    batcher.use_cache = true;
    batcher.page_contents(1, Box::new(|_b, _c| Ok(()))).unwrap();
    assert_eq!(wiki.borrow().count_calls("revisions"), 2);
}

#[test]
fn missing_page_is_cached_and_silent() {
    let (wiki, mut batcher) = batcher_over(wiki_with_pages(1));
    let fired = Rc::new(Cell::new(false));

    let flag = Rc::clone(&fired);
    batcher
        .page_contents(999, Box::new(move |_b, _c| {
            flag.set(true);
            Ok(())
        }))
        .unwrap();
    batcher.flush().unwrap();

    assert!(!fired.get());
    assert!(batcher.identity.is_missing(&PageKey::from(999i64)));

    // A later request for the same page never reaches the network.
    let calls_before = wiki.borrow().calls.len();
    batcher.page_contents(999, Box::new(|_b, _c| Ok(()))).unwrap();
    batcher.flush().unwrap();
    assert_eq!(wiki.borrow().calls.len(), calls_before);
}

#[test]
fn ids_and_titles_are_never_mixed_in_one_call() {
    let (wiki, mut batcher) = batcher_over(wiki_with_pages(4));

    batcher.page_contents(1, Box::new(|_b, _c| Ok(()))).unwrap();
    batcher
        .page_contents("Page 2", Box::new(|_b, _c| Ok(())))
        .unwrap();
    batcher.flush().unwrap();

    let wiki = wiki.borrow();
    let content_calls: Vec<_> = wiki
        .calls
        .iter()
        .filter(|params| params.iter().any(|(k, v)| k == "prop" && v == "revisions"))
        .collect();
    assert_eq!(content_calls.len(), 2);
    for call in content_calls {
        let has_ids = call.iter().any(|(k, _)| k == "pageids");
        let has_titles = call.iter().any(|(k, _)| k == "titles");
        assert!(has_ids != has_titles, "one key form per call: {:?}", call);
    }
}

#[test]
fn identity_map_learns_pairs_from_responses() {
    let (_wiki, mut batcher) = batcher_over(wiki_with_pages(2));

    batcher.page_contents(1, Box::new(|_b, _c| Ok(()))).unwrap();
    batcher.flush().unwrap();

    assert_eq!(batcher.identity.title_of(1.into()), Some("Page 1"));
    assert_eq!(batcher.identity.id_of("Page 1"), Some(1.into()));
}

#[test]
fn page_id_lookups_learn_pairs_then_answer_from_the_identity_map() {
    let (wiki, mut batcher) = batcher_over(wiki_with_pages(2));
    let resolved = Rc::new(RefCell::new(None));

    let sink = Rc::clone(&resolved);
    batcher
        .page_id("Page 1", Box::new(move |_b, id, title| {
            *sink.borrow_mut() = Some((id, title));
            Ok(())
        }))
        .unwrap();
    batcher.flush().unwrap();
    assert_eq!(
        *resolved.borrow(),
        Some((PageId(1), "Page 1".to_string()))
    );

    // The reverse lookup now answers from the identity map, without a
    // network call, even though nothing cached the page itself.
    let calls_before = wiki.borrow().calls.len();
    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);
    batcher
        .page_id(1, Box::new(move |_b, _id, title| {
            assert_eq!(title, "Page 1");
            flag.set(true);
            Ok(())
        }))
        .unwrap();
    assert!(fired.get());
    assert_eq!(wiki.borrow().calls.len(), calls_before);
}

#[test]
fn continuations_can_enqueue_more_work_before_flush_returns() {
    let mut wiki = wiki_with_pages(2);
    wiki.set_page_categories(1, &[10]);
    wiki.add_category(10, "Category:Things", &[1]);
    let (_wiki, mut batcher) = batcher_over(wiki);

    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);
    batcher
        .page_categories(1, Box::new(move |batcher, categories| {
            assert_eq!(categories.len(), 1);
            // Chain a second request from inside the continuation.
            batcher.page_contents(1, Box::new(move |_b, content| {
                assert_eq!(content, "content 1");
                flag.set(true);
                Ok(())
            }))
        }))
        .unwrap();
    batcher.flush().unwrap();

    // The chained request resolved within the same flush.
    assert!(fired.get());
}
