// tests/integration/category_recursion.rs
//! Recursive category resolution: dedup, nesting, cycles.

use crate::common::{batcher_over, FakeWiki};
use cardvault::wiki::categories::members_recursive;
use cardvault::PageId;
use std::cell::RefCell;
use std::rc::Rc;

fn resolve(mut wiki: FakeWiki, root: &str) -> (Vec<PageId>, Rc<RefCell<FakeWiki>>) {
    for id in [101i64, 102, 103] {
        if wiki.pages.contains_key(&id) {
            continue;
        }
        wiki.add_page(id, &format!("Card {}", id), "card page");
    }
    let (shared, mut batcher) = batcher_over(wiki);
    let result = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&result);
    members_recursive(
        &mut batcher,
        root,
        Box::new(move |_b, pages| {
            *sink.borrow_mut() = pages;
            Ok(())
        }),
    )
    .unwrap();
    batcher.flush().unwrap();
    let pages = result.borrow().clone();
    (pages, shared)
}

#[test]
fn overlapping_subcategories_resolve_without_duplicates() {
    let mut wiki = FakeWiki::new();
    wiki.add_page(101, "Card 101", "card page");
    wiki.add_page(102, "Card 102", "card page");
    wiki.add_category(1, "Category:Cards", &[2, 3]);
    wiki.add_category(2, "Category:Cards/A", &[101]);
    wiki.add_category(3, "Category:Cards/B", &[101, 102]);

    let (pages, _) = resolve(wiki, "Category:Cards");
    let mut pages: Vec<i64> = pages.into_iter().map(|p| p.value()).collect();
    pages.sort_unstable();
    assert_eq!(pages, vec![101, 102]);
}

#[test]
fn direct_and_nested_members_both_count() {
    let mut wiki = FakeWiki::new();
    wiki.add_page(101, "Card 101", "card page");
    wiki.add_page(102, "Card 102", "card page");
    wiki.add_page(103, "Card 103", "card page");
    wiki.add_category(1, "Category:Sets", &[101, 2]);
    wiki.add_category(2, "Category:Sets/2024", &[102, 3]);
    wiki.add_category(3, "Category:Sets/2024/EU", &[103]);

    let (pages, _) = resolve(wiki, "Category:Sets");
    let mut pages: Vec<i64> = pages.into_iter().map(|p| p.value()).collect();
    pages.sort_unstable();
    assert_eq!(pages, vec![101, 102, 103]);
}

#[test]
fn subcategory_cycle_terminates_with_each_category_expanded_once() {
    let mut wiki = FakeWiki::new();
    wiki.add_page(101, "Card 101", "card page");
    wiki.add_page(102, "Card 102", "card page");
    // A contains B, B contains A again.
    wiki.add_category(1, "Category:A", &[101, 2]);
    wiki.add_category(2, "Category:B", &[102, 1]);

    let (pages, shared) = resolve(wiki, "Category:A");
    let mut pages: Vec<i64> = pages.into_iter().map(|p| p.value()).collect();
    pages.sort_unstable();
    assert_eq!(pages, vec![101, 102]);

    // One member query per category, despite the cycle.
    assert_eq!(shared.borrow().count_calls("categorymembers"), 2);
}

#[test]
fn file_members_are_not_pages() {
    let mut wiki = FakeWiki::new();
    wiki.add_page(101, "Card 101", "card page");
    wiki.add_page(500, "File:Card101.png", "");
    wiki.add_category(1, "Category:Cards", &[101, 500]);

    let (pages, _) = resolve(wiki, "Category:Cards");
    let pages: Vec<i64> = pages.into_iter().map(|p| p.value()).collect();
    assert_eq!(pages, vec![101]);
}
