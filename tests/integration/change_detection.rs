// tests/integration/change_detection.rs
//! Changelog-driven incremental detection and the full-recrawl cutoff.

use crate::common::{batcher_over, FakeWiki};
use cardvault::wiki::changes::{detect_changes, fetch_changelog, synchronize};
use cardvault::wiki::{ChangeKind, MemberKind};
use cardvault::PageId;
use chrono::{Duration, Utc};
use std::collections::HashSet;

const TRACKED: &[&str] = &["Category:TCG cards"];

fn tracked_wiki() -> FakeWiki {
    let mut wiki = FakeWiki::new();
    wiki.add_page(101, "Old Card", "card page");
    wiki.add_category(1, "Category:TCG cards", &[101]);
    wiki
}

#[test]
fn tracked_page_edit_is_changed_directly() {
    let mut wiki = tracked_wiki();
    wiki.add_change(101, "Old Card", "edit");
    let (_shared, mut batcher) = batcher_over(wiki);

    let changelog = fetch_changelog(&mut batcher, Utc::now()).unwrap();
    assert_eq!(changelog.len(), 1);
    assert_eq!(changelog[0].kind, ChangeKind::Edit);

    let tracked: HashSet<PageId> = [PageId(101)].into();
    let changed = detect_changes(&mut batcher, &tracked, TRACKED, &changelog).unwrap();
    assert!(changed.contains(&PageId(101)));
}

#[test]
fn newly_categorized_page_is_detected_and_member_cache_patched() {
    // Page 55 joined the tracked category after the member list was
    // cached without it.
    let mut wiki = tracked_wiki();
    wiki.add_page(55, "New Card", "card page");
    wiki.set_page_categories(55, &[1]);
    wiki.add_change(55, "New Card", "new");
    let (_shared, mut batcher) = batcher_over(wiki);

    // Prime the member cache and the identity map (as a previous
    // enumeration would have).
    batcher
        .category_members("Category:TCG cards", Box::new(|_b, _m| Ok(())))
        .unwrap();
    batcher.flush().unwrap();
    let cached: Vec<PageId> = batcher
        .cached_members(PageId(1))
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(cached, vec![PageId(101)]);

    let changelog = fetch_changelog(&mut batcher, Utc::now()).unwrap();
    let tracked: HashSet<PageId> = [PageId(101)].into();
    let changed = detect_changes(&mut batcher, &tracked, TRACKED, &changelog).unwrap();

    assert!(changed.contains(&PageId(55)));
    let members = batcher.cached_members(PageId(1)).unwrap();
    let patched = members
        .iter()
        .find(|m| m.id == PageId(55))
        .expect("member list patched with the new page");
    assert_eq!(patched.kind, MemberKind::Page);
    assert_eq!(patched.title, "New Card");
}

#[test]
fn category_namespace_changes_are_not_category_checked() {
    let mut wiki = tracked_wiki();
    wiki.add_category(9, "Category:Brand new", &[]);
    wiki.add_change(9, "Category:Brand new", "new");
    let (shared, mut batcher) = batcher_over(wiki);

    let changelog = fetch_changelog(&mut batcher, Utc::now()).unwrap();
    let tracked: HashSet<PageId> = [PageId(101)].into();
    let calls_before = shared.borrow().calls.len();
    let changed = detect_changes(&mut batcher, &tracked, TRACKED, &changelog).unwrap();

    assert!(changed.is_empty());
    // No category lookups were spent on the category page.
    assert_eq!(shared.borrow().calls.len(), calls_before);
}

#[test]
fn second_sync_with_no_remote_changes_is_empty() {
    let (_shared, mut batcher) = batcher_over(tracked_wiki());
    let now = Utc::now();

    // First sync: nothing known yet, so everything is changed.
    let first = synchronize(&mut batcher, None, now, TRACKED, false).unwrap();
    assert!(first.full_recrawl);
    assert_eq!(first.changed, vec![PageId(101)]);

    // Second sync an hour later: empty changelog, empty changed set.
    let later = now + Duration::hours(1);
    let second = synchronize(&mut batcher, Some(now), later, TRACKED, false).unwrap();
    assert!(!second.full_recrawl);
    assert!(second.changed.is_empty());
    assert!(batcher.use_cache, "bypass flag restored after detection");
}

#[test]
fn stale_sync_state_forces_full_recrawl() {
    let (_shared, mut batcher) = batcher_over(tracked_wiki());
    let now = Utc::now();

    let last = now - Duration::days(45);
    let outcome = synchronize(&mut batcher, Some(last), now, TRACKED, false).unwrap();
    assert!(outcome.full_recrawl);
    assert_eq!(outcome.changed, vec![PageId(101)]);
}
