// src/wiki/changes.rs
//! Incremental change detection.
//!
//! Given the last successful sync time and the tracked category set,
//! computes the minimal set of pages needing refetch: pages already
//! tracked whose ids appear in the recent-changes feed, plus brand-new
//! or re-categorized pages whose current categories place them in a
//! tracked category. When too much time has passed for the feed to be
//! trustworthy, the whole universe is re-enumerated instead.
//!
//! Any transport error aborts the attempt before the last-sync
//! timestamp advances, so a failed run safely retries the same window.

use super::batcher::PageBatcher;
use super::categories::members_recursive;
use super::transport::{query, set_param};
use super::types::{CategoryMember, ChangeKind, ChangelogEntry, MemberKind};
use crate::constants::FULL_RECRAWL_AFTER_SECS;
use crate::error::Result;
use crate::types::PageId;
use chrono::{DateTime, SecondsFormat, Utc};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

/// Fetches the wiki's recent-changes feed back to `since`, newest first.
pub fn fetch_changelog(
    batcher: &mut PageBatcher,
    since: DateTime<Utc>,
) -> Result<Vec<ChangelogEntry>> {
    let mut params = query(&[
        ("action", "query"),
        ("list", "recentchanges"),
        ("redirects", "1"),
        ("rclimit", "max"),
    ]);
    set_param(
        &mut params,
        "rcend",
        since.to_rfc3339_opts(SecondsFormat::Secs, true),
    );

    let mut entries = Vec::new();
    for result_page in &batcher.paginate(&params)? {
        for row in super::responses::recent_changes_of(result_page)? {
            let (Some(pageid), Some(title)) = (row.pageid, row.title) else {
                continue;
            };
            let Some(kind) = row.kind.as_deref().and_then(ChangeKind::parse) else {
                log::warn!(
                    "Unknown change type {:?} for page {} ({})",
                    row.kind,
                    pageid,
                    title
                );
                continue;
            };
            entries.push(ChangelogEntry {
                id: PageId(pageid),
                title,
                kind,
            });
        }
    }
    Ok(entries)
}

/// Computes the changed-page set from a changelog.
///
/// Tracked ids in the feed are changed directly. `new`/`categorize`
/// entries for non-category pages are resolved by fetching their
/// current categories; a hit against a tracked category adds the page
/// to the changed set and patches the cached member list so later
/// lookups stay consistent without a refetch.
pub fn detect_changes(
    batcher: &mut PageBatcher,
    tracked: &HashSet<PageId>,
    tracked_categories: &[&str],
    changelog: &[ChangelogEntry],
) -> Result<BTreeSet<PageId>> {
    let changed = Rc::new(RefCell::new(BTreeSet::new()));
    let mut to_check: Vec<&ChangelogEntry> = Vec::new();

    for entry in changelog {
        if tracked.contains(&entry.id) {
            changed.borrow_mut().insert(entry.id);
        } else if matches!(entry.kind, ChangeKind::Categorize | ChangeKind::New)
            && !entry.title.starts_with("Category:")
        {
            to_check.push(entry);
        }
    }

    let tracked_category_ids: Vec<PageId> = tracked_categories
        .iter()
        .filter_map(|title| batcher.identity.id_of(title))
        .collect();

    for entry in to_check {
        let entry = entry.clone();
        let changed = Rc::clone(&changed);
        let tracked_category_ids = tracked_category_ids.clone();
        batcher.page_categories(
            entry.id,
            Box::new(move |batcher, categories| {
                for category in &tracked_category_ids {
                    if categories.contains(category) {
                        batcher.patch_category_member(
                            *category,
                            CategoryMember {
                                id: entry.id,
                                title: entry.title.clone(),
                                kind: MemberKind::Page,
                            },
                        );
                        changed.borrow_mut().insert(entry.id);
                    }
                }
                Ok(())
            }),
        )?;
    }
    batcher.flush()?;

    let changed = changed.borrow().clone();
    Ok(changed)
}

/// What a synchronization pass decided needs refetching.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub changed: Vec<PageId>,
    pub full_recrawl: bool,
}

/// Computes the pages needing refetch since `last_sync`.
///
/// With no previous sync, or one older than the re-crawl threshold, the
/// tracked categories are fully re-enumerated and everything is treated
/// as changed. Otherwise the member lists are refreshed (cache
/// bypassed), the changelog is walked, and only actual changes come
/// back.
pub fn synchronize(
    batcher: &mut PageBatcher,
    last_sync: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    tracked_categories: &[&str],
    recursive: bool,
) -> Result<SyncOutcome> {
    let stale = match last_sync {
        None => true,
        Some(t) => (now - t).num_seconds() > FULL_RECRAWL_AFTER_SECS,
    };
    if stale {
        let changed = enumerate_pages(batcher, tracked_categories, recursive)?;
        return Ok(SyncOutcome {
            changed,
            full_recrawl: true,
        });
    }
    let since = last_sync.expect("stale is true when last_sync is None");

    batcher.use_cache = false;
    let result = (|| {
        let tracked = enumerate_pages(batcher, tracked_categories, recursive)?;
        let changelog = fetch_changelog(batcher, since)?;
        let tracked: HashSet<PageId> = tracked.into_iter().collect();
        detect_changes(batcher, &tracked, tracked_categories, &changelog)
    })();
    batcher.use_cache = true;

    Ok(SyncOutcome {
        changed: result?.into_iter().collect(),
        full_recrawl: false,
    })
}

/// Enumerates the page members of several categories, without
/// duplicates, preserving first-seen order. Flat or recursive per the
/// category tree's nature (card categories are flat; set categories
/// nest by year and region).
pub fn enumerate_pages(
    batcher: &mut PageBatcher,
    categories: &[&str],
    recursive: bool,
) -> Result<Vec<PageId>> {
    let found = Rc::new(RefCell::new((Vec::new(), HashSet::new())));

    for category in categories {
        let found = Rc::clone(&found);
        let collect: Box<dyn FnOnce(&mut PageBatcher, Vec<PageId>) -> Result<()>> =
            Box::new(move |_batcher, pages| {
                let (result, seen) = &mut *found.borrow_mut();
                for page in pages {
                    if seen.insert(page) {
                        result.push(page);
                    }
                }
                Ok(())
            });
        if recursive {
            members_recursive(batcher, *category, collect)?;
        } else {
            batcher.category_members(
                *category,
                Box::new(move |batcher, members| {
                    let pages = members
                        .into_iter()
                        .filter(|m| m.kind == MemberKind::Page)
                        .map(|m| m.id)
                        .collect();
                    collect(batcher, pages)
                }),
            )?;
        }
    }
    batcher.flush()?;

    let (result, _) = Rc::try_unwrap(found)
        .map(RefCell::into_inner)
        .unwrap_or_else(|shared| shared.borrow().clone());
    Ok(result)
}
