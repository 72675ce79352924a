// src/wiki/categories.rs
//! Recursive category-graph resolution.
//!
//! Enumerates, without duplicates, every page-type descendant reachable
//! from a root category through any chain of subcategory membership.
//! Member lists arrive through the batch engine, so recursion does not
//! block: each discovered subcategory is pushed onto an explicit work
//! queue (never the call stack — cached member lists would otherwise
//! recurse as deep as the category tree), and an outstanding-counter
//! join fires the final continuation once the whole chain has resolved.
//!
//! A visited set guards against subcategory cycles: a category reached
//! twice, by cycle or by diamond, is expanded only once.

use super::batcher::PageBatcher;
use super::types::{MemberKind, PageKey};
use crate::error::Result;
use crate::types::PageId;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

pub type PageSetCallback = Box<dyn FnOnce(&mut PageBatcher, Vec<PageId>) -> Result<()>>;

struct Traversal {
    result: Vec<PageId>,
    seen_pages: HashSet<PageId>,
    visited: HashSet<PageId>,
    queue: VecDeque<PageKey>,
    draining: bool,
    outstanding: usize,
    callback: Option<PageSetCallback>,
}

/// Requests every transitive page member of `root`. The continuation
/// receives the deduplicated page ids once every reachable subcategory
/// has been expanded (which may require one or more flushes).
pub fn members_recursive(
    batcher: &mut PageBatcher,
    root: impl Into<PageKey>,
    callback: PageSetCallback,
) -> Result<()> {
    let root = root.into();
    let state = Rc::new(RefCell::new(Traversal {
        result: Vec::new(),
        seen_pages: HashSet::new(),
        visited: HashSet::new(),
        queue: VecDeque::new(),
        draining: false,
        outstanding: 0,
        callback: Some(callback),
    }));
    if let Some(id) = batcher.identity.resolve(&root) {
        state.borrow_mut().visited.insert(id);
    }
    schedule(batcher, &state, root)
}

/// Queues a category for expansion and starts the drain loop unless one
/// is already running further up the stack.
fn schedule(batcher: &mut PageBatcher, state: &Rc<RefCell<Traversal>>, category: PageKey) -> Result<()> {
    {
        let mut traversal = state.borrow_mut();
        traversal.outstanding += 1;
        traversal.queue.push_back(category);
        if traversal.draining {
            return Ok(());
        }
        traversal.draining = true;
    }
    drain(batcher, state)
}

fn drain(batcher: &mut PageBatcher, state: &Rc<RefCell<Traversal>>) -> Result<()> {
    loop {
        let next = state.borrow_mut().queue.pop_front();
        let Some(category) = next else {
            break;
        };
        let shared = Rc::clone(state);
        let key = category.clone();
        batcher.category_members(
            category,
            Box::new(move |batcher, members| {
                // The member fetch taught the identity map this
                // category's id; a cycle leading back here must not
                // re-expand it.
                if let Some(id) = batcher.identity.resolve(&key) {
                    shared.borrow_mut().visited.insert(id);
                }
                expand(batcher, &shared, members)
            }),
        )?;
    }
    state.borrow_mut().draining = false;
    Ok(())
}

/// Processes one category's member list: collect its pages, queue its
/// unvisited subcategories, and fire the final continuation if this was
/// the last outstanding expansion.
fn expand(
    batcher: &mut PageBatcher,
    state: &Rc<RefCell<Traversal>>,
    members: Vec<super::types::CategoryMember>,
) -> Result<()> {
    let subcategories: Vec<PageId> = {
        let mut traversal = state.borrow_mut();
        for member in &members {
            if member.kind == MemberKind::Page && traversal.seen_pages.insert(member.id) {
                traversal.result.push(member.id);
            }
        }
        members
            .iter()
            .filter(|m| m.kind == MemberKind::Subcategory)
            .filter(|m| traversal.visited.insert(m.id))
            .map(|m| m.id)
            .collect()
    };

    for subcategory in subcategories {
        schedule(batcher, state, PageKey::Id(subcategory))?;
    }

    let finished = {
        let mut traversal = state.borrow_mut();
        traversal.outstanding -= 1;
        traversal.outstanding == 0
    };
    if finished {
        let (callback, result) = {
            let mut traversal = state.borrow_mut();
            (traversal.callback.take(), std::mem::take(&mut traversal.result))
        };
        if let Some(callback) = callback {
            return callback(batcher, result);
        }
    }
    Ok(())
}
