// src/wiki/batcher.rs
//! The deferred batch request engine.
//!
//! Callers ask fine-grained questions ("what is this page's content?",
//! "what categories is it in?") and hand over a continuation. Cached
//! answers run the continuation immediately and synchronously; everything
//! else queues until a kind accumulates [`BATCH_PAGE_MAX`] distinct keys
//! or an explicit [`PageBatcher::flush`] drains the queues. One batch
//! execution answers every queued key of its kind in as few API calls as
//! possible, caches the results, and fires every waiting continuation.
//!
//! Continuations receive `&mut PageBatcher` and may enqueue further
//! requests; `flush` keeps draining until no kind has pending work, so a
//! whole dependency chain resolves before it returns. A page confirmed
//! absent upstream is cached as known missing and its continuations are
//! never invoked — silence, not error. A transport failure aborts the
//! batch and propagates.
//!
//! Everything is single-threaded and cooperative. The batcher is the one
//! session object owning the transport, the identity map, and the caches;
//! no global state, no locks.

use super::cache::{CacheDir, Caches};
use super::identity::IdentityMap;
use super::responses;
use super::transport::{paginate, query, set_param, QueryParams, Transport};
use super::types::{CategoryMember, MemberKind, PageKey};
use crate::constants::BATCH_PAGE_MAX;
use crate::error::Result;
use crate::types::PageId;
use indexmap::IndexMap;
use serde_json::Value;

pub type ContentCallback = Box<dyn FnOnce(&mut PageBatcher, String) -> Result<()>>;
pub type CategoriesCallback = Box<dyn FnOnce(&mut PageBatcher, Vec<PageId>) -> Result<()>>;
pub type ImageUrlCallback = Box<dyn FnOnce(&mut PageBatcher, String) -> Result<()>>;
pub type PageIdCallback = Box<dyn FnOnce(&mut PageBatcher, PageId, String) -> Result<()>>;
pub type MembersCallback = Box<dyn FnOnce(&mut PageBatcher, Vec<CategoryMember>) -> Result<()>>;

pub struct PageBatcher {
    transport: Box<dyn Transport>,
    pub identity: IdentityMap,
    caches: Caches,
    cache_dir: Option<CacheDir>,
    /// When false, reads bypass the caches (writes still happen), so
    /// callers can force fresh data without losing it for later runs.
    pub use_cache: bool,

    pending_contents: IndexMap<PageKey, Vec<ContentCallback>>,
    pending_categories: IndexMap<PageKey, Vec<CategoriesCallback>>,
    pending_images: IndexMap<PageKey, Vec<ImageUrlCallback>>,
    pending_page_ids: IndexMap<PageKey, Vec<PageIdCallback>>,
    pending_members: IndexMap<PageKey, Vec<MembersCallback>>,
}

impl PageBatcher {
    /// Creates a batcher whose caches persist under `cache_dir`.
    pub fn new(transport: Box<dyn Transport>, cache_dir: CacheDir) -> Self {
        let (caches, identity) = cache_dir.load();
        Self {
            transport,
            identity,
            caches,
            cache_dir: Some(cache_dir),
            use_cache: true,
            pending_contents: IndexMap::new(),
            pending_categories: IndexMap::new(),
            pending_images: IndexMap::new(),
            pending_page_ids: IndexMap::new(),
            pending_members: IndexMap::new(),
        }
    }

    /// Creates a batcher with empty, non-persistent caches.
    pub fn in_memory(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            identity: IdentityMap::new(),
            caches: Caches::new(),
            cache_dir: None,
            use_cache: true,
            pending_contents: IndexMap::new(),
            pending_categories: IndexMap::new(),
            pending_images: IndexMap::new(),
            pending_page_ids: IndexMap::new(),
            pending_members: IndexMap::new(),
        }
    }

    /// Writes every cache namespace back to disk (checkpoint or orderly
    /// shutdown). No-op for in-memory batchers.
    pub fn save_caches(&self) -> Result<()> {
        if let Some(dir) = &self.cache_dir {
            dir.save(&self.caches, &self.identity)?;
        }
        Ok(())
    }

    /// Drops every cached namespace, forcing the next run to refetch.
    pub fn clear_caches(&mut self) {
        self.caches.clear();
        self.identity.clear_missing();
    }

    /// Drops the cached content, categories, and image URL of specific
    /// pages. Change detection calls this for every changed page so the
    /// refetch actually reaches the network instead of the cache.
    pub fn invalidate_pages(&mut self, pages: &[PageId]) {
        for id in pages {
            self.caches.contents.remove(id);
            self.caches.categories.remove(id);
            self.caches.images.remove(id);
        }
    }

    /// Runs a paginated query directly through the transport, outside
    /// the batching machinery (used for the recent-changes feed).
    pub fn paginate(&mut self, params: &QueryParams) -> Result<Vec<Value>> {
        paginate(self.transport.as_mut(), params)
    }

    /// Drains every pending queue to a fixed point: continuations run as
    /// their batches complete and may enqueue more work, so the loop
    /// repeats across all five kinds until none has anything left.
    pub fn flush(&mut self) -> Result<()> {
        while !self.pending_contents.is_empty()
            || !self.pending_categories.is_empty()
            || !self.pending_images.is_empty()
            || !self.pending_page_ids.is_empty()
            || !self.pending_members.is_empty()
        {
            self.run_contents_batch()?;
            self.run_categories_batch()?;
            self.run_images_batch()?;
            self.run_page_ids_batch()?;
            self.run_members_batch()?;
        }
        Ok(())
    }

    /// The canonical pending-queue key: the page id when the identity
    /// map already knows it, the caller's key otherwise. Keying by id
    /// lets two callers fan in even when one used the title.
    fn canonical_key(&self, page: PageKey) -> PageKey {
        match self.identity.resolve(&page) {
            Some(id) => PageKey::Id(id),
            None => page,
        }
    }

    // --- Request kind: page contents -----------------------------------

    /// Requests a page's current revision text.
    pub fn page_contents(
        &mut self,
        page: impl Into<PageKey>,
        callback: ContentCallback,
    ) -> Result<()> {
        let page = page.into();
        if self.identity.is_missing(&page) {
            return Ok(());
        }
        if self.use_cache {
            if let Some(content) = self
                .identity
                .resolve(&page)
                .and_then(|id| self.caches.contents.get(&id).cloned())
            {
                return callback(self, content);
            }
        }
        let key = self.canonical_key(page);
        self.pending_contents.entry(key).or_default().push(callback);
        if self.pending_contents.len() >= BATCH_PAGE_MAX {
            self.run_contents_batch()?;
        }
        Ok(())
    }

    fn run_contents_batch(&mut self) -> Result<()> {
        if self.pending_contents.is_empty() {
            return Ok(());
        }
        let mut pending = std::mem::take(&mut self.pending_contents);
        let (ids, titles) = split_keys(pending.keys());

        for group in [id_params(&ids), title_params(&titles)].into_iter().flatten() {
            let mut params = query(&[
                ("action", "query"),
                ("redirects", "1"),
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("rvslots", "main"),
            ]);
            params.push(group);
            let result_pages = paginate(self.transport.as_mut(), &params)?;

            for result_page in &result_pages {
                for row in responses::pages_of(result_page)? {
                    if row.is_absent() {
                        self.identity.mark_missing(&row.missing_key());
                        continue;
                    }
                    let (Some(pageid), Some(title)) = (row.pageid, row.title.clone()) else {
                        continue;
                    };
                    let id = PageId(pageid);
                    self.identity.record(id, &title);
                    let Some(content) = row.revision_text().map(str::to_string) else {
                        continue;
                    };
                    self.caches.contents.insert(id, content.clone());
                    for callback in take_callbacks(&mut pending, id, &title) {
                        callback(self, content.clone())?;
                    }
                }
            }
        }
        Ok(())
    }

    // --- Request kind: page categories ----------------------------------

    /// Requests the ids of every category a page belongs to.
    pub fn page_categories(
        &mut self,
        page: impl Into<PageKey>,
        callback: CategoriesCallback,
    ) -> Result<()> {
        let page = page.into();
        if self.identity.is_missing(&page) {
            return Ok(());
        }
        if self.use_cache {
            if let Some(cats) = self
                .identity
                .resolve(&page)
                .and_then(|id| self.caches.categories.get(&id).cloned())
            {
                return callback(self, cats);
            }
        }
        let key = self.canonical_key(page);
        self.pending_categories
            .entry(key)
            .or_default()
            .push(callback);
        if self.pending_categories.len() >= BATCH_PAGE_MAX {
            self.run_categories_batch()?;
        }
        Ok(())
    }

    fn run_categories_batch(&mut self) -> Result<()> {
        if self.pending_categories.is_empty() {
            return Ok(());
        }
        let mut pending = std::mem::take(&mut self.pending_categories);
        let (ids, titles) = split_keys(pending.keys());

        for group in [id_params(&ids), title_params(&titles)].into_iter().flatten() {
            let mut params = query(&[
                ("action", "query"),
                ("redirects", "1"),
                ("prop", "categories"),
                ("cllimit", "max"),
            ]);
            params.push(group);
            let result_pages = paginate(self.transport.as_mut(), &params)?;

            // Pages can repeat across result pages (clcontinue splits a
            // page's category list), so accumulate before dispatching.
            let mut cats_got: IndexMap<PageId, (String, Vec<String>)> = IndexMap::new();
            for result_page in &result_pages {
                for row in responses::pages_of(result_page)? {
                    if row.is_absent() {
                        self.identity.mark_missing(&row.missing_key());
                        continue;
                    }
                    let (Some(pageid), Some(title)) = (row.pageid, row.title.clone()) else {
                        continue;
                    };
                    let id = PageId(pageid);
                    self.identity.record(id, &title);
                    let entry = cats_got.entry(id).or_insert_with(|| (title, Vec::new()));
                    entry
                        .1
                        .extend(row.categories.iter().map(|c| c.title.clone()));
                }
            }

            self.resolve_category_titles(&cats_got)?;

            for (id, (title, cat_titles)) in cats_got {
                let cat_ids: Vec<PageId> = cat_titles
                    .iter()
                    .filter_map(|t| self.identity.id_of(t))
                    .collect();
                self.caches.categories.insert(id, cat_ids.clone());
                for callback in take_callbacks(&mut pending, id, &title) {
                    callback(self, cat_ids.clone())?;
                }
            }
        }
        Ok(())
    }

    /// Registers ids for any category titles the identity map has not
    /// seen yet, with follow-up lookup queries.
    fn resolve_category_titles(
        &mut self,
        cats_got: &IndexMap<PageId, (String, Vec<String>)>,
    ) -> Result<()> {
        let mut unknown: Vec<&str> = Vec::new();
        for (_, (_, cat_titles)) in cats_got {
            for title in cat_titles {
                if self.identity.id_of(title).is_none() && !unknown.contains(&title.as_str()) {
                    unknown.push(title);
                }
            }
        }
        for chunk in unknown.chunks(BATCH_PAGE_MAX) {
            let params = query(&[
                ("action", "query"),
                ("redirects", "1"),
                ("titles", &chunk.join("|")),
            ]);
            for result_page in &paginate(self.transport.as_mut(), &params)? {
                for row in responses::pages_of(result_page)? {
                    if let (Some(pageid), Some(title)) = (row.pageid, row.title.as_deref()) {
                        self.identity.record(PageId(pageid), title);
                    }
                }
            }
        }
        Ok(())
    }

    // --- Request kind: image URLs ---------------------------------------

    /// Requests the URL of an image file page.
    pub fn image_url(
        &mut self,
        page: impl Into<PageKey>,
        callback: ImageUrlCallback,
    ) -> Result<()> {
        let page = page.into();
        if self.identity.is_missing(&page) {
            return Ok(());
        }
        if self.use_cache {
            if let Some(url) = self
                .identity
                .resolve(&page)
                .and_then(|id| self.caches.images.get(&id).cloned())
            {
                return callback(self, url);
            }
        }
        let key = self.canonical_key(page);
        self.pending_images.entry(key).or_default().push(callback);
        if self.pending_images.len() >= BATCH_PAGE_MAX {
            self.run_images_batch()?;
        }
        Ok(())
    }

    fn run_images_batch(&mut self) -> Result<()> {
        if self.pending_images.is_empty() {
            return Ok(());
        }
        let mut pending = std::mem::take(&mut self.pending_images);
        let (ids, titles) = split_keys(pending.keys());

        for group in [id_params(&ids), title_params(&titles)].into_iter().flatten() {
            let mut params = query(&[
                ("action", "query"),
                ("prop", "imageinfo"),
                ("iiprop", "url"),
            ]);
            params.push(group);
            let result_pages = paginate(self.transport.as_mut(), &params)?;

            for result_page in &result_pages {
                for row in responses::pages_of(result_page)? {
                    if row.is_absent() {
                        self.identity.mark_missing(&row.missing_key());
                        continue;
                    }
                    let (Some(pageid), Some(title)) = (row.pageid, row.title.clone()) else {
                        continue;
                    };
                    let id = PageId(pageid);
                    self.identity.record(id, &title);
                    let Some(info) = row.imageinfo.first() else {
                        // Metadata exists but no actual file behind it.
                        self.identity.mark_missing(&title);
                        self.identity.mark_missing(&id.to_string());
                        continue;
                    };
                    self.caches.images.insert(id, info.url.clone());
                    for callback in take_callbacks(&mut pending, id, &title) {
                        callback(self, info.url.clone())?;
                    }
                }
            }
        }
        Ok(())
    }

    // --- Request kind: page id ↔ title ----------------------------------

    /// Requests the id/title pair for a page. Ids and internal titles
    /// never change, so the identity map answers even when caching is
    /// bypassed.
    pub fn page_id(&mut self, page: impl Into<PageKey>, callback: PageIdCallback) -> Result<()> {
        let page = page.into();
        if self.identity.is_missing(&page) {
            return Ok(());
        }
        match &page {
            PageKey::Title(title) => {
                if let Some(id) = self.identity.id_of(title) {
                    let title = title.clone();
                    return callback(self, id, title);
                }
            }
            PageKey::Id(id) => {
                if let Some(title) = self.identity.title_of(*id).map(str::to_string) {
                    return callback(self, *id, title);
                }
            }
        }
        let key = self.canonical_key(page);
        self.pending_page_ids.entry(key).or_default().push(callback);
        if self.pending_page_ids.len() >= BATCH_PAGE_MAX {
            self.run_page_ids_batch()?;
        }
        Ok(())
    }

    fn run_page_ids_batch(&mut self) -> Result<()> {
        if self.pending_page_ids.is_empty() {
            return Ok(());
        }
        let mut pending = std::mem::take(&mut self.pending_page_ids);
        let (ids, titles) = split_keys(pending.keys());

        for group in [id_params(&ids), title_params(&titles)].into_iter().flatten() {
            let mut params = query(&[("action", "query"), ("redirects", "1")]);
            params.push(group);
            let result_pages = paginate(self.transport.as_mut(), &params)?;

            for result_page in &result_pages {
                for row in responses::pages_of(result_page)? {
                    if row.is_absent() {
                        self.identity.mark_missing(&row.missing_key());
                        continue;
                    }
                    let (Some(pageid), Some(title)) = (row.pageid, row.title.clone()) else {
                        continue;
                    };
                    let id = PageId(pageid);
                    self.identity.record(id, &title);
                    for callback in take_callbacks(&mut pending, id, &title) {
                        callback(self, id, title.clone())?;
                    }
                }
            }
        }
        Ok(())
    }

    // --- Request kind: category members ---------------------------------

    /// Requests the direct member list of a category (pages,
    /// subcategories, and files; callers filter by kind).
    pub fn category_members(
        &mut self,
        page: impl Into<PageKey>,
        callback: MembersCallback,
    ) -> Result<()> {
        let page = page.into();
        if self.identity.is_missing(&page) {
            return Ok(());
        }
        if self.use_cache {
            if let Some(members) = self
                .identity
                .resolve(&page)
                .and_then(|id| self.caches.members.get(&id).cloned())
            {
                return callback(self, members);
            }
        }
        let key = self.canonical_key(page);
        self.pending_members.entry(key).or_default().push(callback);
        if self.pending_members.len() >= BATCH_PAGE_MAX {
            self.run_members_batch()?;
        }
        Ok(())
    }

    fn run_members_batch(&mut self) -> Result<()> {
        if self.pending_members.is_empty() {
            return Ok(());
        }
        // Member lists cannot be coalesced into one call (the API takes a
        // single category per query), so the batch dispatches one
        // paginated query per queued key.
        let pending = std::mem::take(&mut self.pending_members);
        for (key, callbacks) in pending {
            match self.fetch_members(&key)? {
                Some(members) => {
                    for callback in callbacks {
                        callback(self, members.clone())?;
                    }
                }
                None => {
                    log::warn!("Category not found: {}", key);
                }
            }
        }
        Ok(())
    }

    fn fetch_members(&mut self, key: &PageKey) -> Result<Option<Vec<CategoryMember>>> {
        let mut params = query(&[
            ("action", "query"),
            ("list", "categorymembers"),
            ("redirects", "1"),
            ("cmlimit", "max"),
            ("cmprop", "ids|title|type"),
        ]);
        match key {
            PageKey::Id(id) => {
                set_param(&mut params, "cmpageid", id.to_string());
                set_param(&mut params, "pageids", id.to_string());
            }
            PageKey::Title(title) => {
                set_param(&mut params, "cmtitle", title.clone());
                set_param(&mut params, "titles", title.clone());
            }
        }
        let result_pages = paginate(self.transport.as_mut(), &params)?;

        let mut category_id = None;
        let mut members = Vec::new();
        for result_page in &result_pages {
            for row in responses::pages_of(result_page)? {
                if row.is_absent() {
                    self.identity.mark_missing(&row.missing_key());
                    continue;
                }
                if let (Some(pageid), Some(title)) = (row.pageid, row.title.as_deref()) {
                    category_id = Some(PageId(pageid));
                    self.identity.record(PageId(pageid), title);
                }
            }
            for row in responses::category_members_of(result_page)? {
                if row.missing || row.invalid {
                    if let Some(title) = &row.title {
                        self.identity.mark_missing(title);
                    }
                    continue;
                }
                let (Some(pageid), Some(title)) = (row.pageid, row.title.clone()) else {
                    continue;
                };
                let id = PageId(pageid);
                self.identity.record(id, &title);
                members.push(CategoryMember {
                    id,
                    title,
                    kind: MemberKind::parse(row.kind.as_deref().unwrap_or("page")),
                });
            }
        }

        match category_id {
            Some(id) => {
                self.caches.members.insert(id, members.clone());
                Ok(Some(members))
            }
            None => {
                self.identity.mark_missing(&key.missing_key());
                Ok(None)
            }
        }
    }

    /// Appends a member to a cached member list, if the list is cached
    /// and does not already contain the page. Used by change detection
    /// to keep member lists consistent without a refetch.
    pub fn patch_category_member(&mut self, category: PageId, member: CategoryMember) {
        if let Some(members) = self.caches.members.get_mut(&category) {
            if members.iter().all(|m| m.id != member.id) {
                members.push(member);
            }
        }
    }

    /// The cached member list of a category, if any.
    pub fn cached_members(&self, category: PageId) -> Option<&[CategoryMember]> {
        self.caches.members.get(&category).map(Vec::as_slice)
    }
}

/// Splits pending keys into the id group and the title group. The API
/// never accepts ids and titles mixed in one parameter.
fn split_keys<'a>(keys: impl Iterator<Item = &'a PageKey>) -> (Vec<PageId>, Vec<String>) {
    let mut ids = Vec::new();
    let mut titles = Vec::new();
    for key in keys {
        match key {
            PageKey::Id(id) => ids.push(*id),
            PageKey::Title(title) => titles.push(title.clone()),
        }
    }
    (ids, titles)
}

fn id_params(ids: &[PageId]) -> Option<(String, String)> {
    if ids.is_empty() {
        return None;
    }
    let joined = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("|");
    Some(("pageids".to_string(), joined))
}

fn title_params(titles: &[String]) -> Option<(String, String)> {
    if titles.is_empty() {
        return None;
    }
    Some(("titles".to_string(), titles.join("|")))
}

/// Removes and returns every callback waiting on a page, whether it was
/// queued under the id or the title.
fn take_callbacks<C>(
    pending: &mut IndexMap<PageKey, Vec<C>>,
    id: PageId,
    title: &str,
) -> Vec<C> {
    let mut callbacks = Vec::new();
    if let Some(found) = pending.shift_remove(&PageKey::Id(id)) {
        callbacks.extend(found);
    }
    if let Some(found) = pending.shift_remove(&PageKey::Title(title.to_string())) {
        callbacks.extend(found);
    }
    callbacks
}
