// tests/common/mod.rs
//! A scripted in-memory wiki serving the same JSON shapes as the real
//! API (formatversion 2), plus call recording so tests can assert how
//! many network round trips a scenario costs.

use cardvault::error::Result;
use cardvault::wiki::transport::{QueryParams, Transport};
use cardvault::wiki::PageBatcher;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default, Clone)]
pub struct FakePage {
    pub title: String,
    pub content: Option<String>,
    /// Category page ids this page belongs to.
    pub categories: Vec<i64>,
    /// For category pages: direct member page ids.
    pub members: Vec<i64>,
    pub image_url: Option<String>,
}

/// One recent-changes entry: (page id, title, change type).
pub type FakeChange = (i64, String, String);

#[derive(Debug, Default)]
pub struct FakeWiki {
    pub pages: HashMap<i64, FakePage>,
    pub recent_changes: Vec<FakeChange>,
    /// Every request's parameters, in order.
    pub calls: Vec<QueryParams>,
}

impl FakeWiki {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&mut self, id: i64, title: &str, content: &str) -> &mut FakePage {
        let page = self.pages.entry(id).or_default();
        page.title = title.to_string();
        page.content = Some(content.to_string());
        page
    }

    pub fn add_category(&mut self, id: i64, title: &str, members: &[i64]) {
        let page = self.pages.entry(id).or_default();
        page.title = title.to_string();
        page.members = members.to_vec();
    }

    pub fn set_page_categories(&mut self, id: i64, categories: &[i64]) {
        self.pages.entry(id).or_default().categories = categories.to_vec();
    }

    pub fn add_change(&mut self, id: i64, title: &str, kind: &str) {
        self.recent_changes
            .push((id, title.to_string(), kind.to_string()));
    }

    /// How many calls carried this `prop`/`list` value.
    pub fn count_calls(&self, tag: &str) -> usize {
        self.calls
            .iter()
            .filter(|params| {
                params
                    .iter()
                    .any(|(k, v)| (k == "prop" || k == "list") && v == tag)
            })
            .count()
    }

    fn id_by_title(&self, title: &str) -> Option<i64> {
        self.pages
            .iter()
            .find(|(_, p)| p.title == title)
            .map(|(id, _)| *id)
    }

    /// Base rows for the pageids/titles parameters of one query.
    fn page_rows(&self, params: &QueryParams) -> Vec<(Option<i64>, Value)> {
        let mut rows = Vec::new();
        if let Some(ids) = get(params, "pageids") {
            for id in ids.split('|') {
                let id: i64 = id.parse().expect("numeric pageid");
                match self.pages.get(&id) {
                    Some(page) => rows.push((
                        Some(id),
                        json!({"pageid": id, "title": page.title}),
                    )),
                    None => rows.push((None, json!({"pageid": id, "missing": true}))),
                }
            }
        }
        if let Some(titles) = get(params, "titles") {
            for title in titles.split('|') {
                match self.id_by_title(title) {
                    Some(id) => rows.push((
                        Some(id),
                        json!({"pageid": id, "title": title}),
                    )),
                    None => rows.push((None, json!({"title": title, "missing": true}))),
                }
            }
        }
        rows
    }

    fn answer(&self, params: &QueryParams) -> Value {
        if let Some(list) = get(params, "list") {
            return match list {
                "categorymembers" => self.answer_members(params),
                "recentchanges" => json!({"query": {"recentchanges":
                    self.recent_changes.iter().map(|(id, title, kind)| {
                        json!({"pageid": id, "title": title, "type": kind})
                    }).collect::<Vec<_>>()
                }}),
                other => panic!("fake wiki: unsupported list={}", other),
            };
        }

        let prop = get(params, "prop");
        let rows: Vec<Value> = self
            .page_rows(params)
            .into_iter()
            .map(|(id, mut row)| {
                let Some(id) = id else { return row };
                let page = &self.pages[&id];
                match prop {
                    Some("revisions") => {
                        if let Some(content) = &page.content {
                            row["revisions"] =
                                json!([{"slots": {"main": {"content": content}}}]);
                        }
                    }
                    Some("categories") => {
                        let categories: Vec<Value> = page
                            .categories
                            .iter()
                            .filter_map(|cat| self.pages.get(cat))
                            .map(|cat| json!({"title": cat.title}))
                            .collect();
                        if !categories.is_empty() {
                            row["categories"] = json!(categories);
                        }
                    }
                    Some("imageinfo") => {
                        if let Some(url) = &page.image_url {
                            row["imageinfo"] = json!([{"url": url}]);
                        }
                    }
                    Some(other) => panic!("fake wiki: unsupported prop={}", other),
                    None => {}
                }
                row
            })
            .collect();
        json!({"query": {"pages": rows}})
    }

    fn answer_members(&self, params: &QueryParams) -> Value {
        let category = get(params, "cmpageid")
            .and_then(|id| id.parse().ok())
            .or_else(|| get(params, "cmtitle").and_then(|t| self.id_by_title(t)));
        let Some(category) = category else {
            let title = get(params, "cmtitle").unwrap_or_default();
            return json!({"query": {
                "pages": [{"title": title, "missing": true}],
                "categorymembers": []
            }});
        };
        let page = &self.pages[&category];
        let members: Vec<Value> = page
            .members
            .iter()
            .filter_map(|id| self.pages.get(id).map(|p| (id, p)))
            .map(|(id, member)| {
                let kind = if member.title.starts_with("Category:") {
                    "subcat"
                } else if member.title.starts_with("File:") {
                    "file"
                } else {
                    "page"
                };
                json!({"pageid": id, "title": member.title, "type": kind})
            })
            .collect();
        json!({"query": {
            "pages": [{"pageid": category, "title": page.title}],
            "categorymembers": members
        }})
    }
}

fn get<'a>(params: &'a QueryParams, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Transport handle sharing one [`FakeWiki`] with the test body.
pub struct SharedWiki(pub Rc<RefCell<FakeWiki>>);

impl Transport for SharedWiki {
    fn send(&mut self, params: &QueryParams) -> Result<Value> {
        let mut wiki = self.0.borrow_mut();
        wiki.calls.push(params.clone());
        Ok(wiki.answer(params))
    }
}

/// A fresh in-memory batcher over a shared fake wiki.
pub fn batcher_over(wiki: FakeWiki) -> (Rc<RefCell<FakeWiki>>, PageBatcher) {
    let shared = Rc::new(RefCell::new(wiki));
    let batcher = PageBatcher::in_memory(Box::new(SharedWiki(Rc::clone(&shared))));
    (shared, batcher)
}
