// src/wiki/responses.rs
//! Typed views of the wiki API's JSON responses.
//!
//! The transport hands back loosely-typed pages; these structs give the
//! engine the handful of shapes it actually consumes. All responses use
//! `formatversion=2` (pages as arrays, booleans as booleans).

use serde::Deserialize;
use serde_json::Value;

/// One row of a `query.pages` array.
#[derive(Debug, Clone, Deserialize)]
pub struct PageRow {
    #[serde(default)]
    pub pageid: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub invalid: bool,
    #[serde(default)]
    pub categories: Vec<TitleRow>,
    #[serde(default)]
    pub revisions: Vec<RevisionRow>,
    #[serde(default)]
    pub imageinfo: Vec<ImageInfoRow>,
}

impl PageRow {
    /// Whether the wiki reports this page as nonexistent.
    pub fn is_absent(&self) -> bool {
        self.missing || self.invalid
    }

    /// The string under which an absent page is recorded as known
    /// missing — its title when given, its id otherwise.
    pub fn missing_key(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.pageid.map(|id| id.to_string()))
            .unwrap_or_default()
    }

    /// The revision text, when the query asked for content.
    pub fn revision_text(&self) -> Option<&str> {
        self.revisions
            .first()
            .and_then(|rev| rev.slots.as_ref())
            .and_then(|slots| slots.main.content.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TitleRow {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevisionRow {
    #[serde(default)]
    pub slots: Option<RevisionSlots>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevisionSlots {
    pub main: RevisionSlot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevisionSlot {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageInfoRow {
    pub url: String,
}

/// One row of a `query.categorymembers` array.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryMemberRow {
    #[serde(default)]
    pub pageid: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub invalid: bool,
}

/// One row of a `query.recentchanges` array.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentChangeRow {
    #[serde(default)]
    pub pageid: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Extracts the `pages` rows of one query page; absent means empty.
pub fn pages_of(query: &Value) -> crate::error::Result<Vec<PageRow>> {
    rows_of(query, "pages")
}

pub fn category_members_of(query: &Value) -> crate::error::Result<Vec<CategoryMemberRow>> {
    rows_of(query, "categorymembers")
}

pub fn recent_changes_of(query: &Value) -> crate::error::Result<Vec<RecentChangeRow>> {
    rows_of(query, "recentchanges")
}

fn rows_of<T: serde::de::DeserializeOwned>(
    query: &Value,
    field: &str,
) -> crate::error::Result<Vec<T>> {
    match query.get(field) {
        Some(rows) => Ok(serde_json::from_value(rows.clone())?),
        None => Ok(Vec::new()),
    }
}
