// src/wiki/types.rs
//! Small domain types shared across the sync engine.

use crate::types::PageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to a wiki page by whichever handle the caller has.
///
/// At least one of id/title is always known; once a response reveals the
/// pair, the identity map cross-registers them permanently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageKey {
    Id(PageId),
    Title(String),
}

impl PageKey {
    /// The string form used by the known-missing set, which has to hold
    /// both ids and titles.
    pub fn missing_key(&self) -> String {
        match self {
            PageKey::Id(id) => id.to_string(),
            PageKey::Title(title) => title.clone(),
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKey::Id(id) => write!(f, "#{}", id),
            PageKey::Title(title) => write!(f, "{}", title),
        }
    }
}

impl From<PageId> for PageKey {
    fn from(id: PageId) -> Self {
        PageKey::Id(id)
    }
}

impl From<i64> for PageKey {
    fn from(id: i64) -> Self {
        PageKey::Id(PageId(id))
    }
}

impl From<&str> for PageKey {
    fn from(title: &str) -> Self {
        PageKey::Title(title.to_string())
    }
}

impl From<String> for PageKey {
    fn from(title: String) -> Self {
        PageKey::Title(title)
    }
}

/// What kind of thing a category member is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Page,
    #[serde(rename = "subcat")]
    Subcategory,
    File,
}

impl MemberKind {
    /// Parses the API's `type` string; anything unrecognized is treated
    /// as a plain page.
    pub fn parse(value: &str) -> Self {
        match value {
            "subcat" => MemberKind::Subcategory,
            "file" => MemberKind::File,
            _ => MemberKind::Page,
        }
    }
}

/// One direct member of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMember {
    pub id: PageId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: MemberKind,
}

/// The wiki's classification of one recent change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Categorize,
    Edit,
    External,
    Log,
    New,
}

impl ChangeKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "categorize" => Some(ChangeKind::Categorize),
            "edit" => Some(ChangeKind::Edit),
            "external" => Some(ChangeKind::External),
            "log" => Some(ChangeKind::Log),
            "new" => Some(ChangeKind::New),
            _ => None,
        }
    }
}

/// One entry of the recent-changes feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub id: PageId,
    pub title: String,
    pub kind: ChangeKind,
}
