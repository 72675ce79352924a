// src/wiki/mod.rs
//! The wiki synchronization engine.
//!
//! Everything here serves one goal: keep a local mirror of the card- and
//! set-relevant slice of the wiki up to date with as few API calls as
//! possible. The batcher coalesces fine-grained lookups into 50-page
//! API calls, persistent caches make re-runs cheap, and the change
//! detector turns the wiki's recent-changes feed into a minimal refetch
//! set instead of a full re-crawl.

pub mod batcher;
pub mod cache;
pub mod categories;
pub mod changes;
pub mod identity;
pub mod importer;
pub mod responses;
pub mod transport;
pub mod types;
pub mod wikitext;

pub use batcher::PageBatcher;
pub use changes::{synchronize, SyncOutcome};
pub use identity::IdentityMap;
pub use transport::{HttpTransport, Transport};
pub use types::{CategoryMember, ChangeKind, ChangelogEntry, MemberKind, PageKey};
