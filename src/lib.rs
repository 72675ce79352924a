// src/lib.rs
//! cardvault library — builds an offline, cross-referenced trading-card
//! knowledge base from several public data sources.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling** — [`AppError`], [`ApiErrorKind`]
//! - **Configuration** — [`SyncConfig`]
//! - **Domain model** — [`Card`], [`Set`], [`Series`] and their parts
//! - **Entity store** — [`CardStore`], reconciliation ladders
//! - **Wiki sync engine** — [`PageBatcher`], transport, change detection
//! - **Bulk importers** — `sources::yamlyugi`, `sources::prodeck`

pub mod config;
pub mod constants;
pub mod error;
pub mod model;
pub mod sources;
pub mod store;
pub mod types;
pub mod wiki;

// --- Error Handling ---
pub use crate::error::{ApiErrorKind, AppError};

// --- Configuration ---
pub use crate::config::{CommandLineInput, SyncConfig};

// --- Domain Model ---
pub use crate::model::{
    Ability, Attribute, Card, CardExternalIds, CardImage, CardText, CardType, Classification,
    Legality, LinkArrow, MonsterType, Printing, Race, Series, Set, SetExternalIds, SetText,
    SpellTrapKind, Stat,
};

// --- Domain Types ---
pub use crate::types::{CardId, PageId, SeriesId, SetId};

// --- Entity Store ---
pub use crate::store::{CardStore, SyncState};

// --- Wiki Sync Engine ---
pub use crate::wiki::{
    CategoryMember, ChangeKind, ChangelogEntry, HttpTransport, IdentityMap, MemberKind,
    PageBatcher, PageKey, Transport,
};
