// src/types/ids.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// A numeric wiki page id.
///
/// Page ids are assigned by the wiki and never change, even when a page is
/// renamed — which is exactly why the sync engine keys everything on them
/// rather than on titles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PageId(pub i64);

impl PageId {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PageId {
    fn from(value: i64) -> Self {
        PageId(value)
    }
}

/// Strong typing for canonical-entity ids with phantom types.
///
/// A `CardId` can never be handed to a function expecting a `SetId`, even
/// though both are UUIDs underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id<T> {
    value: Uuid,
    _phantom: PhantomData<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesMarker;

pub type CardId = Id<CardMarker>;
pub type SetId = Id<SetMarker>;
pub type SeriesId = Id<SeriesMarker>;

impl<T> Id<T> {
    /// Mints a fresh random id for a newly observed entity.
    pub fn new_v4() -> Self {
        Self {
            value: Uuid::new_v4(),
            _phantom: PhantomData,
        }
    }

    pub fn from_uuid(value: Uuid) -> Self {
        Self {
            value,
            _phantom: PhantomData,
        }
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.value
    }
}

impl<T> From<Uuid> for Id<T> {
    fn from(value: Uuid) -> Self {
        Self::from_uuid(value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Uuid::deserialize(deserializer)?;
        Ok(Self::from_uuid(value))
    }
}
