use serde::{Deserialize, Serialize};

use crate::models::Division;

/// Something with an optional canonical id.
pub trait Identified {
    fn id(&self) -> Option<&str>;
}

/// A reference that arrives either as a bare id or as the expanded entity.
///
/// Both shapes go through [`Reference::canonical_id`] before any comparison;
/// the raw shapes are never compared with each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference<T> {
    Unresolved(String),
    Resolved(T),
}

impl<T: Identified> Reference<T> {
    /// The trimmed id this reference points at. An empty string or an expanded
    /// value without an id both count as no reference at all.
    pub fn canonical_id(&self) -> Option<&str> {
        let raw = match self {
            Reference::Unresolved(id) => Some(id.as_str()),
            Reference::Resolved(entity) => entity.id(),
        };
        raw.map(str::trim).filter(|id| !id.is_empty())
    }

    pub fn points_to(&self, id: &str) -> bool {
        match (self.canonical_id(), normalize_id(id)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Canonical id of an optional reference; absent, blank and id-less
/// references all normalize to `None`.
pub fn canonical_id<T: Identified>(reference: Option<&Reference<T>>) -> Option<&str> {
    reference.and_then(Reference::canonical_id)
}

/// Trims an id, treating blank ids as absent.
pub fn normalize_id(id: &str) -> Option<&str> {
    Some(id.trim()).filter(|id| !id.is_empty())
}

/// The expanded form of a family member reference as the profile layer sends it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FamilyMember {
    #[serde(default, alias = "_id", alias = "familyMemberId")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Identified for FamilyMember {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Identified for Division {
    fn id(&self) -> Option<&str> {
        Some(&self.division_id)
    }
}
