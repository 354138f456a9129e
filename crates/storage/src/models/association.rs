use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Result, StorageError};
use crate::models::{FamilyMember, Reference};

/// A dated rank change for an athlete within one discipline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Promotion {
    /// Missing on legacy entries, which are identified by `(rank, promoted_on)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<String>,
    pub rank: String,
    pub promoted_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awarded_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_url: Option<String>,
}

impl Promotion {
    /// How this entry is addressed: by id when it has one, by its natural key otherwise.
    pub fn identity(&self) -> PromotionSelector {
        match &self.promotion_id {
            Some(id) => PromotionSelector::ById { id: id.clone() },
            None => PromotionSelector::ByNaturalKey {
                rank: self.rank.clone(),
                promoted_on: self.promoted_on,
            },
        }
    }
}

/// Identifies one promotion inside an association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum PromotionSelector {
    ById {
        #[serde(alias = "promotion_id")]
        id: String,
    },
    ByNaturalKey {
        rank: String,
        promoted_on: DateTime<Utc>,
    },
}

impl PromotionSelector {
    pub fn matches(&self, promotion: &Promotion) -> bool {
        match self {
            PromotionSelector::ById { id } => promotion.promotion_id.as_deref() == Some(id),
            PromotionSelector::ByNaturalKey { rank, promoted_on } => {
                promotion.rank == *rank && promotion.promoted_on == *promoted_on
            }
        }
    }
}

/// The rank of the promotion with the latest `promoted_on`. Among entries
/// sharing that instant, the one appended last wins.
pub fn derive_current_rank(promotions: &[Promotion]) -> Option<String> {
    let mut latest: Option<&Promotion> = None;
    for promotion in promotions {
        match latest {
            Some(best) if promotion.promoted_on < best.promoted_on => {}
            _ => latest = Some(promotion),
        }
    }
    latest.map(|p| p.rank.clone())
}

/// The binding of one athlete (primary or family member) to one discipline,
/// holding that athlete's promotion history.
///
/// `current_rank` cannot be set: it is recomputed from `promotions` on every
/// change and on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(from = "StoredAssociation")]
pub struct AthleteDisciplineAssociation {
    pub association_id: String,
    pub owner_id: String,
    #[schema(value_type = Option<String>)]
    pub family_member: Option<Reference<FamilyMember>>,
    pub discipline_name: String,
    promotions: Vec<Promotion>,
    current_rank: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct StoredAssociation {
    association_id: String,
    owner_id: String,
    #[serde(default)]
    family_member: Option<Reference<FamilyMember>>,
    discipline_name: String,
    #[serde(default)]
    promotions: Vec<Promotion>,
    #[serde(default)]
    start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    version: i64,
    created_at: DateTime<Utc>,
}

impl From<StoredAssociation> for AthleteDisciplineAssociation {
    fn from(stored: StoredAssociation) -> Self {
        let mut association = AthleteDisciplineAssociation::new(
            stored.association_id,
            stored.owner_id,
            stored.family_member,
            stored.discipline_name,
            stored.start_date,
            stored.created_at,
        )
        .with_promotions(stored.promotions);
        association.version = stored.version;
        association
    }
}

impl AthleteDisciplineAssociation {
    pub fn new(
        association_id: String,
        owner_id: String,
        family_member: Option<Reference<FamilyMember>>,
        discipline_name: String,
        start_date: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            association_id,
            owner_id,
            family_member,
            discipline_name,
            promotions: Vec::new(),
            current_rank: None,
            start_date,
            version: 0,
            created_at,
        }
    }

    /// Replaces the whole history, e.g. when loading from storage
    pub fn with_promotions(mut self, promotions: Vec<Promotion>) -> Self {
        self.promotions = promotions;
        self.recompute();
        self
    }

    pub(crate) fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Entries in append order
    pub fn promotions(&self) -> &[Promotion] {
        &self.promotions
    }

    pub fn current_rank(&self) -> Option<&str> {
        self.current_rank.as_deref()
    }

    /// Optimistic concurrency token, bumped by the store on every ledger write
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Entries ordered by `promoted_on`; equal instants keep append order.
    pub fn history(&self) -> Vec<Promotion> {
        let mut history = self.promotions.clone();
        history.sort_by_key(|p| p.promoted_on);
        history
    }

    pub(crate) fn push_promotion(&mut self, promotion: Promotion) {
        self.promotions.push(promotion);
        self.recompute();
    }

    /// Removes exactly one entry. Nothing changes when the selector matches
    /// zero or several entries.
    pub(crate) fn remove_promotion(&mut self, selector: &PromotionSelector) -> Result<Promotion> {
        let positions: Vec<usize> = self
            .promotions
            .iter()
            .enumerate()
            .filter(|(_, p)| selector.matches(p))
            .map(|(i, _)| i)
            .collect();

        match (positions.as_slice(), selector) {
            ([], _) => Err(StorageError::NotFound),
            ([index], _) => {
                let removed = self.promotions.remove(*index);
                self.recompute();
                Ok(removed)
            }
            (many, PromotionSelector::ByNaturalKey { rank, promoted_on }) => {
                Err(StorageError::AmbiguousSelector {
                    rank: rank.clone(),
                    promoted_on: *promoted_on,
                    matches: many.len(),
                })
            }
            (many, PromotionSelector::ById { id }) => Err(StorageError::ConstraintViolation(
                format!("promotion id '{}' is used by {} entries", id, many.len()),
            )),
        }
    }

    fn recompute(&mut self) {
        self.current_rank = derive_current_rank(&self.promotions);
    }
}
