//! Which athlete a shared association or record belongs to.
//!
//! One collection holds rows for the primary account holder and for every
//! linked family member. Family member references may arrive as a bare id,
//! an expanded structure, an empty string or nothing at all; all of them are
//! normalized with [`canonical_id`] before comparing.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dto::account::AccountContext;
use crate::models::{
    AthleteDisciplineAssociation, DependentRecord, FamilyMember, Reference, canonical_id,
    normalize_id,
};

/// Rows owned by an account, optionally on behalf of a family member
pub trait AthleteOwned {
    fn owner_id(&self) -> &str;

    fn family_member_ref(&self) -> Option<&Reference<FamilyMember>>;

    fn family_member_id(&self) -> Option<&str> {
        canonical_id(self.family_member_ref())
    }
}

impl AthleteOwned for AthleteDisciplineAssociation {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn family_member_ref(&self) -> Option<&Reference<FamilyMember>> {
        self.family_member.as_ref()
    }
}

impl AthleteOwned for DependentRecord {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn family_member_ref(&self) -> Option<&Reference<FamilyMember>> {
        self.family_member.as_ref()
    }
}

/// Whose rows a caller wants to see
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum AthleteView {
    Primary {
        account_id: String,
    },
    FamilyMember {
        account_id: String,
        family_member_id: String,
    },
}

impl AthleteView {
    pub fn account_id(&self) -> &str {
        match self {
            AthleteView::Primary { account_id } | AthleteView::FamilyMember { account_id, .. } => {
                account_id
            }
        }
    }
}

impl From<&AccountContext> for AthleteView {
    fn from(ctx: &AccountContext) -> Self {
        match ctx.family_member_id() {
            Some(family_member_id) => AthleteView::FamilyMember {
                account_id: ctx.owner_id.clone(),
                family_member_id: family_member_id.to_string(),
            },
            None => AthleteView::Primary {
                account_id: ctx.owner_id.clone(),
            },
        }
    }
}

fn same_owner(record: &impl AthleteOwned, account_id: &str) -> bool {
    match (normalize_id(record.owner_id()), normalize_id(account_id)) {
        (Some(owner), Some(account)) => owner == account,
        _ => false,
    }
}

/// True when the row belongs to the account holder themself, i.e. it carries
/// no usable family member reference.
pub fn is_primary_athlete_record(record: &impl AthleteOwned, account_id: &str) -> bool {
    same_owner(record, account_id) && record.family_member_id().is_none()
}

/// True when the row belongs to the given family member of the account.
pub fn is_family_member_record(
    record: &impl AthleteOwned,
    account_id: &str,
    family_member_id: &str,
) -> bool {
    same_owner(record, account_id)
        && record
            .family_member_ref()
            .is_some_and(|reference| reference.points_to(family_member_id))
}

/// Rows visible in `view`. The input is left untouched.
pub fn filter_for<'r, T: AthleteOwned>(view: &AthleteView, records: &'r [T]) -> Vec<&'r T> {
    records
        .iter()
        .filter(|record| match view {
            AthleteView::Primary { account_id } => is_primary_athlete_record(*record, account_id),
            AthleteView::FamilyMember {
                account_id,
                family_member_id,
            } => is_family_member_record(*record, account_id, family_member_id),
        })
        .collect()
}
