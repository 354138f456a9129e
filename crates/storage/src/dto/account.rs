use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{FamilyMember, Reference, canonical_id};

/// Who an operation acts for, supplied by the account/profile layer.
///
/// Passed explicitly into every call that creates or lists owned data; the
/// core never looks up an ambient account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AccountContext {
    pub owner_id: String,
    #[schema(value_type = Option<String>)]
    #[serde(default)]
    pub family_member: Option<Reference<FamilyMember>>,
}

impl AccountContext {
    pub fn primary(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            family_member: None,
        }
    }

    pub fn family_member(owner_id: impl Into<String>, family_member_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            family_member: Some(Reference::Unresolved(family_member_id.into())),
        }
    }

    pub fn family_member_id(&self) -> Option<&str> {
        canonical_id(self.family_member.as_ref())
    }
}
