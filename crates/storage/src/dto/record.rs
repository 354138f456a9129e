use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Division, RecordKind, Reference, canonical_id};

/// Request payload for creating (`record_id` absent) or updating a match or
/// scouting report together with its weight selection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordWriteRequest {
    pub record_id: Option<String>,

    pub kind: RecordKind,

    #[validate(length(min = 1, max = 255, message = "Discipline name is required"))]
    pub discipline_name: String,

    #[validate(length(max = 255))]
    pub title: Option<String>,

    /// Bare division id or the expanded division
    #[schema(value_type = Option<String>)]
    #[serde(default)]
    pub division: Option<Reference<Division>>,

    pub weight_item_id: Option<String>,

    pub weight_value: Option<Decimal>,
}

impl RecordWriteRequest {
    pub fn division_id(&self) -> Option<&str> {
        canonical_id(self.division.as_ref())
    }

    pub fn weight_item_id(&self) -> Option<&str> {
        self.weight_item_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}
