use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{FamilyMember, Reference, WeightUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Match,
    Scouting,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Match => "match",
            RecordKind::Scouting => "scouting",
        }
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match" => Ok(RecordKind::Match),
            "scouting" => Ok(RecordKind::Scouting),
            other => Err(format!("unknown record kind '{}'", other)),
        }
    }
}

/// Weight display data copied from the catalog when a weight is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeightSnapshot {
    pub weight_category_id: String,
    pub weight_item_id: String,
    pub label: String,
    pub unit: WeightUnit,
}

/// A match or scouting report, reduced to the parts that reference and
/// snapshot a division and weight selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DependentRecord {
    pub record_id: String,
    pub owner_id: String,
    #[schema(value_type = Option<String>)]
    #[serde(default)]
    pub family_member: Option<Reference<FamilyMember>>,
    pub kind: RecordKind,
    pub discipline_name: String,
    pub title: Option<String>,
    pub division_id: Option<String>,
    pub weight_category_id: Option<String>,
    pub weight_item_id: Option<String>,
    /// Snapshot: authoritative for display once persisted
    pub weight_label: Option<String>,
    /// Snapshot
    pub weight_unit: Option<WeightUnit>,
    /// Measured weight entered with the report, if any
    pub weight_value: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the store on every update
    #[serde(default)]
    pub version: i64,
}

impl DependentRecord {
    /// The snapshot currently stored on the record, if it is complete
    pub fn snapshot(&self) -> Option<WeightSnapshot> {
        Some(WeightSnapshot {
            weight_category_id: self.weight_category_id.clone()?,
            weight_item_id: self.weight_item_id.clone()?,
            label: self.weight_label.clone()?,
            unit: self.weight_unit?,
        })
    }
}
