use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{
    Division, Gender, WeightCategory, WeightItem, WeightUnit, check_item_labels,
};

/// Upsert keyed by the case-insensitive discipline name
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertDisciplineRequest {
    #[validate(custom(function = "validate_required_name"))]
    #[validate(length(max = 255, message = "Discipline name must be at most 255 characters"))]
    pub name: String,
}

/// Upsert keyed by `(discipline, name, gender)`. A missing gender is inferred
/// from the name once and stored.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertDivisionRequest {
    #[validate(custom(function = "validate_required_name"))]
    pub discipline_name: String,

    #[validate(custom(function = "validate_required_name"))]
    #[validate(length(max = 255, message = "Division name must be at most 255 characters"))]
    pub name: String,

    pub gender: Option<Gender>,

    /// Natural key of the weight category to attach
    #[validate(length(min = 1, max = 255))]
    pub weight_category_name: Option<String>,

    #[schema(value_type = Object)]
    #[serde(default)]
    pub eligibility: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WeightItemInput {
    pub label: String,
    #[serde(default)]
    pub limit: Option<Decimal>,
}

/// Upsert keyed by weight category name. Items keep their ids when an item
/// with the same label already exists.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertWeightCategoryRequest {
    #[validate(custom(function = "validate_required_name"))]
    #[validate(length(max = 255, message = "Weight category name must be at most 255 characters"))]
    pub name: String,

    pub unit: WeightUnit,

    #[validate(custom(function = "validate_item_inputs"))]
    pub items: Vec<WeightItemInput>,
}

fn validate_required_name(name: &str) -> Result<(), validator::ValidationError> {
    if name.trim().is_empty() {
        let mut error = validator::ValidationError::new("required");
        error.message = Some("must not be empty".into());
        return Err(error);
    }
    Ok(())
}

fn validate_item_inputs(items: &[WeightItemInput]) -> Result<(), validator::ValidationError> {
    check_item_labels(items.iter().map(|item| item.label.as_str())).map_err(|msg| {
        let mut error = validator::ValidationError::new("invalid_weight_items");
        error.message = Some(msg.into());
        error
    })
}

/// A division as offered to an athlete picking their bracket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DivisionOption {
    pub division_id: String,
    pub discipline_id: String,
    pub name: String,
    pub gender: Gender,
    /// "{name} — {Men|Women|Coed}"
    pub label: String,
    pub weight_category_id: Option<String>,
}

impl From<Division> for DivisionOption {
    fn from(division: Division) -> Self {
        Self {
            label: division.label(),
            division_id: division.division_id,
            discipline_id: division.discipline_id,
            name: division.name,
            gender: division.gender,
            weight_category_id: division.weight_category_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WeightOptionsStatus {
    Available,
    NoWeightCategories,
}

impl WeightOptionsStatus {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            WeightOptionsStatus::Available => None,
            WeightOptionsStatus::NoWeightCategories => {
                Some("no weight categories for this division")
            }
        }
    }
}

/// Weight brackets available for one division
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeightOptions {
    pub division_id: String,
    pub weight_category_id: Option<String>,
    pub category_name: Option<String>,
    pub unit: Option<WeightUnit>,
    pub items: Vec<WeightItem>,
    pub status: WeightOptionsStatus,
}

impl WeightOptions {
    pub fn empty(division_id: impl Into<String>, category: Option<&WeightCategory>) -> Self {
        Self {
            division_id: division_id.into(),
            weight_category_id: category.map(|c| c.weight_category_id.clone()),
            category_name: category.map(|c| c.name.clone()),
            unit: category.map(|c| c.unit),
            items: Vec::new(),
            status: WeightOptionsStatus::NoWeightCategories,
        }
    }

    pub fn from_category(division_id: impl Into<String>, category: WeightCategory) -> Self {
        if category.items.is_empty() {
            return Self::empty(division_id, Some(&category));
        }

        Self {
            division_id: division_id.into(),
            weight_category_id: Some(category.weight_category_id),
            category_name: Some(category.name),
            unit: Some(category.unit),
            items: category.items,
            status: WeightOptionsStatus::Available,
        }
    }
}

/// A fully resolved weight choice, ready to be snapshotted into a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedWeight {
    pub division_id: String,
    pub weight_category_id: String,
    pub weight_item_id: String,
    pub label: String,
    pub unit: WeightUnit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn category_request(labels: &[&str]) -> UpsertWeightCategoryRequest {
        UpsertWeightCategoryRequest {
            name: "Senior Men".into(),
            unit: WeightUnit::Kg,
            items: labels
                .iter()
                .map(|label| WeightItemInput {
                    label: label.to_string(),
                    limit: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_weight_category_request_validation() {
        assert!(category_request(&["73 kg", "90 kg"]).validate().is_ok());
        assert!(category_request(&["73 kg", ""]).validate().is_err());
        assert!(category_request(&["73 kg", "73 KG"]).validate().is_err());
    }

    #[test]
    fn test_blank_division_name_rejected() {
        let req = UpsertDivisionRequest {
            discipline_name: "Judo".into(),
            name: "   ".into(),
            gender: None,
            weight_category_name: None,
            eligibility: serde_json::Value::Null,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_category_gives_status_not_items() {
        let category = WeightCategory {
            weight_category_id: "wc".into(),
            name: "Unlimited".into(),
            unit: WeightUnit::Lb,
            items: Vec::new(),
        };
        let options = WeightOptions::from_category("div", category);
        assert_eq!(options.status, WeightOptionsStatus::NoWeightCategories);
        assert_eq!(
            options.status.message(),
            Some("no weight categories for this division")
        );
        assert_eq!(options.unit, Some(WeightUnit::Lb));
    }
}
