use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    Kg,
    Lb,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid weight unit '{0}', expected kg or lb")]
pub struct WeightUnitParseError(pub String);

impl FromStr for WeightUnit {
    type Err = WeightUnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kg" | "kgs" => Ok(WeightUnit::Kg),
            "lb" | "lbs" => Ok(WeightUnit::Lb),
            _ => Err(WeightUnitParseError(s.to_string())),
        }
    }
}

/// One weight bracket within a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeightItem {
    pub item_id: String,
    pub label: String,
    /// Upper limit of the bracket, when the label encodes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Decimal>,
}

/// A named, unit-tagged, ordered set of weight brackets. Natural key: `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeightCategory {
    pub weight_category_id: String,
    pub name: String,
    pub unit: WeightUnit,
    pub items: Vec<WeightItem>,
}

impl WeightCategory {
    pub fn find_item(&self, item_id: &str) -> Option<&WeightItem> {
        self.items.iter().find(|item| item.item_id == item_id)
    }

    /// Checks the item invariants: labels are non-empty and unique within the
    /// category, item ids are unique.
    pub fn check_items(&self) -> Result<(), String> {
        check_item_labels(self.items.iter().map(|item| item.label.as_str()))?;

        let mut ids = HashSet::new();
        for item in &self.items {
            if !ids.insert(item.item_id.as_str()) {
                return Err(format!(
                    "Duplicate weight item id '{}' in category '{}'",
                    item.item_id, self.name
                ));
            }
        }

        Ok(())
    }
}

/// Labels must be non-empty and unique (case-insensitive, ignoring surrounding
/// whitespace) within one category.
pub fn check_item_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Result<(), String> {
    let mut seen = HashSet::new();
    for label in labels {
        let folded = label.trim().to_lowercase();
        if folded.is_empty() {
            return Err("Weight item label cannot be empty".to_string());
        }
        if !seen.insert(folded) {
            return Err(format!("Duplicate weight item label: '{}'", label.trim()));
        }
    }
    Ok(())
}

/// Extracts the numeric part of a bracket label such as "-73 kg", "90kg" or
/// "+100 kg". Returns `None` for labels without a number ("Open").
pub fn parse_label_limit(label: &str) -> Option<Decimal> {
    let digits: String = label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    digits.trim_end_matches('.').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(id: &str, label: &str) -> WeightItem {
        WeightItem {
            item_id: id.into(),
            label: label.into(),
            limit: None,
        }
    }

    #[test]
    fn test_unit_parse() {
        assert_eq!("KG".parse::<WeightUnit>(), Ok(WeightUnit::Kg));
        assert_eq!("lbs".parse::<WeightUnit>(), Ok(WeightUnit::Lb));
        assert!("stone".parse::<WeightUnit>().is_err());
    }

    #[test]
    fn test_check_items_rejects_duplicates_and_blanks() {
        let mut category = WeightCategory {
            weight_category_id: "wc".into(),
            name: "IJF Senior Men".into(),
            unit: WeightUnit::Kg,
            items: vec![item("1", "73 kg"), item("2", "90 kg")],
        };
        assert!(category.check_items().is_ok());

        category.items.push(item("3", " 73 KG"));
        assert!(category.check_items().is_err());

        category.items.pop();
        category.items.push(item("3", "  "));
        assert!(category.check_items().is_err());

        category.items.pop();
        category.items.push(item("2", "100 kg"));
        assert!(category.check_items().is_err());
    }

    #[test]
    fn test_parse_label_limit() {
        assert_eq!(parse_label_limit("-73 kg"), Some(Decimal::from(73)));
        assert_eq!(parse_label_limit("+100kg"), Some(Decimal::from(100)));
        assert_eq!(parse_label_limit("57.5 kg"), Some(Decimal::new(575, 1)));
        assert_eq!(parse_label_limit("Open"), None);
    }
}
