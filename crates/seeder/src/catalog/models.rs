use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reference data file applied by the `seed` binary.
///
/// Weight categories are declared once at the top level and referenced by
/// name from divisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub weight_categories: Vec<SeedWeightCategory>,
    #[serde(default)]
    pub disciplines: Vec<SeedDiscipline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedWeightCategory {
    pub name: String,
    /// "kg" or "lb"
    pub unit: String,
    #[serde(default)]
    pub items: Vec<SeedWeightItem>,
}

/// Either a bare label (`"-73 kg"`) or a label with an explicit limit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedWeightItem {
    Label(String),
    Detailed {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<Decimal>,
    },
}

impl SeedWeightItem {
    pub fn label(&self) -> &str {
        match self {
            SeedWeightItem::Label(label) | SeedWeightItem::Detailed { label, .. } => label,
        }
    }

    pub fn limit(&self) -> Option<Decimal> {
        match self {
            SeedWeightItem::Label(_) => None,
            SeedWeightItem::Detailed { limit, .. } => *limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedDiscipline {
    pub name: String,
    #[serde(default)]
    pub divisions: Vec<SeedDivision>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedDivision {
    pub name: String,
    /// "male", "female" or "coed"; inferred from the name when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_category: Option<String>,
    #[serde(default)]
    pub eligibility: serde_json::Value,
}
