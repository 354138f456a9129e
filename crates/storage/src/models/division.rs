use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Gender scope of a competition bracket.
///
/// The declaration order is the fixed display order used when listing divisions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Coed,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Coed => "coed",
        }
    }

    /// Word used in division labels
    pub fn display_word(&self) -> &'static str {
        match self {
            Gender::Male => "Men",
            Gender::Female => "Women",
            Gender::Coed => "Coed",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid gender '{0}', expected one of male, female, coed")]
pub struct GenderParseError(pub String);

impl FromStr for Gender {
    type Err = GenderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "coed" => Ok(Gender::Coed),
            _ => Err(GenderParseError(s.to_string())),
        }
    }
}

const MALE_TOKENS: &[&str] = &["m", "men", "mens", "man", "male", "males", "boys", "boy"];
const FEMALE_TOKENS: &[&str] = &[
    "f", "w", "women", "womens", "woman", "female", "females", "girls", "girl", "ladies",
];
const COED_TOKENS: &[&str] = &["coed", "co-ed", "mixed", "unisex"];

/// Guesses the gender scope of a division from the words in its name.
///
/// Only meant for legacy rows that were stored without an explicit gender.
/// Names with no recognizable token, or with tokens for both genders, default
/// to [`Gender::Coed`]. Once a gender has been determined it is stored on the
/// division and never re-derived.
pub fn infer_gender(division_name: &str) -> Gender {
    let lowered = division_name.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .map(|t| t.trim_matches(|c: char| c == '-' || c == '\''))
        .map(|t| t.strip_suffix("'s").unwrap_or(t))
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.iter().any(|t| COED_TOKENS.contains(t)) {
        return Gender::Coed;
    }

    let male = tokens.iter().any(|t| MALE_TOKENS.contains(t));
    let female = tokens.iter().any(|t| FEMALE_TOKENS.contains(t));

    match (male, female) {
        (true, false) => Gender::Male,
        (false, true) => Gender::Female,
        _ => Gender::Coed,
    }
}

/// A named competition bracket scoped to a discipline and a gender.
///
/// Natural key: `(discipline_id, name, gender)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Division {
    pub division_id: String,
    pub discipline_id: String,
    pub name: String,
    pub gender: Gender,
    pub weight_category_id: Option<String>,
    #[schema(value_type = Object)]
    #[serde(default)]
    pub eligibility: serde_json::Value,
}

impl Division {
    /// Display label, e.g. "Senior — Men"
    pub fn label(&self) -> String {
        format!("{} — {}", self.name, self.gender.display_word())
    }
}

/// Orders divisions by name, then by the fixed gender order male, female, coed.
pub fn sort_divisions(divisions: &mut [Division]) {
    divisions.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.gender.cmp(&b.gender))
    });
}
