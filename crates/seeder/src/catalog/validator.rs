use std::collections::HashSet;
use std::str::FromStr;

use storage::models::{DisciplineName, Gender, WeightUnit, check_item_labels, infer_gender};
use tracing::warn;

use super::models::SeedCatalog;
use crate::{Result, SeederError};

pub struct SeedValidator;

impl SeedValidator {
    pub fn validate(catalog: &SeedCatalog) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        let mut category_names = HashSet::new();
        for category in &catalog.weight_categories {
            let name = category.name.trim();
            if name.is_empty() {
                report
                    .errors
                    .push("Weight category name cannot be empty".to_string());
            }
            if !category_names.insert(name) {
                report
                    .errors
                    .push(format!("Duplicate weight category: '{}'", name));
            }
            if WeightUnit::from_str(&category.unit).is_err() {
                report.errors.push(format!(
                    "Weight category '{}' has unknown unit '{}'. Must be 'kg' or 'lb'",
                    name, category.unit
                ));
            }
            if category.items.is_empty() {
                report
                    .warnings
                    .push(format!("Weight category '{}' has no items", name));
            }
            if let Err(e) = check_item_labels(category.items.iter().map(|i| i.label())) {
                report
                    .errors
                    .push(format!("Weight category '{}': {}", name, e));
            }
        }

        if catalog.disciplines.is_empty() {
            report
                .warnings
                .push("Catalog defines no disciplines".to_string());
        }

        let mut discipline_keys = HashSet::new();
        for discipline in &catalog.disciplines {
            let name = DisciplineName::new(&discipline.name);
            if name.is_empty() {
                report
                    .errors
                    .push("Discipline name cannot be empty".to_string());
            }
            if !discipline_keys.insert(name.key().to_string()) {
                report
                    .errors
                    .push(format!("Duplicate discipline: '{}'", name));
            }
            if discipline.divisions.is_empty() {
                report
                    .warnings
                    .push(format!("Discipline '{}' has no divisions", name));
            }

            let mut division_keys = HashSet::new();
            for division in &discipline.divisions {
                let division_name = division.name.trim();
                let label = format!("{} / {}", name, division_name);

                if division_name.is_empty() {
                    report.errors.push(format!(
                        "Division in discipline '{}' has empty name",
                        name
                    ));
                }

                let gender = match division.gender.as_deref() {
                    Some(raw) => match Gender::from_str(raw) {
                        Ok(gender) => gender,
                        Err(e) => {
                            report.errors.push(format!("Division '{}': {}", label, e));
                            continue;
                        }
                    },
                    None => {
                        let inferred = infer_gender(division_name);
                        report.warnings.push(format!(
                            "Division '{}' has no gender, inferred '{}'",
                            label,
                            inferred.as_str()
                        ));
                        inferred
                    }
                };

                if !division_keys.insert((division_name, gender)) {
                    report.errors.push(format!(
                        "Duplicate division '{}' ({})",
                        label,
                        gender.as_str()
                    ));
                }

                match division.weight_category.as_deref().map(str::trim) {
                    Some(category) if !category_names.contains(category) => {
                        report.errors.push(format!(
                            "Division '{}' references undefined weight category '{}'",
                            label, category
                        ));
                    }
                    Some(_) => {}
                    None => report
                        .warnings
                        .push(format!("Division '{}' has no weight category", label)),
                }
            }
        }

        if !report.errors.is_empty() {
            Err(SeederError::ValidationError(format!(
                "Validation failed with {} error(s): {}",
                report.errors.len(),
                report.errors.join("; ")
            )))
        } else {
            Ok(report)
        }
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
    }
}
