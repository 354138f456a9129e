use std::str::FromStr;

use storage::dto::catalog::{
    UpsertDisciplineRequest, UpsertDivisionRequest, UpsertWeightCategoryRequest, WeightItemInput,
};
use storage::models::{Gender, WeightUnit};
use storage::repository::CatalogStore;
use tracing::{debug, info};

use super::models::SeedCatalog;
use super::validator::SeedValidator;
use crate::{Result, SeederError};

/// Number of upserts issued per entity kind
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub weight_categories: usize,
    pub disciplines: usize,
    pub divisions: usize,
}

/// Validates the catalog and upserts it by natural key.
///
/// Weight categories go first so divisions can reference them by name.
/// Applying the same catalog twice leaves the store unchanged.
pub async fn apply_seed<S>(store: &S, catalog: &SeedCatalog) -> Result<SeedReport>
where
    S: CatalogStore + ?Sized,
{
    let validation = SeedValidator::validate(catalog)?;
    validation.log_warnings();

    let mut report = SeedReport::default();

    for category in &catalog.weight_categories {
        let unit = WeightUnit::from_str(&category.unit)
            .map_err(|e| SeederError::ValidationError(e.to_string()))?;
        let saved = store
            .upsert_weight_category(&UpsertWeightCategoryRequest {
                name: category.name.trim().to_string(),
                unit,
                items: category
                    .items
                    .iter()
                    .map(|item| WeightItemInput {
                        label: item.label().trim().to_string(),
                        limit: item.limit(),
                    })
                    .collect(),
            })
            .await?;
        debug!(
            "Upserted weight category {} ({} items)",
            saved.name,
            saved.items.len()
        );
        report.weight_categories += 1;
    }

    for discipline in &catalog.disciplines {
        let saved = store
            .upsert_discipline(&UpsertDisciplineRequest {
                name: discipline.name.clone(),
            })
            .await?;
        debug!("Upserted discipline {}", saved.name);
        report.disciplines += 1;

        for division in &discipline.divisions {
            let gender = division
                .gender
                .as_deref()
                .map(Gender::from_str)
                .transpose()
                .map_err(|e| SeederError::ValidationError(e.to_string()))?;

            let saved = store
                .upsert_division(&UpsertDivisionRequest {
                    discipline_name: discipline.name.clone(),
                    name: division.name.trim().to_string(),
                    gender,
                    weight_category_name: division.weight_category.clone(),
                    eligibility: division.eligibility.clone(),
                })
                .await?;
            debug!("Upserted division {}", saved.label());
            report.divisions += 1;
        }
    }

    info!(
        "Seed applied: {} weight categories, {} disciplines, {} divisions",
        report.weight_categories, report.disciplines, report.divisions
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryStore;
    use storage::services::classification::{resolve_divisions, resolve_weight_options};

    fn judo() -> SeedCatalog {
        serde_json::from_value(serde_json::json!({
            "weight_categories": [
                { "name": "IJF Senior Men", "unit": "kg", "items": ["-73 kg", "-81 kg"] }
            ],
            "disciplines": [
                {
                    "name": "Judo",
                    "divisions": [
                        { "name": "Senior", "gender": "male", "weight_category": "IJF Senior Men" },
                        { "name": "Women's Senior" }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_apply_seed_populates_catalog() {
        let store = InMemoryStore::new();
        let report = apply_seed(&store, &judo()).await.unwrap();

        assert_eq!(
            report,
            SeedReport {
                weight_categories: 1,
                disciplines: 1,
                divisions: 2,
            }
        );

        let divisions = resolve_divisions(&store, "judo").await.unwrap();
        let labels: Vec<&str> = divisions.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["Senior — Men", "Women's Senior — Women"]);

        let options = resolve_weight_options(&store, &divisions[0].division_id)
            .await
            .unwrap();
        assert_eq!(options.items.len(), 2);
        assert_eq!(options.items[0].limit, Some(rust_decimal::Decimal::from(73)));
    }

    #[tokio::test]
    async fn test_reapplying_seed_creates_no_duplicates() {
        let store = InMemoryStore::new();
        apply_seed(&store, &judo()).await.unwrap();
        let first = resolve_divisions(&store, "Judo").await.unwrap();
        let first_items = resolve_weight_options(&store, &first[0].division_id)
            .await
            .unwrap()
            .items;

        apply_seed(&store, &judo()).await.unwrap();
        let second = resolve_divisions(&store, "Judo").await.unwrap();
        let second_items = resolve_weight_options(&store, &second[0].division_id)
            .await
            .unwrap()
            .items;

        assert_eq!(first, second);
        assert_eq!(first_items, second_items);
        assert_eq!(store.list_disciplines().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_seed_writes_nothing() {
        let store = InMemoryStore::new();
        let mut catalog = judo();
        catalog.disciplines[0].divisions[0].weight_category = Some("Missing".into());

        assert!(matches!(
            apply_seed(&store, &catalog).await,
            Err(SeederError::ValidationError(_))
        ));
        assert!(store.list_disciplines().await.unwrap().is_empty());
    }
}
