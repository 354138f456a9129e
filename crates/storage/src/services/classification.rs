use tracing::debug;

use crate::dto::catalog::{DivisionOption, ResolvedWeight, WeightOptions};
use crate::error::{Result, StorageError};
use crate::models::{
    Discipline, DisciplineName, Division, Selection, SelectionField, WeightCategory,
};
use crate::repository::CatalogStore;

/// Divisions offered for a discipline, labelled "{name} — {Men|Women|Coed}".
/// A blank discipline name yields no divisions rather than an error.
pub async fn resolve_divisions<C>(catalog: &C, discipline_name: &str) -> Result<Vec<DivisionOption>>
where
    C: CatalogStore + ?Sized,
{
    let name = DisciplineName::new(discipline_name);
    if name.is_empty() {
        return Ok(Vec::new());
    }

    let divisions = catalog.list_divisions(name.as_str()).await?;
    debug!(
        discipline = %name,
        count = divisions.len(),
        "Resolved divisions"
    );

    Ok(divisions.into_iter().map(DivisionOption::from).collect())
}

/// Weight brackets for a division. An unknown division is `NotFound`; a
/// division without brackets yields an empty list with a
/// `NoWeightCategories` status.
pub async fn resolve_weight_options<C>(catalog: &C, division_id: &str) -> Result<WeightOptions>
where
    C: CatalogStore + ?Sized,
{
    let division = catalog.get_division(division_id).await?;

    let options = match division.weight_category_id.as_deref() {
        None => WeightOptions::empty(&division.division_id, None),
        Some(weight_category_id) => {
            let category = catalog.get_weight_category(weight_category_id).await?;
            WeightOptions::from_category(&division.division_id, category)
        }
    };
    debug!(
        division_id,
        items = options.items.len(),
        status = ?options.status,
        "Resolved weight options"
    );

    Ok(options)
}

/// The weight category attached to a division, `NotFound` when the division
/// is unknown or has none.
pub async fn get_weight_category<C>(catalog: &C, division_id: &str) -> Result<WeightCategory>
where
    C: CatalogStore + ?Sized,
{
    let division = catalog.get_division(division_id).await?;
    let weight_category_id = division
        .weight_category_id
        .ok_or(StorageError::NotFound)?;

    catalog.get_weight_category(&weight_category_id).await
}

async fn require_discipline<C>(catalog: &C, discipline_name: &str) -> Result<Discipline>
where
    C: CatalogStore + ?Sized,
{
    let name = DisciplineName::new(discipline_name);
    if name.is_empty() {
        return Err(StorageError::validation("Discipline name is required"));
    }

    catalog
        .find_discipline(name.as_str())
        .await?
        .ok_or(StorageError::NotFound)
}

/// Loads a division and checks it still belongs to the selected discipline.
async fn division_in<C>(catalog: &C, discipline: &Discipline, division_id: &str) -> Result<Division>
where
    C: CatalogStore + ?Sized,
{
    let division = catalog.get_division(division_id).await?;
    if division.discipline_id != discipline.discipline_id {
        return Err(StorageError::InvalidatedSelection(SelectionField::Division));
    }
    Ok(division)
}

/// Resolves a weight item picked under a division into the values a record
/// snapshots. A weight item that is not part of the division's category is a
/// stale selection.
pub async fn resolve_weight<C>(
    catalog: &C,
    discipline_name: &str,
    division_id: &str,
    weight_item_id: &str,
) -> Result<ResolvedWeight>
where
    C: CatalogStore + ?Sized,
{
    let discipline = require_discipline(catalog, discipline_name).await?;
    let division = division_in(catalog, &discipline, division_id).await?;
    resolve_item(catalog, &division, weight_item_id).await
}

async fn resolve_item<C>(catalog: &C, division: &Division, weight_item_id: &str) -> Result<ResolvedWeight>
where
    C: CatalogStore + ?Sized,
{
    let weight_category_id = division
        .weight_category_id
        .as_deref()
        .ok_or(StorageError::InvalidatedSelection(SelectionField::Weight))?;
    let category = catalog.get_weight_category(weight_category_id).await?;

    let item = category
        .find_item(weight_item_id)
        .ok_or(StorageError::InvalidatedSelection(SelectionField::Weight))?;

    Ok(ResolvedWeight {
        division_id: division.division_id.clone(),
        weight_category_id: category.weight_category_id.clone(),
        weight_item_id: item.item_id.clone(),
        label: item.label.clone(),
        unit: category.unit,
    })
}

/// A selection checked against the current catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSelection {
    pub discipline: Discipline,
    pub division: Option<DivisionOption>,
    pub weight: Option<ResolvedWeight>,
}

/// Verifies every id in a selection against the catalog. Ids that no longer
/// fit their upstream choice fail with `InvalidatedSelection` so the caller
/// can reset that part of its state.
pub async fn resolve_selection<C>(catalog: &C, selection: &Selection) -> Result<ResolvedSelection>
where
    C: CatalogStore + ?Sized,
{
    let discipline = require_discipline(catalog, &selection.discipline_name).await?;

    let (division, weight) = match (
        selection.division_id.as_deref(),
        selection.weight_item_id.as_deref(),
    ) {
        (None, None) => (None, None),
        (None, Some(_)) => {
            return Err(StorageError::InvalidatedSelection(SelectionField::Weight));
        }
        (Some(division_id), weight_item_id) => {
            let division = division_in(catalog, &discipline, division_id).await?;
            let weight = match weight_item_id {
                Some(item_id) => Some(resolve_item(catalog, &division, item_id).await?),
                None => None,
            };
            (Some(DivisionOption::from(division)), weight)
        }
    };

    Ok(ResolvedSelection {
        discipline,
        division,
        weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::catalog::{
        UpsertDisciplineRequest, UpsertDivisionRequest, UpsertWeightCategoryRequest,
        WeightItemInput, WeightOptionsStatus,
    };
    use crate::models::{Gender, WeightUnit};
    use crate::repository::InMemoryStore;

    async fn catalog() -> InMemoryStore {
        let store = InMemoryStore::new();
        for name in ["Judo", "Sambo"] {
            store
                .upsert_discipline(&UpsertDisciplineRequest { name: name.into() })
                .await
                .unwrap();
        }
        store
            .upsert_weight_category(&UpsertWeightCategoryRequest {
                name: "IJF Senior Men".into(),
                unit: WeightUnit::Kg,
                items: ["73 kg", "81 kg", "90 kg"]
                    .iter()
                    .map(|label| WeightItemInput {
                        label: label.to_string(),
                        limit: None,
                    })
                    .collect(),
            })
            .await
            .unwrap();
        store
            .upsert_weight_category(&UpsertWeightCategoryRequest {
                name: "Empty".into(),
                unit: WeightUnit::Lb,
                items: Vec::new(),
            })
            .await
            .unwrap();

        let divisions = [
            ("Judo", "Senior", Some(Gender::Male), Some("IJF Senior Men")),
            ("Judo", "Senior", Some(Gender::Female), None),
            ("Judo", "Veterans Mixed", None, Some("Empty")),
            ("Sambo", "Senior Men", None, Some("IJF Senior Men")),
        ];
        for (discipline, name, gender, category) in divisions {
            store
                .upsert_division(&UpsertDivisionRequest {
                    discipline_name: discipline.into(),
                    name: name.into(),
                    gender,
                    weight_category_name: category.map(String::from),
                    eligibility: serde_json::Value::Null,
                })
                .await
                .unwrap();
        }
        store
    }

    async fn division_id(store: &InMemoryStore, discipline: &str, label: &str) -> String {
        resolve_divisions(store, discipline)
            .await
            .unwrap()
            .into_iter()
            .find(|d| d.label == label)
            .map(|d| d.division_id)
            .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_divisions_labels_and_order() {
        let store = catalog().await;
        let labels: Vec<String> = resolve_divisions(&store, "jUdO")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.label)
            .collect();

        assert_eq!(
            labels,
            vec!["Senior — Men", "Senior — Women", "Veterans Mixed — Coed"]
        );
    }

    #[tokio::test]
    async fn test_blank_or_unknown_discipline_gives_empty_list() {
        let store = catalog().await;
        assert!(resolve_divisions(&store, "  ").await.unwrap().is_empty());
        assert!(resolve_divisions(&store, "Karate").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_weight_options_for_known_division() {
        let store = catalog().await;
        let men = division_id(&store, "Judo", "Senior — Men").await;

        let options = resolve_weight_options(&store, &men).await.unwrap();
        assert_eq!(options.status, WeightOptionsStatus::Available);
        assert_eq!(options.unit, Some(WeightUnit::Kg));
        assert!(options.items.iter().any(|item| item.label == "90 kg"));
    }

    #[tokio::test]
    async fn test_weight_options_empty_is_status_not_error() {
        let store = catalog().await;
        let women = division_id(&store, "Judo", "Senior — Women").await;
        let mixed = division_id(&store, "Judo", "Veterans Mixed — Coed").await;

        for id in [women, mixed] {
            let options = resolve_weight_options(&store, &id).await.unwrap();
            assert!(options.items.is_empty());
            assert_eq!(options.status, WeightOptionsStatus::NoWeightCategories);
        }
    }

    #[tokio::test]
    async fn test_unknown_division_is_not_found() {
        let store = catalog().await;
        assert!(matches!(
            resolve_weight_options(&store, "nope").await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            get_weight_category(&store, "nope").await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_division_from_other_discipline_is_invalidated() {
        let store = catalog().await;
        let sambo = division_id(&store, "Sambo", "Senior Men — Men").await;
        let options = resolve_weight_options(&store, &sambo).await.unwrap();

        let err = resolve_weight(&store, "Judo", &sambo, &options.items[0].item_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidatedSelection(SelectionField::Division)
        ));
        assert!(err.is_reset_signal());
    }

    #[tokio::test]
    async fn test_weight_outside_division_category_is_invalidated() {
        let store = catalog().await;
        let men = division_id(&store, "Judo", "Senior — Men").await;
        let women = division_id(&store, "Judo", "Senior — Women").await;
        let item = resolve_weight_options(&store, &men).await.unwrap().items[0]
            .item_id
            .clone();

        let selection = Selection {
            discipline_name: "Judo".into(),
            division_id: Some(women),
            weight_item_id: Some(item),
        };
        assert!(matches!(
            resolve_selection(&store, &selection).await,
            Err(StorageError::InvalidatedSelection(SelectionField::Weight))
        ));
    }

    #[tokio::test]
    async fn test_resolve_full_selection() {
        let store = catalog().await;
        let men = division_id(&store, "Judo", "Senior — Men").await;
        let options = resolve_weight_options(&store, &men).await.unwrap();
        let ninety = options
            .items
            .iter()
            .find(|item| item.label == "90 kg")
            .unwrap();

        let selection = Selection::new("judo")
            .change_division(Some(&men))
            .selection
            .select_weight(Some(&ninety.item_id));
        let resolved = resolve_selection(&store, &selection).await.unwrap();

        assert_eq!(resolved.discipline.name, "Judo");
        let weight = resolved.weight.unwrap();
        assert_eq!(weight.label, "90 kg");
        assert_eq!(weight.unit, WeightUnit::Kg);
        assert_eq!(weight.division_id, men);
    }

    #[tokio::test]
    async fn test_selection_requires_discipline() {
        let store = catalog().await;
        assert!(matches!(
            resolve_selection(&store, &Selection::new("")).await,
            Err(StorageError::Validation(_))
        ));
    }
}
