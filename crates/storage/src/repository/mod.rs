//! Persistence seams for the catalog, the progression ledger and dependent records.
//!
//! Each store has a PostgreSQL implementation (`*Repository`) and the
//! [`memory::InMemoryStore`], which honours the same contract.

pub mod association;
pub mod catalog;
pub mod memory;
pub mod record;

use async_trait::async_trait;

use crate::dto::catalog::{
    UpsertDisciplineRequest, UpsertDivisionRequest, UpsertWeightCategoryRequest, WeightItemInput,
};
use crate::error::Result;
use crate::models::{
    AthleteDisciplineAssociation, DependentRecord, Discipline, Division, Gender, WeightCategory,
    WeightItem, infer_gender, parse_label_limit,
};

pub use association::AssociationRepository;
pub use catalog::CatalogRepository;
pub use memory::InMemoryStore;
pub use record::RecordRepository;

/// Read-mostly reference data, written only through idempotent upserts.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_disciplines(&self) -> Result<Vec<Discipline>>;

    /// Case-insensitive lookup by name
    async fn find_discipline(&self, name: &str) -> Result<Option<Discipline>>;

    /// Divisions of a discipline (case-insensitive), sorted by name then gender
    async fn list_divisions(&self, discipline_name: &str) -> Result<Vec<Division>>;

    async fn get_division(&self, division_id: &str) -> Result<Division>;

    async fn get_weight_category(&self, weight_category_id: &str) -> Result<WeightCategory>;

    async fn find_weight_category_by_name(&self, name: &str) -> Result<Option<WeightCategory>>;

    async fn upsert_discipline(&self, req: &UpsertDisciplineRequest) -> Result<Discipline>;

    async fn upsert_weight_category(
        &self,
        req: &UpsertWeightCategoryRequest,
    ) -> Result<WeightCategory>;

    async fn upsert_division(&self, req: &UpsertDivisionRequest) -> Result<Division>;

    async fn rename_weight_item(
        &self,
        weight_category_id: &str,
        weight_item_id: &str,
        label: &str,
    ) -> Result<WeightCategory>;

    async fn remove_weight_item(
        &self,
        weight_category_id: &str,
        weight_item_id: &str,
    ) -> Result<WeightCategory>;
}

/// Athlete-discipline associations and their promotion history.
#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// Fails with `ConstraintViolation` when the athlete already holds the discipline
    async fn insert(&self, association: &AthleteDisciplineAssociation) -> Result<()>;

    async fn find(&self, association_id: &str) -> Result<AthleteDisciplineAssociation>;

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<AthleteDisciplineAssociation>>;

    /// Persists the promotions and derived rank only if the stored version is
    /// still `expected_version`; returns the association with its new version.
    /// A stale version fails with `ConcurrentModification`.
    async fn save_promotions(
        &self,
        association: &AthleteDisciplineAssociation,
        expected_version: i64,
    ) -> Result<AthleteDisciplineAssociation>;

    async fn delete(&self, association_id: &str) -> Result<()>;
}

/// Match and scouting reports. Each write stores the whole record in one step.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find(&self, record_id: &str) -> Result<DependentRecord>;

    /// Fails with `ConstraintViolation` when the id is already taken
    async fn insert(&self, record: &DependentRecord) -> Result<DependentRecord>;

    /// Replaces the stored record only while its version is still
    /// `expected_version`, otherwise `ConcurrentModification`.
    async fn update(
        &self,
        record: &DependentRecord,
        expected_version: i64,
    ) -> Result<DependentRecord>;

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<DependentRecord>>;
}

/// Opaque id for new rows
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Gender a division upsert is keyed by: the explicit one, else inferred from the name
pub(crate) fn division_gender(req: &UpsertDivisionRequest) -> Gender {
    req.gender.unwrap_or_else(|| infer_gender(&req.name))
}

/// Builds the item list for an upserted category. Items whose label already
/// exists (case-insensitive) keep their id so snapshots keep pointing at them.
pub(crate) fn merge_weight_items(
    existing: &[WeightItem],
    inputs: &[WeightItemInput],
) -> Vec<WeightItem> {
    inputs
        .iter()
        .map(|input| {
            let label = input.label.trim().to_string();
            let folded = label.to_lowercase();
            let item_id = existing
                .iter()
                .find(|item| item.label.trim().to_lowercase() == folded)
                .map(|item| item.item_id.clone())
                .unwrap_or_else(new_id);
            let limit = input.limit.or_else(|| parse_label_limit(&label));

            WeightItem {
                item_id,
                label,
                limit,
            }
        })
        .collect()
}
