use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use validator::Validate;

use super::{
    AssociationStore, CatalogStore, RecordStore, division_gender, merge_weight_items, new_id,
};
use crate::dto::catalog::{
    UpsertDisciplineRequest, UpsertDivisionRequest, UpsertWeightCategoryRequest,
};
use crate::error::{Result, StorageError};
use crate::models::{
    AthleteDisciplineAssociation, DependentRecord, Discipline, DisciplineName, Division,
    WeightCategory, canonical_id, sort_divisions,
};

#[derive(Default)]
struct CatalogData {
    disciplines: Vec<Discipline>,
    divisions: Vec<Division>,
    weight_categories: Vec<WeightCategory>,
}

impl CatalogData {
    fn discipline_by_name(&self, name: &str) -> Option<&Discipline> {
        let wanted = DisciplineName::new(name);
        self.disciplines
            .iter()
            .find(|d| DisciplineName::new(&d.name) == wanted)
    }

    fn category_mut(&mut self, weight_category_id: &str) -> Result<&mut WeightCategory> {
        self.weight_categories
            .iter_mut()
            .find(|c| c.weight_category_id == weight_category_id)
            .ok_or(StorageError::NotFound)
    }
}

/// Process-local store implementing every store trait.
///
/// Ledger writes are checked against the stored version under the map lock,
/// which gives the same optimistic guarantee as the PostgreSQL repository.
#[derive(Default)]
pub struct InMemoryStore {
    catalog: RwLock<CatalogData>,
    associations: Mutex<HashMap<String, AthleteDisciplineAssociation>>,
    records: Mutex<HashMap<String, DependentRecord>>,
    catalog_reads: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of catalog reads served so far
    pub fn catalog_reads(&self) -> usize {
        self.catalog_reads.load(Ordering::SeqCst)
    }

    fn count_read(&self) {
        self.catalog_reads.fetch_add(1, Ordering::SeqCst);
    }
}

fn association_key(association: &AthleteDisciplineAssociation) -> (String, Option<String>, String) {
    (
        association.owner_id.clone(),
        canonical_id(association.family_member.as_ref()).map(String::from),
        DisciplineName::new(&association.discipline_name).key().to_string(),
    )
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_disciplines(&self) -> Result<Vec<Discipline>> {
        self.count_read();
        let mut disciplines = self.catalog.read().disciplines.clone();
        disciplines.sort_by_key(|d| d.name.to_lowercase());
        Ok(disciplines)
    }

    async fn find_discipline(&self, name: &str) -> Result<Option<Discipline>> {
        self.count_read();
        Ok(self.catalog.read().discipline_by_name(name).cloned())
    }

    async fn list_divisions(&self, discipline_name: &str) -> Result<Vec<Division>> {
        self.count_read();
        let catalog = self.catalog.read();
        let Some(discipline) = catalog.discipline_by_name(discipline_name) else {
            return Ok(Vec::new());
        };

        let mut divisions: Vec<Division> = catalog
            .divisions
            .iter()
            .filter(|d| d.discipline_id == discipline.discipline_id)
            .cloned()
            .collect();
        sort_divisions(&mut divisions);

        Ok(divisions)
    }

    async fn get_division(&self, division_id: &str) -> Result<Division> {
        self.count_read();
        self.catalog
            .read()
            .divisions
            .iter()
            .find(|d| d.division_id == division_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_weight_category(&self, weight_category_id: &str) -> Result<WeightCategory> {
        self.count_read();
        self.catalog
            .read()
            .weight_categories
            .iter()
            .find(|c| c.weight_category_id == weight_category_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn find_weight_category_by_name(&self, name: &str) -> Result<Option<WeightCategory>> {
        self.count_read();
        let name = name.trim();
        Ok(self
            .catalog
            .read()
            .weight_categories
            .iter()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn upsert_discipline(&self, req: &UpsertDisciplineRequest) -> Result<Discipline> {
        req.validate()?;
        let name = DisciplineName::new(&req.name);

        let mut catalog = self.catalog.write();
        if let Some(existing) = catalog.discipline_by_name(name.as_str()) {
            return Ok(existing.clone());
        }

        let discipline = Discipline {
            discipline_id: new_id(),
            name: name.as_str().to_string(),
        };
        catalog.disciplines.push(discipline.clone());
        Ok(discipline)
    }

    async fn upsert_weight_category(
        &self,
        req: &UpsertWeightCategoryRequest,
    ) -> Result<WeightCategory> {
        req.validate()?;
        let name = req.name.trim();
        let mut catalog = self.catalog.write();

        if let Some(existing) = catalog
            .weight_categories
            .iter_mut()
            .find(|c| c.name == name)
        {
            let mut updated = existing.clone();
            updated.unit = req.unit;
            updated.items = merge_weight_items(&existing.items, &req.items);
            updated.check_items().map_err(StorageError::Validation)?;
            *existing = updated.clone();
            return Ok(updated);
        }

        let category = WeightCategory {
            weight_category_id: new_id(),
            name: name.to_string(),
            unit: req.unit,
            items: merge_weight_items(&[], &req.items),
        };
        category.check_items().map_err(StorageError::Validation)?;
        catalog.weight_categories.push(category.clone());
        Ok(category)
    }

    async fn upsert_division(&self, req: &UpsertDivisionRequest) -> Result<Division> {
        req.validate()?;
        let name = req.name.trim();
        let gender = division_gender(req);
        let mut catalog = self.catalog.write();

        let discipline_id = catalog
            .discipline_by_name(&req.discipline_name)
            .map(|d| d.discipline_id.clone())
            .ok_or(StorageError::NotFound)?;

        let weight_category_id = match req.weight_category_name.as_deref().map(str::trim) {
            Some(category_name) => Some(
                catalog
                    .weight_categories
                    .iter()
                    .find(|c| c.name == category_name)
                    .map(|c| c.weight_category_id.clone())
                    .ok_or(StorageError::NotFound)?,
            ),
            None => None,
        };

        if let Some(existing) = catalog.divisions.iter_mut().find(|d| {
            d.discipline_id == discipline_id && d.name == name && d.gender == gender
        }) {
            if weight_category_id.is_some() {
                existing.weight_category_id = weight_category_id;
            }
            if !req.eligibility.is_null() {
                existing.eligibility = req.eligibility.clone();
            }
            return Ok(existing.clone());
        }

        let division = Division {
            division_id: new_id(),
            discipline_id,
            name: name.to_string(),
            gender,
            weight_category_id,
            eligibility: req.eligibility.clone(),
        };
        catalog.divisions.push(division.clone());
        Ok(division)
    }

    async fn rename_weight_item(
        &self,
        weight_category_id: &str,
        weight_item_id: &str,
        label: &str,
    ) -> Result<WeightCategory> {
        let mut catalog = self.catalog.write();
        let category = catalog.category_mut(weight_category_id)?;

        let mut updated = category.clone();
        let item = updated
            .items
            .iter_mut()
            .find(|item| item.item_id == weight_item_id)
            .ok_or(StorageError::NotFound)?;
        item.label = label.trim().to_string();
        updated.check_items().map_err(StorageError::Validation)?;

        *category = updated.clone();
        Ok(updated)
    }

    async fn remove_weight_item(
        &self,
        weight_category_id: &str,
        weight_item_id: &str,
    ) -> Result<WeightCategory> {
        let mut catalog = self.catalog.write();
        let category = catalog.category_mut(weight_category_id)?;

        let before = category.items.len();
        category.items.retain(|item| item.item_id != weight_item_id);
        if category.items.len() == before {
            return Err(StorageError::NotFound);
        }

        Ok(category.clone())
    }
}

#[async_trait]
impl AssociationStore for InMemoryStore {
    async fn insert(&self, association: &AthleteDisciplineAssociation) -> Result<()> {
        let mut associations = self.associations.lock();
        let key = association_key(association);

        if associations.values().any(|a| association_key(a) == key) {
            return Err(StorageError::ConstraintViolation(format!(
                "Athlete already has discipline '{}'",
                association.discipline_name
            )));
        }
        if associations.contains_key(&association.association_id) {
            return Err(StorageError::ConstraintViolation(
                "Association id already exists".to_string(),
            ));
        }

        associations.insert(association.association_id.clone(), association.clone());
        Ok(())
    }

    async fn find(&self, association_id: &str) -> Result<AthleteDisciplineAssociation> {
        self.associations
            .lock()
            .get(association_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<AthleteDisciplineAssociation>> {
        let mut owned: Vec<AthleteDisciplineAssociation> = self
            .associations
            .lock()
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.association_id.cmp(&b.association_id))
        });
        Ok(owned)
    }

    async fn save_promotions(
        &self,
        association: &AthleteDisciplineAssociation,
        expected_version: i64,
    ) -> Result<AthleteDisciplineAssociation> {
        let mut associations = self.associations.lock();
        let stored = associations
            .get_mut(&association.association_id)
            .ok_or(StorageError::NotFound)?;

        if stored.version() != expected_version {
            return Err(StorageError::ConcurrentModification);
        }

        let saved = stored
            .clone()
            .with_promotions(association.promotions().to_vec())
            .with_version(expected_version + 1);
        *stored = saved.clone();
        Ok(saved)
    }

    async fn delete(&self, association_id: &str) -> Result<()> {
        self.associations
            .lock()
            .remove(association_id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn find(&self, record_id: &str) -> Result<DependentRecord> {
        self.records
            .lock()
            .get(record_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn insert(&self, record: &DependentRecord) -> Result<DependentRecord> {
        let mut records = self.records.lock();
        if records.contains_key(&record.record_id) {
            return Err(StorageError::ConstraintViolation(
                "Record id already exists".to_string(),
            ));
        }

        records.insert(record.record_id.clone(), record.clone());
        Ok(record.clone())
    }

    async fn update(
        &self,
        record: &DependentRecord,
        expected_version: i64,
    ) -> Result<DependentRecord> {
        let mut records = self.records.lock();
        let stored = records
            .get_mut(&record.record_id)
            .ok_or(StorageError::NotFound)?;

        if stored.version != expected_version {
            return Err(StorageError::ConcurrentModification);
        }

        let saved = DependentRecord {
            created_at: stored.created_at,
            version: expected_version + 1,
            ..record.clone()
        };
        *stored = saved.clone();
        Ok(saved)
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<DependentRecord>> {
        let mut owned: Vec<DependentRecord> = self
            .records
            .lock()
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::catalog::WeightItemInput;
    use crate::models::{Gender, WeightUnit};

    fn category(name: &str, labels: &[&str]) -> UpsertWeightCategoryRequest {
        UpsertWeightCategoryRequest {
            name: name.into(),
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

    fn division(name: &str, gender: Option<Gender>, category: Option<&str>) -> UpsertDivisionRequest {
        UpsertDivisionRequest {
            discipline_name: "judo".into(),
            name: name.into(),
            gender,
            weight_category_name: category.map(String::from),
            eligibility: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_upserts_are_idempotent() {
        let store = InMemoryStore::new();
        let judo = store
            .upsert_discipline(&UpsertDisciplineRequest { name: "Judo".into() })
            .await
            .unwrap();
        let again = store
            .upsert_discipline(&UpsertDisciplineRequest { name: " JUDO ".into() })
            .await
            .unwrap();
        assert_eq!(judo, again);

        let first = store
            .upsert_weight_category(&category("IJF Men", &["73 kg", "90 kg"]))
            .await
            .unwrap();
        let second = store
            .upsert_weight_category(&category("IJF Men", &["73 kg", "90 kg"]))
            .await
            .unwrap();
        assert_eq!(first, second);

        let d1 = store
            .upsert_division(&division("Senior", Some(Gender::Male), Some("IJF Men")))
            .await
            .unwrap();
        let d2 = store
            .upsert_division(&division("Senior", Some(Gender::Male), None))
            .await
            .unwrap();
        assert_eq!(d1, d2);
        assert_eq!(store.list_divisions("Judo").await.unwrap().len(), 1);
        assert_eq!(store.list_disciplines().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_division_upsert_requires_known_discipline_and_category() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.upsert_division(&division("Senior", None, None)).await,
            Err(StorageError::NotFound)
        ));

        store
            .upsert_discipline(&UpsertDisciplineRequest { name: "Judo".into() })
            .await
            .unwrap();
        assert!(matches!(
            store
                .upsert_division(&division("Senior", None, Some("missing")))
                .await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_blank_names_are_rejected_before_storing() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store
                .upsert_discipline(&UpsertDisciplineRequest { name: "  ".into() })
                .await,
            Err(StorageError::Validation(_))
        ));

        store
            .upsert_discipline(&UpsertDisciplineRequest { name: "Judo".into() })
            .await
            .unwrap();
        assert!(matches!(
            store.upsert_weight_category(&category("   ", &["73 kg"])).await,
            Err(StorageError::Validation(_))
        ));
        assert!(matches!(
            store.upsert_weight_category(&category("IJF Men", &["73 kg", " "])).await,
            Err(StorageError::Validation(_))
        ));
        assert!(matches!(
            store.upsert_division(&division("  ", None, None)).await,
            Err(StorageError::Validation(_))
        ));

        assert!(store.list_divisions("Judo").await.unwrap().is_empty());
        assert!(
            store
                .find_weight_category_by_name("")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_rename_rejects_duplicate_label() {
        let store = InMemoryStore::new();
        let created = store
            .upsert_weight_category(&category("IJF Men", &["73 kg", "90 kg"]))
            .await
            .unwrap();

        let result = store
            .rename_weight_item(
                &created.weight_category_id,
                &created.items[0].item_id,
                "90 kg",
            )
            .await;
        assert!(matches!(result, Err(StorageError::Validation(_))));

        let unchanged = store
            .get_weight_category(&created.weight_category_id)
            .await
            .unwrap();
        assert_eq!(unchanged, created);
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let store = InMemoryStore::new();
        let association = AthleteDisciplineAssociation::new(
            "a1".into(),
            "owner".into(),
            None,
            "Judo".into(),
            None,
            chrono::Utc::now(),
        );
        AssociationStore::insert(&store, &association).await.unwrap();

        let saved = store.save_promotions(&association, 0).await.unwrap();
        assert_eq!(saved.version(), 1);

        assert!(matches!(
            store.save_promotions(&association, 0).await,
            Err(StorageError::ConcurrentModification)
        ));
    }

    #[tokio::test]
    async fn test_stale_record_update_is_rejected() {
        let store = InMemoryStore::new();
        let now = chrono::Utc::now();
        let record = DependentRecord {
            record_id: "r1".into(),
            owner_id: "owner".into(),
            family_member: None,
            kind: crate::models::RecordKind::Match,
            discipline_name: "Judo".into(),
            title: None,
            division_id: None,
            weight_category_id: None,
            weight_item_id: None,
            weight_label: None,
            weight_unit: None,
            weight_value: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        RecordStore::insert(&store, &record).await.unwrap();
        assert!(matches!(
            RecordStore::insert(&store, &record).await,
            Err(StorageError::ConstraintViolation(_))
        ));

        let titled = DependentRecord {
            title: Some("Final".into()),
            ..record.clone()
        };
        let saved = store.update(&titled, 0).await.unwrap();
        assert_eq!(saved.version, 1);

        let stale = DependentRecord {
            weight_label: Some("73 kg".into()),
            ..record.clone()
        };
        assert!(matches!(
            store.update(&stale, 0).await,
            Err(StorageError::ConcurrentModification)
        ));
        let stored = RecordStore::find(&store, "r1").await.unwrap();
        assert_eq!(stored.title.as_deref(), Some("Final"));
        assert_eq!(stored.weight_label, None);

        let missing = DependentRecord {
            record_id: "r2".into(),
            ..record
        };
        assert!(matches!(
            store.update(&missing, 0).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_association_rejected() {
        let store = InMemoryStore::new();
        let now = chrono::Utc::now();
        let first = AthleteDisciplineAssociation::new(
            "a1".into(),
            "owner".into(),
            None,
            "Judo".into(),
            None,
            now,
        );
        let duplicate = AthleteDisciplineAssociation::new(
            "a2".into(),
            "owner".into(),
            Some(crate::models::Reference::Unresolved(String::new())),
            "JUDO".into(),
            None,
            now,
        );
        AssociationStore::insert(&store, &first).await.unwrap();
        assert!(matches!(
            AssociationStore::insert(&store, &duplicate).await,
            Err(StorageError::ConstraintViolation(_))
        ));
    }
}
