//! Short-lived read-through cache in front of a [`CatalogStore`].
//!
//! The catalog changes rarely and only through administrative upserts, so
//! division and weight-category lookups are cached for a configurable TTL.
//! The cache is never the only way in: [`CachedCatalog::fresh`] hands out the
//! underlying store for lookups that must see the latest data.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::dto::catalog::{
    UpsertDisciplineRequest, UpsertDivisionRequest, UpsertWeightCategoryRequest,
};
use crate::error::{Result, StorageError};
use crate::models::{Discipline, DisciplineName, Division, WeightCategory};
use crate::repository::CatalogStore;

pub const CACHE_TTL_ENV: &str = "CATALOG_CACHE_TTL_SECS";
const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Zero disables caching
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

impl CacheConfig {
    pub fn from_env() -> Result<Self> {
        match std::env::var(CACHE_TTL_ENV) {
            Ok(raw) => Self::from_secs_str(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    fn from_secs_str(raw: &str) -> Result<Self> {
        let secs: u64 = raw.trim().parse().map_err(|_| {
            StorageError::validation(format!(
                "{} must be a whole number of seconds, got '{}'",
                CACHE_TTL_ENV, raw
            ))
        })?;
        Ok(Self {
            ttl: Duration::from_secs(secs),
        })
    }
}

struct Entry<T> {
    value: T,
    stored_at: Instant,
}

type Slot<T> = RwLock<HashMap<String, Entry<T>>>;

pub struct CachedCatalog<S> {
    inner: S,
    config: CacheConfig,
    divisions: Slot<Vec<Division>>,
    division_by_id: Slot<Division>,
    categories: Slot<WeightCategory>,
}

impl<S: CatalogStore> CachedCatalog<S> {
    pub fn new(inner: S, config: CacheConfig) -> Self {
        Self {
            inner,
            config,
            divisions: RwLock::new(HashMap::new()),
            division_by_id: RwLock::new(HashMap::new()),
            categories: RwLock::new(HashMap::new()),
        }
    }

    /// The uncached store, for callers that need a fresh lookup
    pub fn fresh(&self) -> &S {
        &self.inner
    }

    /// Drops every cached entry
    pub fn invalidate(&self) {
        self.divisions.write().clear();
        self.division_by_id.write().clear();
        self.categories.write().clear();
        debug!("Catalog cache invalidated");
    }

    fn lookup<T: Clone>(&self, slot: &Slot<T>, key: &str) -> Option<T> {
        let entries = slot.read();
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.config.ttl)
            .map(|entry| entry.value.clone())
    }

    fn remember<T>(&self, slot: &Slot<T>, key: &str, value: T) {
        if self.config.ttl.is_zero() {
            return;
        }
        slot.write().insert(
            key.to_string(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl<S: CatalogStore> CatalogStore for CachedCatalog<S> {
    async fn list_disciplines(&self) -> Result<Vec<Discipline>> {
        self.inner.list_disciplines().await
    }

    async fn find_discipline(&self, name: &str) -> Result<Option<Discipline>> {
        self.inner.find_discipline(name).await
    }

    async fn list_divisions(&self, discipline_name: &str) -> Result<Vec<Division>> {
        let key = DisciplineName::new(discipline_name).key().to_string();
        if let Some(divisions) = self.lookup(&self.divisions, &key) {
            return Ok(divisions);
        }

        let divisions = self.inner.list_divisions(discipline_name).await?;
        self.remember(&self.divisions, &key, divisions.clone());
        Ok(divisions)
    }

    async fn get_division(&self, division_id: &str) -> Result<Division> {
        if let Some(division) = self.lookup(&self.division_by_id, division_id) {
            return Ok(division);
        }

        let division = self.inner.get_division(division_id).await?;
        self.remember(&self.division_by_id, division_id, division.clone());
        Ok(division)
    }

    async fn get_weight_category(&self, weight_category_id: &str) -> Result<WeightCategory> {
        if let Some(category) = self.lookup(&self.categories, weight_category_id) {
            return Ok(category);
        }

        let category = self.inner.get_weight_category(weight_category_id).await?;
        self.remember(&self.categories, weight_category_id, category.clone());
        Ok(category)
    }

    async fn find_weight_category_by_name(&self, name: &str) -> Result<Option<WeightCategory>> {
        self.inner.find_weight_category_by_name(name).await
    }

    async fn upsert_discipline(&self, req: &UpsertDisciplineRequest) -> Result<Discipline> {
        let discipline = self.inner.upsert_discipline(req).await?;
        self.invalidate();
        Ok(discipline)
    }

    async fn upsert_weight_category(
        &self,
        req: &UpsertWeightCategoryRequest,
    ) -> Result<WeightCategory> {
        let category = self.inner.upsert_weight_category(req).await?;
        self.invalidate();
        Ok(category)
    }

    async fn upsert_division(&self, req: &UpsertDivisionRequest) -> Result<Division> {
        let division = self.inner.upsert_division(req).await?;
        self.invalidate();
        Ok(division)
    }

    async fn rename_weight_item(
        &self,
        weight_category_id: &str,
        weight_item_id: &str,
        label: &str,
    ) -> Result<WeightCategory> {
        let category = self
            .inner
            .rename_weight_item(weight_category_id, weight_item_id, label)
            .await?;
        self.invalidate();
        Ok(category)
    }

    async fn remove_weight_item(
        &self,
        weight_category_id: &str,
        weight_item_id: &str,
    ) -> Result<WeightCategory> {
        let category = self
            .inner
            .remove_weight_item(weight_category_id, weight_item_id)
            .await?;
        self.invalidate();
        Ok(category)
    }
}
