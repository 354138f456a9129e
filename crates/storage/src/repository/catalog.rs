use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;
use validator::Validate;

use super::{CatalogStore, division_gender, merge_weight_items, new_id};
use crate::dto::catalog::{
    UpsertDisciplineRequest, UpsertDivisionRequest, UpsertWeightCategoryRequest,
};
use crate::error::{Result, StorageError};
use crate::models::{
    Discipline, DisciplineName, Division, Gender, WeightCategory, WeightItem, infer_gender,
    sort_divisions,
};

#[derive(FromRow)]
struct DivisionRow {
    division_id: String,
    discipline_id: String,
    name: String,
    gender: Option<String>,
    weight_category_id: Option<String>,
    eligibility: Json<serde_json::Value>,
}

impl TryFrom<DivisionRow> for Division {
    type Error = StorageError;

    fn try_from(row: DivisionRow) -> Result<Self> {
        // Legacy rows stored without a gender fall back to the name heuristic
        let gender = match row.gender.as_deref() {
            Some(gender) => gender
                .parse()
                .map_err(|e: crate::models::GenderParseError| {
                    StorageError::Validation(e.to_string())
                })?,
            None => infer_gender(&row.name),
        };

        Ok(Division {
            gender,
            division_id: row.division_id,
            discipline_id: row.discipline_id,
            name: row.name,
            weight_category_id: row.weight_category_id,
            eligibility: row.eligibility.0,
        })
    }
}

#[derive(FromRow)]
struct WeightCategoryRow {
    weight_category_id: String,
    name: String,
    unit: String,
    items: Json<Vec<WeightItem>>,
}

impl TryFrom<WeightCategoryRow> for WeightCategory {
    type Error = StorageError;

    fn try_from(row: WeightCategoryRow) -> Result<Self> {
        Ok(WeightCategory {
            unit: row
                .unit
                .parse()
                .map_err(|e: crate::models::WeightUnitParseError| {
                    StorageError::Validation(e.to_string())
                })?,
            weight_category_id: row.weight_category_id,
            name: row.name,
            items: row.items.0,
        })
    }
}

const DIVISION_COLUMNS: &str =
    "d.division_id, d.discipline_id, d.name, d.gender, d.weight_category_id, d.eligibility";

/// Repository for catalog reads and natural-key upserts
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn lock_category(
        tx: &mut Transaction<'_, Postgres>,
        weight_category_id: &str,
    ) -> Result<WeightCategory> {
        let row = sqlx::query_as::<_, WeightCategoryRow>(
            r#"
            SELECT weight_category_id, name, unit, items
            FROM weight_categories
            WHERE weight_category_id = $1
            FOR UPDATE
            "#,
        )
        .bind(weight_category_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StorageError::NotFound)?;

        row.try_into()
    }

    /// Stores `gender` on a legacy row (gender NULL) whose name implies it.
    ///
    /// NULLs never take part in the `(discipline_id, name, gender)` conflict,
    /// so without this an upsert would insert a twin of the legacy row.
    async fn claim_legacy_division(
        tx: &mut Transaction<'_, Postgres>,
        discipline_id: &str,
        name: &str,
        gender: Gender,
    ) -> Result<()> {
        if infer_gender(name) != gender {
            return Ok(());
        }

        let claimed = sqlx::query(
            r#"
            UPDATE divisions
            SET gender = $3
            WHERE division_id = (
                SELECT division_id
                FROM divisions
                WHERE discipline_id = $1 AND name = $2 AND gender IS NULL
                ORDER BY division_id
                LIMIT 1
                FOR UPDATE
            )
            AND NOT EXISTS (
                SELECT 1
                FROM divisions
                WHERE discipline_id = $1 AND name = $2 AND gender = $3
            )
            "#,
        )
        .bind(discipline_id)
        .bind(name)
        .bind(gender.as_str())
        .execute(&mut **tx)
        .await?;

        if claimed.rows_affected() > 0 {
            debug!(
                discipline_id,
                name,
                gender = gender.as_str(),
                "Stored gender on legacy division"
            );
        }
        Ok(())
    }

    async fn store_items(
        tx: &mut Transaction<'_, Postgres>,
        category: &WeightCategory,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE weight_categories
            SET items = $2, updated_at = now()
            WHERE weight_category_id = $1
            "#,
        )
        .bind(&category.weight_category_id)
        .bind(Json(&category.items))
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl<'a> CatalogStore for CatalogRepository<'a> {
    async fn list_disciplines(&self) -> Result<Vec<Discipline>> {
        let disciplines = sqlx::query_as::<_, Discipline>(
            r#"
            SELECT discipline_id, name
            FROM disciplines
            ORDER BY lower(name)
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(disciplines)
    }

    async fn find_discipline(&self, name: &str) -> Result<Option<Discipline>> {
        let name = DisciplineName::new(name);
        let discipline = sqlx::query_as::<_, Discipline>(
            r#"
            SELECT discipline_id, name
            FROM disciplines
            WHERE lower(name) = $1
            "#,
        )
        .bind(name.key())
        .fetch_optional(self.pool)
        .await?;

        Ok(discipline)
    }

    async fn list_divisions(&self, discipline_name: &str) -> Result<Vec<Division>> {
        let name = DisciplineName::new(discipline_name);
        let rows = sqlx::query_as::<_, DivisionRow>(&format!(
            r#"
            SELECT {DIVISION_COLUMNS}
            FROM divisions d
            JOIN disciplines s ON s.discipline_id = d.discipline_id
            WHERE lower(s.name) = $1
            "#
        ))
        .bind(name.key())
        .fetch_all(self.pool)
        .await?;

        let mut divisions = rows
            .into_iter()
            .map(Division::try_from)
            .collect::<Result<Vec<_>>>()?;
        sort_divisions(&mut divisions);

        Ok(divisions)
    }

    async fn get_division(&self, division_id: &str) -> Result<Division> {
        let row = sqlx::query_as::<_, DivisionRow>(&format!(
            r#"
            SELECT {DIVISION_COLUMNS}
            FROM divisions d
            WHERE d.division_id = $1
            "#
        ))
        .bind(division_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        row.try_into()
    }

    async fn get_weight_category(&self, weight_category_id: &str) -> Result<WeightCategory> {
        let row = sqlx::query_as::<_, WeightCategoryRow>(
            r#"
            SELECT weight_category_id, name, unit, items
            FROM weight_categories
            WHERE weight_category_id = $1
            "#,
        )
        .bind(weight_category_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        row.try_into()
    }

    async fn find_weight_category_by_name(&self, name: &str) -> Result<Option<WeightCategory>> {
        let row = sqlx::query_as::<_, WeightCategoryRow>(
            r#"
            SELECT weight_category_id, name, unit, items
            FROM weight_categories
            WHERE name = $1
            "#,
        )
        .bind(name.trim())
        .fetch_optional(self.pool)
        .await?;

        row.map(WeightCategory::try_from).transpose()
    }

    async fn upsert_discipline(&self, req: &UpsertDisciplineRequest) -> Result<Discipline> {
        req.validate()?;
        let name = DisciplineName::new(&req.name);

        // The no-op update makes RETURNING yield the existing row on conflict
        let discipline = sqlx::query_as::<_, Discipline>(
            r#"
            INSERT INTO disciplines (discipline_id, name)
            VALUES ($1, $2)
            ON CONFLICT ((lower(name)))
            DO UPDATE SET name = disciplines.name
            RETURNING discipline_id, name
            "#,
        )
        .bind(new_id())
        .bind(name.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(discipline)
    }

    async fn upsert_weight_category(
        &self,
        req: &UpsertWeightCategoryRequest,
    ) -> Result<WeightCategory> {
        req.validate()?;
        let name = req.name.trim();
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, WeightCategoryRow>(
            r#"
            SELECT weight_category_id, name, unit, items
            FROM weight_categories
            WHERE name = $1
            FOR UPDATE
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;

        let (weight_category_id, existing_items) = match existing {
            Some(row) => (row.weight_category_id, row.items.0),
            None => (new_id(), Vec::new()),
        };

        let category = WeightCategory {
            weight_category_id,
            name: name.to_string(),
            unit: req.unit,
            items: merge_weight_items(&existing_items, &req.items),
        };
        category.check_items().map_err(StorageError::Validation)?;

        let row = sqlx::query_as::<_, WeightCategoryRow>(
            r#"
            INSERT INTO weight_categories (weight_category_id, name, unit, items)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name)
            DO UPDATE SET
                unit = EXCLUDED.unit,
                items = EXCLUDED.items,
                updated_at = now()
            RETURNING weight_category_id, name, unit, items
            "#,
        )
        .bind(&category.weight_category_id)
        .bind(&category.name)
        .bind(category.unit.as_str())
        .bind(Json(&category.items))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn upsert_division(&self, req: &UpsertDivisionRequest) -> Result<Division> {
        req.validate()?;
        let discipline = self
            .find_discipline(&req.discipline_name)
            .await?
            .ok_or(StorageError::NotFound)?;

        let weight_category_id = match req.weight_category_name.as_deref() {
            Some(category_name) => Some(
                self.find_weight_category_by_name(category_name)
                    .await?
                    .ok_or(StorageError::NotFound)?
                    .weight_category_id,
            ),
            None => None,
        };

        let name = req.name.trim();
        let gender = division_gender(req);
        let mut tx = self.pool.begin().await?;
        Self::claim_legacy_division(&mut tx, &discipline.discipline_id, name, gender).await?;

        // Omitted fields keep their stored values on conflict
        let row = sqlx::query_as::<_, DivisionRow>(
            r#"
            INSERT INTO divisions AS d
                (division_id, discipline_id, name, gender, weight_category_id, eligibility)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (discipline_id, name, gender)
            DO UPDATE SET
                weight_category_id = COALESCE(EXCLUDED.weight_category_id, d.weight_category_id),
                eligibility = CASE
                    WHEN EXCLUDED.eligibility = 'null'::jsonb THEN d.eligibility
                    ELSE EXCLUDED.eligibility
                END
            RETURNING d.division_id, d.discipline_id, d.name, d.gender,
                      d.weight_category_id, d.eligibility
            "#,
        )
        .bind(new_id())
        .bind(&discipline.discipline_id)
        .bind(name)
        .bind(gender.as_str())
        .bind(weight_category_id)
        .bind(Json(&req.eligibility))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn rename_weight_item(
        &self,
        weight_category_id: &str,
        weight_item_id: &str,
        label: &str,
    ) -> Result<WeightCategory> {
        let mut tx = self.pool.begin().await?;
        let mut category = Self::lock_category(&mut tx, weight_category_id).await?;

        let item = category
            .items
            .iter_mut()
            .find(|item| item.item_id == weight_item_id)
            .ok_or(StorageError::NotFound)?;
        item.label = label.trim().to_string();
        category.check_items().map_err(StorageError::Validation)?;

        Self::store_items(&mut tx, &category).await?;
        tx.commit().await?;

        Ok(category)
    }

    async fn remove_weight_item(
        &self,
        weight_category_id: &str,
        weight_item_id: &str,
    ) -> Result<WeightCategory> {
        let mut tx = self.pool.begin().await?;
        let mut category = Self::lock_category(&mut tx, weight_category_id).await?;

        let before = category.items.len();
        category.items.retain(|item| item.item_id != weight_item_id);
        if category.items.len() == before {
            return Err(StorageError::NotFound);
        }

        Self::store_items(&mut tx, &category).await?;
        tx.commit().await?;

        Ok(category)
    }
}
