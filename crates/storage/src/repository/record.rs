use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use super::RecordStore;
use crate::error::{Result, StorageError};
use crate::models::{
    DependentRecord, RecordKind, Reference, WeightUnit, WeightUnitParseError, canonical_id,
};

#[derive(FromRow)]
struct RecordRow {
    record_id: String,
    owner_id: String,
    family_member_id: Option<String>,
    kind: String,
    discipline_name: String,
    title: Option<String>,
    division_id: Option<String>,
    weight_category_id: Option<String>,
    weight_item_id: Option<String>,
    weight_label: Option<String>,
    weight_unit: Option<String>,
    weight_value: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<RecordRow> for DependentRecord {
    type Error = StorageError;

    fn try_from(row: RecordRow) -> Result<Self> {
        let weight_unit = row
            .weight_unit
            .map(|unit| unit.parse::<WeightUnit>())
            .transpose()
            .map_err(|e: WeightUnitParseError| {
                StorageError::Validation(e.to_string())
            })?;

        Ok(DependentRecord {
            record_id: row.record_id,
            owner_id: row.owner_id,
            family_member: row.family_member_id.map(Reference::Unresolved),
            kind: row
                .kind
                .parse::<RecordKind>()
                .map_err(StorageError::Validation)?,
            discipline_name: row.discipline_name,
            title: row.title,
            division_id: row.division_id,
            weight_category_id: row.weight_category_id,
            weight_item_id: row.weight_item_id,
            weight_label: row.weight_label,
            weight_unit,
            weight_value: row.weight_value,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

const RECORD_COLUMNS: &str = "record_id, owner_id, family_member_id, kind, discipline_name, title, \
     division_id, weight_category_id, weight_item_id, weight_label, weight_unit, weight_value, \
     created_at, updated_at, version";

/// Repository for match and scouting reports
pub struct RecordRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RecordRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, record_id: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM dependent_records WHERE record_id = $1)",
        )
        .bind(record_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}

#[async_trait]
impl<'a> RecordStore for RecordRepository<'a> {
    async fn find(&self, record_id: &str) -> Result<DependentRecord> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM dependent_records WHERE record_id = $1"
        ))
        .bind(record_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        row.try_into()
    }

    async fn insert(&self, record: &DependentRecord) -> Result<DependentRecord> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            r#"
            INSERT INTO dependent_records (
                record_id, owner_id, family_member_id, kind, discipline_name, title,
                division_id, weight_category_id, weight_item_id, weight_label, weight_unit,
                weight_value, created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(&record.record_id)
        .bind(&record.owner_id)
        .bind(canonical_id(record.family_member.as_ref()))
        .bind(record.kind.as_str())
        .bind(&record.discipline_name)
        .bind(&record.title)
        .bind(&record.division_id)
        .bind(&record.weight_category_id)
        .bind(&record.weight_item_id)
        .bind(&record.weight_label)
        .bind(record.weight_unit.map(|unit| unit.as_str()))
        .bind(record.weight_value)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.version)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            let error = StorageError::from(e);
            if error.is_unique_violation() {
                return StorageError::ConstraintViolation("Record id already exists".to_string());
            }
            error
        })?;

        row.try_into()
    }

    async fn update(
        &self,
        record: &DependentRecord,
        expected_version: i64,
    ) -> Result<DependentRecord> {
        // Version check and write happen in one statement
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            r#"
            UPDATE dependent_records
            SET kind = $3,
                discipline_name = $4,
                title = $5,
                division_id = $6,
                weight_category_id = $7,
                weight_item_id = $8,
                weight_label = $9,
                weight_unit = $10,
                weight_value = $11,
                updated_at = $12,
                version = version + 1
            WHERE record_id = $1 AND version = $2
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(&record.record_id)
        .bind(expected_version)
        .bind(record.kind.as_str())
        .bind(&record.discipline_name)
        .bind(&record.title)
        .bind(&record.division_id)
        .bind(&record.weight_category_id)
        .bind(&record.weight_item_id)
        .bind(&record.weight_label)
        .bind(record.weight_unit.map(|unit| unit.as_str()))
        .bind(record.weight_value)
        .bind(record.updated_at)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None if self.exists(&record.record_id).await? => {
                Err(StorageError::ConcurrentModification)
            }
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<DependentRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM dependent_records WHERE owner_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(DependentRecord::try_from).collect()
    }
}
