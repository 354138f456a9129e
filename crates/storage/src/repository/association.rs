use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use super::AssociationStore;
use crate::error::{Result, StorageError};
use crate::models::{AthleteDisciplineAssociation, Promotion, Reference, canonical_id};

#[derive(FromRow)]
struct AssociationRow {
    association_id: String,
    owner_id: String,
    family_member_id: Option<String>,
    discipline_name: String,
    promotions: Json<Vec<Promotion>>,
    start_date: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
}

impl From<AssociationRow> for AthleteDisciplineAssociation {
    fn from(row: AssociationRow) -> Self {
        AthleteDisciplineAssociation::new(
            row.association_id,
            row.owner_id,
            row.family_member_id.map(Reference::Unresolved),
            row.discipline_name,
            row.start_date,
            row.created_at,
        )
        .with_promotions(row.promotions.0)
        .with_version(row.version)
    }
}

/// Repository for athlete-discipline associations and their promotion ledgers
pub struct AssociationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AssociationRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, association_id: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM athlete_disciplines WHERE association_id = $1)",
        )
        .bind(association_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}

#[async_trait]
impl<'a> AssociationStore for AssociationRepository<'a> {
    async fn insert(&self, association: &AthleteDisciplineAssociation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO athlete_disciplines (
                association_id, owner_id, family_member_id, discipline_name,
                promotions, current_rank, start_date, version, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&association.association_id)
        .bind(&association.owner_id)
        .bind(canonical_id(association.family_member.as_ref()))
        .bind(&association.discipline_name)
        .bind(Json(association.promotions()))
        .bind(association.current_rank())
        .bind(association.start_date)
        .bind(association.version())
        .bind(association.created_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            let error = StorageError::from(e);
            if error.is_unique_violation() {
                return StorageError::ConstraintViolation(format!(
                    "Athlete already has discipline '{}'",
                    association.discipline_name
                ));
            }
            error
        })?;

        Ok(())
    }

    async fn find(&self, association_id: &str) -> Result<AthleteDisciplineAssociation> {
        let row = sqlx::query_as::<_, AssociationRow>(
            r#"
            SELECT association_id, owner_id, family_member_id, discipline_name,
                   promotions, start_date, version, created_at
            FROM athlete_disciplines
            WHERE association_id = $1
            "#,
        )
        .bind(association_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(row.into())
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<AthleteDisciplineAssociation>> {
        let rows = sqlx::query_as::<_, AssociationRow>(
            r#"
            SELECT association_id, owner_id, family_member_id, discipline_name,
                   promotions, start_date, version, created_at
            FROM athlete_disciplines
            WHERE owner_id = $1
            ORDER BY created_at, association_id
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_promotions(
        &self,
        association: &AthleteDisciplineAssociation,
        expected_version: i64,
    ) -> Result<AthleteDisciplineAssociation> {
        // Single guarded statement: the version check and the write cannot interleave
        let row = sqlx::query_as::<_, AssociationRow>(
            r#"
            UPDATE athlete_disciplines
            SET promotions = $3,
                current_rank = $4,
                version = version + 1
            WHERE association_id = $1 AND version = $2
            RETURNING association_id, owner_id, family_member_id, discipline_name,
                      promotions, start_date, version, created_at
            "#,
        )
        .bind(&association.association_id)
        .bind(expected_version)
        .bind(Json(association.promotions()))
        .bind(association.current_rank())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None if self.exists(&association.association_id).await? => {
                Err(StorageError::ConcurrentModification)
            }
            None => Err(StorageError::NotFound),
        }
    }

    async fn delete(&self, association_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM athlete_disciplines WHERE association_id = $1")
            .bind(association_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }
}
