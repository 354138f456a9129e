use chrono::{DateTime, Utc};
use tracing::{debug, info};
use validator::Validate;

use crate::dto::account::AccountContext;
use crate::dto::catalog::ResolvedWeight;
use crate::dto::record::RecordWriteRequest;
use crate::error::{Result, StorageError};
use crate::models::{DependentRecord, DisciplineName, Reference, Selection};
use crate::repository::{CatalogStore, RecordStore, new_id};
use crate::services::classification::resolve_selection;

/// Copies a resolved weight choice into the record, replacing every
/// snapshot field at once.
pub fn on_record_write(record: &mut DependentRecord, resolved: &ResolvedWeight) {
    record.division_id = Some(resolved.division_id.clone());
    record.weight_category_id = Some(resolved.weight_category_id.clone());
    record.weight_item_id = Some(resolved.weight_item_id.clone());
    record.weight_label = Some(resolved.label.clone());
    record.weight_unit = Some(resolved.unit);
}

pub fn clear_snapshot(record: &mut DependentRecord) {
    record.weight_category_id = None;
    record.weight_item_id = None;
    record.weight_label = None;
    record.weight_unit = None;
}

/// Weight text shown for a record. Reads only the stored snapshot, never the
/// live catalog.
///
/// A bare value without unit is only possible when the record has no
/// division, or its division has no weight category.
pub fn display_weight(record: &DependentRecord) -> String {
    if let Some(label) = record.weight_label.as_deref() {
        return label.to_string();
    }
    match (record.weight_value, record.weight_unit) {
        (Some(value), Some(unit)) => format!("{}{}", value.normalize(), unit.as_str()),
        (Some(value), None) => value.normalize().to_string(),
        _ => "—".to_string(),
    }
}

/// Creates or updates a dependent record.
///
/// The selection is re-resolved against the catalog only when the
/// discipline, division or weight item changed; otherwise the stored snapshot
/// is kept as is, even if the catalog entry was renamed or removed since.
/// Every lookup happens before the single write, so a failed resolution
/// leaves the stored record untouched. Updates are checked against the
/// version that was read; a concurrent edit in between fails with
/// `ConcurrentModification` instead of being overwritten.
pub async fn write_record<R, C>(
    records: &R,
    catalog: &C,
    ctx: &AccountContext,
    req: RecordWriteRequest,
    now: DateTime<Utc>,
) -> Result<DependentRecord>
where
    R: RecordStore + ?Sized,
    C: CatalogStore + ?Sized,
{
    req.validate()?;

    let discipline = DisciplineName::new(&req.discipline_name);
    if discipline.is_empty() {
        return Err(StorageError::validation("Discipline name is required"));
    }

    let existing = match req.record_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => {
            let record = records.find(id).await?;
            if record.owner_id != ctx.owner_id {
                return Err(StorageError::NotFound);
            }
            Some(record)
        }
        _ => None,
    };

    let division_id = req.division_id().map(String::from);
    let weight_item_id = req.weight_item_id().map(String::from);

    let unchanged = existing.as_ref().is_some_and(|record| {
        DisciplineName::new(&record.discipline_name) == discipline
            && record.division_id == division_id
            && record.weight_item_id == weight_item_id
    });

    let expected_version = existing.as_ref().map(|record| record.version);

    let mut record = match existing {
        Some(record) => record,
        None => DependentRecord {
            record_id: new_id(),
            owner_id: ctx.owner_id.clone(),
            family_member: ctx
                .family_member_id()
                .map(|id| Reference::Unresolved(id.to_string())),
            kind: req.kind,
            discipline_name: discipline.as_str().to_string(),
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
        },
    };

    if unchanged {
        debug!(record_id = %record.record_id, "Selection unchanged, keeping snapshot");
    } else {
        let resolved = resolve_selection(
            catalog,
            &Selection {
                discipline_name: discipline.as_str().to_string(),
                division_id: division_id.clone(),
                weight_item_id,
            },
        )
        .await?;

        record.discipline_name = resolved.discipline.name.clone();
        match (resolved.division, resolved.weight) {
            (_, Some(weight)) => on_record_write(&mut record, &weight),
            (Some(division), None) => {
                clear_snapshot(&mut record);
                // Keep the category unit so a typed weight still displays with it
                if let Some(category_id) = division.weight_category_id.as_deref() {
                    let category = catalog.get_weight_category(category_id).await?;
                    record.weight_unit = Some(category.unit);
                }
                record.division_id = Some(division.division_id);
            }
            (None, None) => {
                record.division_id = None;
                clear_snapshot(&mut record);
            }
        }
    }

    record.kind = req.kind;
    record.title = req
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    record.weight_value = req.weight_value;
    record.updated_at = now;

    let record = match expected_version {
        Some(version) => records.update(&record, version).await?,
        None => records.insert(&record).await?,
    };

    info!(
        record_id = %record.record_id,
        kind = record.kind.as_str(),
        weight = %display_weight(&record),
        "Record saved"
    );
    Ok(record)
}
