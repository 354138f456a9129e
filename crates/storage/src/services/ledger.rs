use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::dto::account::AccountContext;
use crate::dto::common::parse_instant;
use crate::dto::promotion::AddPromotionRequest;
use crate::error::{Result, StorageError};
use crate::models::{
    AthleteDisciplineAssociation, DisciplineName, Promotion, PromotionSelector, Reference,
};
use crate::repository::{AssociationStore, new_id};
use crate::services::ownership::{AthleteView, filter_for};

/// Optimistic writes retried this many times before giving up
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Binds an athlete (primary or family member) to a discipline.
pub async fn add_discipline<S>(
    store: &S,
    ctx: &AccountContext,
    discipline_name: &str,
    start_date: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AthleteDisciplineAssociation>
where
    S: AssociationStore + ?Sized,
{
    let name = DisciplineName::new(discipline_name);
    if name.is_empty() {
        return Err(StorageError::validation("Discipline name is required"));
    }
    let start_date = start_date
        .map(|raw| parse_instant("start_date", raw))
        .transpose()?;

    let association = AthleteDisciplineAssociation::new(
        new_id(),
        ctx.owner_id.clone(),
        ctx.family_member_id()
            .map(|id| Reference::Unresolved(id.to_string())),
        name.as_str().to_string(),
        start_date,
        now,
    );
    store.insert(&association).await?;

    info!(
        association_id = %association.association_id,
        discipline = %name,
        "Discipline added"
    );
    Ok(association)
}

pub async fn get_association<S>(store: &S, association_id: &str) -> Result<AthleteDisciplineAssociation>
where
    S: AssociationStore + ?Sized,
{
    store.find(association_id).await
}

/// Associations belonging to the athlete selected by `view`
pub async fn list_associations<S>(
    store: &S,
    view: &AthleteView,
) -> Result<Vec<AthleteDisciplineAssociation>>
where
    S: AssociationStore + ?Sized,
{
    let owned = store.list_for_owner(view.account_id()).await?;
    Ok(filter_for(view, &owned).into_iter().cloned().collect())
}

pub async fn remove_discipline<S>(store: &S, association_id: &str) -> Result<()>
where
    S: AssociationStore + ?Sized,
{
    store.delete(association_id).await?;
    info!(association_id, "Discipline removed");
    Ok(())
}

/// Promotion history ordered by date; entries on the same instant keep append order.
pub async fn promotion_history<S>(store: &S, association_id: &str) -> Result<Vec<Promotion>>
where
    S: AssociationStore + ?Sized,
{
    Ok(store.find(association_id).await?.history())
}

/// Appends a promotion and recomputes the current rank.
///
/// The request is validated before anything is read, so a rejected request
/// never touches the stored history.
pub async fn add_promotion<S>(
    store: &S,
    association_id: &str,
    req: AddPromotionRequest,
) -> Result<AthleteDisciplineAssociation>
where
    S: AssociationStore + ?Sized,
{
    let promotion = req.into_promotion(new_id())?;

    let saved = update_ledger(store, association_id, |association| {
        association.push_promotion(promotion.clone());
        Ok(())
    })
    .await?;

    info!(
        association_id,
        rank = %promotion.rank,
        current_rank = ?saved.current_rank(),
        "Promotion added"
    );
    Ok(saved)
}

/// Removes exactly one promotion and recomputes the current rank.
///
/// Fails with `NotFound` when nothing matches and with `AmbiguousSelector`
/// when a `(rank, promoted_on)` selector matches several entries.
pub async fn delete_promotion<S>(
    store: &S,
    association_id: &str,
    selector: &PromotionSelector,
) -> Result<AthleteDisciplineAssociation>
where
    S: AssociationStore + ?Sized,
{
    let saved = update_ledger(store, association_id, |association| {
        association.remove_promotion(selector).map(|_| ())
    })
    .await?;

    info!(
        association_id,
        selector = ?selector,
        current_rank = ?saved.current_rank(),
        "Promotion deleted"
    );
    Ok(saved)
}

/// Read-modify-write of one ledger, guarded by the association version.
async fn update_ledger<S, F>(
    store: &S,
    association_id: &str,
    mut apply: F,
) -> Result<AthleteDisciplineAssociation>
where
    S: AssociationStore + ?Sized,
    F: FnMut(&mut AthleteDisciplineAssociation) -> Result<()>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let mut association = store.find(association_id).await?;
        let expected_version = association.version();
        apply(&mut association)?;

        match store.save_promotions(&association, expected_version).await {
            Err(StorageError::ConcurrentModification) if attempt < MAX_WRITE_ATTEMPTS => {
                warn!(
                    association_id,
                    attempt, "Ledger changed concurrently, retrying"
                );
            }
            result => return result,
        }
    }

    Err(StorageError::ConcurrentModification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn setup() -> (InMemoryStore, AthleteDisciplineAssociation) {
        let store = InMemoryStore::new();
        let association = add_discipline(
            &store,
            &AccountContext::primary("acct"),
            "Brazilian Jiu-Jitsu",
            Some("2019-09-01"),
            Utc::now(),
        )
        .await
        .unwrap();
        (store, association)
    }

    #[tokio::test]
    async fn test_blue_then_purple_then_delete_purple() {
        let (store, association) = setup().await;
        let id = association.association_id.as_str();

        add_promotion(&store, id, AddPromotionRequest::new("Blue", "2022-01-01"))
            .await
            .unwrap();
        let after_purple =
            add_promotion(&store, id, AddPromotionRequest::new("Purple", "2023-06-01"))
                .await
                .unwrap();
        assert_eq!(after_purple.current_rank(), Some("Purple"));

        let purple_id = after_purple
            .promotions()
            .iter()
            .find(|p| p.rank == "Purple")
            .and_then(|p| p.promotion_id.clone())
            .unwrap();

        let after_delete =
            delete_promotion(&store, id, &PromotionSelector::ById { id: purple_id })
                .await
                .unwrap();
        assert_eq!(after_delete.current_rank(), Some("Blue"));
        assert_eq!(after_delete.version(), 3);
    }

    #[tokio::test]
    async fn test_backdated_promotion_does_not_become_current() {
        let (store, association) = setup().await;
        let id = association.association_id.as_str();

        add_promotion(&store, id, AddPromotionRequest::new("Purple", "2023-06-01"))
            .await
            .unwrap();
        let saved = add_promotion(&store, id, AddPromotionRequest::new("White", "2018-01-01"))
            .await
            .unwrap();

        assert_eq!(saved.current_rank(), Some("Purple"));
        let history: Vec<String> = promotion_history(&store, id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.rank)
            .collect();
        assert_eq!(history, vec!["White", "Purple"]);
    }

    #[tokio::test]
    async fn test_invalid_requests_leave_ledger_untouched() {
        let (store, association) = setup().await;
        let id = association.association_id.as_str();
        add_promotion(&store, id, AddPromotionRequest::new("Blue", "2022-01-01"))
            .await
            .unwrap();

        for req in [
            AddPromotionRequest::new("", "2023-01-01"),
            AddPromotionRequest::new("Purple", "someday"),
        ] {
            assert!(matches!(
                add_promotion(&store, id, req).await,
                Err(StorageError::Validation(_))
            ));
        }

        let stored = get_association(&store, id).await.unwrap();
        assert_eq!(stored.current_rank(), Some("Blue"));
        assert_eq!(stored.promotions().len(), 1);
        assert_eq!(stored.version(), 1);
    }

    #[tokio::test]
    async fn test_natural_key_delete_not_found_and_ambiguous() {
        let (store, association) = setup().await;
        let id = association.association_id.as_str();
        for _ in 0..2 {
            add_promotion(&store, id, AddPromotionRequest::new("Blue", "2022-01-01"))
                .await
                .unwrap();
        }
        let day = parse_instant("promoted_on", "2022-01-01").unwrap();

        let missing = PromotionSelector::ByNaturalKey {
            rank: "Brown".into(),
            promoted_on: day,
        };
        assert!(matches!(
            delete_promotion(&store, id, &missing).await,
            Err(StorageError::NotFound)
        ));

        let ambiguous = PromotionSelector::ByNaturalKey {
            rank: "Blue".into(),
            promoted_on: day,
        };
        assert!(matches!(
            delete_promotion(&store, id, &ambiguous).await,
            Err(StorageError::AmbiguousSelector { matches: 2, .. })
        ));
        assert_eq!(
            get_association(&store, id).await.unwrap().promotions().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_deleting_last_promotion_unsets_rank() {
        let (store, association) = setup().await;
        let id = association.association_id.as_str();
        add_promotion(&store, id, AddPromotionRequest::new("Blue", "2022-01-01"))
            .await
            .unwrap();

        let selector = PromotionSelector::ByNaturalKey {
            rank: "Blue".into(),
            promoted_on: parse_instant("promoted_on", "2022-01-01").unwrap(),
        };
        let saved = delete_promotion(&store, id, &selector).await.unwrap();
        assert_eq!(saved.current_rank(), None);
    }

    #[tokio::test]
    async fn test_unknown_association_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            add_promotion(&store, "missing", AddPromotionRequest::new("Blue", "2022-01-01"))
                .await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_family_member_associations_are_listed_separately() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        add_discipline(&store, &AccountContext::primary("acct"), "Judo", None, now)
            .await
            .unwrap();
        add_discipline(&store, &AccountContext::family_member("acct", "kid"), "Judo", None, now)
            .await
            .unwrap();

        let primary = list_associations(
            &store,
            &AthleteView::Primary {
                account_id: "acct".into(),
            },
        )
        .await
        .unwrap();
        let kid = list_associations(
            &store,
            &AthleteView::FamilyMember {
                account_id: "acct".into(),
                family_member_id: "kid".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(primary.len(), 1);
        assert_eq!(kid.len(), 1);
        assert_ne!(primary[0].association_id, kid[0].association_id);

        // Same athlete, same discipline
        assert!(matches!(
            add_discipline(&store, &AccountContext::primary("acct"), "JUDO", None, now).await,
            Err(StorageError::ConstraintViolation(_))
        ));
    }

    /// Store whose first `conflicts` writes lose a race against another writer
    struct RacingStore {
        inner: InMemoryStore,
        conflicts: AtomicUsize,
    }

    #[async_trait]
    impl AssociationStore for RacingStore {
        async fn insert(&self, association: &AthleteDisciplineAssociation) -> Result<()> {
            self.inner.insert(association).await
        }

        async fn find(&self, association_id: &str) -> Result<AthleteDisciplineAssociation> {
            self.inner.find(association_id).await
        }

        async fn list_for_owner(
            &self,
            owner_id: &str,
        ) -> Result<Vec<AthleteDisciplineAssociation>> {
            self.inner.list_for_owner(owner_id).await
        }

        async fn save_promotions(
            &self,
            association: &AthleteDisciplineAssociation,
            expected_version: i64,
        ) -> Result<AthleteDisciplineAssociation> {
            if self.conflicts.load(Ordering::SeqCst) > 0 {
                self.conflicts.fetch_sub(1, Ordering::SeqCst);
                // Another writer slips in a promotion first
                let mut current = self.inner.find(&association.association_id).await?;
                let version = current.version();
                current.push_promotion(Promotion {
                    promotion_id: Some(new_id()),
                    rank: "Concurrent".into(),
                    promoted_on: parse_instant("promoted_on", "2000-01-01")?,
                    awarded_by: None,
                    note: None,
                    proof_url: None,
                });
                self.inner.save_promotions(&current, version).await?;
            }
            self.inner.save_promotions(association, expected_version).await
        }

        async fn delete(&self, association_id: &str) -> Result<()> {
            self.inner.delete(association_id).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_write_is_retried_without_losing_updates() {
        let (inner, association) = setup().await;
        let store = RacingStore {
            inner,
            conflicts: AtomicUsize::new(1),
        };
        let id = association.association_id.as_str();

        let saved = add_promotion(&store, id, AddPromotionRequest::new("Blue", "2022-01-01"))
            .await
            .unwrap();

        let ranks: Vec<&str> = saved.promotions().iter().map(|p| p.rank.as_str()).collect();
        assert_eq!(ranks, vec!["Concurrent", "Blue"]);
        assert_eq!(saved.current_rank(), Some("Blue"));
    }

    #[tokio::test]
    async fn test_persistent_conflicts_surface_as_concurrent_modification() {
        let (inner, association) = setup().await;
        let store = RacingStore {
            inner,
            conflicts: AtomicUsize::new(MAX_WRITE_ATTEMPTS),
        };

        let result = add_promotion(
            &store,
            &association.association_id,
            AddPromotionRequest::new("Blue", "2022-01-01"),
        )
        .await;

        assert!(matches!(result, Err(StorageError::ConcurrentModification)));
    }
}
