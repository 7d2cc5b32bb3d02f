//! Pantry item lifecycle, scoped by household membership.

use chrono::NaiveDate;
use tracing::instrument;

use larder_core::{ExpirySummary, HouseholdId, ItemQuery, PantryItemId};

use super::guard::AccessGuard;
use crate::db::Datastore;
use crate::error::AppError;
use crate::models::{CurrentUser, ItemChanges, NewPantryItem, PantryItem};

pub struct PantryService<'a> {
    store: &'a dyn Datastore,
}

impl<'a> PantryService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Datastore) -> Self {
        Self { store }
    }

    const fn guard(&self) -> AccessGuard<'a> {
        AccessGuard::new(self.store)
    }

    /// Fetch an item the caller can see.
    ///
    /// A missing item is `NotFound`; an item in someone else's household is
    /// `Forbidden`.
    async fn visible_item(
        &self,
        id: PantryItemId,
        actor: &CurrentUser,
    ) -> Result<PantryItem, AppError> {
        let item = self
            .store
            .get_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound("item not found".to_string()))?;
        self.guard()
            .require_member(actor.id, item.household_id)
            .await?;
        Ok(item)
    }

    /// # Errors
    ///
    /// `Forbidden` unless the caller is a member of `household_id`.
    #[instrument(skip(self, new, actor), fields(actor_id = %actor.id))]
    pub async fn create(
        &self,
        household_id: HouseholdId,
        new: &NewPantryItem,
        actor: &CurrentUser,
    ) -> Result<PantryItem, AppError> {
        self.guard().require_member(actor.id, household_id).await?;
        let item = self.store.create_item(household_id, actor.id, new).await?;

        tracing::info!(item_id = %item.id, "Pantry item created");
        Ok(item)
    }

    pub async fn get(&self, id: PantryItemId, actor: &CurrentUser) -> Result<PantryItem, AppError> {
        self.visible_item(id, actor).await
    }

    /// Items of a household filtered and sorted by `query`.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the caller is a member.
    pub async fn list(
        &self,
        household_id: HouseholdId,
        query: &ItemQuery,
        today: NaiveDate,
        actor: &CurrentUser,
    ) -> Result<Vec<PantryItem>, AppError> {
        self.guard().require_member(actor.id, household_id).await?;
        let items = self.store.list_items(household_id).await?;
        Ok(query.apply(items, today))
    }

    /// Expiry bucket counts for a household.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the caller is a member.
    pub async fn summary(
        &self,
        household_id: HouseholdId,
        today: NaiveDate,
        actor: &CurrentUser,
    ) -> Result<ExpirySummary, AppError> {
        self.guard().require_member(actor.id, household_id).await?;
        let items = self.store.list_items(household_id).await?;
        Ok(ExpirySummary::tally(items.iter().map(|i| i.expiry), today))
    }

    /// Apply `changes` to an item. Any member may edit any item.
    ///
    /// # Errors
    ///
    /// `NotFound` if the item is gone (including deleted mid-update),
    /// `Forbidden` for non-members.
    #[instrument(skip(self, changes, actor), fields(actor_id = %actor.id))]
    pub async fn update(
        &self,
        id: PantryItemId,
        changes: ItemChanges,
        actor: &CurrentUser,
    ) -> Result<PantryItem, AppError> {
        let mut item = self.visible_item(id, actor).await?;
        changes.apply_to(&mut item);

        let updated = self
            .store
            .update_item(&item)
            .await?
            .ok_or_else(|| AppError::NotFound("item not found".to_string()))?;

        tracing::info!("Pantry item updated");
        Ok(updated)
    }

    /// Set completion to zero.
    pub async fn mark_used(
        &self,
        id: PantryItemId,
        actor: &CurrentUser,
    ) -> Result<PantryItem, AppError> {
        self.update(id, ItemChanges::mark_used(), actor).await
    }

    /// Delete an item. Its shopping-list entry goes with it.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Forbidden`.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete(&self, id: PantryItemId, actor: &CurrentUser) -> Result<(), AppError> {
        self.visible_item(id, actor).await?;
        if !self.store.delete_item(id).await? {
            return Err(AppError::NotFound("item not found".to_string()));
        }

        tracing::info!("Pantry item deleted");
        Ok(())
    }

    /// Copy an item as a fresh, unopened one in the same household.
    ///
    /// The copy gets a new id and `created_at`, keeps `scanned_at`, and is
    /// attributed to the caller.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn duplicate(
        &self,
        id: PantryItemId,
        actor: &CurrentUser,
    ) -> Result<PantryItem, AppError> {
        let source = self.visible_item(id, actor).await?;
        let copy = self
            .store
            .create_item(source.household_id, actor.id, &NewPantryItem::copy_of(&source))
            .await?;

        tracing::info!(copy_id = %copy.id, "Pantry item duplicated");
        Ok(copy)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use larder_core::{ExpiryFilter, ExpiryStatus, HouseholdRole, SortKey, UserId};

    use super::*;
    use crate::db::{HouseholdRepository, MemoryStore, ShoppingListRepository};

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::generate(),
            email: None,
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    async fn setup() -> (MemoryStore, CurrentUser, HouseholdId) {
        let store = MemoryStore::new();
        let owner = user();
        let (household, _) = store
            .create_household_with_owner("Smiths", owner.id)
            .await
            .unwrap();
        (store, owner, household.id)
    }

    fn milk() -> NewPantryItem {
        NewPantryItem {
            expiry: Some(date("2024-01-01")),
            location: Some("Fridge".to_string()),
            ..NewPantryItem::named("Milk")
        }
    }

    #[tokio::test]
    async fn test_create_requires_membership() {
        let (store, owner, household) = setup().await;
        let service = PantryService::new(&store);

        let item = service.create(household, &milk(), &owner).await.unwrap();
        assert_eq!(item.quantity, 1);
        assert_eq!(item.completion, Some(100));
        assert_eq!(item.created_by, owner.id);

        let err = service.create(household, &milk(), &user()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_non_member_update_leaves_item_unchanged() {
        let (store, owner, household) = setup().await;
        let service = PantryService::new(&store);
        let item = service.create(household, &milk(), &owner).await.unwrap();

        let changes = ItemChanges {
            name: Some("Oat milk".to_string()),
            ..ItemChanges::default()
        };
        let err = service.update(item.id, changes, &user()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let stored = service.get(item.id, &owner).await.unwrap();
        assert_eq!(stored, item);
    }

    #[tokio::test]
    async fn test_any_member_can_edit() {
        let (store, owner, household) = setup().await;
        let member = user();
        store
            .add_member(household, member.id, HouseholdRole::Member)
            .await
            .unwrap();
        let service = PantryService::new(&store);
        let item = service.create(household, &milk(), &owner).await.unwrap();

        let changes = ItemChanges {
            quantity: Some(3),
            brand: Some(None),
            ..ItemChanges::default()
        };
        let updated = service.update(item.id, changes, &member).await.unwrap();
        assert_eq!(updated.quantity, 3);
        assert_eq!(updated.name, "Milk");
    }

    #[tokio::test]
    async fn test_missing_item_is_not_found() {
        let (store, owner, _) = setup().await;
        let err = PantryService::new(&store)
            .mark_used(PantryItemId::generate(), &owner)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_mark_used_then_hidden() {
        let (store, owner, household) = setup().await;
        let service = PantryService::new(&store);
        let item = service.create(household, &milk(), &owner).await.unwrap();
        service
            .create(household, &NewPantryItem::named("Bread"), &owner)
            .await
            .unwrap();

        let used = service.mark_used(item.id, &owner).await.unwrap();
        assert_eq!(used.completion, Some(0));

        let query = ItemQuery {
            hide_used: true,
            ..ItemQuery::default()
        };
        let items = service
            .list(household, &query, Utc::now().date_naive(), &owner)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Bread");
    }

    #[tokio::test]
    async fn test_duplicate_resets_completion() {
        let (store, owner, household) = setup().await;
        let member = user();
        store
            .add_member(household, member.id, HouseholdRole::Member)
            .await
            .unwrap();
        let service = PantryService::new(&store);
        let item = service
            .create(
                household,
                &NewPantryItem {
                    completion: Some(40),
                    scanned_at: Some(Utc::now()),
                    ..milk()
                },
                &owner,
            )
            .await
            .unwrap();

        let copy = service.duplicate(item.id, &member).await.unwrap();
        assert_ne!(copy.id, item.id);
        assert_eq!(copy.completion, Some(100));
        assert_eq!(copy.scanned_at, item.scanned_at);
        assert_eq!(copy.name, item.name);
        assert_eq!(copy.created_by, member.id);
    }

    #[tokio::test]
    async fn test_delete_cascades_shopping_entry() {
        let (store, owner, household) = setup().await;
        let service = PantryService::new(&store);
        let item = service.create(household, &milk(), &owner).await.unwrap();
        let entry = store.add_entry(item.id, owner.id).await.unwrap();

        service.delete(item.id, &owner).await.unwrap();
        assert!(store.get_entry(entry.id).await.unwrap().is_none());
        assert!(matches!(
            service.get(item.id, &owner).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_milk_expiry_scenario() {
        let (store, owner, household) = setup().await;
        let service = PantryService::new(&store);
        let item = service.create(household, &milk(), &owner).await.unwrap();

        assert_eq!(
            ExpiryStatus::classify(item.expiry, date("2024-01-03")),
            ExpiryStatus::Expired
        );
        assert_eq!(
            ExpiryStatus::classify(item.expiry, date("2023-12-30")),
            ExpiryStatus::ExpiringThreeDays
        );

        let week = ItemQuery {
            expiry: Some(ExpiryFilter::Week),
            sort: SortKey::Expiry,
            ..ItemQuery::default()
        };
        let items = service
            .list(household, &week, date("2023-12-30"), &owner)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);

        let summary = service
            .summary(household, date("2023-12-30"), &owner)
            .await
            .unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.expiring_3_days, 1);
        assert_eq!(summary.expiring_week, 1);
    }
}
