//! The shared shopping list: at most one entry per pantry item.

use tracing::instrument;

use larder_core::{PantryItemId, ShoppingListEntryId};

use super::guard::AccessGuard;
use crate::db::Datastore;
use crate::error::AppError;
use crate::models::{CurrentUser, ShoppingListEntry, ShoppingListItem};

pub struct ShoppingListService<'a> {
    store: &'a dyn Datastore,
}

impl<'a> ShoppingListService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Datastore) -> Self {
        Self { store }
    }

    const fn guard(&self) -> AccessGuard<'a> {
        AccessGuard::new(self.store)
    }

    /// Put an item on the list.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing item, `Forbidden` for non-members, `Conflict`
    /// ("already in list") if the item is already listed.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn add(
        &self,
        item_id: PantryItemId,
        actor: &CurrentUser,
    ) -> Result<ShoppingListEntry, AppError> {
        let item = self
            .store
            .get_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("item not found".to_string()))?;
        self.guard()
            .require_member(actor.id, item.household_id)
            .await?;

        let entry = self.store.add_entry(item_id, actor.id).await?;
        tracing::info!(entry_id = %entry.id, "Added to shopping list");
        Ok(entry)
    }

    /// Entries across every household the caller belongs to, newest first.
    pub async fn list(&self, actor: &CurrentUser) -> Result<Vec<ShoppingListItem>, AppError> {
        Ok(self.store.list_for_user(actor.id).await?)
    }

    /// Remove one entry. Returns `false` when there was nothing to remove.
    ///
    /// # Errors
    ///
    /// `Forbidden` if the entry belongs to another household.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn remove(
        &self,
        id: ShoppingListEntryId,
        actor: &CurrentUser,
    ) -> Result<bool, AppError> {
        let Some(entry) = self.store.get_entry(id).await? else {
            return Ok(false);
        };
        // The item may have been deleted since; its entry went with it.
        let Some(item) = self.store.get_item(entry.item_id).await? else {
            return Ok(false);
        };
        self.guard()
            .require_member(actor.id, item.household_id)
            .await?;

        let removed = self.store.delete_entry(id).await?;
        if removed {
            tracing::info!("Removed from shopping list");
        }
        Ok(removed)
    }

    /// Remove every entry in the caller's households in one statement.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn clear(&self, actor: &CurrentUser) -> Result<u64, AppError> {
        let removed = self.store.clear_for_user(actor.id).await?;
        tracing::info!(removed, "Shopping list cleared");
        Ok(removed)
    }
}
