//! Datastore doubles for unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use larder_core::{
    Email, HouseholdId, HouseholdRole, InvitationId, InvitationStatus, PantryItemId,
    ShoppingListEntryId, UserId,
};

use super::{
    Datastore, HouseholdRepository, InvitationRepository, MemoryStore, PantryItemRepository,
    RepositoryError, ShoppingListRepository, UserDirectory,
};
use crate::models::{
    Household, HouseholdMember, Invitation, NewInvitation, NewPantryItem, PantryItem,
    ShoppingListEntry, ShoppingListItem, UserProfile,
};

/// A datastore whose every call fails.
pub(crate) struct BrokenStore;

fn broken() -> RepositoryError {
    RepositoryError::DataCorruption("connection reset".to_string())
}

#[async_trait]
impl HouseholdRepository for BrokenStore {
    async fn create_household_with_owner(
        &self,
        _: &str,
        _: UserId,
    ) -> Result<(Household, HouseholdMember), RepositoryError> {
        Err(broken())
    }
    async fn get_household(&self, _: HouseholdId) -> Result<Option<Household>, RepositoryError> {
        Err(broken())
    }
    async fn households_for_user(&self, _: UserId) -> Result<Vec<Household>, RepositoryError> {
        Err(broken())
    }
    async fn get_membership(
        &self,
        _: HouseholdId,
        _: UserId,
    ) -> Result<Option<HouseholdMember>, RepositoryError> {
        Err(broken())
    }
    async fn list_members(&self, _: HouseholdId) -> Result<Vec<HouseholdMember>, RepositoryError> {
        Err(broken())
    }
    async fn add_member(
        &self,
        _: HouseholdId,
        _: UserId,
        _: HouseholdRole,
    ) -> Result<HouseholdMember, RepositoryError> {
        Err(broken())
    }
    async fn remove_member(&self, _: HouseholdId, _: UserId) -> Result<bool, RepositoryError> {
        Err(broken())
    }
}

#[async_trait]
impl UserDirectory for BrokenStore {
    async fn find_user_by_email(&self, _: &Email) -> Result<Option<UserProfile>, RepositoryError> {
        Err(broken())
    }
}

#[async_trait]
impl InvitationRepository for BrokenStore {
    async fn create_invitation(&self, _: &NewInvitation) -> Result<Invitation, RepositoryError> {
        Err(broken())
    }
    async fn get_invitation(&self, _: InvitationId) -> Result<Option<Invitation>, RepositoryError> {
        Err(broken())
    }
    async fn find_pending_invitation(
        &self,
        _: HouseholdId,
        _: &Email,
    ) -> Result<Option<Invitation>, RepositoryError> {
        Err(broken())
    }
    async fn list_invitations(&self, _: HouseholdId) -> Result<Vec<Invitation>, RepositoryError> {
        Err(broken())
    }
    async fn refresh_invitation(
        &self,
        _: InvitationId,
        _: &NewInvitation,
    ) -> Result<Option<Invitation>, RepositoryError> {
        Err(broken())
    }
    async fn mark_invitation_email_sent(
        &self,
        _: InvitationId,
        _: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        Err(broken())
    }
    async fn transition_invitation(
        &self,
        _: InvitationId,
        _: InvitationStatus,
    ) -> Result<bool, RepositoryError> {
        Err(broken())
    }
    async fn delete_invitation(&self, _: InvitationId) -> Result<bool, RepositoryError> {
        Err(broken())
    }
    async fn delete_expired_invitations(&self, _: DateTime<Utc>) -> Result<u64, RepositoryError> {
        Err(broken())
    }
}

#[async_trait]
impl PantryItemRepository for BrokenStore {
    async fn create_item(
        &self,
        _: HouseholdId,
        _: UserId,
        _: &NewPantryItem,
    ) -> Result<PantryItem, RepositoryError> {
        Err(broken())
    }
    async fn get_item(&self, _: PantryItemId) -> Result<Option<PantryItem>, RepositoryError> {
        Err(broken())
    }
    async fn list_items(&self, _: HouseholdId) -> Result<Vec<PantryItem>, RepositoryError> {
        Err(broken())
    }
    async fn update_item(&self, _: &PantryItem) -> Result<Option<PantryItem>, RepositoryError> {
        Err(broken())
    }
    async fn delete_item(&self, _: PantryItemId) -> Result<bool, RepositoryError> {
        Err(broken())
    }
}

#[async_trait]
impl ShoppingListRepository for BrokenStore {
    async fn add_entry(
        &self,
        _: PantryItemId,
        _: UserId,
    ) -> Result<ShoppingListEntry, RepositoryError> {
        Err(broken())
    }
    async fn get_entry(
        &self,
        _: ShoppingListEntryId,
    ) -> Result<Option<ShoppingListEntry>, RepositoryError> {
        Err(broken())
    }
    async fn list_for_user(&self, _: UserId) -> Result<Vec<ShoppingListItem>, RepositoryError> {
        Err(broken())
    }
    async fn delete_entry(&self, _: ShoppingListEntryId) -> Result<bool, RepositoryError> {
        Err(broken())
    }
    async fn clear_for_user(&self, _: UserId) -> Result<u64, RepositoryError> {
        Err(broken())
    }
}

#[async_trait]
impl Datastore for BrokenStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Err(broken())
    }
}

/// Wraps a [`MemoryStore`] and decides `invitation` right before any member
/// insert, as a concurrent decline would.
pub(crate) struct DecidedDuringJoin {
    pub(crate) inner: MemoryStore,
    pub(crate) invitation: InvitationId,
    pub(crate) decision: InvitationStatus,
}

#[async_trait]
impl HouseholdRepository for DecidedDuringJoin {
    async fn create_household_with_owner(
        &self,
        name: &str,
        owner_id: UserId,
    ) -> Result<(Household, HouseholdMember), RepositoryError> {
        self.inner.create_household_with_owner(name, owner_id).await
    }
    async fn get_household(&self, id: HouseholdId) -> Result<Option<Household>, RepositoryError> {
        self.inner.get_household(id).await
    }
    async fn households_for_user(&self, id: UserId) -> Result<Vec<Household>, RepositoryError> {
        self.inner.households_for_user(id).await
    }
    async fn get_membership(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<Option<HouseholdMember>, RepositoryError> {
        self.inner.get_membership(household_id, user_id).await
    }
    async fn list_members(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<HouseholdMember>, RepositoryError> {
        self.inner.list_members(household_id).await
    }
    async fn add_member(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
        role: HouseholdRole,
    ) -> Result<HouseholdMember, RepositoryError> {
        self.inner
            .transition_invitation(self.invitation, self.decision)
            .await?;
        self.inner.add_member(household_id, user_id, role).await
    }
    async fn remove_member(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        self.inner.remove_member(household_id, user_id).await
    }
}

#[async_trait]
impl UserDirectory for DecidedDuringJoin {
    async fn find_user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserProfile>, RepositoryError> {
        self.inner.find_user_by_email(email).await
    }
}

#[async_trait]
impl InvitationRepository for DecidedDuringJoin {
    async fn create_invitation(&self, new: &NewInvitation) -> Result<Invitation, RepositoryError> {
        self.inner.create_invitation(new).await
    }
    async fn get_invitation(
        &self,
        id: InvitationId,
    ) -> Result<Option<Invitation>, RepositoryError> {
        self.inner.get_invitation(id).await
    }
    async fn find_pending_invitation(
        &self,
        household_id: HouseholdId,
        email: &Email,
    ) -> Result<Option<Invitation>, RepositoryError> {
        self.inner.find_pending_invitation(household_id, email).await
    }
    async fn list_invitations(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<Invitation>, RepositoryError> {
        self.inner.list_invitations(household_id).await
    }
    async fn refresh_invitation(
        &self,
        id: InvitationId,
        new: &NewInvitation,
    ) -> Result<Option<Invitation>, RepositoryError> {
        self.inner.refresh_invitation(id, new).await
    }
    async fn mark_invitation_email_sent(
        &self,
        id: InvitationId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.inner.mark_invitation_email_sent(id, at).await
    }
    async fn transition_invitation(
        &self,
        id: InvitationId,
        status: InvitationStatus,
    ) -> Result<bool, RepositoryError> {
        self.inner.transition_invitation(id, status).await
    }
    async fn delete_invitation(&self, id: InvitationId) -> Result<bool, RepositoryError> {
        self.inner.delete_invitation(id).await
    }
    async fn delete_expired_invitations(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        self.inner.delete_expired_invitations(now).await
    }
}

#[async_trait]
impl PantryItemRepository for DecidedDuringJoin {
    async fn create_item(
        &self,
        household_id: HouseholdId,
        created_by: UserId,
        item: &NewPantryItem,
    ) -> Result<PantryItem, RepositoryError> {
        self.inner.create_item(household_id, created_by, item).await
    }
    async fn get_item(&self, id: PantryItemId) -> Result<Option<PantryItem>, RepositoryError> {
        self.inner.get_item(id).await
    }
    async fn list_items(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<PantryItem>, RepositoryError> {
        self.inner.list_items(household_id).await
    }
    async fn update_item(&self, item: &PantryItem) -> Result<Option<PantryItem>, RepositoryError> {
        self.inner.update_item(item).await
    }
    async fn delete_item(&self, id: PantryItemId) -> Result<bool, RepositoryError> {
        self.inner.delete_item(id).await
    }
}

#[async_trait]
impl ShoppingListRepository for DecidedDuringJoin {
    async fn add_entry(
        &self,
        item_id: PantryItemId,
        added_by: UserId,
    ) -> Result<ShoppingListEntry, RepositoryError> {
        self.inner.add_entry(item_id, added_by).await
    }
    async fn get_entry(
        &self,
        id: ShoppingListEntryId,
    ) -> Result<Option<ShoppingListEntry>, RepositoryError> {
        self.inner.get_entry(id).await
    }
    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ShoppingListItem>, RepositoryError> {
        self.inner.list_for_user(user_id).await
    }
    async fn delete_entry(&self, id: ShoppingListEntryId) -> Result<bool, RepositoryError> {
        self.inner.delete_entry(id).await
    }
    async fn clear_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        self.inner.clear_for_user(user_id).await
    }
}

#[async_trait]
impl Datastore for DecidedDuringJoin {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.inner.ping().await
    }
}
