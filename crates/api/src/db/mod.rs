//! Persistence for households, invitations, pantry items and the shopping list.
//!
//! # Tables
//!
//! - `profiles` - Accounts mirrored from the identity provider (read-only here)
//! - `households` - Sharing boundary, one owner
//! - `household_members` - Unique per (household, user)
//! - `invitations` - At most one `pending` row per (household, lower(email))
//! - `pantry_items` - Household-scoped items
//! - `shopping_list_entries` - Unique per item, cascades with the item
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p larder-cli -- migrate
//! ```
//!
//! Services depend on the [`Datastore`] trait, never on a concrete store, so
//! tests can run against [`MemoryStore`].

pub mod memory;
pub mod postgres;
#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use larder_core::{
    Email, HouseholdId, HouseholdRole, InvitationId, InvitationStatus, PantryItemId,
    ShoppingListEntryId, UserId,
};

use crate::models::{
    Household, HouseholdMember, Invitation, NewInvitation, NewPantryItem, PantryItem,
    ShoppingListEntry, ShoppingListItem, UserProfile,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate membership).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

pub(crate) const LAST_OWNER: &str = "cannot remove the last owner of a household";

/// Households and the membership relation.
#[async_trait]
pub trait HouseholdRepository: Send + Sync {
    /// Insert a household and its owner membership as one unit.
    async fn create_household_with_owner(
        &self,
        name: &str,
        owner_id: UserId,
    ) -> Result<(Household, HouseholdMember), RepositoryError>;

    async fn get_household(&self, id: HouseholdId) -> Result<Option<Household>, RepositoryError>;

    /// Households `user_id` has a membership row in, oldest first.
    async fn households_for_user(&self, user_id: UserId)
    -> Result<Vec<Household>, RepositoryError>;

    async fn get_membership(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<Option<HouseholdMember>, RepositoryError>;

    async fn list_members(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<HouseholdMember>, RepositoryError>;

    /// # Errors
    ///
    /// `Conflict` if the user is already a member.
    async fn add_member(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
        role: HouseholdRole,
    ) -> Result<HouseholdMember, RepositoryError>;

    /// Returns false if there was no such membership. The owner count is
    /// checked and the row deleted as one unit.
    ///
    /// # Errors
    ///
    /// `Conflict` if `user_id` is the household's only owner.
    async fn remove_member(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError>;
}

/// Read-only view of registered accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_email(&self, email: &Email)
    -> Result<Option<UserProfile>, RepositoryError>;
}

#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// # Errors
    ///
    /// `Conflict` if a pending invitation already exists for the address.
    async fn create_invitation(&self, new: &NewInvitation) -> Result<Invitation, RepositoryError>;

    async fn get_invitation(&self, id: InvitationId)
    -> Result<Option<Invitation>, RepositoryError>;

    async fn find_pending_invitation(
        &self,
        household_id: HouseholdId,
        email: &Email,
    ) -> Result<Option<Invitation>, RepositoryError>;

    /// Newest first.
    async fn list_invitations(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<Invitation>, RepositoryError>;

    /// Re-issue a pending invitation: new role, inviter and expiry, and the
    /// delivery annotation reset. Returns `None` if it is no longer pending.
    async fn refresh_invitation(
        &self,
        id: InvitationId,
        new: &NewInvitation,
    ) -> Result<Option<Invitation>, RepositoryError>;

    async fn mark_invitation_email_sent(
        &self,
        id: InvitationId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Move a `pending` invitation to `status`. Returns false if it was not
    /// pending (already decided or deleted).
    async fn transition_invitation(
        &self,
        id: InvitationId,
        status: InvitationStatus,
    ) -> Result<bool, RepositoryError>;

    async fn delete_invitation(&self, id: InvitationId) -> Result<bool, RepositoryError>;

    /// Delete pending invitations whose `expires_at` is before `now`.
    async fn delete_expired_invitations(&self, now: DateTime<Utc>)
    -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait PantryItemRepository: Send + Sync {
    async fn create_item(
        &self,
        household_id: HouseholdId,
        created_by: UserId,
        item: &NewPantryItem,
    ) -> Result<PantryItem, RepositoryError>;

    async fn get_item(&self, id: PantryItemId) -> Result<Option<PantryItem>, RepositoryError>;

    async fn list_items(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<PantryItem>, RepositoryError>;

    /// Overwrite every mutable column from `item`. Returns `None` if the row
    /// no longer exists.
    async fn update_item(&self, item: &PantryItem) -> Result<Option<PantryItem>, RepositoryError>;

    /// Delete an item and, by cascade, its shopping-list entry.
    async fn delete_item(&self, id: PantryItemId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait ShoppingListRepository: Send + Sync {
    /// # Errors
    ///
    /// `Conflict` if the item is already on the list.
    async fn add_entry(
        &self,
        item_id: PantryItemId,
        added_by: UserId,
    ) -> Result<ShoppingListEntry, RepositoryError>;

    async fn get_entry(
        &self,
        id: ShoppingListEntryId,
    ) -> Result<Option<ShoppingListEntry>, RepositoryError>;

    /// Entries for items in any household `user_id` belongs to, newest first.
    async fn list_for_user(&self, user_id: UserId)
    -> Result<Vec<ShoppingListItem>, RepositoryError>;

    async fn delete_entry(&self, id: ShoppingListEntryId) -> Result<bool, RepositoryError>;

    /// Remove every entry reachable by `user_id` in a single statement.
    async fn clear_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError>;
}

/// Everything the services need from storage.
#[async_trait]
pub trait Datastore:
    HouseholdRepository
    + UserDirectory
    + InvitationRepository
    + PantryItemRepository
    + ShoppingListRepository
{
    /// Cheap round-trip used by the readiness check.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
