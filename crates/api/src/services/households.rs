//! Household creation and membership management.

use tracing::instrument;

use larder_core::{HouseholdId, UserId};

use super::guard::AccessGuard;
use crate::db::Datastore;
use crate::error::AppError;
use crate::models::{CurrentUser, Household, HouseholdMember, HouseholdName};

pub struct HouseholdService<'a> {
    store: &'a dyn Datastore,
}

impl<'a> HouseholdService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Datastore) -> Self {
        Self { store }
    }

    const fn guard(&self) -> AccessGuard<'a> {
        AccessGuard::new(self.store)
    }

    /// Create a household owned by `owner`, together with the owner's membership.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the transaction fails; nothing is left behind.
    #[instrument(skip(self, name, owner), fields(owner_id = %owner.id))]
    pub async fn create(
        &self,
        name: &HouseholdName,
        owner: &CurrentUser,
    ) -> Result<(Household, HouseholdMember), AppError> {
        let (household, membership) = self
            .store
            .create_household_with_owner(name.as_str(), owner.id)
            .await?;

        tracing::info!(household_id = %household.id, "Household created");
        Ok((household, membership))
    }

    /// Households the caller belongs to.
    ///
    /// # Errors
    ///
    /// `Database` if the lookup fails.
    pub async fn list_for(&self, user: &CurrentUser) -> Result<Vec<Household>, AppError> {
        self.guard().member_households(user.id).await
    }

    /// # Errors
    ///
    /// `Forbidden` unless the caller is a member.
    pub async fn members(
        &self,
        household_id: HouseholdId,
        actor: &CurrentUser,
    ) -> Result<Vec<HouseholdMember>, AppError> {
        self.guard().require_member(actor.id, household_id).await?;
        Ok(self.store.list_members(household_id).await?)
    }

    /// Remove `user_id` from the household.
    ///
    /// Owners may remove anyone; members may only remove themselves. The last
    /// owner cannot be removed.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotFound` if `user_id` is not a member, or `Conflict` for
    /// the last owner.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn remove_member(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
        actor: &CurrentUser,
    ) -> Result<(), AppError> {
        let caller = self.guard().require_member(actor.id, household_id).await?;
        if actor.id != user_id && !caller.role.is_owner() {
            return Err(AppError::Forbidden(
                "only the household owner can remove other members".to_string(),
            ));
        }

        if !self.store.remove_member(household_id, user_id).await? {
            return Err(AppError::NotFound("member not found".to_string()));
        }

        tracing::info!("Member removed");
        Ok(())
    }
}
