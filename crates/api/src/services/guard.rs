//! Household access checks.
//!
//! Every operation that reads or changes household data goes through here
//! first. The guard fails closed: a membership lookup that errors is treated
//! as "not authorized" after the underlying error is logged. Listing a user's
//! households reports the error instead, so an outage never reads as "no
//! households".

use larder_core::{HouseholdId, UserId};

use crate::db::Datastore;
use crate::error::AppError;
use crate::models::{Household, HouseholdMember};

/// Read-only predicates over the membership relation.
#[derive(Clone, Copy)]
pub struct AccessGuard<'a> {
    store: &'a dyn Datastore,
}

impl<'a> AccessGuard<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Datastore) -> Self {
        Self { store }
    }

    async fn membership(
        &self,
        user_id: UserId,
        household_id: HouseholdId,
    ) -> Option<HouseholdMember> {
        match self.store.get_membership(household_id, user_id).await {
            Ok(membership) => membership,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    %user_id,
                    %household_id,
                    "Membership lookup failed, denying access"
                );
                None
            }
        }
    }

    pub async fn is_member(&self, user_id: UserId, household_id: HouseholdId) -> bool {
        self.membership(user_id, household_id).await.is_some()
    }

    pub async fn is_owner(&self, user_id: UserId, household_id: HouseholdId) -> bool {
        self.membership(user_id, household_id)
            .await
            .is_some_and(|m| m.role.is_owner())
    }

    /// Households the user belongs to.
    ///
    /// # Errors
    ///
    /// `Database` if the lookup fails. An empty list always means "none".
    pub async fn member_households(&self, user_id: UserId) -> Result<Vec<Household>, AppError> {
        Ok(self.store.households_for_user(user_id).await?)
    }

    /// # Errors
    ///
    /// `Forbidden` unless `user_id` is a member of the household.
    pub async fn require_member(
        &self,
        user_id: UserId,
        household_id: HouseholdId,
    ) -> Result<HouseholdMember, AppError> {
        self.membership(user_id, household_id)
            .await
            .ok_or_else(|| AppError::Forbidden("not a member of this household".to_string()))
    }

    /// # Errors
    ///
    /// `Forbidden` unless `user_id` is an owner of the household.
    pub async fn require_owner(
        &self,
        user_id: UserId,
        household_id: HouseholdId,
    ) -> Result<HouseholdMember, AppError> {
        match self.membership(user_id, household_id).await {
            Some(member) if member.role.is_owner() => Ok(member),
            _ => Err(AppError::Forbidden(
                "only the household owner can do this".to_string(),
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use larder_core::HouseholdRole;

    use super::*;
    use crate::db::testing::BrokenStore;
    use crate::db::{HouseholdRepository, MemoryStore};

    #[tokio::test]
    async fn test_owner_and_member_predicates() {
        let store = MemoryStore::new();
        let owner = UserId::generate();
        let member = UserId::generate();
        let stranger = UserId::generate();
        let (household, _) = store
            .create_household_with_owner("Smiths", owner)
            .await
            .unwrap();
        store
            .add_member(household.id, member, HouseholdRole::Member)
            .await
            .unwrap();

        let guard = AccessGuard::new(&store);
        assert!(guard.is_owner(owner, household.id).await);
        assert!(guard.is_member(member, household.id).await);
        assert!(!guard.is_owner(member, household.id).await);
        assert!(!guard.is_member(stranger, household.id).await);
        assert!(matches!(
            guard.require_owner(member, household.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(guard.member_households(member).await.unwrap().len(), 1);
        assert!(guard.member_households(stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_closed() {
        let guard = AccessGuard::new(&BrokenStore);
        let user = UserId::generate();
        let household = HouseholdId::generate();

        assert!(!guard.is_member(user, household).await);
        assert!(!guard.is_owner(user, household).await);
        assert!(matches!(
            guard.member_households(user).await,
            Err(AppError::Database(_))
        ));
        assert!(matches!(
            guard.require_member(user, household).await,
            Err(AppError::Forbidden(_))
        ));
    }
}
