//! In-process implementation of the [`Datastore`] traits.
//!
//! Mirrors the `PostgreSQL` constraints: unique membership per (household,
//! user), one pending invitation per (household, email), one shopping-list
//! entry per item, and cascading deletes. Each call holds the lock for its
//! whole body, so every call is atomic.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use larder_core::{
    Email, HouseholdId, HouseholdRole, InvitationId, InvitationStatus, MembershipId, PantryItemId,
    ShoppingListEntryId, UserId,
};

use super::{
    Datastore, HouseholdRepository, InvitationRepository, LAST_OWNER, PantryItemRepository,
    RepositoryError, ShoppingListRepository, UserDirectory,
};
use crate::models::{
    Household, HouseholdMember, Invitation, NewInvitation, NewPantryItem, PantryItem,
    ShoppingListEntry, ShoppingListItem, UserProfile,
};

#[derive(Debug, Default)]
struct Tables {
    profiles: Vec<UserProfile>,
    households: Vec<Household>,
    members: Vec<HouseholdMember>,
    invitations: Vec<Invitation>,
    items: Vec<PantryItem>,
    entries: Vec<ShoppingListEntry>,
}

impl Tables {
    fn is_member(&self, household_id: HouseholdId, user_id: UserId) -> bool {
        self.members
            .iter()
            .any(|m| m.household_id == household_id && m.user_id == user_id)
    }

    fn reachable_item(&self, item_id: PantryItemId, user_id: UserId) -> Option<&PantryItem> {
        self.items
            .iter()
            .find(|i| i.id == item_id && self.is_member(i.household_id, user_id))
    }
}

/// Datastore held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account, as the identity provider would on sign-up.
    pub fn insert_profile(&self, profile: UserProfile) {
        self.lock().profiles.push(profile);
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HouseholdRepository for MemoryStore {
    async fn create_household_with_owner(
        &self,
        name: &str,
        owner_id: UserId,
    ) -> Result<(Household, HouseholdMember), RepositoryError> {
        let now = Utc::now();
        let household = Household {
            id: HouseholdId::generate(),
            name: name.to_owned(),
            owner_id,
            created_at: now,
        };
        let owner = HouseholdMember {
            id: MembershipId::generate(),
            household_id: household.id,
            user_id: owner_id,
            role: HouseholdRole::Owner,
            created_at: now,
        };

        let mut tables = self.lock();
        tables.households.push(household.clone());
        tables.members.push(owner.clone());
        Ok((household, owner))
    }

    async fn get_household(&self, id: HouseholdId) -> Result<Option<Household>, RepositoryError> {
        Ok(self.lock().households.iter().find(|h| h.id == id).cloned())
    }

    async fn households_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Household>, RepositoryError> {
        let tables = self.lock();
        Ok(tables
            .households
            .iter()
            .filter(|h| tables.is_member(h.id, user_id))
            .cloned()
            .collect())
    }

    async fn get_membership(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<Option<HouseholdMember>, RepositoryError> {
        Ok(self
            .lock()
            .members
            .iter()
            .find(|m| m.household_id == household_id && m.user_id == user_id)
            .cloned())
    }

    async fn list_members(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<HouseholdMember>, RepositoryError> {
        Ok(self
            .lock()
            .members
            .iter()
            .filter(|m| m.household_id == household_id)
            .cloned()
            .collect())
    }

    async fn add_member(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
        role: HouseholdRole,
    ) -> Result<HouseholdMember, RepositoryError> {
        let mut tables = self.lock();
        if !tables.households.iter().any(|h| h.id == household_id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.is_member(household_id, user_id) {
            return Err(RepositoryError::Conflict(
                "already a member of this household".to_owned(),
            ));
        }

        let member = HouseholdMember {
            id: MembershipId::generate(),
            household_id,
            user_id,
            role,
            created_at: Utc::now(),
        };
        tables.members.push(member.clone());
        Ok(member)
    }

    async fn remove_member(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let Some(target) = tables
            .members
            .iter()
            .find(|m| m.household_id == household_id && m.user_id == user_id)
        else {
            return Ok(false);
        };

        if target.role.is_owner() {
            let owners = tables
                .members
                .iter()
                .filter(|m| m.household_id == household_id && m.role.is_owner())
                .count();
            if owners <= 1 {
                return Err(RepositoryError::Conflict(LAST_OWNER.to_string()));
            }
        }

        tables
            .members
            .retain(|m| !(m.household_id == household_id && m.user_id == user_id));
        Ok(true)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self
            .lock()
            .profiles
            .iter()
            .find(|p| &p.email == email)
            .cloned())
    }
}

#[async_trait]
impl InvitationRepository for MemoryStore {
    async fn create_invitation(&self, new: &NewInvitation) -> Result<Invitation, RepositoryError> {
        let mut tables = self.lock();
        if !tables.households.iter().any(|h| h.id == new.household_id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.invitations.iter().any(|i| {
            i.household_id == new.household_id && i.email == new.email && i.is_pending()
        }) {
            return Err(RepositoryError::Conflict(
                "an invitation is already pending for this email".to_owned(),
            ));
        }

        let invitation = Invitation {
            id: InvitationId::generate(),
            household_id: new.household_id,
            email: new.email.clone(),
            role: new.role,
            status: InvitationStatus::Pending,
            invited_by: new.invited_by,
            created_at: Utc::now(),
            expires_at: new.expires_at,
            email_sent_at: None,
        };
        tables.invitations.push(invitation.clone());
        Ok(invitation)
    }

    async fn get_invitation(
        &self,
        id: InvitationId,
    ) -> Result<Option<Invitation>, RepositoryError> {
        Ok(self.lock().invitations.iter().find(|i| i.id == id).cloned())
    }

    async fn find_pending_invitation(
        &self,
        household_id: HouseholdId,
        email: &Email,
    ) -> Result<Option<Invitation>, RepositoryError> {
        Ok(self
            .lock()
            .invitations
            .iter()
            .find(|i| i.household_id == household_id && &i.email == email && i.is_pending())
            .cloned())
    }

    async fn list_invitations(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<Invitation>, RepositoryError> {
        // Reverse insertion order first so equal timestamps stay newest first.
        let mut invitations: Vec<Invitation> = self
            .lock()
            .invitations
            .iter()
            .rev()
            .filter(|i| i.household_id == household_id)
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    async fn refresh_invitation(
        &self,
        id: InvitationId,
        new: &NewInvitation,
    ) -> Result<Option<Invitation>, RepositoryError> {
        let mut tables = self.lock();
        let Some(invitation) = tables
            .invitations
            .iter_mut()
            .find(|i| i.id == id && i.is_pending())
        else {
            return Ok(None);
        };

        invitation.role = new.role;
        invitation.invited_by = new.invited_by;
        invitation.expires_at = new.expires_at;
        invitation.email_sent_at = None;
        Ok(Some(invitation.clone()))
    }

    async fn mark_invitation_email_sent(
        &self,
        id: InvitationId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        let invitation = tables
            .invitations
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(RepositoryError::NotFound)?;
        invitation.email_sent_at = Some(at);
        Ok(())
    }

    async fn transition_invitation(
        &self,
        id: InvitationId,
        status: InvitationStatus,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        match tables
            .invitations
            .iter_mut()
            .find(|i| i.id == id && i.is_pending())
        {
            Some(invitation) => {
                invitation.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_invitation(&self, id: InvitationId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let before = tables.invitations.len();
        tables.invitations.retain(|i| i.id != id);
        Ok(tables.invitations.len() < before)
    }

    async fn delete_expired_invitations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut tables = self.lock();
        let before = tables.invitations.len();
        tables
            .invitations
            .retain(|i| !(i.is_pending() && i.expires_at < now));
        Ok((before - tables.invitations.len()) as u64)
    }
}

#[async_trait]
impl PantryItemRepository for MemoryStore {
    async fn create_item(
        &self,
        household_id: HouseholdId,
        created_by: UserId,
        item: &NewPantryItem,
    ) -> Result<PantryItem, RepositoryError> {
        let mut tables = self.lock();
        if !tables.households.iter().any(|h| h.id == household_id) {
            return Err(RepositoryError::NotFound);
        }

        let item = PantryItem {
            id: PantryItemId::generate(),
            household_id,
            name: item.name.clone(),
            brand: item.brand.clone(),
            category: item.category.clone(),
            quantity: item.quantity,
            completion: item.completion,
            expiry: item.expiry,
            purchase_date: item.purchase_date,
            location: item.location.clone(),
            tags: item.tags.clone(),
            notes: item.notes.clone(),
            barcode: item.barcode.clone(),
            image: item.image.clone(),
            created_by,
            scanned_at: item.scanned_at,
            created_at: Utc::now(),
        };
        tables.items.push(item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: PantryItemId) -> Result<Option<PantryItem>, RepositoryError> {
        Ok(self.lock().items.iter().find(|i| i.id == id).cloned())
    }

    async fn list_items(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<PantryItem>, RepositoryError> {
        Ok(self
            .lock()
            .items
            .iter()
            .rev()
            .filter(|i| i.household_id == household_id)
            .cloned()
            .collect())
    }

    async fn update_item(&self, item: &PantryItem) -> Result<Option<PantryItem>, RepositoryError> {
        let mut tables = self.lock();
        let Some(stored) = tables.items.iter_mut().find(|i| i.id == item.id) else {
            return Ok(None);
        };

        // Identity and audit columns are not writable.
        *stored = PantryItem {
            id: stored.id,
            household_id: stored.household_id,
            created_by: stored.created_by,
            created_at: stored.created_at,
            ..item.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn delete_item(&self, id: PantryItemId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let before = tables.items.len();
        tables.items.retain(|i| i.id != id);
        let removed = tables.items.len() < before;
        if removed {
            tables.entries.retain(|e| e.item_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl ShoppingListRepository for MemoryStore {
    async fn add_entry(
        &self,
        item_id: PantryItemId,
        added_by: UserId,
    ) -> Result<ShoppingListEntry, RepositoryError> {
        let mut tables = self.lock();
        if !tables.items.iter().any(|i| i.id == item_id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.entries.iter().any(|e| e.item_id == item_id) {
            return Err(RepositoryError::Conflict("already in list".to_owned()));
        }

        let entry = ShoppingListEntry {
            id: ShoppingListEntryId::generate(),
            item_id,
            added_by,
            added_at: Utc::now(),
        };
        tables.entries.push(entry.clone());
        Ok(entry)
    }

    async fn get_entry(
        &self,
        id: ShoppingListEntryId,
    ) -> Result<Option<ShoppingListEntry>, RepositoryError> {
        Ok(self.lock().entries.iter().find(|e| e.id == id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ShoppingListItem>, RepositoryError> {
        let tables = self.lock();
        let mut list: Vec<ShoppingListItem> = tables
            .entries
            .iter()
            .rev()
            .filter_map(|entry| {
                tables
                    .reachable_item(entry.item_id, user_id)
                    .map(|item| ShoppingListItem {
                        entry: entry.clone(),
                        item: item.clone(),
                    })
            })
            .collect();
        list.sort_by(|a, b| b.entry.added_at.cmp(&a.entry.added_at));
        Ok(list)
    }

    async fn delete_entry(&self, id: ShoppingListEntryId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let before = tables.entries.len();
        tables.entries.retain(|e| e.id != id);
        Ok(tables.entries.len() < before)
    }

    async fn clear_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut tables = self.lock();
        let reachable: Vec<PantryItemId> = tables
            .entries
            .iter()
            .filter(|e| tables.reachable_item(e.item_id, user_id).is_some())
            .map(|e| e.item_id)
            .collect();
        let before = tables.entries.len();
        tables.entries.retain(|e| !reachable.contains(&e.item_id));
        Ok((before - tables.entries.len()) as u64)
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
