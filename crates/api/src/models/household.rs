//! Households and their memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{HouseholdId, HouseholdRole, MembershipId, UserId};

use super::ValidationError;

/// The sharing boundary: members, items and invitations all hang off one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Household {
    pub id: HouseholdId,
    pub name: String,
    /// User who created the household.
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A user's membership in a household. One row per (household, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholdMember {
    pub id: MembershipId,
    pub household_id: HouseholdId,
    pub user_id: UserId,
    pub role: HouseholdRole,
    pub created_at: DateTime<Utc>,
}

/// A validated household name: trimmed, 1-100 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseholdName(String);

impl HouseholdName {
    pub const MAX_LENGTH: usize = 100;

    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a blank or overlong name.
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        let name = raw
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ValidationError::missing("name"))?;
        if name.chars().count() > Self::MAX_LENGTH {
            return Err(ValidationError::new(
                "name",
                format!("must be at most {} characters", Self::MAX_LENGTH),
            ));
        }
        Ok(Self(name.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
