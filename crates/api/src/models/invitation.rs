//! Invitations to join a household.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{Email, HouseholdId, HouseholdRole, InvitationId, InvitationStatus, UserId};

use super::HouseholdMember;

/// An offer of membership addressed to an email without an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub household_id: HouseholdId,
    pub email: Email,
    pub role: HouseholdRole,
    pub status: InvitationStatus,
    pub invited_by: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// When the notification was confirmed delivered.
    pub email_sent_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// Past `expires_at`. Status is not consulted.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    #[must_use]
    pub const fn email_sent(&self) -> bool {
        self.email_sent_at.is_some()
    }
}

/// Fields for a new pending invitation.
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub household_id: HouseholdId,
    pub email: Email,
    pub role: HouseholdRole,
    pub invited_by: UserId,
    pub expires_at: DateTime<Utc>,
}

/// Whether the notification collaborator accepted the invitation email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Sent,
    Failed,
}

/// Result of inviting an address to a household.
#[derive(Debug, Clone)]
pub enum InviteOutcome {
    /// The address belongs to an existing account, which was added directly.
    MemberAdded(HouseholdMember),
    /// A pending invitation now exists for the address.
    Invited {
        invitation: Invitation,
        delivery: Delivery,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn invitation(now: DateTime<Utc>) -> Invitation {
        Invitation {
            id: InvitationId::generate(),
            household_id: HouseholdId::generate(),
            email: Email::parse("b@example.com").unwrap(),
            role: HouseholdRole::Member,
            status: InvitationStatus::Pending,
            invited_by: UserId::generate(),
            created_at: now,
            expires_at: now + Duration::days(7),
            email_sent_at: None,
        }
    }

    #[test]
    fn test_expiry_is_strictly_after() {
        let now = Utc::now();
        let inv = invitation(now);
        assert!(!inv.is_expired(now + Duration::days(7)));
        assert!(inv.is_expired(now + Duration::days(7) + Duration::seconds(1)));
    }

    #[test]
    fn test_email_sent_is_an_annotation() {
        let now = Utc::now();
        let mut inv = invitation(now);
        inv.email_sent_at = Some(now);
        assert!(inv.email_sent());
        assert!(inv.is_pending());
    }
}
