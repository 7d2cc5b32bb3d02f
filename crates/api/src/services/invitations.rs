//! Invitation lifecycle: `pending -> {accepted, declined}`.
//!
//! Expiry is never written back. A pending invitation past `expires_at` stays
//! pending in storage and is rejected when someone tries to use it.
//! Whether the notification went out is tracked in `email_sent_at` and has no
//! bearing on the decision status.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use larder_core::{Email, HouseholdId, HouseholdRole, InvitationId, InvitationStatus};

use super::email::{InvitationMailer, InvitationNotice};
use super::guard::AccessGuard;
use crate::config::AppConfig;
use crate::db::Datastore;
use crate::error::AppError;
use crate::models::{
    CurrentUser, Delivery, Household, HouseholdMember, Invitation, InviteOutcome, NewInvitation,
};

/// A pending invitation with the household it leads to.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationDetails {
    pub invitation: Invitation,
    pub household_name: String,
}

pub struct InvitationService<'a> {
    store: &'a dyn Datastore,
    mailer: &'a dyn InvitationMailer,
    config: &'a AppConfig,
}

impl<'a> InvitationService<'a> {
    #[must_use]
    pub const fn new(
        store: &'a dyn Datastore,
        mailer: &'a dyn InvitationMailer,
        config: &'a AppConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }

    const fn guard(&self) -> AccessGuard<'a> {
        AccessGuard::new(self.store)
    }

    /// Invite `email` to the household.
    ///
    /// An address that already belongs to an account is added directly. Any
    /// other address gets a pending invitation (an existing pending one is
    /// refreshed) and a notification email. A failed email is reported in the
    /// outcome, not as an error.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the inviter owns the household, `Conflict` if the
    /// account is already a member.
    #[instrument(
        skip(self, email, inviter),
        fields(inviter_id = %inviter.id, to = %email.redacted())
    )]
    pub async fn invite(
        &self,
        household_id: HouseholdId,
        email: Email,
        role: HouseholdRole,
        inviter: &CurrentUser,
        now: DateTime<Utc>,
    ) -> Result<InviteOutcome, AppError> {
        self.guard().require_owner(inviter.id, household_id).await?;
        let household = self
            .store
            .get_household(household_id)
            .await?
            .ok_or_else(|| AppError::NotFound("household not found".to_string()))?;

        if let Some(account) = self.store.find_user_by_email(&email).await? {
            if self
                .store
                .get_membership(household_id, account.id)
                .await?
                .is_some()
            {
                return Err(AppError::Conflict(
                    "already a member of this household".to_string(),
                ));
            }
            let member = self.store.add_member(household_id, account.id, role).await?;
            tracing::info!(user_id = %account.id, "Existing account added directly");
            return Ok(InviteOutcome::MemberAdded(member));
        }

        let new = NewInvitation {
            household_id,
            email,
            role,
            invited_by: inviter.id,
            expires_at: now + self.config.invitations.ttl,
        };
        let refreshed = match self
            .store
            .find_pending_invitation(household_id, &new.email)
            .await?
        {
            Some(existing) => self.store.refresh_invitation(existing.id, &new).await?,
            None => None,
        };
        let mut invitation = match refreshed {
            Some(invitation) => {
                tracing::info!(invitation_id = %invitation.id, "Pending invitation refreshed");
                invitation
            }
            None => {
                let invitation = self.store.create_invitation(&new).await?;
                tracing::info!(invitation_id = %invitation.id, "Invitation created");
                invitation
            }
        };

        let delivery = self.notify(&household, &invitation, inviter).await;
        if delivery == Delivery::Sent {
            match self
                .store
                .mark_invitation_email_sent(invitation.id, now)
                .await
            {
                Ok(()) => invitation.email_sent_at = Some(now),
                Err(e) => tracing::warn!(
                    error = %e,
                    invitation_id = %invitation.id,
                    "Invitation email sent but delivery could not be recorded"
                ),
            }
        }

        Ok(InviteOutcome::Invited {
            invitation,
            delivery,
        })
    }

    async fn notify(
        &self,
        household: &Household,
        invitation: &Invitation,
        inviter: &CurrentUser,
    ) -> Delivery {
        let notice = InvitationNotice {
            to: invitation.email.clone(),
            household_name: household.name.clone(),
            inviter: inviter
                .email
                .as_ref()
                .map_or_else(|| "A household member".to_string(), ToString::to_string),
            role: invitation.role,
            accept_url: self.config.invitation_url(invitation.id),
            expires_at: invitation.expires_at,
        };

        match self.mailer.send_invitation(&notice).await {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    invitation_id = %invitation.id,
                    "Invitation created but email delivery failed"
                );
                Delivery::Failed
            }
        }
    }

    /// Invitations for a household, newest first.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the caller is a member.
    pub async fn list(
        &self,
        household_id: HouseholdId,
        actor: &CurrentUser,
    ) -> Result<Vec<Invitation>, AppError> {
        self.guard().require_member(actor.id, household_id).await?;
        Ok(self.store.list_invitations(household_id).await?)
    }

    /// A still-acceptable invitation and its household's name.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Conflict` if already decided, `Expired` past `expires_at`.
    pub async fn details(
        &self,
        id: InvitationId,
        now: DateTime<Utc>,
    ) -> Result<InvitationDetails, AppError> {
        let invitation = self.acceptable(id, now).await?;
        let household = self
            .store
            .get_household(invitation.household_id)
            .await?
            .ok_or_else(|| AppError::NotFound("household not found".to_string()))?;

        Ok(InvitationDetails {
            invitation,
            household_name: household.name,
        })
    }

    /// Join the household as the invited role.
    ///
    /// The membership insert is authoritative: if another request decided the
    /// invitation in between, the membership stays and the race is logged.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Conflict` if already decided or already a member,
    /// `Expired` past `expires_at`, `Forbidden` on an email mismatch when
    /// matching is required.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn accept(
        &self,
        id: InvitationId,
        user: &CurrentUser,
        now: DateTime<Utc>,
    ) -> Result<HouseholdMember, AppError> {
        let invitation = self.acceptable(id, now).await?;
        self.check_recipient(&invitation, user)?;

        if self
            .store
            .get_membership(invitation.household_id, user.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "already a member of this household".to_string(),
            ));
        }

        let member = self
            .store
            .add_member(invitation.household_id, user.id, invitation.role)
            .await?;

        if !self
            .store
            .transition_invitation(id, InvitationStatus::Accepted)
            .await?
        {
            tracing::warn!(
                invitation_id = %id,
                "Invitation was decided concurrently; keeping the new membership"
            );
        }

        tracing::info!(household_id = %invitation.household_id, "Invitation accepted");
        Ok(member)
    }

    /// # Errors
    ///
    /// `NotFound`, or `Conflict` if the invitation is no longer pending.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn decline(
        &self,
        id: InvitationId,
        user: &CurrentUser,
    ) -> Result<Invitation, AppError> {
        let mut invitation = self.find(id).await?;
        if !invitation.is_pending() {
            return Err(already_decided(&invitation));
        }
        self.check_recipient(&invitation, user)?;

        if !self
            .store
            .transition_invitation(id, InvitationStatus::Declined)
            .await?
        {
            return Err(AppError::Conflict(
                "invitation has already been decided".to_string(),
            ));
        }

        tracing::info!("Invitation declined");
        invitation.status = InvitationStatus::Declined;
        Ok(invitation)
    }

    /// Withdraw a pending invitation. Owner only.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` unless the caller owns the household, or
    /// `Conflict` once the invitation has been decided.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn cancel(&self, id: InvitationId, actor: &CurrentUser) -> Result<(), AppError> {
        let invitation = self.find(id).await?;
        self.guard()
            .require_owner(actor.id, invitation.household_id)
            .await?;
        if !invitation.is_pending() {
            return Err(AppError::Conflict(
                "only pending invitations can be cancelled".to_string(),
            ));
        }

        if !self.store.delete_invitation(id).await? {
            return Err(AppError::NotFound("invitation not found".to_string()));
        }
        tracing::info!("Invitation cancelled");
        Ok(())
    }

    async fn find(&self, id: InvitationId) -> Result<Invitation, AppError> {
        self.store
            .get_invitation(id)
            .await?
            .ok_or_else(|| AppError::NotFound("invitation not found".to_string()))
    }

    /// Pending and not yet expired.
    async fn acceptable(
        &self,
        id: InvitationId,
        now: DateTime<Utc>,
    ) -> Result<Invitation, AppError> {
        let invitation = self.find(id).await?;
        if !invitation.is_pending() {
            return Err(already_decided(&invitation));
        }
        if invitation.is_expired(now) {
            return Err(AppError::Expired("invitation has expired".to_string()));
        }
        Ok(invitation)
    }

    fn check_recipient(&self, invitation: &Invitation, user: &CurrentUser) -> Result<(), AppError> {
        if user.email.as_ref() == Some(&invitation.email) {
            return Ok(());
        }
        if self.config.invitations.require_email_match {
            return Err(AppError::Forbidden(
                "this invitation was sent to a different email address".to_string(),
            ));
        }
        tracing::warn!(
            invitation_id = %invitation.id,
            user_id = %user.id,
            "Invitation used by an account with a different email"
        );
        Ok(())
    }
}

fn already_decided(invitation: &Invitation) -> AppError {
    AppError::Conflict(format!("invitation has already been {}", invitation.status))
}
