//! Household membership routes, including invite-or-add.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use larder_core::{Email, HouseholdId, HouseholdRole, UserId};

use super::extract::{JsonBody, QueryParams, parse_optional};
use super::invitations::InvitationResponse;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{Delivery, HouseholdMember, InviteOutcome, ValidationError, require_id};
use crate::services::{HouseholdService, InvitationService};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MembersQuery {
    pub household_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InviteRequest {
    pub household_id: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InviteResponse {
    MemberAdded {
        member: HouseholdMember,
    },
    Invited {
        invitation: InvitationResponse,
        email_delivery: Delivery,
    },
}

impl From<InviteOutcome> for InviteResponse {
    fn from(outcome: InviteOutcome) -> Self {
        match outcome {
            InviteOutcome::MemberAdded(member) => Self::MemberAdded { member },
            InviteOutcome::Invited {
                invitation,
                delivery,
            } => Self::Invited {
                invitation: invitation.into(),
                email_delivery: delivery,
            },
        }
    }
}

/// GET /household-members?household_id=
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    QueryParams(query): QueryParams<MembersQuery>,
) -> Result<Json<Vec<HouseholdMember>>> {
    let household_id: HouseholdId = require_id(query.household_id.as_deref(), "household_id")?;
    let members = HouseholdService::new(state.store())
        .members(household_id, &user)
        .await?;
    Ok(Json(members))
}

/// POST /household-members
///
/// Adds an existing account directly or creates a pending invitation.
/// Owner only.
pub async fn invite(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    JsonBody(body): JsonBody<InviteRequest>,
) -> Result<(StatusCode, Json<InviteResponse>)> {
    let household_id: HouseholdId = require_id(body.household_id.as_deref(), "household_id")?;
    let email = body
        .email
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ValidationError::missing("email"))?;
    let email = Email::parse(email).map_err(|e| ValidationError::new("email", e.to_string()))?;
    let role = parse_optional::<HouseholdRole>(body.role.as_deref(), "role")?
        .unwrap_or(HouseholdRole::Member);

    let outcome = InvitationService::new(state.store(), state.mailer(), state.config())
        .invite(household_id, email, role, &user, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// DELETE /household-members?household_id=&user_id=
///
/// `user_id` defaults to the caller, i.e. leaving the household.
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    QueryParams(query): QueryParams<MembersQuery>,
) -> Result<Json<Value>> {
    let household_id: HouseholdId = require_id(query.household_id.as_deref(), "household_id")?;
    let target: UserId = match query.user_id.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => require_id(Some(raw), "user_id")?,
        None => user.id,
    };

    HouseholdService::new(state.store())
        .remove_member(household_id, target, &user)
        .await?;
    Ok(Json(json!({ "deleted": true })))
}
