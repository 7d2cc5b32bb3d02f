//! Invitation routes.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use larder_core::{HouseholdId, InvitationId};

use super::extract::QueryParams;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{HouseholdMember, Invitation, require_id};
use crate::services::{InvitationDetails, InvitationService};
use crate::state::AppState;

/// An invitation as clients see it, with the delivery flag spelled out.
#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub email_sent: bool,
}

impl From<Invitation> for InvitationResponse {
    fn from(invitation: Invitation) -> Self {
        Self {
            email_sent: invitation.email_sent(),
            invitation,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvitationDetailsResponse {
    #[serde(flatten)]
    pub invitation: InvitationResponse,
    pub household_name: String,
}

impl From<InvitationDetails> for InvitationDetailsResponse {
    fn from(details: InvitationDetails) -> Self {
        Self {
            invitation: details.invitation.into(),
            household_name: details.household_name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InvitationsQuery {
    pub household_id: Option<String>,
    pub id: Option<String>,
}

fn service(state: &AppState) -> InvitationService<'_> {
    InvitationService::new(state.store(), state.mailer(), state.config())
}

fn path_id(raw: &str) -> Result<InvitationId> {
    Ok(require_id(Some(raw), "id")?)
}

/// GET /invitations?household_id=
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    QueryParams(query): QueryParams<InvitationsQuery>,
) -> Result<Json<Vec<InvitationResponse>>> {
    let household_id: HouseholdId = require_id(query.household_id.as_deref(), "household_id")?;
    let invitations = service(&state).list(household_id, &user).await?;
    Ok(Json(invitations.into_iter().map(Into::into).collect()))
}

/// DELETE /invitations?id=
pub async fn cancel(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    QueryParams(query): QueryParams<InvitationsQuery>,
) -> Result<Json<Value>> {
    let id: InvitationId = require_id(query.id.as_deref(), "id")?;
    service(&state).cancel(id, &user).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// GET /invitations/{id}
///
/// Any signed-in user holding the link may view it; 409 once decided,
/// 410 once expired.
pub async fn show(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
    Path(raw): Path<String>,
) -> Result<Json<InvitationDetailsResponse>> {
    let details = service(&state).details(path_id(&raw)?, Utc::now()).await?;
    Ok(Json(details.into()))
}

/// POST /invitations/{id}/accept
pub async fn accept(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(raw): Path<String>,
) -> Result<Json<HouseholdMember>> {
    let member = service(&state)
        .accept(path_id(&raw)?, &user, Utc::now())
        .await?;
    Ok(Json(member))
}

/// POST /invitations/{id}/decline
pub async fn decline(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(raw): Path<String>,
) -> Result<Json<InvitationResponse>> {
    let invitation = service(&state).decline(path_id(&raw)?, &user).await?;
    Ok(Json(invitation.into()))
}
