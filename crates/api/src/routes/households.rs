//! Household routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use larder_core::UserId;

use super::extract::{JsonBody, QueryParams};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::{Household, HouseholdMember, HouseholdName, require_id};
use crate::services::HouseholdService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateHouseholdRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedHousehold {
    pub household: Household,
    pub membership: HouseholdMember,
}

/// GET /households
///
/// Households the caller belongs to. `user_id`, when given, must be the
/// caller's own id.
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Vec<Household>>> {
    if query.user_id.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        let requested: UserId = require_id(query.user_id.as_deref(), "user_id")?;
        if requested != user.id {
            return Err(AppError::Forbidden(
                "cannot list another user's households".to_string(),
            ));
        }
    }

    let households = HouseholdService::new(state.store()).list_for(&user).await?;
    Ok(Json(households))
}

/// POST /households
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    JsonBody(body): JsonBody<CreateHouseholdRequest>,
) -> Result<(StatusCode, Json<CreatedHousehold>)> {
    let name = HouseholdName::parse(body.name.as_deref())?;
    let (household, membership) = HouseholdService::new(state.store())
        .create(&name, &user)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedHousehold {
            household,
            membership,
        }),
    ))
}
