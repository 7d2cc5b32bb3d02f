//! Pantry item routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use larder_core::{
    ExpiryFilter, ExpirySummary, HouseholdId, ItemQuery, PantryItemId, Room, SortDirection,
    SortKey,
};

use super::extract::{JsonBody, QueryParams, parse_flag, parse_optional};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{PantryItem, PantryItemPatch, PantryItemRequest, ValidationError, require_id};
use crate::services::PantryService;
use crate::state::AppState;

/// Query string of `GET /pantry-items`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub household_id: Option<String>,
    pub search: Option<String>,
    pub room: Option<String>,
    pub storage_area: Option<String>,
    pub expiry: Option<String>,
    pub hide_used: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl ListQuery {
    fn into_query(self) -> std::result::Result<(HouseholdId, ItemQuery), ValidationError> {
        let household_id = require_id(self.household_id.as_deref(), "household_id")?;
        let defaults = ItemQuery::default();
        let sort = parse_optional::<SortKey>(self.sort.as_deref(), "sort")?;
        let direction = parse_optional::<SortDirection>(self.direction.as_deref(), "direction")?;
        let query = ItemQuery {
            search: self.search.filter(|s| !s.trim().is_empty()),
            room: parse_optional::<Room>(self.room.as_deref(), "room")?,
            storage_area: self.storage_area.filter(|s| !s.trim().is_empty()),
            expiry: parse_optional::<ExpiryFilter>(self.expiry.as_deref(), "expiry")?,
            hide_used: parse_flag(self.hide_used.as_deref(), "hide_used")?,
            // Newest first only applies to the default ordering.
            direction: direction.unwrap_or(if sort.is_some() {
                SortDirection::Asc
            } else {
                defaults.direction
            }),
            sort: sort.unwrap_or(defaults.sort),
        };
        Ok((household_id, query))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ItemIdQuery {
    pub id: Option<String>,
    pub household_id: Option<String>,
}

fn path_id(raw: &str) -> Result<PantryItemId> {
    Ok(require_id(Some(raw), "id")?)
}

/// GET /pantry-items?household_id=&search=&room=&storage_area=&expiry=&hide_used=&sort=&direction=
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    QueryParams(params): QueryParams<ListQuery>,
) -> Result<Json<Vec<PantryItem>>> {
    let (household_id, query) = params.into_query()?;
    let items = PantryService::new(state.store())
        .list(household_id, &query, Utc::now().date_naive(), &user)
        .await?;
    Ok(Json(items))
}

/// GET /pantry-items/summary?household_id=
pub async fn summary(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    QueryParams(params): QueryParams<ItemIdQuery>,
) -> Result<Json<ExpirySummary>> {
    let household_id: HouseholdId = require_id(params.household_id.as_deref(), "household_id")?;
    let summary = PantryService::new(state.store())
        .summary(household_id, Utc::now().date_naive(), &user)
        .await?;
    Ok(Json(summary))
}

/// POST /pantry-items
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    JsonBody(body): JsonBody<PantryItemRequest>,
) -> Result<(StatusCode, Json<PantryItem>)> {
    let (household_id, new) = body.validate()?;
    let item = PantryService::new(state.store())
        .create(household_id, &new, &user)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /pantry-items?id=
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    QueryParams(params): QueryParams<ItemIdQuery>,
    JsonBody(patch): JsonBody<PantryItemPatch>,
) -> Result<Json<PantryItem>> {
    let id: PantryItemId = require_id(params.id.as_deref(), "id")?;
    let changes = patch.validate()?;
    let item = PantryService::new(state.store())
        .update(id, changes, &user)
        .await?;
    Ok(Json(item))
}

/// DELETE /pantry-items?id=
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    QueryParams(params): QueryParams<ItemIdQuery>,
) -> Result<Json<Value>> {
    let id: PantryItemId = require_id(params.id.as_deref(), "id")?;
    PantryService::new(state.store()).delete(id, &user).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// GET /pantry-items/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(raw): Path<String>,
) -> Result<Json<PantryItem>> {
    let item = PantryService::new(state.store())
        .get(path_id(&raw)?, &user)
        .await?;
    Ok(Json(item))
}

/// POST /pantry-items/{id}/duplicate
pub async fn duplicate(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(raw): Path<String>,
) -> Result<(StatusCode, Json<PantryItem>)> {
    let item = PantryService::new(state.store())
        .duplicate(path_id(&raw)?, &user)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// POST /pantry-items/{id}/mark-used
pub async fn mark_used(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(raw): Path<String>,
) -> Result<Json<PantryItem>> {
    let item = PantryService::new(state.store())
        .mark_used(path_id(&raw)?, &user)
        .await?;
    Ok(Json(item))
}
