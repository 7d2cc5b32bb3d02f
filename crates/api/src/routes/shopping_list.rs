//! Shopping list routes. The caller comes from the bearer token.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use larder_core::{PantryItemId, ShoppingListEntryId};

use super::extract::{JsonBody, QueryParams, parse_flag};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{ShoppingListEntry, ShoppingListItem, ValidationError, require_id};
use crate::services::ShoppingListService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddRequest {
    pub item_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemoveQuery {
    pub id: Option<String>,
    pub all: Option<String>,
}

/// GET /shopping-list
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<ShoppingListItem>>> {
    Ok(Json(ShoppingListService::new(state.store()).list(&user).await?))
}

/// POST /shopping-list
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    JsonBody(body): JsonBody<AddRequest>,
) -> Result<(StatusCode, Json<ShoppingListEntry>)> {
    let item_id: PantryItemId = require_id(body.item_id.as_deref(), "item_id")?;
    let entry = ShoppingListService::new(state.store())
        .add(item_id, &user)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// DELETE /shopping-list?id= or DELETE /shopping-list?all=true
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    QueryParams(query): QueryParams<RemoveQuery>,
) -> Result<Json<Value>> {
    let service = ShoppingListService::new(state.store());

    if parse_flag(query.all.as_deref(), "all")? {
        let removed = service.clear(&user).await?;
        return Ok(Json(json!({ "removed": removed })));
    }

    if query.id.as_deref().is_none_or(|s| s.trim().is_empty()) {
        return Err(ValidationError::new("id", "is required unless all=true").into());
    }
    let id: ShoppingListEntryId = require_id(query.id.as_deref(), "id")?;
    let removed = service.remove(id, &user).await?;
    Ok(Json(json!({ "removed": u64::from(removed) })))
}
