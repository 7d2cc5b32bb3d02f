//! Barcode product lookup.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::services::ProductInfo;
use crate::services::product_lookup::validate_barcode;
use crate::state::AppState;

/// GET /products/{barcode}
pub async fn show(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
    Path(raw): Path<String>,
) -> Result<Json<ProductInfo>> {
    let barcode = validate_barcode(&raw)?;

    match state.products().lookup(barcode).await {
        Ok(Some(product)) => Ok(Json(product)),
        Ok(None) => Err(AppError::NotFound("product not found".to_string())),
        Err(e) => Err(AppError::Dependency(format!("product lookup failed: {e}"))),
    }
}
