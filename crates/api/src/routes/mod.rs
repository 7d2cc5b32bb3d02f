//! JSON HTTP routes.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                         - Liveness
//! GET    /health/ready                   - Readiness (datastore ping)
//!
//! GET    /households[?user_id=]          - Caller's households
//! POST   /households                     - Create household + owner membership
//!
//! GET    /household-members?household_id=
//! POST   /household-members              - Invite by email, or add an existing account
//! DELETE /household-members?household_id=&user_id=
//!
//! GET    /invitations?household_id=
//! DELETE /invitations?id=                - Cancel (owner only)
//! GET    /invitations/{id}               - Pending and unexpired only
//! POST   /invitations/{id}/accept
//! POST   /invitations/{id}/decline
//!
//! GET    /pantry-items?household_id=&...  - Filtered, sorted listing
//! POST   /pantry-items
//! PUT    /pantry-items?id=
//! DELETE /pantry-items?id=
//! GET    /pantry-items/summary?household_id=
//! GET    /pantry-items/{id}
//! POST   /pantry-items/{id}/duplicate
//! POST   /pantry-items/{id}/mark-used
//!
//! GET    /shopping-list
//! POST   /shopping-list
//! DELETE /shopping-list?id= | ?all=true
//!
//! GET    /products/{barcode}
//! ```
//!
//! Everything except `/health*` requires a bearer token.

pub mod extract;
pub mod health;
pub mod households;
pub mod invitations;
pub mod members;
pub mod pantry_items;
pub mod products;
pub mod shopping_list;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

async fn not_found() -> AppError {
    AppError::NotFound("no such route".to_string())
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/households", get(households::list).post(households::create))
        .route(
            "/household-members",
            get(members::list)
                .post(members::invite)
                .delete(members::remove),
        )
        .route(
            "/invitations",
            get(invitations::list).delete(invitations::cancel),
        )
        .route("/invitations/{id}", get(invitations::show))
        .route("/invitations/{id}/accept", post(invitations::accept))
        .route("/invitations/{id}/decline", post(invitations::decline))
        .route(
            "/pantry-items",
            get(pantry_items::list)
                .post(pantry_items::create)
                .put(pantry_items::update)
                .delete(pantry_items::delete),
        )
        .route("/pantry-items/summary", get(pantry_items::summary))
        .route("/pantry-items/{id}", get(pantry_items::show))
        .route("/pantry-items/{id}/duplicate", post(pantry_items::duplicate))
        .route("/pantry-items/{id}/mark-used", post(pantry_items::mark_used))
        .route(
            "/shopping-list",
            get(shopping_list::list)
                .post(shopping_list::add)
                .delete(shopping_list::remove),
        )
        .route("/products/{barcode}", get(products::show))
}

/// The full application: routes, JSON fallbacks, tracing and request ids.
pub fn router(state: AppState) -> Router {
    routes()
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
