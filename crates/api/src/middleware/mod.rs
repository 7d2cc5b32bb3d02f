//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction tracing)
//! 2. `TraceLayer` (request span with method, uri, request id, user id)
//! 3. Request ID (add unique ID to each request)
//!
//! Authentication is an extractor, not a layer: handlers that need a caller
//! take [`RequireUser`].

pub mod auth;
pub mod request_id;

pub use auth::{RequireUser, TokenVerifier};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
