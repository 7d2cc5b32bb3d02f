//! Larder API - shared household pantries over JSON HTTP.
//!
//! # Architecture
//!
//! - Axum web framework, JSON request and response bodies
//! - Bearer token (HS256 JWT) identifies the caller
//! - `PostgreSQL` via sqlx behind the [`db::Datastore`] trait
//! - SMTP via lettre with Askama templates for invitation emails
//! - Open Food Facts compatible product lookup, cached with moka
//!
//! Every household-scoped operation passes through
//! [`services::AccessGuard`] before touching storage.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;
