//! Larder Core - Shared domain types and pure functions.
//!
//! This crate provides the types used across all Larder components:
//! - `api` - JSON HTTP service for households, invitations, pantry items and the shopping list
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here is deterministic given its inputs,
//! including "today", which callers pass in explicitly.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, roles and invitation statuses
//! - [`expiry`] - Whole-day expiry classification
//! - [`locations`] - Static room to storage-area catalog
//! - [`filter`] - Composable item filters and sort orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod expiry;
pub mod filter;
pub mod locations;
pub mod types;

pub use expiry::{ExpiryFilter, ExpiryStatus, ExpirySummary};
pub use filter::{ItemQuery, ItemView, SortDirection, SortKey};
pub use locations::{LocationError, Room};
pub use types::*;
