//! Invitation maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Delete pending invitations that expired more than a day ago
//! larder-cli invitations prune --grace-days 1
//! ```
//!
//! Accepted and declined invitations are kept as history.

use chrono::{Duration, Utc};

use larder_api::config::database_url_from_env;
use larder_api::db::{InvitationRepository, PgStore, create_pool};

use super::CommandError;

/// Delete pending invitations whose expiry passed more than `grace_days` ago.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the delete fails.
pub async fn prune(grace_days: u32) -> Result<u64, CommandError> {
    let database_url = database_url_from_env()?;
    let store = PgStore::new(create_pool(&database_url).await?);

    let cutoff = Utc::now() - Duration::days(i64::from(grace_days));
    let removed = store.delete_expired_invitations(cutoff).await?;

    tracing::info!(removed, %cutoff, "Expired invitations pruned");
    Ok(removed)
}
