//! Caller identity and the user directory.

use serde::{Deserialize, Serialize};

use larder_core::{Email, UserId};

/// The authenticated caller, as asserted by the identity provider's token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    /// Absent when the token carries no (valid) email claim.
    pub email: Option<Email>,
}

/// A registered account, mirrored from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub display_name: Option<String>,
}
