//! Domain models for the API.
//!
//! Request bodies are deserialized into loosely-typed `*Request` structs and
//! then validated into the types services accept. Validation happens before
//! any authorization or storage call.

pub mod household;
pub mod invitation;
pub mod pantry_item;
pub mod shopping_list;
pub mod user;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

pub use household::{Household, HouseholdMember, HouseholdName};
pub use invitation::{Delivery, Invitation, InviteOutcome, NewInvitation};
pub use pantry_item::{ItemChanges, NewPantryItem, PantryItem, PantryItemPatch, PantryItemRequest};
pub use shopping_list::{ShoppingListEntry, ShoppingListItem};
pub use user::{CurrentUser, UserProfile};

/// A request field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field as the client sent it.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub fn missing(field: &'static str) -> Self {
        Self::new(field, "is required")
    }
}

/// Parse a required id field from its string form.
pub fn require_id<T: From<uuid::Uuid>>(
    raw: Option<&str>,
    field: &'static str,
) -> Result<T, ValidationError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ValidationError::missing(field))?;
    larder_core::parse_id(raw).map_err(|_| ValidationError::new(field, "must be a UUID"))
}

/// Trim a text field; blank becomes `None`.
pub(crate) fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// Parse a `YYYY-MM-DD` date; blank becomes `None`.
pub(crate) fn parse_date(
    value: Option<String>,
    field: &'static str,
) -> Result<Option<NaiveDate>, ValidationError> {
    normalize_text(value)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| ValidationError::new(field, "must be a date (YYYY-MM-DD)"))
        })
        .transpose()
}

/// Distinguish an explicit `null` from an absent field.
///
/// Use with `#[serde(default, deserialize_with = "deserialize_some")]` on an
/// `Option<Option<T>>`: absent is `None`, `null` is `Some(None)`.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use larder_core::HouseholdId;

    use super::*;

    #[test]
    fn test_require_id() {
        let id = uuid::Uuid::new_v4();
        let parsed: HouseholdId = require_id(Some(&id.to_string()), "household_id").unwrap();
        assert_eq!(parsed.as_uuid(), id);

        let missing = require_id::<HouseholdId>(None, "household_id").unwrap_err();
        assert_eq!(missing.to_string(), "household_id: is required");

        let blank = require_id::<HouseholdId>(Some("  "), "household_id").unwrap_err();
        assert_eq!(blank, ValidationError::missing("household_id"));

        let bad = require_id::<HouseholdId>(Some("42"), "household_id").unwrap_err();
        assert_eq!(bad.message, "must be a UUID");
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(Some("  Oat  ".into())), Some("Oat".into()));
        assert_eq!(normalize_text(Some("   ".into())), None);
        assert_eq!(normalize_text(None), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date(Some("2024-01-01".into()), "expiry").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(parse_date(Some(String::new()), "expiry").unwrap(), None);
        assert!(parse_date(Some("01/02/2024".into()), "expiry").is_err());
    }
}
