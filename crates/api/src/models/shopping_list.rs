//! Shopping list entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{PantryItemId, ShoppingListEntryId, UserId};

use super::PantryItem;

/// A request to repurchase a pantry item. At most one per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingListEntry {
    pub id: ShoppingListEntryId,
    pub item_id: PantryItemId,
    pub added_by: UserId,
    pub added_at: DateTime<Utc>,
}

/// An entry joined with the current state of its item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    #[serde(flatten)]
    pub entry: ShoppingListEntry,
    pub item: PantryItem,
}
