//! Static catalog of rooms and the storage areas inside them.
//!
//! Items store their location as the free-text storage-area name. The catalog
//! is what clients offer in pickers and what the room filter expands to; it is
//! not enforced on write, so custom areas are allowed and simply belong to no
//! room.

use serde::{Deserialize, Serialize};

/// Errors from catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("unknown room: {0}")]
    UnknownRoom(String),
}

/// A room in the home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Room {
    Kitchen,
    Pantry,
    Garage,
    Basement,
    UtilityRoom,
    Bathroom,
}

impl Room {
    /// Every room, in display order.
    pub const ALL: [Self; 6] = [
        Self::Kitchen,
        Self::Pantry,
        Self::Garage,
        Self::Basement,
        Self::UtilityRoom,
        Self::Bathroom,
    ];

    /// Human-readable room name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Kitchen => "Kitchen",
            Self::Pantry => "Pantry",
            Self::Garage => "Garage",
            Self::Basement => "Basement",
            Self::UtilityRoom => "Utility Room",
            Self::Bathroom => "Bathroom",
        }
    }

    /// Storage areas inside this room.
    #[must_use]
    pub const fn storage_areas(self) -> &'static [&'static str] {
        match self {
            Self::Kitchen => &[
                "Fridge",
                "Freezer",
                "Upper Cabinets",
                "Lower Cabinets",
                "Countertop",
                "Spice Rack",
                "Drawers",
            ],
            Self::Pantry => &["Pantry Shelves", "Bulk Bins", "Bottom Shelf"],
            Self::Garage => &["Chest Freezer", "Garage Fridge", "Garage Shelving"],
            Self::Basement => &["Cold Storage", "Wine Rack", "Basement Shelving"],
            Self::UtilityRoom => &["Utility Cabinet", "Cleaning Shelf"],
            Self::Bathroom => &["Medicine Cabinet", "Under Sink"],
        }
    }

    /// Returns true if `area` (case-insensitive) is one of this room's storage areas.
    #[must_use]
    pub fn contains(self, area: &str) -> bool {
        let area = area.trim();
        self.storage_areas()
            .iter()
            .any(|known| known.eq_ignore_ascii_case(area))
    }
}

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Room {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|room| {
                room.label().eq_ignore_ascii_case(wanted)
                    || room.label().replace(' ', "_").eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| LocationError::UnknownRoom(wanted.to_owned()))
    }
}

/// Find the room that holds a storage area, if the area is in the catalog.
#[must_use]
pub fn room_for_area(area: &str) -> Option<Room> {
    Room::ALL.into_iter().find(|room| room.contains(area))
}
