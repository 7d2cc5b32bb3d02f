//! Filtering and sorting over pantry items.
//!
//! Every predicate and comparator here is total: missing optional fields never
//! match a field-specific filter and always sort after present values, in
//! either direction.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::expiry::{ExpiryFilter, ExpiryStatus};
use crate::locations::{Room, room_for_area};

/// Read access to the fields the filters look at.
pub trait ItemView {
    fn name(&self) -> &str;
    fn brand(&self) -> Option<&str>;
    fn category(&self) -> Option<&str>;
    fn location(&self) -> Option<&str>;
    fn expiry(&self) -> Option<NaiveDate>;
    fn purchase_date(&self) -> Option<NaiveDate>;
    fn added_at(&self) -> DateTime<Utc>;
    /// Percentage remaining; `None` and 100 both mean unopened.
    fn completion(&self) -> Option<i32>;

    /// Fully consumed items have a completion of exactly zero.
    fn is_used_up(&self) -> bool {
        self.completion() == Some(0)
    }
}

/// Sort key for item listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    Expiry,
    PurchaseDate,
    #[default]
    Added,
    Location,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "expiry" => Ok(Self::Expiry),
            "purchase_date" | "purchase-date" => Ok(Self::PurchaseDate),
            "added" | "created_at" => Ok(Self::Added),
            "location" => Ok(Self::Location),
            _ => Err(format!("invalid sort key: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(format!("invalid sort direction: {s}")),
        }
    }
}

/// A composable query over an in-memory set of items.
///
/// ```
/// use larder_core::{ItemQuery, SortKey, ExpiryFilter};
///
/// let query = ItemQuery {
///     search: Some("milk".to_owned()),
///     expiry: Some(ExpiryFilter::Week),
///     hide_used: true,
///     sort: SortKey::Expiry,
///     ..ItemQuery::default()
/// };
/// assert!(query.hide_used);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    /// Case-insensitive substring matched against name, brand and category.
    pub search: Option<String>,
    /// Keep items whose location is one of the room's catalogued areas.
    pub room: Option<Room>,
    /// Keep items whose location equals this area (case-insensitive).
    pub storage_area: Option<String>,
    pub expiry: Option<ExpiryFilter>,
    /// Drop items whose completion is zero.
    pub hide_used: bool,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl Default for ItemQuery {
    /// Everything, newest first.
    fn default() -> Self {
        Self {
            search: None,
            room: None,
            storage_area: None,
            expiry: None,
            hide_used: false,
            sort: SortKey::Added,
            direction: SortDirection::Desc,
        }
    }
}

impl ItemQuery {
    /// Returns true if `item` passes every active filter.
    pub fn matches<T: ItemView>(&self, item: &T, today: NaiveDate) -> bool {
        if self.hide_used && item.is_used_up() {
            return false;
        }

        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let hit = [Some(item.name()), item.brand(), item.category()]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(room) = self.room
            && item.location().and_then(room_for_area) != Some(room)
        {
            return false;
        }

        if let Some(area) = self.storage_area.as_deref().map(str::trim)
            && !item
                .location()
                .is_some_and(|loc| loc.trim().eq_ignore_ascii_case(area))
        {
            return false;
        }

        if let Some(filter) = self.expiry
            && !filter.matches(ExpiryStatus::classify(item.expiry(), today))
        {
            return false;
        }

        true
    }

    /// Order two items by the configured key and direction.
    pub fn compare<T: ItemView>(&self, a: &T, b: &T) -> Ordering {
        let primary = match self.sort {
            SortKey::Name => self.directed(a.name().to_lowercase().cmp(&b.name().to_lowercase())),
            SortKey::Expiry => missing_last(a.expiry(), b.expiry(), self.direction),
            SortKey::PurchaseDate => {
                missing_last(a.purchase_date(), b.purchase_date(), self.direction)
            }
            SortKey::Added => self.directed(a.added_at().cmp(&b.added_at())),
            SortKey::Location => missing_last(
                a.location().map(str::to_lowercase),
                b.location().map(str::to_lowercase),
                self.direction,
            ),
        };

        primary.then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
    }

    /// Filter and sort `items`.
    pub fn apply<T: ItemView>(&self, items: Vec<T>, today: NaiveDate) -> Vec<T> {
        let mut kept: Vec<T> = items
            .into_iter()
            .filter(|item| self.matches(item, today))
            .collect();
        kept.sort_by(|a, b| self.compare(a, b));
        kept
    }

    const fn directed(&self, ordering: Ordering) -> Ordering {
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

fn missing_last<V: Ord>(a: Option<V>, b: Option<V>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            SortDirection::Asc => a.cmp(&b),
            SortDirection::Desc => b.cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[derive(Debug, Clone)]
    struct Item {
        name: &'static str,
        brand: Option<&'static str>,
        category: Option<&'static str>,
        location: Option<&'static str>,
        expiry: Option<NaiveDate>,
        purchase_date: Option<NaiveDate>,
        added_at: DateTime<Utc>,
        completion: Option<i32>,
    }

    impl ItemView for Item {
        fn name(&self) -> &str {
            self.name
        }
        fn brand(&self) -> Option<&str> {
            self.brand
        }
        fn category(&self) -> Option<&str> {
            self.category
        }
        fn location(&self) -> Option<&str> {
            self.location
        }
        fn expiry(&self) -> Option<NaiveDate> {
            self.expiry
        }
        fn purchase_date(&self) -> Option<NaiveDate> {
            self.purchase_date
        }
        fn added_at(&self) -> DateTime<Utc> {
            self.added_at
        }
        fn completion(&self) -> Option<i32> {
            self.completion
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn item(name: &'static str) -> Item {
        Item {
            name,
            brand: None,
            category: None,
            location: None,
            expiry: None,
            purchase_date: None,
            added_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            completion: None,
        }
    }

    fn names(items: &[Item]) -> Vec<&'static str> {
        items.iter().map(|i| i.name).collect()
    }

    #[test]
    fn test_search_covers_name_brand_and_category() {
        let items = vec![
            Item {
                brand: Some("Oatly"),
                ..item("Barista")
            },
            Item {
                category: Some("Dairy"),
                ..item("Cheddar")
            },
            item("Oat Milk"),
            item("Rice"),
        ];
        let query = ItemQuery {
            search: Some("OAT".to_owned()),
            sort: SortKey::Name,
            direction: SortDirection::Asc,
            ..ItemQuery::default()
        };
        assert_eq!(names(&query.apply(items.clone(), today())), ["Barista", "Oat Milk"]);

        let dairy = ItemQuery {
            search: Some("dair".to_owned()),
            ..ItemQuery::default()
        };
        assert_eq!(names(&dairy.apply(items, today())), ["Cheddar"]);
    }

    #[test]
    fn test_blank_search_matches_everything() {
        let query = ItemQuery {
            search: Some("   ".to_owned()),
            ..ItemQuery::default()
        };
        assert!(query.matches(&item("Anything"), today()));
    }

    #[test]
    fn test_room_and_area_filters() {
        let items = vec![
            Item {
                location: Some("Fridge"),
                ..item("Milk")
            },
            Item {
                location: Some("Chest Freezer"),
                ..item("Peas")
            },
            Item {
                location: Some("Shoebox"),
                ..item("Batteries")
            },
            item("Unplaced"),
        ];

        let kitchen = ItemQuery {
            room: Some(Room::Kitchen),
            ..ItemQuery::default()
        };
        assert_eq!(names(&kitchen.apply(items.clone(), today())), ["Milk"]);

        let area = ItemQuery {
            storage_area: Some("chest freezer".to_owned()),
            ..ItemQuery::default()
        };
        assert_eq!(names(&area.apply(items, today())), ["Peas"]);
    }

    #[test]
    fn test_hide_used_drops_only_zero_completion() {
        let items = vec![
            Item {
                completion: Some(0),
                ..item("Empty")
            },
            Item {
                completion: Some(40),
                ..item("Half")
            },
            Item {
                completion: None,
                ..item("New")
            },
        ];
        let query = ItemQuery {
            hide_used: true,
            sort: SortKey::Name,
            direction: SortDirection::Asc,
            ..ItemQuery::default()
        };
        assert_eq!(names(&query.apply(items, today())), ["Half", "New"]);
    }

    #[test]
    fn test_week_filter_includes_finer_buckets() {
        let t = today();
        let items = vec![
            Item {
                expiry: Some(t),
                ..item("Today")
            },
            Item {
                expiry: Some(t + Duration::days(2)),
                ..item("Soon")
            },
            Item {
                expiry: Some(t + Duration::days(6)),
                ..item("Later")
            },
            Item {
                expiry: Some(t + Duration::days(20)),
                ..item("Fine")
            },
            Item {
                expiry: Some(t - Duration::days(1)),
                ..item("Gone")
            },
            item("Forever"),
        ];
        let query = ItemQuery {
            expiry: Some(ExpiryFilter::Week),
            sort: SortKey::Expiry,
            direction: SortDirection::Asc,
            ..ItemQuery::default()
        };
        assert_eq!(names(&query.apply(items, t)), ["Today", "Soon", "Later"]);
    }

    #[test]
    fn test_missing_values_sort_last_in_both_directions() {
        let t = today();
        let items = vec![
            item("NoDate"),
            Item {
                expiry: Some(t + Duration::days(5)),
                ..item("Five")
            },
            Item {
                expiry: Some(t + Duration::days(1)),
                ..item("One")
            },
        ];

        let asc = ItemQuery {
            sort: SortKey::Expiry,
            direction: SortDirection::Asc,
            ..ItemQuery::default()
        };
        assert_eq!(names(&asc.apply(items.clone(), t)), ["One", "Five", "NoDate"]);

        let desc = ItemQuery {
            direction: SortDirection::Desc,
            ..asc
        };
        assert_eq!(names(&desc.apply(items, t)), ["Five", "One", "NoDate"]);
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let items = vec![
            Item {
                added_at: base,
                ..item("Old")
            },
            Item {
                added_at: base + Duration::hours(3),
                ..item("New")
            },
        ];
        assert_eq!(names(&ItemQuery::default().apply(items, today())), ["New", "Old"]);
    }

    #[test]
    fn test_location_sort_is_case_insensitive() {
        let items = vec![
            Item {
                location: Some("pantry Shelves"),
                ..item("B")
            },
            Item {
                location: Some("Fridge"),
                ..item("A")
            },
            item("C"),
        ];
        let query = ItemQuery {
            sort: SortKey::Location,
            direction: SortDirection::Asc,
            ..ItemQuery::default()
        };
        assert_eq!(names(&query.apply(items, today())), ["A", "B", "C"]);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("purchase-date".parse::<SortKey>(), Ok(SortKey::PurchaseDate));
        assert_eq!("created_at".parse::<SortKey>(), Ok(SortKey::Added));
        assert!("color".parse::<SortKey>().is_err());
        assert_eq!("desc".parse::<SortDirection>(), Ok(SortDirection::Desc));
    }
}
