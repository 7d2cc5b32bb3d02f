//! Pantry items and their create/update payloads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{HouseholdId, ItemView, PantryItemId, UserId};

use super::{ValidationError, deserialize_some, normalize_text, parse_date, require_id};

const MAX_NAME_LENGTH: usize = 200;
const MAX_TAGS: usize = 20;

/// A tracked physical good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PantryItem {
    pub id: PantryItemId,
    pub household_id: HouseholdId,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub quantity: i32,
    /// Percentage remaining, 0-100. `None` and 100 both mean unopened.
    pub completion: Option<i32>,
    pub expiry: Option<NaiveDate>,
    pub purchase_date: Option<NaiveDate>,
    /// Free-text storage area, e.g. "Fridge".
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub barcode: Option<String>,
    /// Reference into the image store.
    pub image: Option<String>,
    pub created_by: UserId,
    pub scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ItemView for PantryItem {
    fn name(&self) -> &str {
        &self.name
    }

    fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn expiry(&self) -> Option<NaiveDate> {
        self.expiry
    }

    fn purchase_date(&self) -> Option<NaiveDate> {
        self.purchase_date
    }

    fn added_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn completion(&self) -> Option<i32> {
        self.completion
    }
}

/// Validated fields for a new item. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPantryItem {
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub quantity: i32,
    pub completion: Option<i32>,
    pub expiry: Option<NaiveDate>,
    pub purchase_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub barcode: Option<String>,
    pub image: Option<String>,
    pub scanned_at: Option<DateTime<Utc>>,
}

impl NewPantryItem {
    /// Minimal item with defaults applied: one unit, unopened.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            brand: None,
            category: None,
            quantity: 1,
            completion: Some(100),
            expiry: None,
            purchase_date: None,
            location: None,
            tags: Vec::new(),
            notes: None,
            barcode: None,
            image: None,
            scanned_at: None,
        }
    }

    /// Copy every descriptive field of `item` as a fresh, unopened item.
    #[must_use]
    pub fn copy_of(item: &PantryItem) -> Self {
        Self {
            name: item.name.clone(),
            brand: item.brand.clone(),
            category: item.category.clone(),
            quantity: item.quantity,
            completion: Some(100),
            expiry: item.expiry,
            purchase_date: item.purchase_date,
            location: item.location.clone(),
            tags: item.tags.clone(),
            notes: item.notes.clone(),
            barcode: item.barcode.clone(),
            image: item.image.clone(),
            scanned_at: item.scanned_at,
        }
    }
}

/// Body of `POST /pantry-items`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PantryItemRequest {
    pub household_id: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i32>,
    pub completion: Option<i32>,
    pub expiry: Option<String>,
    pub purchase_date: Option<String>,
    pub location: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub barcode: Option<String>,
    pub image: Option<String>,
    pub scanned_at: Option<DateTime<Utc>>,
}

impl PantryItemRequest {
    /// Validate into the target household and the item to create.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(self) -> Result<(HouseholdId, NewPantryItem), ValidationError> {
        let household_id = require_id(self.household_id.as_deref(), "household_id")?;
        let name = validate_name(self.name)?.ok_or_else(|| ValidationError::missing("name"))?;

        let item = NewPantryItem {
            name,
            brand: normalize_text(self.brand),
            category: normalize_text(self.category),
            quantity: self.quantity.map(validate_quantity).transpose()?.unwrap_or(1),
            completion: Some(
                self.completion
                    .map(validate_completion)
                    .transpose()?
                    .unwrap_or(100),
            ),
            expiry: parse_date(self.expiry, "expiry")?,
            purchase_date: parse_date(self.purchase_date, "purchase_date")?,
            location: normalize_text(self.location),
            tags: normalize_tags(self.tags.unwrap_or_default())?,
            notes: normalize_text(self.notes),
            barcode: normalize_text(self.barcode),
            image: normalize_text(self.image),
            scanned_at: self.scanned_at,
        };
        Ok((household_id, item))
    }
}

/// Body of `PUT /pantry-items`.
///
/// Absent fields are left untouched. For nullable fields an explicit `null`
/// (or a blank string) clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PantryItemPatch {
    pub name: Option<String>,
    #[serde(deserialize_with = "deserialize_some")]
    pub brand: Option<Option<String>>,
    #[serde(deserialize_with = "deserialize_some")]
    pub category: Option<Option<String>>,
    pub quantity: Option<i32>,
    #[serde(deserialize_with = "deserialize_some")]
    pub completion: Option<Option<i32>>,
    #[serde(deserialize_with = "deserialize_some")]
    pub expiry: Option<Option<String>>,
    #[serde(deserialize_with = "deserialize_some")]
    pub purchase_date: Option<Option<String>>,
    #[serde(deserialize_with = "deserialize_some")]
    pub location: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
    #[serde(deserialize_with = "deserialize_some")]
    pub barcode: Option<Option<String>>,
    #[serde(deserialize_with = "deserialize_some")]
    pub image: Option<Option<String>>,
    #[serde(deserialize_with = "deserialize_some")]
    pub scanned_at: Option<Option<DateTime<Utc>>>,
}

impl PantryItemPatch {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for malformed fields or an empty patch.
    pub fn validate(self) -> Result<ItemChanges, ValidationError> {
        let changes = ItemChanges {
            name: match self.name {
                Some(raw) => Some(validate_name(Some(raw))?.ok_or_else(|| {
                    ValidationError::new("name", "cannot be blank")
                })?),
                None => None,
            },
            brand: self.brand.map(normalize_text),
            category: self.category.map(normalize_text),
            quantity: self.quantity.map(validate_quantity).transpose()?,
            completion: self
                .completion
                .map(|c| c.map(validate_completion).transpose())
                .transpose()?,
            expiry: self
                .expiry
                .map(|d| parse_date(d, "expiry"))
                .transpose()?,
            purchase_date: self
                .purchase_date
                .map(|d| parse_date(d, "purchase_date"))
                .transpose()?,
            location: self.location.map(normalize_text),
            tags: self.tags.map(normalize_tags).transpose()?,
            notes: self.notes.map(normalize_text),
            barcode: self.barcode.map(normalize_text),
            image: self.image.map(normalize_text),
            scanned_at: self.scanned_at,
        };

        if changes.is_empty() {
            return Err(ValidationError::new("body", "no fields to update"));
        }
        Ok(changes)
    }
}

/// A validated partial update. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub brand: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub quantity: Option<i32>,
    pub completion: Option<Option<i32>>,
    pub expiry: Option<Option<NaiveDate>>,
    pub purchase_date: Option<Option<NaiveDate>>,
    pub location: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<Option<String>>,
    pub barcode: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub scanned_at: Option<Option<DateTime<Utc>>>,
}

impl ItemChanges {
    /// Mark the item fully consumed.
    #[must_use]
    pub fn mark_used() -> Self {
        Self {
            completion: Some(Some(0)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(self, item: &mut PantryItem) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(brand) = self.brand {
            item.brand = brand;
        }
        if let Some(category) = self.category {
            item.category = category;
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(completion) = self.completion {
            item.completion = completion;
        }
        if let Some(expiry) = self.expiry {
            item.expiry = expiry;
        }
        if let Some(purchase_date) = self.purchase_date {
            item.purchase_date = purchase_date;
        }
        if let Some(location) = self.location {
            item.location = location;
        }
        if let Some(tags) = self.tags {
            item.tags = tags;
        }
        if let Some(notes) = self.notes {
            item.notes = notes;
        }
        if let Some(barcode) = self.barcode {
            item.barcode = barcode;
        }
        if let Some(image) = self.image {
            item.image = image;
        }
        if let Some(scanned_at) = self.scanned_at {
            item.scanned_at = scanned_at;
        }
    }
}

fn validate_name(raw: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(name) = normalize_text(raw) else {
        return Ok(None);
    };
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::new(
            "name",
            format!("must be at most {MAX_NAME_LENGTH} characters"),
        ));
    }
    Ok(Some(name))
}

fn validate_quantity(quantity: i32) -> Result<i32, ValidationError> {
    if quantity < 0 {
        return Err(ValidationError::new("quantity", "cannot be negative"));
    }
    Ok(quantity)
}

fn validate_completion(completion: i32) -> Result<i32, ValidationError> {
    if !(0..=100).contains(&completion) {
        return Err(ValidationError::new("completion", "must be between 0 and 100"));
    }
    Ok(completion)
}

/// Trim, drop blanks and duplicates (case-insensitive), keep first spelling.
fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>, ValidationError> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        out.push(tag.to_owned());
    }
    if out.len() > MAX_TAGS {
        return Err(ValidationError::new(
            "tags",
            format!("at most {MAX_TAGS} tags allowed"),
        ));
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(json: &str) -> PantryItemRequest {
        serde_json::from_str(json).unwrap()
    }

    fn patch(json: &str) -> Result<ItemChanges, ValidationError> {
        serde_json::from_str::<PantryItemPatch>(json).unwrap().validate()
    }

    #[test]
    fn test_create_applies_defaults() {
        let id = uuid::Uuid::new_v4();
        let (household, item) = request(&format!(
            r#"{{"household_id":"{id}","name":" Milk ","brand":"","expiry":""}}"#
        ))
        .validate()
        .unwrap();

        assert_eq!(household.as_uuid(), id);
        assert_eq!(item.name, "Milk");
        assert_eq!(item.quantity, 1);
        assert_eq!(item.completion, Some(100));
        assert_eq!(item.brand, None);
        assert_eq!(item.expiry, None);
    }

    #[test]
    fn test_create_requires_household_and_name() {
        let err = request(r#"{"name":"Milk"}"#).validate().unwrap_err();
        assert_eq!(err.field, "household_id");

        let id = uuid::Uuid::new_v4();
        let err = request(&format!(r#"{{"household_id":"{id}","name":"  "}}"#))
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn test_create_rejects_out_of_range_completion() {
        let id = uuid::Uuid::new_v4();
        let err = request(&format!(
            r#"{{"household_id":"{id}","name":"Rice","completion":101}}"#
        ))
        .validate()
        .unwrap_err();
        assert_eq!(err.field, "completion");
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let changes = patch(r#"{"brand":null,"quantity":3}"#).unwrap();
        assert_eq!(changes.brand, Some(None));
        assert_eq!(changes.quantity, Some(3));
        assert_eq!(changes.category, None);
    }

    #[test]
    fn test_patch_normalizes_blank_to_null() {
        let changes = patch(r#"{"notes":"   ","expiry":""}"#).unwrap();
        assert_eq!(changes.notes, Some(None));
        assert_eq!(changes.expiry, Some(None));
    }

    #[test]
    fn test_patch_rejects_empty_and_blank_name() {
        assert_eq!(patch("{}").unwrap_err().field, "body");
        assert_eq!(patch(r#"{"name":" "}"#).unwrap_err().field, "name");
    }

    #[test]
    fn test_completion_may_increase_after_used() {
        let changes = patch(r#"{"completion":50}"#).unwrap();
        let mut item = sample_item();
        item.completion = Some(0);
        changes.apply_to(&mut item);
        assert_eq!(item.completion, Some(50));
    }

    #[test]
    fn test_tags_are_deduplicated() {
        let raw = vec![
            "Dairy".to_owned(),
            " dairy ".to_owned(),
            String::new(),
            "Vegan".to_owned(),
        ];
        let tags = normalize_tags(raw).unwrap();
        assert_eq!(tags, vec!["Dairy".to_owned(), "Vegan".to_owned()]);
    }

    #[test]
    fn test_copy_of_resets_completion_and_keeps_scan_time() {
        let mut item = sample_item();
        item.completion = Some(10);
        item.scanned_at = Some(Utc::now());
        let copy = NewPantryItem::copy_of(&item);
        assert_eq!(copy.completion, Some(100));
        assert_eq!(copy.scanned_at, item.scanned_at);
        assert_eq!(copy.name, item.name);
    }

    fn sample_item() -> PantryItem {
        PantryItem {
            id: PantryItemId::generate(),
            household_id: HouseholdId::generate(),
            name: "Milk".into(),
            brand: Some("Oatly".into()),
            category: Some("Dairy".into()),
            quantity: 1,
            completion: Some(100),
            expiry: None,
            purchase_date: None,
            location: Some("Fridge".into()),
            tags: vec![],
            notes: None,
            barcode: None,
            image: None,
            created_by: UserId::generate(),
            scanned_at: None,
            created_at: Utc::now(),
        }
    }
}
