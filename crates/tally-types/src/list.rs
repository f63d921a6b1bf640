//! Lists, items, and the order key that places lists among their siblings.
//!
//! `List` and `Item` serialise directly as the store's list document
//! (camelCase fields). Missing `items` deserialises as an empty sequence and
//! a missing `quantity` as 1; absence is never an error.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{ItemId, ListId, OwnerId, StatusGroupId, StatusId};

/// Relative position of a list among its siblings.
///
/// Carries no meaning beyond ordering. Compared with `f64::total_cmp`, so the
/// ordering is total even for values a corrupt document might contain.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderKey(f64);

impl OrderKey {
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whether this key can take part in ordering (finite).
    pub fn is_valid(&self) -> bool {
        self.0.is_finite()
    }
}

impl From<f64> for OrderKey {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

impl PartialEq for OrderKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderKey {}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Debug for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderKey({})", self.0)
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_quantity() -> u32 {
    1
}

/// An entry in a list. Its index in `List::items` is its custom order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub status: StatusId,
}

impl Item {
    pub fn new(name: impl Into<String>, quantity: u32, status: StatusId) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            quantity,
            status,
        }
    }
}

/// A top-level list: the unit of persistence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: ListId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub order_key: OrderKey,
    pub status_group_id: StatusGroupId,
}

impl List {
    pub fn new(
        owner_id: OwnerId,
        name: impl Into<String>,
        order_key: OrderKey,
        status_group_id: StatusGroupId,
    ) -> Self {
        Self {
            id: ListId::new(),
            owner_id,
            name: name.into(),
            items: Vec::new(),
            order_key,
            status_group_id,
        }
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn item_index(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_key_total_order() {
        let mut keys = vec![OrderKey::new(3.0), OrderKey::new(-990.0), OrderKey::new(10.0)];
        keys.sort();
        let values: Vec<f64> = keys.iter().map(OrderKey::value).collect();
        assert_eq!(values, [-990.0, 3.0, 10.0]);
    }

    #[test]
    fn test_order_key_validity() {
        assert!(OrderKey::new(1.5).is_valid());
        assert!(!OrderKey::new(f64::NAN).is_valid());
        assert!(!OrderKey::new(f64::INFINITY).is_valid());
    }

    #[test]
    fn test_list_document_missing_items() {
        let json = format!(
            r#"{{"id":"{}","ownerId":"{}","name":"Hardware","orderKey":1700000000000,"statusGroupId":"{}"}}"#,
            ListId::new(),
            OwnerId::new(),
            StatusGroupId::new(),
        );
        let list: List = serde_json::from_str(&json).unwrap();
        assert!(list.items.is_empty());
        assert_eq!(list.order_key.value(), 1_700_000_000_000.0);
    }

    #[test]
    fn test_item_missing_quantity_defaults_to_one() {
        let json = format!(r#"{{"id":"{}","name":"Nails","status":"{}"}}"#, ItemId::new(), StatusId::new());
        let item: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_list_serializes_camel_case() {
        let list = List::new(OwnerId::new(), "Hardware", OrderKey::new(10.0), StatusGroupId::new());
        let value = serde_json::to_value(&list).unwrap();
        assert!(value.get("ownerId").is_some());
        assert!(value.get("orderKey").is_some());
        assert!(value.get("statusGroupId").is_some());
        assert_eq!(value["items"], serde_json::json!([]));
    }
}
