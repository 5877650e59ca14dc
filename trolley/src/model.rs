//! Shopping-list entities and the payload shapes of the list server.
//!
//! Canonical entities always carry a server-assigned id. An entity that does
//! not exist on the server yet is only ever expressed as a payload type
//! (`NewList`, `NewItem`), so a list or item without an id cannot leak into
//! the collection.

use chrono::{DateTime, Utc};
use im::Vector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub purchased: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Membership is array containment; items belong to exactly one list.
    pub items: Vector<Item>,
}

/// Derived per-list projection. Never mutated in place; recomputed from the
/// items whenever membership or a purchased flag changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStatistics {
    pub total: usize,
    pub purchased: usize,
    pub pending: usize,
    /// Rounded completion percentage, 0 to 100. Zero for an empty list.
    pub percentage: u8,
}

/// Payload for creating a list. The id is assigned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewList {
    pub name: String,
    pub description: String,
}

/// Payload for adding an item. New items always start unpurchased; the wire
/// call sends `purchased: false` on the caller's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub notes: String,
}

/// One entry of a fetch response. All four fields are required: the server
/// sends its display projections alongside the canonical list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBundle {
    pub list: ShoppingList,
    pub statistics: ListStatistics,
    pub formatted_date: String,
    pub item_count: usize,
}

/// Response to an item-level mutation: the authoritative post-mutation list
/// plus a human-readable confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUpdate {
    pub list: ShoppingList,
    pub message: String,
}

/// Response to adding an item: the updated list, the created item with its
/// server-assigned id, and a confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAdded {
    pub list: ShoppingList,
    pub item: Item,
    pub message: String,
}
