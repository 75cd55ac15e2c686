//! Checklist definition documents: the on-disk/request-body JSON shapes
//! that the merger (C2) consumes. Missing top-level keys are tolerated —
//! the loader injects empty shapes rather than erroring.

use super::models::ChecklistItem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `{items: [...]}`, the shape shared by `default` and each `house_types`/
/// `room_types` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemGroup {
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

/// A full checklist definition document: `default.items`, a map of typed
/// axes (`house_types.*` or `room_types.*`), and, for products, a
/// top-level `items` list used directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecklistDefinition {
    #[serde(default)]
    pub default: ItemGroup,
    #[serde(default, rename = "house_types")]
    pub house_types: BTreeMap<String, ItemGroup>,
    #[serde(default, rename = "room_types")]
    pub room_types: BTreeMap<String, ItemGroup>,
    /// Top-level `items`, used by the products definition either instead
    /// of or alongside `default.items`.
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

impl ChecklistDefinition {
    /// The set of ids recognized along a given typed axis, used to filter
    /// classifier output down to allowed values.
    pub fn allowed_house_types(&self) -> Vec<String> {
        self.house_types.keys().cloned().collect()
    }

    pub fn allowed_room_types(&self) -> Vec<String> {
        self.room_types.keys().cloned().collect()
    }

    /// Product definitions may carry their items under a bare top-level
    /// `items` key, or nested under `default.items` like the others.
    /// Top-level takes precedence when both are present.
    pub fn product_items(&self) -> &[ChecklistItem] {
        if !self.items.is_empty() {
            &self.items
        } else {
            &self.default.items
        }
    }

    /// Client-supplied house/room checklists may arrive as a flat
    /// `{items: [...]}` document instead of the `default`/`house_types`
    /// tree shape. When `default.items` is empty and a top-level `items`
    /// list is present, treat the flat list as the default set so
    /// `merge_house`/`merge_room` work unchanged: tolerate both shapes
    /// without guessing further.
    pub fn coerce_flat_shape(mut self) -> Self {
        if self.default.items.is_empty() && !self.items.is_empty() {
            self.default.items = self.items.clone();
        }
        self
    }
}

/// `custom.room_level[*]`: a per-room block of additional checklist items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomLevelCustom {
    pub room_id: String,
    #[serde(default)]
    pub custom_items: Vec<ChecklistItem>,
}

/// `custom.product_level[*]`: additional items scoped to a product id;
/// each custom item's final id becomes `{product_id}__{item.id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductLevelCustom {
    pub product_id: String,
    #[serde(default)]
    pub custom_items: Vec<ChecklistItem>,
}

/// The user-supplied custom checklist tree: global items plus
/// house/room/product-scoped additions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomChecklist {
    #[serde(default)]
    pub global: Vec<ChecklistItem>,
    #[serde(default)]
    pub house_level: Vec<ChecklistItem>,
    #[serde(default)]
    pub room_level: Vec<RoomLevelCustom>,
    #[serde(default)]
    pub product_level: Vec<ProductLevelCustom>,
}
