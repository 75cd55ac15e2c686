//! Checklist Merger (C2).
//!
//! Combines default + type-specific + custom checklist items into a
//! single deduplicated, order-preserving list: concatenate in a fixed
//! order, then dedupe by id keeping the *last* occurrence while
//! preserving the original relative order of the surviving entries.

use super::checklist_def::{ChecklistDefinition, CustomChecklist};
use super::models::ChecklistItem;

/// Remove duplicate items by id, keeping the last occurrence, while
/// preserving the original relative order of whichever occurrence
/// survives. Implemented by walking in reverse, keeping the first-seen id,
/// then reversing back — this keeps the last occurrence's *content* at the
/// position of the *first* occurrence's slot in the reversed walk, which
/// nets out to: survivors appear in the order their id first became
/// relevant, carrying the data from the last time that id appeared.
pub fn dedupe_last_wins(items: Vec<ChecklistItem>) -> Vec<ChecklistItem> {
    let mut seen = std::collections::HashSet::new();
    let mut out: Vec<ChecklistItem> = Vec::with_capacity(items.len());

    for item in items.into_iter().rev() {
        if seen.insert(item.id.clone()) {
            out.push(item);
        }
    }

    out.reverse();
    out
}

/// `merge_house(def, house_types, custom) -> items`
pub fn merge_house(
    def: &ChecklistDefinition,
    house_types: &[String],
    custom: Option<&CustomChecklist>,
) -> Vec<ChecklistItem> {
    let mut items = Vec::new();

    items.extend(def.default.items.iter().cloned());

    for house_type in house_types {
        if let Some(group) = def.house_types.get(house_type) {
            items.extend(group.items.iter().cloned());
        }
    }

    if let Some(custom) = custom {
        items.extend(custom.global.iter().cloned());
        items.extend(custom.house_level.iter().cloned());
    }

    dedupe_last_wins(items)
}

/// `merge_room(def, room_types, room_id, custom) -> items`
pub fn merge_room(
    def: &ChecklistDefinition,
    room_types: &[String],
    room_id: &str,
    custom: Option<&CustomChecklist>,
) -> Vec<ChecklistItem> {
    let mut items = Vec::new();

    items.extend(def.default.items.iter().cloned());

    for room_type in room_types {
        if let Some(group) = def.room_types.get(room_type) {
            items.extend(group.items.iter().cloned());
        }
    }

    if let Some(custom) = custom {
        items.extend(custom.global.iter().cloned());

        for entry in &custom.room_level {
            if entry.room_id == room_id {
                items.extend(entry.custom_items.iter().cloned());
            }
        }
    }

    dedupe_last_wins(items)
}

/// `merge_products(def, custom, whitelist) -> items`
///
/// Unlike `merge_house`/`merge_room`, product items are not room-type
/// filtered, so this takes no room identifier.
pub fn merge_products(
    def: &ChecklistDefinition,
    custom: Option<&CustomChecklist>,
    whitelist: Option<&[String]>,
) -> Vec<ChecklistItem> {
    let mut items: Vec<ChecklistItem> = def.product_items().to_vec();

    if let Some(whitelist) = whitelist {
        let allowed: std::collections::HashSet<&str> =
            whitelist.iter().map(|s| s.as_str()).collect();
        items.retain(|item| allowed.contains(item.id.as_str()));
    }

    if let Some(custom) = custom {
        for entry in &custom.product_level {
            for new_item in &entry.custom_items {
                let mut cloned = new_item.clone();
                cloned.id = format!("{}__{}", entry.product_id, cloned.id);
                items.push(cloned);
            }
        }
    }

    dedupe_last_wins(items)
}

/// Filter classified types down to the allowed set. An empty result is
/// permitted.
pub fn filter_allowed_types(detected: &[String], allowed: &[String]) -> Vec<String> {
    let allowed_set: std::collections::HashSet<&str> = allowed.iter().map(|s| s.as_str()).collect();
    detected
        .iter()
        .filter(|t| allowed_set.contains(t.as_str()))
        .cloned()
        .collect()
}
