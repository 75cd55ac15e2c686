//! Integration coverage for the model response normalizer (C3): option
//! normalization, JSON extraction from chatty model output, and the
//! invariant that a normalized result's key set always equals the
//! batch's expected id set.

use homescan_core::domain::{ChecklistItem, ItemKind};
use homescan_core::normalize::{extract_json_object, normalize_option_value, normalize_response};

#[test]
fn extract_json_object_pulls_braces_out_of_chatty_prose() {
    let raw = "Sure, here you go:\n```json\n{\"booleans\": {\"damage\": true}}\n```\nHope that helps!";
    let value = extract_json_object(raw).expect("should find the embedded object");
    assert_eq!(value["booleans"]["damage"], true);
}

#[test]
fn extract_json_object_returns_none_for_unparseable_text() {
    assert!(extract_json_object("not json at all").is_none());
}

#[test]
fn normalize_option_value_matches_case_insensitively_with_canonical_casing() {
    let allowed = vec!["Poor".to_string(), "Average".to_string(), "Good".to_string()];
    assert_eq!(normalize_option_value(Some("good"), Some(&allowed)), "Good");
}

#[test]
fn normalize_option_value_falls_back_to_na_entry_when_present() {
    let allowed = vec!["Poor".to_string(), "N/A".to_string()];
    assert_eq!(normalize_option_value(Some("nonsense"), Some(&allowed)), "N/A");
}

#[test]
fn normalize_option_value_falls_back_to_first_option_when_no_na_entry() {
    let allowed = vec!["Poor".to_string(), "Average".to_string()];
    assert_eq!(normalize_option_value(Some("nonsense"), Some(&allowed)), "Poor");
}

#[test]
fn normalize_option_value_with_no_allowed_list_passes_through_or_defaults_to_na() {
    assert_eq!(normalize_option_value(Some("whatever"), None), "whatever");
    assert_eq!(normalize_option_value(None, None), "N/A");
    assert_eq!(normalize_option_value(Some("  "), None), "N/A");
}

fn expected_items() -> Vec<ChecklistItem> {
    vec![
        ChecklistItem::boolean("damage"),
        ChecklistItem::categorical("wall", vec!["Poor".into(), "Average".into(), "Good".into(), "Excellent".into()]),
        ChecklistItem::conditional(
            "roof",
            Some(vec!["Poor".into(), "Average".into(), "Good".into()]),
            vec![ChecklistItem::categorical("tiles", vec!["Poor".into(), "Good".into()])],
        ),
    ]
}

#[test]
fn normalize_response_key_set_always_equals_expected_id_set() {
    let expected = expected_items();
    let raw = serde_json::json!({});

    let result = normalize_response(&raw, &expected);

    assert!(result.booleans.contains_key("damage"));
    assert!(result.categoricals.contains_key("wall"));
    assert!(result.conditionals.contains_key("roof"));
    assert_eq!(result.booleans.len(), 1);
    assert_eq!(result.categoricals.len(), 1);
    assert_eq!(result.conditionals.len(), 1);
}

#[test]
fn normalize_response_defaults_missing_fields_to_false_or_na() {
    let expected = expected_items();
    let raw = serde_json::json!({});

    let result = normalize_response(&raw, &expected);

    assert_eq!(result.booleans["damage"], false);
    assert_eq!(result.categoricals["wall"], "N/A");
    let roof = &result.conditionals["roof"];
    assert!(!roof.exists);
    assert_eq!(roof.condition.as_deref(), Some("N/A"));
    assert_eq!(roof.subitems["tiles"], "N/A");
}

#[test]
fn normalize_response_ignores_ids_outside_the_expected_set() {
    let expected = expected_items();
    let raw = serde_json::json!({
        "booleans": {"damage": true, "unexpected_extra": true},
    });

    let result = normalize_response(&raw, &expected);

    assert!(!result.booleans.contains_key("unexpected_extra"));
    assert_eq!(result.booleans["damage"], true);
}

#[test]
fn normalize_response_populates_exact_subitem_keys_from_expected_shape() {
    let expected = expected_items();
    let raw = serde_json::json!({
        "conditionals": {
            "roof": {
                "exists": true,
                "condition": "average",
                "subitems": {"tiles": "poor", "not_a_real_subitem": "Good"},
            }
        }
    });

    let result = normalize_response(&raw, &expected);
    let roof = &result.conditionals["roof"];

    assert!(roof.exists);
    assert_eq!(roof.condition.as_deref(), Some("Average"));
    assert_eq!(roof.subitems.len(), 1, "only declared subitems may appear");
    assert_eq!(roof.subitems["tiles"], "Poor");
    assert!(!roof.subitems.contains_key("not_a_real_subitem"));
}

#[test]
fn normalize_response_coerces_string_and_numeric_booleans() {
    let expected = vec![ChecklistItem::boolean("a"), ChecklistItem::boolean("b"), ChecklistItem::boolean("c")];
    let raw = serde_json::json!({
        "booleans": {"a": "yes", "b": 0, "c": "false"}
    });

    let result = normalize_response(&raw, &expected);

    assert!(result.booleans["a"]);
    assert!(!result.booleans["b"]);
    assert!(!result.booleans["c"]);
}
