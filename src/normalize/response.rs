//! Response Normalizer (C3).
//!
//! Parses, validates, and defaults a model's checklist answers against the
//! batch's expected items and option sets.

use crate::domain::models::strip_quotes;
use crate::domain::{ChecklistItem, ConditionalAnswer, EvaluationResult, ItemKind, Quality};
use std::collections::BTreeMap;

/// A single expected item's metadata, pre-normalized once per batch so
/// every per-id lookup reuses the same allowed-option lists.
struct ExpectedItem<'a> {
    kind: ItemKind,
    options: Option<Vec<String>>,
    condition_options: Option<Vec<String>>,
    subitems: Vec<ExpectedSubitem<'a>>,
}

struct ExpectedSubitem<'a> {
    id: &'a str,
    options: Option<Vec<String>>,
}

/// Trim, strip a single surrounding pair of double quotes, and
/// de-duplicate case-insensitively while preserving first-seen casing.
/// Non-string entries are dropped. Returns `None` for an empty or absent
/// option list so callers can tell "no allowed options" from "empty list".
pub fn normalize_allowed_options(options: Option<&[String]>) -> Option<Vec<String>> {
    let options = options?;
    let mut out: Vec<String> = Vec::new();

    for raw in options {
        let cleaned = strip_quotes(raw.trim()).trim();
        if cleaned.is_empty() {
            continue;
        }
        let already_present = out.iter().any(|o| o.eq_ignore_ascii_case(cleaned));
        if !already_present {
            out.push(cleaned.to_string());
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// `_normalize_option_value`: normalize a raw model value against the
/// item's allowed options.
///
/// - Strip surrounding quotes; empty becomes "absent".
/// - A case-insensitive match in `allowed` returns the canonical casing.
/// - Failing that, an "N/A" entry in `allowed` (case-insensitive) wins.
/// - Failing that, with `allowed` non-empty, the first declared option wins.
/// - With no `allowed` at all, return the raw (non-empty) value, else "N/A".
pub fn normalize_option_value(value: Option<&str>, allowed: Option<&[String]>) -> String {
    let candidate = value.map(|v| strip_quotes(v.trim()).trim()).filter(|v| !v.is_empty());

    if let Some(allowed) = allowed {
        if let Some(candidate) = candidate {
            if let Some(matched) = allowed.iter().find(|opt| opt.eq_ignore_ascii_case(candidate)) {
                return matched.clone();
            }
        }

        if let Some(na) = allowed.iter().find(|opt| opt.eq_ignore_ascii_case("n/a")) {
            return na.clone();
        }

        return allowed[0].clone();
    }

    candidate.map(|c| c.to_string()).unwrap_or_else(|| Quality::NotApplicable.to_string())
}

fn build_expected_map(expected: &[ChecklistItem]) -> BTreeMap<&str, ExpectedItem<'_>> {
    let mut map = BTreeMap::new();

    for item in expected {
        let options = normalize_allowed_options(item.options.as_deref());
        let condition_options = normalize_allowed_options(item.condition_options.as_deref())
            .or_else(|| options.clone())
            .or_else(|| Some(Quality::default_options()));

        let subitems = item
            .subitems
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|sub| ExpectedSubitem {
                id: sub.id.as_str(),
                options: normalize_allowed_options(sub.options.as_deref()),
            })
            .collect();

        map.insert(
            item.id.as_str(),
            ExpectedItem {
                kind: item.kind,
                options,
                condition_options,
                subitems,
            },
        );
    }

    map
}

/// Extract the substring from the first `{` to the last `}` when the raw
/// response isn't pure JSON, per the JSON-extraction rule in the
/// component design.
pub fn extract_json_object(raw: &str) -> Option<serde_json::Value> {
    let trimmed = raw.trim();
    let candidate = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(first), Some(last)) if last >= first => &trimmed[first..=last],
        _ => trimmed,
    };
    serde_json::from_str(candidate).ok()
}

/// Normalize a parsed (or empty, on parse failure) JSON object against the
/// batch's expected items, producing a fully-populated `EvaluationResult`
/// whose key set equals the batch's id set.
pub fn normalize_response(raw: &serde_json::Value, expected: &[ChecklistItem]) -> EvaluationResult {
    let expected_map = build_expected_map(expected);
    let mut result = EvaluationResult::default();

    let obj = raw.as_object();

    if let Some(obj) = obj {
        if let Some(booleans) = obj.get("booleans").and_then(|v| v.as_object()) {
            for (id, value) in booleans {
                if expected_map.contains_key(id.as_str()) {
                    result.booleans.insert(id.clone(), json_as_bool(value));
                }
            }
        }

        if let Some(categoricals) = obj.get("categoricals").and_then(|v| v.as_object()) {
            for (id, value) in categoricals {
                let Some(meta) = expected_map.get(id.as_str()) else {
                    continue;
                };
                let raw_str = value.as_str();
                let normalized = normalize_option_value(raw_str, meta.options.as_deref());
                result.categoricals.insert(id.clone(), normalized);
            }
        }

        if let Some(conditionals) = obj.get("conditionals").and_then(|v| v.as_object()) {
            for (id, value) in conditionals {
                let Some(meta) = expected_map.get(id.as_str()) else {
                    continue;
                };
                let Some(value_obj) = value.as_object() else {
                    continue;
                };

                let exists = value_obj.get("exists").map(json_as_bool).unwrap_or(false);
                let condition = normalize_option_value(
                    value_obj.get("condition").and_then(|v| v.as_str()),
                    meta.condition_options.as_deref(),
                );

                let raw_subitems = value_obj.get("subitems").and_then(|v| v.as_object());
                let mut subitems = BTreeMap::new();
                for sub in &meta.subitems {
                    let sub_allowed = sub.options.as_deref().or(meta.condition_options.as_deref());
                    let raw_value = raw_subitems
                        .and_then(|m| m.get(sub.id))
                        .and_then(|v| v.as_str());
                    subitems.insert(sub.id.to_string(), normalize_option_value(raw_value, sub_allowed));
                }

                result.conditionals.insert(
                    id.clone(),
                    ConditionalAnswer {
                        exists,
                        condition: Some(condition),
                        subitems,
                    },
                );
            }
        }
    }

    // Fill in defaults for every expected id the model omitted (or that
    // was dropped above for being malformed).
    for (id, meta) in &expected_map {
        match meta.kind {
            ItemKind::Boolean => {
                result.booleans.entry(id.to_string()).or_insert(false);
            }
            ItemKind::Categorical => {
                let entry = result.categoricals.entry(id.to_string());
                if let std::collections::btree_map::Entry::Vacant(e) = entry {
                    e.insert(normalize_option_value(None, meta.options.as_deref()));
                }
            }
            ItemKind::Conditional => {
                result.conditionals.entry(id.to_string()).or_insert_with(|| {
                    let condition = normalize_option_value(None, meta.condition_options.as_deref());
                    let subitems = meta
                        .subitems
                        .iter()
                        .map(|sub| {
                            let sub_allowed = sub.options.as_deref().or(meta.condition_options.as_deref());
                            (sub.id.to_string(), normalize_option_value(None, sub_allowed))
                        })
                        .collect();
                    ConditionalAnswer {
                        exists: false,
                        condition: Some(condition),
                        subitems,
                    }
                });
            }
        }
    }

    result
}

fn json_as_bool(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}
