//! Deterministic summary generation (C6's post-processing step).
//!
//! A pure function of evaluation results: given identical inputs it
//! always produces the same issue lines in the same order, since it
//! walks `BTreeMap`s (already sorted by id) rather than hash maps.
//! True booleans, non-"N/A" categoricals, and existing conditionals each
//! contribute their own line shape.

use crate::domain::{EvaluationResult, HouseResult, RoomResult, Summary};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// One evaluation result, turned into issue lines under a stable scope
/// prefix. Booleans are emitted first (true only), then categoricals
/// (skipping "N/A"), then conditionals.
pub fn summarize_evaluation(scope: &str, eval: &EvaluationResult) -> Vec<String> {
    let mut lines = Vec::new();

    for (id, value) in &eval.booleans {
        if *value {
            lines.push(format!("{scope}:{id}:true"));
        }
    }

    for (id, value) in &eval.categoricals {
        if value != "N/A" {
            lines.push(format!("{scope}:{id}:{value}"));
        }
    }

    for (id, answer) in &eval.conditionals {
        if !answer.exists {
            continue;
        }
        lines.push(format!("{scope}:{id}:exists"));
        if let Some(condition) = &answer.condition {
            lines.push(format!("{scope}:{id}:condition:{condition}"));
        }
        for (subid, value) in &answer.subitems {
            if value != "N/A" {
                lines.push(format!("{scope}:{id}:{subid}:{value}"));
            }
        }
    }

    lines
}

/// Builds the full `Summary` from the house checklist result and the
/// completed room results. `custom` is the concatenation of the other
/// three, in house/room/product order.
pub fn build_summary(house_checklist: &EvaluationResult, rooms: &[RoomResult]) -> Summary {
    let house = summarize_evaluation("house", house_checklist);

    let mut room_lines = Vec::new();
    let mut product_lines = Vec::new();
    for room in rooms {
        room_lines.extend(summarize_evaluation(&format!("room:{}", room.room_id), &room.issues));
        product_lines.extend(summarize_evaluation(
            &format!("product:{}", room.room_id),
            &room.products,
        ));
    }

    let mut custom = Vec::with_capacity(house.len() + room_lines.len() + product_lines.len());
    custom.extend(house.iter().cloned());
    custom.extend(room_lines.iter().cloned());
    custom.extend(product_lines.iter().cloned());

    Summary {
        house,
        rooms: room_lines,
        products: product_lines,
        custom,
    }
}

/// A compact, caller-facing projection of one evaluation result: true
/// booleans and non-"N/A" categoricals only, keyed by id. Supplements the
/// internal `summary` shape with the flatter view a client actually wants
/// to render.
fn client_projection(eval: &EvaluationResult) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();

    for (id, value) in &eval.booleans {
        if *value {
            out.insert(id.clone(), Value::Bool(true));
        }
    }
    for (id, value) in &eval.categoricals {
        if value != "N/A" {
            out.insert(id.clone(), Value::String(value.clone()));
        }
    }

    out
}

/// The full client summary sent back over `/v1/scan/run`: the house
/// checklist projection plus one projection per room, keyed by room id.
pub fn build_client_summary(result: &HouseResult) -> Value {
    let house = client_projection(&result.house_checklist);
    let rooms: BTreeMap<String, Value> = result
        .rooms
        .iter()
        .map(|room| {
            (
                room.room_id.clone(),
                json!({
                    "room_types": room.room_types,
                    "issues": client_projection(&room.issues),
                    "products": client_projection(&room.products),
                }),
            )
        })
        .collect();

    json!({
        "house_types": result.house_types,
        "house": house,
        "rooms": rooms,
        "pros": result.pros_cons.pros,
        "cons": result.pros_cons.cons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConditionalAnswer;
    use std::collections::BTreeMap;

    #[test]
    fn house_summary_matches_worked_example() {
        let mut booleans = BTreeMap::new();
        booleans.insert("damage".to_string(), true);
        booleans.insert("functional".to_string(), false);

        let mut categoricals = BTreeMap::new();
        categoricals.insert("wall".to_string(), "Poor".to_string());

        let mut subitems = BTreeMap::new();
        subitems.insert("tiles".to_string(), "Poor".to_string());
        let mut conditionals = BTreeMap::new();
        conditionals.insert(
            "roof".to_string(),
            ConditionalAnswer {
                exists: true,
                condition: Some("Average".to_string()),
                subitems,
            },
        );

        let eval = EvaluationResult {
            booleans,
            categoricals,
            conditionals,
        };

        let lines = summarize_evaluation("house", &eval);
        assert_eq!(
            lines,
            vec![
                "house:damage:true".to_string(),
                "house:wall:Poor".to_string(),
                "house:roof:exists".to_string(),
                "house:roof:condition:Average".to_string(),
                "house:roof:tiles:Poor".to_string(),
            ]
        );
    }

    #[test]
    fn false_booleans_and_na_categoricals_produce_no_lines() {
        let mut booleans = BTreeMap::new();
        booleans.insert("leak".to_string(), false);
        let mut categoricals = BTreeMap::new();
        categoricals.insert("finish".to_string(), "N/A".to_string());

        let eval = EvaluationResult {
            booleans,
            categoricals,
            conditionals: BTreeMap::new(),
        };

        assert!(summarize_evaluation("room:bath", &eval).is_empty());
    }

    #[test]
    fn build_summary_is_pure_and_concatenates_in_order() {
        let house_checklist = EvaluationResult {
            booleans: BTreeMap::from([("mold".to_string(), true)]),
            categoricals: BTreeMap::new(),
            conditionals: BTreeMap::new(),
        };

        let room = RoomResult {
            room_id: "kitchen".to_string(),
            room_types: vec!["kitchen".to_string()],
            issues: EvaluationResult {
                booleans: BTreeMap::from([("leak".to_string(), true)]),
                categoricals: BTreeMap::new(),
                conditionals: BTreeMap::new(),
            },
            products: EvaluationResult {
                booleans: BTreeMap::from([("fridge_present".to_string(), true)]),
                categoricals: BTreeMap::new(),
                conditionals: BTreeMap::new(),
            },
        };

        let first = build_summary(&house_checklist, &[room.clone()]);
        let second = build_summary(&house_checklist, &[room]);

        assert_eq!(first.house, vec!["house:mold:true".to_string()]);
        assert_eq!(first.rooms, vec!["room:kitchen:leak:true".to_string()]);
        assert_eq!(first.products, vec!["product:kitchen:fridge_present:true".to_string()]);
        assert_eq!(
            first.custom,
            vec![
                "house:mold:true".to_string(),
                "room:kitchen:leak:true".to_string(),
                "product:kitchen:fridge_present:true".to_string(),
            ]
        );
        assert_eq!(first.custom, second.custom, "must be pure given identical inputs");
    }

    #[test]
    fn client_summary_projects_true_booleans_and_real_categoricals() {
        let house_checklist = EvaluationResult {
            booleans: BTreeMap::from([("mold".to_string(), true), ("leak".to_string(), false)]),
            categoricals: BTreeMap::from([("wall".to_string(), "N/A".to_string())]),
            conditionals: BTreeMap::new(),
        };

        let result = crate::domain::HouseResult {
            house_types: vec!["bungalow".to_string()],
            house_checklist,
            rooms: vec![],
            summary: Summary::default(),
            pros_cons: crate::domain::ProsCons::default(),
        };

        let summary = build_client_summary(&result);
        assert_eq!(summary["house"]["mold"], serde_json::json!(true));
        assert!(summary["house"].get("leak").is_none());
        assert!(summary["house"].get("wall").is_none());
    }
}
