//! Prompt construction for the three inference operations: classification,
//! checklist evaluation, and pros/cons synthesis.

use crate::domain::ChecklistItem;

pub fn classify_system_prompt() -> &'static str {
    "You are a residential property inspection assistant. Look at the \
     provided photos and decide which of the given identifiers apply. \
     Respond with a JSON object of the exact shape {\"types\": [\"id\", ...]}. \
     Choose ALL applicable IDs ONLY from the list provided. Do not invent \
     new identifiers and do not explain your answer."
}

pub fn classify_user_text(allowed_types: &[String]) -> String {
    format!(
        "Allowed identifiers:\n{}\n\nReturn the JSON object now.",
        allowed_types
            .iter()
            .map(|t| format!("- {t}"))
            .collect::<Vec<_>>()
            .join("\n")
    )
}

pub fn checklist_system_prompt() -> &'static str {
    "You are a residential property inspection assistant. Evaluate the \
     provided photos against the checklist items below. Respond with a \
     single JSON object of the shape {\"booleans\": {<id>: true|false}, \
     \"categoricals\": {<id>: \"<one of the listed options>\"}, \
     \"conditionals\": {<id>: {\"exists\": true|false, \"condition\": \
     \"<one of the listed options>\" or null, \"subitems\": {<id>: \
     \"<value>\"}}}}. Only answer for the ids listed below; do not add or \
     omit any."
}

pub fn checklist_user_text(items: &[ChecklistItem]) -> String {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let text = item.text.as_deref().unwrap_or("");
        match item.kind {
            crate::domain::ItemKind::Boolean => {
                lines.push(format!("- [boolean] {} :: {}", item.id, text));
            }
            crate::domain::ItemKind::Categorical => {
                let options = item.options.clone().unwrap_or_default().join(", ");
                lines.push(format!(
                    "- [categorical] {} :: {} (options: {options})",
                    item.id, text
                ));
            }
            crate::domain::ItemKind::Conditional => {
                let options = item.condition_options.clone().unwrap_or_default().join(", ");
                lines.push(format!(
                    "- [conditional] {} :: {} (condition options: {options})",
                    item.id, text
                ));
                if let Some(subitems) = &item.subitems {
                    for sub in subitems {
                        let sub_text = sub.text.as_deref().unwrap_or("");
                        let sub_options = sub.options.clone().unwrap_or_default().join(", ");
                        lines.push(format!(
                            "    - subitem {} :: {} (options: {sub_options})",
                            sub.id, sub_text
                        ));
                    }
                }
            }
        }
    }
    format!("Checklist items:\n{}\n\nReturn the JSON object now.", lines.join("\n"))
}

const PROS_CONS_HOUSE_LIMIT: usize = 80;
const PROS_CONS_ROOM_LIMIT: usize = 200;
const PROS_CONS_PRODUCT_LIMIT: usize = 200;

pub fn pros_cons_system_prompt() -> &'static str {
    "You are a residential property inspection assistant summarizing an \
     inspection for a prospective buyer. Given the issue lines below, \
     respond with a JSON object {\"pros\": [\"...\"], \"cons\": [\"...\"]} \
     that highlights the most material positives and negatives. Keep each \
     entry to one short sentence."
}

pub fn pros_cons_user_text(
    house_issues: &[String],
    room_issues: &[String],
    product_issues: &[String],
) -> String {
    let house = truncate(house_issues, PROS_CONS_HOUSE_LIMIT);
    let room = truncate(room_issues, PROS_CONS_ROOM_LIMIT);
    let product = truncate(product_issues, PROS_CONS_PRODUCT_LIMIT);

    format!(
        "House-level findings:\n{}\n\nRoom-level findings:\n{}\n\nProduct-level findings:\n{}\n\nReturn the JSON object now.",
        house.join("\n"),
        room.join("\n"),
        product.join("\n"),
    )
}

fn truncate(issues: &[String], limit: usize) -> Vec<String> {
    issues.iter().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_declared_limits() {
        let many: Vec<String> = (0..300).map(|i| format!("issue-{i}")).collect();
        assert_eq!(truncate(&many, PROS_CONS_HOUSE_LIMIT).len(), 80);
        assert_eq!(truncate(&many, PROS_CONS_ROOM_LIMIT).len(), 200);
        assert_eq!(truncate(&many, PROS_CONS_PRODUCT_LIMIT).len(), 200);
    }
}
