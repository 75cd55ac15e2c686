//! Core data model: images, checklist items, evaluation results, and the
//! house/room report shapes produced by the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// An opaque image, tagged with the room it belongs to (if any) and its
/// position in the original upload order. Immutable once produced by the
/// normalizer.
#[derive(Debug, Clone)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub room_id: Option<String>,
    pub origin_index: usize,
}

impl Image {
    pub fn new(bytes: Vec<u8>, room_id: Option<String>, origin_index: usize) -> Self {
        Self {
            bytes,
            room_id,
            origin_index,
        }
    }
}

/// The discriminant of a checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Boolean,
    Categorical,
    Conditional,
}

/// A single checklist entry. Fields beyond `id`/`kind` are populated
/// according to `kind`: `options` for categorical, `condition_options` +
/// `subitems` for conditional (subitems are themselves categorical-shaped
/// entries, enforced by convention rather than the type system, matching
/// the loosely-typed source documents).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subitems: Option<Vec<ChecklistItem>>,
}

impl ChecklistItem {
    pub fn boolean(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Boolean,
            text: None,
            options: None,
            condition_options: None,
            subitems: None,
        }
    }

    pub fn categorical(id: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Categorical,
            text: None,
            options: Some(options),
            condition_options: None,
            subitems: None,
        }
    }

    pub fn conditional(
        id: impl Into<String>,
        condition_options: Option<Vec<String>>,
        subitems: Vec<ChecklistItem>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Conditional,
            text: None,
            options: None,
            condition_options,
            subitems: Some(subitems),
        }
    }
}

/// The closed quality enum. Parsing is case-insensitive and tolerant of a
/// single surrounding pair of double quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Poor,
    Average,
    Good,
    Excellent,
    NotApplicable,
}

impl Quality {
    pub const ALL: [Quality; 5] = [
        Quality::Poor,
        Quality::Average,
        Quality::Good,
        Quality::Excellent,
        Quality::NotApplicable,
    ];

    pub fn default_options() -> Vec<String> {
        Self::ALL.iter().map(|q| q.to_string()).collect()
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Quality::Poor => "Poor",
            Quality::Average => "Average",
            Quality::Good => "Good",
            Quality::Excellent => "Excellent",
            Quality::NotApplicable => "N/A",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Quality {
    type Err = ();

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = strip_quotes(raw.trim());
        match trimmed.to_ascii_lowercase().as_str() {
            "poor" => Ok(Quality::Poor),
            "average" => Ok(Quality::Average),
            "good" => Ok(Quality::Good),
            "excellent" => Ok(Quality::Excellent),
            "n/a" | "na" => Ok(Quality::NotApplicable),
            _ => Err(()),
        }
    }
}

/// Strip a single surrounding pair of double quotes, if present.
pub fn strip_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// A fully-populated conditional answer: whether the condition's subject
/// exists, its overall condition rating (if it exists), and per-subitem
/// ratings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionalAnswer {
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub subitems: BTreeMap<String, String>,
}

/// The three-map structure holding a batch's boolean, categorical, and
/// conditional answers. `BTreeMap` keeps iteration order stable and
/// independent of hash seeding, which matters for deterministic summary
/// generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationResult {
    #[serde(default)]
    pub booleans: BTreeMap<String, bool>,
    #[serde(default)]
    pub categoricals: BTreeMap<String, String>,
    #[serde(default)]
    pub conditionals: BTreeMap<String, ConditionalAnswer>,
}

impl EvaluationResult {
    pub fn merge(&mut self, other: EvaluationResult) {
        self.booleans.extend(other.booleans);
        self.categoricals.extend(other.categoricals);
        self.conditionals.extend(other.conditionals);
    }
}

/// Token usage for one inference call, when the upstream response carries
/// it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Per-room evaluation output: detected room types, checklist issues, and
/// product inventory evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomResult {
    pub room_id: String,
    pub room_types: Vec<String>,
    pub issues: EvaluationResult,
    pub products: EvaluationResult,
}

/// Pros/cons synthesized from the aggregated issue lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProsCons {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// The categorized deterministic summary: one issue-line list per scope,
/// plus a concatenation of all of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub house: Vec<String>,
    pub rooms: Vec<String>,
    pub products: Vec<String>,
    pub custom: Vec<String>,
}

/// The complete house-level report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseResult {
    pub house_types: Vec<String>,
    pub house_checklist: EvaluationResult,
    pub rooms: Vec<RoomResult>,
    pub summary: Summary,
    pub pros_cons: ProsCons,
}
