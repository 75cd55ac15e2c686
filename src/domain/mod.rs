//! Domain model and pure business rules: the data shapes shared across
//! the pipeline (C3-C6) and the checklist merger (C2).

pub mod checklist_def;
pub mod merge;
pub mod models;

pub use checklist_def::{ChecklistDefinition, CustomChecklist, ItemGroup, ProductLevelCustom, RoomLevelCustom};
pub use merge::{dedupe_last_wins, filter_allowed_types, merge_house, merge_products, merge_room};
pub use models::{
    ChecklistItem, ConditionalAnswer, EvaluationResult, HouseResult, Image, ItemKind, ProsCons,
    Quality, RoomResult, Summary, TokenUsage,
};
