//! # homescan-core
//!
//! Residential property inspection pipeline engine: orchestrates six
//! cooperating vision/text inference stages over a set of room-tagged
//! photographs into a structured house inspection report.
//!
//! ## Architecture
//!
//! - Image normalization (EXIF correction, resize, recompress) with
//!   deterministic per-stage sampling
//! - Checklist merging (default + type-specific + custom, dedup by id)
//! - Model response normalization against expected checklist items
//! - Token-bucket rate limiting plus a concurrency semaphore governing
//!   every inference call
//! - A typed inference adapter (classify / evaluate checklist / synthesize
//!   pros and cons)
//! - Pipeline orchestration: per-room fan-out, deterministic summary
//!   generation, final report assembly

pub mod aggregation;
pub mod cache;
pub mod config;
pub mod cost_tracker;
pub mod domain;
pub mod error;
pub mod governor;
pub mod http;
pub mod inference;
pub mod loaders;
pub mod normalize;
pub mod orchestrator;

pub use cache::TtlCache;
pub use error::{PipelineError, Result};

/// Re-export of the types most call sites need, mirroring the module
/// layout rather than flattening it.
pub mod prelude {
    pub use crate::aggregation::{build_client_summary, build_summary, summarize_evaluation};
    pub use crate::cache::TtlCache;
    pub use crate::config::Settings;
    pub use crate::cost_tracker::{CostSink, NullUsageObserver, UsageObserver};
    pub use crate::domain::{
        ChecklistDefinition, ChecklistItem, ConditionalAnswer, CustomChecklist, EvaluationResult,
        HouseResult, Image, ItemKind, ProsCons, Quality, RoomResult, Summary, TokenUsage,
    };
    pub use crate::error::{PipelineError, Result};
    pub use crate::governor::Governor;
    pub use crate::inference::{InferenceAdapter, InferenceClient, OpenAiCompatibleClient};
    pub use crate::orchestrator::{AgentTracker, Orchestrator, RoomInput, SamplingParams, ScanInput};
}
