//! Pipeline Orchestrator (C6): drives the six-stage DAG, fans out
//! per-room work in parallel, and assembles the final `HouseResult`.
//!
//! Rooms run as independent `tokio::spawn` tasks collected with
//! `futures::future::join_all`; a cancellation token threaded through
//! every stage lets the whole fan-out be aborted in one place.

use crate::aggregation::build_summary;
use crate::config::Settings;
use crate::domain::{
    filter_allowed_types, merge_house, merge_products, merge_room, ChecklistDefinition,
    CustomChecklist, HouseResult, Image, ProsCons, RoomResult,
};
use crate::error::{PipelineError, Result};
use crate::inference::InferenceAdapter;
use crate::normalize::image::{sample_for_checklist, sample_for_classification};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Per-stage image sampling and normalization knobs, lifted out of
/// `Settings` so the orchestrator doesn't need the whole config surface.
#[derive(Debug, Clone)]
pub struct SamplingParams {
    pub max_classify_images: usize,
    pub max_checklist_images: usize,
    pub classify_max_edge: u32,
    pub classify_quality: u8,
    pub checklist_max_edge: u32,
    pub checklist_quality: u8,
    pub skip_room_on_empty_types: bool,
}

impl From<&Settings> for SamplingParams {
    fn from(settings: &Settings) -> Self {
        Self {
            max_classify_images: settings.max_classify_images,
            max_checklist_images: settings.max_checklist_images,
            classify_max_edge: settings.classify_max_edge,
            classify_quality: settings.classify_quality,
            checklist_max_edge: settings.checklist_max_edge,
            checklist_quality: settings.checklist_quality,
            skip_room_on_empty_types: settings.skip_room_on_empty_types,
        }
    }
}

/// One room's image pool, keyed by the room id the caller assigned.
pub struct RoomInput {
    pub room_id: String,
    pub images: Vec<Image>,
}

/// Everything the orchestrator needs to run one inspection: the
/// room-tagged images and the three already-loaded checklist definitions.
pub struct ScanInput {
    pub rooms: Vec<RoomInput>,
    pub house_checklist: ChecklistDefinition,
    pub rooms_checklist: ChecklistDefinition,
    pub products_checklist: ChecklistDefinition,
    pub house_custom: Option<CustomChecklist>,
    pub room_custom: Option<CustomChecklist>,
    pub product_custom: Option<CustomChecklist>,
}

/// Request-scoped execution tracker: records how long each named stage
/// took. Wired only into `run_scan` — the simulate route runs untracked.
#[derive(Default)]
pub struct AgentTracker {
    entries: Mutex<Vec<(String, Duration)>>,
}

impl AgentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, label: impl Into<String>, elapsed: Duration) {
        self.entries.lock().await.push((label.into(), elapsed));
    }

    pub async fn snapshot(&self) -> Vec<(String, Duration)> {
        self.entries.lock().await.clone()
    }
}

async fn timed<F, T>(tracker: Option<&AgentTracker>, label: &str, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let result = fut.await;
    if let Some(tracker) = tracker {
        tracker.record(label, start.elapsed()).await;
    }
    result
}

pub struct Orchestrator {
    inference: Arc<InferenceAdapter>,
    params: SamplingParams,
}

impl Orchestrator {
    pub fn new(inference: Arc<InferenceAdapter>, params: SamplingParams) -> Self {
        Self { inference, params }
    }

    /// HTTP scan entry point: client-supplied, already-merged checklist
    /// trees; execution is tracked for observability.
    pub async fn run_scan(
        &self,
        input: ScanInput,
        tracker: &AgentTracker,
        cancel: &CancellationToken,
    ) -> Result<HouseResult> {
        self.run(input, Some(tracker), cancel).await
    }

    /// Local-filesystem simulation entry point: no execution tracking.
    pub async fn run_simulation(&self, input: ScanInput, cancel: &CancellationToken) -> Result<HouseResult> {
        self.run(input, None, cancel).await
    }

    async fn run(
        &self,
        input: ScanInput,
        tracker: Option<&AgentTracker>,
        cancel: &CancellationToken,
    ) -> Result<HouseResult> {
        if input.rooms.is_empty() {
            return Err(PipelineError::InvalidInput("scan requires at least one room".to_string()));
        }

        let whole_house_pool: Vec<Image> = input
            .rooms
            .iter()
            .flat_map(|room| room.images.iter().cloned())
            .collect();

        if whole_house_pool.is_empty() {
            return Err(PipelineError::InvalidInput("scan requires at least one image".to_string()));
        }

        // Agent1: classify house.
        let classify_images = sample_for_classification(
            &whole_house_pool,
            self.params.max_classify_images,
            self.params.classify_max_edge,
            self.params.classify_quality,
        );
        let allowed_house_types = input.house_checklist.allowed_house_types();
        let detected_house_types = timed(tracker, "classify-house", {
            let inference = &self.inference;
            let allowed = allowed_house_types.clone();
            inference.classify(&classify_images, &allowed, "classify-house", cancel)
        })
        .await?;
        let house_types = filter_allowed_types(&detected_house_types, &allowed_house_types);

        // Agent2: house checklist.
        let house_checklist_images = sample_for_checklist(
            &whole_house_pool,
            self.params.max_checklist_images,
            self.params.checklist_max_edge,
            self.params.checklist_quality,
        );
        let house_items = merge_house(&input.house_checklist, &house_types, input.house_custom.as_ref());
        let house_checklist = timed(tracker, "house-checklist", {
            let inference = &self.inference;
            inference.evaluate_checklist(&house_checklist_images, &house_items, "house-checklist", cancel)
        })
        .await?;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // Fan out per room: Agent3 -> Agent4 -> Agent5, rooms concurrent.
        let mut handles = Vec::with_capacity(input.rooms.len());
        for room in input.rooms {
            let inference = self.inference.clone();
            let params = self.params.clone();
            let rooms_checklist = input.rooms_checklist.clone();
            let products_checklist = input.products_checklist.clone();
            let room_custom = input.room_custom.clone();
            let product_custom = input.product_custom.clone();
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                run_room(
                    &inference,
                    &params,
                    room,
                    &rooms_checklist,
                    &products_checklist,
                    room_custom.as_ref(),
                    product_custom.as_ref(),
                    &cancel,
                )
                .await
            });
            handles.push(handle);
        }

        let room_outcomes = timed(tracker, "rooms", join_all(handles)).await;

        let mut rooms = Vec::new();
        for outcome in room_outcomes {
            match outcome {
                Ok(Ok(Some(room_result))) => rooms.push(room_result),
                Ok(Ok(None)) => {}
                Ok(Err(err)) => warn!(%err, "room failed, excluding from report"),
                Err(join_err) => error!(%join_err, "room task panicked, excluding from report"),
            }
        }

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // Deterministic summary, then Agent6.
        let summary = build_summary(&house_checklist, &rooms);

        let pros_cons = timed(tracker, "pros-cons", {
            let inference = &self.inference;
            inference.synthesize_pros_cons(&summary.house, &summary.rooms, &summary.products, "pros-cons", cancel)
        })
        .await
        .unwrap_or_else(|err| {
            warn!(%err, "pros/cons synthesis failed, reporting with empty pros/cons");
            ProsCons::default()
        });

        Ok(HouseResult {
            house_types,
            house_checklist,
            rooms,
            summary,
            pros_cons,
        })
    }
}

/// Runs Agent3 -> Agent4 -> Agent5 for one room. Returns `Ok(None)` for a
/// room with no images (skipped silently); propagates the first stage
/// failure so the caller can log-and-exclude per the room-failure policy.
#[allow(clippy::too_many_arguments)]
async fn run_room(
    inference: &InferenceAdapter,
    params: &SamplingParams,
    room: RoomInput,
    rooms_checklist: &ChecklistDefinition,
    products_checklist: &ChecklistDefinition,
    room_custom: Option<&CustomChecklist>,
    product_custom: Option<&CustomChecklist>,
    cancel: &CancellationToken,
) -> Result<Option<RoomResult>> {
    if room.images.is_empty() {
        info!(room_id = %room.room_id, "room has no images, skipping");
        return Ok(None);
    }

    let classify_label = format!("classify-room:{}", room.room_id);
    let classify_images = sample_for_classification(
        &room.images,
        params.max_classify_images,
        params.classify_max_edge,
        params.classify_quality,
    );
    let allowed_room_types = rooms_checklist.allowed_room_types();
    let detected_room_types = inference
        .classify(&classify_images, &allowed_room_types, &classify_label, cancel)
        .await?;
    let room_types = filter_allowed_types(&detected_room_types, &allowed_room_types);

    if room_types.is_empty() && !params.skip_room_on_empty_types {
        info!(room_id = %room.room_id, "no room types detected, proceeding with default-only items");
    } else if room_types.is_empty() && params.skip_room_on_empty_types {
        warn!(room_id = %room.room_id, "no room types detected, skipping room per configuration");
        return Ok(None);
    }

    let checklist_label = format!("room-checklist:{}", room.room_id);
    let checklist_images = sample_for_checklist(
        &room.images,
        params.max_checklist_images,
        params.checklist_max_edge,
        params.checklist_quality,
    );
    let room_items = merge_room(rooms_checklist, &room_types, &room.room_id, room_custom);
    let issues = inference
        .evaluate_checklist(&checklist_images, &room_items, &checklist_label, cancel)
        .await?;

    let products_label = format!("products:{}", room.room_id);
    let products_items = merge_products(products_checklist, product_custom, None);
    let products = inference
        .evaluate_checklist(&checklist_images, &products_items, &products_label, cancel)
        .await?;

    Ok(Some(RoomResult {
        room_id: room.room_id,
        room_types,
        issues,
        products,
    }))
}
