//! `POST /v1/scan/run` — the client-supplied-checklists scan endpoint.

use super::state::AppState;
use crate::aggregation::build_client_summary;
use crate::cost_tracker::CostSink;
use crate::domain::{ChecklistDefinition, CustomChecklist, TokenUsage};
use crate::error::{PipelineError, Result};
use crate::inference::InferenceAdapter;
use crate::loaders::images::fetch_image_urls;
use crate::orchestrator::{AgentTracker, Orchestrator, RoomInput, SamplingParams, ScanInput};
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
pub struct RoomInputBody {
    pub room_id: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequestBody {
    pub rooms: Vec<RoomInputBody>,
    pub house_checklist: ChecklistDefinition,
    pub rooms_checklist: ChecklistDefinition,
    pub products_checklist: ChecklistDefinition,
    #[serde(default)]
    pub house_custom: Option<CustomChecklist>,
    #[serde(default)]
    pub room_custom: Option<CustomChecklist>,
    #[serde(default)]
    pub product_custom: Option<CustomChecklist>,
}

#[derive(Debug, Serialize)]
pub struct ScanMetadata {
    pub rooms_requested: usize,
    pub rooms_processed: usize,
    pub stage_timings_ms: BTreeMap<String, u128>,
}

#[derive(Debug, Serialize)]
pub struct ScanResponseBody {
    pub result: crate::domain::HouseResult,
    pub client_summary: serde_json::Value,
    pub cost_info: TokenUsage,
    pub metadata: ScanMetadata,
}

pub async fn scan_run(
    State(state): State<AppState>,
    Json(body): Json<ScanRequestBody>,
) -> Result<Json<ScanResponseBody>> {
    if body.rooms.is_empty() {
        return Err(PipelineError::InvalidInput("rooms must not be empty".to_string()));
    }

    let cancel = CancellationToken::new();
    let mut rooms = Vec::with_capacity(body.rooms.len());
    for room in &body.rooms {
        let images = fetch_image_urls(
            &state.http_client,
            &room.room_id,
            &room.image_urls,
            state.settings.allow_localhost_urls,
        )
        .await;
        rooms.push(RoomInput {
            room_id: room.room_id.clone(),
            images,
        });
    }
    let rooms_requested = rooms.len();

    let input = ScanInput {
        rooms,
        house_checklist: body.house_checklist.coerce_flat_shape(),
        rooms_checklist: body.rooms_checklist.coerce_flat_shape(),
        products_checklist: body.products_checklist,
        house_custom: body.house_custom,
        room_custom: body.room_custom,
        product_custom: body.product_custom,
    };

    let cost_sink = Arc::new(CostSink::new());
    let inference = Arc::new(InferenceAdapter::new(
        state.inference_client.clone(),
        state.governor.clone(),
        cost_sink.clone(),
        state.settings.vision_model.clone(),
        state.settings.text_model.clone(),
        state.settings.checklist_batch_size,
    ));
    let orchestrator = Orchestrator::new(inference, SamplingParams::from(state.settings.as_ref()));
    let tracker = AgentTracker::new();

    let result = orchestrator.run_scan(input, &tracker, &cancel).await?;

    let client_summary = build_client_summary(&result);
    let cost_info = cost_sink.totals();
    let stage_timings_ms = tracker
        .snapshot()
        .await
        .into_iter()
        .map(|(label, elapsed)| (label, elapsed.as_millis()))
        .collect();

    Ok(Json(ScanResponseBody {
        metadata: ScanMetadata {
            rooms_requested,
            rooms_processed: result.rooms.len(),
            stage_timings_ms,
        },
        result,
        client_summary,
        cost_info,
    }))
}
