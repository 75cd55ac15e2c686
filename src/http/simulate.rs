//! `GET /v1/simulate?root=<subdir>` — the local-filesystem simulation
//! endpoint. Loads checklists from known files at the simulation base
//! directory and images from room subdirectories under `root`.

use super::scan::{ScanMetadata, ScanResponseBody};
use super::state::AppState;
use crate::aggregation::build_client_summary;
use crate::cost_tracker::CostSink;
use crate::error::{PipelineError, Result};
use crate::inference::InferenceAdapter;
use crate::loaders::checklist::load_checklist_definition_cached;
use crate::loaders::images::load_room_images_from_dir;
use crate::orchestrator::{Orchestrator, RoomInput, SamplingParams, ScanInput};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
pub struct SimulateQuery {
    pub root: String,
}

pub async fn simulate_run(
    State(state): State<AppState>,
    Query(query): Query<SimulateQuery>,
) -> Result<Json<ScanResponseBody>> {
    let base = PathBuf::from(&state.settings.simulate_base_dir);
    let candidate = base.join(&query.root);

    let canonical_base = tokio::fs::canonicalize(&base)
        .await
        .map_err(|e| PipelineError::Config(format!("simulation base directory: {e}")))?;
    let canonical_candidate = tokio::fs::canonicalize(&candidate)
        .await
        .map_err(|_| PipelineError::NotFound(format!("simulation root not found: {}", query.root)))?;

    if !canonical_candidate.starts_with(&canonical_base) {
        return Err(PipelineError::InvalidInput(format!(
            "simulation root escapes the base directory: {}",
            query.root
        )));
    }

    let house_checklist =
        load_checklist_definition_cached(&state.checklist_cache, &canonical_base.join("house_checklist.json")).await?;
    let rooms_checklist =
        load_checklist_definition_cached(&state.checklist_cache, &canonical_base.join("room_checklist.json")).await?;
    let products_checklist =
        load_checklist_definition_cached(&state.checklist_cache, &canonical_base.join("product_checklist.json")).await?;

    let mut room_dirs = Vec::new();
    let mut read_dir = tokio::fs::read_dir(&canonical_candidate)
        .await
        .map_err(|e| PipelineError::NotFound(format!("{}: {e}", canonical_candidate.display())))?;
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| PipelineError::Internal(e.into()))?
    {
        if entry
            .file_type()
            .await
            .map(|ft| ft.is_dir())
            .unwrap_or(false)
        {
            room_dirs.push(entry.path());
        }
    }
    room_dirs.sort();

    let mut rooms = Vec::with_capacity(room_dirs.len());
    for dir in room_dirs {
        let room_id = dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let images = load_room_images_from_dir(&dir, &room_id)?;
        rooms.push(RoomInput { room_id, images });
    }
    let rooms_requested = rooms.len();

    let input = ScanInput {
        rooms,
        house_checklist,
        rooms_checklist,
        products_checklist,
        house_custom: None,
        room_custom: None,
        product_custom: None,
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
    let cancel = CancellationToken::new();

    let result = orchestrator.run_simulation(input, &cancel).await?;

    let client_summary = build_client_summary(&result);
    let cost_info = cost_sink.totals();

    Ok(Json(ScanResponseBody {
        metadata: ScanMetadata {
            rooms_requested,
            rooms_processed: result.rooms.len(),
            stage_timings_ms: Default::default(),
        },
        result,
        client_summary,
        cost_info,
    }))
}
