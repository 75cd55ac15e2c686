//! HTTP surface: two endpoints over the core pipeline, per the external
//! interfaces contract. Out of the core's scope, but the glue a real
//! service needs to expose it.

pub mod scan;
pub mod simulate;
pub mod state;

pub use state::AppState;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);

    Router::new()
        .route("/v1/scan/run", post(scan::scan_run))
        .route("/v1/simulate", get(simulate::simulate_run))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
