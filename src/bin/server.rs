//! Inspection pipeline engine server: binds the two HTTP endpoints over
//! the core pipeline.

use homescan_core::config::Settings;
use homescan_core::http::{build_router, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,homescan_core=debug".into()),
        )
        .init();

    let settings = Settings::from_env()?;
    let addr = format!("{}:{}", settings.host, settings.port);

    let state = AppState::new(settings);
    let app = build_router(state);

    info!("inspection pipeline engine listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
