//! Shared, process-wide application state injected into every request
//! handler via axum's `State` extractor.

use crate::config::Settings;
use crate::domain::ChecklistDefinition;
use crate::governor::Governor;
use crate::inference::{InferenceClient, OpenAiCompatibleClient};
use crate::TtlCache;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub inference_client: Arc<dyn InferenceClient>,
    pub governor: Arc<Governor>,
    pub http_client: reqwest::Client,
    pub checklist_cache: Arc<TtlCache<ChecklistDefinition>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let governor = Arc::new(Governor::new(
            settings.rate_limit_tpm,
            settings.rate_limit_rpm,
            settings.max_concurrent_calls,
        ));
        let inference_client: Arc<dyn InferenceClient> = Arc::new(OpenAiCompatibleClient::new(
            settings.inference_base_url.clone(),
            settings.inference_api_key.clone(),
            settings.inference_max_retries,
        ));
        let checklist_cache = Arc::new(TtlCache::new(settings.cache_expire_seconds));
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client builds");

        Self {
            settings: Arc::new(settings),
            inference_client,
            governor,
            http_client,
            checklist_cache,
        }
    }
}
