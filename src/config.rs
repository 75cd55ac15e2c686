//! Application configuration.
//!
//! Loaded from environment variables (optionally backed by a `.env` file),
//! with sensible defaults for everything. Field names follow the
//! `SCREAMING_SNAKE_CASE` env convention via `config`'s environment source.

use serde::Deserialize;

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_vision_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_text_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_classify_images() -> usize {
    4
}
fn default_max_checklist_images() -> usize {
    6
}
fn default_classify_max_edge() -> u32 {
    512
}
fn default_checklist_max_edge() -> u32 {
    768
}
fn default_max_image_edge() -> u32 {
    2048
}
fn default_classify_quality() -> u8 {
    70
}
fn default_checklist_quality() -> u8 {
    80
}
fn default_image_quality() -> u8 {
    85
}
fn default_checklist_batch_size() -> usize {
    6
}
fn default_rate_limit_tpm() -> u64 {
    90_000
}
fn default_rate_limit_rpm() -> u64 {
    500
}
fn default_max_concurrent_calls() -> usize {
    3
}
fn default_cache_expire_seconds() -> u64 {
    3600
}
fn default_inference_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_inference_max_retries() -> u32 {
    6
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

/// Application-wide settings, recognized options per the external
/// interfaces contract.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// API key for the inference service. Required in production; tests
    /// construct `Settings` directly without going through `from_env`.
    #[serde(default)]
    pub inference_api_key: String,
    #[serde(default = "default_inference_base_url")]
    pub inference_base_url: String,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_inference_max_retries")]
    pub inference_max_retries: u32,

    #[serde(default = "default_max_classify_images")]
    pub max_classify_images: usize,
    #[serde(default = "default_max_checklist_images")]
    pub max_checklist_images: usize,
    #[serde(default = "default_classify_max_edge")]
    pub classify_max_edge: u32,
    #[serde(default = "default_checklist_max_edge")]
    pub checklist_max_edge: u32,
    #[serde(default = "default_max_image_edge")]
    pub max_image_edge: u32,
    #[serde(default = "default_classify_quality")]
    pub classify_quality: u8,
    #[serde(default = "default_checklist_quality")]
    pub checklist_quality: u8,
    #[serde(default = "default_image_quality")]
    pub image_quality: u8,

    #[serde(default = "default_checklist_batch_size")]
    pub checklist_batch_size: usize,

    #[serde(default = "default_rate_limit_tpm")]
    pub rate_limit_tpm: u64,
    #[serde(default = "default_rate_limit_rpm")]
    pub rate_limit_rpm: u64,
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,

    #[serde(default = "default_cache_expire_seconds")]
    pub cache_expire_seconds: u64,

    #[serde(default)]
    pub allow_localhost_urls: bool,

    /// Whether a room whose classification yields zero allowed types
    /// should still proceed evaluating default-only checklist items.
    /// Kept configurable per the open question in the design notes;
    /// the documented current behavior is `false` (proceed).
    #[serde(default)]
    pub skip_room_on_empty_types: bool,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Base directory simulation roots must resolve underneath.
    #[serde(default = "default_simulate_base_dir")]
    pub simulate_base_dir: String,
}

fn default_simulate_base_dir() -> String {
    "./demo".to_string()
}

impl Settings {
    /// Load settings from environment variables (and an optional `.env`
    /// file in the working directory), falling back to documented
    /// defaults for anything unset.
    pub fn from_env() -> crate::error::Result<Self> {
        let _ = dotenvy::dotenv();

        let cfg = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .try_parsing(true)
                    .list_separator(","),
            )
            .build()
            .map_err(|e| crate::error::PipelineError::Config(e.to_string()))?;

        cfg.try_deserialize()
            .map_err(|e| crate::error::PipelineError::Config(e.to_string()))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: default_host(),
            port: default_port(),
            inference_api_key: String::new(),
            inference_base_url: default_inference_base_url(),
            vision_model: default_vision_model(),
            text_model: default_text_model(),
            inference_max_retries: default_inference_max_retries(),
            max_classify_images: default_max_classify_images(),
            max_checklist_images: default_max_checklist_images(),
            classify_max_edge: default_classify_max_edge(),
            checklist_max_edge: default_checklist_max_edge(),
            max_image_edge: default_max_image_edge(),
            classify_quality: default_classify_quality(),
            checklist_quality: default_checklist_quality(),
            image_quality: default_image_quality(),
            checklist_batch_size: default_checklist_batch_size(),
            rate_limit_tpm: default_rate_limit_tpm(),
            rate_limit_rpm: default_rate_limit_rpm(),
            max_concurrent_calls: default_max_concurrent_calls(),
            cache_expire_seconds: default_cache_expire_seconds(),
            allow_localhost_urls: false,
            skip_room_on_empty_types: false,
            cors_origins: default_cors_origins(),
            simulate_base_dir: default_simulate_base_dir(),
        }
    }
}
