//! Inference Adapter (C5): three typed operations over the raw
//! `InferenceClient` transport, gated by the governor and observed by a
//! `UsageObserver`.

pub mod client;
pub mod prompts;

pub use client::{CompletionRequest, ImagePart, InferenceClient, OpenAiCompatibleClient};

use crate::cost_tracker::UsageObserver;
use crate::domain::{ChecklistItem, EvaluationResult, Image, ProsCons};
use crate::error::{PipelineError, Result};
use crate::governor::Governor;
use crate::normalize::{extract_json_object, normalize_response};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Rough token-cost estimate used only to size the governor's TPM
/// reservation; the real count comes back in the response and is what
/// gets recorded for cost tracking. One image is weighted like ~300
/// text tokens at "low" detail, matching typical vision-model pricing.
fn estimate_tokens(user_text_len: usize, image_count: usize) -> u64 {
    (user_text_len / 4) as u64 + (image_count as u64 * 300) + 200
}

pub struct InferenceAdapter {
    client: Arc<dyn InferenceClient>,
    governor: Arc<Governor>,
    usage: Arc<dyn UsageObserver>,
    vision_model: String,
    text_model: String,
    checklist_batch_size: usize,
}

impl InferenceAdapter {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        governor: Arc<Governor>,
        usage: Arc<dyn UsageObserver>,
        vision_model: impl Into<String>,
        text_model: impl Into<String>,
        checklist_batch_size: usize,
    ) -> Self {
        Self {
            client,
            governor,
            usage,
            vision_model: vision_model.into(),
            text_model: text_model.into(),
            checklist_batch_size: checklist_batch_size.max(1),
        }
    }

    fn image_parts(images: &[Image]) -> Vec<ImagePart> {
        images.iter().map(|img| ImagePart::low_detail(&img.bytes)).collect()
    }

    async fn record(&self, label: &str, model: &str, usage: Option<crate::domain::TokenUsage>) {
        if let Some(usage) = usage {
            self.usage.record_usage(label, model, usage).await;
        }
    }

    /// Agent 1 / Agent 3: classify house or room photos against a fixed
    /// set of allowed type identifiers.
    pub async fn classify(
        &self,
        images: &[Image],
        allowed_types: &[String],
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let user_text = prompts::classify_user_text(allowed_types);
        let image_parts = Self::image_parts(images);
        let estimated = estimate_tokens(user_text.len(), image_parts.len());

        let permit = self
            .governor
            .acquire(estimated, label, cancel)
            .await
            .ok_or(PipelineError::Cancelled)?;

        let response = self
            .client
            .complete(
                CompletionRequest {
                    model: &self.vision_model,
                    system_prompt: prompts::classify_system_prompt(),
                    user_text,
                    images: image_parts,
                    json_mode: true,
                },
                cancel,
            )
            .await?;
        drop(permit);

        self.record(label, &self.vision_model, response.usage).await;

        let parsed = extract_json_object(&response.content).ok_or_else(|| {
            PipelineError::ResponseMalformed(format!("classify response not a JSON object: {label}"))
        })?;

        #[derive(Deserialize, Default)]
        struct ClassifyWire {
            #[serde(default)]
            types: Vec<String>,
        }
        let wire: ClassifyWire = serde_json::from_value(parsed).unwrap_or_default();

        let allowed: std::collections::HashSet<&str> =
            allowed_types.iter().map(String::as_str).collect();
        Ok(wire
            .types
            .into_iter()
            .filter(|t| allowed.contains(t.as_str()))
            .collect())
    }

    /// Agent 2 / Agent 4: evaluate a checklist in contiguous batches,
    /// merging the per-batch normalized results.
    pub async fn evaluate_checklist(
        &self,
        images: &[Image],
        items: &[ChecklistItem],
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<EvaluationResult> {
        let image_parts = Self::image_parts(images);
        let mut merged = EvaluationResult::default();

        for (batch_index, batch) in items.chunks(self.checklist_batch_size).enumerate() {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let user_text = prompts::checklist_user_text(batch);
            let estimated = estimate_tokens(user_text.len(), image_parts.len());
            let batch_label = format!("{label}#batch{batch_index}");

            let permit = self
                .governor
                .acquire(estimated, &batch_label, cancel)
                .await
                .ok_or(PipelineError::Cancelled)?;

            let response = self
                .client
                .complete(
                    CompletionRequest {
                        model: &self.vision_model,
                        system_prompt: prompts::checklist_system_prompt(),
                        user_text,
                        images: image_parts.clone(),
                        json_mode: true,
                    },
                    cancel,
                )
                .await?;
            drop(permit);

            self.record(&batch_label, &self.vision_model, response.usage).await;

            let raw = extract_json_object(&response.content).unwrap_or_else(|| {
                warn!(label = %batch_label, "checklist response had no JSON object, treating as empty");
                serde_json::Value::Object(Default::default())
            });

            merged.merge(normalize_response(&raw, batch));
        }

        Ok(merged)
    }

    /// Agent 6: synthesize pros/cons from already-collected issue lines.
    pub async fn synthesize_pros_cons(
        &self,
        house_issues: &[String],
        room_issues: &[String],
        product_issues: &[String],
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<ProsCons> {
        let user_text = prompts::pros_cons_user_text(house_issues, room_issues, product_issues);
        let estimated = estimate_tokens(user_text.len(), 0);

        let permit = self
            .governor
            .acquire(estimated, label, cancel)
            .await
            .ok_or(PipelineError::Cancelled)?;

        let response = self
            .client
            .complete(
                CompletionRequest {
                    model: &self.text_model,
                    system_prompt: prompts::pros_cons_system_prompt(),
                    user_text,
                    images: Vec::new(),
                    json_mode: true,
                },
                cancel,
            )
            .await?;
        drop(permit);

        self.record(label, &self.text_model, response.usage).await;

        let parsed = extract_json_object(&response.content).ok_or_else(|| {
            PipelineError::ResponseMalformed(format!("pros/cons response not a JSON object: {label}"))
        })?;

        #[derive(Deserialize, Default)]
        struct ProsConsWire {
            #[serde(default)]
            pros: Vec<String>,
            #[serde(default)]
            cons: Vec<String>,
        }
        let wire: ProsConsWire = serde_json::from_value(parsed).unwrap_or_default();

        Ok(ProsCons {
            pros: wire.pros,
            cons: wire.cons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_tracker::CostSink;
    use crate::domain::ChecklistItem;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeClient {
        responses: Vec<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl InferenceClient for FakeClient {
        async fn complete(
            &self,
            _request: CompletionRequest<'_>,
            _cancel: &CancellationToken,
        ) -> Result<client::CompletionResponse> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            let content = self.responses[idx % self.responses.len()];
            Ok(client::CompletionResponse {
                content: content.to_string(),
                usage: Some(crate::domain::TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
            })
        }
    }

    fn adapter(client: FakeClient) -> InferenceAdapter {
        InferenceAdapter::new(
            Arc::new(client),
            Arc::new(Governor::new(1_000_000, 1_000_000, 4)),
            Arc::new(CostSink::new()),
            "vision-model",
            "text-model",
            6,
        )
    }

    #[tokio::test]
    async fn classify_filters_to_allowed_types() {
        let client = FakeClient {
            responses: vec![r#"{"types": ["kitchen", "garage", "not-allowed"]}"#],
            calls: AtomicUsize::new(0),
        };
        let adapter = adapter(client);
        let allowed = vec!["kitchen".to_string(), "garage".to_string(), "bathroom".to_string()];
        let cancel = CancellationToken::new();

        let result = adapter
            .classify(&[], &allowed, "classify-house", &cancel)
            .await
            .unwrap();

        assert_eq!(result, vec!["kitchen".to_string(), "garage".to_string()]);
    }

    #[tokio::test]
    async fn evaluate_checklist_merges_batches() {
        let client = FakeClient {
            responses: vec![
                r#"{"booleans": {"has_mold": true}}"#,
                r#"{"booleans": {"has_leak": false}}"#,
            ],
            calls: AtomicUsize::new(0),
        };
        let mut adapter = adapter(client);
        adapter.checklist_batch_size = 1;

        let items = vec![ChecklistItem::boolean("has_mold"), ChecklistItem::boolean("has_leak")];
        let cancel = CancellationToken::new();

        let result = adapter
            .evaluate_checklist(&[], &items, "house-checklist", &cancel)
            .await
            .unwrap();

        assert_eq!(result.booleans.get("has_mold"), Some(&true));
        assert_eq!(result.booleans.get("has_leak"), Some(&false));
    }

    #[tokio::test]
    async fn synthesize_pros_cons_parses_response() {
        let client = FakeClient {
            responses: vec![r#"{"pros": ["bright kitchen"], "cons": ["old roof"]}"#],
            calls: AtomicUsize::new(0),
        };
        let adapter = adapter(client);
        let cancel = CancellationToken::new();

        let result = adapter
            .synthesize_pros_cons(&[], &[], &[], "pros-cons", &cancel)
            .await
            .unwrap();

        assert_eq!(result.pros, vec!["bright kitchen".to_string()]);
        assert_eq!(result.cons, vec!["old roof".to_string()]);
    }
}
