//! Cost-tracking sink: records token usage per inference call.
//!
//! A per-request instance with append-only writes under a mutex. No
//! inspection history is persisted, so this stays an in-memory,
//! request-scoped collector rather than a database-backed log.

use crate::domain::TokenUsage;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::warn;

/// One recorded call: which stage it was (`label`), which model served it,
/// and the tokens it consumed.
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub label: String,
    pub model: String,
    pub usage: TokenUsage,
}

/// Capability the inference adapter calls on every completed request.
/// Implementations must not let tracking failures propagate — C5's
/// "failures in tracking are non-fatal" rule.
#[async_trait]
pub trait UsageObserver: Send + Sync {
    async fn record_usage(&self, label: &str, model: &str, usage: TokenUsage);
}

/// The default in-memory, append-only cost sink for one request.
#[derive(Default)]
pub struct CostSink {
    records: Mutex<Vec<UsageRecord>>,
}

impl CostSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<UsageRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    pub fn totals(&self) -> TokenUsage {
        let records = self.records();
        let mut total = TokenUsage::default();
        for r in &records {
            total.prompt_tokens += r.usage.prompt_tokens;
            total.completion_tokens += r.usage.completion_tokens;
            total.total_tokens += r.usage.total_tokens;
        }
        total
    }
}

#[async_trait]
impl UsageObserver for CostSink {
    async fn record_usage(&self, label: &str, model: &str, usage: TokenUsage) {
        let mut guard = match self.records.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("cost sink mutex poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.push(UsageRecord {
            label: label.to_string(),
            model: model.to_string(),
            usage,
        });
    }
}

/// A `UsageObserver` that does nothing, for call sites (tests, simulate
/// mode wiring where cost isn't wanted) that don't need tracking.
pub struct NullUsageObserver;

#[async_trait]
impl UsageObserver for NullUsageObserver {
    async fn record_usage(&self, _label: &str, _model: &str, _usage: TokenUsage) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accumulates_totals_across_calls() {
        let sink = CostSink::new();
        sink.record_usage(
            "house-checklist",
            "gpt-4o-mini",
            TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            },
        )
        .await;
        sink.record_usage(
            "room-checklist",
            "gpt-4o-mini",
            TokenUsage {
                prompt_tokens: 40,
                completion_tokens: 10,
                total_tokens: 50,
            },
        )
        .await;

        let totals = sink.totals();
        assert_eq!(totals.prompt_tokens, 140);
        assert_eq!(totals.completion_tokens, 60);
        assert_eq!(totals.total_tokens, 200);
        assert_eq!(sink.records().len(), 2);
    }
}
