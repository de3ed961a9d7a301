//! Outcomes of publishing and whole distribution runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::content::{ContextSource, GeneratedContent};

/// Outcome of one adapter invocation.
///
/// `external_id` is present iff `succeeded`; `error_detail` iff not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResult {
    pub channel_id: String,
    pub succeeded: bool,
    pub external_id: Option<String>,
    pub error_detail: Option<String>,
    pub attempted_at: DateTime<Utc>,

    /// Content handed to the adapter (absent if the channel failed before generation)
    pub content: Option<GeneratedContent>,

    /// Format: "{run_id}:{channel}:{body_hash}"
    pub idempotency_key: String,
}

impl PublishResult {
    pub fn success(
        run_id: Uuid,
        content: GeneratedContent,
        external_id: String,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            channel_id: content.channel_id().to_string(),
            succeeded: true,
            external_id: Some(external_id),
            error_detail: None,
            attempted_at,
            idempotency_key: publish_idempotency_key(run_id, content.channel_id(), content.body()),
            content: Some(content),
        }
    }

    pub fn failure(
        run_id: Uuid,
        channel_id: impl Into<String>,
        content: Option<GeneratedContent>,
        error_detail: impl Into<String>,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        let channel_id = channel_id.into();
        let body = content.as_ref().map(|c| c.body()).unwrap_or_default();
        Self {
            idempotency_key: publish_idempotency_key(run_id, &channel_id, body),
            channel_id,
            succeeded: false,
            external_id: None,
            error_detail: Some(error_detail.into()),
            attempted_at,
            content,
        }
    }

    /// Body that was (or would have been) published
    pub fn body(&self) -> Option<&str> {
        self.content.as_ref().map(|c| c.body())
    }
}

/// Aggregate of one distribution run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub run_id: Uuid,
    pub results: Vec<PublishResult>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub context_source: ContextSource,
}

impl DistributionReport {
    /// Assemble a report; counts are derived from `results`
    pub fn new(
        run_id: Uuid,
        results: Vec<PublishResult>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        context_source: ContextSource,
    ) -> Self {
        let succeeded_count = results.iter().filter(|r| r.succeeded).count();
        let failed_count = results.len() - succeeded_count;
        Self {
            run_id,
            results,
            started_at,
            completed_at,
            succeeded_count,
            failed_count,
            context_source,
        }
    }

    pub fn result_for(&self, channel_id: &str) -> Option<&PublishResult> {
        self.results.iter().find(|r| r.channel_id == channel_id)
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_count == 0
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }
}

/// A ledger row: a report plus its sequence number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sequence: u64,
    pub report: DistributionReport,
}

/// Generate an idempotency key for one channel publish
pub fn publish_idempotency_key(run_id: Uuid, channel_id: &str, body: &str) -> String {
    format!("{}:{}:{}", run_id, channel_id, hash_body(body))
}

/// Hash body content (first 16 hex chars of SHA256)
pub fn hash_body(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}
