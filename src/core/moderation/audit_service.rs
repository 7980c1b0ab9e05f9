// Audit service - writes one log entry per check and drives the review
// queue for submissions the filter held back.

use super::audit_models::{ModerationLogEntry, NewLogEntry, Submitter};
use super::filter_models::{ContentCategory, FilterVerdict, Outcome};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ModerationLogStore: Send + Sync {
    /// Append an entry, returning its assigned id.
    async fn append(&self, entry: NewLogEntry) -> Result<i64>;

    /// Entries with outcome `review` not yet reviewed, oldest first.
    async fn pending_review(&self, limit: usize) -> Result<Vec<ModerationLogEntry>>;

    /// Stamp an entry as reviewed. Returns false if the id is unknown.
    async fn mark_reviewed(&self, entry_id: i64, reviewer: &str, notes: &str) -> Result<bool>;

    /// Newest entries first, for the operator console.
    async fn recent(&self, limit: usize) -> Result<Vec<ModerationLogEntry>>;
}

pub struct AuditService<S: ModerationLogStore> {
    store: S,
}

impl<S: ModerationLogStore> AuditService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record the outcome of one filter check.
    pub async fn record_check(
        &self,
        category: ContentCategory,
        original_text: &str,
        verdict: &FilterVerdict,
        submitter: Submitter,
    ) -> Result<i64> {
        let entry = NewLogEntry {
            category,
            original_content: original_text.to_string(),
            filtered_content: verdict.filtered_text.clone(),
            matched_names: verdict.matched.iter().map(|m| m.name().to_string()).collect(),
            outcome: verdict.outcome,
            submitter,
        };
        self.store.append(entry).await
    }

    pub async fn pending_review(&self, limit: usize) -> Result<Vec<ModerationLogEntry>> {
        self.store.pending_review(limit).await
    }

    pub async fn mark_reviewed(&self, entry_id: i64, reviewer: &str, notes: &str) -> Result<bool> {
        self.store.mark_reviewed(entry_id, reviewer, notes).await
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<ModerationLogEntry>> {
        self.store.recent(limit).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
