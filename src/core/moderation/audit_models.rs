// Audit domain models - records of past moderation decisions.

use super::filter_models::{ContentCategory, Outcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who submitted the content, as far as the web layer knows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Submitter {
    pub username: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Submitter {
    /// Submitter with no identifying information.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// A new audit record, before the store assigns it an id.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub category: ContentCategory,
    pub original_content: String,
    pub filtered_content: String,
    /// Names of the filter rules and blocked words that matched.
    pub matched_names: Vec<String>,
    pub outcome: Outcome,
    pub submitter: Submitter,
}

/// A stored moderation decision. Written once per check by the audit
/// service; only the review fields are ever updated afterwards.
#[derive(Debug, Clone)]
pub struct ModerationLogEntry {
    pub id: i64,
    pub category: ContentCategory,
    pub original_content: String,
    pub filtered_content: String,
    pub matched_names: Vec<String>,
    pub outcome: Outcome,
    pub submitter: Submitter,
    pub is_reviewed: bool,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: String,
    pub created_at: DateTime<Utc>,
}
