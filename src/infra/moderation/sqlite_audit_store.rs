// SQLite-backed moderation log.
//
// One row per filter check; the review columns are updated when a human
// works through the pending queue.

use crate::core::moderation::{
    ContentCategory, ModerationLogEntry, ModerationLogStore, NewLogEntry, Outcome, Submitter,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteAuditStore {
    pool: Pool<Sqlite>,
}

impl SqliteAuditStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content_type TEXT NOT NULL,
                original_content TEXT NOT NULL,
                filtered_content TEXT NOT NULL DEFAULT '',
                matched_names TEXT NOT NULL DEFAULT '[]',
                result TEXT NOT NULL,
                username TEXT,
                ip_address TEXT,
                user_agent TEXT,
                is_reviewed BOOLEAN NOT NULL DEFAULT 0,
                reviewed_by TEXT,
                reviewed_at TEXT,
                review_notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_moderation_log_review
                ON moderation_log(result, is_reviewed, created_at);
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> ModerationLogEntry {
        let category: String = row.get("content_type");
        let result: String = row.get("result");
        let matched_json: String = row.get("matched_names");
        let created_at: String = row.get("created_at");
        let reviewed_at: Option<String> = row.get("reviewed_at");

        ModerationLogEntry {
            id: row.get("id"),
            category: ContentCategory::parse(&category).unwrap_or(ContentCategory::Other),
            original_content: row.get("original_content"),
            filtered_content: row.get("filtered_content"),
            matched_names: serde_json::from_str(&matched_json).unwrap_or_default(),
            outcome: Outcome::parse(&result).unwrap_or(Outcome::Passed),
            submitter: Submitter {
                username: row.get("username"),
                ip_address: row.get("ip_address"),
                user_agent: row.get("user_agent"),
            },
            is_reviewed: row.get("is_reviewed"),
            reviewed_by: row.get("reviewed_by"),
            reviewed_at: reviewed_at.and_then(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
            }),
            review_notes: row.get("review_notes"),
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}

#[async_trait]
impl ModerationLogStore for SqliteAuditStore {
    async fn append(&self, entry: NewLogEntry) -> Result<i64> {
        let matched_json = serde_json::to_string(&entry.matched_names)?;
        let result = sqlx::query(
            r#"
            INSERT INTO moderation_log (
                content_type, original_content, filtered_content, matched_names,
                result, username, ip_address, user_agent, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.category.as_str())
        .bind(&entry.original_content)
        .bind(&entry.filtered_content)
        .bind(&matched_json)
        .bind(entry.outcome.as_str())
        .bind(&entry.submitter.username)
        .bind(&entry.submitter.ip_address)
        .bind(&entry.submitter.user_agent)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn pending_review(&self, limit: usize) -> Result<Vec<ModerationLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM moderation_log
            WHERE result = 'review' AND is_reviewed = 0
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::entry_from_row).collect())
    }

    async fn mark_reviewed(&self, entry_id: i64, reviewer: &str, notes: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE moderation_log
            SET is_reviewed = 1, reviewed_by = ?, reviewed_at = ?, review_notes = ?
            WHERE id = ?
            "#,
        )
        .bind(reviewer)
        .bind(Utc::now().to_rfc3339())
        .bind(notes)
        .bind(entry_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ModerationLogEntry>> {
        let rows = sqlx::query("SELECT * FROM moderation_log ORDER BY id DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(Self::entry_from_row).collect())
    }
}
