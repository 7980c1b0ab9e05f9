// SQLite-backed rule store for persistent moderation configuration.
//
// Tables:
// - filter_rules: Pattern rules with action and severity
// - blocked_words: Vocabulary masked on sight
// - spam_patterns: Block-only spam signatures
//
// The admin CRUD methods are inherent; the filter itself only uses the
// RuleStore trait (active-set reads plus counter bumps).

use crate::core::moderation::{
    rule_catalog, BlockedWord, FilterError, FilterRule, RuleAction, RuleStore, RuleType,
    SpamPattern,
};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteRuleStore {
    pool: Pool<Sqlite>,
}

impl SqliteRuleStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), FilterError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS filter_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                rule_type TEXT NOT NULL DEFAULT 'word',
                pattern TEXT NOT NULL,
                replacement TEXT NOT NULL DEFAULT '***',
                action TEXT NOT NULL DEFAULT 'replace',
                description TEXT NOT NULL DEFAULT '',
                severity INTEGER NOT NULL DEFAULT 1,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                is_case_sensitive BOOLEAN NOT NULL DEFAULT 0,
                match_count INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| FilterError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blocked_words (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                word TEXT NOT NULL UNIQUE,
                category TEXT NOT NULL DEFAULT 'general',
                severity INTEGER NOT NULL DEFAULT 5,
                is_active BOOLEAN NOT NULL DEFAULT 1
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| FilterError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spam_patterns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                pattern TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                is_regex BOOLEAN NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                detection_count INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| FilterError::StorageError(e.to_string()))?;

        Ok(())
    }

    /// Insert a rule, returning it with its assigned id.
    pub async fn add_rule(&self, mut rule: FilterRule) -> Result<FilterRule, FilterError> {
        let result = sqlx::query(
            r#"
            INSERT INTO filter_rules (
                name, rule_type, pattern, replacement, action,
                description, severity, is_active, is_case_sensitive, match_count
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&rule.name)
        .bind(rule.rule_type.as_str())
        .bind(&rule.pattern)
        .bind(&rule.replacement)
        .bind(rule.action.as_str())
        .bind(&rule.description)
        .bind(rule.severity)
        .bind(rule.is_active)
        .bind(rule.is_case_sensitive)
        .bind(rule.match_count)
        .execute(&self.pool)
        .await
        .map_err(|e| FilterError::StorageError(e.to_string()))?;

        rule.id = result.last_insert_rowid();
        Ok(rule)
    }

    pub async fn add_blocked_word(&self, mut word: BlockedWord) -> Result<BlockedWord, FilterError> {
        let result = sqlx::query(
            "INSERT INTO blocked_words (word, category, severity, is_active) VALUES (?, ?, ?, ?)",
        )
        .bind(&word.word)
        .bind(&word.category)
        .bind(word.severity)
        .bind(word.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| FilterError::StorageError(e.to_string()))?;

        word.id = result.last_insert_rowid();
        Ok(word)
    }

    pub async fn add_spam_pattern(
        &self,
        mut pattern: SpamPattern,
    ) -> Result<SpamPattern, FilterError> {
        let result = sqlx::query(
            r#"
            INSERT INTO spam_patterns (name, pattern, description, is_regex, is_active, detection_count)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pattern.name)
        .bind(&pattern.pattern)
        .bind(&pattern.description)
        .bind(pattern.is_regex)
        .bind(pattern.is_active)
        .bind(pattern.detection_count)
        .execute(&self.pool)
        .await
        .map_err(|e| FilterError::StorageError(e.to_string()))?;

        pattern.id = result.last_insert_rowid();
        Ok(pattern)
    }

    /// Insert any default catalog entries that are not already present.
    ///
    /// Each rule, word, and pattern is checked individually, so a database
    /// that already holds part of the pack (or operator-added entries) only
    /// gains what it is missing. Safe to call on every startup.
    pub async fn seed_defaults(&self) -> Result<(), FilterError> {
        for rule in rule_catalog::default_filter_rules() {
            if !self.exists("filter_rules", "name", &rule.name).await? {
                self.add_rule(rule).await?;
            }
        }
        for word in rule_catalog::default_blocked_words() {
            if !self.exists("blocked_words", "word", &word.word).await? {
                self.add_blocked_word(word).await?;
            }
        }
        for pattern in rule_catalog::default_spam_patterns() {
            if !self.exists("spam_patterns", "name", &pattern.name).await? {
                self.add_spam_pattern(pattern).await?;
            }
        }
        Ok(())
    }

    async fn exists(&self, table: &str, column: &str, value: &str) -> Result<bool, FilterError> {
        // Table and column names come from the callers above, never from input.
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table} WHERE {column} = ?"))
            .bind(value)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;
        let n: i64 = row.get("n");
        Ok(n > 0)
    }

    /// Enable or disable a rule without deleting it.
    pub async fn set_rule_active(&self, rule_id: i64, active: bool) -> Result<(), FilterError> {
        sqlx::query("UPDATE filter_rules SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(rule_id)
            .execute(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;
        Ok(())
    }

    pub async fn set_word_active(&self, word_id: i64, active: bool) -> Result<(), FilterError> {
        sqlx::query("UPDATE blocked_words SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(word_id)
            .execute(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;
        Ok(())
    }

    pub async fn set_pattern_active(&self, pattern_id: i64, active: bool) -> Result<(), FilterError> {
        sqlx::query("UPDATE spam_patterns SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(pattern_id)
            .execute(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_rule(&self, rule_id: i64) -> Result<bool, FilterError> {
        let result = sqlx::query("DELETE FROM filter_rules WHERE id = ?")
            .bind(rule_id)
            .execute(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of configured rules, active or not. Used to decide whether a
    /// fresh database needs the default rule pack.
    pub async fn rule_count(&self) -> Result<i64, FilterError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM filter_rules")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;
        Ok(row.get("n"))
    }

    pub async fn word_count(&self) -> Result<i64, FilterError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM blocked_words")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;
        Ok(row.get("n"))
    }

    pub async fn pattern_count(&self) -> Result<i64, FilterError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM spam_patterns")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;
        Ok(row.get("n"))
    }

    fn rule_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<FilterRule, FilterError> {
        let rule_type: String = row.get("rule_type");
        let action: String = row.get("action");
        Ok(FilterRule {
            id: row.get("id"),
            name: row.get("name"),
            rule_type: RuleType::parse(&rule_type)
                .ok_or_else(|| FilterError::StorageError(format!("unknown rule type '{rule_type}'")))?,
            pattern: row.get("pattern"),
            replacement: row.get("replacement"),
            action: RuleAction::parse(&action)
                .ok_or_else(|| FilterError::StorageError(format!("unknown action '{action}'")))?,
            description: row.get("description"),
            severity: row.get("severity"),
            is_active: row.get("is_active"),
            is_case_sensitive: row.get("is_case_sensitive"),
            match_count: row.get("match_count"),
        })
    }
}

#[async_trait]
impl RuleStore for SqliteRuleStore {
    async fn active_rules(&self) -> Result<Vec<FilterRule>, FilterError> {
        let rows = sqlx::query("SELECT * FROM filter_rules WHERE is_active = 1")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;

        rows.iter().map(Self::rule_from_row).collect()
    }

    async fn active_blocked_words(&self) -> Result<Vec<BlockedWord>, FilterError> {
        let rows = sqlx::query("SELECT * FROM blocked_words WHERE is_active = 1")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| BlockedWord {
                id: row.get("id"),
                word: row.get("word"),
                category: row.get("category"),
                severity: row.get("severity"),
                is_active: row.get("is_active"),
            })
            .collect())
    }

    async fn active_spam_patterns(&self) -> Result<Vec<SpamPattern>, FilterError> {
        let rows = sqlx::query("SELECT * FROM spam_patterns WHERE is_active = 1")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| SpamPattern {
                id: row.get("id"),
                name: row.get("name"),
                pattern: row.get("pattern"),
                description: row.get("description"),
                is_regex: row.get("is_regex"),
                is_active: row.get("is_active"),
                detection_count: row.get("detection_count"),
            })
            .collect())
    }

    async fn record_rule_match(&self, rule_id: i64) -> Result<(), FilterError> {
        sqlx::query("UPDATE filter_rules SET match_count = match_count + 1 WHERE id = ?")
            .bind(rule_id)
            .execute(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn record_spam_detection(&self, pattern_id: i64) -> Result<(), FilterError> {
        sqlx::query("UPDATE spam_patterns SET detection_count = detection_count + 1 WHERE id = ?")
            .bind(pattern_id)
            .execute(&self.pool)
            .await
            .map_err(|e| FilterError::StorageError(e.to_string()))?;
        Ok(())
    }
}
