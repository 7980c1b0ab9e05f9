// JSON-based rule store. Persists the whole rule configuration in a single
// JSON document, for deployments that manage moderation rules as a flat
// file checked into ops config rather than a database.
//
// Counter bumps are write-through: the document is rewritten after each
// increment. Fine for the advisory counters this carries; not a fit for
// high-traffic sites, which should use the SQLite store.

use crate::core::moderation::{BlockedWord, FilterError, FilterRule, RuleStore, SpamPattern};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tokio::sync::RwLock;

#[derive(Debug, Serialize, Deserialize, Default)]
struct JsonStoreData {
    rules: Vec<FilterRule>,
    blocked_words: Vec<BlockedWord>,
    spam_patterns: Vec<SpamPattern>,
    next_id: i64,
}

pub struct JsonRuleStore {
    path: PathBuf,
    cache: RwLock<JsonStoreData>,
}

impl JsonRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache: JsonStoreData = if path.exists() {
            let file = File::open(&path).expect("Failed to open rule JSON file");
            let reader = BufReader::new(file);
            serde_json::from_reader(reader).unwrap_or_default()
        } else {
            JsonStoreData::default()
        };

        Self {
            path,
            cache: RwLock::new(cache),
        }
    }

    async fn persist(&self) -> Result<(), FilterError> {
        let cache = self.cache.read().await;
        let file =
            File::create(&self.path).map_err(|e| FilterError::StorageError(e.to_string()))?;
        serde_json::to_writer_pretty(file, &*cache)
            .map_err(|e| FilterError::StorageError(e.to_string()))?;
        Ok(())
    }

    pub async fn add_rule(&self, mut rule: FilterRule) -> Result<FilterRule, FilterError> {
        {
            let mut cache = self.cache.write().await;
            cache.next_id += 1;
            rule.id = cache.next_id;
            cache.rules.push(rule.clone());
        }
        self.persist().await?;
        Ok(rule)
    }

    pub async fn add_blocked_word(
        &self,
        mut word: BlockedWord,
    ) -> Result<BlockedWord, FilterError> {
        {
            let mut cache = self.cache.write().await;
            if cache.blocked_words.iter().any(|w| w.word == word.word) {
                return Err(FilterError::StorageError(format!(
                    "blocked word '{}' already exists",
                    word.word
                )));
            }
            cache.next_id += 1;
            word.id = cache.next_id;
            cache.blocked_words.push(word.clone());
        }
        self.persist().await?;
        Ok(word)
    }

    pub async fn add_spam_pattern(
        &self,
        mut pattern: SpamPattern,
    ) -> Result<SpamPattern, FilterError> {
        {
            let mut cache = self.cache.write().await;
            cache.next_id += 1;
            pattern.id = cache.next_id;
            cache.spam_patterns.push(pattern.clone());
        }
        self.persist().await?;
        Ok(pattern)
    }
}

#[async_trait]
impl RuleStore for JsonRuleStore {
    async fn active_rules(&self) -> Result<Vec<FilterRule>, FilterError> {
        let cache = self.cache.read().await;
        Ok(cache.rules.iter().filter(|r| r.is_active).cloned().collect())
    }

    async fn active_blocked_words(&self) -> Result<Vec<BlockedWord>, FilterError> {
        let cache = self.cache.read().await;
        Ok(cache
            .blocked_words
            .iter()
            .filter(|w| w.is_active)
            .cloned()
            .collect())
    }

    async fn active_spam_patterns(&self) -> Result<Vec<SpamPattern>, FilterError> {
        let cache = self.cache.read().await;
        Ok(cache
            .spam_patterns
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }

    async fn record_rule_match(&self, rule_id: i64) -> Result<(), FilterError> {
        {
            let mut cache = self.cache.write().await;
            if let Some(rule) = cache.rules.iter_mut().find(|r| r.id == rule_id) {
                rule.match_count = rule.match_count.saturating_add(1);
            }
        }
        self.persist().await
    }

    async fn record_spam_detection(&self, pattern_id: i64) -> Result<(), FilterError> {
        {
            let mut cache = self.cache.write().await;
            if let Some(pattern) = cache.spam_patterns.iter_mut().find(|p| p.id == pattern_id) {
                pattern.detection_count = pattern.detection_count.saturating_add(1);
            }
        }
        self.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{ContentCategory, ContentFilter, Outcome, RuleAction, RuleType};

    #[tokio::test]
    async fn test_rules_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");

        {
            let store = JsonRuleStore::new(&path);
            store
                .add_rule(FilterRule::new("bad word", RuleType::Word, "bad", RuleAction::Replace, 5))
                .await
                .unwrap();
            store
                .add_blocked_word(BlockedWord::new("casino", "advertising", 8))
                .await
                .unwrap();
        }

        let reloaded = JsonRuleStore::new(&path);
        assert_eq!(reloaded.active_rules().await.unwrap().len(), 1);
        assert_eq!(reloaded.active_blocked_words().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_counters_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");

        let rule_id = {
            let store = JsonRuleStore::new(&path);
            let rule = store
                .add_rule(FilterRule::new("bad word", RuleType::Word, "bad", RuleAction::Replace, 5))
                .await
                .unwrap();
            store.record_rule_match(rule.id).await.unwrap();
            rule.id
        };

        let reloaded = JsonRuleStore::new(&path);
        let rules = reloaded.active_rules().await.unwrap();
        assert_eq!(rules[0].id, rule_id);
        assert_eq!(rules[0].match_count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_word_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRuleStore::new(dir.path().join("rules.json"));

        store
            .add_blocked_word(BlockedWord::new("casino", "advertising", 8))
            .await
            .unwrap();
        assert!(store
            .add_blocked_word(BlockedWord::new("casino", "advertising", 8))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_filter_over_json_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRuleStore::new(dir.path().join("rules.json"));
        store
            .add_spam_pattern(SpamPattern::new("ad phrase", "click here", false))
            .await
            .unwrap();

        let filter = ContentFilter::new(store);
        let verdict = filter
            .check("please click here", ContentCategory::Comment)
            .await
            .unwrap();
        assert_eq!(verdict.outcome, Outcome::Blocked);

        let patterns = filter.store().active_spam_patterns().await.unwrap();
        assert_eq!(patterns[0].detection_count, 1);
    }
}
