// In-memory implementation of RuleStore.
//
// Useful for embedders that load rules from configuration at startup and
// for tests that don't want a database. Counter bumps mutate the stored
// entries through DashMap's entry guards.

use crate::core::moderation::{BlockedWord, FilterError, FilterRule, RuleStore, SpamPattern};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

pub struct InMemoryRuleStore {
    rules: DashMap<i64, FilterRule>,
    words: DashMap<i64, BlockedWord>,
    patterns: DashMap<i64, SpamPattern>,
    next_id: AtomicI64,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self {
            rules: DashMap::new(),
            words: DashMap::new(),
            patterns: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn add_rule(&self, mut rule: FilterRule) -> FilterRule {
        rule.id = self.allocate_id();
        self.rules.insert(rule.id, rule.clone());
        rule
    }

    pub fn add_blocked_word(&self, mut word: BlockedWord) -> BlockedWord {
        word.id = self.allocate_id();
        self.words.insert(word.id, word.clone());
        word
    }

    pub fn add_spam_pattern(&self, mut pattern: SpamPattern) -> SpamPattern {
        pattern.id = self.allocate_id();
        self.patterns.insert(pattern.id, pattern.clone());
        pattern
    }

    pub fn set_rule_active(&self, rule_id: i64, active: bool) {
        if let Some(mut rule) = self.rules.get_mut(&rule_id) {
            rule.is_active = active;
        }
    }

    /// Current match counter for a rule, if it exists.
    pub fn rule_match_count(&self, rule_id: i64) -> Option<i64> {
        self.rules.get(&rule_id).map(|r| r.match_count)
    }

    pub fn spam_detection_count(&self, pattern_id: i64) -> Option<i64> {
        self.patterns.get(&pattern_id).map(|p| p.detection_count)
    }
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn active_rules(&self) -> Result<Vec<FilterRule>, FilterError> {
        Ok(self
            .rules
            .iter()
            .filter(|e| e.is_active)
            .map(|e| e.clone())
            .collect())
    }

    async fn active_blocked_words(&self) -> Result<Vec<BlockedWord>, FilterError> {
        Ok(self
            .words
            .iter()
            .filter(|e| e.is_active)
            .map(|e| e.clone())
            .collect())
    }

    async fn active_spam_patterns(&self) -> Result<Vec<SpamPattern>, FilterError> {
        Ok(self
            .patterns
            .iter()
            .filter(|e| e.is_active)
            .map(|e| e.clone())
            .collect())
    }

    async fn record_rule_match(&self, rule_id: i64) -> Result<(), FilterError> {
        if let Some(mut rule) = self.rules.get_mut(&rule_id) {
            rule.match_count = rule.match_count.saturating_add(1);
        }
        Ok(())
    }

    async fn record_spam_detection(&self, pattern_id: i64) -> Result<(), FilterError> {
        if let Some(mut pattern) = self.patterns.get_mut(&pattern_id) {
            pattern.detection_count = pattern.detection_count.saturating_add(1);
        }
        Ok(())
    }
}
