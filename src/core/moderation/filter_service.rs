// Content filter service - core moderation logic for user-submitted text.
//
// A check runs three stages in order:
// 1. Filter rules (descending severity) - block/replace/review/warning
// 2. Blocked words - always masked with `***`
// 3. Spam patterns - first hit blocks
//
// A `block` from stage 1 is terminal: the word and spam stages do not run.
// NO storage specifics here - rules come in through the RuleStore trait.

use super::filter_models::{
    BlockedWord, ContentCategory, FilterRule, FilterVerdict, MatchedItem, Outcome, RuleAction,
    SpamPattern,
};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for reading moderation configuration and recording hit counters.
///
/// The filter only ever reads active entries and bumps counters; rule CRUD
/// is an admin concern that lives on the concrete stores.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// All active filter rules, in any order; the service sorts them.
    async fn active_rules(&self) -> Result<Vec<FilterRule>, FilterError>;

    /// All active blocked words.
    async fn active_blocked_words(&self) -> Result<Vec<BlockedWord>, FilterError>;

    /// All active spam patterns.
    async fn active_spam_patterns(&self) -> Result<Vec<SpamPattern>, FilterError>;

    /// Increment a rule's match counter. Advisory; lost updates are fine.
    async fn record_rule_match(&self, rule_id: i64) -> Result<(), FilterError>;

    /// Increment a spam pattern's detection counter.
    async fn record_spam_detection(&self, pattern_id: i64) -> Result<(), FilterError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Evaluates text submissions against the configured rule sets.
pub struct ContentFilter<S: RuleStore> {
    store: S,
}

impl<S: RuleStore> ContentFilter<S> {
    /// Create a new content filter with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store (admin surfaces share it with the filter).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check a text submission.
    ///
    /// # Arguments
    /// * `text` - Arbitrary, possibly empty, user-submitted text
    /// * `category` - What kind of content this is; audit logging only
    ///
    /// # Returns
    /// A `FilterVerdict` with the outcome, the possibly-modified text, and
    /// the rules/words that matched. Never fails on account of the input
    /// text or a stored pattern; the only error source is fetching the
    /// active rule sets.
    pub async fn check(
        &self,
        text: &str,
        category: ContentCategory,
    ) -> Result<FilterVerdict, FilterError> {
        if text.is_empty() {
            return Ok(FilterVerdict::passed(text));
        }

        let mut filtered = text.to_string();
        let mut matched: Vec<MatchedItem> = Vec::new();
        let mut outcome = Outcome::Passed;

        // Stage 1: filter rules, highest severity first. Ties broken by name
        // so evaluation order is deterministic regardless of store backend.
        let mut rules = self.store.active_rules().await?;
        rules.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.name.cmp(&b.name)));

        for rule in rules {
            let re = match rule.compile() {
                Ok(re) => re,
                Err(err) => {
                    tracing::warn!(rule = %rule.name, %err, "malformed rule pattern, treating as non-match");
                    continue;
                }
            };

            if !re.is_match(&filtered) {
                continue;
            }

            // Counters are advisory statistics; a failed write must not
            // abort the check.
            if let Err(err) = self.store.record_rule_match(rule.id).await {
                tracing::warn!(rule = %rule.name, %err, "failed to record rule match");
            }

            match rule.action {
                RuleAction::Block => {
                    matched.push(MatchedItem::Rule(rule));
                    tracing::debug!(category = %category, outcome = %Outcome::Blocked, "content blocked by filter rule");
                    return Ok(FilterVerdict {
                        is_clean: false,
                        filtered_text: filtered,
                        matched,
                        outcome: Outcome::Blocked,
                    });
                }
                RuleAction::Replace => {
                    filtered = re
                        .replace_all(&filtered, regex::NoExpand(&rule.replacement))
                        .into_owned();
                    outcome = Outcome::Replaced;
                    matched.push(MatchedItem::Rule(rule));
                }
                RuleAction::Review => {
                    if outcome != Outcome::Blocked && outcome != Outcome::Replaced {
                        outcome = Outcome::Review;
                    }
                    matched.push(MatchedItem::Rule(rule));
                }
                RuleAction::Warning => {
                    if outcome == Outcome::Passed {
                        outcome = Outcome::Warning;
                    }
                    matched.push(MatchedItem::Rule(rule));
                }
            }
        }

        // Stage 2: blocked words, always masked.
        for word in self.store.active_blocked_words().await? {
            if word.matches(&filtered) {
                filtered = word.mask(&filtered);
                if outcome == Outcome::Passed {
                    outcome = Outcome::Replaced;
                }
                matched.push(MatchedItem::Word(word));
            }
        }

        // Stage 3: spam patterns against the current (possibly modified)
        // text. First hit blocks. Hits are counted but not added to the
        // matched list.
        for pattern in self.store.active_spam_patterns().await? {
            if pattern.matches(&filtered) {
                if let Err(err) = self.store.record_spam_detection(pattern.id).await {
                    tracing::warn!(pattern = %pattern.name, %err, "failed to record spam detection");
                }
                outcome = Outcome::Blocked;
                break;
            }
        }

        tracing::debug!(
            category = %category,
            outcome = %outcome,
            matches = matched.len(),
            "content check complete"
        );

        Ok(FilterVerdict {
            is_clean: outcome == Outcome::Passed,
            filtered_text: filtered,
            matched,
            outcome,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::filter_models::RuleType;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory store for testing
    struct MockRuleStore {
        rules: Vec<FilterRule>,
        words: Vec<BlockedWord>,
        patterns: Vec<SpamPattern>,
        rule_hits: DashMap<i64, i64>,
        spam_hits: DashMap<i64, i64>,
        fetches: AtomicUsize,
    }

    impl MockRuleStore {
        fn new() -> Self {
            Self {
                rules: Vec::new(),
                words: Vec::new(),
                patterns: Vec::new(),
                rule_hits: DashMap::new(),
                spam_hits: DashMap::new(),
                fetches: AtomicUsize::new(0),
            }
        }

        fn with_rule(mut self, rule: FilterRule) -> Self {
            let mut rule = rule;
            rule.id = self.rules.len() as i64 + 1;
            self.rules.push(rule);
            self
        }

        fn with_word(mut self, word: BlockedWord) -> Self {
            let mut word = word;
            word.id = self.words.len() as i64 + 1;
            self.words.push(word);
            self
        }

        fn with_pattern(mut self, pattern: SpamPattern) -> Self {
            let mut pattern = pattern;
            pattern.id = self.patterns.len() as i64 + 1;
            self.patterns.push(pattern);
            self
        }

        fn rule_hits(&self, rule_id: i64) -> i64 {
            self.rule_hits.get(&rule_id).map(|v| *v).unwrap_or(0)
        }

        fn spam_hits(&self, pattern_id: i64) -> i64 {
            self.spam_hits.get(&pattern_id).map(|v| *v).unwrap_or(0)
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RuleStore for MockRuleStore {
        async fn active_rules(&self) -> Result<Vec<FilterRule>, FilterError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.rules.iter().filter(|r| r.is_active).cloned().collect())
        }

        async fn active_blocked_words(&self) -> Result<Vec<BlockedWord>, FilterError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.words.iter().filter(|w| w.is_active).cloned().collect())
        }

        async fn active_spam_patterns(&self) -> Result<Vec<SpamPattern>, FilterError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .patterns
                .iter()
                .filter(|p| p.is_active)
                .cloned()
                .collect())
        }

        async fn record_rule_match(&self, rule_id: i64) -> Result<(), FilterError> {
            *self.rule_hits.entry(rule_id).or_insert(0) += 1;
            Ok(())
        }

        async fn record_spam_detection(&self, pattern_id: i64) -> Result<(), FilterError> {
            *self.spam_hits.entry(pattern_id).or_insert(0) += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_text_short_circuits_without_store_access() {
        let store = MockRuleStore::new()
            .with_rule(FilterRule::new("links", RuleType::Url, "", RuleAction::Block, 7));
        let filter = ContentFilter::new(store);

        let verdict = filter.check("", ContentCategory::Comment).await.unwrap();

        assert!(verdict.is_clean);
        assert_eq!(verdict.filtered_text, "");
        assert!(verdict.matched.is_empty());
        assert_eq!(verdict.outcome, Outcome::Passed);
        assert_eq!(filter.store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_clean_text_passes_unchanged() {
        let store = MockRuleStore::new()
            .with_rule(FilterRule::new("bad word", RuleType::Word, "bad", RuleAction::Replace, 5))
            .with_word(BlockedWord::new("spam", "advertising", 8))
            .with_pattern(SpamPattern::new("ad phrase", "click here", false));
        let filter = ContentFilter::new(store);

        let verdict = filter
            .check("a perfectly fine comment", ContentCategory::Comment)
            .await
            .unwrap();

        assert!(verdict.is_clean);
        assert_eq!(verdict.filtered_text, "a perfectly fine comment");
        assert!(verdict.matched.is_empty());
        assert_eq!(verdict.outcome, Outcome::Passed);
    }

    #[tokio::test]
    async fn test_block_rule_is_terminal_for_whole_check() {
        // A URL block should also prevent the word and spam stages from
        // touching the text or their counters.
        let store = MockRuleStore::new()
            .with_rule(FilterRule::new("no links", RuleType::Url, "http", RuleAction::Block, 7))
            .with_word(BlockedWord::new("visit", "advertising", 5))
            .with_pattern(SpamPattern::new("anything", "now", false));
        let filter = ContentFilter::new(store);

        let verdict = filter
            .check("visit http://x.com now", ContentCategory::Comment)
            .await
            .unwrap();

        assert!(!verdict.is_clean);
        assert_eq!(verdict.outcome, Outcome::Blocked);
        // Text untouched: the word stage never ran.
        assert_eq!(verdict.filtered_text, "visit http://x.com now");
        assert_eq!(verdict.matched.len(), 1);
        assert_eq!(verdict.matched[0].name(), "no links");
        assert_eq!(filter.store.spam_hits(1), 0);
    }

    #[tokio::test]
    async fn test_replace_rule_substitutes_every_occurrence() {
        let store = MockRuleStore::new().with_rule(FilterRule::new(
            "bad word",
            RuleType::Word,
            "bad",
            RuleAction::Replace,
            5,
        ));
        let filter = ContentFilter::new(store);

        let verdict = filter.check("this is bad", ContentCategory::Comment).await.unwrap();
        assert_eq!(verdict.filtered_text, "this is ***");
        assert_eq!(verdict.outcome, Outcome::Replaced);

        let verdict = filter
            .check("bad things are bad", ContentCategory::Comment)
            .await
            .unwrap();
        assert_eq!(verdict.filtered_text, "*** things are ***");
    }

    #[tokio::test]
    async fn test_malformed_regex_rule_never_raises() {
        let store = MockRuleStore::new().with_rule(FilterRule::new(
            "broken",
            RuleType::Regex,
            "(unclosed",
            RuleAction::Block,
            9,
        ));
        let filter = ContentFilter::new(store);

        let verdict = filter
            .check("(unclosed parenthesis in text", ContentCategory::Comment)
            .await
            .unwrap();

        assert!(verdict.is_clean);
        assert_eq!(verdict.outcome, Outcome::Passed);
        assert_eq!(filter.store.rule_hits(1), 0);
    }

    #[tokio::test]
    async fn test_higher_severity_block_preempts_lower_severity_rule() {
        let store = MockRuleStore::new()
            .with_rule(FilterRule::new("mild", RuleType::Word, "offer", RuleAction::Replace, 2))
            .with_rule(FilterRule::new("severe", RuleType::Word, "offer", RuleAction::Block, 9));
        let filter = ContentFilter::new(store);

        let verdict = filter
            .check("limited offer inside", ContentCategory::Comment)
            .await
            .unwrap();

        assert_eq!(verdict.outcome, Outcome::Blocked);
        assert_eq!(verdict.matched.len(), 1);
        assert_eq!(verdict.matched[0].name(), "severe");
        // The lower-severity rule never evaluated.
        assert_eq!(filter.store.rule_hits(1), 0);
        assert_eq!(filter.store.rule_hits(2), 1);
    }

    #[tokio::test]
    async fn test_equal_severity_breaks_ties_by_name() {
        let store = MockRuleStore::new()
            .with_rule(FilterRule::new("zebra", RuleType::Word, "deal", RuleAction::Review, 5))
            .with_rule(FilterRule::new("alpha", RuleType::Word, "deal", RuleAction::Block, 5));
        let filter = ContentFilter::new(store);

        let verdict = filter.check("great deal", ContentCategory::Comment).await.unwrap();

        // "alpha" sorts first and blocks before "zebra" runs.
        assert_eq!(verdict.outcome, Outcome::Blocked);
        assert_eq!(verdict.matched[0].name(), "alpha");
        assert_eq!(filter.store.rule_hits(1), 0);
    }

    #[tokio::test]
    async fn test_verdict_is_deterministic_and_counters_monotonic() {
        let store = MockRuleStore::new().with_rule(FilterRule::new(
            "bad word",
            RuleType::Word,
            "bad",
            RuleAction::Replace,
            5,
        ));
        let filter = ContentFilter::new(store);

        let first = filter.check("this is bad", ContentCategory::Comment).await.unwrap();
        let second = filter.check("this is bad", ContentCategory::Comment).await.unwrap();

        assert_eq!(first.filtered_text, second.filtered_text);
        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.is_clean, second.is_clean);
        assert_eq!(filter.store.rule_hits(1), 2);
    }

    #[tokio::test]
    async fn test_blocked_word_matching_is_case_insensitive() {
        let store = MockRuleStore::new().with_word(BlockedWord::new("spam", "advertising", 8));
        let filter = ContentFilter::new(store);

        let verdict = filter
            .check("This is SPAM content", ContentCategory::Comment)
            .await
            .unwrap();

        assert_eq!(verdict.filtered_text, "This is *** content");
        assert_eq!(verdict.outcome, Outcome::Replaced);
        assert_eq!(verdict.matched.len(), 1);
        assert_eq!(verdict.matched[0].name(), "spam");
    }

    #[tokio::test]
    async fn test_spam_pattern_blocks_but_is_not_listed() {
        let store = MockRuleStore::new()
            .with_pattern(SpamPattern::new("punctuation run", r"[!@#$%^&*]{5,}", true));
        let filter = ContentFilter::new(store);

        let verdict = filter
            .check("AMAZING!!!!!! see my profile", ContentCategory::Comment)
            .await
            .unwrap();

        assert_eq!(verdict.outcome, Outcome::Blocked);
        assert!(!verdict.is_clean);
        // Asymmetry preserved from the reference behavior: spam hits are
        // counted but not appended to the matched list.
        assert!(verdict.matched.is_empty());
        assert_eq!(filter.store.spam_hits(1), 1);
    }

    #[tokio::test]
    async fn test_first_spam_pattern_short_circuits_the_rest() {
        let store = MockRuleStore::new()
            .with_pattern(SpamPattern::new("ad phrase", "click here", false))
            .with_pattern(SpamPattern::new("also matches", "click", false));
        let filter = ContentFilter::new(store);

        let verdict = filter
            .check("please click here", ContentCategory::Comment)
            .await
            .unwrap();

        assert_eq!(verdict.outcome, Outcome::Blocked);
        assert_eq!(filter.store.spam_hits(1), 1);
        assert_eq!(filter.store.spam_hits(2), 0);
    }

    #[tokio::test]
    async fn test_spam_patterns_see_already_replaced_text() {
        // The replace stage rewrites the text before the spam stage sees it,
        // so a pattern matching the original text no longer fires.
        let store = MockRuleStore::new()
            .with_rule(FilterRule::new("bad word", RuleType::Word, "winner", RuleAction::Replace, 5))
            .with_pattern(SpamPattern::new("prize bait", "winner", false));
        let filter = ContentFilter::new(store);

        let verdict = filter
            .check("you are a winner", ContentCategory::Comment)
            .await
            .unwrap();

        assert_eq!(verdict.outcome, Outcome::Replaced);
        assert_eq!(verdict.filtered_text, "you are a ***");
        assert_eq!(filter.store.spam_hits(1), 0);
    }

    #[tokio::test]
    async fn test_review_does_not_downgrade_replaced() {
        let store = MockRuleStore::new()
            .with_rule(FilterRule::new("mask it", RuleType::Word, "deal", RuleAction::Replace, 8))
            .with_rule(FilterRule::new("look at it", RuleType::Word, "deal", RuleAction::Review, 3));
        let filter = ContentFilter::new(store);

        let verdict = filter.check("a deal", ContentCategory::Comment).await.unwrap();

        // Replace fired first; the later review match doesn't change the
        // outcome (and its pattern no longer matches the masked text anyway,
        // so force the order check through severity instead).
        assert_eq!(verdict.outcome, Outcome::Replaced);
    }

    #[tokio::test]
    async fn test_warning_upgrades_to_review_but_not_back() {
        let store = MockRuleStore::new()
            .with_rule(FilterRule::new("heads up", RuleType::Word, "iffy", RuleAction::Warning, 8))
            .with_rule(FilterRule::new("take a look", RuleType::Word, "iffy", RuleAction::Review, 3));
        let filter = ContentFilter::new(store);

        let verdict = filter.check("this is iffy", ContentCategory::Comment).await.unwrap();

        // Warning fired first (higher severity), then review upgraded it.
        assert_eq!(verdict.outcome, Outcome::Review);
        assert_eq!(verdict.matched.len(), 2);
        assert!(!verdict.is_clean);
        // Neither action modifies the text.
        assert_eq!(verdict.filtered_text, "this is iffy");
    }

    #[tokio::test]
    async fn test_inactive_entries_are_ignored() {
        let mut rule = FilterRule::new("disabled", RuleType::Word, "bad", RuleAction::Block, 9);
        rule.is_active = false;
        let mut word = BlockedWord::new("bad", "profanity", 9);
        word.is_active = false;

        let store = MockRuleStore::new().with_rule(rule).with_word(word);
        let filter = ContentFilter::new(store);

        let verdict = filter.check("this is bad", ContentCategory::Comment).await.unwrap();
        assert!(verdict.is_clean);
        assert_eq!(verdict.outcome, Outcome::Passed);
    }
}
