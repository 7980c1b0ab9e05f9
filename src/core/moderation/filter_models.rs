// Moderation domain models - configuration records the filter evaluates.
//
// These are pure domain types with no storage dependencies.
// The infra layer maps them to SQLite rows / JSON documents.

use crate::core::moderation::filter_service::FilterError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Mask token substituted for blocked words.
pub const MASK: &str = "***";

/// Match expression used by `url`-type rules regardless of the stored pattern.
const URL_PATTERN: &str = r"https?://\S+";

/// How a filter rule's stored pattern is turned into a match expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    /// Whole word, delimited by word boundaries.
    Word,
    /// Escaped literal substring.
    Pattern,
    /// Stored pattern used directly as a regular expression.
    Regex,
    /// Any http/https link; the stored pattern is ignored.
    Url,
}

impl RuleType {
    /// Convert to string representation for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Word => "word",
            RuleType::Pattern => "pattern",
            RuleType::Regex => "regex",
            RuleType::Url => "url",
        }
    }

    /// Parse from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "word" => Some(RuleType::Word),
            "pattern" => Some(RuleType::Pattern),
            "regex" => Some(RuleType::Regex),
            "url" => Some(RuleType::Url),
            _ => None,
        }
    }
}

/// What happens when a filter rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Reject the submission outright; terminal for the whole check.
    Block,
    /// Substitute every match with the rule's replacement text.
    Replace,
    /// Hold the submission for human review.
    Review,
    /// Let the submission through but flag it.
    Warning,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Block => "block",
            RuleAction::Replace => "replace",
            RuleAction::Review => "review",
            RuleAction::Warning => "warning",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "block" => Some(RuleAction::Block),
            "replace" => Some(RuleAction::Replace),
            "review" => Some(RuleAction::Review),
            "warning" => Some(RuleAction::Warning),
            _ => None,
        }
    }
}

/// The verdict of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Blocked,
    Replaced,
    Review,
    Warning,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Blocked => "blocked",
            Outcome::Replaced => "replaced",
            Outcome::Review => "review",
            Outcome::Warning => "warning",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "passed" => Some(Outcome::Passed),
            "blocked" => Some(Outcome::Blocked),
            "replaced" => Some(Outcome::Replaced),
            "review" => Some(Outcome::Review),
            "warning" => Some(Outcome::Warning),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of content being checked. Carried through for audit logging only;
/// it does not change rule selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Comment,
    Post,
    Message,
    Other,
}

impl ContentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Comment => "comment",
            ContentCategory::Post => "post",
            ContentCategory::Message => "message",
            ContentCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "comment" => Some(ContentCategory::Comment),
            "post" => Some(ContentCategory::Post),
            "message" => Some(ContentCategory::Message),
            "other" => Some(ContentCategory::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured pattern with an associated action, evaluated against
/// submitted text in descending severity order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRule {
    pub id: i64,
    pub name: String,
    pub rule_type: RuleType,
    pub pattern: String,
    pub replacement: String,
    pub action: RuleAction,
    pub description: String,
    /// 1 (mild) to 10 (severe).
    pub severity: i32,
    pub is_active: bool,
    pub is_case_sensitive: bool,
    /// Advisory hit counter, incremented by the store on each match.
    pub match_count: i64,
}

impl FilterRule {
    /// Create a rule with the default replacement, active, case-insensitive.
    pub fn new(
        name: impl Into<String>,
        rule_type: RuleType,
        pattern: impl Into<String>,
        action: RuleAction,
        severity: i32,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            rule_type,
            pattern: pattern.into(),
            replacement: MASK.to_string(),
            action,
            description: String::new(),
            severity,
            is_active: true,
            is_case_sensitive: false,
            match_count: 0,
        }
    }

    /// The regex source this rule evaluates, derived from its type.
    fn effective_pattern(&self) -> String {
        match self.rule_type {
            RuleType::Word => format!(r"\b{}\b", regex::escape(&self.pattern)),
            RuleType::Pattern => regex::escape(&self.pattern),
            RuleType::Regex => self.pattern.clone(),
            RuleType::Url => URL_PATTERN.to_string(),
        }
    }

    /// Compile the match expression. A stored pattern can be malformed
    /// (only `regex`-type rules, the others are escaped); callers treat a
    /// compile failure as "rule does not match".
    pub fn compile(&self) -> Result<Regex, regex::Error> {
        RegexBuilder::new(&self.effective_pattern())
            .case_insensitive(!self.is_case_sensitive)
            .build()
    }

    /// Admin-entry validation: reject malformed patterns before they reach
    /// evaluation. Evaluation itself never relies on this.
    pub fn validate(&self) -> Result<(), FilterError> {
        self.compile().map(|_| ()).map_err(|e| FilterError::InvalidPattern {
            pattern: self.pattern.clone(),
            message: e.to_string(),
        })
    }
}

/// An exact-vocabulary entry always masked when found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedWord {
    pub id: i64,
    pub word: String,
    pub category: String,
    /// 1 (mild) to 10 (severe).
    pub severity: i32,
    pub is_active: bool,
}

impl BlockedWord {
    pub fn new(word: impl Into<String>, category: impl Into<String>, severity: i32) -> Self {
        Self {
            id: 0,
            word: word.into(),
            category: category.into(),
            severity,
            is_active: true,
        }
    }

    /// The case-insensitive matcher shared by detection and masking, so the
    /// two can never disagree on what counts as an occurrence.
    fn matcher(&self) -> Option<Regex> {
        RegexBuilder::new(&regex::escape(&self.word))
            .case_insensitive(true)
            .build()
            .ok()
    }

    /// Case-insensitive containment, using the same folding as `mask`.
    pub fn matches(&self, text: &str) -> bool {
        match self.matcher() {
            Some(re) => re.is_match(text),
            // Escaped literals always compile; exact-case fallback just in case.
            None => text.contains(&self.word),
        }
    }

    /// Mask every case-insensitive occurrence of the word.
    pub fn mask(&self, text: &str) -> String {
        match self.matcher() {
            Some(re) => re.replace_all(text, regex::NoExpand(MASK)).into_owned(),
            None => text.replace(&self.word, MASK),
        }
    }
}

/// A terminal, block-only detector for known spam signatures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpamPattern {
    pub id: i64,
    pub name: String,
    pub pattern: String,
    pub description: String,
    pub is_regex: bool,
    pub is_active: bool,
    /// Advisory hit counter, incremented by the store on each detection.
    pub detection_count: i64,
}

impl SpamPattern {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, is_regex: bool) -> Self {
        Self {
            id: 0,
            name: name.into(),
            pattern: pattern.into(),
            description: String::new(),
            is_regex,
            is_active: true,
            detection_count: 0,
        }
    }

    /// Whole-text match: regex if flagged, literal containment otherwise.
    /// A malformed regex is treated as non-matching.
    pub fn matches(&self, text: &str) -> bool {
        if self.is_regex {
            match Regex::new(&self.pattern) {
                Ok(re) => re.is_match(text),
                Err(err) => {
                    tracing::warn!(pattern = %self.name, %err, "malformed spam regex, treating as non-match");
                    false
                }
            }
        } else {
            text.contains(&self.pattern)
        }
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if !self.is_regex {
            return Ok(());
        }
        Regex::new(&self.pattern)
            .map(|_| ())
            .map_err(|e| FilterError::InvalidPattern {
                pattern: self.pattern.clone(),
                message: e.to_string(),
            })
    }
}

/// Something that matched during a check; returned to the caller for audit
/// logging. Spam pattern hits are deliberately not represented here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchedItem {
    Rule(FilterRule),
    Word(BlockedWord),
}

impl MatchedItem {
    /// Display name used in audit records.
    pub fn name(&self) -> &str {
        match self {
            MatchedItem::Rule(rule) => &rule.name,
            MatchedItem::Word(word) => &word.word,
        }
    }
}

/// Result of checking one text submission.
#[derive(Debug, Clone)]
pub struct FilterVerdict {
    /// True only when nothing matched at all.
    pub is_clean: bool,
    /// Text after all replacements performed before any terminal block.
    pub filtered_text: String,
    /// Filter rules and blocked words that matched, in evaluation order.
    pub matched: Vec<MatchedItem>,
    pub outcome: Outcome,
}

impl FilterVerdict {
    /// Verdict for text no rule touched.
    pub fn passed(text: &str) -> Self {
        Self {
            is_clean: true,
            filtered_text: text.to_string(),
            matched: Vec::new(),
            outcome: Outcome::Passed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_type_conversion() {
        for ty in [RuleType::Word, RuleType::Pattern, RuleType::Regex, RuleType::Url] {
            assert_eq!(RuleType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(RuleType::parse("bogus"), None);
    }

    #[test]
    fn test_outcome_conversion() {
        for outcome in [
            Outcome::Passed,
            Outcome::Blocked,
            Outcome::Replaced,
            Outcome::Review,
            Outcome::Warning,
        ] {
            assert_eq!(Outcome::parse(outcome.as_str()), Some(outcome));
        }
    }

    #[test]
    fn test_word_rule_respects_boundaries() {
        let rule = FilterRule::new("cat", RuleType::Word, "cat", RuleAction::Replace, 5);
        let re = rule.compile().unwrap();
        assert!(re.is_match("a cat sat"));
        assert!(!re.is_match("concatenate"));
    }

    #[test]
    fn test_pattern_rule_escapes_metacharacters() {
        let rule = FilterRule::new("dots", RuleType::Pattern, "a.b", RuleAction::Replace, 5);
        let re = rule.compile().unwrap();
        assert!(re.is_match("see a.b here"));
        assert!(!re.is_match("see axb here"));
    }

    #[test]
    fn test_url_rule_ignores_stored_pattern() {
        let rule = FilterRule::new("links", RuleType::Url, "http", RuleAction::Block, 7);
        let re = rule.compile().unwrap();
        assert!(re.is_match("visit https://example.org/x now"));
        assert!(re.is_match("visit http://x.com now"));
        assert!(!re.is_match("no links here"));
    }

    #[test]
    fn test_case_sensitive_flag() {
        let mut rule = FilterRule::new("secret", RuleType::Word, "Secret", RuleAction::Replace, 5);
        rule.is_case_sensitive = true;
        let re = rule.compile().unwrap();
        assert!(re.is_match("the Secret plan"));
        assert!(!re.is_match("the secret plan"));
    }

    #[test]
    fn test_validate_rejects_malformed_regex() {
        let rule = FilterRule::new("broken", RuleType::Regex, "(unclosed", RuleAction::Block, 5);
        assert!(rule.validate().is_err());

        let literal = FilterRule::new("fine", RuleType::Pattern, "(unclosed", RuleAction::Block, 5);
        assert!(literal.validate().is_ok());
    }

    #[test]
    fn test_blocked_word_masks_case_insensitively() {
        let word = BlockedWord::new("spam", "advertising", 8);
        assert!(word.matches("This is SPAM content"));
        assert_eq!(word.mask("This is SPAM content"), "This is *** content");
    }

    #[test]
    fn test_blocked_word_detection_and_masking_agree() {
        let word = BlockedWord::new("hi", "general", 5);
        // Dotted capital I lowercases to "i" plus a combining mark, which
        // naive lowercase containment counts as a hit the masking regex
        // cannot see. Detection and masking must fold the same way: a
        // detected word is always masked.
        for text in ["say HİX", "say HI", "say hi", "all clear"] {
            assert_eq!(word.matches(text), word.mask(text) != text, "diverged on {text:?}");
        }
        assert!(word.matches("say HI"));
        assert_eq!(word.mask("say HI"), "say ***");
    }

    #[test]
    fn test_spam_pattern_literal_and_regex() {
        let literal = SpamPattern::new("ad phrase", "click here", false);
        assert!(literal.matches("please click here now"));
        assert!(!literal.matches("please click there"));

        let runs = SpamPattern::new("exclamation runs", r"!{5,}", true);
        assert!(runs.matches("wow!!!!!!"));
        assert!(!runs.matches("wow!!"));
    }

    #[test]
    fn test_malformed_spam_regex_is_non_match() {
        let broken = SpamPattern::new("broken", "(unclosed", true);
        assert!(!broken.matches("(unclosed"));
        assert!(broken.validate().is_err());
    }
}
