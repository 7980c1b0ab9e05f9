// Default rule pack
//
// Seeded into an empty rule store by the maintenance console so a fresh
// deployment filters something sensible before an admin configures rules.

use super::filter_models::{BlockedWord, FilterRule, RuleAction, RuleType, SpamPattern};

/// Rules a fresh gallery deployment starts with.
pub fn default_filter_rules() -> Vec<FilterRule> {
    let mut url_block = FilterRule::new("Link posting", RuleType::Url, "http", RuleAction::Block, 7);
    url_block.description = "Comments may not contain links".to_string();

    let mut phone = FilterRule::new(
        "Phone number",
        RuleType::Regex,
        r"\d{3}-\d{3,4}-\d{4}",
        RuleAction::Replace,
        5,
    );
    phone.description = "Mask phone numbers".to_string();

    let mut email = FilterRule::new(
        "Email address",
        RuleType::Regex,
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}",
        RuleAction::Replace,
        5,
    );
    email.description = "Mask email addresses".to_string();

    let mut sales = FilterRule::new(
        "Sales pitch",
        RuleType::Pattern,
        "buy now",
        RuleAction::Review,
        4,
    );
    sales.description = "Hold solicitation for review".to_string();

    let mut shouting = FilterRule::new(
        "Shouting",
        RuleType::Regex,
        "[A-Z]{12,}",
        RuleAction::Warning,
        2,
    );
    shouting.description = "Flag long all-caps runs".to_string();
    shouting.is_case_sensitive = true;

    vec![url_block, phone, email, sales, shouting]
}

/// Vocabulary always masked with `***`.
pub fn default_blocked_words() -> Vec<BlockedWord> {
    vec![
        BlockedWord::new("casino", "advertising", 8),
        BlockedWord::new("viagra", "advertising", 9),
        BlockedWord::new("lottery", "advertising", 8),
        BlockedWord::new("free money", "advertising", 7),
    ]
}

/// Known spam signatures; any hit blocks the submission.
///
/// The regex engine has no backreferences, so the classic repeated-character
/// detector is expressed as explicit character-run patterns instead.
pub fn default_spam_patterns() -> Vec<SpamPattern> {
    let mut punctuation = SpamPattern::new("Punctuation run", r"[!@#$%^&*]{5,}", true);
    punctuation.description = "Five or more consecutive special characters".to_string();

    let mut exclamations = SpamPattern::new("Exclamation run", r"[!?]{4,}", true);
    exclamations.description = "Strings of exclamation/question marks".to_string();

    let mut ad_phrase = SpamPattern::new("Ad phrase", "click here", false);
    ad_phrase.description = "Common call-to-action bait".to_string();

    vec![punctuation, exclamations, ad_phrase]
}
