// Storage backends for moderation configuration and the audit log.

pub mod in_memory_rule_store;
pub mod json_rule_store;
pub mod sqlite_audit_store;
pub mod sqlite_rule_store;

pub use in_memory_rule_store::InMemoryRuleStore;
pub use json_rule_store::JsonRuleStore;
pub use sqlite_audit_store::SqliteAuditStore;
pub use sqlite_rule_store::SqliteRuleStore;
