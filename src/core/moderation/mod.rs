// Core moderation module - rule-based content filtering plus the audit log
// the calling layer writes after each check.

pub mod audit_models;
pub mod audit_service;
pub mod filter_models;
pub mod filter_service;
pub mod rule_catalog;

pub use audit_models::*;
pub use audit_service::*;
pub use filter_models::*;
pub use filter_service::*;
