// Content moderation engine for the gallery site.
//
// **Architecture Overview:**
// - `core/` = Business logic (storage-agnostic)
// - `infra/` = Implementations of core traits (SQLite, JSON, in-memory)
//
// The web layer that accepts comments is not part of this crate; it calls
// `ContentFilter::check` and decides from the verdict whether to persist the
// submission, hold it for review, or reject it.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;
