// Maintenance console for the moderation engine.
//
// This binary's job is to:
// 1. Load configuration
// 2. Open and migrate the SQLite database
// 3. Seed whatever the rule tables are missing from the default pack
// 4. Run an interactive loop: each stdin line is checked and its verdict
//    printed, with an audit record written the same way the web layer would
//
// The gallery web layer links against the library; this console exists for
// operators to bootstrap a deployment and sanity-check rule changes.

use anyhow::Result;
use gallery_moderation::core::moderation::{
    AuditService, ContentCategory, ContentFilter, Submitter,
};
use gallery_moderation::infra::moderation::{SqliteAuditStore, SqliteRuleStore};
use std::io::BufRead;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Keep the runtime database in a dedicated folder so the repo root stays tidy.
    let data_dir = std::env::var("MODERATION_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    std::fs::create_dir_all(&data_dir).expect("Failed to create data directory for SQLite files");
    let db_path = format!("{}/moderation.db", data_dir);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", db_path))
        .await
        .expect("Failed to connect to moderation DB");

    let rule_store = SqliteRuleStore::new(pool.clone());
    rule_store
        .migrate()
        .await
        .expect("Failed to migrate rule tables");
    rule_store.seed_defaults().await?;
    tracing::info!(
        rules = rule_store.rule_count().await?,
        words = rule_store.word_count().await?,
        patterns = rule_store.pattern_count().await?,
        "rule tables ready"
    );

    let audit_store = SqliteAuditStore::new(pool.clone());
    audit_store
        .migrate()
        .await
        .expect("Failed to migrate moderation log");

    let filter = ContentFilter::new(rule_store);
    let audit = AuditService::new(audit_store);

    println!("moderation console ready - type a comment per line, Ctrl-D to exit");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let verdict = filter.check(&line, ContentCategory::Comment).await?;
        audit
            .record_check(ContentCategory::Comment, &line, &verdict, Submitter::anonymous())
            .await?;

        let matched: Vec<&str> = verdict.matched.iter().map(|m| m.name()).collect();
        println!(
            "{} | clean={} matched={:?}\n  -> {}",
            verdict.outcome, verdict.is_clean, matched, verdict.filtered_text
        );
    }

    let pending = audit.pending_review(10).await?;
    if !pending.is_empty() {
        println!("{} submission(s) waiting for review", pending.len());
    }

    Ok(())
}
