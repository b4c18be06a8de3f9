//! Corpus statistics.
//!
//! A quick summary of what has been uploaded and how much text is reused:
//! document counts by status, canonical paragraph count, association count,
//! the dedup ratio between them, and the number of similarity edges.

use anyhow::Result;
use paradup_core::models::StoreCounts;
use paradup_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::new(db::connect(config).await?);
    let counts = store.counts().await?;
    store.pool().close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("paradup database stats");
    println!("======================");
    println!();
    println!("  Database:      {}", config.db.path.display());
    println!("  Size:          {}", format_bytes(db_size));
    println!();
    println!("  Documents:     {}", counts.documents);
    println!("    processed:   {}", counts.processed);
    println!("    error:       {}", counts.errored);
    println!(
        "    pending:     {}",
        counts.documents - counts.processed - counts.errored
    );
    println!();
    println!("  Paragraphs:    {}", counts.paragraphs);
    println!("    shared:      {}", counts.shared_paragraphs);
    println!("  Associations:  {}", counts.associations);
    println!("  Reuse:         {}", reuse_summary(&counts));
    println!();
    println!("  Similarities:  {}", counts.similarities);
    println!();

    Ok(())
}

/// Fraction of associations served by an already-stored paragraph.
fn reuse_summary(counts: &StoreCounts) -> String {
    if counts.associations == 0 {
        return "n/a".to_string();
    }
    let reused = counts.associations - counts.paragraphs;
    format!(
        "{} of {} ({}%)",
        reused,
        counts.associations,
        (reused * 100) / counts.associations
    )
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
