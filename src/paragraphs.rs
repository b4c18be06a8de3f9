//! `paradup paragraphs`: the canonical paragraph table and how widely each
//! paragraph is reused.

use anyhow::Result;
use paradup_core::models::ParagraphUsage;
use paradup_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Characters of content shown per row.
const PREVIEW_CHARS: usize = 72;

pub async fn run_paragraphs(config: &Config, shared_only: bool) -> Result<()> {
    let store = SqliteStore::new(db::connect(config).await?);
    let usage = list_paragraphs(&store, shared_only).await?;
    store.pool().close().await;

    if usage.is_empty() {
        if shared_only {
            println!("No paragraphs are shared between documents.");
        } else {
            println!("No paragraphs.");
        }
        return Ok(());
    }

    println!("{:<12}  {:>4}  {}", "HASH", "DOCS", "CONTENT");
    for u in &usage {
        println!(
            "{:<12}  {:>4}  {}",
            short_hash(&u.paragraph.hash),
            u.document_count,
            preview(&u.paragraph.content)
        );
    }
    println!();
    println!("{} paragraphs", usage.len());
    Ok(())
}

/// Paragraph usage, optionally restricted to paragraphs in two or more documents.
pub async fn list_paragraphs<S: Store + ?Sized>(
    store: &S,
    shared_only: bool,
) -> Result<Vec<ParagraphUsage>> {
    let mut usage = store.paragraph_usage().await?;
    if shared_only {
        usage.retain(|u| u.document_count > 1);
    }
    Ok(usage)
}

/// First 12 hex digits of a paragraph hash.
pub(crate) fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

fn preview(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("a\n- b\n- c"), "a - b - c");
        let long = "word ".repeat(40);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS);
        assert!(p.ends_with("..."));
    }
}
