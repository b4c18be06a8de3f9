//! `paradup similarity` subcommands.

use anyhow::{bail, Result};
use paradup_core::similarity::{
    calculate_similarities, clamp_threshold, compare_documents, get_similar, SimilarityOutcome,
};
use paradup_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

pub async fn run_calculate(config: &Config, min_similarity: Option<f64>) -> Result<()> {
    let requested = min_similarity.unwrap_or(config.similarity.default_min_similarity);
    let threshold = clamp_threshold(requested);

    let store = SqliteStore::new(db::connect(config).await?);
    let outcome =
        calculate_similarities(&store, &config.similarity.engine(), requested).await?;
    store.pool().close().await;

    match outcome {
        SimilarityOutcome::InsufficientDocuments { found } => {
            println!(
                "Need at least 2 processed documents to compare; found {}.",
                found
            );
        }
        SimilarityOutcome::Computed { documents, pairs } => {
            println!(
                "Compared {} documents: {} pairs at or above {:.2}.",
                documents, pairs, threshold
            );
        }
    }
    Ok(())
}

pub async fn run_similar(
    config: &Config,
    id: &str,
    min_score: Option<f64>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let store = SqliteStore::new(db::connect(config).await?);
    if store.get_document(id).await?.is_none() {
        store.pool().close().await;
        bail!("document not found: {}", id);
    }

    let min_score = min_score.unwrap_or(0.0);
    let limit = limit.unwrap_or(config.similarity.default_limit);
    let similar = get_similar(&store, id, min_score, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&similar)?);
    } else if similar.is_empty() {
        println!("No similar documents.");
    } else {
        println!("{:<36}  {:>6}  {}", "ID", "SCORE", "FILENAME");
        for s in &similar {
            let name = store
                .get_document(&s.document_id)
                .await?
                .map(|d| d.original_filename)
                .unwrap_or_default();
            println!("{:<36}  {:>6.3}  {}", s.document_id, s.score, name);
        }
    }

    store.pool().close().await;
    Ok(())
}

pub async fn run_compare(config: &Config, first: &str, second: &str, json: bool) -> Result<()> {
    let store = SqliteStore::new(db::connect(config).await?);
    let result = compare_documents(&store, first, second).await;
    store.pool().close().await;
    let cmp = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&cmp)?);
        return Ok(());
    }

    println!("score:        {:.3}", cmp.score);
    println!("shared:       {}", cmp.shared.len());
    println!("only first:   {}", cmp.only_first.len());
    println!("only second:  {}", cmp.only_second.len());
    for (title, paragraphs) in [
        ("Shared", &cmp.shared),
        ("Only in first", &cmp.only_first),
        ("Only in second", &cmp.only_second),
    ] {
        if paragraphs.is_empty() {
            continue;
        }
        println!();
        println!("== {} ==", title);
        for p in paragraphs {
            println!();
            println!("{}", p.content);
        }
    }
    Ok(())
}
