//! Document listing, inspection, and deletion commands.

use anyhow::{bail, Result};
use paradup_core::models::{Document, PositionedParagraph};
use paradup_core::store::Store;
use serde::Serialize;

use crate::config::Config;
use crate::db;
use crate::paragraphs::short_hash;
use crate::sqlite_store::SqliteStore;

/// `paradup show --json` output.
#[derive(Debug, Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: Document,
    pub paragraphs: Vec<PositionedParagraph>,
}

pub async fn run_list(config: &Config) -> Result<()> {
    let store = SqliteStore::new(db::connect(config).await?);
    let docs = store.list_documents().await?;

    if docs.is_empty() {
        println!("No documents.");
    } else {
        println!(
            "{:<36}  {:<9}  {:<4}  {:>5}  {:>5}  {:<16}  {}",
            "ID", "STATUS", "TYPE", "PAGES", "PARAS", "UPLOADED", "FILENAME"
        );
        for d in &docs {
            println!(
                "{:<36}  {:<9}  {:<4}  {:>5}  {:>5}  {:<16}  {}",
                d.id,
                d.status,
                d.file_type,
                d.page_count,
                d.paragraph_count,
                format_ts(d.created_at),
                d.original_filename
            );
        }
    }

    store.pool().close().await;
    Ok(())
}

pub async fn run_show(config: &Config, id: &str, json: bool) -> Result<()> {
    let store = SqliteStore::new(db::connect(config).await?);
    let detail = document_detail(&store, id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        let d = &detail.document;
        println!("id:          {}", d.id);
        println!("filename:    {}", d.original_filename);
        println!("type:        {}", d.file_type);
        println!("size:        {} bytes", d.file_size);
        println!("uploaded:    {}", format_ts(d.created_at));
        println!("status:      {}", d.status);
        if let Some(err) = &d.error_message {
            println!("error:       {}", err);
        }
        println!("pages:       {}", d.page_count);
        println!("paragraphs:  {}", d.paragraph_count);
        for p in &detail.paragraphs {
            println!();
            match p.position {
                Some(pos) => println!("--- [{}] {}", pos, short_hash(&p.paragraph.hash)),
                None => println!("--- [-] {}", short_hash(&p.paragraph.hash)),
            }
            println!("{}", p.paragraph.content);
        }
    }

    store.pool().close().await;
    Ok(())
}

pub async fn document_detail<S: Store + ?Sized>(store: &S, id: &str) -> Result<DocumentDetail> {
    let Some(document) = store.get_document(id).await? else {
        bail!("document not found: {}", id);
    };
    let paragraphs = store.document_paragraphs(id).await?;
    Ok(DocumentDetail {
        document,
        paragraphs,
    })
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::new(db::connect(config).await?);
    let report = store.delete_document(id).await?;
    store.pool().close().await;

    match report {
        Some(r) => {
            println!("Deleted document {}.", id);
            println!(
                "  {} associations, {} orphaned paragraphs, {} similarity edges removed",
                r.associations_removed, r.paragraphs_removed, r.similarities_removed
            );
            Ok(())
        }
        None => bail!("document not found: {}", id),
    }
}

pub async fn run_delete_all(config: &Config) -> Result<()> {
    let store = SqliteStore::new(db::connect(config).await?);
    let documents = store.counts().await?.documents;
    let r = store.delete_all().await?;
    store.pool().close().await;

    println!(
        "Deleted {} documents, {} paragraphs, {} associations, {} similarity edges.",
        documents, r.paragraphs_removed, r.associations_removed, r.similarities_removed
    );
    Ok(())
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
