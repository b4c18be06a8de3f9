//! `paradup upload`: validate, extract, and process files.
//!
//! Each file is handled to completion before the next one starts. A file
//! with an unsupported extension or over the size limit is rejected without
//! creating a document. An extraction or processing failure leaves the
//! document in the `error` state and the run continues.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use paradup_core::models::Document;
use paradup_core::pipeline::DocumentProcessor;
use paradup_core::store::Store;
use tracing::{info, warn};

use crate::config::Config;
use crate::db;
use crate::extract::{extract_document, Extracted, FileType};
use crate::sqlite_store::SqliteStore;

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    Processed {
        document_id: String,
        pages: i64,
        paragraphs: usize,
    },
    Failed {
        document_id: String,
        error: String,
    },
    Rejected {
        reason: String,
    },
}

pub async fn run_upload(config: &Config, files: &[PathBuf]) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let processor =
        DocumentProcessor::from_config(config.segmentation.clone(), config.container.clone());

    let (mut processed, mut failed, mut rejected) = (0usize, 0usize, 0usize);
    for path in files {
        let result = match upload_file(&store, &processor, config, path).await {
            Ok(result) => result,
            Err(e) => {
                failed += 1;
                warn!(path = %path.display(), error = %e, "upload failed");
                println!("error    -  {}  {:#}", path.display(), e);
                continue;
            }
        };
        match &result {
            UploadResult::Processed {
                document_id,
                pages,
                paragraphs,
            } => {
                processed += 1;
                println!(
                    "ok       {}  {}  ({} pages, {} paragraphs)",
                    document_id,
                    path.display(),
                    pages,
                    paragraphs
                );
            }
            UploadResult::Failed { document_id, error } => {
                failed += 1;
                println!("error    {}  {}  {}", document_id, path.display(), error);
            }
            UploadResult::Rejected { reason } => {
                rejected += 1;
                println!("skipped  {}  {}", path.display(), reason);
            }
        }
    }

    println!();
    println!(
        "{} processed, {} failed, {} rejected",
        processed, failed, rejected
    );
    store.pool().close().await;
    Ok(())
}

/// Upload a single file into `store`.
///
/// Storage errors are returned; rejections and extraction failures are
/// reported in the [`UploadResult`].
pub async fn upload_file<S: Store + ?Sized>(
    store: &S,
    processor: &DocumentProcessor,
    config: &Config,
    path: &Path,
) -> Result<UploadResult> {
    let file_type = match checked_file_type(config, path) {
        Ok(t) => t,
        Err(reason) => {
            warn!(path = %path.display(), %reason, "upload rejected");
            return Ok(UploadResult::Rejected { reason });
        }
    };

    let metadata = match std::fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        Ok(_) => {
            return Ok(UploadResult::Rejected {
                reason: "not a regular file".to_string(),
            })
        }
        Err(e) => {
            return Ok(UploadResult::Rejected {
                reason: format!("cannot read file: {}", e),
            })
        }
    };
    if metadata.len() > config.upload.max_file_bytes {
        return Ok(UploadResult::Rejected {
            reason: format!(
                "file is {} bytes, limit is {}",
                metadata.len(),
                config.upload.max_file_bytes
            ),
        });
    }

    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let doc = Document::new(&filename, file_type.as_str(), bytes.len() as i64);
    store.create_document(&doc).await?;

    let extracted = match extract_document(&bytes, file_type) {
        Ok(extracted) => extracted,
        Err(e) => {
            let message = e.to_string();
            warn!(document_id = %doc.id, file = %filename, error = %message, "extraction failed");
            store.mark_error(&doc.id, &message).await?;
            return Ok(UploadResult::Failed {
                document_id: doc.id,
                error: message,
            });
        }
    };

    let paragraphs = match store_paragraphs(store, processor, &doc.id, &extracted).await {
        Ok(count) => count,
        Err(e) => {
            let message = format!("processing failed: {:#}", e);
            warn!(document_id = %doc.id, file = %filename, error = %message, "processing failed");
            store.mark_error(&doc.id, &message).await?;
            return Ok(UploadResult::Failed {
                document_id: doc.id,
                error: message,
            });
        }
    };

    info!(
        document_id = %doc.id,
        file = %filename,
        pages = extracted.page_count,
        paragraphs,
        "upload processed"
    );

    Ok(UploadResult::Processed {
        document_id: doc.id,
        pages: extracted.page_count,
        paragraphs,
    })
}

async fn store_paragraphs<S: Store + ?Sized>(
    store: &S,
    processor: &DocumentProcessor,
    document_id: &str,
    extracted: &Extracted,
) -> Result<usize> {
    store
        .mark_processed(document_id, &extracted.text, extracted.page_count)
        .await?;
    let paragraphs = processor
        .process_document(store, &extracted.text, document_id)
        .await?;
    store
        .set_paragraph_count(document_id, paragraphs as i64)
        .await?;
    Ok(paragraphs)
}

fn checked_file_type(config: &Config, path: &Path) -> std::result::Result<FileType, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| "file has no extension".to_string())?;
    if !config.upload.allows(ext) {
        return Err(format!("extension '{}' is not allowed", ext));
    }
    FileType::from_extension(ext).ok_or_else(|| format!("unsupported file type '{}'", ext))
}
