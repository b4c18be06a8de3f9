//! Core data models shared by the pipeline, the store trait, and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

/// Processing state of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processed,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processed => "processed",
            DocumentStatus::Error => "error",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "processed" => Ok(DocumentStatus::Processed),
            "error" => Ok(DocumentStatus::Error),
            other => anyhow::bail!("unknown document status: '{}'", other),
        }
    }
}

/// An uploaded document and its extraction results.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub original_filename: String,
    /// Lowercase extension, `pdf` or `docx`.
    pub file_type: String,
    pub file_size: i64,
    pub created_at: i64,
    pub extracted_text: Option<String>,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub page_count: i64,
    pub paragraph_count: i64,
}

impl Document {
    /// A fresh `pending` document with a random UUID.
    pub fn new(original_filename: &str, file_type: &str, file_size: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_filename: original_filename.to_string(),
            file_type: file_type.to_string(),
            file_size,
            created_at: chrono::Utc::now().timestamp(),
            extracted_text: None,
            status: DocumentStatus::Pending,
            error_message: None,
            page_count: 0,
            paragraph_count: 0,
        }
    }
}

/// A canonical, corpus-wide paragraph. Content is never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub id: String,
    pub content: String,
    /// SHA-256 hex of the dedup-normalized content.
    pub hash: String,
}

impl Paragraph {
    pub fn new(content: &str, hash: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            hash: hash.to_string(),
        }
    }
}

/// A paragraph as it appears inside one document.
#[derive(Debug, Clone, Serialize)]
pub struct PositionedParagraph {
    /// `None` when the position could not be recorded at creation time.
    pub position: Option<i64>,
    pub paragraph: Paragraph,
}

/// A paragraph together with the number of documents referencing it.
#[derive(Debug, Clone, Serialize)]
pub struct ParagraphUsage {
    pub paragraph: Paragraph,
    pub document_count: i64,
}

/// A stored similarity edge. `source_id` precedes `target_id` in the
/// engine's document ordering; the relation itself is symmetric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSimilarity {
    pub source_id: String,
    pub target_id: String,
    pub score: f64,
}

impl DocumentSimilarity {
    /// The endpoint opposite `document_id`, if the edge touches it.
    pub fn other(&self, document_id: &str) -> Option<&str> {
        if self.source_id == document_id {
            Some(&self.target_id)
        } else if self.target_id == document_id {
            Some(&self.source_id)
        } else {
            None
        }
    }
}

/// One entry of a similar-documents query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarDocument {
    pub document_id: String,
    pub score: f64,
}

/// What a document deletion removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub associations_removed: u64,
    pub paragraphs_removed: u64,
    pub similarities_removed: u64,
}

/// Row counts across the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub documents: i64,
    pub processed: i64,
    pub errored: i64,
    pub paragraphs: i64,
    pub associations: i64,
    pub shared_paragraphs: i64,
    pub similarities: i64,
}
