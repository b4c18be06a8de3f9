//! Storage abstraction for paradup.
//!
//! The [`Store`] trait is the only way the pipeline and the similarity
//! engine reach persistence. The application crate provides a SQLite
//! implementation; [`memory::InMemoryStore`] backs tests.
//!
//! Implementations must enforce:
//!
//! - a unique paragraph hash ([`Store::insert_paragraph`] reports a
//!   conflict instead of creating a second row),
//! - a unique `(document_id, paragraph_id)` association,
//! - a unique ordered `(source_id, target_id)` similarity pair with a
//!   score in `[0, 1]`,
//! - all-or-nothing semantics for [`Store::replace_similarities`].

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    DeletionReport, Document, DocumentSimilarity, Paragraph, ParagraphUsage, PositionedParagraph,
    StoreCounts,
};

/// Result of inserting a paragraph whose hash may already exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(Paragraph),
    /// Another writer stored the same hash first.
    Conflict,
}

/// A processed document's identity and text, as fed to the similarity engine.
#[derive(Debug, Clone)]
pub struct ProcessedText {
    pub document_id: String,
    pub text: String,
}

/// Abstract storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_document`](Store::create_document) | Persist a new (pending) document |
/// | [`mark_processed`](Store::mark_processed) | Record extracted text and page count |
/// | [`mark_error`](Store::mark_error) | Record an extraction failure |
/// | [`find_paragraph_by_hash`](Store::find_paragraph_by_hash) | Dedup lookup |
/// | [`insert_paragraph`](Store::insert_paragraph) | Create a canonical paragraph |
/// | [`create_association`](Store::create_association) | Link document and paragraph at a position |
/// | [`replace_similarities`](Store::replace_similarities) | Swap the whole edge set atomically |
/// | [`delete_document`](Store::delete_document) | Cascade + orphan collection |
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_document(&self, doc: &Document) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// All documents, newest first.
    async fn list_documents(&self) -> Result<Vec<Document>>;

    async fn mark_processed(&self, id: &str, text: &str, page_count: i64) -> Result<()>;

    async fn mark_error(&self, id: &str, message: &str) -> Result<()>;

    async fn set_paragraph_count(&self, id: &str, count: i64) -> Result<()>;

    /// Processed documents with non-null text, ordered by `(created_at, id)`.
    async fn list_processed_documents(&self) -> Result<Vec<ProcessedText>>;

    async fn find_paragraph_by_hash(&self, hash: &str) -> Result<Option<Paragraph>>;

    async fn insert_paragraph(&self, paragraph: &Paragraph) -> Result<InsertOutcome>;

    async fn association_exists(&self, document_id: &str, paragraph_id: &str) -> Result<bool>;

    /// Create a document–paragraph link. Fails if the pair already exists.
    async fn create_association(
        &self,
        document_id: &str,
        paragraph_id: &str,
        position: Option<i64>,
    ) -> Result<()>;

    /// Paragraphs of a document ordered by position (unpositioned last).
    async fn document_paragraphs(&self, document_id: &str) -> Result<Vec<PositionedParagraph>>;

    /// Every paragraph with the number of documents referencing it,
    /// most-shared first.
    async fn paragraph_usage(&self) -> Result<Vec<ParagraphUsage>>;

    /// Delete a document, its associations and similarity edges, then any
    /// paragraph left without an owner.
    async fn delete_document(&self, id: &str) -> Result<Option<DeletionReport>>;

    /// Delete every document, paragraph, association, and edge.
    async fn delete_all(&self) -> Result<DeletionReport>;

    /// Replace the full similarity edge set in one transaction.
    async fn replace_similarities(&self, edges: &[DocumentSimilarity]) -> Result<()>;

    /// Edges touching `document_id` with `score >= min_score`.
    async fn similarities_for(
        &self,
        document_id: &str,
        min_score: f64,
    ) -> Result<Vec<DocumentSimilarity>>;

    /// The stored edge between two documents, in either direction.
    async fn similarity_between(&self, a: &str, b: &str) -> Result<Option<DocumentSimilarity>>;

    async fn counts(&self) -> Result<StoreCounts>;
}
