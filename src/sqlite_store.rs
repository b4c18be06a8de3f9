//! SQLite-backed [`Store`] implementation.
//!
//! Relies on the schema from [`crate::migrate`]: the unique `hash` column
//! detects duplicate paragraphs, the composite keys reject duplicate
//! associations and edges, and `ON DELETE CASCADE` removes associations
//! and edges with their document.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use paradup_core::models::{
    DeletionReport, Document, DocumentSimilarity, DocumentStatus, Paragraph, ParagraphUsage,
    PositionedParagraph, StoreCounts,
};
use paradup_core::store::{InsertOutcome, ProcessedText, Store};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const DOCUMENT_COLUMNS: &str = "id, original_filename, file_type, file_size, created_at, \
     extracted_text, status, error_message, page_count, paragraph_count";

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let status: String = row.get("status");
    Ok(Document {
        id: row.get("id"),
        original_filename: row.get("original_filename"),
        file_type: row.get("file_type"),
        file_size: row.get("file_size"),
        created_at: row.get("created_at"),
        extracted_text: row.get("extracted_text"),
        status: status.parse::<DocumentStatus>()?,
        error_message: row.get("error_message"),
        page_count: row.get("page_count"),
        paragraph_count: row.get("paragraph_count"),
    })
}

fn paragraph_from_row(row: &SqliteRow) -> Paragraph {
    Paragraph {
        id: row.get("id"),
        content: row.get("content"),
        hash: row.get("hash"),
    }
}

fn similarity_from_row(row: &SqliteRow) -> DocumentSimilarity {
    DocumentSimilarity {
        source_id: row.get("source_id"),
        target_id: row.get("target_id"),
        score: row.get("score"),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, original_filename, file_type, file_size, created_at,
                                   extracted_text, status, error_message, page_count,
                                   paragraph_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.original_filename)
        .bind(&doc.file_type)
        .bind(doc.file_size)
        .bind(doc.created_at)
        .bind(&doc.extracted_text)
        .bind(doc.status.as_str())
        .bind(&doc.error_message)
        .bind(doc.page_count)
        .bind(doc.paragraph_count)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to create document {}", doc.id))?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(document_from_row).transpose()
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents ORDER BY created_at DESC, id ASC",
            DOCUMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(document_from_row).collect()
    }

    async fn mark_processed(&self, id: &str, text: &str, page_count: i64) -> Result<()> {
        sqlx::query(
            "UPDATE documents SET status = 'processed', extracted_text = ?, page_count = ?, \
             error_message = NULL WHERE id = ?",
        )
        .bind(text)
        .bind(page_count)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_error(&self, id: &str, message: &str) -> Result<()> {
        sqlx::query("UPDATE documents SET status = 'error', error_message = ? WHERE id = ?")
            .bind(message)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_paragraph_count(&self, id: &str, count: i64) -> Result<()> {
        sqlx::query("UPDATE documents SET paragraph_count = ? WHERE id = ?")
            .bind(count)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_processed_documents(&self) -> Result<Vec<ProcessedText>> {
        let rows = sqlx::query(
            r#"
            SELECT id, extracted_text FROM documents
            WHERE status = 'processed' AND extracted_text IS NOT NULL
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| ProcessedText {
                document_id: row.get("id"),
                text: row.get("extracted_text"),
            })
            .collect())
    }

    async fn find_paragraph_by_hash(&self, hash: &str) -> Result<Option<Paragraph>> {
        let row = sqlx::query("SELECT id, content, hash FROM paragraphs WHERE hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(paragraph_from_row))
    }

    async fn insert_paragraph(&self, paragraph: &Paragraph) -> Result<InsertOutcome> {
        let result = sqlx::query(
            "INSERT INTO paragraphs (id, content, hash) VALUES (?, ?, ?) \
             ON CONFLICT(hash) DO NOTHING",
        )
        .bind(&paragraph.id)
        .bind(&paragraph.content)
        .bind(&paragraph.hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Conflict)
        } else {
            Ok(InsertOutcome::Inserted(paragraph.clone()))
        }
    }

    async fn association_exists(&self, document_id: &str, paragraph_id: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM document_paragraphs WHERE document_id = ? AND paragraph_id = ?",
        )
        .bind(document_id)
        .bind(paragraph_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_association(
        &self,
        document_id: &str,
        paragraph_id: &str,
        position: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO document_paragraphs (document_id, paragraph_id, position) VALUES (?, ?, ?)",
        )
        .bind(document_id)
        .bind(paragraph_id)
        .bind(position)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn document_paragraphs(&self, document_id: &str) -> Result<Vec<PositionedParagraph>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.content, p.hash, dp.position
            FROM document_paragraphs dp
            JOIN paragraphs p ON p.id = dp.paragraph_id
            WHERE dp.document_id = ?
            ORDER BY dp.position IS NULL, dp.position ASC, dp.rowid ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| PositionedParagraph {
                position: row.get("position"),
                paragraph: paragraph_from_row(row),
            })
            .collect())
    }

    async fn paragraph_usage(&self) -> Result<Vec<ParagraphUsage>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.content, p.hash, COUNT(dp.document_id) AS document_count
            FROM paragraphs p
            LEFT JOIN document_paragraphs dp ON dp.paragraph_id = p.id
            GROUP BY p.id
            ORDER BY document_count DESC, p.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| ParagraphUsage {
                paragraph: paragraph_from_row(row),
                document_count: row.get("document_count"),
            })
            .collect())
    }

    async fn delete_document(&self, id: &str) -> Result<Option<DeletionReport>> {
        let mut tx = self.pool.begin().await?;

        let linked: Vec<String> =
            sqlx::query_scalar("SELECT paragraph_id FROM document_paragraphs WHERE document_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        let similarities: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM document_similarities WHERE source_id = ? OR target_id = ?",
        )
        .bind(id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Ok(None);
        }

        // Only this document's paragraphs are candidates; an unlinked
        // paragraph from an upload in flight is left alone.
        let mut orphans = 0u64;
        for paragraph_id in &linked {
            orphans += sqlx::query(
                r#"
                DELETE FROM paragraphs
                WHERE id = ?
                  AND NOT EXISTS (SELECT 1 FROM document_paragraphs WHERE paragraph_id = ?)
                "#,
            )
            .bind(paragraph_id)
            .bind(paragraph_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        Ok(Some(DeletionReport {
            associations_removed: linked.len() as u64,
            paragraphs_removed: orphans,
            similarities_removed: similarities as u64,
        }))
    }

    async fn delete_all(&self) -> Result<DeletionReport> {
        let mut tx = self.pool.begin().await?;

        let similarities = sqlx::query("DELETE FROM document_similarities")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let associations = sqlx::query("DELETE FROM document_paragraphs")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let paragraphs = sqlx::query("DELETE FROM paragraphs")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM documents")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(DeletionReport {
            associations_removed: associations,
            paragraphs_removed: paragraphs,
            similarities_removed: similarities,
        })
    }

    async fn replace_similarities(&self, edges: &[DocumentSimilarity]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM document_similarities")
            .execute(&mut *tx)
            .await?;

        for edge in edges {
            sqlx::query(
                "INSERT INTO document_similarities (source_id, target_id, score) VALUES (?, ?, ?)",
            )
            .bind(&edge.source_id)
            .bind(&edge.target_id)
            .bind(edge.score)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!(
                    "Failed to store similarity ({}, {})",
                    edge.source_id, edge.target_id
                )
            })?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn similarities_for(
        &self,
        document_id: &str,
        min_score: f64,
    ) -> Result<Vec<DocumentSimilarity>> {
        let rows = sqlx::query(
            r#"
            SELECT source_id, target_id, score FROM document_similarities
            WHERE (source_id = ? OR target_id = ?) AND score >= ?
            "#,
        )
        .bind(document_id)
        .bind(document_id)
        .bind(min_score)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(similarity_from_row).collect())
    }

    async fn similarity_between(&self, a: &str, b: &str) -> Result<Option<DocumentSimilarity>> {
        let row = sqlx::query(
            r#"
            SELECT source_id, target_id, score FROM document_similarities
            WHERE (source_id = ? AND target_id = ?) OR (source_id = ? AND target_id = ?)
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(similarity_from_row))
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM documents) AS documents,
                (SELECT COUNT(*) FROM documents WHERE status = 'processed') AS processed,
                (SELECT COUNT(*) FROM documents WHERE status = 'error') AS errored,
                (SELECT COUNT(*) FROM paragraphs) AS paragraphs,
                (SELECT COUNT(*) FROM document_paragraphs) AS associations,
                (SELECT COUNT(*) FROM (
                    SELECT paragraph_id FROM document_paragraphs
                    GROUP BY paragraph_id HAVING COUNT(*) > 1
                )) AS shared_paragraphs,
                (SELECT COUNT(*) FROM document_similarities) AS similarities
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreCounts {
            documents: row.get("documents"),
            processed: row.get("processed"),
            errored: row.get("errored"),
            paragraphs: row.get("paragraphs"),
            associations: row.get("associations"),
            shared_paragraphs: row.get("shared_paragraphs"),
            similarities: row.get("similarities"),
        })
    }
}
