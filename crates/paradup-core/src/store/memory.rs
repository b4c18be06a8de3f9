//! In-memory [`Store`] implementation for tests.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. Enforces the same
//! uniqueness and range rules as the SQLite schema so pipeline tests
//! exercise the conflict paths.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::{
    DeletionReport, Document, DocumentSimilarity, DocumentStatus, Paragraph, ParagraphUsage,
    PositionedParagraph, StoreCounts,
};

use super::{InsertOutcome, ProcessedText, Store};

#[derive(Debug, Clone)]
struct Association {
    document_id: String,
    paragraph_id: String,
    position: Option<i64>,
}

#[derive(Default)]
struct Tables {
    documents: HashMap<String, Document>,
    /// Keyed by id.
    paragraphs: HashMap<String, Paragraph>,
    /// hash -> paragraph id
    by_hash: HashMap<String, String>,
    associations: Vec<Association>,
    similarities: Vec<DocumentSimilarity>,
}

impl Tables {
    /// Paragraphs no association references any more.
    /// Remove the `candidates` no association references any more.
    fn collect_orphans(&mut self, candidates: &HashSet<String>) -> u64 {
        let referenced: HashSet<&str> = self
            .associations
            .iter()
            .map(|a| a.paragraph_id.as_str())
            .collect();
        let orphans: Vec<String> = candidates
            .iter()
            .filter(|id| !referenced.contains(id.as_str()))
            .cloned()
            .collect();
        let mut removed = 0;
        for id in &orphans {
            if let Some(p) = self.paragraphs.remove(id) {
                self.by_hash.remove(&p.hash);
                removed += 1;
            }
        }
        removed
    }
}

/// In-memory store for tests.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn update<F>(&self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Document),
    {
        let mut tables = self.write()?;
        let doc = tables
            .documents
            .get_mut(id)
            .ok_or_else(|| anyhow!("document not found: {}", id))?;
        f(doc);
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_document(&self, doc: &Document) -> Result<()> {
        let mut tables = self.write()?;
        if tables.documents.contains_key(&doc.id) {
            bail!("document already exists: {}", doc.id);
        }
        tables.documents.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.read()?.documents.get(id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self.read()?.documents.values().cloned().collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(docs)
    }

    async fn mark_processed(&self, id: &str, text: &str, page_count: i64) -> Result<()> {
        self.update(id, |d| {
            d.status = DocumentStatus::Processed;
            d.extracted_text = Some(text.to_string());
            d.page_count = page_count;
            d.error_message = None;
        })
    }

    async fn mark_error(&self, id: &str, message: &str) -> Result<()> {
        self.update(id, |d| {
            d.status = DocumentStatus::Error;
            d.error_message = Some(message.to_string());
        })
    }

    async fn set_paragraph_count(&self, id: &str, count: i64) -> Result<()> {
        self.update(id, |d| d.paragraph_count = count)
    }

    async fn list_processed_documents(&self) -> Result<Vec<ProcessedText>> {
        let tables = self.read()?;
        let mut docs: Vec<&Document> = tables
            .documents
            .values()
            .filter(|d| d.status == DocumentStatus::Processed && d.extracted_text.is_some())
            .collect();
        docs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(docs
            .into_iter()
            .map(|d| ProcessedText {
                document_id: d.id.clone(),
                text: d.extracted_text.clone().unwrap_or_default(),
            })
            .collect())
    }

    async fn find_paragraph_by_hash(&self, hash: &str) -> Result<Option<Paragraph>> {
        let tables = self.read()?;
        Ok(tables
            .by_hash
            .get(hash)
            .and_then(|id| tables.paragraphs.get(id))
            .cloned())
    }

    async fn insert_paragraph(&self, paragraph: &Paragraph) -> Result<InsertOutcome> {
        let mut tables = self.write()?;
        if tables.by_hash.contains_key(&paragraph.hash) {
            return Ok(InsertOutcome::Conflict);
        }
        tables
            .by_hash
            .insert(paragraph.hash.clone(), paragraph.id.clone());
        tables
            .paragraphs
            .insert(paragraph.id.clone(), paragraph.clone());
        Ok(InsertOutcome::Inserted(paragraph.clone()))
    }

    async fn association_exists(&self, document_id: &str, paragraph_id: &str) -> Result<bool> {
        Ok(self
            .read()?
            .associations
            .iter()
            .any(|a| a.document_id == document_id && a.paragraph_id == paragraph_id))
    }

    async fn create_association(
        &self,
        document_id: &str,
        paragraph_id: &str,
        position: Option<i64>,
    ) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.documents.contains_key(document_id) {
            bail!("unknown document: {}", document_id);
        }
        if !tables.paragraphs.contains_key(paragraph_id) {
            bail!("unknown paragraph: {}", paragraph_id);
        }
        if tables
            .associations
            .iter()
            .any(|a| a.document_id == document_id && a.paragraph_id == paragraph_id)
        {
            bail!(
                "association already exists: ({}, {})",
                document_id,
                paragraph_id
            );
        }
        tables.associations.push(Association {
            document_id: document_id.to_string(),
            paragraph_id: paragraph_id.to_string(),
            position,
        });
        Ok(())
    }

    async fn document_paragraphs(&self, document_id: &str) -> Result<Vec<PositionedParagraph>> {
        let tables = self.read()?;
        let mut out: Vec<PositionedParagraph> = tables
            .associations
            .iter()
            .filter(|a| a.document_id == document_id)
            .filter_map(|a| {
                tables.paragraphs.get(&a.paragraph_id).map(|p| PositionedParagraph {
                    position: a.position,
                    paragraph: p.clone(),
                })
            })
            .collect();
        // Unpositioned rows sort last, in insertion order.
        out.sort_by_key(|p| p.position.unwrap_or(i64::MAX));
        Ok(out)
    }

    async fn paragraph_usage(&self) -> Result<Vec<ParagraphUsage>> {
        let tables = self.read()?;
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for a in &tables.associations {
            *counts.entry(a.paragraph_id.as_str()).or_insert(0) += 1;
        }
        let mut usage: Vec<ParagraphUsage> = tables
            .paragraphs
            .values()
            .map(|p| ParagraphUsage {
                paragraph: p.clone(),
                document_count: counts.get(p.id.as_str()).copied().unwrap_or(0),
            })
            .collect();
        usage.sort_by(|a, b| {
            b.document_count
                .cmp(&a.document_count)
                .then_with(|| a.paragraph.id.cmp(&b.paragraph.id))
        });
        Ok(usage)
    }

    async fn delete_document(&self, id: &str) -> Result<Option<DeletionReport>> {
        let mut tables = self.write()?;
        if tables.documents.remove(id).is_none() {
            return Ok(None);
        }

        let linked: HashSet<String> = tables
            .associations
            .iter()
            .filter(|a| a.document_id == id)
            .map(|a| a.paragraph_id.clone())
            .collect();
        let before = tables.associations.len();
        tables.associations.retain(|a| a.document_id != id);
        let associations_removed = (before - tables.associations.len()) as u64;

        let before = tables.similarities.len();
        tables
            .similarities
            .retain(|s| s.source_id != id && s.target_id != id);
        let similarities_removed = (before - tables.similarities.len()) as u64;

        let paragraphs_removed = tables.collect_orphans(&linked);

        Ok(Some(DeletionReport {
            associations_removed,
            paragraphs_removed,
            similarities_removed,
        }))
    }

    async fn delete_all(&self) -> Result<DeletionReport> {
        let mut tables = self.write()?;
        let report = DeletionReport {
            associations_removed: tables.associations.len() as u64,
            paragraphs_removed: tables.paragraphs.len() as u64,
            similarities_removed: tables.similarities.len() as u64,
        };
        *tables = Tables::default();
        Ok(report)
    }

    async fn replace_similarities(&self, edges: &[DocumentSimilarity]) -> Result<()> {
        let mut tables = self.write()?;

        // Validate everything first so a bad edge leaves the old set intact.
        let mut seen = HashSet::new();
        for e in edges {
            if !(0.0..=1.0).contains(&e.score) {
                bail!(
                    "similarity score out of range for ({}, {}): {}",
                    e.source_id,
                    e.target_id,
                    e.score
                );
            }
            if !tables.documents.contains_key(&e.source_id)
                || !tables.documents.contains_key(&e.target_id)
            {
                bail!("similarity references unknown document");
            }
            if !seen.insert((e.source_id.as_str(), e.target_id.as_str())) {
                bail!("duplicate similarity edge ({}, {})", e.source_id, e.target_id);
            }
        }

        tables.similarities = edges.to_vec();
        Ok(())
    }

    async fn similarities_for(
        &self,
        document_id: &str,
        min_score: f64,
    ) -> Result<Vec<DocumentSimilarity>> {
        Ok(self
            .read()?
            .similarities
            .iter()
            .filter(|s| s.other(document_id).is_some() && s.score >= min_score)
            .cloned()
            .collect())
    }

    async fn similarity_between(&self, a: &str, b: &str) -> Result<Option<DocumentSimilarity>> {
        Ok(self
            .read()?
            .similarities
            .iter()
            .find(|s| {
                (s.source_id == a && s.target_id == b) || (s.source_id == b && s.target_id == a)
            })
            .cloned())
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let tables = self.read()?;
        let mut per_paragraph: HashMap<&str, i64> = HashMap::new();
        for a in &tables.associations {
            *per_paragraph.entry(a.paragraph_id.as_str()).or_insert(0) += 1;
        }
        Ok(StoreCounts {
            documents: tables.documents.len() as i64,
            processed: tables
                .documents
                .values()
                .filter(|d| d.status == DocumentStatus::Processed)
                .count() as i64,
            errored: tables
                .documents
                .values()
                .filter(|d| d.status == DocumentStatus::Error)
                .count() as i64,
            paragraphs: tables.paragraphs.len() as i64,
            associations: tables.associations.len() as i64,
            shared_paragraphs: per_paragraph.values().filter(|n| **n > 1).count() as i64,
            similarities: tables.similarities.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (InMemoryStore, Document, Document, Paragraph) {
        let store = InMemoryStore::new();
        let a = Document::new("a.pdf", "pdf", 1);
        let b = Document::new("b.docx", "docx", 2);
        store.create_document(&a).await.unwrap();
        store.create_document(&b).await.unwrap();
        let p = Paragraph::new("shared", "h1");
        store.insert_paragraph(&p).await.unwrap();
        store.create_association(&a.id, &p.id, Some(0)).await.unwrap();
        store.create_association(&b.id, &p.id, Some(0)).await.unwrap();
        (store, a, b, p)
    }

    #[tokio::test]
    async fn duplicate_hash_is_a_conflict() {
        let (store, _, _, _) = seeded().await;
        let again = Paragraph::new("SHARED", "h1");
        assert_eq!(
            store.insert_paragraph(&again).await.unwrap(),
            InsertOutcome::Conflict
        );
    }

    #[tokio::test]
    async fn duplicate_association_is_rejected() {
        let (store, a, _, p) = seeded().await;
        assert!(store.create_association(&a.id, &p.id, Some(1)).await.is_err());
    }

    #[tokio::test]
    async fn shared_paragraph_survives_first_deletion() {
        let (store, a, b, p) = seeded().await;
        store
            .replace_similarities(&[DocumentSimilarity {
                source_id: a.id.clone(),
                target_id: b.id.clone(),
                score: 0.5,
            }])
            .await
            .unwrap();

        let report = store.delete_document(&a.id).await.unwrap().unwrap();
        assert_eq!(report.associations_removed, 1);
        assert_eq!(report.paragraphs_removed, 0);
        assert_eq!(report.similarities_removed, 1);
        assert!(store.find_paragraph_by_hash(&p.hash).await.unwrap().is_some());

        let report = store.delete_document(&b.id).await.unwrap().unwrap();
        assert_eq!(report.paragraphs_removed, 1);
        assert!(store.find_paragraph_by_hash(&p.hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deletion_leaves_unlinked_paragraphs_of_others() {
        let (store, a, _, _) = seeded().await;
        let own = Paragraph::new("only in a", "h2");
        store.insert_paragraph(&own).await.unwrap();
        store.create_association(&a.id, &own.id, Some(1)).await.unwrap();
        // Inserted by another upload that has not linked it yet.
        let pending = Paragraph::new("not linked yet", "h3");
        store.insert_paragraph(&pending).await.unwrap();

        let report = store.delete_document(&a.id).await.unwrap().unwrap();
        assert_eq!(report.associations_removed, 2);
        assert_eq!(report.paragraphs_removed, 1);
        assert!(store.find_paragraph_by_hash("h2").await.unwrap().is_none());
        assert!(store.find_paragraph_by_hash("h3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleting_unknown_document_reports_none() {
        let store = InMemoryStore::new();
        assert!(store.delete_document("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bad_edge_keeps_previous_set() {
        let (store, a, b, _) = seeded().await;
        let good = DocumentSimilarity {
            source_id: a.id.clone(),
            target_id: b.id.clone(),
            score: 0.4,
        };
        store.replace_similarities(&[good.clone()]).await.unwrap();

        let bad = DocumentSimilarity {
            score: 1.5,
            ..good.clone()
        };
        assert!(store.replace_similarities(&[bad]).await.is_err());
        assert_eq!(
            store.similarity_between(&b.id, &a.id).await.unwrap(),
            Some(good)
        );
    }

    #[tokio::test]
    async fn counts_report_shared_paragraphs() {
        let (store, a, _, _) = seeded().await;
        let solo = Paragraph::new("solo", "h2");
        store.insert_paragraph(&solo).await.unwrap();
        store.create_association(&a.id, &solo.id, Some(1)).await.unwrap();
        store.mark_processed(&a.id, "text", 3).await.unwrap();

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.documents, 2);
        assert_eq!(counts.processed, 1);
        assert_eq!(counts.paragraphs, 2);
        assert_eq!(counts.associations, 3);
        assert_eq!(counts.shared_paragraphs, 1);

        let usage = store.paragraph_usage().await.unwrap();
        assert_eq!(usage[0].document_count, 2);
        assert_eq!(usage[1].document_count, 1);
    }
}
