//! Paragraph fingerprinting and content-addressed deduplication.
//!
//! Two paragraphs are the same when their normalized forms (lowercased,
//! whitespace collapsed) are byte-equal. Each distinct normalized form is
//! stored once, keyed by the SHA-256 of that form, and every document that
//! contains it gets an association row pointing at the shared record.

use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::models::Paragraph;
use crate::store::{InsertOutcome, Store};

/// Lowercase and collapse every run of whitespace to one space.
pub fn normalize_for_hash(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase hex SHA-256 of the normalized paragraph.
pub fn paragraph_hash(text: &str) -> String {
    let digest = Sha256::digest(normalize_for_hash(text).as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Store `paragraphs` for `document_id`, reusing existing records.
///
/// Positions are assigned from the number of associations created so far,
/// so a document's positions are always gapless from zero even when the
/// same paragraph appears twice in it (the repeat is skipped). If creating
/// an association fails it is retried once without a position; a second
/// failure is logged and the paragraph skipped.
///
/// Returns the number of associations created.
pub async fn deduplicate<S: Store + ?Sized>(
    store: &S,
    document_id: &str,
    paragraphs: &[String],
) -> Result<usize> {
    let mut created = 0usize;

    for content in paragraphs {
        let hash = paragraph_hash(content);
        let paragraph = resolve_paragraph(store, content, &hash).await?;

        if store.association_exists(document_id, &paragraph.id).await? {
            debug!(document_id, hash = %hash, "paragraph repeats within document");
            continue;
        }

        let position = created as i64;
        match store
            .create_association(document_id, &paragraph.id, Some(position))
            .await
        {
            Ok(()) => created += 1,
            Err(e) => {
                warn!(document_id, position, error = %e, "association failed; retrying without position");
                match store
                    .create_association(document_id, &paragraph.id, None)
                    .await
                {
                    Ok(()) => created += 1,
                    Err(e) => {
                        warn!(document_id, paragraph_id = %paragraph.id, error = %e, "skipping paragraph");
                    }
                }
            }
        }
    }

    Ok(created)
}

/// Existing paragraph for `hash`, or a freshly inserted one. A conflicting
/// concurrent insert is resolved by fetching the winner's row.
async fn resolve_paragraph<S: Store + ?Sized>(
    store: &S,
    content: &str,
    hash: &str,
) -> Result<Paragraph> {
    if let Some(existing) = store.find_paragraph_by_hash(hash).await? {
        return Ok(existing);
    }

    match store
        .insert_paragraph(&Paragraph::new(content, hash))
        .await?
    {
        InsertOutcome::Inserted(p) => Ok(p),
        InsertOutcome::Conflict => {
            debug!(hash, "lost insert race; reusing stored paragraph");
            store
                .find_paragraph_by_hash(hash)
                .await?
                .ok_or_else(|| anyhow!("paragraph {} vanished after insert conflict", hash))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn paras(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    async fn doc(store: &InMemoryStore, name: &str) -> String {
        let d = Document::new(name, "pdf", 10);
        store.create_document(&d).await.unwrap();
        d.id
    }

    #[test]
    fn hash_ignores_case_and_spacing() {
        assert_eq!(
            paragraph_hash("Hello   World\n again"),
            paragraph_hash("hello world again")
        );
        assert_ne!(paragraph_hash("hello"), paragraph_hash("hello!"));
        assert_eq!(paragraph_hash("x").len(), 64);
    }

    #[test]
    fn known_digest() {
        // sha256("abc")
        assert_eq!(
            paragraph_hash("ABC"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn shared_paragraph_is_stored_once() {
        let store = InMemoryStore::new();
        let a = doc(&store, "a.pdf").await;
        let b = doc(&store, "b.pdf").await;

        deduplicate(&store, &a, &paras(&["Shared intro text", "Only in A"]))
            .await
            .unwrap();
        deduplicate(&store, &b, &paras(&["shared   INTRO text", "Only in B"]))
            .await
            .unwrap();

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.paragraphs, 3);
        assert_eq!(counts.associations, 4);
        assert_eq!(counts.shared_paragraphs, 1);

        let first = store.document_paragraphs(&b).await.unwrap();
        // The canonical content is the first writer's.
        assert_eq!(first[0].paragraph.content, "Shared intro text");
    }

    #[tokio::test]
    async fn repeats_within_a_document_keep_positions_gapless() {
        let store = InMemoryStore::new();
        let a = doc(&store, "a.pdf").await;

        let created = deduplicate(&store, &a, &paras(&["one", "two", "ONE", "three"]))
            .await
            .unwrap();
        assert_eq!(created, 3);

        let positions: Vec<Option<i64>> = store
            .document_paragraphs(&a)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.position)
            .collect();
        assert_eq!(positions, vec![Some(0), Some(1), Some(2)]);
    }

    /// Wraps `InMemoryStore` with injected faults.
    ///
    /// `hide_first_lookup` hides the first hash lookup, as if another
    /// writer inserted the hash between our lookup and our insert.
    /// `positioned_failures` makes that many positioned association
    /// inserts fail.
    struct FlakyStore {
        inner: InMemoryStore,
        hide_first_lookup: AtomicBool,
        positioned_failures: AtomicUsize,
    }

    impl FlakyStore {
        fn new(inner: InMemoryStore) -> Self {
            Self {
                inner,
                hide_first_lookup: AtomicBool::new(false),
                positioned_failures: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn create_document(&self, doc: &Document) -> Result<()> {
            self.inner.create_document(doc).await
        }
        async fn get_document(&self, id: &str) -> Result<Option<Document>> {
            self.inner.get_document(id).await
        }
        async fn list_documents(&self) -> Result<Vec<Document>> {
            self.inner.list_documents().await
        }
        async fn mark_processed(&self, id: &str, text: &str, pages: i64) -> Result<()> {
            self.inner.mark_processed(id, text, pages).await
        }
        async fn mark_error(&self, id: &str, message: &str) -> Result<()> {
            self.inner.mark_error(id, message).await
        }
        async fn set_paragraph_count(&self, id: &str, count: i64) -> Result<()> {
            self.inner.set_paragraph_count(id, count).await
        }
        async fn list_processed_documents(&self) -> Result<Vec<crate::store::ProcessedText>> {
            self.inner.list_processed_documents().await
        }
        async fn find_paragraph_by_hash(&self, hash: &str) -> Result<Option<Paragraph>> {
            if self.hide_first_lookup.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_paragraph_by_hash(hash).await
        }
        async fn insert_paragraph(&self, p: &Paragraph) -> Result<InsertOutcome> {
            self.inner.insert_paragraph(p).await
        }
        async fn association_exists(&self, d: &str, p: &str) -> Result<bool> {
            self.inner.association_exists(d, p).await
        }
        async fn create_association(&self, d: &str, p: &str, pos: Option<i64>) -> Result<()> {
            let fail = pos.is_some()
                && self
                    .positioned_failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
            if fail {
                return Err(anyhow!("position column rejected"));
            }
            self.inner.create_association(d, p, pos).await
        }
        async fn document_paragraphs(
            &self,
            d: &str,
        ) -> Result<Vec<crate::models::PositionedParagraph>> {
            self.inner.document_paragraphs(d).await
        }
        async fn paragraph_usage(&self) -> Result<Vec<crate::models::ParagraphUsage>> {
            self.inner.paragraph_usage().await
        }
        async fn delete_document(&self, id: &str) -> Result<Option<crate::models::DeletionReport>> {
            self.inner.delete_document(id).await
        }
        async fn delete_all(&self) -> Result<crate::models::DeletionReport> {
            self.inner.delete_all().await
        }
        async fn replace_similarities(
            &self,
            edges: &[crate::models::DocumentSimilarity],
        ) -> Result<()> {
            self.inner.replace_similarities(edges).await
        }
        async fn similarities_for(
            &self,
            id: &str,
            min: f64,
        ) -> Result<Vec<crate::models::DocumentSimilarity>> {
            self.inner.similarities_for(id, min).await
        }
        async fn similarity_between(
            &self,
            a: &str,
            b: &str,
        ) -> Result<Option<crate::models::DocumentSimilarity>> {
            self.inner.similarity_between(a, b).await
        }
        async fn counts(&self) -> Result<crate::models::StoreCounts> {
            self.inner.counts().await
        }
    }

    #[tokio::test]
    async fn insert_conflict_reuses_winner() {
        let inner = InMemoryStore::new();
        let a = doc(&inner, "a.pdf").await;
        let winner = Paragraph::new("Race me", &paragraph_hash("Race me"));
        inner.insert_paragraph(&winner).await.unwrap();

        let store = FlakyStore::new(inner);
        store.hide_first_lookup.store(true, Ordering::SeqCst);
        let created = deduplicate(&store, &a, &paras(&["race ME"])).await.unwrap();
        assert_eq!(created, 1);

        let linked = store.document_paragraphs(&a).await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].paragraph.id, winner.id);
        assert_eq!(store.counts().await.unwrap().paragraphs, 1);
    }

    #[tokio::test]
    async fn failed_position_falls_back_to_unpositioned_link() {
        let inner = InMemoryStore::new();
        let a = doc(&inner, "a.pdf").await;
        let store = FlakyStore::new(inner);
        store.positioned_failures.store(1, Ordering::SeqCst);

        let created = deduplicate(&store, &a, &paras(&["first", "second", "third"]))
            .await
            .unwrap();
        assert_eq!(created, 3);

        let linked = store.document_paragraphs(&a).await.unwrap();
        let by_content: Vec<(&str, Option<i64>)> = linked
            .iter()
            .map(|p| (p.paragraph.content.as_str(), p.position))
            .collect();
        // Unpositioned links sort last; later paragraphs keep counting.
        assert_eq!(
            by_content,
            vec![("second", Some(1)), ("third", Some(2)), ("first", None)]
        );
    }
}
