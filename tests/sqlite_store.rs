//! `SqliteStore` against a real database file.

use paradup::config::Config;
use paradup::sqlite_store::SqliteStore;
use paradup::{db, migrate};
use paradup_core::dedup::paragraph_hash;
use paradup_core::models::{Document, DocumentSimilarity, Paragraph, StoreCounts};
use paradup_core::pipeline::DocumentProcessor;
use paradup_core::similarity::{calculate_similarities, get_similar, SimilarityConfig};
use paradup_core::store::{InsertOutcome, Store};
use tempfile::TempDir;

async fn open_store() -> (TempDir, SqliteStore) {
    let tmp = TempDir::new().unwrap();
    let config = Config::minimal(tmp.path().join("data").join("test.sqlite"));
    migrate::run_migrations(&config).await.unwrap();
    let pool = db::connect(&config).await.unwrap();
    (tmp, SqliteStore::new(pool))
}

async fn processed_doc(store: &SqliteStore, name: &str, created_at: i64, text: &str) -> String {
    let mut doc = Document::new(name, "pdf", text.len() as i64);
    doc.created_at = created_at;
    store.create_document(&doc).await.unwrap();
    store.mark_processed(&doc.id, text, 1).await.unwrap();
    doc.id
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let tmp = TempDir::new().unwrap();
    let config = Config::minimal(tmp.path().join("db.sqlite"));
    migrate::run_migrations(&config).await.unwrap();
    migrate::run_migrations(&config).await.unwrap();
}

#[tokio::test]
async fn document_round_trip_and_status_updates() {
    let (_tmp, store) = open_store().await;
    let doc = Document::new("memo.docx", "docx", 1234);
    store.create_document(&doc).await.unwrap();

    let loaded = store.get_document(&doc.id).await.unwrap().unwrap();
    assert_eq!(loaded.status.as_str(), "pending");
    assert!(loaded.extracted_text.is_none());

    store.mark_processed(&doc.id, "hello", 4).await.unwrap();
    store.set_paragraph_count(&doc.id, 2).await.unwrap();
    let loaded = store.get_document(&doc.id).await.unwrap().unwrap();
    assert_eq!(loaded.status.as_str(), "processed");
    assert_eq!(loaded.extracted_text.as_deref(), Some("hello"));
    assert_eq!(loaded.page_count, 4);
    assert_eq!(loaded.paragraph_count, 2);

    let other = Document::new("broken.pdf", "pdf", 9);
    store.create_document(&other).await.unwrap();
    store.mark_error(&other.id, "bad xref").await.unwrap();

    // Only the processed one feeds similarity.
    let processed = store.list_processed_documents().await.unwrap();
    assert_eq!(processed.len(), 1);
    assert_eq!(processed[0].document_id, doc.id);

    assert!(store.get_document("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn unique_hash_reports_conflict() {
    let (_tmp, store) = open_store().await;
    let hash = paragraph_hash("Same text");
    let first = Paragraph::new("Same text", &hash);
    assert_eq!(
        store.insert_paragraph(&first).await.unwrap(),
        InsertOutcome::Inserted(first.clone())
    );
    let second = Paragraph::new("SAME   text", &hash);
    assert_eq!(
        store.insert_paragraph(&second).await.unwrap(),
        InsertOutcome::Conflict
    );
    let stored = store.find_paragraph_by_hash(&hash).await.unwrap().unwrap();
    assert_eq!(stored.id, first.id);
}

#[tokio::test]
async fn duplicate_association_fails() {
    let (_tmp, store) = open_store().await;
    let doc = Document::new("a.pdf", "pdf", 1);
    store.create_document(&doc).await.unwrap();
    let p = Paragraph::new("text", &paragraph_hash("text"));
    store.insert_paragraph(&p).await.unwrap();

    store.create_association(&doc.id, &p.id, Some(0)).await.unwrap();
    assert!(store.association_exists(&doc.id, &p.id).await.unwrap());
    assert!(store.create_association(&doc.id, &p.id, Some(1)).await.is_err());
}

#[tokio::test]
async fn pipeline_dedups_across_documents() {
    let (_tmp, store) = open_store().await;
    let processor = DocumentProcessor::default();
    let a = processed_doc(&store, "a.pdf", 1, "").await;
    let b = processed_doc(&store, "b.pdf", 2, "").await;

    let text_a = "Shared opening paragraph.\n\nOnly document A says this.";
    let text_b = "Shared opening paragraph.\n\nDocument B has its own ending.";
    assert_eq!(processor.process_document(&store, text_a, &a).await.unwrap(), 2);
    assert_eq!(processor.process_document(&store, text_b, &b).await.unwrap(), 2);

    let counts = store.counts().await.unwrap();
    assert_eq!(counts.paragraphs, 3);
    assert_eq!(counts.associations, 4);
    assert_eq!(counts.shared_paragraphs, 1);

    let positions: Vec<Option<i64>> = store
        .document_paragraphs(&b)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.position)
        .collect();
    assert_eq!(positions, vec![Some(0), Some(1)]);

    let usage = store.paragraph_usage().await.unwrap();
    assert_eq!(usage[0].document_count, 2);
    assert_eq!(usage[0].paragraph.content, "Shared opening paragraph.");
}

#[tokio::test]
async fn deletion_cascades_and_collects_orphans() {
    let (_tmp, store) = open_store().await;
    let processor = DocumentProcessor::default();
    let a = processed_doc(&store, "a.pdf", 1, "x").await;
    let b = processed_doc(&store, "b.pdf", 2, "x").await;
    processor
        .process_document(&store, "Common paragraph text for both.\n\nUnique to the first document here.", &a)
        .await
        .unwrap();
    processor
        .process_document(&store, "Common paragraph text for both.\n\nUnique to the second document here.", &b)
        .await
        .unwrap();
    store
        .replace_similarities(&[DocumentSimilarity {
            source_id: a.clone(),
            target_id: b.clone(),
            score: 0.5,
        }])
        .await
        .unwrap();

    let report = store.delete_document(&a).await.unwrap().unwrap();
    assert_eq!(report.associations_removed, 2);
    assert_eq!(report.paragraphs_removed, 1);
    assert_eq!(report.similarities_removed, 1);

    let counts = store.counts().await.unwrap();
    assert_eq!(counts.documents, 1);
    assert_eq!(counts.paragraphs, 2);
    assert_eq!(counts.associations, 2);
    assert_eq!(counts.similarities, 0);

    assert!(store.delete_document(&a).await.unwrap().is_none());

    let report = store.delete_all().await.unwrap();
    assert_eq!(report.paragraphs_removed, 2);
    assert_eq!(store.counts().await.unwrap(), StoreCounts::default());
}

#[tokio::test]
async fn deletion_spares_paragraphs_not_yet_linked() {
    let (_tmp, store) = open_store().await;
    let a = processed_doc(&store, "a.pdf", 1, "x").await;
    let own = Paragraph::new("Only document A has this.", &paragraph_hash("Only document A has this."));
    store.insert_paragraph(&own).await.unwrap();
    store.create_association(&a, &own.id, Some(0)).await.unwrap();

    let pending_hash = paragraph_hash("Another upload inserted this first.");
    let pending = Paragraph::new("Another upload inserted this first.", &pending_hash);
    store.insert_paragraph(&pending).await.unwrap();

    let report = store.delete_document(&a).await.unwrap().unwrap();
    assert_eq!(report.paragraphs_removed, 1);
    assert!(store.find_paragraph_by_hash(&pending_hash).await.unwrap().is_some());
    assert_eq!(store.counts().await.unwrap().paragraphs, 1);
}

#[tokio::test]
async fn failed_replace_rolls_back() {
    let (_tmp, store) = open_store().await;
    let a = processed_doc(&store, "a.pdf", 1, "x").await;
    let b = processed_doc(&store, "b.pdf", 2, "x").await;
    let good = DocumentSimilarity {
        source_id: a.clone(),
        target_id: b.clone(),
        score: 0.6,
    };
    store.replace_similarities(&[good.clone()]).await.unwrap();

    // The second edge violates the score CHECK constraint.
    let result = store
        .replace_similarities(&[
            DocumentSimilarity {
                score: 0.2,
                ..good.clone()
            },
            DocumentSimilarity {
                source_id: b.clone(),
                target_id: a.clone(),
                score: 1.5,
            },
        ])
        .await;
    assert!(result.is_err());

    let kept = store.similarity_between(&b, &a).await.unwrap().unwrap();
    assert_eq!(kept, good);
}

#[tokio::test]
async fn similarity_engine_over_sqlite() {
    let (_tmp, store) = open_store().await;
    let a = processed_doc(&store, "a.pdf", 10, "rust compiler borrow checker lifetimes").await;
    let b = processed_doc(&store, "b.pdf", 20, "rust compiler borrow checker traits").await;
    processed_doc(&store, "c.pdf", 30, "gardening tomatoes compost soil").await;

    calculate_similarities(&store, &SimilarityConfig::default(), 0.3)
        .await
        .unwrap();
    let edge = store.similarity_between(&a, &b).await.unwrap().unwrap();
    assert_eq!(edge.source_id, a);

    let similar = get_similar(&store, &b, 0.0, 5).await.unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].document_id, a);
}
