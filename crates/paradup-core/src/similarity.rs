//! Document similarity over extracted text.
//!
//! [`calculate_similarities`] rebuilds the whole edge set from scratch:
//! TF-IDF vectors for every processed document, pairwise cosine, and one
//! stored edge per unordered pair whose score clears the threshold.
//! Queries ([`get_similar`], [`compare_documents`]) only read stored edges.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{DocumentSimilarity, Paragraph, SimilarDocument};
use crate::store::Store;
use crate::tfidf::TfidfVectorizer;

/// Thresholds are kept inside this band regardless of what callers ask for.
pub const MIN_THRESHOLD: f64 = 0.1;
pub const MAX_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Vocabulary bound for the TF-IDF model.
    pub max_features: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self { max_features: 5000 }
    }
}

/// What a similarity run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SimilarityOutcome {
    /// Fewer than two processed documents; the stored edges are untouched.
    InsufficientDocuments { found: usize },
    Computed { documents: usize, pairs: usize },
}

/// Stored score plus paragraph overlap between two documents.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentComparison {
    pub first_id: String,
    pub second_id: String,
    /// 0 when no edge is stored.
    pub score: f64,
    pub shared: Vec<Paragraph>,
    pub only_first: Vec<Paragraph>,
    pub only_second: Vec<Paragraph>,
}

pub fn clamp_threshold(min_similarity: f64) -> f64 {
    if min_similarity.is_nan() {
        return MIN_THRESHOLD;
    }
    min_similarity.clamp(MIN_THRESHOLD, MAX_THRESHOLD)
}

/// Recompute and replace every similarity edge.
pub async fn calculate_similarities<S: Store + ?Sized>(
    store: &S,
    config: &SimilarityConfig,
    min_similarity: f64,
) -> Result<SimilarityOutcome> {
    let docs = store.list_processed_documents().await?;
    if docs.len() < 2 {
        info!(found = docs.len(), "not enough processed documents for similarity");
        return Ok(SimilarityOutcome::InsufficientDocuments { found: docs.len() });
    }

    let threshold = clamp_threshold(min_similarity);
    let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
    let matrix = TfidfVectorizer::new(config.max_features).fit_transform(&texts);
    debug!(
        documents = docs.len(),
        vocabulary = matrix.vocabulary.len(),
        "tf-idf model built"
    );

    let mut edges = Vec::new();
    for i in 0..docs.len() {
        for j in (i + 1)..docs.len() {
            let score = matrix.cosine(i, j);
            if score >= threshold {
                edges.push(DocumentSimilarity {
                    source_id: docs[i].document_id.clone(),
                    target_id: docs[j].document_id.clone(),
                    score,
                });
            }
        }
    }

    store.replace_similarities(&edges).await?;
    info!(
        documents = docs.len(),
        pairs = edges.len(),
        threshold,
        "similarities replaced"
    );

    Ok(SimilarityOutcome::Computed {
        documents: docs.len(),
        pairs: edges.len(),
    })
}

/// Documents most similar to `document_id`, best first.
pub async fn get_similar<S: Store + ?Sized>(
    store: &S,
    document_id: &str,
    min_score: f64,
    limit: usize,
) -> Result<Vec<SimilarDocument>> {
    let edges = store.similarities_for(document_id, min_score).await?;

    let mut best: HashMap<String, f64> = HashMap::new();
    for edge in &edges {
        let Some(other) = edge.other(document_id) else {
            continue;
        };
        if other == document_id {
            continue;
        }
        let entry = best.entry(other.to_string()).or_insert(edge.score);
        if edge.score > *entry {
            *entry = edge.score;
        }
    }

    let mut similar: Vec<SimilarDocument> = best
        .into_iter()
        .map(|(document_id, score)| SimilarDocument { document_id, score })
        .collect();
    similar.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
    similar.truncate(limit);
    Ok(similar)
}

/// Side-by-side view of two documents.
pub async fn compare_documents<S: Store + ?Sized>(
    store: &S,
    first_id: &str,
    second_id: &str,
) -> Result<DocumentComparison> {
    for id in [first_id, second_id] {
        if store.get_document(id).await?.is_none() {
            bail!("document not found: {}", id);
        }
    }

    let score = store
        .similarity_between(first_id, second_id)
        .await?
        .map(|e| e.score)
        .unwrap_or(0.0);

    let first: Vec<Paragraph> = store
        .document_paragraphs(first_id)
        .await?
        .into_iter()
        .map(|p| p.paragraph)
        .collect();
    let second: Vec<Paragraph> = store
        .document_paragraphs(second_id)
        .await?
        .into_iter()
        .map(|p| p.paragraph)
        .collect();

    let first_ids: HashSet<&str> = first.iter().map(|p| p.id.as_str()).collect();
    let second_ids: HashSet<&str> = second.iter().map(|p| p.id.as_str()).collect();

    let shared = first
        .iter()
        .filter(|p| second_ids.contains(p.id.as_str()))
        .cloned()
        .collect();
    let only_first = first
        .iter()
        .filter(|p| !second_ids.contains(p.id.as_str()))
        .cloned()
        .collect();
    let only_second = second
        .iter()
        .filter(|p| !first_ids.contains(p.id.as_str()))
        .cloned()
        .collect();

    Ok(DocumentComparison {
        first_id: first_id.to_string(),
        second_id: second_id.to_string(),
        score,
        shared,
        only_first,
        only_second,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::deduplicate;
    use crate::models::Document;
    use crate::store::memory::InMemoryStore;

    async fn processed(store: &InMemoryStore, name: &str, created_at: i64, text: &str) -> String {
        let mut d = Document::new(name, "pdf", text.len() as i64);
        d.created_at = created_at;
        store.create_document(&d).await.unwrap();
        store.mark_processed(&d.id, text, 1).await.unwrap();
        d.id
    }

    #[test]
    fn thresholds_are_clamped() {
        assert_eq!(clamp_threshold(0.0), 0.1);
        assert_eq!(clamp_threshold(0.95), 0.9);
        assert_eq!(clamp_threshold(0.3), 0.3);
        assert_eq!(clamp_threshold(f64::NAN), 0.1);
    }

    #[tokio::test]
    async fn single_document_is_insufficient() {
        let store = InMemoryStore::new();
        processed(&store, "a.pdf", 1, "rust borrow checker").await;
        let outcome = calculate_similarities(&store, &SimilarityConfig::default(), 0.3)
            .await
            .unwrap();
        assert_eq!(outcome, SimilarityOutcome::InsufficientDocuments { found: 1 });
    }

    #[tokio::test]
    async fn edges_respect_threshold_and_ordering() {
        let store = InMemoryStore::new();
        let a = processed(&store, "a.pdf", 1, "rust compiler borrow checker lifetimes").await;
        let b = processed(&store, "b.pdf", 2, "rust compiler borrow checker traits").await;
        let c = processed(&store, "c.pdf", 3, "gardening tomatoes compost soil").await;

        let outcome = calculate_similarities(&store, &SimilarityConfig::default(), 0.3)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SimilarityOutcome::Computed {
                documents: 3,
                pairs: 1
            }
        );

        let edge = store.similarity_between(&b, &a).await.unwrap().unwrap();
        // Older document is the source.
        assert_eq!(edge.source_id, a);
        assert_eq!(edge.target_id, b);
        assert!(edge.score > 0.3 && edge.score <= 1.0);
        assert!(store.similarity_between(&a, &c).await.unwrap().is_none());

        // Symmetric lookup.
        let from_a = get_similar(&store, &a, 0.0, 5).await.unwrap();
        let from_b = get_similar(&store, &b, 0.0, 5).await.unwrap();
        assert_eq!(from_a[0].document_id, b);
        assert_eq!(from_b[0].document_id, a);
        assert_eq!(from_a[0].score, from_b[0].score);
    }

    #[tokio::test]
    async fn rerun_replaces_previous_edges() {
        let store = InMemoryStore::new();
        processed(&store, "a.pdf", 1, "alpha beta gamma").await;
        processed(&store, "b.pdf", 2, "alpha beta delta").await;
        let config = SimilarityConfig::default();

        calculate_similarities(&store, &config, 0.1).await.unwrap();
        assert_eq!(store.counts().await.unwrap().similarities, 1);

        // A high threshold drops the edge entirely.
        calculate_similarities(&store, &config, 0.9).await.unwrap();
        assert_eq!(store.counts().await.unwrap().similarities, 0);
    }

    #[tokio::test]
    async fn stop_word_corpus_yields_no_edges() {
        let store = InMemoryStore::new();
        processed(&store, "a.pdf", 1, "the and of").await;
        processed(&store, "b.pdf", 2, "it is the").await;
        let outcome = calculate_similarities(&store, &SimilarityConfig::default(), 0.1)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SimilarityOutcome::Computed {
                documents: 2,
                pairs: 0
            }
        );
    }

    #[tokio::test]
    async fn get_similar_sorts_and_limits() {
        let store = InMemoryStore::new();
        let a = processed(&store, "a.pdf", 1, "x").await;
        let b = processed(&store, "b.pdf", 2, "x").await;
        let c = processed(&store, "c.pdf", 3, "x").await;
        let d = processed(&store, "d.pdf", 4, "x").await;
        store
            .replace_similarities(&[
                DocumentSimilarity {
                    source_id: a.clone(),
                    target_id: b.clone(),
                    score: 0.4,
                },
                DocumentSimilarity {
                    source_id: c.clone(),
                    target_id: a.clone(),
                    score: 0.8,
                },
                DocumentSimilarity {
                    source_id: a.clone(),
                    target_id: d.clone(),
                    score: 0.2,
                },
            ])
            .await
            .unwrap();

        let similar = get_similar(&store, &a, 0.3, 5).await.unwrap();
        let ids: Vec<&str> = similar.iter().map(|s| s.document_id.as_str()).collect();
        assert_eq!(ids, vec![c.as_str(), b.as_str()]);

        let top = get_similar(&store, &a, 0.0, 1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].document_id, c);
    }

    #[tokio::test]
    async fn compare_reports_shared_and_unique_paragraphs() {
        let store = InMemoryStore::new();
        let a = processed(&store, "a.pdf", 1, "Intro shared. Only A.").await;
        let b = processed(&store, "b.pdf", 2, "Intro shared. Only B.").await;
        let pa = vec!["Intro shared".to_string(), "Only A".to_string()];
        let pb = vec!["intro SHARED".to_string(), "Only B".to_string()];
        deduplicate(&store, &a, &pa).await.unwrap();
        deduplicate(&store, &b, &pb).await.unwrap();

        let cmp = compare_documents(&store, &a, &b).await.unwrap();
        assert_eq!(cmp.score, 0.0);
        assert_eq!(cmp.shared.len(), 1);
        assert_eq!(cmp.shared[0].content, "Intro shared");
        assert_eq!(cmp.only_first[0].content, "Only A");
        assert_eq!(cmp.only_second[0].content, "Only B");

        assert!(compare_documents(&store, &a, "missing").await.is_err());
    }
}
