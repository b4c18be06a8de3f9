//! TF-IDF term-document matrix with a bounded vocabulary.
//!
//! Tokens are lowercased runs of two or more word characters with English
//! stop words removed. The vocabulary keeps the `max_features` most
//! frequent terms across the corpus (ties broken alphabetically). Weights
//! use smoothed inverse document frequency,
//! `idf(t) = ln((1 + n) / (1 + df(t))) + 1`, and every row is
//! L2-normalized, so the dot product of two rows is their cosine
//! similarity.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::stopwords::is_stop_word;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"\b\w\w+\b").expect("valid regex");
}

/// Lowercased, stop-word-free terms of `text`, in order.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

/// Builds a [`TfidfMatrix`] from a corpus.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: usize,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self { max_features }
    }

    /// Fit the vocabulary on `docs` and return their weighted rows.
    pub fn fit_transform(&self, docs: &[&str]) -> TfidfMatrix {
        let counts: Vec<HashMap<String, f64>> = docs
            .iter()
            .map(|doc| {
                let mut tf = HashMap::new();
                for term in tokenize(doc) {
                    *tf.entry(term).or_insert(0.0) += 1.0;
                }
                tf
            })
            .collect();

        let mut corpus_freq: HashMap<&str, f64> = HashMap::new();
        for tf in &counts {
            for (term, n) in tf {
                *corpus_freq.entry(term.as_str()).or_insert(0.0) += n;
            }
        }

        let mut ranked: Vec<(&str, f64)> = corpus_freq.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked.truncate(self.max_features);

        let mut vocabulary: Vec<String> = ranked.iter().map(|(t, _)| t.to_string()).collect();
        vocabulary.sort();
        let index: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let n_docs = docs.len() as f64;
        let mut df = vec![0.0f64; vocabulary.len()];
        for tf in &counts {
            for term in tf.keys() {
                if let Some(&i) = index.get(term.as_str()) {
                    df[i] += 1.0;
                }
            }
        }
        let idf: Vec<f64> = df
            .iter()
            .map(|d| ((1.0 + n_docs) / (1.0 + d)).ln() + 1.0)
            .collect();

        let rows = counts
            .iter()
            .map(|tf| {
                let mut row: Vec<(usize, f64)> = tf
                    .iter()
                    .filter_map(|(term, n)| index.get(term.as_str()).map(|&i| (i, n * idf[i])))
                    .collect();
                row.sort_by_key(|(i, _)| *i);
                let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, w) in row.iter_mut() {
                        *w /= norm;
                    }
                }
                row
            })
            .collect();

        TfidfMatrix { vocabulary, rows }
    }
}

/// Sparse, L2-normalized TF-IDF rows, one per input document.
#[derive(Debug, Clone)]
pub struct TfidfMatrix {
    /// Terms in column order.
    pub vocabulary: Vec<String>,
    /// `(column, weight)` pairs sorted by column.
    pub rows: Vec<Vec<(usize, f64)>>,
}

impl TfidfMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cosine similarity of rows `i` and `j`, clamped to `[0, 1]`.
    ///
    /// A row with no vocabulary terms has similarity 0 to everything.
    pub fn cosine(&self, i: usize, j: usize) -> f64 {
        let (a, b) = (&self.rows[i], &self.rows[j]);
        let (mut x, mut y, mut dot) = (0, 0, 0.0);
        while x < a.len() && y < b.len() {
            match a[x].0.cmp(&b[y].0) {
                std::cmp::Ordering::Less => x += 1,
                std::cmp::Ordering::Greater => y += 1,
                std::cmp::Ordering::Equal => {
                    dot += a[x].1 * b[y].1;
                    x += 1;
                    y += 1;
                }
            }
        }
        dot.clamp(0.0, 1.0)
    }
}
