//! Topic-shift detection for overlong paragraphs.
//!
//! A TextTiling-style lexical cohesion pass: each sentence becomes a bag
//! of content words, the gap between sentence `g-1` and `g` is scored by
//! the cosine similarity of the `window` sentences on either side, and
//! gaps sitting in a deep valley of that curve become boundaries.

use std::collections::HashMap;

use crate::tfidf::tokenize;
use crate::tokenizer::SentenceTokenizer;

/// Sentences compared on each side of a gap.
const WINDOW: usize = 2;
/// Below this many sentences there is nothing to tile.
const MIN_SENTENCES: usize = 4;

/// Split `text` at lexical-cohesion boundaries.
///
/// Returns `None` when no usable boundary exists; callers keep the text
/// intact in that case. Every returned piece is at least
/// `min_piece_chars` long except when the whole text is shorter.
pub fn split_by_topic(
    text: &str,
    tokenizer: &dyn SentenceTokenizer,
    min_piece_chars: usize,
) -> Option<Vec<String>> {
    let sentences = tokenizer.sentences(text);
    if sentences.len() < MIN_SENTENCES {
        return None;
    }

    let bags: Vec<HashMap<String, f64>> = sentences.iter().map(|s| term_bag(s)).collect();
    let scores: Vec<f64> = (1..sentences.len())
        .map(|gap| {
            let left = sum_bags(&bags[gap.saturating_sub(WINDOW)..gap]);
            let right = sum_bags(&bags[gap..(gap + WINDOW).min(bags.len())]);
            cosine(&left, &right)
        })
        .collect();

    let depths = depth_scores(&scores);
    let boundaries = pick_boundaries(&depths);
    if boundaries.is_empty() {
        return None;
    }

    let mut pieces = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0;
    for gap_index in boundaries {
        // gap_index i sits between sentence i and i + 1
        let end = gap_index + 1;
        pieces.push(sentences[start..end].join(" "));
        start = end;
    }
    pieces.push(sentences[start..].join(" "));

    let pieces = fold_short_pieces(pieces, min_piece_chars);
    if pieces.len() < 2 {
        None
    } else {
        Some(pieces)
    }
}

fn term_bag(sentence: &str) -> HashMap<String, f64> {
    let mut bag = HashMap::new();
    for term in tokenize(sentence) {
        *bag.entry(term).or_insert(0.0) += 1.0;
    }
    bag
}

fn sum_bags(bags: &[HashMap<String, f64>]) -> HashMap<String, f64> {
    let mut total = HashMap::new();
    for bag in bags {
        for (term, count) in bag {
            *total.entry(term.clone()).or_insert(0.0) += count;
        }
    }
    total
}

fn cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    let norm_a = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.values().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Depth of each gap below the nearest peaks on its left and right.
fn depth_scores(scores: &[f64]) -> Vec<f64> {
    (0..scores.len())
        .map(|i| {
            let score = scores[i];

            let mut left_peak = score;
            let mut j = i;
            while j > 0 && scores[j - 1] >= left_peak {
                left_peak = scores[j - 1];
                j -= 1;
            }

            let mut right_peak = score;
            let mut k = i;
            while k + 1 < scores.len() && scores[k + 1] >= right_peak {
                right_peak = scores[k + 1];
                k += 1;
            }

            (left_peak - score) + (right_peak - score)
        })
        .collect()
}

/// Gaps deeper than `mean - stddev / 2` that are also local depth maxima.
fn pick_boundaries(depths: &[f64]) -> Vec<usize> {
    if depths.is_empty() {
        return Vec::new();
    }
    let n = depths.len() as f64;
    let mean = depths.iter().sum::<f64>() / n;
    let variance = depths.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    let threshold = mean - variance.sqrt() / 2.0;

    (0..depths.len())
        .filter(|&i| {
            let d = depths[i];
            let left_ok = i == 0 || d >= depths[i - 1];
            let right_ok = i + 1 == depths.len() || d >= depths[i + 1];
            d > 0.0 && d > threshold && left_ok && right_ok
        })
        .collect()
}

fn fold_short_pieces(pieces: Vec<String>, min_piece_chars: usize) -> Vec<String> {
    let mut folded: Vec<String> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        match folded.last_mut() {
            Some(last) if piece.chars().count() < min_piece_chars => {
                last.push(' ');
                last.push_str(&piece);
            }
            _ => folded.push(piece),
        }
    }
    if folded.len() > 1 && folded[0].chars().count() < min_piece_chars {
        let first = folded.remove(0);
        folded[0] = format!("{} {}", first, folded[0]);
    }
    folded
}
