//! Sentence tokenization service.
//!
//! The segmenter and topic splitter receive a [`SentenceTokenizer`] by
//! reference instead of reaching for a global model. The default
//! [`UnicodeSentenceTokenizer`] uses UAX #29 sentence boundaries and then
//! repairs splits after common abbreviations and initials.

use unicode_segmentation::UnicodeSegmentation;

/// Splits text into sentences.
pub trait SentenceTokenizer: Send + Sync {
    /// Sentences of `text` in order, trimmed, with empty entries dropped.
    fn sentences(&self, text: &str) -> Vec<String>;
}

const ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "vs.", "etc.", "e.g.", "i.e.",
    "no.", "fig.", "inc.", "ltd.", "co.", "corp.", "approx.", "dept.", "est.", "jan.", "feb.",
    "mar.", "apr.", "jun.", "jul.", "aug.", "sep.", "sept.", "oct.", "nov.", "dec.",
];

/// Unicode sentence-boundary tokenizer with abbreviation repair.
#[derive(Debug, Default, Clone)]
pub struct UnicodeSentenceTokenizer;

impl UnicodeSentenceTokenizer {
    pub fn new() -> Self {
        Self
    }
}

impl SentenceTokenizer for UnicodeSentenceTokenizer {
    fn sentences(&self, text: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut carry = String::new();

        for piece in text.split_sentence_bounds() {
            carry.push_str(piece);
            let trimmed = carry.trim();
            if trimmed.is_empty() {
                carry.clear();
                continue;
            }
            if ends_with_abbreviation(trimmed) {
                continue;
            }
            out.push(collapse_whitespace(trimmed));
            carry.clear();
        }

        let rest = carry.trim();
        if !rest.is_empty() {
            out.push(collapse_whitespace(rest));
        }
        out
    }
}

fn ends_with_abbreviation(sentence: &str) -> bool {
    let last = match sentence.split_whitespace().last() {
        Some(word) => word,
        None => return false,
    };
    let lower = last.to_lowercase();
    if ABBREVIATIONS.iter().any(|a| lower.ends_with(a) && lower.len() == a.len()) {
        return true;
    }
    // Single capital initial, e.g. "J." in "J. Smith".
    let mut chars = last.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(c), Some('.'), None) if c.is_uppercase()
    )
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
