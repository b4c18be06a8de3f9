//! Paragraph segmentation.
//!
//! Turns normalized text into an ordered list of paragraph strings using
//! layered heuristics. Each layer runs only when the previous one left
//! something to fix:
//!
//! 1. **Blank-line split.** Split on whitespace runs containing two or
//!    more newlines; drop short pieces and noise (page numbers, bare
//!    punctuation).
//! 2. **Continuation merge.** A short piece that does not end in terminal
//!    punctuation is glued onto the following piece.
//! 3. **Structured override.** Lists, tables, bordered and indented blocks
//!    are never merged, dropped, or subdivided.
//! 4. **Sentence grouping.** When layers 1–3 leave at most one paragraph
//!    from a long input, sentences are grouped into paragraphs of a few
//!    sentences each, breaking early at paragraph-starter phrases.
//! 5. **Topic subdivision.** Overlong prose paragraphs are re-split at
//!    lexical-cohesion boundaries; if none are found they stay intact.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use paradup_core::segment::{Segmenter, SegmenterConfig};
//! use paradup_core::tokenizer::UnicodeSentenceTokenizer;
//!
//! let segmenter = Segmenter::new(SegmenterConfig::default(), Arc::new(UnicodeSentenceTokenizer::new()));
//! let paragraphs = segmenter.segment("Para one here.\n\n- item a\n- item b\n- item c\n\nPara two follows.");
//! assert_eq!(paragraphs.len(), 3);
//! assert_eq!(paragraphs[1], "- item a\n- item b\n- item c");
//! ```

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::structure::{is_noise, is_structured};
use crate::tokenizer::SentenceTokenizer;
use crate::topic::split_by_topic;

lazy_static! {
    static ref BLANK_LINES: Regex = Regex::new(r"\n(?:[ \t]*\n)+").expect("valid regex");
}

/// Phrases that usually open a new paragraph in letters, emails, and
/// argumentative prose.
const PARAGRAPH_STARTERS: &[&str] = &[
    "Dear ",
    "However",
    "Furthermore",
    "Moreover",
    "Additionally",
    "In conclusion",
    "Finally",
    "Please ",
    "Thank you",
    "Sincerely",
    "Regards",
    "Subject:",
    "From:",
    "To:",
    "Date:",
    "Cc:",
    "Re:",
];

/// Segmentation thresholds. All lengths are in characters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Pieces shorter than this are dropped (structured pieces excepted).
    pub min_paragraph_chars: usize,
    /// Unterminated pieces shorter than this merge into the next piece.
    pub continuation_max_chars: usize,
    /// Inputs longer than this that yield ≤1 paragraph use sentence grouping.
    pub fallback_min_chars: usize,
    pub min_sentences_per_group: usize,
    pub max_sentences_per_group: usize,
    /// Prose paragraphs longer than this go through topic subdivision.
    pub long_paragraph_chars: usize,
    /// Minimum size of a piece produced by topic subdivision.
    pub min_topic_piece_chars: usize,
    /// Inputs shorter than this are returned whole (or not at all, if noise).
    pub tiny_input_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_paragraph_chars: 10,
            continuation_max_chars: 100,
            fallback_min_chars: 300,
            min_sentences_per_group: 3,
            max_sentences_per_group: 5,
            long_paragraph_chars: 1000,
            min_topic_piece_chars: 200,
            tiny_input_chars: 50,
        }
    }
}

/// A segmented paragraph and whether it was classified as structured
/// content before trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub structured: bool,
}

impl Segment {
    pub fn prose(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: false,
        }
    }
}

/// Layered paragraph segmenter with an injected sentence tokenizer.
pub struct Segmenter {
    config: SegmenterConfig,
    tokenizer: Arc<dyn SentenceTokenizer>,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig, tokenizer: Arc<dyn SentenceTokenizer>) -> Self {
        Self { config, tokenizer }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &dyn SentenceTokenizer {
        self.tokenizer.as_ref()
    }

    /// Segment normalized text into paragraphs, in document order.
    pub fn segment(&self, text: &str) -> Vec<String> {
        self.segment_classified(text)
            .into_iter()
            .map(|s| s.text)
            .collect()
    }

    /// Like [`Segmenter::segment`], keeping each paragraph's structure flag
    /// for the container filter.
    pub fn segment_classified(&self, text: &str) -> Vec<Segment> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        if char_len(trimmed) < self.config.tiny_input_chars {
            return if is_noise(trimmed) {
                Vec::new()
            } else {
                vec![Segment {
                    text: trimmed.to_string(),
                    structured: is_structured(text),
                }]
            };
        }

        let mut candidates = self.merge_continuations(self.split_blank_lines(text));

        // Group only what survived the blank-line pass, so dropped noise
        // never comes back inside a sentence group.
        if let [only] = candidates.as_slice() {
            if !only.structured && char_len(trimmed) > self.config.fallback_min_chars {
                let grouped = self.group_sentences(&only.text);
                if grouped.len() >= 2 {
                    candidates = grouped;
                }
            }
        }

        let mut paragraphs = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !candidate.structured && char_len(&candidate.text) > self.config.long_paragraph_chars {
                match split_by_topic(
                    &candidate.text,
                    self.tokenizer.as_ref(),
                    self.config.min_topic_piece_chars,
                ) {
                    Some(pieces) => paragraphs.extend(pieces.into_iter().map(Segment::prose)),
                    None => paragraphs.push(candidate),
                }
            } else {
                paragraphs.push(candidate);
            }
        }
        paragraphs
    }

    fn split_blank_lines(&self, text: &str) -> Vec<Segment> {
        BLANK_LINES
            .split(text)
            .filter_map(|raw| {
                // Classify before trimming so first-line indentation counts.
                let structured = is_structured(raw);
                let piece = raw.trim();
                if piece.is_empty() {
                    return None;
                }
                if !structured
                    && (char_len(piece) < self.config.min_paragraph_chars || is_noise(piece))
                {
                    return None;
                }
                Some(Segment {
                    text: piece.to_string(),
                    structured,
                })
            })
            .collect()
    }

    fn merge_continuations(&self, candidates: Vec<Segment>) -> Vec<Segment> {
        let mut out: Vec<Segment> = Vec::with_capacity(candidates.len());
        let mut pending: Option<String> = None;

        for candidate in candidates {
            if candidate.structured {
                if let Some(p) = pending.take() {
                    out.push(Segment {
                        text: p,
                        structured: false,
                    });
                }
                out.push(candidate);
                continue;
            }

            let text = match pending.take() {
                Some(p) => format!("{}\n\n{}", p, candidate.text),
                None => candidate.text,
            };

            if char_len(&text) < self.config.continuation_max_chars && !ends_terminal(&text) {
                pending = Some(text);
            } else {
                out.push(Segment {
                    text,
                    structured: false,
                });
            }
        }

        if let Some(p) = pending {
            out.push(Segment {
                text: p,
                structured: false,
            });
        }
        out
    }

    fn group_sentences(&self, text: &str) -> Vec<Segment> {
        let sentences = self.tokenizer.sentences(text);
        let mut groups: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for sentence in sentences {
            let full = current.len() >= self.config.max_sentences_per_group;
            let starter_break = !current.is_empty()
                && current.last().map(|s| ends_terminal(s)).unwrap_or(false)
                && starts_paragraph(&sentence);
            if full || starter_break {
                groups.push(std::mem::take(&mut current));
            }
            current.push(sentence);
        }
        if !current.is_empty() {
            groups.push(current);
        }

        // A trailing runt smaller than the preferred minimum joins its predecessor
        // unless it opens with a starter phrase.
        if groups.len() >= 2 {
            let last = &groups[groups.len() - 1];
            let runt = last.len() < self.config.min_sentences_per_group
                && !last.first().map(|s| starts_paragraph(s)).unwrap_or(false);
            if runt {
                if let Some(tail) = groups.pop() {
                    if let Some(prev) = groups.last_mut() {
                        prev.extend(tail);
                    }
                }
            }
        }

        let mut out: Vec<Segment> = Vec::with_capacity(groups.len());
        for group in groups {
            let text = group.join(" ");
            match out.last_mut() {
                Some(prev) if char_len(&text) < self.config.min_paragraph_chars => {
                    prev.text.push(' ');
                    prev.text.push_str(&text);
                }
                _ => out.push(Segment {
                    text,
                    structured: false,
                }),
            }
        }
        out
    }
}

/// True if `text` ends in `.`, `!`, `?`, `:` or `;`, looking through
/// closing quotes and brackets.
pub fn ends_terminal(text: &str) -> bool {
    text.trim_end()
        .trim_end_matches(['"', '\'', ')', ']', '”', '’', '»'])
        .ends_with(['.', '!', '?', ':', ';'])
}

fn starts_paragraph(sentence: &str) -> bool {
    PARAGRAPH_STARTERS.iter().any(|p| sentence.starts_with(p))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::UnicodeSentenceTokenizer;

    fn segmenter() -> Segmenter {
        Segmenter::new(
            SegmenterConfig::default(),
            Arc::new(UnicodeSentenceTokenizer::new()),
        )
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(segmenter().segment("").is_empty());
        assert!(segmenter().segment(" \n\n ").is_empty());
    }

    #[test]
    fn tiny_input_is_returned_whole() {
        assert_eq!(segmenter().segment("Just a note."), vec!["Just a note."]);
        assert!(segmenter().segment("Page 4").is_empty());
    }

    #[test]
    fn bullet_block_between_paragraphs() {
        let text = "Para one here.\n\n- item a\n- item b\n- item c\n\nPara two follows.";
        assert_eq!(
            segmenter().segment(text),
            vec![
                "Para one here.",
                "- item a\n- item b\n- item c",
                "Para two follows.",
            ]
        );
    }

    #[test]
    fn drops_noise_and_short_pieces() {
        let text = "The first paragraph has enough text.\n\n12\n\nPage 3\n\nok\n\nThe second paragraph also has text.";
        assert_eq!(
            segmenter().segment(text),
            vec![
                "The first paragraph has enough text.",
                "The second paragraph also has text.",
            ]
        );
    }

    #[test]
    fn merges_unterminated_heading_into_next() {
        let text = "Introduction and scope\n\nThis document explains the deployment process.\n\nA closing remark ends here.";
        let out = segmenter().segment(text);
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0],
            "Introduction and scope\n\nThis document explains the deployment process."
        );
    }

    #[test]
    fn heading_before_list_is_not_merged_into_list() {
        let text = "Shopping items for today\n\n- milk\n- eggs\n- bread\n\nThat is all for the shopping trip.";
        let out = segmenter().segment(text);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], "- milk\n- eggs\n- bread");
    }

    #[test]
    fn short_structured_block_survives_length_filter() {
        let text = "Some context sentence goes here.\n\n- a\n- b\n\nAnother context sentence here.";
        let out = segmenter().segment(text);
        assert!(out.contains(&"- a\n- b".to_string()));
    }

    #[test]
    fn sentence_grouping_fallback() {
        let sentences: Vec<String> = (0..10)
            .map(|i| format!("This is sentence number {} of the long undivided text block.", i))
            .collect();
        let text = sentences.join(" ");
        assert!(text.len() > 300);
        let out = segmenter().segment(&text);
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("This is sentence number 0"));
        assert!(out[1].starts_with("This is sentence number 5"));
    }

    #[test]
    fn fallback_does_not_revive_dropped_noise() {
        let sentences: Vec<String> = (0..8)
            .map(|i| format!("This is sentence number {} of the long undivided text block.", i))
            .collect();
        let text = format!("{}\n\nPage 3\n\n12", sentences.join(" "));
        let out = segmenter().segment(&text);
        assert_eq!(out.len(), 2);
        assert!(out[1].ends_with("sentence number 7 of the long undivided text block."));
        assert!(out.iter().all(|p| !p.contains("Page 3")));
    }

    #[test]
    fn indented_block_keeps_structure_flag() {
        let text = "Opening paragraph is written as prose.\n\n first indented line\n second indented line\n third indented line";
        let out = segmenter().segment_classified(text);
        assert_eq!(out.len(), 2);
        assert!(!out[0].structured);
        assert!(out[1].structured);
        assert!(out[1].text.starts_with("first indented line"));
    }

    #[test]
    fn fallback_breaks_at_paragraph_starters() {
        let text = "Dear customer, thank you for your recent order with our store. \
            Your package was shipped on Monday morning. \
            However, the carrier reported a delay in the northern region today. \
            We expect delivery within three business days from now. \
            Please contact support if it has not arrived by Friday afternoon. \
            Sincerely, the customer care team at the store.";
        let out = segmenter().segment(text);
        assert!(out.len() >= 2, "got {:?}", out);
        assert!(out[0].starts_with("Dear customer"));
        assert!(out.iter().any(|p| p.starts_with("However,")));
    }

    #[test]
    fn structured_single_block_skips_fallback() {
        let items: Vec<String> = (0..20)
            .map(|i| format!("- checklist entry number {} needs review.", i))
            .collect();
        let text = items.join("\n");
        let out = segmenter().segment(&text);
        assert_eq!(out, vec![text]);
    }

    #[test]
    fn long_paragraph_is_subdivided_by_topic() {
        let cats = "The tabby cat curled beside the kitten and purred near the warm fireplace.";
        let money = "Quarterly revenue exceeded forecasts while operating expenses declined sharply.";
        let mut parts = vec![cats; 8];
        parts.extend(vec![money; 8]);
        let long = parts.join(" ");
        assert!(long.len() > 1000);
        let text = format!("{}\n\nA short closing paragraph ends the text.", long);
        let out = segmenter().segment(&text);
        assert_eq!(out.len(), 3);
        assert!(out[0].contains("kitten") && !out[0].contains("revenue"));
        assert!(out[1].contains("revenue") && !out[1].contains("kitten"));
    }

    #[test]
    fn long_uniform_paragraph_stays_intact() {
        let cats = "The tabby cat curled beside the kitten and purred near the warm fireplace.";
        let long = vec![cats; 16].join(" ");
        let text = format!("{}\n\nA short closing paragraph ends the text.", long);
        let out = segmenter().segment(&text);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], long);
    }

    #[test]
    fn deterministic() {
        let text = "Alpha paragraph text here.\n\nBeta paragraph text here.\n\n- x one\n- y two";
        assert_eq!(segmenter().segment(text), segmenter().segment(text));
    }

    #[test]
    fn terminal_punctuation_detection() {
        assert!(ends_terminal("Done."));
        assert!(ends_terminal("He said \"stop.\""));
        assert!(ends_terminal("Note:"));
        assert!(!ends_terminal("Heading"));
    }
}
