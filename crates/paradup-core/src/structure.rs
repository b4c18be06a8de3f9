//! Structured-content and noise detection.
//!
//! A block is *structured* when splitting it would destroy its meaning:
//! bullet, numbered, or lettered lists, pipe or tab tables, ASCII or
//! box-drawn borders, and consistently indented blocks. Structured blocks
//! pass through segmentation and container filtering as one unit.
//!
//! Classification expects the block *before* trimming so the indentation
//! of its first line is still visible.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BULLET_ITEM: Regex =
        Regex::new(r"^\s*[-*+•◦▪▫‣⁃●○■□►▶➢➤]\s+\S").expect("valid regex");
    static ref NUMBERED_ITEM: Regex =
        Regex::new(r"^\s*\(?\d{1,3}(\.\d{1,3})*[.)]\s+\S").expect("valid regex");
    static ref LETTERED_ITEM: Regex =
        Regex::new(r"^\s*\(?([a-zA-Z]|[ivxlcdmIVXLCDM]{1,6})[.)]\s+\S").expect("valid regex");
    static ref ASCII_BORDER: Regex = Regex::new(r"^\s*\+[-=+]{2,}\+\s*$").expect("valid regex");
    static ref NOISE: Regex = Regex::new(r"^[\d\W_]+$").expect("valid regex");
    static ref PAGE_NUMBER: Regex =
        Regex::new(r"(?i)^(page|p\.|pg\.?)\s*\d+(\s*(of|/)\s*\d+)?$").expect("valid regex");
}

/// The kind of structure a block was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    List,
    PipeTable,
    TabTable,
    Bordered,
    Indented,
}

/// Classify a raw block. Returns `None` for ordinary prose.
pub fn classify(block: &str) -> Option<StructureKind> {
    let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();

    if lines.iter().any(|l| is_border_line(l)) {
        return Some(StructureKind::Bordered);
    }
    if lines.len() < 2 {
        return None;
    }

    let majority = |count: usize| count >= 2 && count * 2 >= lines.len();

    let list_items = lines.iter().filter(|l| is_list_item(l)).count();
    if majority(list_items) {
        return Some(StructureKind::List);
    }

    let pipe_rows = lines
        .iter()
        .filter(|l| l.matches('|').count() >= 2)
        .count();
    if majority(pipe_rows) {
        return Some(StructureKind::PipeTable);
    }

    let tab_rows = lines
        .iter()
        .filter(|l| l.trim().split('\t').filter(|c| !c.trim().is_empty()).count() >= 2)
        .count();
    if majority(tab_rows) {
        return Some(StructureKind::TabTable);
    }

    if lines.iter().all(|l| l.starts_with(' ') || l.starts_with('\t')) {
        return Some(StructureKind::Indented);
    }

    None
}

/// Shorthand for `classify(block).is_some()`.
pub fn is_structured(block: &str) -> bool {
    classify(block).is_some()
}

/// True for a single list-item line (bullet, number, letter, or roman numeral).
pub fn is_list_item(line: &str) -> bool {
    BULLET_ITEM.is_match(line) || NUMBERED_ITEM.is_match(line) || LETTERED_ITEM.is_match(line)
}

fn is_border_line(line: &str) -> bool {
    if ASCII_BORDER.is_match(line) {
        return true;
    }
    line.chars()
        .filter(|c| ('\u{2500}'..='\u{257F}').contains(c))
        .count()
        >= 3
}

/// Pure digits/punctuation, or a bare page-number line such as `Page 3`.
pub fn is_noise(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || NOISE.is_match(trimmed) || PAGE_NUMBER.is_match(trimmed)
}
