//! Text normalization applied to extracted text before segmentation.
//!
//! [`normalize_text`] is pure and idempotent: running it on its own output
//! returns the same string. Paragraph breaks (`\n\n`) survive; longer blank
//! runs are bounded to exactly one blank line.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref MULTI_SPACE: Regex = Regex::new(r" {2,}").expect("valid regex");
    static ref TRAILING_SPACE: Regex = Regex::new(r" +\n").expect("valid regex");
    static ref BLANK_RUN: Regex = Regex::new(r"\n{3,}").expect("valid regex");
}

/// Characters PDF/OCR extraction leaves behind that carry no content.
const INVISIBLE: &[char] = &['\u{00AD}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// Non-breaking and fixed-width spaces mapped to a plain space.
const HARD_SPACES: &[char] = &['\u{00A0}', '\u{2007}', '\u{202F}'];

/// Normalize raw extracted text.
///
/// Steps, in order:
///
/// 1. OCR artifact repair: expand typographic ligatures, drop soft hyphens
///    and zero-width characters.
/// 2. Unicode canonical composition (NFC).
/// 3. Non-breaking spaces become plain spaces.
/// 4. `\r\n` and lone `\r` become `\n`.
/// 5. Runs of two or more spaces collapse to one.
/// 6. Spaces before a newline are stripped.
/// 7. Words hyphenated across a line break are rejoined (`exam-\nple`).
/// 8. Three or more consecutive newlines collapse to exactly two.
pub fn normalize_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let repaired = repair_artifacts(raw);
    let composed: String = repaired.nfc().collect();
    let spaced: String = composed
        .chars()
        .map(|c| if HARD_SPACES.contains(&c) { ' ' } else { c })
        .collect();
    let unified = spaced.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = MULTI_SPACE.replace_all(&unified, " ");
    let stripped = TRAILING_SPACE.replace_all(&collapsed, "\n");
    let joined = rejoin_hyphenated(&stripped);

    BLANK_RUN.replace_all(&joined, "\n\n").into_owned()
}

fn repair_artifacts(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{FB00}' => out.push_str("ff"),
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            '\u{FB03}' => out.push_str("ffi"),
            '\u{FB04}' => out.push_str("ffl"),
            '\u{FB05}' | '\u{FB06}' => out.push_str("st"),
            c if INVISIBLE.contains(&c) => {}
            c => out.push(c),
        }
    }
    out
}

/// Remove `-\n` sitting between two lowercase letters.
///
/// Decisions are made against the input, so chains like `a-\nb-\nc`
/// resolve in one pass.
fn rejoin_hyphenated(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '-'
            && i > 0
            && i + 2 < chars.len()
            && chars[i - 1].is_lowercase()
            && chars[i + 1] == '\n'
            && chars[i + 2].is_lowercase()
        {
            i += 2;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}
