//! Text canonicalization shared by the resolver and the similarity scorer.
//!
//! Every component that compares strings goes through [`normalize`] so that
//! no two components can disagree on identity. The function is pure and
//! idempotent: `normalize(normalize(x)) == normalize(x)`.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Substitutions for characters that survive combining-mark stripping.
/// Keyed per character so a second pass is a no-op.
const SUBSTITUTIONS: &[(char, &str)] = &[
    ('æ', "ae"),
    ('ø', "o"),
    ('œ', "oe"),
    ('ß', "ss"),
    ('đ', "d"),
    ('ð', "d"),
    ('þ', "th"),
    ('ł', "l"),
    ('ħ', "h"),
    ('ŋ', "n"),
    ('ı', "i"),
];

/// Canonicalize free text for comparison.
///
/// Lowercases, decomposes (NFD) and drops combining marks so romanized
/// long-vowel spellings converge (`Kāski` -> `kaski`), applies the fixed
/// substitution table, maps punctuation to spaces and collapses whitespace.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();

    let mut out = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        if let Some((_, repl)) = SUBSTITUTIONS.iter().find(|(k, _)| *k == c) {
            out.push_str(repl);
        } else if c.is_alphanumeric() {
            out.push(c);
        } else {
            out.push(' ');
        }
    }

    collapse_whitespace(&out)
}

/// [`normalize`] plus removal of any remaining non-ASCII characters.
///
/// This is the last-resort lookup key for transliterated spellings: after
/// folding, two strings that differ only in script decoration compare equal.
pub fn fold_ascii(text: &str) -> String {
    let normalized = normalize(text);
    let ascii: String = normalized.chars().filter(|c| c.is_ascii()).collect();
    collapse_whitespace(&ascii)
}

/// Normalized word set for token-overlap scoring.
pub fn token_set(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = normalize(text)
        .split_whitespace()
        .map(|t| t.to_string())
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

/// Reduce a phone number to country-prefixed digits (`977…`).
///
/// Accepts `+977-1-4412303`, `01-4412303`, `9841234567` and the like.
/// Returns `None` when fewer than six digits remain, which treats garbage
/// input as an absent phone rather than an error.
pub fn normalize_phone(raw: &str) -> Option<String> {
    // Scraped phone cells often carry several numbers and an extension.
    // Keep the first number, drop the extension. Compiled once; this sits
    // on the scoring path.
    static EXT_REGEX: OnceLock<Regex> = OnceLock::new();
    let ext_regex =
        EXT_REGEX.get_or_init(|| Regex::new(r"(?i)(ext|extension)\.?\s*\d+").unwrap());
    let first = raw.split([',', '/', ';']).next().unwrap_or(raw);
    let first = ext_regex.replace(first, "");

    let mut digits: String = first.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.starts_with("00") {
        digits = digits[2..].to_string();
    }
    if digits.len() < 6 {
        return None;
    }
    if digits.starts_with("977") {
        return Some(digits);
    }
    let national = digits.trim_start_matches('0');
    if national.len() < 6 {
        return None;
    }
    Some(format!("977{}", national))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
