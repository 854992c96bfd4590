//! Text canonicalization shared by every matching stage.
//!
//! [`normalize`] is the only way text enters a comparison: bank questions are
//! normalized once at load time, queries once per request.


use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Question words that carry no signal for keyword overlap.
const STOPWORDS: &[&str] = &[
    "what", "where", "when", "which", "who", "whom", "whose", "why", "how", "your", "yours",
    "does", "have", "that", "this", "with", "from", "about", "there", "their", "they", "some",
    "would", "could", "should", "will", "into", "than", "then", "them", "please", "tell",
];

/// Letters that survive canonical decomposition and need an explicit spelling.
fn fold_letter(c: char) -> Option<&'static str> {
    match c {
        'æ' => Some("ae"),
        'ø' => Some("oe"),
        'å' => Some("aa"),
        'œ' => Some("oe"),
        'ß' => Some("ss"),
        'ł' => Some("l"),
        'đ' => Some("d"),
        'ð' => Some("d"),
        'þ' => Some("th"),
        _ => None,
    }
}

fn push_folded(out: &mut String, chars: impl Iterator<Item = char>) {
    for c in chars {
        match fold_letter(c) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
}

/// Canonicalizes `text` for comparison.
///
/// Composes (NFC) and lower-cases, folds Nordic and other non-decomposing letters,
/// strips combining marks after NFD decomposition, folds again for letters that
/// only surface once their marks are gone (`ǽ` → `æ` → `ae`), collapses
/// whitespace runs and trims. The result is a fixed point:
/// `normalize(&normalize(x)) == normalize(x)`.
///
/// ```
/// use faq_cascade::normalize::normalize;
///
/// assert_eq!(normalize("  Hvor   ligger KONTORET på Østbanen? "), "hvor ligger kontoret paa oestbanen?");
/// assert_eq!(normalize("Café"), "cafe");
/// ```
pub fn normalize(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    push_folded(&mut folded, text.nfc().flat_map(char::to_lowercase));

    let mut stripped = String::with_capacity(folded.len());
    push_folded(
        &mut stripped,
        folded.nfd().filter(|c| !is_combining_mark(*c)),
    );

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits normalized text into keyword tokens.
///
/// Tokens are maximal alphanumeric runs. A token is kept when it has at least
/// `min_len` chars or appears in `vocabulary`, and is not a stopword. Duplicates
/// are collapsed.
pub fn tokenize(normalized: &str, min_len: usize, vocabulary: &HashSet<String>) -> HashSet<String> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .filter(|token| !STOPWORDS.contains(token))
        .filter(|token| token.chars().count() >= min_len || vocabulary.contains(*token))
        .map(str::to_string)
        .collect()
}
