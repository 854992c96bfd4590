//! String and vector similarity primitives.
//!
//! String functions expect already-normalized input (see [`crate::normalize`]);
//! none of them normalize on their own, so callers pay that cost once per text.


use std::collections::HashMap;

/// Result of comparing two normalized strings for exact or containment equality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContainmentMatch {
    /// Strings are identical.
    Equal,
    /// One string contains the other; `ratio` is shorter/longer length in chars.
    Contains { ratio: f32 },
}

impl ContainmentMatch {
    /// Score in `(0, 1]` for the match.
    pub fn score(&self) -> f32 {
        match self {
            ContainmentMatch::Equal => 1.0,
            ContainmentMatch::Contains { ratio } => *ratio,
        }
    }
}

/// Checks equality or containment between two normalized strings.
///
/// Containment only counts when the shorter string has at least `min_len` chars.
pub fn containment(a: &str, b: &str, min_len: usize) -> Option<ContainmentMatch> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    if a == b {
        return Some(ContainmentMatch::Equal);
    }

    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let shorter_chars = shorter.chars().count();
    if shorter_chars < min_len.max(1) || !longer.contains(shorter) {
        return None;
    }

    let ratio = shorter_chars as f32 / longer.chars().count() as f32;
    Some(ContainmentMatch::Contains { ratio })
}

fn bigram_counts(s: &str) -> (HashMap<(char, char), usize>, usize) {
    let chars: Vec<char> = s.chars().collect();
    let mut counts = HashMap::with_capacity(chars.len());
    for pair in chars.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    (counts, chars.len().saturating_sub(1))
}

/// Sørensen–Dice coefficient over character bigram multisets.
///
/// Returns 1.0 for equal strings, 0.0 when either string is shorter than two
/// chars (and they differ). Symmetric in its arguments.
pub fn dice(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }

    let (counts_a, total_a) = bigram_counts(a);
    let (counts_b, total_b) = bigram_counts(b);
    if total_a == 0 || total_b == 0 {
        return 0.0;
    }

    let intersection: usize = counts_a
        .iter()
        .map(|(bigram, count_a)| {
            counts_b
                .get(bigram)
                .map_or(0, |count_b| (*count_a).min(*count_b))
        })
        .sum();

    (2 * intersection) as f32 / (total_a + total_b) as f32
}

/// Levenshtein edit distance over chars, using two rows of the DP table.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (long, short) = if a.len() >= b.len() { (&a, &b) } else { (&b, &a) };

    if short.is_empty() {
        return long.len();
    }

    let mut previous: Vec<usize> = (0..=short.len()).collect();
    let mut current = vec![0usize; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        current[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let substitution = previous[j] + usize::from(lc != sc);
            let deletion = previous[j + 1] + 1;
            let insertion = current[j] + 1;
            current[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[short.len()]
}

/// Maximum edit distance accepted for a query of `query_len` chars.
///
/// `max(min_tolerance, ceil(ratio * query_len))`.
pub fn levenshtein_tolerance(query_len: usize, ratio: f32, min_tolerance: usize) -> usize {
    let scaled = (ratio * query_len as f32).ceil() as usize;
    scaled.max(min_tolerance)
}

/// Cosine similarity of two vectors; 0.0 when lengths differ or either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
