/*
 * similarity.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Paragraph similarity.
 *
 * The solver treats a folded paragraph as a leaf; its update cost comes
 * from a quick token-level similarity ratio over the flattened text.
 * The full word alignment in align.rs is only run later, for display.
 */

use similar::{DiffTag, TextDiff};

/// Number of tokens in the longest common subsequence of the two
/// whitespace-tokenised texts.
fn matching_tokens(left: &[&str], right: &[&str]) -> usize {
    TextDiff::from_slices(left, right)
        .ops()
        .iter()
        .filter(|op| op.tag() == DiffTag::Equal)
        .map(|op| op.old_range().len())
        .sum()
}

/// Token-level similarity ratio in [0, 1].
///
/// `2 * matching_tokens / (len_a + len_b)` under an LCS matcher over
/// whitespace-separated tokens, not characters. Identical texts score
/// 1.0; disjoint texts score 0.0.
pub fn similarity_ratio(left: &str, right: &str) -> f64 {
    let left_tokens: Vec<&str> = left.split_whitespace().collect();
    let right_tokens: Vec<&str> = right.split_whitespace().collect();

    let total = left_tokens.len() + right_tokens.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_tokens(&left_tokens, &right_tokens) as f64 / total as f64
}

/// Update cost for a paragraph pair: `10 - floor(10 * ratio)`.
///
/// Equal paragraphs cost 0; completely unrelated paragraphs cost 10,
/// the same as deleting an element. Computed in integers so the floor
/// is exact.
pub fn paragraph_cost(left: &str, right: &str) -> u64 {
    let left_tokens: Vec<&str> = left.split_whitespace().collect();
    let right_tokens: Vec<&str> = right.split_whitespace().collect();

    let total = left_tokens.len() + right_tokens.len();
    if total == 0 {
        return 0;
    }

    let matched = matching_tokens(&left_tokens, &right_tokens);
    10 - (20 * matched as u64) / total as u64
}
