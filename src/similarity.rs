//! Near-duplicate detection: line-set Jaccard over comment-stripped text.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::extract::regexes::regex_comment_or_blank;

/// One near-duplicate file pair, scores in `[0, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarPair {
    pub file_a: String,
    pub file_b: String,
    pub score: f64,
}

/// Distinct trimmed non-blank lines after comment removal.
fn line_set(text: &str) -> HashSet<String> {
    let stripped = regex_comment_or_blank().replace_all(text, "");
    stripped
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of the two texts' line sets.
///
/// Symmetric by construction; 0.0 when either side has no content left
/// after stripping.
pub fn similarity(text_a: &str, text_b: &str) -> f64 {
    if text_a.is_empty() || text_b.is_empty() {
        return 0.0;
    }
    let lines_a = line_set(text_a);
    let lines_b = line_set(text_b);
    if lines_a.is_empty() || lines_b.is_empty() {
        return 0.0;
    }
    let intersection = lines_a.intersection(&lines_b).count();
    let union = lines_a.union(&lines_b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}
