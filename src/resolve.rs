//! Identity resolution: reconcile a noisy OCR name against the registry.
//!
//! Both sides pass through the same canonicalization before comparison, so
//! cosmetically different spellings compare equal. Exact matches always win;
//! fuzzy matching only runs for candidates long enough to be trustworthy and
//! only against registry names of comparable length.

use serde::{Deserialize, Serialize};

/// A known identity from the registry collaborator. Read-only to the core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub canonical_name: String,
    pub identity_id: String,
    #[serde(default)]
    pub identity_group_id: Option<String>,
}

/// A successful resolution: the registry entry and its 0–100 score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match<'a> {
    pub entry: &'a RegistryEntry,
    pub score: f32,
}

/// Matching knobs, supplied by configuration.
#[derive(Clone, Copy, Debug)]
pub struct MatchOptions {
    /// Minimum fuzzy score (0–100) to accept.
    pub score_threshold: f32,
    /// Normalized candidates shorter than this never fuzzy-match.
    pub min_len: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self { score_threshold: 50.0, min_len: 4 }
    }
}

/// Fuzzy candidates may differ from the OCR name by at most this many
/// normalized characters.
const MAX_LEN_DELTA: usize = 3;
/// Shorter/longer normalized length ratio must stay at or above this floor.
const MIN_LEN_RATIO: f32 = 0.7;

/// Digit look-alike folds applied during canonicalization, so "J0hnSmith"
/// and "JohnSmith" canonicalize identically. Applied to both sides, after
/// the leading/trailing digit strip (which handles real numeric suffixes).
const DIGIT_FOLDS: &[(char, char)] = &[
    ('0', 'o'),
    ('1', 'l'),
    ('2', 'z'),
    ('3', 'e'),
    ('4', 'a'),
    ('5', 's'),
    ('6', 'g'),
    ('7', 't'),
    ('8', 'b'),
    ('9', 'g'),
];

/// Canonical form used for comparison: lowercase, bracket decorations
/// removed, leading/trailing digit/underscore runs stripped, interior digit
/// look-alikes folded, everything non-alphanumeric dropped.
pub fn canonical_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let unbracketed = strip_bracketed(&lowered);
    let trimmed = unbracketed
        .trim()
        .trim_matches(|c: char| c.is_ascii_digit() || c == '_');
    trimmed
        .chars()
        .map(fold_digit)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Removes `[..]`, `<..>`, `(..)`, and `{..}` decorations, delimiters
/// included. An opener with no closer is kept as a plain character and falls
/// to the non-alphanumeric filter instead.
fn strip_bracketed(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if let Some(closer) = matching_closer(chars[i]) {
            if let Some(end) = chars[i + 1..].iter().position(|&c| c == closer) {
                i += end + 2;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn matching_closer(c: char) -> Option<char> {
    match c {
        '[' => Some(']'),
        '<' => Some('>'),
        '(' => Some(')'),
        '{' => Some('}'),
        _ => None,
    }
}

fn fold_digit(c: char) -> char {
    DIGIT_FOLDS
        .iter()
        .find(|(digit, _)| *digit == c)
        .map(|(_, letter)| *letter)
        .unwrap_or(c)
}

fn similarity(a: &str, b: &str) -> f32 {
    (strsim::normalized_levenshtein(a, b) * 100.0) as f32
}

/// Substring-tolerant ratio: best similarity of the shorter string against
/// every same-length window of the longer one.
fn partial_ratio(a: &str, b: &str) -> f32 {
    let (short, long) = if a.chars().count() <= b.chars().count() { (a, b) } else { (b, a) };
    let short_len = short.chars().count();
    if short_len == 0 {
        return 0.0;
    }

    let long_chars: Vec<char> = long.chars().collect();
    if short_len == long_chars.len() {
        return similarity(short, long);
    }

    let mut best = 0.0_f32;
    for start in 0..=(long_chars.len() - short_len) {
        let window: String = long_chars[start..start + short_len].iter().collect();
        best = best.max(similarity(short, &window));
    }
    best
}

/// Token-order-tolerant ratio: similarity with whitespace tokens sorted.
fn token_sort_ratio(a: &str, b: &str) -> f32 {
    similarity(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Fuzzy score between two normalized names: the better of the substring-
/// tolerant and token-order-tolerant ratios.
pub fn score(a: &str, b: &str) -> f32 {
    partial_ratio(a, b).max(token_sort_ratio(a, b))
}

/// Resolves a candidate name against the registry snapshot.
///
/// Exact canonical matches return score 100 regardless of length. Otherwise
/// short candidates are rejected outright, fuzzy candidates are filtered by
/// length, scored, and the best score at or above the threshold wins. Ties
/// break by the entry whose un-normalized length is closest to the
/// candidate's un-normalized length, then by registry order. The tie-break
/// is a documented heuristic, not a correctness guarantee.
pub fn resolve<'a>(
    candidate: &str,
    entries: &'a [RegistryEntry],
    options: &MatchOptions,
) -> Option<Match<'a>> {
    let normalized = canonical_name(candidate);
    if normalized.is_empty() {
        return None;
    }

    for entry in entries {
        if canonical_name(&entry.canonical_name) == normalized {
            return Some(Match { entry, score: 100.0 });
        }
    }

    let candidate_len = normalized.chars().count();
    if candidate_len < options.min_len {
        log::debug!(
            "candidate {:?} too short for fuzzy matching ({} < {})",
            candidate,
            candidate_len,
            options.min_len
        );
        return None;
    }

    let candidate_raw_len = candidate.chars().count();
    let mut best: Option<(usize, f32)> = None;

    for (index, entry) in entries.iter().enumerate() {
        let entry_normalized = canonical_name(&entry.canonical_name);
        let entry_len = entry_normalized.chars().count();
        if entry_len == 0 {
            continue;
        }
        if candidate_len.abs_diff(entry_len) > MAX_LEN_DELTA {
            continue;
        }
        let ratio =
            candidate_len.min(entry_len) as f32 / candidate_len.max(entry_len) as f32;
        if ratio < MIN_LEN_RATIO {
            continue;
        }

        let entry_score = score(&normalized, &entry_normalized);
        if entry_score < options.score_threshold {
            continue;
        }

        best = match best {
            None => Some((index, entry_score)),
            Some((_, best_score)) if entry_score > best_score => Some((index, entry_score)),
            Some((best_index, best_score)) if entry_score == best_score => {
                let current_delta = entries[best_index]
                    .canonical_name
                    .chars()
                    .count()
                    .abs_diff(candidate_raw_len);
                let new_delta = entry.canonical_name.chars().count().abs_diff(candidate_raw_len);
                if new_delta < current_delta {
                    Some((index, entry_score))
                } else {
                    Some((best_index, best_score))
                }
            }
            keep => keep,
        };
    }

    let (index, matched_score) = best?;
    log::info!(
        "resolved {:?} to {:?} (score {:.1})",
        candidate,
        entries[index].canonical_name,
        matched_score
    );
    Some(Match { entry: &entries[index], score: matched_score })
}
