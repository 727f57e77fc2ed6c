//! Approximate string location (Bitap).
//!
//! Used by the patch engine to find where a hunk's source text now lives in
//! a document that has drifted since the patch was made.

use std::collections::HashMap;

use crate::diff::{find as find_exact, rfind as rfind_exact};

/// Tunables for fuzzy matching.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// 0.0 accepts only perfect matches, 1.0 accepts anything.
    pub threshold: f64,
    /// How far (in chars) a match may stray from the expected location
    /// before it is rejected. Each `distance` chars away costs as much as a
    /// fully wrong pattern. 0 requires the exact location.
    pub distance: usize,
    /// Longest pattern Bitap can handle (bits in the state word).
    pub max_bits: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            distance: 1000,
            max_bits: 32,
        }
    }
}

/// Locate the best instance of `pattern` in `text` near `loc`.
///
/// Offsets are char indices. Returns `None` when nothing scores within the
/// threshold or the pattern is longer than `max_bits`.
pub fn find(text: &str, pattern: &str, loc: usize, config: &MatchConfig) -> Option<usize> {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    find_chars(&text, &pattern, loc, config)
}

pub(crate) fn find_chars(
    text: &[char],
    pattern: &[char],
    loc: usize,
    config: &MatchConfig,
) -> Option<usize> {
    let loc = loc.min(text.len());
    if text == pattern {
        return Some(0);
    }
    if text.is_empty() {
        return None;
    }
    if loc + pattern.len() <= text.len() && text[loc..loc + pattern.len()] == *pattern {
        return Some(loc);
    }
    bitap(text, pattern, loc, config)
}

fn bitap(text: &[char], pattern: &[char], loc: usize, config: &MatchConfig) -> Option<usize> {
    let max_bits = config.max_bits.min(u64::BITS as usize);
    if pattern.is_empty() || pattern.len() > max_bits {
        return None;
    }

    let alphabet = alphabet(pattern);
    let score = |errors: usize, x: usize| -> f64 {
        let accuracy = errors as f64 / pattern.len() as f64;
        let proximity = loc.abs_diff(x);
        if config.distance == 0 {
            return if proximity == 0 { accuracy } else { 1.0 };
        }
        accuracy + proximity as f64 / config.distance as f64
    };

    let mut score_threshold = config.threshold;

    // A nearby exact match tightens the threshold for free.
    if let Some(exact) = find_exact(text, pattern, loc) {
        score_threshold = score(0, exact).min(score_threshold);
        if let Some(exact) = rfind_exact(text, pattern, loc) {
            score_threshold = score(0, exact).min(score_threshold);
        }
    }

    let match_mask: u64 = 1 << (pattern.len() - 1);
    let mut best_loc = None;
    let mut bin_max = pattern.len() + text.len();
    let mut last_rd: Vec<u64> = Vec::new();

    for d in 0..pattern.len() {
        // Binary search for how far from `loc` we can stray at this error
        // level.
        let mut bin_min = 0;
        let mut bin_mid = bin_max;
        while bin_min < bin_mid {
            if score(d, loc + bin_mid) <= score_threshold {
                bin_min = bin_mid;
            } else {
                bin_max = bin_mid;
            }
            bin_mid = (bin_max - bin_min) / 2 + bin_min;
        }
        bin_max = bin_mid;

        let mut start = (loc as isize - bin_mid as isize + 1).max(1) as usize;
        let finish = (loc + bin_mid).min(text.len()) + pattern.len();

        let mut rd = vec![0u64; finish + 2];
        rd[finish + 1] = (1u64 << d) - 1;
        let mut j = finish;
        while j >= start {
            let char_match = text
                .get(j - 1)
                .and_then(|c| alphabet.get(c))
                .copied()
                .unwrap_or(0);
            rd[j] = if d == 0 {
                ((rd[j + 1] << 1) | 1) & char_match
            } else {
                let prev = |i: usize| last_rd.get(i).copied().unwrap_or(0);
                (((rd[j + 1] << 1) | 1) & char_match)
                    | (((prev(j + 1) | prev(j)) << 1) | 1)
                    | prev(j + 1)
            };
            if rd[j] & match_mask != 0 {
                let candidate = score(d, j - 1);
                if candidate <= score_threshold {
                    score_threshold = candidate;
                    best_loc = Some(j - 1);
                    if j - 1 > loc {
                        // Keep looking left of `loc`, no further than the
                        // mirror image of this hit.
                        start = (2 * loc as isize - (j - 1) as isize).max(1) as usize;
                    } else {
                        // Already passed `loc`; it only gets worse from here.
                        break;
                    }
                }
            }
            j -= 1;
        }

        // No hope for a better match at higher error levels.
        if score(d + 1, loc) > score_threshold {
            break;
        }
        last_rd = rd;
    }

    best_loc
}

/// Bitmask of positions for every char in the pattern.
fn alphabet(pattern: &[char]) -> HashMap<char, u64> {
    let mut masks = HashMap::new();
    for (i, &c) in pattern.iter().enumerate() {
        *masks.entry(c).or_insert(0u64) |= 1 << (pattern.len() - i - 1);
    }
    masks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near(distance: usize) -> MatchConfig {
        MatchConfig {
            distance,
            ..MatchConfig::default()
        }
    }

    #[test]
    fn alphabet_marks_positions() {
        let pattern: Vec<char> = "abc".chars().collect();
        let masks = alphabet(&pattern);
        assert_eq!(masks[&'a'], 4);
        assert_eq!(masks[&'b'], 2);
        assert_eq!(masks[&'c'], 1);

        let pattern: Vec<char> = "abcaba".chars().collect();
        let masks = alphabet(&pattern);
        assert_eq!(masks[&'a'], 37);
        assert_eq!(masks[&'b'], 18);
        assert_eq!(masks[&'c'], 8);
    }

    #[test]
    fn exact_match_at_expected_location() {
        assert_eq!(find("abcdef", "de", 3, &MatchConfig::default()), Some(3));
        assert_eq!(find("abcdef", "abcdef", 1000, &MatchConfig::default()), Some(0));
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(find("", "abcdef", 1, &MatchConfig::default()), None);
        assert_eq!(find("abcdef", "", 3, &MatchConfig::default()), Some(3));
        assert_eq!(find("abcdef", "", 99, &MatchConfig::default()), Some(6));
    }

    #[test]
    fn fuzzy_match_beyond_end() {
        assert_eq!(find("abcdef", "defy", 4, &MatchConfig::default()), Some(3));
        assert_eq!(find("abcdef", "abcdefy", 0, &MatchConfig::default()), Some(0));
    }

    #[test]
    fn bitap_exact_matches() {
        let config = near(100);
        assert_eq!(find("abcdefghijk", "fgh", 5, &config), Some(5));
        assert_eq!(find("abcdefghijk", "fgh", 0, &config), Some(5));
    }

    #[test]
    fn bitap_fuzzy_matches() {
        let config = near(100);
        assert_eq!(find("abcdefghijk", "efxhi", 0, &config), Some(4));
        assert_eq!(find("abcdefghijk", "cdefxyhijk", 5, &config), Some(2));
        assert_eq!(find("abcdefghijk", "bxy", 1, &config), None);
    }

    #[test]
    fn bitap_overflow_pattern() {
        let config = near(100);
        assert_eq!(find("123456789xx0", "3456789x0", 2, &config), Some(2));
    }

    #[test]
    fn threshold_controls_acceptance() {
        let mut config = near(100);
        config.threshold = 0.4;
        assert_eq!(find("abcdefghijk", "efxyhi", 1, &config), Some(4));
        config.threshold = 0.3;
        assert_eq!(find("abcdefghijk", "efxyhi", 1, &config), None);
        config.threshold = 0.0;
        assert_eq!(find("abcdefghijk", "bcdef", 1, &config), Some(1));
    }

    #[test]
    fn distance_penalises_far_matches() {
        let mut config = near(10);
        assert_eq!(find("abcdefghijklmnopqrstuvwxyz", "abcdefg", 24, &config), None);
        assert_eq!(find("abcdefghijklmnopqrstuvwxyz", "abcdxxefg", 1, &config), Some(0));
        config.distance = 1000;
        assert_eq!(find("abcdefghijklmnopqrstuvwxyz", "abcdefg", 24, &config), Some(0));
    }

    #[test]
    fn pattern_longer_than_max_bits_is_rejected() {
        let text = "x".repeat(100);
        let pattern = "y".repeat(40);
        assert_eq!(find(&text, &pattern, 0, &MatchConfig::default()), None);
    }
}
