//! Fuzzy patches.
//!
//! A [`Patch`] is a hunk of diff operations with enough surrounding context
//! to be re-applied to a text that has changed since the patch was made.
//! [`PatchEngine::apply`] never fails outright; it reports per hunk whether
//! the change could be placed.

use std::fmt;

use crate::diff::{
    self, cleanup_efficiency_chars, cleanup_semantic_chars, diff_chars, levenshtein_chars,
    source_chars, target_chars, to_diffs, to_runs, x_index, Diff, DiffOp, DiffOptions, Edits,
};
use crate::matching::{find_chars, MatchConfig};

/// Cost of an empty edit, used when simplifying diffs for patching.
const EDIT_COST: usize = 4;

/// One hunk. Offsets and lengths are in chars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub(crate) runs: Edits,
    pub start1: usize,
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
}

impl Patch {
    /// The diff fragment of this hunk, context included.
    pub fn diffs(&self) -> Vec<Diff> {
        to_diffs(self.runs.clone())
    }
}

/// GNU diff style header followed by one `%`-escaped line per operation.
impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{} +{} @@",
            coords(self.start1, self.length1),
            coords(self.start2, self.length2)
        )?;
        for (op, text) in &self.runs {
            let sign = match op {
                DiffOp::Insert => '+',
                DiffOp::Delete => '-',
                DiffOp::Equal => ' ',
            };
            let text: String = text.iter().collect();
            writeln!(f, "{sign}{}", escape(&text))?;
        }
        Ok(())
    }
}

fn coords(start: usize, length: usize) -> String {
    match length {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, length),
    }
}

/// Percent-encode everything except URI-safe punctuation.
fn escape(text: &str) -> String {
    const SAFE: &str = "!~*'();/?:@&=+$,# -_.";
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || SAFE.contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

/// Render a patch list in its textual form.
pub fn to_text(patches: &[Patch]) -> String {
    patches.iter().map(Patch::to_string).collect()
}

/// Tunables for patch creation and application.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchConfig {
    /// Context chars kept around each hunk.
    pub margin: usize,
    /// When a long hunk matches only approximately, how different the found
    /// text may be (0.0 exact, 1.0 anything).
    pub delete_threshold: f64,
    /// When set, every approximate match (long or short) is rejected if the
    /// found text differs from the hunk's source text by more than this
    /// fraction of its length.
    pub context_threshold: Option<f64>,
    pub matching: MatchConfig,
    pub diff: DiffOptions,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            margin: 4,
            delete_threshold: 0.5,
            context_threshold: None,
            matching: MatchConfig::default(),
            diff: DiffOptions::default(),
        }
    }
}

/// Builds and applies patches.
#[derive(Debug, Clone, Default)]
pub struct PatchEngine {
    pub config: PatchConfig,
}

impl PatchEngine {
    pub fn new(config: PatchConfig) -> Self {
        Self { config }
    }

    /// The same engine, additionally rejecting any approximate match that
    /// drifted more than `threshold` from the hunk's source text.
    pub fn with_context_threshold(&self, threshold: f64) -> Self {
        Self {
            config: PatchConfig {
                context_threshold: Some(threshold),
                ..self.config.clone()
            },
        }
    }

    /// Patches turning `text1` into `text2`.
    pub fn make(&self, text1: &str, text2: &str) -> Vec<Patch> {
        let a: Vec<char> = text1.chars().collect();
        let b: Vec<char> = text2.chars().collect();
        let mut runs = diff_chars(&a, &b, &self.config.diff);
        if runs.len() > 2 {
            cleanup_semantic_chars(&mut runs);
            cleanup_efficiency_chars(&mut runs, EDIT_COST);
        }
        self.make_from_runs(&a, &runs)
    }

    /// Patches from a precomputed diff whose source text is `text1`.
    pub fn make_from_diffs(&self, text1: &str, diffs: &[Diff]) -> Vec<Patch> {
        let text1: Vec<char> = text1.chars().collect();
        self.make_from_runs(&text1, &to_runs(diffs))
    }

    fn make_from_runs(&self, text1: &[char], runs: &[diff::Run<char>]) -> Vec<Patch> {
        let margin = self.config.margin;
        let mut patches = Vec::new();
        let mut patch = Patch::default();
        let mut count1 = 0;
        let mut count2 = 0;
        // Text before and after applying the hunks emitted so far, used for
        // rolling context.
        let mut prepatch = text1.to_vec();
        let mut postpatch = text1.to_vec();

        for (x, (op, text)) in runs.iter().enumerate() {
            if patch.runs.is_empty() && *op != DiffOp::Equal {
                patch.start1 = count1;
                patch.start2 = count2;
            }

            match op {
                DiffOp::Insert => {
                    patch.runs.push((DiffOp::Insert, text.clone()));
                    patch.length2 += text.len();
                    postpatch.splice(count2..count2, text.iter().copied());
                }
                DiffOp::Delete => {
                    patch.length1 += text.len();
                    patch.runs.push((DiffOp::Delete, text.clone()));
                    postpatch.drain(count2..count2 + text.len());
                }
                DiffOp::Equal => {
                    if text.len() <= 2 * margin && !patch.runs.is_empty() && x + 1 != runs.len() {
                        // Small equality inside a hunk.
                        patch.runs.push((DiffOp::Equal, text.clone()));
                        patch.length1 += text.len();
                        patch.length2 += text.len();
                    } else if text.len() >= 2 * margin && !patch.runs.is_empty() {
                        self.add_context(&mut patch, &prepatch);
                        patches.push(std::mem::take(&mut patch));
                        prepatch = postpatch.clone();
                        count1 = count2;
                    }
                }
            }

            if *op != DiffOp::Insert {
                count1 += text.len();
            }
            if *op != DiffOp::Delete {
                count2 += text.len();
            }
        }

        if !patch.runs.is_empty() {
            self.add_context(&mut patch, &prepatch);
            patches.push(patch);
        }
        patches
    }

    /// Grow the context around a hunk until it is unique within `text`, but
    /// never beyond what Bitap can match.
    fn add_context(&self, patch: &mut Patch, text: &[char]) {
        if text.is_empty() {
            return;
        }
        let margin = self.config.margin;
        let limit = self.config.matching.max_bits.saturating_sub(2 * margin);
        let window = |padding: usize| {
            let from = patch.start2.saturating_sub(padding);
            let to = (patch.start2 + patch.length1 + padding).min(text.len());
            &text[from..to.max(from)]
        };

        let mut padding = 0;
        let mut pattern = window(padding);
        while diff::find(text, pattern, 0) != diff::rfind(text, pattern, usize::MAX)
            && pattern.len() < limit
        {
            padding += margin;
            pattern = window(padding);
        }
        // Then one more margin of context on each side.
        padding += margin;

        let prefix_start = patch.start2.saturating_sub(padding);
        let prefix = text[prefix_start..patch.start2.min(text.len())].to_vec();
        let suffix_start = (patch.start2 + patch.length1).min(text.len());
        let suffix_end = (patch.start2 + patch.length1 + padding).min(text.len());
        let suffix = text[suffix_start..suffix_end].to_vec();

        patch.start1 -= prefix.len();
        patch.start2 -= prefix.len();
        patch.length1 += prefix.len() + suffix.len();
        patch.length2 += prefix.len() + suffix.len();
        if !prefix.is_empty() {
            patch.runs.insert(0, (DiffOp::Equal, prefix));
        }
        if !suffix.is_empty() {
            patch.runs.push((DiffOp::Equal, suffix));
        }
    }

    /// Apply `patches` to `text`. Returns the new text and one flag per
    /// hunk (after splitting oversized hunks) telling whether it applied.
    pub fn apply(&self, patches: &[Patch], text: &str) -> (String, Vec<bool>) {
        if patches.is_empty() {
            return (text.to_string(), Vec::new());
        }

        let mut patches = patches.to_vec();
        let padding = self.add_padding(&mut patches);
        let mut text: Vec<char> = padding
            .iter()
            .chain(text.chars().collect::<Vec<_>>().iter())
            .chain(padding.iter())
            .copied()
            .collect();
        let patches = self.split_max(patches);

        let max_bits = self.config.matching.max_bits;
        let exact = DiffOptions::exact().with_timeout(self.config.diff.timeout);
        // Offset between where hunks were expected and where they landed.
        let mut delta: isize = 0;
        let mut results = vec![false; patches.len()];

        for (x, patch) in patches.iter().enumerate() {
            let expected = (patch.start2 as isize + delta).max(0) as usize;
            let text1 = source_chars(&patch.runs);
            let mut end_loc = None;
            let start_loc = if text1.len() > max_bits {
                // Too long for Bitap: match head and tail separately.
                let head = find_chars(&text, &text1[..max_bits], expected, &self.config.matching);
                head.and_then(|start| {
                    let tail = &text1[text1.len() - max_bits..];
                    let tail_expected = expected + text1.len() - max_bits;
                    match find_chars(&text, tail, tail_expected, &self.config.matching) {
                        Some(end) if start < end => {
                            end_loc = Some(end);
                            Some(start)
                        }
                        _ => None,
                    }
                })
            } else {
                find_chars(&text, &text1, expected, &self.config.matching)
            };

            let Some(start) = start_loc else {
                // Subtract the delta for this failed hunk from later ones.
                delta -= patch.length2 as isize - patch.length1 as isize;
                continue;
            };

            results[x] = true;
            delta = start as isize - expected as isize;
            let found_end = match end_loc {
                Some(end) => (end + max_bits).min(text.len()),
                None => (start + text1.len()).min(text.len()),
            };
            let text2 = text[start..found_end].to_vec();

            if text1 == text2 {
                text.splice(start..start + text1.len(), target_chars(&patch.runs));
                continue;
            }

            // Imperfect match: diff to get a mapping of equivalent offsets.
            let mut mapping = diff_chars(&text1, &text2, &exact);
            let drift = levenshtein_chars(&mapping) as f64 / text1.len() as f64;
            // Long hunks: end points match but the content is unacceptably
            // different.
            let long_mismatch = text1.len() > max_bits && drift > self.config.delete_threshold;
            let drifted = self.config.context_threshold.is_some_and(|limit| drift > limit);
            if long_mismatch || drifted {
                results[x] = false;
                continue;
            }
            cleanup_semantic_chars(&mut mapping);

            let mut index1 = 0;
            for (op, fragment) in &patch.runs {
                if *op != DiffOp::Equal {
                    let index2 = x_index(&mapping, index1);
                    match op {
                        DiffOp::Insert => {
                            let at = (start + index2).min(text.len());
                            text.splice(at..at, fragment.iter().copied());
                        }
                        DiffOp::Delete => {
                            let from = (start + index2).min(text.len());
                            let to = (start + x_index(&mapping, index1 + fragment.len()))
                                .min(text.len())
                                .max(from);
                            text.drain(from..to);
                        }
                        DiffOp::Equal => {}
                    }
                }
                if *op != DiffOp::Delete {
                    index1 += fragment.len();
                }
            }
        }

        let pad = padding.len();
        let body = if text.len() >= 2 * pad {
            &text[pad..text.len() - pad]
        } else {
            &text[..]
        };
        (body.iter().collect(), results)
    }

    /// Surround the first and last hunk with sentinel context so edits at
    /// the very edges of the text can still be matched.
    fn add_padding(&self, patches: &mut [Patch]) -> Vec<char> {
        let pad_len = self.config.margin;
        let padding: Vec<char> = (1..=pad_len as u32).filter_map(char::from_u32).collect();

        for patch in patches.iter_mut() {
            patch.start1 += pad_len;
            patch.start2 += pad_len;
        }

        if let Some(first) = patches.first_mut() {
            match first.runs.first_mut() {
                Some((DiffOp::Equal, text)) if text.len() >= pad_len => {}
                Some((DiffOp::Equal, text)) => {
                    let extra = pad_len - text.len();
                    let mut grown = padding[text.len()..].to_vec();
                    grown.append(text);
                    *text = grown;
                    first.start1 -= extra;
                    first.start2 -= extra;
                    first.length1 += extra;
                    first.length2 += extra;
                }
                _ => {
                    first.runs.insert(0, (DiffOp::Equal, padding.clone()));
                    first.start1 -= pad_len;
                    first.start2 -= pad_len;
                    first.length1 += pad_len;
                    first.length2 += pad_len;
                }
            }
        }

        if let Some(last) = patches.last_mut() {
            match last.runs.last_mut() {
                Some((DiffOp::Equal, text)) if text.len() >= pad_len => {}
                Some((DiffOp::Equal, text)) => {
                    let extra = pad_len - text.len();
                    text.extend_from_slice(&padding[..extra]);
                    last.length1 += extra;
                    last.length2 += extra;
                }
                _ => {
                    last.runs.push((DiffOp::Equal, padding.clone()));
                    last.length1 += pad_len;
                    last.length2 += pad_len;
                }
            }
        }

        padding
    }

    /// Break up hunks whose source text is longer than Bitap can match.
    pub fn split_max(&self, patches: Vec<Patch>) -> Vec<Patch> {
        let patch_size = self.config.matching.max_bits;
        let margin = self.config.margin;
        if patch_size == 0 {
            return patches;
        }

        let mut out = Vec::with_capacity(patches.len());
        for big in patches {
            if big.length1 <= patch_size {
                out.push(big);
                continue;
            }

            let mut start1 = big.start1;
            let mut start2 = big.start2;
            let mut remaining = big.runs;
            let mut precontext: Vec<char> = Vec::new();

            while !remaining.is_empty() {
                let mut patch = Patch {
                    start1: start1 - precontext.len(),
                    start2: start2 - precontext.len(),
                    ..Patch::default()
                };
                let mut empty = true;
                if !precontext.is_empty() {
                    patch.length1 = precontext.len();
                    patch.length2 = precontext.len();
                    patch.runs.push((DiffOp::Equal, precontext.clone()));
                }

                while !remaining.is_empty() && patch.length1 < patch_size.saturating_sub(margin) {
                    let (op, text) = &remaining[0];
                    let op = *op;
                    if op == DiffOp::Insert {
                        patch.length2 += text.len();
                        start2 += text.len();
                        patch.runs.push(remaining.remove(0));
                        empty = false;
                    } else if op == DiffOp::Delete
                        && patch.runs.len() == 1
                        && patch.runs[0].0 == DiffOp::Equal
                        && text.len() > 2 * patch_size
                    {
                        // A large deletion passes in one chunk.
                        patch.length1 += text.len();
                        start1 += text.len();
                        empty = false;
                        patch.runs.push(remaining.remove(0));
                    } else {
                        // Deletion or equality: take only what fits.
                        let take = text.len().min(patch_size - patch.length1 - margin);
                        let chunk = text[..take].to_vec();
                        patch.length1 += take;
                        start1 += take;
                        if op == DiffOp::Equal {
                            patch.length2 += take;
                            start2 += take;
                        } else {
                            empty = false;
                        }
                        patch.runs.push((op, chunk));
                        if take == remaining[0].1.len() {
                            remaining.remove(0);
                        } else {
                            remaining[0].1.drain(..take);
                        }
                    }
                }

                // Head context for the next hunk.
                let emitted = target_chars(&patch.runs);
                precontext = emitted[emitted.len().saturating_sub(margin)..].to_vec();

                // Tail context for this hunk.
                let following = source_chars(&remaining);
                let postcontext = following[..margin.min(following.len())].to_vec();
                if !postcontext.is_empty() {
                    patch.length1 += postcontext.len();
                    patch.length2 += postcontext.len();
                    match patch.runs.last_mut() {
                        Some((DiffOp::Equal, text)) => text.extend(postcontext),
                        _ => patch.runs.push((DiffOp::Equal, postcontext)),
                    }
                }

                if !empty {
                    out.push(patch);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{splice, PageText};

    const QUICK: &str = "The quick brown fox jumps over the lazy dog.";
    const THAT: &str = "That quick brown fox jumped over a lazy dog.";

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    // -- text form -----------------------------------------------------------

    #[test]
    fn display_renders_header_and_escaped_lines() {
        let patch = Patch {
            runs: vec![
                (DiffOp::Equal, chars("jump")),
                (DiffOp::Delete, chars("s")),
                (DiffOp::Insert, chars("ed")),
                (DiffOp::Equal, chars(" over ")),
                (DiffOp::Delete, chars("the")),
                (DiffOp::Insert, chars("a")),
                (DiffOp::Equal, chars("\nlaz")),
            ],
            start1: 20,
            start2: 21,
            length1: 18,
            length2: 17,
        };
        assert_eq!(
            patch.to_string(),
            "@@ -21,18 +22,17 @@\n jump\n-s\n+ed\n  over \n-the\n+a\n %0Alaz\n"
        );
    }

    #[test]
    fn coords_handle_empty_and_single_lengths() {
        assert_eq!(coords(0, 0), "0,0");
        assert_eq!(coords(4, 1), "5");
        assert_eq!(coords(4, 3), "5,3");
    }

    // -- make ----------------------------------------------------------------

    #[test]
    fn make_identical_texts_yields_no_patches() {
        let engine = PatchEngine::default();
        assert!(engine.make("abc", "abc").is_empty());
        assert!(engine.make("", "").is_empty());
    }

    #[test]
    fn make_adds_context_around_hunk() {
        let engine = PatchEngine::default();
        let patches = engine.make(QUICK, THAT);
        assert_eq!(patches.len(), 2);
        let first = &patches[0];
        assert_eq!(first.start1, 0);
        assert_eq!(
            first.diffs()[0],
            Diff::equal("Th"),
            "hunk at text start has only trailing context"
        );
    }

    #[test]
    fn make_from_diffs_matches_make() {
        let engine = PatchEngine::default();
        let mut diffs = diff::diff(QUICK, THAT, &DiffOptions::default());
        diff::cleanup_semantic(&mut diffs);
        diff::cleanup_efficiency(&mut diffs, EDIT_COST);
        assert_eq!(
            to_text(&engine.make_from_diffs(QUICK, &diffs)),
            to_text(&engine.make(QUICK, THAT))
        );
    }

    #[test]
    fn add_context_widens_until_unique() {
        let engine = PatchEngine::default();
        let text = chars("The quick brown fox jumps over the lazy dog.");
        let mut patch = Patch {
            runs: vec![(DiffOp::Delete, chars("brown"))],
            start1: 10,
            start2: 10,
            length1: 5,
            length2: 0,
        };
        engine.add_context(&mut patch, &text);
        assert_eq!(
            patch.to_string(),
            "@@ -7,13 +7,8 @@\n ick \n-brown\n  fox\n"
        );
    }

    // -- apply ---------------------------------------------------------------

    #[test]
    fn apply_round_trip() {
        let engine = PatchEngine::default();
        let patches = engine.make(QUICK, THAT);
        let (text, results) = engine.apply(&patches, QUICK);
        assert_eq!(text, THAT);
        assert!(results.iter().all(|&ok| ok));
    }

    #[test]
    fn apply_empty_patch_list_is_identity() {
        let engine = PatchEngine::default();
        let (text, results) = engine.apply(&[], "Hello world.");
        assert_eq!(text, "Hello world.");
        assert!(results.is_empty());
    }

    #[test]
    fn apply_to_drifted_text() {
        let engine = PatchEngine::default();
        let patches = engine.make(QUICK, THAT);
        let (text, results) = engine.apply(&patches, "The quick red rabbit jumps over the tired tiger.");
        assert_eq!(text, "That quick red rabbit jumped over a tired tiger.");
        assert_eq!(results, vec![true, true]);
    }

    #[test]
    fn context_threshold_rejects_drifted_hunks() {
        let engine = PatchEngine::default().with_context_threshold(0.0);
        let patches = engine.make(QUICK, THAT);
        let (_, results) = engine.apply(&patches, "The quick red rabbit jumps over the tired tiger.");
        assert_eq!(results.len(), 2);
        assert!(results.contains(&false));

        // Exact matches are unaffected.
        let (text, results) = engine.apply(&patches, QUICK);
        assert_eq!(text, THAT);
        assert!(results.iter().all(|&ok| ok));
    }

    #[test]
    fn apply_reports_failed_hunks_and_leaves_text() {
        let engine = PatchEngine::default();
        let patches = engine.make(QUICK, THAT);
        let original = "I am the very model of a modern major general.";
        let (text, results) = engine.apply(&patches, original);
        assert_eq!(text, original);
        assert_eq!(results, vec![false, false]);
    }

    #[test]
    fn apply_edits_at_text_edges() {
        let engine = PatchEngine::default();
        let patches = engine.make("", "test");
        let (text, results) = engine.apply(&patches, "");
        assert_eq!(text, "test");
        assert_eq!(results, vec![true]);

        let patches = engine.make("XY", "XtestY");
        let (text, _) = engine.apply(&patches, "XY");
        assert_eq!(text, "XtestY");

        let patches = engine.make("y", "y123");
        let (text, _) = engine.apply(&patches, "x");
        assert_eq!(text, "x123");
    }

    #[test]
    fn apply_does_not_mutate_input_patches() {
        let engine = PatchEngine::default();
        let patches = engine.make(QUICK, THAT);
        let before = to_text(&patches);
        let _ = engine.apply(&patches, QUICK);
        assert_eq!(to_text(&patches), before);
    }

    #[test]
    fn apply_long_hunk_round_trip() {
        let engine = PatchEngine::default();
        let a = "1234567890".repeat(10);
        let b = format!("{}abcdefghij{}", &a[..40], &a[60..]);
        let patches = engine.make(&a, &b);
        let (text, results) = engine.apply(&patches, &a);
        assert_eq!(text, b);
        assert!(results.iter().all(|&ok| ok));
    }

    #[test]
    fn apply_multiline_round_trip() {
        let engine = PatchEngine::default();
        let a = "# Title\n\nFirst paragraph of the page.\n\nSecond paragraph.\n".repeat(5);
        let b = a.replace("Second", "Another").replace("Title", "Heading");
        let patches = engine.make(&a, &b);
        let (text, results) = engine.apply(&patches, &a);
        assert_eq!(text, b);
        assert!(results.iter().all(|&ok| ok));
    }

    // -- properties ----------------------------------------------------------

    fn round_trips(a: &str, b: &str) -> bool {
        let engine = PatchEngine::default();
        let patches = engine.make(a, b);
        let (text, results) = engine.apply(&patches, a);
        text == b && results.iter().all(|&ok| ok)
    }

    quickcheck::quickcheck! {
        fn apply_round_trips_any_texts(a: PageText, b: PageText) -> bool {
            round_trips(&a.0, &b.0)
        }

        fn apply_round_trips_local_edits(
            a: PageText,
            insert: PageText,
            start: usize,
            len: usize
        ) -> bool {
            let start = start % (a.0.chars().count() + 1);
            let b = splice(&a.0, start, start + len % 8, &insert.0);
            round_trips(&a.0, &b)
        }

        fn apply_unchanged_text_is_identity(a: PageText) -> bool {
            round_trips(&a.0, &a.0)
        }
    }

    // -- split ---------------------------------------------------------------

    #[test]
    fn split_max_keeps_hunks_within_bitap_limit() {
        let engine = PatchEngine::default();
        let patches = engine.make(
            "abcdefghijklmnopqrstuvwxyz01234567890",
            "XabXcdXefXghXijXklXmnXopXqrXstXuvXwxXyzX01X23X45X67X89X0",
        );
        let split = engine.split_max(patches);
        assert!(split.len() > 1);
        assert!(split.iter().all(|p| p.length1 <= 32));
    }
}
