//! Text diff engine.
//!
//! Computes an ordered list of [`Diff`] operations (equal / insert / delete)
//! that turns one text into another, using Myers' O(ND) middle-snake
//! bisection with a handful of speedups borrowed from practical diff tools:
//! common affix trimming, containment shortcuts, the half-match heuristic,
//! and a line-level pre-pass for large inputs.
//!
//! All offsets are counted in `char`s, never bytes.
//!
//! # Bounded effort
//!
//! [`DiffOptions::timeout`] caps how long bisection may run. When the deadline
//! passes, the region still being bisected is emitted as a single delete plus
//! a single insert. The result is always a *valid* diff (it reconstructs both
//! inputs exactly) but may no longer be minimal. Pass `timeout: None` for an
//! exact diff with unbounded running time.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The kind of a single diff operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffOp {
    Delete,
    Equal,
    Insert,
}

impl DiffOp {
    /// String representation for display, logging, and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Equal => "equal",
            Self::Insert => "insert",
        }
    }
}

impl std::fmt::Display for DiffOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operation of a diff together with the text it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub op: DiffOp,
    pub text: String,
}

impl Diff {
    pub fn new(op: DiffOp, text: impl Into<String>) -> Self {
        Self {
            op,
            text: text.into(),
        }
    }

    pub fn equal(text: impl Into<String>) -> Self {
        Self::new(DiffOp::Equal, text)
    }

    pub fn insert(text: impl Into<String>) -> Self {
        Self::new(DiffOp::Insert, text)
    }

    pub fn delete(text: impl Into<String>) -> Self {
        Self::new(DiffOp::Delete, text)
    }
}

/// Default bisection budget.
pub const DEFAULT_DIFF_TIMEOUT: Duration = Duration::from_secs(1);

/// Both texts must be longer than this (in chars) before line mode kicks in.
pub const DEFAULT_LINE_MODE_THRESHOLD: usize = 100;

/// Tunables for [`diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    /// Wall-clock budget for bisection. `None` computes an exact diff with
    /// no time bound and disables the half-match heuristic (which can
    /// produce non-minimal diffs).
    pub timeout: Option<Duration>,
    /// Diff line-by-line first, then refine changed regions char-by-char.
    pub line_mode: bool,
    /// Minimum length of both inputs before line mode is used.
    pub line_mode_threshold: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_DIFF_TIMEOUT),
            line_mode: true,
            line_mode_threshold: DEFAULT_LINE_MODE_THRESHOLD,
        }
    }
}

impl DiffOptions {
    /// Exact, character-level diffing with no deadline.
    pub fn exact() -> Self {
        Self {
            timeout: None,
            line_mode: false,
            line_mode_threshold: DEFAULT_LINE_MODE_THRESHOLD,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Compute the diff that transforms `a` into `b`.
///
/// Deterministic for identical inputs and options (up to the deadline).
pub fn diff(a: &str, b: &str, options: &DiffOptions) -> Vec<Diff> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    to_diffs(diff_chars(&a, &b, options))
}

/// Reduce the number of edits by eliminating semantically trivial equalities,
/// then align edit boundaries with word and line breaks.
pub fn cleanup_semantic(diffs: &mut Vec<Diff>) {
    let mut runs = to_runs(diffs);
    cleanup_semantic_chars(&mut runs);
    *diffs = to_diffs(runs);
}

/// Reduce the number of edits by eliminating operationally trivial
/// equalities. `edit_cost` is the cost of an empty edit in chars.
pub fn cleanup_efficiency(diffs: &mut Vec<Diff>, edit_cost: usize) {
    let mut runs = to_runs(diffs);
    cleanup_efficiency_chars(&mut runs, edit_cost);
    *diffs = to_diffs(runs);
}

/// Normalise a diff: merge adjacent runs of the same kind, factor common
/// affixes out of replacement pairs, and slide single edits sideways to
/// remove redundant equalities.
pub fn cleanup_merge(diffs: &mut Vec<Diff>) {
    let mut runs = to_runs(diffs);
    merge_runs(&mut runs);
    *diffs = to_diffs(runs);
}

/// Reassemble the source text (equal + delete runs).
pub fn source_text(diffs: &[Diff]) -> String {
    diffs
        .iter()
        .filter(|d| d.op != DiffOp::Insert)
        .map(|d| d.text.as_str())
        .collect()
}

/// Reassemble the target text (equal + insert runs).
pub fn target_text(diffs: &[Diff]) -> String {
    diffs
        .iter()
        .filter(|d| d.op != DiffOp::Delete)
        .map(|d| d.text.as_str())
        .collect()
}

/// Levenshtein distance implied by a diff (inserted, deleted or substituted
/// chars).
pub fn levenshtein(diffs: &[Diff]) -> usize {
    levenshtein_chars(&to_runs(diffs))
}

// ---------------------------------------------------------------------------
// Crate-internal char representation
// ---------------------------------------------------------------------------

/// A diff operation over an arbitrary token type.
pub(crate) type Run<T> = (DiffOp, Vec<T>);

/// Char-level diff used by the patch engine.
pub(crate) type Edits = Vec<Run<char>>;

pub(crate) fn to_runs(diffs: &[Diff]) -> Edits {
    diffs
        .iter()
        .map(|d| (d.op, d.text.chars().collect()))
        .collect()
}

pub(crate) fn to_diffs(runs: Edits) -> Vec<Diff> {
    runs.into_iter()
        .map(|(op, text)| Diff {
            op,
            text: text.into_iter().collect(),
        })
        .collect()
}

pub(crate) fn diff_chars(a: &[char], b: &[char], options: &DiffOptions) -> Edits {
    let differ = Differ {
        deadline: options.timeout.and_then(|t| Instant::now().checked_add(t)),
        line_mode_threshold: options.line_mode_threshold,
    };
    differ.main(a, b, options.line_mode)
}

pub(crate) fn source_chars(runs: &[Run<char>]) -> Vec<char> {
    runs.iter()
        .filter(|(op, _)| *op != DiffOp::Insert)
        .flat_map(|(_, t)| t.iter().copied())
        .collect()
}

pub(crate) fn target_chars(runs: &[Run<char>]) -> Vec<char> {
    runs.iter()
        .filter(|(op, _)| *op != DiffOp::Delete)
        .flat_map(|(_, t)| t.iter().copied())
        .collect()
}

pub(crate) fn levenshtein_chars(runs: &[Run<char>]) -> usize {
    let mut total = 0;
    let mut insertions = 0;
    let mut deletions = 0;
    for (op, text) in runs {
        match op {
            DiffOp::Insert => insertions += text.len(),
            DiffOp::Delete => deletions += text.len(),
            DiffOp::Equal => {
                total += insertions.max(deletions);
                insertions = 0;
                deletions = 0;
            }
        }
    }
    total + insertions.max(deletions)
}

/// Map a char offset in the source text to the equivalent offset in the
/// target text.
pub(crate) fn x_index(runs: &[Run<char>], loc: usize) -> usize {
    let mut chars1 = 0;
    let mut chars2 = 0;
    let mut last_chars1 = 0;
    let mut last_chars2 = 0;
    let mut hit: Option<&Run<char>> = None;
    for run in runs {
        let (op, text) = run;
        if *op != DiffOp::Insert {
            chars1 += text.len();
        }
        if *op != DiffOp::Delete {
            chars2 += text.len();
        }
        if chars1 > loc {
            hit = Some(run);
            break;
        }
        last_chars1 = chars1;
        last_chars2 = chars2;
    }
    if let Some((DiffOp::Delete, _)) = hit {
        // The location was deleted.
        return last_chars2;
    }
    last_chars2 + (loc - last_chars1)
}

// ---------------------------------------------------------------------------
// Core algorithm
// ---------------------------------------------------------------------------

/// Token types the differ can work on. Chars get a line-level pre-pass;
/// line ids are diffed directly.
trait Token: Eq + Clone + Hash {
    fn line_mode(_differ: &Differ, _a: &[Self], _b: &[Self]) -> Option<Vec<Run<Self>>> {
        None
    }
}

impl Token for char {
    fn line_mode(differ: &Differ, a: &[char], b: &[char]) -> Option<Edits> {
        Some(differ.line_mode_diff(a, b))
    }
}

impl Token for usize {}

struct Differ {
    deadline: Option<Instant>,
    line_mode_threshold: usize,
}

impl Differ {
    fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() > d)
    }

    fn main<T: Token>(&self, a: &[T], b: &[T], line_mode: bool) -> Vec<Run<T>> {
        if a == b {
            return if a.is_empty() {
                Vec::new()
            } else {
                vec![(DiffOp::Equal, a.to_vec())]
            };
        }

        let prefix = common_prefix(a, b);
        let (a_rest, b_rest) = (&a[prefix..], &b[prefix..]);
        let suffix = common_suffix(a_rest, b_rest);
        let a_mid = &a_rest[..a_rest.len() - suffix];
        let b_mid = &b_rest[..b_rest.len() - suffix];

        let mut runs = self.compute(a_mid, b_mid, line_mode);
        if prefix > 0 {
            runs.insert(0, (DiffOp::Equal, a[..prefix].to_vec()));
        }
        if suffix > 0 {
            runs.push((DiffOp::Equal, a_rest[a_rest.len() - suffix..].to_vec()));
        }
        merge_runs(&mut runs);
        runs
    }

    /// Diff two texts that share no common prefix or suffix.
    fn compute<T: Token>(&self, a: &[T], b: &[T], line_mode: bool) -> Vec<Run<T>> {
        if a.is_empty() {
            return vec![(DiffOp::Insert, b.to_vec())];
        }
        if b.is_empty() {
            return vec![(DiffOp::Delete, a.to_vec())];
        }

        let a_longer = a.len() > b.len();
        let (long, short) = if a_longer { (a, b) } else { (b, a) };

        if let Some(i) = find(long, short, 0) {
            // The shorter text sits inside the longer one.
            let op = if a_longer {
                DiffOp::Delete
            } else {
                DiffOp::Insert
            };
            let runs = vec![
                (op, long[..i].to_vec()),
                (DiffOp::Equal, short.to_vec()),
                (op, long[i + short.len()..].to_vec()),
            ];
            return runs.into_iter().filter(|(_, t)| !t.is_empty()).collect();
        }

        if short.len() == 1 {
            // After the containment check a single token cannot be equal.
            return vec![(DiffOp::Delete, a.to_vec()), (DiffOp::Insert, b.to_vec())];
        }

        if self.deadline.is_some() {
            if let Some(hm) = half_match(a, b) {
                let mut runs = self.main(&hm.a_head, &hm.b_head, line_mode);
                runs.push((DiffOp::Equal, hm.common));
                runs.extend(self.main(&hm.a_tail, &hm.b_tail, line_mode));
                return runs;
            }
        }

        if line_mode && a.len() > self.line_mode_threshold && b.len() > self.line_mode_threshold {
            if let Some(runs) = T::line_mode(self, a, b) {
                return runs;
            }
        }

        self.bisect(a, b)
    }

    /// Quick line-level diff, then re-diff the replaced blocks char-wise.
    fn line_mode_diff(&self, a: &[char], b: &[char]) -> Edits {
        let (ids_a, ids_b, lines) = lines_to_ids(a, b);
        let line_runs = self.main(&ids_a, &ids_b, false);

        let mut runs: Edits = line_runs
            .into_iter()
            .map(|(op, ids)| {
                let text = ids.iter().flat_map(|&id| lines[id].iter().copied());
                (op, text.collect())
            })
            .collect();
        cleanup_semantic_chars(&mut runs);

        let mut out: Edits = Vec::with_capacity(runs.len());
        let mut deleted: Vec<char> = Vec::new();
        let mut inserted: Vec<char> = Vec::new();
        for (op, text) in runs {
            match op {
                DiffOp::Insert => inserted.extend(text),
                DiffOp::Delete => deleted.extend(text),
                DiffOp::Equal => {
                    self.flush_replacement(&mut out, &mut deleted, &mut inserted);
                    out.push((DiffOp::Equal, text));
                }
            }
        }
        self.flush_replacement(&mut out, &mut deleted, &mut inserted);
        out
    }

    fn flush_replacement(&self, out: &mut Edits, deleted: &mut Vec<char>, inserted: &mut Vec<char>) {
        if !deleted.is_empty() && !inserted.is_empty() {
            out.extend(self.main(deleted, inserted, false));
        } else if !deleted.is_empty() {
            out.push((DiffOp::Delete, std::mem::take(deleted)));
        } else if !inserted.is_empty() {
            out.push((DiffOp::Insert, std::mem::take(inserted)));
        }
        deleted.clear();
        inserted.clear();
    }

    /// Find the middle snake of a diff, split the problem in two and
    /// recurse. Falls back to delete-all/insert-all once the deadline passes.
    fn bisect<T: Token>(&self, a: &[T], b: &[T]) -> Vec<Run<T>> {
        let n = a.len() as isize;
        let m = b.len() as isize;
        let max_d = (n + m + 1) / 2;
        let v_offset = max_d;
        let v_length = 2 * max_d + 2;
        let mut v1 = vec![-1isize; v_length as usize];
        let mut v2 = vec![-1isize; v_length as usize];
        v1[(v_offset + 1) as usize] = 0;
        v2[(v_offset + 1) as usize] = 0;
        let delta = n - m;
        // Odd delta: the forward path collides with the reverse path.
        let front = delta % 2 != 0;
        let (mut k1_start, mut k1_end, mut k2_start, mut k2_end) = (0isize, 0isize, 0isize, 0isize);

        for d in 0..max_d {
            if self.expired() {
                break;
            }

            // Walk the front path one step.
            let mut k1 = -d + k1_start;
            while k1 <= d - k1_end {
                let k1_offset = (v_offset + k1) as usize;
                let mut x1 = if k1 == -d || (k1 != d && v1[k1_offset - 1] < v1[k1_offset + 1]) {
                    v1[k1_offset + 1]
                } else {
                    v1[k1_offset - 1] + 1
                };
                let mut y1 = x1 - k1;
                while x1 < n && y1 < m && a[x1 as usize] == b[y1 as usize] {
                    x1 += 1;
                    y1 += 1;
                }
                v1[k1_offset] = x1;
                if x1 > n {
                    // Ran off the right of the graph.
                    k1_end += 2;
                } else if y1 > m {
                    // Ran off the bottom of the graph.
                    k1_start += 2;
                } else if front {
                    let k2_offset = v_offset + delta - k1;
                    if k2_offset >= 0 && k2_offset < v_length && v2[k2_offset as usize] != -1 {
                        let x2 = n - v2[k2_offset as usize];
                        if x1 >= x2 {
                            return self.bisect_split(a, b, x1 as usize, y1 as usize);
                        }
                    }
                }
                k1 += 2;
            }

            // Walk the reverse path one step.
            let mut k2 = -d + k2_start;
            while k2 <= d - k2_end {
                let k2_offset = (v_offset + k2) as usize;
                let mut x2 = if k2 == -d || (k2 != d && v2[k2_offset - 1] < v2[k2_offset + 1]) {
                    v2[k2_offset + 1]
                } else {
                    v2[k2_offset - 1] + 1
                };
                let mut y2 = x2 - k2;
                while x2 < n
                    && y2 < m
                    && a[(n - x2 - 1) as usize] == b[(m - y2 - 1) as usize]
                {
                    x2 += 1;
                    y2 += 1;
                }
                v2[k2_offset] = x2;
                if x2 > n {
                    k2_end += 2;
                } else if y2 > m {
                    k2_start += 2;
                } else if !front {
                    let k1_offset = v_offset + delta - k2;
                    if k1_offset >= 0 && k1_offset < v_length && v1[k1_offset as usize] != -1 {
                        let x1 = v1[k1_offset as usize];
                        let y1 = v_offset + x1 - k1_offset;
                        // Mirror x2 onto the top-left coordinate system.
                        if x1 >= n - x2 {
                            return self.bisect_split(a, b, x1 as usize, y1 as usize);
                        }
                    }
                }
                k2 += 2;
            }
        }

        // Deadline hit or no commonality at all.
        vec![(DiffOp::Delete, a.to_vec()), (DiffOp::Insert, b.to_vec())]
    }

    fn bisect_split<T: Token>(&self, a: &[T], b: &[T], x: usize, y: usize) -> Vec<Run<T>> {
        let mut runs = self.main(&a[..x], &b[..y], false);
        runs.extend(self.main(&a[x..], &b[y..], false));
        runs
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn common_prefix<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Length of the longest suffix of `a` that is a prefix of `b`.
fn common_overlap(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let len = a.len().min(b.len());
    let a = &a[a.len() - len..];
    let b = &b[..len];
    if a == b {
        return len;
    }

    let mut best = 0;
    let mut length = 1;
    while length <= len {
        let pattern = &a[len - length..];
        let Some(found) = find(b, pattern, 0) else {
            return best;
        };
        length += found;
        if found == 0 || a[len - length..] == b[..length] {
            best = length;
            length += 1;
        }
    }
    best
}

/// Index of the first occurrence of `needle` in `haystack` at or after `from`.
pub(crate) fn find<T: PartialEq>(haystack: &[T], needle: &[T], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return (from <= haystack.len()).then_some(from);
    }
    if from >= haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Index of the last occurrence of `needle` in `haystack` starting at or
/// before `before`.
pub(crate) fn rfind<T: PartialEq>(haystack: &[T], needle: &[T], before: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let last_start = (haystack.len() - needle.len()).min(before);
    (0..=last_start)
        .rev()
        .find(|&i| haystack[i..i + needle.len()] == *needle)
}

struct HalfMatch<T> {
    a_head: Vec<T>,
    a_tail: Vec<T>,
    b_head: Vec<T>,
    b_tail: Vec<T>,
    common: Vec<T>,
}

/// Look for a substring shared by both texts that is at least half the
/// length of the longer one. Speeds up large diffs at the cost of
/// minimality, so it only runs when a deadline is set.
fn half_match<T: Token>(a: &[T], b: &[T]) -> Option<HalfMatch<T>> {
    let a_longer = a.len() > b.len();
    let (long, short) = if a_longer { (a, b) } else { (b, a) };
    if long.len() < 4 || short.len() * 2 < long.len() {
        return None;
    }

    let first = half_match_at(long, short, long.len().div_ceil(4));
    let second = half_match_at(long, short, long.len().div_ceil(2));
    let hm = match (first, second) {
        (None, None) => return None,
        (Some(h), None) | (None, Some(h)) => h,
        (Some(h1), Some(h2)) => {
            if h1.common.len() > h2.common.len() {
                h1
            } else {
                h2
            }
        }
    };

    // half_match_at reports (long, short) as (a, b); swap back if needed.
    Some(if a_longer {
        hm
    } else {
        HalfMatch {
            a_head: hm.b_head,
            a_tail: hm.b_tail,
            b_head: hm.a_head,
            b_tail: hm.a_tail,
            common: hm.common,
        }
    })
}

fn half_match_at<T: Token>(long: &[T], short: &[T], i: usize) -> Option<HalfMatch<T>> {
    let seed = &long[i..i + long.len() / 4];
    let mut best: Option<HalfMatch<T>> = None;
    let mut best_len = 0;

    let mut j = find(short, seed, 0);
    while let Some(jj) = j {
        let prefix = common_prefix(&long[i..], &short[jj..]);
        let suffix = common_suffix(&long[..i], &short[..jj]);
        if best_len < prefix + suffix {
            best_len = prefix + suffix;
            best = Some(HalfMatch {
                a_head: long[..i - suffix].to_vec(),
                a_tail: long[i + prefix..].to_vec(),
                b_head: short[..jj - suffix].to_vec(),
                b_tail: short[jj + prefix..].to_vec(),
                common: short[jj - suffix..jj + prefix].to_vec(),
            });
        }
        j = find(short, seed, jj + 1);
    }

    best.filter(|hm| hm.common.len() * 2 >= long.len())
}

/// Split two texts into lines and replace each distinct line with an id.
fn lines_to_ids(a: &[char], b: &[char]) -> (Vec<usize>, Vec<usize>, Vec<Vec<char>>) {
    let mut lines: Vec<Vec<char>> = Vec::new();
    let mut index: HashMap<Vec<char>, usize> = HashMap::new();
    let mut encode = |text: &[char]| -> Vec<usize> {
        let mut ids = Vec::new();
        let mut start = 0;
        while start < text.len() {
            let end = text[start..]
                .iter()
                .position(|&c| c == '\n')
                .map_or(text.len(), |p| start + p + 1);
            let line = text[start..end].to_vec();
            let id = *index.entry(line.clone()).or_insert_with(|| {
                lines.push(line);
                lines.len() - 1
            });
            ids.push(id);
            start = end;
        }
        ids
    };
    let ids_a = encode(a);
    let ids_b = encode(b);
    (ids_a, ids_b, lines)
}

// ---------------------------------------------------------------------------
// Cleanup passes
// ---------------------------------------------------------------------------

pub(crate) fn merge_runs<T: Eq + Clone>(runs: &mut Vec<Run<T>>) {
    runs.retain(|(_, t)| !t.is_empty());
    loop {
        // Trailing sentinel so the last edit group gets flushed.
        runs.push((DiffOp::Equal, Vec::new()));
        let mut pointer = 0;
        let mut count_delete = 0;
        let mut count_insert = 0;
        let mut text_delete: Vec<T> = Vec::new();
        let mut text_insert: Vec<T> = Vec::new();

        while pointer < runs.len() {
            match runs[pointer].0 {
                DiffOp::Insert => {
                    count_insert += 1;
                    text_insert.extend(runs[pointer].1.iter().cloned());
                    pointer += 1;
                }
                DiffOp::Delete => {
                    count_delete += 1;
                    text_delete.extend(runs[pointer].1.iter().cloned());
                    pointer += 1;
                }
                DiffOp::Equal => {
                    if count_delete + count_insert > 1 {
                        if count_delete != 0 && count_insert != 0 {
                            let prefix = common_prefix(&text_insert, &text_delete);
                            if prefix != 0 {
                                let x = pointer - count_delete - count_insert;
                                let shared = text_insert[..prefix].to_vec();
                                if x > 0 && runs[x - 1].0 == DiffOp::Equal {
                                    runs[x - 1].1.extend(shared);
                                } else {
                                    runs.insert(0, (DiffOp::Equal, shared));
                                    pointer += 1;
                                }
                                text_insert.drain(..prefix);
                                text_delete.drain(..prefix);
                            }
                            let suffix = common_suffix(&text_insert, &text_delete);
                            if suffix != 0 {
                                let mut shared = text_insert[text_insert.len() - suffix..].to_vec();
                                shared.append(&mut runs[pointer].1);
                                runs[pointer].1 = shared;
                                text_insert.truncate(text_insert.len() - suffix);
                                text_delete.truncate(text_delete.len() - suffix);
                            }
                        }
                        let mut merged = Vec::with_capacity(2);
                        if !text_delete.is_empty() {
                            merged.push((DiffOp::Delete, std::mem::take(&mut text_delete)));
                        }
                        if !text_insert.is_empty() {
                            merged.push((DiffOp::Insert, std::mem::take(&mut text_insert)));
                        }
                        let start = pointer - count_delete - count_insert;
                        let merged_len = merged.len();
                        runs.splice(start..pointer, merged);
                        pointer = start + merged_len + 1;
                    } else if pointer != 0 && runs[pointer - 1].0 == DiffOp::Equal {
                        // Merge this equality with the previous one.
                        let text = std::mem::take(&mut runs[pointer].1);
                        runs[pointer - 1].1.extend(text);
                        runs.remove(pointer);
                    } else {
                        pointer += 1;
                    }
                    count_insert = 0;
                    count_delete = 0;
                    text_delete.clear();
                    text_insert.clear();
                }
            }
        }
        if runs.last().is_some_and(|(_, t)| t.is_empty()) {
            runs.pop();
        }

        // Slide single edits surrounded by equalities to drop one of them:
        // A<ins>BA</ins>C -> <ins>AB</ins>AC
        let mut changes = false;
        let mut pointer = 1;
        while pointer + 1 < runs.len() {
            if runs[pointer - 1].0 == DiffOp::Equal
                && runs[pointer + 1].0 == DiffOp::Equal
                && !runs[pointer - 1].1.is_empty()
                && !runs[pointer + 1].1.is_empty()
            {
                let prev = runs[pointer - 1].1.clone();
                let next = runs[pointer + 1].1.clone();
                let current = runs[pointer].1.clone();
                if current.ends_with(&prev) {
                    let mut shifted = prev.clone();
                    shifted.extend_from_slice(&current[..current.len() - prev.len()]);
                    runs[pointer].1 = shifted;
                    let mut following = prev;
                    following.extend(next);
                    runs[pointer + 1].1 = following;
                    runs.remove(pointer - 1);
                    changes = true;
                } else if current.starts_with(&next) {
                    runs[pointer - 1].1.extend(next.iter().cloned());
                    let mut shifted = current[next.len()..].to_vec();
                    shifted.extend(next);
                    runs[pointer].1 = shifted;
                    runs.remove(pointer + 1);
                    changes = true;
                }
            }
            pointer += 1;
        }
        if !changes {
            break;
        }
    }
}

pub(crate) fn cleanup_semantic_chars(runs: &mut Edits) {
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<Vec<char>> = None;
    let mut pointer: isize = 0;
    // Edits before (1) and after (2) the last equality.
    let (mut ins1, mut del1, mut ins2, mut del2) = (0usize, 0usize, 0usize, 0usize);

    while (pointer as usize) < runs.len() {
        let p = pointer as usize;
        if runs[p].0 == DiffOp::Equal {
            equalities.push(p);
            ins1 = ins2;
            del1 = del2;
            ins2 = 0;
            del2 = 0;
            last_equality = Some(runs[p].1.clone());
        } else {
            if runs[p].0 == DiffOp::Insert {
                ins2 += runs[p].1.len();
            } else {
                del2 += runs[p].1.len();
            }
            let eliminate = last_equality.as_ref().is_some_and(|eq| {
                !eq.is_empty() && eq.len() <= ins1.max(del1) && eq.len() <= ins2.max(del2)
            });
            if eliminate {
                let last = equalities.last().copied();
                if let (Some(eq), Some(idx)) = (last_equality.take(), last) {
                    // Replace the equality with a delete + insert pair.
                    runs.insert(idx, (DiffOp::Delete, eq));
                    runs[idx + 1].0 = DiffOp::Insert;
                    equalities.pop();
                    equalities.pop();
                    pointer = equalities.last().map_or(-1, |&i| i as isize);
                    ins1 = 0;
                    del1 = 0;
                    ins2 = 0;
                    del2 = 0;
                    changes = true;
                }
            }
        }
        pointer += 1;
    }

    if changes {
        merge_runs(runs);
    }
    cleanup_semantic_lossless(runs);

    // Extract overlaps between adjacent deletions and insertions:
    // <del>abcxxx</del><ins>xxxdef</ins> -> <del>abc</del>xxx<ins>def</ins>
    let mut pointer = 1;
    let mut emptied = false;
    while pointer < runs.len() {
        if runs[pointer - 1].0 == DiffOp::Delete && runs[pointer].0 == DiffOp::Insert {
            let deletion = runs[pointer - 1].1.clone();
            let insertion = runs[pointer].1.clone();
            let forward = common_overlap(&deletion, &insertion);
            let backward = common_overlap(&insertion, &deletion);
            if forward >= backward {
                if forward * 2 >= deletion.len() || forward * 2 >= insertion.len() {
                    runs.insert(pointer, (DiffOp::Equal, insertion[..forward].to_vec()));
                    runs[pointer - 1].1 = deletion[..deletion.len() - forward].to_vec();
                    runs[pointer + 1].1 = insertion[forward..].to_vec();
                    emptied |= forward == deletion.len() || forward == insertion.len();
                    pointer += 1;
                }
            } else if backward * 2 >= deletion.len() || backward * 2 >= insertion.len() {
                // Reverse overlap: swap the edits around the shared text.
                runs.insert(pointer, (DiffOp::Equal, deletion[..backward].to_vec()));
                runs[pointer - 1] = (
                    DiffOp::Insert,
                    insertion[..insertion.len() - backward].to_vec(),
                );
                runs[pointer + 1] = (DiffOp::Delete, deletion[backward..].to_vec());
                emptied |= backward == deletion.len() || backward == insertion.len();
                pointer += 1;
            }
            pointer += 1;
        }
        pointer += 1;
    }
    if emptied {
        merge_runs(runs);
    }
}

/// Slide single edits bounded by equalities so their edges land on logical
/// boundaries (blank lines, line breaks, word breaks).
fn cleanup_semantic_lossless(runs: &mut Edits) {
    let mut pointer = 1;
    while pointer + 1 < runs.len() {
        if runs[pointer - 1].0 == DiffOp::Equal && runs[pointer + 1].0 == DiffOp::Equal {
            let mut equality1 = runs[pointer - 1].1.clone();
            let mut edit = runs[pointer].1.clone();
            let mut equality2 = runs[pointer + 1].1.clone();

            // Shift the edit as far left as possible.
            let offset = common_suffix(&equality1, &edit);
            if offset > 0 {
                let common = edit[edit.len() - offset..].to_vec();
                equality1.truncate(equality1.len() - offset);
                let mut shifted = common.clone();
                shifted.extend_from_slice(&edit[..edit.len() - offset]);
                edit = shifted;
                let mut eq2 = common;
                eq2.extend(equality2);
                equality2 = eq2;
            }

            // Step right one char at a time looking for the best fit.
            let mut best = (equality1.clone(), edit.clone(), equality2.clone());
            let mut best_score = semantic_score(&equality1, &edit) + semantic_score(&edit, &equality2);
            while !edit.is_empty() && !equality2.is_empty() && edit[0] == equality2[0] {
                equality1.push(edit.remove(0));
                edit.push(equality2.remove(0));
                let score = semantic_score(&equality1, &edit) + semantic_score(&edit, &equality2);
                // >= encourages trailing rather than leading whitespace on edits.
                if score >= best_score {
                    best_score = score;
                    best = (equality1.clone(), edit.clone(), equality2.clone());
                }
            }

            if runs[pointer - 1].1 != best.0 {
                let (best1, best_edit, best2) = best;
                if best1.is_empty() {
                    runs.remove(pointer - 1);
                    pointer -= 1;
                } else {
                    runs[pointer - 1].1 = best1;
                }
                runs[pointer].1 = best_edit;
                if best2.is_empty() {
                    runs.remove(pointer + 1);
                    pointer = pointer.saturating_sub(1);
                } else {
                    runs[pointer + 1].1 = best2;
                }
            }
        }
        pointer += 1;
    }
}

/// Score how well the boundary between `one` and `two` falls on a logical
/// break. 6 is best (edge of text), 0 is worst (mid-word).
fn semantic_score(one: &[char], two: &[char]) -> u8 {
    let (Some(&c1), Some(&c2)) = (one.last(), two.first()) else {
        return 6;
    };
    let non_alnum1 = !c1.is_alphanumeric();
    let non_alnum2 = !c2.is_alphanumeric();
    let whitespace1 = non_alnum1 && c1.is_whitespace();
    let whitespace2 = non_alnum2 && c2.is_whitespace();
    let line_break1 = whitespace1 && (c1 == '\n' || c1 == '\r');
    let line_break2 = whitespace2 && (c2 == '\n' || c2 == '\r');
    let blank_line1 = line_break1 && (one.ends_with(&['\n', '\n']) || one.ends_with(&['\n', '\r', '\n']));
    let blank_line2 = line_break2 && starts_with_blank_line(two);

    if blank_line1 || blank_line2 {
        5
    } else if line_break1 || line_break2 {
        4
    } else if non_alnum1 && !whitespace1 && whitespace2 {
        // End of sentence.
        3
    } else if whitespace1 || whitespace2 {
        2
    } else if non_alnum1 || non_alnum2 {
        1
    } else {
        0
    }
}

fn starts_with_blank_line(text: &[char]) -> bool {
    let mut rest = text;
    for _ in 0..2 {
        if rest.first() == Some(&'\r') {
            rest = &rest[1..];
        }
        if rest.first() != Some(&'\n') {
            return false;
        }
        rest = &rest[1..];
    }
    true
}

pub(crate) fn cleanup_efficiency_chars(runs: &mut Edits, edit_cost: usize) {
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<Vec<char>> = None;
    let mut pointer: isize = 0;
    let (mut pre_ins, mut pre_del, mut post_ins, mut post_del) = (false, false, false, false);

    while (pointer as usize) < runs.len() {
        let p = pointer as usize;
        if runs[p].0 == DiffOp::Equal {
            if runs[p].1.len() < edit_cost && (post_ins || post_del) {
                // Candidate equality.
                equalities.push(p);
                pre_ins = post_ins;
                pre_del = post_del;
                last_equality = Some(runs[p].1.clone());
            } else {
                equalities.clear();
                last_equality = None;
            }
            post_ins = false;
            post_del = false;
        } else {
            if runs[p].0 == DiffOp::Delete {
                post_del = true;
            } else {
                post_ins = true;
            }

            // Split an equality surrounded by four edits, or a short one
            // surrounded by three:
            // <ins>A</ins><del>B</del>XY<ins>C</ins><del>D</del>
            // <ins>A</ins>X<ins>C</ins><del>D</del>
            let surrounding = [pre_ins, pre_del, post_ins, post_del]
                .iter()
                .filter(|&&b| b)
                .count();
            let split = last_equality.as_ref().is_some_and(|eq| {
                surrounding == 4 || (eq.len() * 2 < edit_cost && surrounding == 3)
            });
            if split {
                let last = equalities.last().copied();
                if let (Some(eq), Some(idx)) = (last_equality.take(), last) {
                    runs.insert(idx, (DiffOp::Delete, eq));
                    runs[idx + 1].0 = DiffOp::Insert;
                    equalities.pop();
                    if pre_ins && pre_del {
                        // No changes made which could affect previous entry.
                        post_ins = true;
                        post_del = true;
                        equalities.clear();
                    } else {
                        equalities.pop();
                        pointer = equalities.last().map_or(-1, |&i| i as isize);
                        post_ins = false;
                        post_del = false;
                    }
                    changes = true;
                }
            }
        }
        pointer += 1;
    }

    if changes {
        merge_runs(runs);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
