//! Token-level diff generation.
//!
//! The engine aligns two token streams with a dynamic-programming longest
//! common subsequence in which a matched protected span scores double an
//! ordinary match. The weighting breaks alignment ties toward keeping
//! citations, math, and anchors inside equal runs, so they surface in edit
//! scripts whole or not at all.
//!
//! Inputs whose alignment table would exceed [`DiffOptions::work_limit`]
//! cells are first aligned paragraph by paragraph, and only the differing
//! paragraph groups are realigned token by token.

use tracing::debug;

use crate::token::{self, Granularity, Token};

const ORDINARY_MATCH: u32 = 1;
const PROTECTED_MATCH: u32 = 2;

/// Disposition of one run of tokens in an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// The run appears in both texts.
    Equal,
    /// The run appears only in the original text.
    Delete,
    /// The run appears only in the revised text.
    Insert,
}

/// A maximal run of consecutive tokens sharing one disposition.
///
/// Scripts are canonical: runs of the same kind never touch, and within a
/// changed region the deletion run precedes the insertion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOp {
    /// Disposition of the run.
    pub kind: EditKind,
    /// The tokens of the run, in text order.
    pub tokens: Vec<Token>,
}

impl EditOp {
    /// Concatenated text of the run.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|token| token.text.as_str()).collect()
    }
}

/// Tuning knobs for a diff run.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Segmentation level for plain text.
    pub granularity: Granularity,
    /// Upper bound on alignment table cells before the engine switches to
    /// paragraph chunking.
    pub work_limit: usize,
}

impl DiffOptions {
    /// Default cap on alignment table size, roughly a 2000x2000 token pair.
    pub const DEFAULT_WORK_LIMIT: usize = 4_000_000;
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::Word,
            work_limit: Self::DEFAULT_WORK_LIMIT,
        }
    }
}

/// Token-level diff engine.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    options: DiffOptions,
}

impl DiffEngine {
    /// Engine with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with explicit options.
    #[must_use]
    pub const fn with_options(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Compute the canonical edit script turning `original` into `revised`.
    pub fn diff(&self, original: &str, revised: &str) -> Vec<EditOp> {
        let a = token::tokenize(original, self.options.granularity);
        let b = token::tokenize(revised, self.options.granularity);
        let mut raw = Vec::new();
        self.align(&a, &b, &mut raw, false);
        coalesce(raw)
    }

    /// Align two token slices, stripping common ends first.
    fn align(&self, a: &[Token], b: &[Token], out: &mut Vec<EditOp>, chunked: bool) {
        let prefix = common_prefix(a, b);
        let suffix = common_suffix(&a[prefix..], &b[prefix..]);
        push_run(out, EditKind::Equal, &a[..prefix]);

        let mid_a = &a[prefix..a.len() - suffix];
        let mid_b = &b[prefix..b.len() - suffix];
        match (mid_a.is_empty(), mid_b.is_empty()) {
            (true, true) => {}
            (false, true) => push_run(out, EditKind::Delete, mid_a),
            (true, false) => push_run(out, EditKind::Insert, mid_b),
            (false, false) if self.within_work_limit(mid_a.len(), mid_b.len()) => {
                lcs_align(mid_a, mid_b, out);
            }
            (false, false) if !chunked => self.chunked_align(mid_a, mid_b, out),
            (false, false) => {
                push_run(out, EditKind::Delete, mid_a);
                push_run(out, EditKind::Insert, mid_b);
            }
        }

        push_run(out, EditKind::Equal, &a[a.len() - suffix..]);
    }

    fn within_work_limit(&self, rows: usize, cols: usize) -> bool {
        rows.checked_mul(cols)
            .map_or(false, |cells| cells <= self.options.work_limit)
    }

    /// Align paragraph groups first, then realign only the groups that
    /// differ. Groups that still exceed the work limit degrade to a single
    /// whole-group substitution.
    fn chunked_align(&self, a: &[Token], b: &[Token], out: &mut Vec<EditOp>) {
        debug!(
            original_tokens = a.len(),
            revised_tokens = b.len(),
            "alignment table too large, falling back to paragraph chunks"
        );
        let ranges_a = paragraph_ranges(a);
        let ranges_b = paragraph_ranges(b);
        if !self.within_work_limit(ranges_a.len(), ranges_b.len()) {
            push_run(out, EditKind::Delete, a);
            push_run(out, EditKind::Insert, b);
            return;
        }

        let keys_a: Vec<String> = ranges_a.iter().map(|range| join(&a[range.0..range.1])).collect();
        let keys_b: Vec<String> = ranges_b.iter().map(|range| join(&b[range.0..range.1])).collect();
        let matched = lcs_table(keys_a.len(), keys_b.len(), |i, j| {
            (keys_a[i] == keys_b[j]).then_some(ORDINARY_MATCH)
        });

        let cols = keys_b.len() + 1;
        let (mut i, mut j) = (0, 0);
        let (mut region_a, mut region_b): (Vec<(usize, usize)>, Vec<(usize, usize)>) =
            (Vec::new(), Vec::new());
        loop {
            let take_equal =
                i < keys_a.len() && j < keys_b.len() && keys_a[i] == keys_b[j];
            if take_equal || (i == keys_a.len() && j == keys_b.len()) {
                self.flush_chunk_region(a, b, &mut region_a, &mut region_b, out);
                if i == keys_a.len() {
                    break;
                }
                push_run(out, EditKind::Equal, &a[ranges_a[i].0..ranges_a[i].1]);
                i += 1;
                j += 1;
            } else if j == keys_b.len()
                || (i < keys_a.len() && matched[(i + 1) * cols + j] >= matched[i * cols + j + 1])
            {
                region_a.push(ranges_a[i]);
                i += 1;
            } else {
                region_b.push(ranges_b[j]);
                j += 1;
            }
        }
    }

    /// Realign one differing paragraph region token by token.
    fn flush_chunk_region(
        &self,
        a: &[Token],
        b: &[Token],
        region_a: &mut Vec<(usize, usize)>,
        region_b: &mut Vec<(usize, usize)>,
        out: &mut Vec<EditOp>,
    ) {
        if region_a.is_empty() && region_b.is_empty() {
            return;
        }
        let slice_a = region_a
            .first()
            .map_or(&a[0..0], |first| &a[first.0..region_a[region_a.len() - 1].1]);
        let slice_b = region_b
            .first()
            .map_or(&b[0..0], |first| &b[first.0..region_b[region_b.len() - 1].1]);
        self.align(slice_a, slice_b, out, true);
        region_a.clear();
        region_b.clear();
    }
}

/// Token equality for alignment purposes: exact text.
fn token_eq(a: &Token, b: &Token) -> bool {
    a.text == b.text
}

fn match_weight(a: &Token, b: &Token) -> u32 {
    if a.is_protected() || b.is_protected() {
        PROTECTED_MATCH
    } else {
        ORDINARY_MATCH
    }
}

fn common_prefix(a: &[Token], b: &[Token]) -> usize {
    a.iter()
        .zip(b.iter())
        .take_while(|(x, y)| token_eq(x, y))
        .count()
}

fn common_suffix(a: &[Token], b: &[Token]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| token_eq(x, y))
        .count()
}

fn join(tokens: &[Token]) -> String {
    tokens.iter().map(|token| token.text.as_str()).collect()
}

/// Fill a suffix-indexed score table: `table[i * (cols_len + 1) + j]` holds
/// the best score aligning `a[i..]` with `b[j..]`.
fn lcs_table(
    rows_len: usize,
    cols_len: usize,
    matched: impl Fn(usize, usize) -> Option<u32>,
) -> Vec<u32> {
    let cols = cols_len + 1;
    let mut table = vec![0u32; (rows_len + 1) * cols];
    for i in (0..rows_len).rev() {
        for j in (0..cols_len).rev() {
            let idx = i * cols + j;
            table[idx] = match matched(i, j) {
                Some(weight) => table[idx + cols + 1] + weight,
                None => table[idx + cols].max(table[idx + 1]),
            };
        }
    }
    table
}

/// Weighted LCS alignment of two slices with forward traceback.
fn lcs_align(a: &[Token], b: &[Token], out: &mut Vec<EditOp>) {
    let table = lcs_table(a.len(), b.len(), |i, j| {
        token_eq(&a[i], &b[j]).then(|| match_weight(&a[i], &b[j]))
    });
    let cols = b.len() + 1;
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if token_eq(&a[i], &b[j]) {
            push_run(out, EditKind::Equal, std::slice::from_ref(&a[i]));
            i += 1;
            j += 1;
        } else if table[(i + 1) * cols + j] >= table[i * cols + j + 1] {
            push_run(out, EditKind::Delete, std::slice::from_ref(&a[i]));
            i += 1;
        } else {
            push_run(out, EditKind::Insert, std::slice::from_ref(&b[j]));
            j += 1;
        }
    }
    push_run(out, EditKind::Delete, &a[i..]);
    push_run(out, EditKind::Insert, &b[j..]);
}

fn push_run(out: &mut Vec<EditOp>, kind: EditKind, tokens: &[Token]) {
    if tokens.is_empty() {
        return;
    }
    out.push(EditOp {
        kind,
        tokens: tokens.to_vec(),
    });
}

/// Merge adjacent runs and order each changed region as deletes before
/// inserts.
fn coalesce(raw: Vec<EditOp>) -> Vec<EditOp> {
    let mut script: Vec<EditOp> = Vec::new();
    let mut deletes: Vec<Token> = Vec::new();
    let mut inserts: Vec<Token> = Vec::new();

    let mut flush = |script: &mut Vec<EditOp>, deletes: &mut Vec<Token>, inserts: &mut Vec<Token>| {
        if !deletes.is_empty() {
            script.push(EditOp {
                kind: EditKind::Delete,
                tokens: std::mem::take(deletes),
            });
        }
        if !inserts.is_empty() {
            script.push(EditOp {
                kind: EditKind::Insert,
                tokens: std::mem::take(inserts),
            });
        }
    };

    for op in raw {
        match op.kind {
            EditKind::Equal => {
                flush(&mut script, &mut deletes, &mut inserts);
                match script.last_mut() {
                    Some(last) if last.kind == EditKind::Equal => last.tokens.extend(op.tokens),
                    _ => script.push(op),
                }
            }
            EditKind::Delete => deletes.extend(op.tokens),
            EditKind::Insert => inserts.extend(op.tokens),
        }
    }
    flush(&mut script, &mut deletes, &mut inserts);
    script
}

/// Token index ranges of paragraph groups; a group ends at the token whose
/// trailing whitespace carries a blank line.
fn paragraph_ranges(tokens: &[Token]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for (idx, token) in tokens.iter().enumerate() {
        if token.text.contains("\n\n") {
            ranges.push((start, idx + 1));
            start = idx + 1;
        }
    }
    if start < tokens.len() {
        ranges.push((start, tokens.len()));
    }
    ranges
}
