//! Locates substrings that the diff must treat as indivisible units.
//!
//! Citations, math runs, anchors, and cross-references carry meaning that a
//! word-level diff would destroy by splitting them mid-token. The tagger
//! scans a document with a fixed regex table and returns a sorted list of
//! non-overlapping spans. Matching is deliberately permissive about context:
//! a span that fails to match simply is not protected, which degrades diff
//! quality but never loses text.

use galley_api::SpanKind;

use crate::markup;

/// A substring that survives diffing as one atomic token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedSpan {
    /// Classification of the protected content.
    pub kind: SpanKind,
    /// Exact text of the span.
    pub text: String,
    /// Byte offset where the span starts.
    pub start: usize,
    /// Byte offset one past the last byte of the span.
    pub end: usize,
}

impl ProtectedSpan {
    /// Length of the span in bytes.
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span is empty; never true for tagger output.
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

mod patterns {
    #![allow(clippy::unwrap_used)]

    use once_cell::sync::Lazy;
    use regex::Regex;

    /// `$$ ... $$`, possibly spanning lines.
    pub(super) static DISPLAY_MATH: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?s)\$\$.+?\$\$").unwrap());

    /// `$ ... $` on a single line with non-space characters at both ends.
    pub(super) static INLINE_MATH: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$[^\s$](?:[^$\n]*[^\s$])?\$").unwrap());

    /// Bracketed citation group containing at least one `@` key.
    pub(super) static BRACKET_CITATION: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\[[^\[\]]*@[^\[\]]+\]").unwrap());

    /// Explicit anchor such as `{#fig:flow}` or `{#tbl:results .striped}`.
    pub(super) static ANCHOR: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\{#(?:fig|tbl|eq|sec|lst):[^{}\s]+[^{}]*\}").unwrap());

    /// Cross-reference such as `@fig:flow`.
    pub(super) static CROSS_REF: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"@(?:fig|tbl|eq|sec|lst):[A-Za-z0-9_-]+").unwrap());

    /// Inline citation key such as `@doe2021`.
    pub(super) static INLINE_CITATION: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"@[A-Za-z0-9_][A-Za-z0-9_-]*").unwrap());

    /// Inline code span on a single line.
    pub(super) static INLINE_CODE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"`[^`\n]+`").unwrap());
}

/// Tag every protected span in `text`.
///
/// Candidates are gathered kind by kind, spans inside code regions or after
/// an unterminated annotation marker are dropped, and overlaps are resolved
/// by earliest start, with the longest candidate winning at equal starts.
/// The result is sorted by start offset and free of overlaps.
pub fn tag(text: &str) -> Vec<ProtectedSpan> {
    let zones = exclusion_zones(text);
    let mut candidates: Vec<ProtectedSpan> = Vec::new();

    gather(&patterns::DISPLAY_MATH, SpanKind::DisplayMath, text, &mut candidates);
    gather(&patterns::ANCHOR, SpanKind::Anchor, text, &mut candidates);
    gather(&patterns::BRACKET_CITATION, SpanKind::Citation, text, &mut candidates);
    gather_inline_math(text, &mut candidates);
    gather_at_prefixed(&patterns::CROSS_REF, SpanKind::CrossRef, text, &mut candidates);
    gather_at_prefixed(&patterns::INLINE_CITATION, SpanKind::Citation, text, &mut candidates);

    candidates.retain(|span| !zones.iter().any(|zone| intersects(span.start, span.end, *zone)));
    candidates.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut spans: Vec<ProtectedSpan> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let clear = spans.last().map_or(true, |last| last.end <= candidate.start);
        if clear {
            spans.push(candidate);
        }
    }
    spans
}

/// Code regions of `text`: fenced blocks and inline backtick spans.
///
/// An unterminated fence opens a region that runs to the end of the text.
pub(crate) fn code_zones(text: &str) -> Vec<(usize, usize)> {
    let mut zones = Vec::new();
    let fences: Vec<usize> = text.match_indices("```").map(|(at, _)| at).collect();
    for pair in fences.chunks(2) {
        match *pair {
            [open, close] => zones.push((open, close + 3)),
            [open] => zones.push((open, text.len())),
            _ => {}
        }
    }
    for found in patterns::INLINE_CODE.find_iter(text) {
        zones.push((found.start(), found.end()));
    }
    zones
}

fn exclusion_zones(text: &str) -> Vec<(usize, usize)> {
    let mut zones = code_zones(text);
    for tail in markup::unterminated_tails(text) {
        zones.push((tail, text.len()));
    }
    zones
}

fn intersects(start: usize, end: usize, (zone_start, zone_end): (usize, usize)) -> bool {
    start < zone_end && zone_start < end
}

fn gather(regex: &regex::Regex, kind: SpanKind, text: &str, out: &mut Vec<ProtectedSpan>) {
    for found in regex.find_iter(text) {
        out.push(ProtectedSpan {
            kind,
            text: found.as_str().to_owned(),
            start: found.start(),
            end: found.end(),
        });
    }
}

/// Inline math, rejecting matches whose closing `$` is followed by a digit.
/// That rule keeps currency ranges like `$5-$6` out of the table.
fn gather_inline_math(text: &str, out: &mut Vec<ProtectedSpan>) {
    for found in patterns::INLINE_MATH.find_iter(text) {
        if text.as_bytes().get(found.end()).is_some_and(u8::is_ascii_digit) {
            continue;
        }
        out.push(ProtectedSpan {
            kind: SpanKind::InlineMath,
            text: found.as_str().to_owned(),
            start: found.start(),
            end: found.end(),
        });
    }
}

/// `@`-prefixed patterns, rejecting matches glued to a preceding word so
/// that email addresses never register as citations.
fn gather_at_prefixed(
    regex: &regex::Regex,
    kind: SpanKind,
    text: &str,
    out: &mut Vec<ProtectedSpan>,
) {
    for found in regex.find_iter(text) {
        let glued = found.start() > 0
            && text.as_bytes()[found.start() - 1].is_ascii_alphanumeric();
        if glued {
            continue;
        }
        out.push(ProtectedSpan {
            kind,
            text: found.as_str().to_owned(),
            start: found.start(),
            end: found.end(),
        });
    }
}
