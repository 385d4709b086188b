//! CriticMarkup parsing, decision application, and stripping.
//!
//! The lexer classifies every marker opening it finds as complete, inside a
//! code region, unterminated, or malformed. Only complete markers become
//! [`Annotation`] values; everything else stays literal text, so a stray
//! `{++` never swallows the rest of a document.

use galley_api::{Annotation, AnnotationKind, ReviewStats};
use tracing::{debug, warn};

use crate::span;

pub(crate) const INSERT_OPEN: &str = "{++";
pub(crate) const INSERT_CLOSE: &str = "++}";
pub(crate) const DELETE_OPEN: &str = "{--";
pub(crate) const DELETE_CLOSE: &str = "--}";
pub(crate) const SUBSTITUTE_OPEN: &str = "{~~";
pub(crate) const SUBSTITUTE_CLOSE: &str = "~~}";
pub(crate) const SUBSTITUTE_ARROW: &str = "~>";
pub(crate) const COMMENT_OPEN: &str = "{>>";
pub(crate) const COMMENT_CLOSE: &str = "<<}";
pub(crate) const HIGHLIGHT_OPEN: &str = "{==";
pub(crate) const HIGHLIGHT_CLOSE: &str = "==}";

const DELIMITERS: [(AnnotationKind, &str, &str); 5] = [
    (AnnotationKind::Insert, INSERT_OPEN, INSERT_CLOSE),
    (AnnotationKind::Delete, DELETE_OPEN, DELETE_CLOSE),
    (AnnotationKind::Substitute, SUBSTITUTE_OPEN, SUBSTITUTE_CLOSE),
    (AnnotationKind::Comment, COMMENT_OPEN, COMMENT_CLOSE),
    (AnnotationKind::Highlight, HIGHLIGHT_OPEN, HIGHLIGHT_CLOSE),
];

/// A comment body is split into author and text only when a colon appears
/// this close to its start.
const AUTHOR_PREFIX_LIMIT: usize = 30;

/// Characters of surrounding text captured on each side of a marker.
const CONTEXT_CHARS: usize = 32;

/// Hard cap on cleanup passes over pathologically nested input.
const MAX_CLEANUP_PASSES: usize = 64;

/// A complete marker located by the lexer.
#[derive(Debug, Clone, Copy)]
struct RawMarker {
    kind: AnnotationKind,
    start: usize,
    body_start: usize,
    body_end: usize,
    end: usize,
}

/// Classified outcome for one marker opening.
#[derive(Debug, Clone, Copy)]
enum Lexeme {
    /// Opening with a matching closing delimiter.
    Marker(RawMarker),
    /// Opening inside a fenced or inline code region.
    CodeLiteral { at: usize },
    /// Opening whose closing delimiter never appears.
    Unterminated { at: usize },
    /// Substitution whose body lacks the `~>` separator.
    Malformed { at: usize },
}

/// Scan `text` and classify every marker opening in document order.
fn lex(text: &str) -> Vec<Lexeme> {
    let code = span::code_zones(text);
    let mut lexemes = Vec::new();
    let mut at = 0;
    while let Some((start, kind, open, close)) = next_opening(text, at) {
        if code.iter().any(|&(from, to)| from <= start && start < to) {
            lexemes.push(Lexeme::CodeLiteral { at: start });
            at = start + open.len();
            continue;
        }
        let body_start = start + open.len();
        match find_close(text, body_start, open, close) {
            Some(body_end) => {
                let complete = kind != AnnotationKind::Substitute
                    || text[body_start..body_end].contains(SUBSTITUTE_ARROW);
                if complete {
                    lexemes.push(Lexeme::Marker(RawMarker {
                        kind,
                        start,
                        body_start,
                        body_end,
                        end: body_end + close.len(),
                    }));
                    at = body_end + close.len();
                } else {
                    lexemes.push(Lexeme::Malformed { at: start });
                    at = body_start;
                }
            }
            None => {
                lexemes.push(Lexeme::Unterminated { at: start });
                at = body_start;
            }
        }
    }
    lexemes
}

fn next_opening(
    text: &str,
    from: usize,
) -> Option<(usize, AnnotationKind, &'static str, &'static str)> {
    DELIMITERS
        .iter()
        .filter_map(|&(kind, open, close)| {
            text[from..]
                .find(open)
                .map(|found| (from + found, kind, open, close))
        })
        .min_by_key(|&(at, ..)| at)
}

/// Find the closing delimiter matching an opening at depth zero, skipping
/// over nested openings of the same kind so that the outermost marker wins.
fn find_close(text: &str, from: usize, open: &str, close: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut at = from;
    loop {
        let close_at = text[at..].find(close)? + at;
        let open_at = text[at..].find(open).map(|found| found + at);
        match open_at {
            Some(nested) if nested < close_at => {
                depth += 1;
                at = nested + open.len();
            }
            _ if depth == 0 => return Some(close_at),
            _ => {
                depth -= 1;
                at = close_at + close.len();
            }
        }
    }
}

/// Byte offsets of marker openings that never close; used by the span
/// tagger to exclude the text that follows them.
pub(crate) fn unterminated_tails(text: &str) -> Vec<usize> {
    lex(text)
        .into_iter()
        .filter_map(|lexeme| match lexeme {
            Lexeme::Unterminated { at } => Some(at),
            _ => None,
        })
        .collect()
}

/// Parse every complete annotation marker in `text`, in document order.
///
/// Openings inside code regions, unterminated openings, and substitutions
/// without a `~>` are reported at debug level and left out of the result.
pub fn parse(text: &str) -> Vec<Annotation> {
    let lines = LineIndex::new(text);
    let mut annotations = Vec::new();
    for lexeme in lex(text) {
        match lexeme {
            Lexeme::Marker(raw) => annotations.push(build_annotation(text, &lines, raw)),
            Lexeme::CodeLiteral { at } => {
                debug!(at, "marker opening inside code region treated as literal");
            }
            Lexeme::Unterminated { at } => {
                debug!(at, "unterminated marker opening treated as literal");
            }
            Lexeme::Malformed { at } => {
                debug!(at, "substitution without separator treated as literal");
            }
        }
    }
    annotations
}

/// Count the annotations in `text` by kind.
pub fn counts(text: &str) -> ReviewStats {
    ReviewStats::tally(&parse(text))
}

/// Resolve every marker to its accepted value and return the plain text.
///
/// With `keep_comments` set, comment markers survive untouched; otherwise
/// they are removed along with their bodies. Nested markers are resolved by
/// repeated passes until the text stops changing, with the pass count
/// bounded by the number of openings in the input.
pub fn strip(text: &str, keep_comments: bool) -> String {
    strip_with(text, true, keep_comments)
}

/// Resolve every marker to its rejected value and return the plain text.
pub fn strip_rejecting(text: &str, keep_comments: bool) -> String {
    strip_with(text, false, keep_comments)
}

fn strip_with(text: &str, accept: bool, keep_comments: bool) -> String {
    let openings = DELIMITERS
        .iter()
        .map(|&(_, open, _)| text.matches(open).count())
        .sum::<usize>();
    let bound = openings.saturating_add(1).min(MAX_CLEANUP_PASSES);

    let mut current = text.to_owned();
    for _ in 0..bound {
        let (next, resolved) = resolve_pass(&current, accept, keep_comments);
        current = next;
        if resolved == 0 {
            return current;
        }
    }
    warn!("marker cleanup did not settle; returning best effort text");
    current
}

/// Replace each complete marker with its resolution, in one scan.
fn resolve_pass(text: &str, accept: bool, keep_comments: bool) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut resolved = 0usize;
    for lexeme in lex(text) {
        let Lexeme::Marker(raw) = lexeme else { continue };
        if keep_comments && raw.kind == AnnotationKind::Comment {
            continue;
        }
        out.push_str(&text[cursor..raw.start]);
        let body = &text[raw.body_start..raw.body_end];
        match raw.kind {
            AnnotationKind::Insert => {
                if accept {
                    out.push_str(body);
                }
            }
            AnnotationKind::Delete => {
                if !accept {
                    out.push_str(body);
                }
            }
            AnnotationKind::Substitute => {
                let (old, new) = body.split_once(SUBSTITUTE_ARROW).unwrap_or((body, ""));
                out.push_str(if accept { new } else { old });
            }
            AnnotationKind::Comment => {}
            AnnotationKind::Highlight => out.push_str(body),
        }
        cursor = raw.end;
        resolved += 1;
    }
    out.push_str(&text[cursor..]);
    (out, resolved)
}

fn build_annotation(text: &str, lines: &LineIndex, raw: RawMarker) -> Annotation {
    let body = &text[raw.body_start..raw.body_end];
    let (content, replacement, author) = match raw.kind {
        AnnotationKind::Substitute => {
            let (old, new) = body.split_once(SUBSTITUTE_ARROW).unwrap_or((body, ""));
            (old.to_owned(), Some(new.to_owned()), None)
        }
        AnnotationKind::Comment => {
            let (author, content) = split_author(body);
            (content.to_owned(), None, author.map(str::to_owned))
        }
        _ => (body.to_owned(), None, None),
    };
    Annotation {
        kind: raw.kind,
        content,
        replacement,
        author,
        position: raw.start,
        end: raw.end,
        line: lines.line_of(raw.start),
        before: chars_before(text, raw.start, CONTEXT_CHARS).to_owned(),
        after: chars_after(text, raw.end, CONTEXT_CHARS).to_owned(),
        resolved: false,
    }
}

/// Split `Author: text` comment bodies. The colon must sit close to the
/// start and the prefix must be a plausible single-line name.
fn split_author(body: &str) -> (Option<&str>, &str) {
    match body.find(':') {
        Some(colon) if colon > 0 && colon <= AUTHOR_PREFIX_LIMIT => {
            let prefix = &body[..colon];
            if prefix.contains('\n') || prefix.trim().is_empty() {
                (None, body)
            } else {
                (Some(prefix.trim()), body[colon + 1..].trim_start())
            }
        }
        _ => (None, body),
    }
}

/// Up to `count` characters of text ending at byte offset `at`.
fn chars_before(text: &str, at: usize, count: usize) -> &str {
    let mut start = at;
    for (taken, (idx, _)) in text[..at].char_indices().rev().enumerate() {
        start = idx;
        if taken + 1 == count {
            break;
        }
    }
    &text[start..at]
}

/// Up to `count` characters of text starting at byte offset `at`.
fn chars_after(text: &str, at: usize, count: usize) -> &str {
    match text[at..].char_indices().nth(count) {
        Some((idx, _)) => &text[at..at + idx],
        None => &text[at..],
    }
}

/// Byte offsets of line starts, for 1-based line lookups.
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(at, _)| at + 1));
        Self { line_starts }
    }

    fn line_of(&self, offset: usize) -> u32 {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        u32::try_from(line).unwrap_or(u32::MAX)
    }
}
