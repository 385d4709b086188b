//! Places externally extracted comments back into a document.
//!
//! A comment arrives with the text it was anchored to and, when the
//! exporting tool provides them, short context strings from either side of
//! that anchor. The resolver finds every occurrence of the anchor, scores
//! each one by how well its surroundings agree with the expected context,
//! and attaches the comment after the best match. Ties fall to document
//! order, skipping occurrences already claimed by an earlier comment of the
//! same batch, so repeated context-free anchors spread over successive
//! occurrences instead of piling onto the first.

use std::collections::HashSet;

use galley_api::CommentRecord;
use tracing::debug;

use crate::markup;
use crate::merge;

/// Characters of document text weighed on each side of an occurrence when
/// scoring context agreement.
const CONTEXT_WINDOW: usize = 48;

/// One comment attached to a resolved anchor occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedComment {
    /// The record that was placed.
    pub record: CommentRecord,
    /// Byte offset where the anchor occurrence starts in the target text.
    pub start: usize,
    /// Byte offset one past the occurrence; the marker is inserted here.
    pub end: usize,
}

/// Result of placing a batch of comments into one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementOutcome {
    /// Target text with one comment marker inserted per placed record.
    pub text: String,
    /// Where each placed comment landed, in submission order.
    pub placements: Vec<PlacedComment>,
    /// Records whose anchor text was never found, in submission order.
    pub skipped: Vec<CommentRecord>,
}

impl PlacementOutcome {
    /// Whether every submitted comment found its anchor.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Place every comment whose anchor can be found in `text`.
///
/// Records are processed in submission order; each claims the occurrence of
/// its anchor that best matches its context hints and receives a
/// `{>>Author: text<<}` marker immediately after the anchor. Records whose
/// anchor never occurs, even after whitespace normalization, are returned
/// in `skipped` rather than failing the batch.
#[must_use]
pub fn place_comments(text: &str, records: &[CommentRecord]) -> PlacementOutcome {
    let mut claimed: HashSet<usize> = HashSet::new();
    let mut placements: Vec<PlacedComment> = Vec::new();
    let mut skipped: Vec<CommentRecord> = Vec::new();

    for record in records {
        match resolve(text, record, &claimed) {
            Some((start, end)) => {
                claimed.insert(start);
                placements.push(PlacedComment {
                    record: record.clone(),
                    start,
                    end,
                });
            }
            None => {
                debug!(
                    id = %record.id,
                    anchor = %record.anchor,
                    "comment anchor not found, skipping"
                );
                skipped.push(record.clone());
            }
        }
    }

    let markers: Vec<(usize, String)> = placements
        .iter()
        .map(|placement| (placement.end, marker(&placement.record)))
        .collect();
    let mut insertions: Vec<(usize, usize, &str)> = markers
        .iter()
        .map(|(at, body)| (*at, *at, body.as_str()))
        .collect();
    insertions.sort_by_key(|&(at, ..)| at);

    PlacementOutcome {
        text: merge::splice(text, &insertions),
        placements,
        skipped,
    }
}

/// Pick the anchor occurrence a record attaches to, if any exists.
///
/// Among the highest-scoring occurrences the first unclaimed one in
/// document order wins; when every one of them is claimed the comment
/// shares the first, which keeps a batch with more comments than
/// occurrences from losing records.
fn resolve(
    text: &str,
    record: &CommentRecord,
    claimed: &HashSet<usize>,
) -> Option<(usize, usize)> {
    let query = ContextQuery::new(record);
    let scored: Vec<(usize, (usize, usize))> = occurrences(text, &record.anchor)
        .into_iter()
        .map(|occurrence| (query.agreement(text, occurrence), occurrence))
        .collect();
    let best = scored.iter().map(|&(score, _)| score).max()?;
    let winners = scored
        .iter()
        .filter(move |&&(score, _)| score == best)
        .map(|&(_, occurrence)| occurrence);
    winners
        .clone()
        .find(|(start, _)| !claimed.contains(start))
        .or_else(|| winners.clone().next())
}

/// Byte ranges where `anchor` occurs in `text`.
///
/// Exact matches win; when there are none, both sides are compared with
/// whitespace runs collapsed, which recovers anchors that an extraction
/// service re-wrapped across lines.
fn occurrences(text: &str, anchor: &str) -> Vec<(usize, usize)> {
    if anchor.is_empty() {
        return Vec::new();
    }
    let exact: Vec<(usize, usize)> = text
        .match_indices(anchor)
        .map(|(at, found)| (at, at + found.len()))
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    let needle = collapse_whitespace(anchor);
    if needle.is_empty() {
        return Vec::new();
    }
    let (haystack, offsets) = collapse_with_offsets(text);
    haystack
        .match_indices(&needle)
        .map(|(at, found)| {
            let start = offsets[at];
            let end = offsets.get(at + found.len()).copied().unwrap_or(text.len());
            (start, end)
        })
        .collect()
}

/// The marker text for one comment: `{>>Author: text<<}`, or `{>>text<<}`
/// when the record carries no author.
fn marker(record: &CommentRecord) -> String {
    let mut out = String::from(markup::COMMENT_OPEN);
    if let Some(author) = &record.author {
        out.push_str(author);
        out.push_str(": ");
    }
    out.push_str(&record.text);
    out.push_str(markup::COMMENT_CLOSE);
    out
}

/// A record's context hints, whitespace-collapsed once for the whole batch
/// of occurrences it is scored against.
struct ContextQuery {
    before: Option<String>,
    after: Option<String>,
}

impl ContextQuery {
    fn new(record: &CommentRecord) -> Self {
        Self {
            before: record.before.as_deref().map(collapse_whitespace),
            after: record.after.as_deref().map(collapse_whitespace),
        }
    }

    /// Agreement between the expected context and the text around one
    /// occurrence: the longest common suffix of the text before it plus
    /// the longest common prefix of the text after it, in characters.
    fn agreement(&self, text: &str, (start, end): (usize, usize)) -> usize {
        let mut score = 0;
        if let Some(expected) = &self.before {
            let window = collapse_whitespace(tail_window(text, start));
            score += common_suffix_chars(expected, &window);
        }
        if let Some(expected) = &self.after {
            let window = collapse_whitespace(head_window(text, end));
            score += common_prefix_chars(expected, &window);
        }
        score
    }
}

/// Up to [`CONTEXT_WINDOW`] bytes of text ending at `at`, snapped to a
/// character boundary.
fn tail_window(text: &str, at: usize) -> &str {
    let mut start = at.saturating_sub(CONTEXT_WINDOW);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..at]
}

/// Up to [`CONTEXT_WINDOW`] bytes of text starting at `at`, snapped to a
/// character boundary.
fn head_window(text: &str, at: usize) -> &str {
    let mut end = (at + CONTEXT_WINDOW).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[at..end]
}

fn common_suffix_chars(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

fn common_prefix_chars(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// `text` with every whitespace run replaced by a single space.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

/// Whitespace-collapsed copy of `text` plus, for every byte of the copy,
/// the offset of the original text it came from.
fn collapse_with_offsets(text: &str) -> (String, Vec<usize>) {
    let mut collapsed = String::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len());
    let mut in_run = false;
    for (at, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if !in_run {
                collapsed.push(' ');
                offsets.push(at);
            }
            in_run = true;
        } else {
            collapsed.push(ch);
            offsets.extend(std::iter::repeat(at).take(ch.len_utf8()));
            in_run = false;
        }
    }
    (collapsed, offsets)
}
