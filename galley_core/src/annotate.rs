//! Renders edit scripts as inline CriticMarkup.
//!
//! Each changed region becomes one marker: an insertion, a deletion, or a
//! substitution when a region carries text on both sides. Protected spans
//! that appear identically on both sides of a region are snapped back into
//! the surrounding plain text so a citation or math run never ends up
//! inside a marker it does not belong to.

use galley_api::{AnnotationKind, ReviewStats};

use crate::diff::{DiffEngine, DiffOptions, EditKind, EditOp};
use crate::markup;
use crate::token::Token;

/// A document whose revisions are expressed as inline markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedDocument {
    /// Original text with change markers woven in.
    pub text: String,
    /// Tally of the markers that were emitted.
    pub stats: ReviewStats,
}

/// Diff `original` against `revised` and render the changes as markers.
pub fn annotate_revision(original: &str, revised: &str, options: DiffOptions) -> AnnotatedDocument {
    let script = DiffEngine::with_options(options).diff(original, revised);
    render(&script)
}

/// Render a canonical edit script as CriticMarkup.
pub fn render(script: &[EditOp]) -> AnnotatedDocument {
    let mut text = String::new();
    let mut stats = ReviewStats::ZERO;
    let mut index = 0;
    while index < script.len() {
        if script[index].kind == EditKind::Equal {
            text.push_str(&script[index].text());
            index += 1;
            continue;
        }
        let mut deleted: Vec<Token> = Vec::new();
        let mut inserted: Vec<Token> = Vec::new();
        while index < script.len() && script[index].kind != EditKind::Equal {
            match script[index].kind {
                EditKind::Delete => deleted.extend(script[index].tokens.iter().cloned()),
                EditKind::Insert => inserted.extend(script[index].tokens.iter().cloned()),
                EditKind::Equal => {}
            }
            index += 1;
        }
        emit_region(deleted, inserted, &mut text, &mut stats);
    }
    AnnotatedDocument { text, stats }
}

/// Emit one changed region as a marker, snapping identical protected
/// boundary tokens back out of the marker first.
fn emit_region(
    mut deleted: Vec<Token>,
    mut inserted: Vec<Token>,
    out: &mut String,
    stats: &mut ReviewStats,
) {
    while matching_protected(deleted.first(), inserted.first()) {
        inserted.remove(0);
        out.push_str(&deleted.remove(0).text);
    }
    let mut tail = String::new();
    while matching_protected(deleted.last(), inserted.last()) {
        inserted.pop();
        if let Some(token) = deleted.pop() {
            tail.insert_str(0, &token.text);
        }
    }

    let full_old = join(&deleted);
    let full_new = join(&inserted);
    let prefix = word_aligned_prefix(&full_old, &full_new);
    let suffix = word_aligned_suffix(&full_old[prefix..], &full_new[prefix..]);
    out.push_str(&full_old[..prefix]);
    let old_text = &full_old[prefix..full_old.len() - suffix];
    let new_text = &full_new[prefix..full_new.len() - suffix];

    match (old_text.is_empty(), new_text.is_empty()) {
        (true, true) => {}
        (true, false) => {
            out.push_str(markup::INSERT_OPEN);
            out.push_str(new_text);
            out.push_str(markup::INSERT_CLOSE);
            stats.record(AnnotationKind::Insert);
        }
        (false, true) => {
            out.push_str(markup::DELETE_OPEN);
            out.push_str(old_text);
            out.push_str(markup::DELETE_CLOSE);
            stats.record(AnnotationKind::Delete);
        }
        (false, false) => {
            out.push_str(markup::SUBSTITUTE_OPEN);
            out.push_str(old_text);
            out.push_str(markup::SUBSTITUTE_ARROW);
            out.push_str(new_text);
            out.push_str(markup::SUBSTITUTE_CLOSE);
            stats.record(AnnotationKind::Substitute);
        }
    }
    out.push_str(&full_old[full_old.len() - suffix..]);
    out.push_str(&tail);
}

fn matching_protected(a: Option<&Token>, b: Option<&Token>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x.is_protected() && y.is_protected() && x.text == y.text,
        _ => false,
    }
}

fn join(tokens: &[Token]) -> String {
    tokens.iter().map(|token| token.text.as_str()).collect()
}

/// Byte length of the longest common prefix of both sides that breaks at a
/// word boundary, so a marker never opens in the middle of a word unless
/// one side is a strict extension of the other.
fn word_aligned_prefix(old_text: &str, new_text: &str) -> usize {
    let mut len = old_text
        .char_indices()
        .zip(new_text.chars())
        .take_while(|((_, a), b)| a == b)
        .last()
        .map_or(0, |((idx, ch), _)| idx + ch.len_utf8());
    loop {
        let clean = len == old_text.len()
            || len == new_text.len()
            || old_text[..len].ends_with(char::is_whitespace);
        if len == 0 || clean {
            return len;
        }
        match old_text[..len].chars().next_back() {
            Some(ch) => len -= ch.len_utf8(),
            None => return 0,
        }
    }
}

/// Suffix counterpart of [`word_aligned_prefix`].
fn word_aligned_suffix(old_text: &str, new_text: &str) -> usize {
    let mut len = old_text
        .chars()
        .rev()
        .zip(new_text.chars().rev())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .sum();
    loop {
        let clean = len == old_text.len()
            || len == new_text.len()
            || old_text[old_text.len() - len..].starts_with(char::is_whitespace);
        if len == 0 || clean {
            return len;
        }
        match old_text[old_text.len() - len..].chars().next() {
            Some(ch) => len -= ch.len_utf8(),
            None => return 0,
        }
    }
}
