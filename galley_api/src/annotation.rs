use serde::{Deserialize, Serialize};

/// The five CriticMarkup annotation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// Inserted text: `{++text++}`.
    Insert,
    /// Deleted text: `{--text--}`.
    Delete,
    /// Replacement of one run by another: `{~~old~>new~~}`.
    Substitute,
    /// Reviewer commentary: `{>>Author: note<<}`.
    Comment,
    /// Highlighted text: `{==text==}`.
    Highlight,
}

/// A single parsed annotation marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Category of the marker.
    pub kind: AnnotationKind,
    /// Primary payload: inserted text, deleted text, the old side of a
    /// substitution, comment body, or highlighted text.
    pub content: String,
    /// New side of a substitution; `None` for every other kind.
    #[serde(default)]
    pub replacement: Option<String>,
    /// Author name extracted from a comment body, when present.
    #[serde(default)]
    pub author: Option<String>,
    /// Byte offset of the opening brace in the annotated document.
    pub position: usize,
    /// Byte offset one past the closing brace.
    pub end: usize,
    /// 1-based line number of the opening brace.
    pub line: u32,
    /// Up to a few dozen characters of text preceding the marker.
    #[serde(default)]
    pub before: String,
    /// Up to a few dozen characters of text following the marker.
    #[serde(default)]
    pub after: String,
    /// Whether a decision has been recorded for this annotation.
    #[serde(default)]
    pub resolved: bool,
}

impl Annotation {
    /// Text the marker contributes once a reviewer decision is applied.
    ///
    /// Accepting an insertion keeps its content, accepting a deletion drops
    /// it, and accepting a substitution swaps in the replacement. Rejecting
    /// inverts each of those. Comments contribute nothing either way, and
    /// highlights always keep their content.
    pub fn apply_decision(&self, accept: bool) -> &str {
        match (self.kind, accept) {
            (AnnotationKind::Insert, true) | (AnnotationKind::Delete, false) => &self.content,
            (AnnotationKind::Insert, false)
            | (AnnotationKind::Delete, true)
            | (AnnotationKind::Comment, _) => "",
            (AnnotationKind::Substitute, true) => self.replacement.as_deref().unwrap_or(""),
            (AnnotationKind::Substitute, false) | (AnnotationKind::Highlight, _) => &self.content,
        }
    }

    /// Return a copy with the resolved flag set.
    #[must_use]
    pub fn with_resolved(mut self, resolved: bool) -> Self {
        self.resolved = resolved;
        self
    }
}

/// Counts of annotations by category.
///
/// Highlights mark text without proposing a change, so they are excluded
/// from `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReviewStats {
    /// Number of insertion markers.
    pub insertions: u32,
    /// Number of deletion markers.
    pub deletions: u32,
    /// Number of substitution markers.
    pub substitutions: u32,
    /// Number of comment markers.
    pub comments: u32,
    /// Sum of the four counted categories.
    pub total: u32,
}

impl ReviewStats {
    /// A stats instance with every counter at zero.
    pub const ZERO: Self = Self {
        insertions: 0,
        deletions: 0,
        substitutions: 0,
        comments: 0,
        total: 0,
    };

    /// Record one annotation of the given kind.
    pub fn record(&mut self, kind: AnnotationKind) {
        match kind {
            AnnotationKind::Insert => self.insertions += 1,
            AnnotationKind::Delete => self.deletions += 1,
            AnnotationKind::Substitute => self.substitutions += 1,
            AnnotationKind::Comment => self.comments += 1,
            AnnotationKind::Highlight => return,
        }
        self.total += 1;
    }

    /// Combine two stats structs.
    pub const fn add(self, other: Self) -> Self {
        Self {
            insertions: self.insertions + other.insertions,
            deletions: self.deletions + other.deletions,
            substitutions: self.substitutions + other.substitutions,
            comments: self.comments + other.comments,
            total: self.total + other.total,
        }
    }

    /// Count a batch of parsed annotations.
    pub fn tally(annotations: &[Annotation]) -> Self {
        let mut stats = Self::ZERO;
        for annotation in annotations {
            stats.record(annotation.kind);
        }
        stats
    }
}
