use serde::{Deserialize, Serialize};

/// One reviewer's full revision of the base document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionSubmission {
    /// Display name of the reviewer.
    pub reviewer: String,
    /// Complete revised text.
    pub text: String,
}

impl RevisionSubmission {
    /// Create a new submission.
    pub fn new(reviewer: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            reviewer: reviewer.into(),
            text: text.into(),
        }
    }
}

/// A comment extracted from an external review tool, together with the
/// anchoring hints needed to place it back into the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    /// Identifier assigned by the exporting tool.
    pub id: String,
    /// Author display name, when the exporter provided one.
    #[serde(default)]
    pub author: Option<String>,
    /// Comment body.
    pub text: String,
    /// Exact text the comment was attached to.
    pub anchor: String,
    /// Context preceding the anchor in the source document.
    #[serde(default)]
    pub before: Option<String>,
    /// Context following the anchor in the source document.
    #[serde(default)]
    pub after: Option<String>,
}

impl CommentRecord {
    /// Create a record without context hints.
    pub fn new(id: impl Into<String>, text: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: None,
            text: text.into(),
            anchor: anchor.into(),
            before: None,
            after: None,
        }
    }

    /// Attach author and context hints.
    #[must_use]
    pub fn with_context(
        mut self,
        author: Option<&str>,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Self {
        self.author = author.map(str::to_owned);
        self.before = before.map(str::to_owned);
        self.after = after.map(str::to_owned);
        self
    }
}
