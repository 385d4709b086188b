use serde::{Deserialize, Serialize};

/// The effect a reviewer change has on the base document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// New text appears at a point; `start == end`.
    Insert,
    /// A base range is removed.
    Delete,
    /// A base range is replaced by new text.
    Replace,
}

/// One reviewer edit expressed as a half-open byte range over the base text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    /// Display name of the reviewer the change came from.
    pub reviewer: String,
    /// Effect of the change.
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Byte offset where the affected range starts.
    pub start: usize,
    /// Byte offset one past the affected range; equals `start` for inserts.
    pub end: usize,
    /// Base text covered by the range; empty for inserts.
    #[serde(default)]
    pub old_text: String,
    /// Replacement text; empty for deletes.
    #[serde(default)]
    pub new_text: String,
}

impl Change {
    /// An insertion of `text` at byte offset `at`.
    pub fn insert(reviewer: impl Into<String>, at: usize, text: impl Into<String>) -> Self {
        Self {
            reviewer: reviewer.into(),
            kind: ChangeKind::Insert,
            start: at,
            end: at,
            old_text: String::new(),
            new_text: text.into(),
        }
    }

    /// A deletion of `old_text`, which occupies `[start, end)` in the base.
    pub fn delete(
        reviewer: impl Into<String>,
        start: usize,
        end: usize,
        old_text: impl Into<String>,
    ) -> Self {
        Self {
            reviewer: reviewer.into(),
            kind: ChangeKind::Delete,
            start,
            end,
            old_text: old_text.into(),
            new_text: String::new(),
        }
    }

    /// A replacement of `[start, end)` by `new_text`.
    pub fn replace(
        reviewer: impl Into<String>,
        start: usize,
        end: usize,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
    ) -> Self {
        Self {
            reviewer: reviewer.into(),
            kind: ChangeKind::Replace,
            start,
            end,
            old_text: old_text.into(),
            new_text: new_text.into(),
        }
    }

    /// Whether the change targets a point rather than a range.
    pub const fn is_zero_width(&self) -> bool {
        self.start == self.end
    }

    /// Whether two changes contend for the same region of the base text.
    ///
    /// Two zero-width changes collide only at the same offset. A zero-width
    /// change collides with a range only when its point falls strictly
    /// inside that range; insertions touching a range's edge coexist with
    /// it. Two ranges collide when they intersect.
    pub const fn overlaps(&self, other: &Self) -> bool {
        match (self.is_zero_width(), other.is_zero_width()) {
            (true, true) => self.start == other.start,
            (true, false) => other.start < self.start && self.start < other.end,
            (false, true) => self.start < other.start && other.start < self.end,
            (false, false) => self.start < other.end && other.start < self.end,
        }
    }
}

/// A group of mutually overlapping changes requiring a human decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Identifier unique within one merge session.
    pub id: u64,
    /// Base text spanned by the union of the grouped ranges.
    pub original: String,
    /// The contending changes, ordered by range then reviewer.
    pub changes: Vec<Change>,
    /// Index into `changes` of the accepted alternative, once chosen.
    #[serde(default)]
    pub resolved: Option<usize>,
}

impl Conflict {
    /// Create an unresolved conflict.
    pub fn new(id: u64, original: impl Into<String>, changes: Vec<Change>) -> Self {
        Self {
            id,
            original: original.into(),
            changes,
            resolved: None,
        }
    }

    /// Whether a decision has been recorded.
    pub const fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

/// Persistent form of a merge session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSnapshot {
    /// The base document the reviewer texts were compared against.
    pub base: String,
    /// Base text with every non-conflicting change applied.
    pub merged: String,
    /// All detected conflicts together with any recorded decisions.
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_wire_format_uses_type_and_camel_case() {
        let change = Change::replace("Ana", 10, 15, "old", "new");
        let json = serde_json::to_string(&change).expect("serialize change");
        assert!(json.contains("\"type\":\"replace\""));
        assert!(json.contains("\"oldText\":\"old\""));
        assert!(json.contains("\"newText\":\"new\""));
        assert!(!json.contains("\"kind\""));

        let decoded: Change = serde_json::from_str(&json).expect("deserialize change");
        assert_eq!(change, decoded);
    }

    #[test]
    fn snapshot_round_trip() {
        let conflict = Conflict::new(
            0,
            "their plan",
            vec![
                Change::replace("Ana", 4, 14, "their plan", "her plan"),
                Change::delete("Ben", 4, 14, "their plan"),
            ],
        );
        let snapshot = MergeSnapshot {
            base: "see their plan.".into(),
            merged: "see their plan.".into(),
            conflicts: vec![conflict],
        };
        let json = serde_json::to_string_pretty(&snapshot).expect("serialize snapshot");
        let decoded: MergeSnapshot = serde_json::from_str(&json).expect("deserialize snapshot");
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn conflict_resolved_defaults_to_none() {
        let json = r#"{
            "id": 3,
            "original": "word",
            "changes": []
        }"#;
        let decoded: Conflict = serde_json::from_str(json).expect("deserialize conflict");
        assert_eq!(decoded.resolved, None);
        assert!(!decoded.is_resolved());
    }

    #[test]
    fn zero_width_changes_collide_only_at_the_same_offset() {
        let a = Change::insert("Ana", 5, "x");
        let b = Change::insert("Ben", 5, "y");
        let c = Change::insert("Cay", 6, "z");
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn insertion_inside_a_range_collides_but_edge_contact_does_not() {
        let range = Change::delete("Ana", 4, 10, "abcdef");
        let inside = Change::insert("Ben", 7, "x");
        let at_start = Change::insert("Ben", 4, "x");
        let at_end = Change::insert("Ben", 10, "x");
        assert!(range.overlaps(&inside));
        assert!(inside.overlaps(&range));
        assert!(!range.overlaps(&at_start));
        assert!(!range.overlaps(&at_end));
    }

    #[test]
    fn ranges_collide_when_they_intersect() {
        let a = Change::replace("Ana", 0, 6, "abcdef", "x");
        let b = Change::replace("Ben", 5, 9, "fghi", "y");
        let c = Change::replace("Cay", 6, 9, "ghi", "z");
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
