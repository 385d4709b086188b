//! Merge sessions: conflict resolution state and snapshot persistence.
//!
//! A session owns the outcome of one merge invocation. Decisions are
//! recorded against conflict ids, and the merged document is rebuilt from
//! the base text on every read rather than mutated in place, so offsets
//! recorded at detection time stay valid for the whole session.

use std::fs;
use std::path::Path;

use galley_api::{AnnotationKind, Change, ChangeKind, Conflict, MergeSnapshot, ReviewStats, RevisionSubmission};
use tracing::{debug, warn};

use crate::diff::DiffOptions;
use crate::merge::{self, MergePlan};

/// Reviewer name attached to changes re-derived from a snapshot's merged
/// text, where the original attributions are no longer available.
const REPLAYED_REVIEWER: &str = "merged";

/// Errors surfaced while recording conflict decisions.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Resolution addressed a conflict id this session does not contain.
    #[error("unknown conflict id {id}")]
    UnknownConflict {
        /// The id that failed to resolve.
        id: u64,
    },
    /// Resolution chose an alternative index past the end of the conflict's
    /// change list.
    #[error("conflict {id} has {available} changes; choice {choice} is out of range")]
    ChoiceOutOfRange {
        /// The conflict being resolved.
        id: u64,
        /// The out-of-range index.
        choice: usize,
        /// Number of changes the conflict actually holds.
        available: usize,
    },
}

/// Errors surfaced while persisting or restoring session snapshots.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Snapshot file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Filesystem path involved in the failed operation.
        path: String,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
    /// Snapshot could not be encoded as JSON.
    #[error("failed to encode snapshot: {source}")]
    Serialize {
        /// Underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
    /// Snapshot file did not contain a valid snapshot document.
    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        /// Path of the malformed snapshot.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// The resumable state of one merge invocation.
#[derive(Debug, Clone)]
pub struct MergeSession {
    base: String,
    mergeable: Vec<Change>,
    conflicts: Vec<Conflict>,
}

impl MergeSession {
    /// Diff every submission against `base` and partition the changes.
    #[must_use]
    pub fn new(
        base: impl Into<String>,
        submissions: &[RevisionSubmission],
        options: &DiffOptions,
    ) -> Self {
        let base = base.into();
        let changes = merge::extract_all(&base, submissions, options);
        let MergePlan {
            mergeable,
            conflicts,
        } = merge::detect_conflicts(&base, changes);
        debug!(
            reviewers = submissions.len(),
            mergeable = mergeable.len(),
            conflicts = conflicts.len(),
            "opened merge session"
        );
        Self {
            base,
            mergeable,
            conflicts,
        }
    }

    /// The base document the submissions were compared against.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Changes that apply without a decision.
    #[must_use]
    pub fn mergeable(&self) -> &[Change] {
        &self.mergeable
    }

    /// All detected conflicts, with any recorded decisions.
    #[must_use]
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// Number of conflicts still awaiting a decision.
    #[must_use]
    pub fn unresolved(&self) -> usize {
        self.conflicts
            .iter()
            .filter(|conflict| !conflict.is_resolved())
            .count()
    }

    /// Record the accepted alternative for a conflict. Resolving the same
    /// conflict again overwrites the earlier decision.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::UnknownConflict`] when `id` does not name a
    /// conflict in this session and [`MergeError::ChoiceOutOfRange`] when
    /// `choice` does not index the conflict's changes. Either way no state
    /// changes and the conflict stays unresolved.
    pub fn resolve(&mut self, id: u64, choice: usize) -> std::result::Result<(), MergeError> {
        let Some(conflict) = self
            .conflicts
            .iter_mut()
            .find(|conflict| conflict.id == id)
        else {
            warn!(id, "resolution addressed an unknown conflict");
            return Err(MergeError::UnknownConflict { id });
        };
        if choice >= conflict.changes.len() {
            warn!(
                id,
                choice,
                available = conflict.changes.len(),
                "resolution choice is out of range"
            );
            return Err(MergeError::ChoiceOutOfRange {
                id,
                choice,
                available: conflict.changes.len(),
            });
        }
        conflict.resolved = Some(choice);
        Ok(())
    }

    /// The merged document: base text with every mergeable change and every
    /// resolved conflict's winning change applied. Unresolved conflict
    /// regions keep the base text.
    #[must_use]
    pub fn merged_text(&self) -> String {
        self.rebuild(true)
    }

    /// Counts of the changes currently applied by [`Self::merged_text`].
    #[must_use]
    pub fn stats(&self) -> ReviewStats {
        let mut stats = ReviewStats::ZERO;
        for change in self.applied_changes(true) {
            stats.record(match change.kind {
                ChangeKind::Insert => AnnotationKind::Insert,
                ChangeKind::Delete => AnnotationKind::Delete,
                ChangeKind::Replace => AnnotationKind::Substitute,
            });
        }
        stats
    }

    /// Persistent form of the session.
    ///
    /// The snapshot's `merged` field holds the auto-merged text, with only
    /// the non-conflicting changes applied; decisions live on the conflicts
    /// themselves. That keeps every stored offset in base coordinates.
    #[must_use]
    pub fn snapshot(&self) -> MergeSnapshot {
        MergeSnapshot {
            base: self.base.clone(),
            merged: self.rebuild(false),
            conflicts: self.conflicts.clone(),
        }
    }

    /// Rebuild a session from its persistent form. The mergeable changes
    /// are re-derived by diffing the stored base against the stored merged
    /// text instead of trusting any partially updated buffer.
    #[must_use]
    pub fn from_snapshot(snapshot: MergeSnapshot, options: &DiffOptions) -> Self {
        let MergeSnapshot {
            base,
            merged,
            conflicts,
        } = snapshot;
        let mergeable = merge::extract_changes(&base, &merged, REPLAYED_REVIEWER, options);
        Self {
            base,
            mergeable,
            conflicts,
        }
    }

    /// Write the session snapshot to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Serialize`] when the snapshot cannot be
    /// encoded and [`SnapshotError::Io`] when the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> std::result::Result<(), SnapshotError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, json).map_err(|source| SnapshotError::Io {
            path: display_path(path),
            source,
        })
    }

    /// Read a snapshot from `path` and rebuild the session.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] when the file cannot be read and
    /// [`SnapshotError::Parse`] when its contents are not a snapshot.
    pub fn load(
        path: impl AsRef<Path>,
        options: &DiffOptions,
    ) -> std::result::Result<Self, SnapshotError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: display_path(path),
            source,
        })?;
        let snapshot: MergeSnapshot =
            serde_json::from_str(&json).map_err(|source| SnapshotError::Parse {
                path: display_path(path),
                source,
            })?;
        Ok(Self::from_snapshot(snapshot, options))
    }

    fn applied_changes(&self, include_winners: bool) -> impl Iterator<Item = &Change> {
        let winners = self
            .conflicts
            .iter()
            .filter(move |_| include_winners)
            .filter_map(|conflict| {
                conflict
                    .resolved
                    .and_then(|choice| conflict.changes.get(choice))
            });
        self.mergeable.iter().chain(winners)
    }

    /// Apply the current change set to the base in one pass.
    fn rebuild(&self, include_winners: bool) -> String {
        let mut replacements: Vec<(usize, usize, &str)> = self
            .applied_changes(include_winners)
            .map(|change| (change.start, change.end, change.new_text.as_str()))
            .collect();
        replacements.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        merge::splice(&self.base, &replacements)
    }
}

/// Diff every submission against `base` and open a session over the
/// partitioned changes. Equivalent to [`MergeSession::new`].
#[must_use]
pub fn merge_revisions(
    base: impl Into<String>,
    submissions: &[RevisionSubmission],
    options: &DiffOptions,
) -> MergeSession {
    MergeSession::new(base, submissions, options)
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
