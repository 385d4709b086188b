//! Multi-reviewer change extraction and conflict detection.
//!
//! Every reviewer text is diffed against the same base, the resulting
//! changes are expressed as half-open byte ranges over that base, and
//! changes whose ranges contend for the same region are grouped into
//! conflicts. Everything else can be applied mechanically.

use std::collections::HashSet;
use std::thread;

use galley_api::{Change, Conflict, RevisionSubmission};
use tracing::debug;

use crate::diff::{DiffEngine, DiffOptions, EditKind, EditOp};

/// Changes partitioned into what merges cleanly and what needs a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    /// Non-contending changes, sorted by range.
    pub mergeable: Vec<Change>,
    /// Groups of contending changes, ids sequential from zero.
    pub conflicts: Vec<Conflict>,
}

impl MergePlan {
    /// Whether every change can be applied without a decision.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Diff one reviewer's text against the base and express the differences
/// as changes over base byte offsets.
pub fn extract_changes(
    base: &str,
    revision: &str,
    reviewer: &str,
    options: &DiffOptions,
) -> Vec<Change> {
    let script = DiffEngine::with_options(options.clone()).diff(base, revision);
    changes_from_script(&script, reviewer)
}

/// Extract every submission's changes, one worker thread per reviewer,
/// flattened in submission order.
pub fn extract_all(
    base: &str,
    submissions: &[RevisionSubmission],
    options: &DiffOptions,
) -> Vec<Change> {
    thread::scope(|scope| {
        let workers: Vec<_> = submissions
            .iter()
            .map(|submission| {
                scope.spawn(move || {
                    extract_changes(base, &submission.text, &submission.reviewer, options)
                })
            })
            .collect();
        let mut changes = Vec::new();
        for worker in workers {
            match worker.join() {
                Ok(extracted) => changes.extend(extracted),
                Err(payload) => std::panic::resume_unwind(payload),
            }
        }
        changes
    })
}

/// Partition changes into mergeable ones and conflict groups.
///
/// Exact duplicates, where several reviewers made the same edit to the same
/// range, collapse to a single change attributed to the latest submission.
/// The survivors are grouped by range overlap; each group of two or more
/// becomes a conflict carrying the base text under the union of its ranges.
/// The sort is stable, so changes contending for the same range stay in
/// submission order within their conflict.
pub fn detect_conflicts(base: &str, mut changes: Vec<Change>) -> MergePlan {
    let total = changes.len();
    changes.sort_by_key(|change| (change.start, change.end));
    let changes = dedup_exact(changes);

    let mut plan = MergePlan {
        mergeable: Vec::new(),
        conflicts: Vec::new(),
    };
    let mut group: Vec<Change> = Vec::new();
    for change in changes {
        if group.is_empty() || group.iter().any(|member| member.overlaps(&change)) {
            group.push(change);
        } else {
            finish_group(base, std::mem::take(&mut group), &mut plan);
            group.push(change);
        }
    }
    finish_group(base, group, &mut plan);

    debug!(
        total,
        mergeable = plan.mergeable.len(),
        conflicts = plan.conflicts.len(),
        "partitioned reviewer changes"
    );
    plan
}

/// Drop all but the last copy of each exact `(start, end, new_text)`
/// duplicate. Walking in reverse keeps the latest submission's copy, so
/// its reviewer attribution survives.
fn dedup_exact(changes: Vec<Change>) -> Vec<Change> {
    let mut seen: HashSet<(usize, usize, String)> = HashSet::new();
    let mut survivors: Vec<Change> = changes
        .into_iter()
        .rev()
        .filter(|change| seen.insert((change.start, change.end, change.new_text.clone())))
        .collect();
    survivors.reverse();
    survivors
}

fn finish_group(base: &str, group: Vec<Change>, plan: &mut MergePlan) {
    match group.len() {
        0 => {}
        1 => plan.mergeable.extend(group),
        _ => {
            let start = group.iter().map(|change| change.start).min().unwrap_or(0);
            let end = group.iter().map(|change| change.end).max().unwrap_or(start);
            let id = plan.conflicts.len() as u64;
            plan.conflicts
                .push(Conflict::new(id, &base[start..end], group));
        }
    }
}

/// Walk an edit script, tracking the base offset, and emit one change per
/// changed region.
fn changes_from_script(script: &[EditOp], reviewer: &str) -> Vec<Change> {
    let mut changes = Vec::new();
    let mut offset = 0usize;
    let mut index = 0;
    while index < script.len() {
        if script[index].kind == EditKind::Equal {
            offset += script[index].text().len();
            index += 1;
            continue;
        }
        let start = offset;
        let mut old_text = String::new();
        let mut new_text = String::new();
        while index < script.len() && script[index].kind != EditKind::Equal {
            match script[index].kind {
                EditKind::Delete => {
                    let text = script[index].text();
                    offset += text.len();
                    old_text.push_str(&text);
                }
                EditKind::Insert => new_text.push_str(&script[index].text()),
                EditKind::Equal => {}
            }
            index += 1;
        }
        changes.push(match (old_text.is_empty(), new_text.is_empty()) {
            (true, _) => Change::insert(reviewer, start, new_text),
            (false, true) => Change::delete(reviewer, start, offset, old_text),
            (false, false) => Change::replace(reviewer, start, offset, old_text, new_text),
        });
    }
    changes
}

/// Rebuild a document by applying sorted, non-overlapping replacements in
/// one left-to-right pass.
pub(crate) fn splice(base: &str, replacements: &[(usize, usize, &str)]) -> String {
    debug_assert!(replacements
        .windows(2)
        .all(|pair| pair[0].1 <= pair[1].0));
    let mut out = String::with_capacity(base.len());
    let mut cursor = 0;
    for &(start, end, text) in replacements {
        out.push_str(&base[cursor..start]);
        out.push_str(text);
        cursor = end;
    }
    out.push_str(&base[cursor..]);
    out
}
