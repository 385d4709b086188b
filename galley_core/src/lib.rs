//! Core library for Galley's manuscript review workflow.
//!
//! The crate is layered around three primary responsibilities:
//! - diffing a reviewed text against its original into inline CriticMarkup
//!   annotations, with citations, math, and anchors kept intact
//! - reconciling several reviewers' independent revisions of one base
//!   document, detecting conflicts and rebuilding merged text
//! - placing externally extracted comments back into a document by fuzzy
//!   anchor matching

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

/// Comment placement by context-scored anchor matching.
pub mod anchor;
/// Edit-script rendering as inline CriticMarkup.
pub mod annotate;
/// Token-level diff generation.
pub mod diff;
/// CriticMarkup parsing, decisions, and stripping.
pub mod markup;
/// Multi-reviewer change extraction and conflict detection.
pub mod merge;
/// Merge sessions, conflict resolution, and snapshot persistence.
pub mod session;
/// Protected-span tagging for citations, math, anchors, and references.
pub mod span;
/// Tokenization of text into diff units.
pub mod token;

pub use anchor::{place_comments, PlacedComment, PlacementOutcome};
pub use annotate::{annotate_revision, AnnotatedDocument};
pub use diff::{DiffEngine, DiffOptions, EditKind, EditOp};
pub use merge::MergePlan;
pub use session::{merge_revisions, MergeError, MergeSession, SnapshotError};
pub use span::ProtectedSpan;
pub use token::{Granularity, Token};

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Recording a conflict decision failed.
    #[error("merge error: {source}")]
    Merge {
        /// Original error raised while resolving a conflict.
        #[from]
        source: MergeError,
    },
    /// Persisting or restoring a session snapshot failed.
    #[error("snapshot error: {source}")]
    Snapshot {
        /// Original error raised by snapshot persistence.
        #[from]
        source: SnapshotError,
    },
}
