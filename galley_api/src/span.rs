use serde::{Deserialize, Serialize};

/// Classification of a substring that must survive diffing intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// A bracketed or inline citation such as `[@doe2021]` or `@doe2021`.
    Citation,
    /// An inline math run delimited by single dollar signs.
    InlineMath,
    /// A display math run delimited by double dollar signs.
    DisplayMath,
    /// An explicit anchor such as `{#fig:flow}`.
    Anchor,
    /// A cross-reference such as `@fig:flow`.
    CrossRef,
}

impl SpanKind {
    /// Stable lowercase name used in logs and diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            SpanKind::Citation => "citation",
            SpanKind::InlineMath => "inline_math",
            SpanKind::DisplayMath => "display_math",
            SpanKind::Anchor => "anchor",
            SpanKind::CrossRef => "cross_ref",
        }
    }
}
