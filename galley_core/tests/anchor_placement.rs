use galley_api::{AnnotationKind, CommentRecord};
use galley_core::markup;
use galley_core::place_comments;

#[test]
fn comments_spread_over_repeated_anchors_in_submission_order() {
    let text = "alpha word beta word gamma word delta";
    let comments = [
        CommentRecord::new("c-1", "first note", "word").with_context(Some("Ana"), None, None),
        CommentRecord::new("c-2", "second note", "word").with_context(Some("Ben"), None, None),
        CommentRecord::new("c-3", "third note", "word").with_context(Some("Cay"), None, None),
    ];
    let outcome = place_comments(text, &comments);

    assert!(outcome.is_complete());
    assert_eq!(
        outcome.text,
        "alpha word{>>Ana: first note<<} beta word{>>Ben: second note<<} \
         gamma word{>>Cay: third note<<} delta"
    );
    let starts: Vec<usize> = outcome
        .placements
        .iter()
        .map(|placement| placement.start)
        .collect();
    assert_eq!(starts, vec![6, 16, 27]);

    let annotations = markup::parse(&outcome.text);
    assert_eq!(annotations.len(), 3);
    for (annotation, record) in annotations.iter().zip(&comments) {
        assert_eq!(annotation.kind, AnnotationKind::Comment);
        assert_eq!(annotation.author, record.author);
        assert_eq!(annotation.content, record.text);
    }
}

#[test]
fn context_hints_override_submission_order() {
    let text = "The model failed once. The model held twice.";
    let comments = [
        CommentRecord::new("c-1", "note the hold", "model").with_context(
            None,
            None,
            Some(" held"),
        ),
        CommentRecord::new("c-2", "note the failure", "model").with_context(
            None,
            None,
            Some(" failed"),
        ),
    ];
    let outcome = place_comments(text, &comments);

    assert_eq!(
        outcome.text,
        "The model{>>note the failure<<} failed once. The model{>>note the hold<<} held twice."
    );
    assert_eq!(outcome.placements[0].record.id, "c-1");
    assert_eq!(outcome.placements[0].start, 27);
    assert_eq!(outcome.placements[1].record.id, "c-2");
    assert_eq!(outcome.placements[1].start, 4);
}

#[test]
fn missing_anchors_are_reported_not_fatal() {
    let text = "The data supports the claim.";
    let comments = [
        CommentRecord::new("c-1", "where?", "hypothesis"),
        CommentRecord::new("c-2", "needs a source", "claim"),
    ];
    let outcome = place_comments(text, &comments);

    assert!(!outcome.is_complete());
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].id, "c-1");
    assert_eq!(outcome.text, "The data supports the claim{>>needs a source<<}.");
}

#[test]
fn rewrapped_anchors_match_after_whitespace_normalization() {
    let text = "The method was applied\nto the corpus at scale.";
    let comments = [CommentRecord::new("c-1", "which corpus?", "applied to the corpus")];
    let outcome = place_comments(text, &comments);

    assert!(outcome.is_complete());
    assert_eq!(
        outcome.text,
        "The method was applied\nto the corpus{>>which corpus?<<} at scale."
    );
}

#[test]
fn placement_leaves_the_original_text_recoverable() {
    let text = "Results in [@doe2021] were strong.";
    let comments = [CommentRecord::new("c-1", "check this citation", "[@doe2021]")
        .with_context(Some("Ana"), None, None)];
    let outcome = place_comments(text, &comments);

    assert_eq!(
        outcome.text,
        "Results in [@doe2021]{>>Ana: check this citation<<} were strong."
    );
    assert_eq!(markup::strip(&outcome.text, true), outcome.text);
    assert_eq!(markup::strip(&outcome.text, false), text);

    let annotations = markup::parse(&outcome.text);
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].author.as_deref(), Some("Ana"));
    assert_eq!(annotations[0].content, "check this citation");
    assert_eq!(annotations[0].position, 21);
}
