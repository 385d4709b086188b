use galley_api::AnnotationKind;
use galley_core::markup;
use galley_core::{annotate_revision, DiffOptions, Granularity};
use pretty_assertions::assert_eq;

const ORIGINAL: &str = "Results in [@doe2021] were strong.\n\nThe model obeys $E = mc^2$ \
                        everywhere. See @fig:flow and {#sec:results} for detail.";
const REVISED: &str = "Findings in [@doe2021] were quite strong.\n\nThe model obeys $E = mc^2$ \
                       almost everywhere. See @fig:outline and {#sec:results} for detail.";

#[test]
fn annotating_an_unchanged_document_adds_nothing() {
    let document = annotate_revision(ORIGINAL, ORIGINAL, DiffOptions::default());
    assert_eq!(document.text, ORIGINAL);
    assert_eq!(document.stats.total, 0);
    assert_eq!(markup::strip(&document.text, false), ORIGINAL);
}

#[test]
fn stripping_resolves_every_marker_back_to_either_side() {
    let document = annotate_revision(ORIGINAL, REVISED, DiffOptions::default());
    assert_eq!(markup::strip(&document.text, false), REVISED);
    assert_eq!(markup::strip_rejecting(&document.text, false), ORIGINAL);
}

#[test]
fn annotation_output_is_exact() {
    let document = annotate_revision(ORIGINAL, REVISED, DiffOptions::default());
    assert_eq!(
        document.text,
        "{~~Results~>Findings~~} in [@doe2021] were {++quite ++}strong.\n\n\
         The model obeys $E = mc^2$ {++almost ++}everywhere. See \
         {~~@fig:flow~>@fig:outline~~} and {#sec:results} for detail."
    );
    assert_eq!(document.stats.substitutions, 2);
    assert_eq!(document.stats.insertions, 2);
    assert_eq!(document.stats.deletions, 0);
    assert_eq!(document.stats.total, 4);
    assert_eq!(markup::counts(&document.text), document.stats);
}

#[test]
fn parsed_markers_are_sorted_and_non_overlapping() {
    let document = annotate_revision(ORIGINAL, REVISED, DiffOptions::default());
    let annotations = markup::parse(&document.text);
    let kinds: Vec<AnnotationKind> = annotations.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AnnotationKind::Substitute,
            AnnotationKind::Insert,
            AnnotationKind::Insert,
            AnnotationKind::Substitute,
        ]
    );
    for pair in annotations.windows(2) {
        assert!(pair[0].end <= pair[1].position);
    }
}

#[test]
fn unchanged_protected_spans_stay_outside_marker_bodies() {
    let document = annotate_revision(ORIGINAL, REVISED, DiffOptions::default());
    assert!(document.text.contains("in [@doe2021] were"));
    for annotation in markup::parse(&document.text) {
        for protected in ["[@doe2021]", "$E = mc^2$", "{#sec:results}"] {
            assert!(!annotation.content.contains(protected));
            if let Some(replacement) = &annotation.replacement {
                assert!(!replacement.contains(protected));
            }
        }
    }
}

#[test]
fn edits_on_both_sides_of_a_citation_leave_it_intact() {
    let document = annotate_revision(
        "We argue [@doe2021] holds.",
        "We claim [@doe2021] stands.",
        DiffOptions::default(),
    );
    assert_eq!(
        document.text,
        "We {~~argue~>claim~~} [@doe2021] {~~holds~>stands~~}."
    );
}

#[test]
fn applying_parsed_decisions_matches_stripping() {
    let document = annotate_revision(ORIGINAL, REVISED, DiffOptions::default());
    let annotations = markup::parse(&document.text);

    for accept in [true, false] {
        let mut rebuilt = String::new();
        let mut cursor = 0;
        for annotation in &annotations {
            rebuilt.push_str(&document.text[cursor..annotation.position]);
            rebuilt.push_str(annotation.apply_decision(accept));
            cursor = annotation.end;
        }
        rebuilt.push_str(&document.text[cursor..]);
        let expected = if accept { REVISED } else { ORIGINAL };
        assert_eq!(rebuilt, expected);
    }
}

#[test]
fn sentence_granularity_removes_whole_sentences() {
    let options = DiffOptions {
        granularity: Granularity::Sentence,
        ..DiffOptions::default()
    };
    let original = "Keep this sentence. Drop this sentence. Tail stays.";
    let revised = "Keep this sentence. Tail stays.";
    let document = annotate_revision(original, revised, options);
    assert_eq!(
        document.text,
        "Keep this sentence. {--Drop this sentence. --}Tail stays."
    );
    assert_eq!(markup::strip(&document.text, false), revised);
    assert_eq!(markup::strip_rejecting(&document.text, false), original);
}

#[test]
fn stripping_can_preserve_reviewer_comments() {
    let reviewed = "Keep {++this++} part. {>>Ana: verify the claim<<} End.";
    assert_eq!(
        markup::strip(reviewed, true),
        "Keep this part. {>>Ana: verify the claim<<} End."
    );
    assert_eq!(markup::strip(reviewed, false), "Keep this part.  End.");
}

#[test]
fn unterminated_openings_pass_through_stripping_verbatim() {
    let reviewed = "Edited {++well++} but {-- oops";
    assert_eq!(markup::strip(reviewed, false), "Edited well but {-- oops");
    assert_eq!(
        markup::strip_rejecting(reviewed, false),
        "Edited  but {-- oops"
    );
}
