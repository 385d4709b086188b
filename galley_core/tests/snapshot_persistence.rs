use galley_api::RevisionSubmission;
use galley_core::{merge_revisions, DiffOptions, MergeSession, Result, SnapshotError};
use tempfile::TempDir;

#[test]
fn snapshot_wire_format_matches_the_contract() -> Result<()> {
    let submissions = vec![
        RevisionSubmission::new("Ana", "the blue door"),
        RevisionSubmission::new("Ben", "the green door"),
    ];
    let mut session = merge_revisions("the red door", &submissions, &DiffOptions::default());

    let json = serde_json::to_string(&session.snapshot()).expect("serialize snapshot");
    let value: serde_json::Value = serde_json::from_str(&json).expect("wire json");
    assert_eq!(value["base"], "the red door");
    assert_eq!(value["merged"], "the red door");

    let conflict = &value["conflicts"][0];
    assert_eq!(conflict["id"], 0);
    assert_eq!(conflict["original"], "red ");
    assert!(conflict["resolved"].is_null());

    let change = &conflict["changes"][0];
    assert_eq!(change["reviewer"], "Ana");
    assert_eq!(change["type"], "replace");
    assert_eq!(change["start"], 4);
    assert_eq!(change["end"], 8);
    assert_eq!(change["oldText"], "red ");
    assert_eq!(change["newText"], "blue ");
    assert!(change.get("kind").is_none());

    session.resolve(0, 1)?;
    let decided = serde_json::to_value(session.snapshot()).expect("serialize snapshot");
    assert_eq!(decided["conflicts"][0]["resolved"], 1);
    assert_eq!(decided["merged"], "the red door");
    assert_eq!(session.merged_text(), "the green door");
    Ok(())
}

#[test]
fn a_saved_session_resumes_and_finishes_the_merge() -> Result<()> {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("review-merge.json");
    let options = DiffOptions::default();
    let base = "alpha beta gamma delta epsilon";
    let submissions = vec![
        RevisionSubmission::new("Ana", "alpha BETA gamma DELTA epsilon"),
        RevisionSubmission::new("Ben", "alpha Beta gamma Delta epsilon"),
    ];

    let mut session = merge_revisions(base, &submissions, &options);
    session.resolve(0, 1)?;
    session.save(&path)?;

    let mut restored = MergeSession::load(&path, &options)?;
    assert_eq!(restored.base(), base);
    assert_eq!(restored.unresolved(), 1);
    assert_eq!(restored.conflicts()[0].resolved, Some(1));

    restored.resolve(1, 0)?;
    assert_eq!(restored.merged_text(), "alpha Beta gamma DELTA epsilon");

    session.resolve(1, 0)?;
    assert_eq!(restored.merged_text(), session.merged_text());
    Ok(())
}

#[test]
fn mergeable_changes_survive_persistence() -> Result<()> {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("partial.json");
    let options = DiffOptions::default();
    let submissions = vec![
        RevisionSubmission::new("Ana", "one TWO three four five"),
        RevisionSubmission::new("Ben", "one two three FOUR five"),
        RevisionSubmission::new("Cay", "one two three 4 five"),
    ];

    let session = merge_revisions("one two three four five", &submissions, &options);
    assert_eq!(session.mergeable().len(), 1);
    session.save(&path)?;

    let mut restored = MergeSession::load(&path, &options)?;
    assert_eq!(restored.merged_text(), "one TWO three four five");
    assert_eq!(restored.mergeable().len(), 1);
    assert_eq!(restored.mergeable()[0].reviewer, "merged");
    assert_eq!(restored.stats().substitutions, 1);

    restored.resolve(0, 0)?;
    assert_eq!(restored.merged_text(), "one TWO three FOUR five");
    assert_eq!(restored.stats().substitutions, 2);
    Ok(())
}

#[test]
fn handwritten_snapshots_load_through_the_wire_format() -> Result<()> {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("export.json");
    let json = r#"{
        "base": "the red door",
        "merged": "the red door",
        "conflicts": [{
            "id": 0,
            "original": "red ",
            "changes": [
                { "reviewer": "Ana", "type": "replace", "start": 4, "end": 8,
                  "oldText": "red ", "newText": "blue " },
                { "reviewer": "Ben", "type": "delete", "start": 4, "end": 8,
                  "oldText": "red " }
            ]
        }]
    }"#;
    std::fs::write(&path, json).expect("write fixture");

    let mut session = MergeSession::load(&path, &DiffOptions::default())?;
    assert_eq!(session.unresolved(), 1);

    session.resolve(0, 1)?;
    assert_eq!(session.merged_text(), "the door");

    session.resolve(0, 0)?;
    assert_eq!(session.merged_text(), "the blue door");
    Ok(())
}

#[test]
fn incomplete_snapshot_files_fail_to_parse() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("incomplete.json");
    std::fs::write(&path, r#"{ "base": "text only" }"#).expect("write fixture");

    let err = MergeSession::load(&path, &DiffOptions::default()).unwrap_err();
    assert!(matches!(err, SnapshotError::Parse { .. }));
}
