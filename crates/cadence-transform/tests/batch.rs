use cadence_core::CadenceConfig;
use cadence_transform::pipeline::{MergeRequestInput, Pipeline};

const BATCH: &str = r#"[
  {
    "id": "author-only",
    "author": {"externalId": "1", "createdAt": "1970-01-01T00:00:00Z"},
    "rawEvents": [
      {"type": "closed", "timestamp": "1970-01-01T00:00:40Z", "actorId": "1"},
      {"type": "committed", "timestamp": "1970-01-01T00:00:10Z", "data": "{\"committerExternalId\":\"1\"}"},
      {"type": "merged", "timestamp": "1970-01-01T00:00:30Z", "actorId": "1"}
    ]
  },
  {
    "id": "reviewed-and-merged",
    "author": {"externalId": "1", "createdAt": "1970-01-01T00:00:00Z"},
    "events": [
      {"type": "committed", "timestamp": "1970-01-01T00:00:10Z", "committerExternalId": "1"},
      {"type": "reviewed", "timestamp": "1970-01-01T00:00:30Z", "actorId": "4", "state": "approved"},
      {"type": "merged", "timestamp": "1970-01-01T00:00:40Z", "actorId": "1"},
      {"type": "closed", "timestamp": "1970-01-01T00:00:50Z", "actorId": "1"},
      {"type": "reviewed", "timestamp": "1970-01-01T00:01:00Z", "actorId": "5", "state": "approved"}
    ],
    "files": [
      {"path": "src/main.rs", "diff": "@@ -1,3 +1,4 @@\n This is the first line.\n-This is the second line.\n This is the third line.\n+This is the fourth line.\n+This is the fifth line.\n"}
    ]
  }
]"#;

#[test]
fn json_batch_produces_fixture_metrics() {
    let inputs: Vec<MergeRequestInput> = serde_json::from_str(BATCH).unwrap();
    let reports: Vec<_> = Pipeline::new(&CadenceConfig::default())
        .run_batch(inputs)
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    let json = serde_json::to_value(&reports).unwrap();

    let author_only = &json[0];
    assert_eq!(author_only["id"], "author-only");
    assert_eq!(author_only["metrics"]["startedCodingAt"], "1970-01-01T00:00:10Z");
    assert_eq!(author_only["metrics"]["startedPickupAt"], "1970-01-01T00:00:10Z");
    assert!(author_only["metrics"]["startedReviewAt"].is_null());
    assert_eq!(author_only["metrics"]["reviewed"], false);
    assert_eq!(author_only["metrics"]["reviewDepth"], 0);

    let reviewed = &json[1];
    assert_eq!(reviewed["metrics"]["startedReviewAt"], "1970-01-01T00:00:30Z");
    assert_eq!(reviewed["metrics"]["reviewDepth"], 1);
    assert_eq!(reviewed["metrics"]["approved"], true);
    assert_eq!(reviewed["size"]["overall"]["additions"], 2);
    assert_eq!(reviewed["size"]["overall"]["deletions"], 1);
    assert_eq!(reviewed["size"]["overall"]["effectiveLines"], 3);
}
