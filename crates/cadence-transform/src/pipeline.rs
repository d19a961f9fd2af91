use std::path::PathBuf;

use cadence_core::{CadenceConfig, CadenceError, SizeConfig};
use cadence_difflens::files::FileDiff;
use cadence_difflens::filter::{DiffFilter, SkippedFile};
use cadence_difflens::parser::parse_hunks;
use cadence_difflens::size::{measure_files, SizeReport};
use cadence_lifecycle::classify::{classify, MergeRequestMetrics};
use cadence_lifecycle::event::{
    decode_events, sort_events, sort_notes, MergeRequestAuthor, MergeRequestNote,
    RawTimelineEvent, TimelineEvent,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One file's diff body as extracted from the forge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiffInput {
    /// Repository-relative path.
    pub path: PathBuf,
    /// Hunk section of the file's unified diff.
    #[serde(default)]
    pub diff: String,
}

/// Everything the transform stage needs for one merge request.
///
/// Timeline events may arrive already typed (`events`), as stored rows
/// (`rawEvents`), or both; rows are decoded and appended.
///
/// # Examples
///
/// ```
/// use cadence_transform::pipeline::MergeRequestInput;
///
/// let input: MergeRequestInput = serde_json::from_str(r#"{
///     "id": "mr-1",
///     "author": {"externalId": "1", "createdAt": "2024-03-01T09:00:00Z"},
///     "rawEvents": [{"type": "committed", "timestamp": "2024-03-01T09:10:00Z", "actorId": "1"}]
/// }"#).unwrap();
/// assert!(input.notes.is_empty());
/// assert_eq!(input.raw_events.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequestInput {
    /// Merge request identifier, echoed in the report.
    pub id: String,
    /// Who opened the merge request.
    pub author: MergeRequestAuthor,
    /// Review notes.
    #[serde(default)]
    pub notes: Vec<MergeRequestNote>,
    /// Typed timeline events.
    #[serde(default)]
    pub events: Vec<TimelineEvent>,
    /// Stored timeline rows still to be decoded.
    #[serde(default)]
    pub raw_events: Vec<RawTimelineEvent>,
    /// Per-file diffs.
    #[serde(default)]
    pub files: Vec<FileDiffInput>,
}

/// Derived output row for one merge request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequestReport {
    /// Merge request identifier.
    pub id: String,
    /// Lifecycle timestamps and review signals.
    pub metrics: MergeRequestMetrics,
    /// Size of the files that count towards metrics.
    pub size: SizeReport,
    /// Files left out of the size figures.
    pub skipped: Vec<SkippedFile>,
}

/// Transform orchestrator.
///
/// Decodes and orders the timeline, classifies it, then filters, parses,
/// and measures the merge request's files.
///
/// # Examples
///
/// ```
/// use cadence_core::CadenceConfig;
/// use cadence_transform::pipeline::{MergeRequestInput, Pipeline};
///
/// let input: MergeRequestInput = serde_json::from_str(r#"{
///     "id": "mr-7",
///     "author": {"externalId": "1", "createdAt": "2024-03-01T09:00:00Z"},
///     "files": [{"path": "src/lib.rs", "diff": "@@ -1 +1,2 @@\n fn a() {}\n+fn b() {}"}]
/// }"#).unwrap();
///
/// let report = Pipeline::new(&CadenceConfig::default()).run(input).unwrap();
/// assert_eq!(report.id, "mr-7");
/// assert_eq!(report.size.overall.additions, 1);
/// assert!(report.metrics.started_coding_at.is_none());
/// ```
pub struct Pipeline {
    filter: DiffFilter,
    size: SizeConfig,
    threads: Option<usize>,
}

impl Pipeline {
    /// Create a pipeline from loaded configuration.
    pub fn new(config: &CadenceConfig) -> Self {
        Self {
            filter: DiffFilter::from_config(&config.diff),
            size: config.size.clone(),
            threads: config.batch.threads,
        }
    }

    /// Transform one merge request.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::InvalidEvent`] if a stored timeline row cannot
    /// be decoded, or [`CadenceError::Diff`] naming the file whose diff has a
    /// malformed hunk header.
    pub fn run(&self, input: MergeRequestInput) -> Result<MergeRequestReport, CadenceError> {
        let MergeRequestInput {
            id,
            author,
            mut notes,
            mut events,
            raw_events,
            files,
        } = input;

        debug!(
            id = %id,
            notes = notes.len(),
            events = events.len(),
            raw_events = raw_events.len(),
            files = files.len(),
            "transforming merge request"
        );

        events.extend(decode_events(raw_events)?);
        sort_events(&mut events);
        sort_notes(&mut notes);
        let metrics = classify(&author, &notes, &events);

        let (diffs, skipped) = self.parse_files(files)?;
        let size = measure_files(&diffs, &self.size);

        debug!(
            id = %id,
            review_depth = metrics.review_depth,
            label = %size.label,
            "merge request transformed"
        );

        Ok(MergeRequestReport {
            id,
            metrics,
            size,
            skipped,
        })
    }

    /// Transform many merge requests in parallel.
    ///
    /// Results are returned in input order; one merge request failing does
    /// not affect the others. Uses a dedicated pool when `[batch] threads` is
    /// set, otherwise rayon's global pool.
    pub fn run_batch(
        &self,
        inputs: Vec<MergeRequestInput>,
    ) -> Vec<Result<MergeRequestReport, CadenceError>> {
        let Some(threads) = self.threads else {
            return self.run_parallel(inputs);
        };

        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(|| self.run_parallel(inputs)),
            Err(e) => {
                warn!(error = %e, threads, "falling back to the global thread pool");
                self.run_parallel(inputs)
            }
        }
    }

    fn run_parallel(
        &self,
        inputs: Vec<MergeRequestInput>,
    ) -> Vec<Result<MergeRequestReport, CadenceError>> {
        inputs.into_par_iter().map(|input| self.run(input)).collect()
    }

    fn parse_files(
        &self,
        files: Vec<FileDiffInput>,
    ) -> Result<(Vec<FileDiff>, Vec<SkippedFile>), CadenceError> {
        let mut kept = Vec::with_capacity(files.len());
        let mut skipped = Vec::new();

        for file in files {
            if let Some(reason) = self.filter.skip_reason(&file.path, &file.diff) {
                warn!(path = %file.path.display(), %reason, "skipping file");
                skipped.push(SkippedFile {
                    path: file.path,
                    reason,
                });
                continue;
            }

            let hunks = parse_hunks(&file.diff)
                .map_err(|e| e.in_file(file.path.display().to_string()))?;
            debug!(path = %file.path.display(), hunks = hunks.len(), "parsed file diff");

            kept.push(FileDiff {
                old_path: file.path.clone(),
                new_path: file.path,
                hunks,
                is_new_file: false,
                is_deleted_file: false,
                is_rename: false,
            });
        }

        Ok((kept, skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{BatchConfig, DiffConfig};
    use cadence_difflens::filter::SkipReason;
    use cadence_difflens::size::SizeLabel;
    use cadence_lifecycle::event::ReviewState;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> cadence_core::Timestamp {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn input(id: &str) -> MergeRequestInput {
        MergeRequestInput {
            id: id.into(),
            author: MergeRequestAuthor {
                external_id: "1".into(),
                created_at: at(0),
            },
            notes: Vec::new(),
            events: Vec::new(),
            raw_events: Vec::new(),
            files: Vec::new(),
        }
    }

    fn file(path: &str, diff: &str) -> FileDiffInput {
        FileDiffInput {
            path: PathBuf::from(path),
            diff: diff.into(),
        }
    }

    fn raw(kind: &str, secs: i64, actor: &str, data: Option<&str>) -> RawTimelineEvent {
        RawTimelineEvent {
            kind: kind.into(),
            timestamp: at(secs),
            actor_id: Some(actor.into()),
            data: data.map(String::from),
        }
    }

    #[test]
    fn typed_and_raw_events_are_merged_and_sorted() {
        let mut mr = input("mr-1");
        mr.events = vec![TimelineEvent::Merged {
            timestamp: at(40),
            actor_id: "1".into(),
        }];
        mr.raw_events = vec![
            raw("reviewed", 30, "4", Some(r#"{"state":"APPROVED"}"#)),
            raw("committed", 10, "1", None),
        ];

        let report = Pipeline::new(&CadenceConfig::default()).run(mr).unwrap();
        assert_eq!(report.metrics.started_coding_at, Some(at(10)));
        assert_eq!(report.metrics.started_pickup_at, Some(at(10)));
        assert_eq!(report.metrics.started_review_at, Some(at(30)));
        assert_eq!(report.metrics.review_depth, 1);
        assert!(report.metrics.approved);
    }

    #[test]
    fn notes_are_sorted_before_classifying() {
        let mut mr = input("mr-2");
        mr.notes = vec![
            MergeRequestNote {
                external_id: "b".into(),
                created_at: at(50),
                author_external_id: "3".into(),
            },
            MergeRequestNote {
                external_id: "a".into(),
                created_at: at(20),
                author_external_id: "3".into(),
            },
        ];
        mr.events = vec![TimelineEvent::Reviewed {
            timestamp: at(30),
            actor_id: "3".into(),
            state: ReviewState::Commented,
        }];

        let report = Pipeline::new(&CadenceConfig::default()).run(mr).unwrap();
        assert_eq!(report.metrics.started_review_at, Some(at(20)));
        assert_eq!(report.metrics.review_depth, 3);
    }

    #[test]
    fn undecodable_row_fails_the_merge_request() {
        let mut mr = input("mr-3");
        mr.raw_events = vec![raw("reviewed", 30, "4", Some("not json"))];
        let err = Pipeline::new(&CadenceConfig::default()).run(mr).unwrap_err();
        assert!(matches!(err, CadenceError::InvalidEvent(_)));
    }

    #[test]
    fn files_are_filtered_parsed_and_measured() {
        let mut mr = input("mr-4");
        mr.files = vec![
            file("Cargo.lock", "@@ -1 +1 @@\n-a\n+b"),
            file("src/lib.rs", "@@ -1,2 +1,2 @@\n-old\n+new\n ctx"),
            file("src/new.rs", "@@ -0,0 +1,2 @@\n+one\n+two"),
        ];

        let report = Pipeline::new(&CadenceConfig::default()).run(mr).unwrap();
        assert_eq!(
            report.skipped,
            vec![SkippedFile {
                path: PathBuf::from("Cargo.lock"),
                reason: SkipReason::LockFile,
            }]
        );
        assert_eq!(report.size.per_file.len(), 2);
        assert_eq!(report.size.overall.edits, 1);
        assert_eq!(report.size.overall.pure_additions, 2);
        assert_eq!(report.size.overall.effective_lines, 3);
        assert_eq!(report.size.label, SizeLabel::Xs);
    }

    #[test]
    fn configured_extensions_are_skipped() {
        let config = CadenceConfig {
            diff: DiffConfig {
                skip_extensions: vec!["md".into()],
                ..DiffConfig::default()
            },
            ..CadenceConfig::default()
        };
        let mut mr = input("mr-5");
        mr.files = vec![file("README.md", "@@ -1 +1 @@\n-a\n+b")];

        let report = Pipeline::new(&config).run(mr).unwrap();
        assert!(report.size.per_file.is_empty());
        assert_eq!(report.skipped[0].reason, SkipReason::PatternMatch("*.md".into()));
    }

    #[test]
    fn malformed_diff_names_the_file() {
        let mut mr = input("mr-6");
        mr.files = vec![file("src/broken.rs", "@@ garbage @@\n+x")];
        let err = Pipeline::new(&CadenceConfig::default()).run(mr).unwrap_err();
        match err {
            CadenceError::Diff { path, source } => {
                assert_eq!(path, "src/broken.rs");
                assert!(matches!(*source, CadenceError::MalformedHunkHeader(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn batch_preserves_order_and_isolates_failures() {
        let mut broken = input("bad");
        broken.files = vec![file("x.rs", "@@ nope @@")];
        let inputs = vec![input("a"), broken, input("c")];

        let results = Pipeline::new(&CadenceConfig::default()).run_batch(inputs);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().id, "a");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().id, "c");
    }

    #[test]
    fn batch_with_dedicated_pool() {
        let config = CadenceConfig {
            batch: BatchConfig { threads: Some(2) },
            ..CadenceConfig::default()
        };
        let inputs: Vec<_> = (0..16).map(|i| input(&format!("mr-{i}"))).collect();

        let ids: Vec<String> = Pipeline::new(&config)
            .run_batch(inputs)
            .into_iter()
            .map(|result| result.unwrap().id)
            .collect();
        let expected: Vec<String> = (0..16).map(|i| format!("mr-{i}")).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = Pipeline::new(&CadenceConfig::default())
            .run(input("mr-8"))
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["id"], "mr-8");
        assert_eq!(json["metrics"]["reviewDepth"], 0);
        assert_eq!(json["size"]["label"], "xs");
        assert!(json["size"]["perFile"].as_array().unwrap().is_empty());
    }
}
