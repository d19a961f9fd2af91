//! Transform stage for extracted merge-request rows.
//!
//! Joins a merge request's notes, timeline rows, and per-file diffs into a
//! single [`pipeline::MergeRequestReport`], and runs batches of merge
//! requests in parallel.

pub mod pipeline;
