//! Diff parsing and size analysis.
//!
//! Parses unified-diff hunks into line-classified [`hunk::Hunk`]s, splits
//! full `git diff` output into per-file diffs, filters noise files, and
//! derives size figures from each hunk's pure-add / pure-delete / edit split.

pub mod files;
pub mod filter;
pub mod hunk;
pub mod parser;
pub mod size;
