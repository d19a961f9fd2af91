//! Splitting multi-file `git diff` output into per-file hunk lists.

use std::fmt;
use std::path::{Path, PathBuf};

use cadence_core::CadenceError;

use crate::hunk::Hunk;
use crate::parser::{header_line_counts, parse_hunks};

/// A complete diff for a single file, containing zero or more hunks.
///
/// # Examples
///
/// ```
/// use cadence_difflens::files::split_unified_diff;
///
/// let diff = concat!(
///     "diff --git a/hello.rs b/hello.rs\n",
///     "--- a/hello.rs\n",
///     "+++ b/hello.rs\n",
///     "@@ -1,2 +1,3 @@\n",
///     " fn main() {\n",
///     "+    println!(\"hello\");\n",
///     " }\n",
/// );
/// let files = split_unified_diff(diff).unwrap();
/// assert_eq!(files.len(), 1);
/// assert_eq!(files[0].hunks.len(), 1);
/// assert_eq!(files[0].hunks[0].additions, 1);
/// ```
#[derive(Debug, Clone)]
pub struct FileDiff {
    /// Path in the old version.
    pub old_path: PathBuf,
    /// Path in the new version.
    pub new_path: PathBuf,
    /// Parsed hunks for this file.
    pub hunks: Vec<Hunk>,
    /// Whether this is a newly created file.
    pub is_new_file: bool,
    /// Whether this file was deleted.
    pub is_deleted_file: bool,
    /// Whether this file was renamed.
    pub is_rename: bool,
}

impl FileDiff {
    /// The path that identifies this file: the old path for deletions,
    /// otherwise the new path.
    pub fn path(&self) -> &Path {
        if self.is_deleted_file {
            &self.old_path
        } else {
            &self.new_path
        }
    }
}

impl fmt::Display for FileDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} hunks)", self.path().display(), self.hunks.len())
    }
}

/// Per-file state while scanning; hunk lines are collected and parsed when
/// the file ends.
struct PendingFile<'a> {
    old_path: PathBuf,
    new_path: PathBuf,
    body: Vec<&'a str>,
    old_remaining: u32,
    new_remaining: u32,
    is_new_file: bool,
    is_deleted_file: bool,
    is_rename: bool,
    is_binary: bool,
}

impl<'a> PendingFile<'a> {
    fn new() -> Self {
        Self {
            old_path: PathBuf::new(),
            new_path: PathBuf::new(),
            body: Vec::new(),
            old_remaining: 0,
            new_remaining: 0,
            is_new_file: false,
            is_deleted_file: false,
            is_rename: false,
            is_binary: false,
        }
    }

    fn in_hunks(&self) -> bool {
        !self.body.is_empty()
    }

    /// Whether the current hunk still expects body lines per its header.
    fn hunk_open(&self) -> bool {
        self.old_remaining > 0 || self.new_remaining > 0
    }

    fn start_hunk(&mut self, header: &'a str) {
        let (old, new) = header_line_counts(header).unwrap_or_default();
        self.old_remaining = old;
        self.new_remaining = new;
        self.body.push(header);
    }

    fn push_hunk_line(&mut self, line: &'a str) {
        match line.chars().next() {
            Some('-') => self.old_remaining = self.old_remaining.saturating_sub(1),
            Some('+') => self.new_remaining = self.new_remaining.saturating_sub(1),
            Some('\\') => {}
            _ => {
                self.old_remaining = self.old_remaining.saturating_sub(1);
                self.new_remaining = self.new_remaining.saturating_sub(1);
            }
        }
        self.body.push(line);
    }

    fn finish(self) -> Result<Option<FileDiff>, CadenceError> {
        if self.is_binary {
            return Ok(None);
        }
        let mut file = FileDiff {
            old_path: self.old_path,
            new_path: self.new_path,
            hunks: Vec::new(),
            is_new_file: self.is_new_file,
            is_deleted_file: self.is_deleted_file,
            is_rename: self.is_rename,
        };
        let path = file.path().display().to_string();
        file.hunks = parse_hunks(&self.body.join("\n")).map_err(|e| e.in_file(path))?;
        Ok(Some(file))
    }
}

/// Split a unified diff (as produced by `git diff`) into [`FileDiff`]s and
/// parse each file's hunks with [`parse_hunks`].
///
/// Handles new, deleted, renamed, and binary files (binary files are
/// dropped). Patches without a `diff --git` line start a file at `--- `.
///
/// # Errors
///
/// Returns [`CadenceError::Diff`] wrapping
/// [`CadenceError::MalformedHunkHeader`] if any hunk header is malformed.
///
/// # Examples
///
/// ```
/// use cadence_difflens::files::split_unified_diff;
///
/// let files = split_unified_diff("").unwrap();
/// assert!(files.is_empty());
/// ```
pub fn split_unified_diff(input: &str) -> Result<Vec<FileDiff>, CadenceError> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<PendingFile<'_>> = None;
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        if line.starts_with("diff --git ") {
            if let Some(file) = current.take() {
                files.extend(file.finish()?);
            }
            current = Some(PendingFile::new());
            continue;
        }

        if line.starts_with("@@") {
            if let Some(file) = current.as_mut() {
                file.start_hunk(line);
            }
            continue;
        }

        // Body lines are consumed until the header's old and new counts are
        // exhausted, so `--- `/`+++ ` pairs inside a hunk stay in the hunk.
        if let Some(file) = current.as_mut().filter(|file| file.hunk_open()) {
            file.push_hunk_line(line);
            continue;
        }

        // A `--- ` line directly followed by `+++ ` starts a new file when it
        // appears after hunks or with no `diff --git` line at all.
        let next_is_new_path = lines.peek().is_some_and(|l| l.starts_with("+++ "));
        if line.starts_with("--- ") && next_is_new_path {
            let starts_new = match current.as_ref() {
                None => true,
                Some(file) => file.in_hunks(),
            };
            if starts_new {
                if let Some(file) = current.take() {
                    files.extend(file.finish()?);
                }
                current = Some(PendingFile::new());
            }
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if file.in_hunks() {
            file.body.push(line);
            continue;
        }

        if line.starts_with("Binary files ") && line.ends_with(" differ") {
            file.is_binary = true;
            continue;
        }

        if line.starts_with("new file mode") {
            file.is_new_file = true;
            continue;
        }

        if line.starts_with("deleted file mode") {
            file.is_deleted_file = true;
            continue;
        }

        if let Some(path) = line.strip_prefix("rename from ") {
            file.is_rename = true;
            file.old_path = PathBuf::from(path);
            continue;
        }

        if let Some(path) = line.strip_prefix("rename to ") {
            file.is_rename = true;
            file.new_path = PathBuf::from(path);
            continue;
        }

        if let Some(path) = line.strip_prefix("--- ") {
            file.old_path = parse_path(path);
            if path == "/dev/null" {
                file.is_new_file = true;
            }
            continue;
        }

        if let Some(path) = line.strip_prefix("+++ ") {
            file.new_path = parse_path(path);
            if path == "/dev/null" {
                file.is_deleted_file = true;
            }
            continue;
        }
    }

    if let Some(file) = current.take() {
        files.extend(file.finish()?);
    }

    Ok(files)
}

fn parse_path(raw: &str) -> PathBuf {
    let normalized = raw.trim_matches('"');

    if normalized == "/dev/null" {
        return PathBuf::from("/dev/null");
    }

    let stripped = normalized
        .strip_prefix("a/")
        .or_else(|| normalized.strip_prefix("b/"))
        .unwrap_or(normalized);

    PathBuf::from(stripped)
}
