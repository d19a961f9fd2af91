//! Line-classified hunk model.
//!
//! A [`Hunk`] keeps the verbatim text of one `@@` block together with every
//! line classified as a [`Change`], and the [`Internals`] split of its
//! changed lines into pure deletions, pure insertions, and edits.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single classified line of a hunk.
///
/// `content` is the verbatim line, prefix character included.
///
/// # Examples
///
/// ```
/// use cadence_difflens::hunk::Change;
///
/// let change = Change::Insert { content: "+let x = 1;".into(), new_line_number: 7 };
/// assert_eq!(change.content(), "+let x = 1;");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Change {
    /// Line added in the new version.
    Insert {
        /// Verbatim line.
        content: String,
        /// Line number in the new version.
        new_line_number: u32,
    },
    /// Line removed from the old version.
    Delete {
        /// Verbatim line.
        content: String,
        /// Line number in the old version.
        old_line_number: u32,
    },
    /// Context line present in both versions.
    Normal {
        /// Verbatim line.
        content: String,
        /// Line number in the old version.
        old_line_number: u32,
        /// Line number in the new version.
        new_line_number: u32,
    },
    /// Anything else, such as `\ No newline at end of file`.
    Unknown {
        /// Verbatim line.
        content: String,
        /// Old-side cursor when the line was seen.
        old_line_number: u32,
        /// New-side cursor when the line was seen.
        new_line_number: u32,
    },
}

impl Change {
    /// The verbatim line this change was parsed from.
    pub fn content(&self) -> &str {
        match self {
            Change::Insert { content, .. }
            | Change::Delete { content, .. }
            | Change::Normal { content, .. }
            | Change::Unknown { content, .. } => content,
        }
    }

    /// The variant of this change without its payload.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Insert { .. } => ChangeKind::Insert,
            Change::Delete { .. } => ChangeKind::Delete,
            Change::Normal { .. } => ChangeKind::Normal,
            Change::Unknown { .. } => ChangeKind::Unknown,
        }
    }
}

/// Payload-free discriminant of a [`Change`].
///
/// # Examples
///
/// ```
/// use cadence_difflens::hunk::ChangeKind;
///
/// assert_eq!(ChangeKind::Delete.to_string(), "d");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// See [`Change::Normal`].
    Normal,
    /// See [`Change::Delete`].
    Delete,
    /// See [`Change::Insert`].
    Insert,
    /// See [`Change::Unknown`].
    Unknown,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Normal => write!(f, "n"),
            ChangeKind::Delete => write!(f, "d"),
            ChangeKind::Insert => write!(f, "i"),
            ChangeKind::Unknown => write!(f, "u"),
        }
    }
}

/// Split of a hunk's changed lines into pure deletions (`d`), pure
/// insertions (`i`), and edited line pairs (`c`).
///
/// Always satisfies `d + c == deletions` and `i + c == additions` for the
/// hunk it was computed from.
///
/// # Examples
///
/// ```
/// use cadence_difflens::hunk::{Change, Internals};
///
/// let changes = vec![
///     Change::Delete { content: "-old".into(), old_line_number: 1 },
///     Change::Insert { content: "+new".into(), new_line_number: 1 },
///     Change::Insert { content: "+extra".into(), new_line_number: 2 },
/// ];
/// let internals = Internals::from_changes(&changes);
/// assert_eq!(internals, Internals { d: 0, i: 1, c: 1 });
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Internals {
    /// Deleted lines with no matching insertion.
    pub d: u32,
    /// Inserted lines with no matching deletion.
    pub i: u32,
    /// Deletions immediately followed by insertions in the same run.
    pub c: u32,
}

impl Internals {
    /// Compute the split for a sequence of changes.
    ///
    /// The sequence is cut into maximal runs shaped like "normals, then
    /// deletes, then inserts". Within a run, `min(deletes, inserts)` lines
    /// count as edits and the remainder as pure deletes or inserts. An
    /// unknown line closes the current run.
    pub fn from_changes(changes: &[Change]) -> Self {
        let mut total = Internals::default();
        let mut run = Run::default();

        for change in changes {
            match change.kind() {
                ChangeKind::Normal => {
                    if run.deletes > 0 || run.inserts > 0 {
                        total.absorb(run.take());
                    }
                }
                ChangeKind::Delete => {
                    if run.inserts > 0 {
                        total.absorb(run.take());
                    }
                    run.deletes += 1;
                }
                ChangeKind::Insert => run.inserts += 1,
                ChangeKind::Unknown => total.absorb(run.take()),
            }
        }
        total.absorb(run);

        total
    }

    /// Total changed lines with edits counted once.
    pub fn effective_lines(&self) -> u32 {
        self.d + self.i + self.c
    }

    fn absorb(&mut self, run: Run) {
        let c = run.deletes.min(run.inserts);
        self.d += run.deletes - c;
        self.i += run.inserts - c;
        self.c += c;
    }
}

#[derive(Debug, Default)]
struct Run {
    deletes: u32,
    inserts: u32,
}

impl Run {
    fn take(&mut self) -> Run {
        std::mem::take(self)
    }
}

/// One `@@` block of a unified diff.
///
/// # Examples
///
/// ```
/// use cadence_difflens::parser::parse_hunks;
///
/// let hunks = parse_hunks("@@ -1 +1,2 @@\n line\n+added").unwrap();
/// let hunk = &hunks[0];
/// assert_eq!((hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines), (1, 1, 1, 2));
/// assert_eq!(hunk.header(), "@@ -1 +1,2 @@");
/// assert_eq!(hunk.additions, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    /// Verbatim hunk text, header included, newline-joined.
    pub content: String,
    /// Starting line in the old version.
    pub old_start: u32,
    /// Number of lines in the old version.
    pub old_lines: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Number of lines in the new version.
    pub new_lines: u32,
    /// Count of [`Change::Insert`] lines.
    pub additions: u32,
    /// Count of [`Change::Delete`] lines.
    pub deletions: u32,
    /// Every line after the header, in order.
    pub changes: Vec<Change>,
    /// Pure delete / pure insert / edit split.
    pub internals: Internals,
}

impl Hunk {
    /// The `@@` header line.
    pub fn header(&self) -> &str {
        self.content.split('\n').next().unwrap_or_default()
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "-{},{} +{},{} (+{} -{})",
            self.old_start, self.old_lines, self.new_start, self.new_lines, self.additions, self.deletions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(kinds: &str) -> Vec<Change> {
        kinds
            .chars()
            .enumerate()
            .map(|(n, k)| {
                let line = n as u32 + 1;
                match k {
                    'n' => Change::Normal {
                        content: " ctx".into(),
                        old_line_number: line,
                        new_line_number: line,
                    },
                    'd' => Change::Delete {
                        content: "-old".into(),
                        old_line_number: line,
                    },
                    'i' => Change::Insert {
                        content: "+new".into(),
                        new_line_number: line,
                    },
                    _ => Change::Unknown {
                        content: "\\ No newline at end of file".into(),
                        old_line_number: line,
                        new_line_number: line,
                    },
                }
            })
            .collect()
    }

    #[test]
    fn empty_sequence_has_zero_internals() {
        assert_eq!(Internals::from_changes(&[]), Internals::default());
    }

    #[test]
    fn delete_then_insert_is_an_edit() {
        assert_eq!(
            Internals::from_changes(&seq("ndi")),
            Internals { d: 0, i: 0, c: 1 }
        );
    }

    #[test]
    fn insert_then_delete_are_separate_runs() {
        assert_eq!(
            Internals::from_changes(&seq("id")),
            Internals { d: 1, i: 1, c: 0 }
        );
    }

    #[test]
    fn uneven_run_splits_remainder() {
        assert_eq!(
            Internals::from_changes(&seq("dddii")),
            Internals { d: 1, i: 0, c: 2 }
        );
        assert_eq!(
            Internals::from_changes(&seq("diii")),
            Internals { d: 0, i: 2, c: 1 }
        );
    }

    #[test]
    fn context_line_closes_run() {
        assert_eq!(
            Internals::from_changes(&seq("dndi")),
            Internals { d: 1, i: 0, c: 1 }
        );
        assert_eq!(
            Internals::from_changes(&seq("ndnini")),
            Internals { d: 1, i: 2, c: 0 }
        );
    }

    #[test]
    fn unknown_line_closes_run() {
        assert_eq!(
            Internals::from_changes(&seq("dui")),
            Internals { d: 1, i: 1, c: 0 }
        );
        assert_eq!(
            Internals::from_changes(&seq("diu")),
            Internals { d: 0, i: 0, c: 1 }
        );
    }

    #[test]
    fn effective_lines_counts_edits_once() {
        let internals = Internals { d: 2, i: 3, c: 4 };
        assert_eq!(internals.effective_lines(), 9);
    }

    #[test]
    fn change_serializes_with_type_tag() {
        let change = Change::Normal {
            content: " x".into(),
            old_line_number: 3,
            new_line_number: 4,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "normal");
        assert_eq!(json["oldLineNumber"], 3);
        assert_eq!(json["newLineNumber"], 4);
    }

    #[test]
    fn change_kind_display_uses_initials() {
        let letters: String = seq("ndiu")
            .iter()
            .map(|c| c.kind().to_string())
            .collect();
        assert_eq!(letters, "ndiu");
    }
}
