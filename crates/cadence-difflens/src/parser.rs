use cadence_core::CadenceError;

use crate::hunk::{Change, Hunk, Internals};

/// Parse the hunk section of a single file's unified diff into [`Hunk`]s.
///
/// The input is split on `'\n'`. Every line starting with `@@` opens a new
/// hunk; lines before the first header are ignored. Lines are classified by
/// their first character (`-`, `+`, space or empty, anything else) and each
/// hunk keeps its verbatim text in [`Hunk::content`].
///
/// # Errors
///
/// Returns [`CadenceError::MalformedHunkHeader`] if a line starting with `@@`
/// does not match `@@ -OLDSTART[,OLDLINES] +NEWSTART[,NEWLINES] @@`.
///
/// # Examples
///
/// ```
/// use cadence_difflens::parser::parse_hunks;
///
/// assert!(parse_hunks("").unwrap().is_empty());
///
/// let hunks = parse_hunks("@@ -1,2 +1,2 @@\n-old\n+new\n same").unwrap();
/// assert_eq!(hunks.len(), 1);
/// assert_eq!(hunks[0].additions, 1);
/// assert_eq!(hunks[0].deletions, 1);
/// assert_eq!(hunks[0].internals.c, 1);
/// ```
pub fn parse_hunks(input: &str) -> Result<Vec<Hunk>, CadenceError> {
    let mut hunks: Vec<Hunk> = Vec::new();
    let mut current: Option<HunkBuilder> = None;

    for line in input.split('\n') {
        if line.starts_with("@@") {
            if let Some(builder) = current.take() {
                hunks.push(builder.finish());
            }
            let range = parse_hunk_header(line)?;
            current = Some(HunkBuilder::new(line, range));
            continue;
        }

        let Some(builder) = current.as_mut() else {
            continue;
        };
        builder.push_line(line);
    }

    if let Some(builder) = current.take() {
        hunks.push(builder.finish());
    }

    Ok(hunks)
}

/// Line ranges from a hunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkRange {
    old_start: u32,
    old_lines: u32,
    new_start: u32,
    new_lines: u32,
}

struct HunkBuilder {
    hunk: Hunk,
    old_line: u32,
    new_line: u32,
}

impl HunkBuilder {
    fn new(header: &str, range: HunkRange) -> Self {
        Self {
            hunk: Hunk {
                content: header.to_string(),
                old_start: range.old_start,
                old_lines: range.old_lines,
                new_start: range.new_start,
                new_lines: range.new_lines,
                additions: 0,
                deletions: 0,
                changes: Vec::new(),
                internals: Internals::default(),
            },
            old_line: range.old_start,
            new_line: range.new_start,
        }
    }

    fn push_line(&mut self, line: &str) {
        self.hunk.content.push('\n');
        self.hunk.content.push_str(line);

        let content = line.to_string();
        let change = match line.chars().next() {
            Some('-') => {
                let change = Change::Delete {
                    content,
                    old_line_number: self.old_line,
                };
                self.old_line = self.old_line.saturating_add(1);
                self.hunk.deletions += 1;
                change
            }
            Some('+') => {
                let change = Change::Insert {
                    content,
                    new_line_number: self.new_line,
                };
                self.new_line = self.new_line.saturating_add(1);
                self.hunk.additions += 1;
                change
            }
            Some(' ') | None => {
                let change = Change::Normal {
                    content,
                    old_line_number: self.old_line,
                    new_line_number: self.new_line,
                };
                self.advance_both();
                change
            }
            Some(_) => {
                let change = Change::Unknown {
                    content,
                    old_line_number: self.old_line,
                    new_line_number: self.new_line,
                };
                self.advance_both();
                change
            }
        };

        self.hunk.changes.push(change);
    }

    fn advance_both(&mut self) {
        self.old_line = self.old_line.saturating_add(1);
        self.new_line = self.new_line.saturating_add(1);
    }

    fn finish(mut self) -> Hunk {
        self.hunk.internals = Internals::from_changes(&self.hunk.changes);
        self.hunk
    }
}

/// Old and new line counts declared by a hunk header, if it is well formed.
pub(crate) fn header_line_counts(line: &str) -> Option<(u32, u32)> {
    parse_hunk_header(line)
        .ok()
        .map(|range| (range.old_lines, range.new_lines))
}

fn parse_hunk_header(line: &str) -> Result<HunkRange, CadenceError> {
    let malformed = || CadenceError::MalformedHunkHeader(line.to_string());

    let inner = line
        .strip_prefix("@@ ")
        .and_then(|s| {
            let end = s.find(" @@")?;
            Some(&s[..end])
        })
        .ok_or_else(malformed)?;

    let (old, new) = inner.split_once(' ').ok_or_else(malformed)?;
    let old = old.strip_prefix('-').ok_or_else(malformed)?;
    let new = new.strip_prefix('+').ok_or_else(malformed)?;

    let (old_start, old_lines) = parse_range(old).ok_or_else(malformed)?;
    let (new_start, new_lines) = parse_range(new).ok_or_else(malformed)?;

    Ok(HunkRange {
        old_start,
        old_lines,
        new_start,
        new_lines,
    })
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    let (start, count) = match range.split_once(',') {
        Some((start, count)) => (start, Some(count)),
        None => (range, None),
    };
    let start = parse_number(start)?;
    let count = match count {
        Some(count) => parse_number(count)?,
        None => 1,
    };
    Some((start, count))
}

fn parse_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
