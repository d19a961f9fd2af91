use std::fmt;
use std::path::PathBuf;

use cadence_core::SizeConfig;
use serde::{Deserialize, Serialize};

use crate::files::FileDiff;
use crate::hunk::Hunk;

/// Line counts for a set of hunks.
///
/// `effective_lines` counts each edited line pair once, so replacing ten
/// lines weighs the same as adding ten.
///
/// # Examples
///
/// ```
/// use cadence_difflens::parser::parse_hunks;
/// use cadence_difflens::size::DiffSize;
///
/// let hunks = parse_hunks("@@ -1,2 +1,3 @@\n-a\n+b\n+c\n d").unwrap();
/// let size = DiffSize::from_hunks(&hunks);
/// assert_eq!(size.additions, 2);
/// assert_eq!(size.deletions, 1);
/// assert_eq!(size.edits, 1);
/// assert_eq!(size.effective_lines, 2);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSize {
    /// Number of hunks.
    pub hunks: u32,
    /// Inserted lines.
    pub additions: u32,
    /// Deleted lines.
    pub deletions: u32,
    /// Inserted lines not paired with a deletion.
    pub pure_additions: u32,
    /// Deleted lines not paired with an insertion.
    pub pure_deletions: u32,
    /// Deletion/insertion pairs.
    pub edits: u32,
    /// `pure_additions + pure_deletions + edits`.
    pub effective_lines: u32,
}

impl DiffSize {
    /// Sum the counts of `hunks`.
    pub fn from_hunks(hunks: &[Hunk]) -> Self {
        hunks.iter().fold(Self::default(), |acc, hunk| {
            acc.merge(Self {
                hunks: 1,
                additions: hunk.additions,
                deletions: hunk.deletions,
                pure_additions: hunk.internals.i,
                pure_deletions: hunk.internals.d,
                edits: hunk.internals.c,
                effective_lines: hunk.internals.effective_lines(),
            })
        })
    }

    /// Combine two sizes.
    pub fn merge(self, other: Self) -> Self {
        Self {
            hunks: self.hunks + other.hunks,
            additions: self.additions + other.additions,
            deletions: self.deletions + other.deletions,
            pure_additions: self.pure_additions + other.pure_additions,
            pure_deletions: self.pure_deletions + other.pure_deletions,
            edits: self.edits + other.edits,
            effective_lines: self.effective_lines + other.effective_lines,
        }
    }
}

/// Categorical size of a change.
///
/// # Examples
///
/// ```
/// use cadence_core::SizeConfig;
/// use cadence_difflens::size::SizeLabel;
///
/// let config = SizeConfig::default();
/// assert_eq!(SizeLabel::from_lines(0, &config), SizeLabel::Xs);
/// assert_eq!(SizeLabel::from_lines(10, &config), SizeLabel::Xs);
/// assert_eq!(SizeLabel::from_lines(11, &config), SizeLabel::S);
/// assert_eq!(SizeLabel::from_lines(5000, &config), SizeLabel::Xl);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeLabel {
    /// Up to `size.xs` effective lines.
    Xs,
    /// Up to `size.s` effective lines.
    S,
    /// Up to `size.m` effective lines.
    M,
    /// Up to `size.l` effective lines.
    L,
    /// Anything larger.
    Xl,
}

impl SizeLabel {
    /// Map an effective line count to a label using inclusive upper bounds.
    pub fn from_lines(lines: u32, config: &SizeConfig) -> Self {
        if lines <= config.xs {
            SizeLabel::Xs
        } else if lines <= config.s {
            SizeLabel::S
        } else if lines <= config.m {
            SizeLabel::M
        } else if lines <= config.l {
            SizeLabel::L
        } else {
            SizeLabel::Xl
        }
    }
}

impl fmt::Display for SizeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeLabel::Xs => write!(f, "xs"),
            SizeLabel::S => write!(f, "s"),
            SizeLabel::M => write!(f, "m"),
            SizeLabel::L => write!(f, "l"),
            SizeLabel::Xl => write!(f, "xl"),
        }
    }
}

/// Size of one file's diff.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSize {
    /// File path.
    pub path: PathBuf,
    /// Line counts for this file.
    pub size: DiffSize,
}

/// Size of a whole change set.
///
/// # Examples
///
/// ```
/// use cadence_core::SizeConfig;
/// use cadence_difflens::files::split_unified_diff;
/// use cadence_difflens::size::{measure_files, SizeLabel};
///
/// let diff = "diff --git a/f.rs b/f.rs\n\
///             --- a/f.rs\n\
///             +++ b/f.rs\n\
///             @@ -0,0 +1 @@\n\
///             +new\n";
/// let files = split_unified_diff(diff).unwrap();
/// let report = measure_files(&files, &SizeConfig::default());
/// assert_eq!(report.overall.additions, 1);
/// assert_eq!(report.label, SizeLabel::Xs);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeReport {
    /// Aggregate counts across all files.
    pub overall: DiffSize,
    /// Label for `overall.effective_lines`.
    pub label: SizeLabel,
    /// Per-file breakdown, in input order.
    pub per_file: Vec<FileSize>,
}

/// Measure every file and the aggregate.
pub fn measure_files(files: &[FileDiff], config: &SizeConfig) -> SizeReport {
    let per_file: Vec<FileSize> = files
        .iter()
        .map(|file| FileSize {
            path: file.path().to_path_buf(),
            size: DiffSize::from_hunks(&file.hunks),
        })
        .collect();

    let overall = per_file
        .iter()
        .fold(DiffSize::default(), |acc, file| acc.merge(file.size));

    SizeReport {
        overall,
        label: SizeLabel::from_lines(overall.effective_lines, config),
        per_file,
    }
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Size Report")?;
        writeln!(f, "===========")?;
        writeln!(
            f,
            "Label: {} ({} effective lines)\n",
            self.label, self.overall.effective_lines
        )?;

        if !self.per_file.is_empty() {
            writeln!(
                f,
                "{:<40} {:>6} {:>10} {:>6} {:>10}",
                "File", "Hunks", "+/-", "Edits", "Effective"
            )?;
            writeln!(f, "{}", "-".repeat(76))?;
            for file in &self.per_file {
                writeln!(
                    f,
                    "{:<40} {:>6} {:>+4}/{:<-5} {:>6} {:>10}",
                    file.path.display(),
                    file.size.hunks,
                    file.size.additions,
                    file.size.deletions,
                    file.size.edits,
                    file.size.effective_lines,
                )?;
            }
        }

        writeln!(
            f,
            "\nSummary: {} files, {} hunks, +{} additions, -{} deletions",
            self.per_file.len(),
            self.overall.hunks,
            self.overall.additions,
            self.overall.deletions
        )
    }
}

impl SizeReport {
    /// Render the report as a markdown string.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadence_core::SizeConfig;
    /// use cadence_difflens::size::measure_files;
    ///
    /// let report = measure_files(&[], &SizeConfig::default());
    /// assert!(report.to_markdown().starts_with("# Size Report"));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Size Report\n\n");
        out.push_str(&format!(
            "**Label:** {} ({} effective lines)\n\n",
            self.label, self.overall.effective_lines
        ));

        if !self.per_file.is_empty() {
            out.push_str("| File | Hunks | +/- | Edits | Effective |\n");
            out.push_str("|------|-------|-----|-------|-----------|\n");
            for file in &self.per_file {
                out.push_str(&format!(
                    "| {} | {} | +{}/-{} | {} | {} |\n",
                    file.path.display(),
                    file.size.hunks,
                    file.size.additions,
                    file.size.deletions,
                    file.size.edits,
                    file.size.effective_lines,
                ));
            }
            out.push('\n');
        }

        out.push_str(&format!(
            "**Summary:** {} files, {} hunks, +{} additions, -{} deletions\n",
            self.per_file.len(),
            self.overall.hunks,
            self.overall.additions,
            self.overall.deletions
        ));
        out
    }
}
