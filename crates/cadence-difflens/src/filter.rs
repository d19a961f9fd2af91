//! Noise-file filtering before size measurement.
//!
//! Lock files, vendored dependencies, generated and minified files, and
//! files matching configured patterns would otherwise dominate the size of a
//! merge request without reflecting review effort.

use std::fmt;
use std::path::{Path, PathBuf};

use cadence_core::DiffConfig;
use serde::Serialize;

use crate::files::FileDiff;

/// Decides which changed files count towards diff metrics.
///
/// # Examples
///
/// ```
/// use cadence_difflens::filter::DiffFilter;
///
/// let filter = DiffFilter::default_filter();
/// assert!(filter.should_skip("package-lock.json"));
/// assert!(!filter.should_skip("src/main.rs"));
/// ```
pub struct DiffFilter {
    skip_patterns: Vec<glob::Pattern>,
    skip_extensions: Vec<String>,
    skip_generated: bool,
}

impl DiffFilter {
    /// Create a filter with the built-in noise rules and no custom patterns.
    pub fn default_filter() -> Self {
        Self::from_config(&DiffConfig::default())
    }

    /// Create a filter from diff configuration.
    ///
    /// Invalid glob patterns are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadence_core::DiffConfig;
    /// use cadence_difflens::filter::DiffFilter;
    ///
    /// let config = DiffConfig {
    ///     skip_patterns: vec!["fixtures/**".into()],
    ///     ..DiffConfig::default()
    /// };
    /// let filter = DiffFilter::from_config(&config);
    /// assert!(filter.should_skip("fixtures/big.json"));
    /// assert!(filter.should_skip("Cargo.lock"));
    /// ```
    pub fn from_config(config: &DiffConfig) -> Self {
        let skip_patterns = config
            .skip_patterns
            .iter()
            .filter_map(|pat| glob::Pattern::new(pat).ok())
            .collect();

        Self {
            skip_patterns,
            skip_extensions: config.skip_extensions.clone(),
            skip_generated: config.skip_generated,
        }
    }

    /// Check if a single file path should be skipped, ignoring content rules.
    pub fn should_skip(&self, path: &str) -> bool {
        self.skip_reason(Path::new(path), "").is_some()
    }

    /// Why `path` with diff text `content` would be skipped, if at all.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use cadence_difflens::filter::{DiffFilter, SkipReason};
    ///
    /// let filter = DiffFilter::default_filter();
    /// let reason = filter.skip_reason(Path::new("api.go"), "@@ -0,0 +1 @@\n+// Code generated by protoc. DO NOT EDIT.");
    /// assert_eq!(reason, Some(SkipReason::GeneratedFile));
    /// ```
    pub fn skip_reason(&self, path: &Path, content: &str) -> Option<SkipReason> {
        let path_str = path.to_string_lossy();
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();

        if self.skip_generated {
            if is_lock_file(&file_name) {
                return Some(SkipReason::LockFile);
            }
            if is_vendored(&path_str) {
                return Some(SkipReason::VendoredCode);
            }
            if is_minified(&file_name, content) {
                return Some(SkipReason::MinifiedFile);
            }
            if is_generated_by_name(&file_name) || is_generated_by_content(content) {
                return Some(SkipReason::GeneratedFile);
            }
        }

        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if self.skip_extensions.iter().any(|skip| skip == ext) {
                return Some(SkipReason::PatternMatch(format!("*.{ext}")));
            }
        }

        self.skip_patterns
            .iter()
            .find(|pat| pat.matches(&path_str))
            .map(|pat| SkipReason::PatternMatch(pat.to_string()))
    }

    /// Partition parsed file diffs into kept and skipped files.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadence_difflens::files::split_unified_diff;
    /// use cadence_difflens::filter::DiffFilter;
    ///
    /// let diff = concat!(
    ///     "diff --git a/src/main.rs b/src/main.rs\n",
    ///     "--- a/src/main.rs\n",
    ///     "+++ b/src/main.rs\n",
    ///     "@@ -1 +1,2 @@\n",
    ///     " line\n",
    ///     "+new\n",
    /// );
    /// let files = split_unified_diff(diff).unwrap();
    /// let result = DiffFilter::default_filter().filter(files);
    /// assert_eq!(result.kept.len(), 1);
    /// assert!(result.skipped.is_empty());
    /// ```
    pub fn filter(&self, diffs: Vec<FileDiff>) -> FilterResult {
        let mut kept = Vec::new();
        let mut skipped = Vec::new();

        for diff in diffs {
            let content: Vec<&str> = diff.hunks.iter().map(|h| h.content.as_str()).collect();
            match self.skip_reason(diff.path(), &content.join("\n")) {
                Some(reason) => skipped.push(SkippedFile {
                    path: diff.path().to_path_buf(),
                    reason,
                }),
                None => kept.push(diff),
            }
        }

        FilterResult { kept, skipped }
    }
}

/// Result of filtering diffs.
pub struct FilterResult {
    /// Diffs that count towards metrics.
    pub kept: Vec<FileDiff>,
    /// Files that were skipped with reasons.
    pub skipped: Vec<SkippedFile>,
}

/// A file that was excluded from metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    /// Path of the skipped file.
    pub path: PathBuf,
    /// Why the file was skipped.
    pub reason: SkipReason,
}

/// Reason a file was skipped.
///
/// # Examples
///
/// ```
/// use cadence_difflens::filter::SkipReason;
///
/// let reason = SkipReason::LockFile;
/// assert_eq!(format!("{reason}"), "lock file");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Package manager lock file.
    LockFile,
    /// Auto-generated code.
    GeneratedFile,
    /// Third-party vendored code.
    VendoredCode,
    /// Minified or bundled file.
    MinifiedFile,
    /// Matched a configured pattern or extension.
    PatternMatch(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::LockFile => write!(f, "lock file"),
            SkipReason::GeneratedFile => write!(f, "generated file"),
            SkipReason::VendoredCode => write!(f, "vendored code"),
            SkipReason::MinifiedFile => write!(f, "minified file"),
            SkipReason::PatternMatch(pat) => write!(f, "pattern: {pat}"),
        }
    }
}

const LOCK_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "Cargo.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "Gemfile.lock",
    "composer.lock",
    "go.sum",
];

fn is_lock_file(file_name: &str) -> bool {
    LOCK_FILES.contains(&file_name)
}

fn is_vendored(path: &str) -> bool {
    path.split('/')
        .any(|part| part == "vendor" || part == "third_party" || part == "node_modules")
}

fn is_minified(file_name: &str, content: &str) -> bool {
    if file_name.ends_with(".min.js") || file_name.ends_with(".min.css") {
        return true;
    }
    // Any line longer than 500 chars suggests a bundle
    content.lines().any(|line| line.len() > 500)
}

fn is_generated_by_name(file_name: &str) -> bool {
    file_name.contains(".generated.")
        || file_name.ends_with(".g.dart")
        || file_name.ends_with(".pb.go")
        || file_name.ends_with(".pb.rs")
}

fn is_generated_by_content(content: &str) -> bool {
    content
        .lines()
        .filter(|line| !line.starts_with("@@"))
        .take(5)
        .any(|line| {
            let body = match line.chars().next() {
                Some('+' | '-' | ' ') => &line[1..],
                _ => line,
            };
            body.contains("// Code generated") || body.contains("# AUTO-GENERATED")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::split_unified_diff;

    fn make_diff(path: &str, content: &str) -> Vec<FileDiff> {
        let diff = format!(
            "diff --git a/{path} b/{path}\n\
             --- a/{path}\n\
             +++ b/{path}\n\
             @@ -1,1 +1,2 @@\n\
             {content}\n"
        );
        split_unified_diff(&diff).unwrap()
    }

    #[test]
    fn lock_files_skipped() {
        let filter = DiffFilter::default_filter();
        for name in LOCK_FILES {
            let result = filter.filter(make_diff(name, "+new line"));
            assert!(result.kept.is_empty(), "expected {name} to be skipped");
            assert_eq!(result.skipped[0].reason, SkipReason::LockFile);
        }
    }

    #[test]
    fn generated_files_skipped_by_name() {
        let filter = DiffFilter::default_filter();
        for name in ["api.generated.ts", "model.g.dart", "proto.pb.go", "msg.pb.rs"] {
            let result = filter.filter(make_diff(name, "+new line"));
            assert!(result.kept.is_empty(), "expected {name} to be skipped");
            assert_eq!(result.skipped[0].reason, SkipReason::GeneratedFile);
        }
    }

    #[test]
    fn generated_files_skipped_by_header() {
        let filter = DiffFilter::default_filter();
        let result = filter.filter(make_diff(
            "gen.go",
            "+// Code generated by protoc. DO NOT EDIT.",
        ));
        assert!(result.kept.is_empty());
        assert_eq!(result.skipped[0].reason, SkipReason::GeneratedFile);
    }

    #[test]
    fn minified_files_skipped() {
        let filter = DiffFilter::default_filter();

        let result = filter.filter(make_diff("app.min.js", "+var x=1;"));
        assert_eq!(result.skipped[0].reason, SkipReason::MinifiedFile);

        let long_line = format!("+{}", "x".repeat(501));
        let result = filter.filter(make_diff("bundle.js", &long_line));
        assert_eq!(result.skipped[0].reason, SkipReason::MinifiedFile);
    }

    #[test]
    fn vendored_code_skipped() {
        let filter = DiffFilter::default_filter();
        for path in ["vendor/lib.go", "third_party/dep.rs", "node_modules/pkg/index.js"] {
            let result = filter.filter(make_diff(path, "+line"));
            assert!(result.kept.is_empty(), "expected {path} to be skipped");
            assert_eq!(result.skipped[0].reason, SkipReason::VendoredCode);
        }
    }

    #[test]
    fn builtin_rules_can_be_disabled() {
        let config = DiffConfig {
            skip_generated: false,
            ..DiffConfig::default()
        };
        let filter = DiffFilter::from_config(&config);
        assert!(!filter.should_skip("Cargo.lock"));
        assert!(!filter.should_skip("vendor/lib.go"));
    }

    #[test]
    fn normal_source_files_kept() {
        let filter = DiffFilter::default_filter();
        let result = filter.filter(make_diff("src/main.rs", "+let x = 1;"));
        assert_eq!(result.kept.len(), 1);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn custom_patterns_from_config() {
        let config = DiffConfig {
            skip_patterns: vec!["*.test.ts".into(), "fixtures/**".into(), "[".into()],
            ..DiffConfig::default()
        };
        let filter = DiffFilter::from_config(&config);

        let result = filter.filter(make_diff("auth.test.ts", "+test line"));
        assert_eq!(
            result.skipped[0].reason,
            SkipReason::PatternMatch("*.test.ts".into())
        );
        assert!(filter.should_skip("fixtures/data/a.json"));
        assert!(!filter.should_skip("src/auth.ts"));
    }

    #[test]
    fn custom_extensions_from_config() {
        let config = DiffConfig {
            skip_extensions: vec!["snap".into()],
            ..DiffConfig::default()
        };
        let filter = DiffFilter::from_config(&config);
        let result = filter.filter(make_diff("component.test.snap", "+snapshot"));
        assert_eq!(
            result.skipped[0].reason,
            SkipReason::PatternMatch("*.snap".into())
        );
    }

    #[test]
    fn empty_input_returns_empty_result() {
        let result = DiffFilter::default_filter().filter(Vec::new());
        assert!(result.kept.is_empty());
        assert!(result.skipped.is_empty());
    }
}
