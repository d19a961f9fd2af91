use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CadenceError;

/// Top-level configuration loaded from `.cadence.toml`.
///
/// Resolution order: `--config` flag > `./.cadence.toml` > defaults.
///
/// # Examples
///
/// ```
/// use cadence_core::CadenceConfig;
///
/// let config = CadenceConfig::default();
/// assert_eq!(config.size.xs, 10);
/// assert!(config.diff.skip_generated);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Which files count towards diff metrics.
    #[serde(default)]
    pub diff: DiffConfig,
    /// Size label thresholds.
    #[serde(default)]
    pub size: SizeConfig,
    /// Parallel batch settings.
    #[serde(default)]
    pub batch: BatchConfig,
}

impl CadenceConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::Io`] if the file cannot be read,
    /// [`CadenceError::Toml`] if the content is not valid TOML, or
    /// [`CadenceError::Config`] if the size thresholds are out of order.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cadence_core::CadenceConfig;
    /// use std::path::Path;
    ///
    /// let config = CadenceConfig::from_file(Path::new(".cadence.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, CadenceError> {
        if !path.exists() {
            return Err(CadenceError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::Toml`] if parsing fails, or
    /// [`CadenceError::Config`] if the size thresholds are not ascending.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadence_core::CadenceConfig;
    ///
    /// let toml = r#"
    /// [size]
    /// xs = 5
    /// "#;
    /// let config = CadenceConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.size.xs, 5);
    /// assert_eq!(config.size.s, 50);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, CadenceError> {
        let config: Self = toml::from_str(content)?;
        config.size.validate()?;
        Ok(config)
    }
}

/// Controls which changed files contribute to diff metrics.
///
/// # Examples
///
/// ```
/// use cadence_core::DiffConfig;
///
/// let config = DiffConfig::default();
/// assert!(config.skip_patterns.is_empty());
/// assert!(config.skip_generated);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Glob patterns for files excluded from size metrics.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    /// File extensions excluded from size metrics.
    #[serde(default)]
    pub skip_extensions: Vec<String>,
    /// Skip lock files, vendored code, and generated files (default: true).
    #[serde(default = "default_skip_generated")]
    pub skip_generated: bool,
}

fn default_skip_generated() -> bool {
    true
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            skip_patterns: Vec::new(),
            skip_extensions: Vec::new(),
            skip_generated: default_skip_generated(),
        }
    }
}

/// Inclusive upper bounds, in effective changed lines, for each size label.
///
/// Anything above `l` is labelled `xl`.
///
/// # Examples
///
/// ```
/// use cadence_core::SizeConfig;
///
/// let config = SizeConfig::default();
/// assert_eq!((config.xs, config.s, config.m, config.l), (10, 50, 250, 1000));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeConfig {
    /// Upper bound for `xs` (default: 10).
    #[serde(default = "default_xs")]
    pub xs: u32,
    /// Upper bound for `s` (default: 50).
    #[serde(default = "default_s")]
    pub s: u32,
    /// Upper bound for `m` (default: 250).
    #[serde(default = "default_m")]
    pub m: u32,
    /// Upper bound for `l` (default: 1000).
    #[serde(default = "default_l")]
    pub l: u32,
}

fn default_xs() -> u32 {
    10
}

fn default_s() -> u32 {
    50
}

fn default_m() -> u32 {
    250
}

fn default_l() -> u32 {
    1000
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            xs: default_xs(),
            s: default_s(),
            m: default_m(),
            l: default_l(),
        }
    }
}

impl SizeConfig {
    fn validate(&self) -> Result<(), CadenceError> {
        if self.xs < self.s && self.s < self.m && self.m < self.l {
            Ok(())
        } else {
            Err(CadenceError::Config(format!(
                "size thresholds must be strictly ascending (xs={}, s={}, m={}, l={})",
                self.xs, self.s, self.m, self.l
            )))
        }
    }
}

/// Settings for processing many merge requests at once.
///
/// # Examples
///
/// ```
/// use cadence_core::BatchConfig;
///
/// assert!(BatchConfig::default().threads.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Worker threads for batch runs (default: one per CPU).
    pub threads: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = CadenceConfig::default();
        assert!(config.diff.skip_patterns.is_empty());
        assert!(config.diff.skip_extensions.is_empty());
        assert!(config.diff.skip_generated);
        assert_eq!(config.size.xs, 10);
        assert_eq!(config.size.s, 50);
        assert_eq!(config.size.m, 250);
        assert_eq!(config.size.l, 1000);
        assert!(config.batch.threads.is_none());
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[diff]
skip_patterns = ["fixtures/**", "*.snap"]
skip_extensions = ["lock"]
skip_generated = false

[size]
xs = 5
s = 20
m = 100
l = 400

[batch]
threads = 4
"#;
        let config = CadenceConfig::from_toml(toml).unwrap();
        assert_eq!(config.diff.skip_patterns, vec!["fixtures/**", "*.snap"]);
        assert_eq!(config.diff.skip_extensions, vec!["lock"]);
        assert!(!config.diff.skip_generated);
        assert_eq!(config.size.l, 400);
        assert_eq!(config.batch.threads, Some(4));
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = CadenceConfig::from_toml("").unwrap();
        assert_eq!(config.size.m, 250);
        assert!(config.diff.skip_generated);
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = CadenceConfig::from_toml("{{invalid}}");
        assert!(matches!(result, Err(CadenceError::Toml(_))));
    }

    #[test]
    fn unordered_thresholds_are_rejected() {
        let toml = r#"
[size]
xs = 100
s = 50
"#;
        let result = CadenceConfig::from_toml(toml);
        assert!(matches!(result, Err(CadenceError::Config(_))));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = CadenceConfig::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(CadenceError::FileNotFound(_))));
    }
}
