use std::path::PathBuf;

/// Errors that can occur across Cadence.
///
/// Library crates use this type directly; the binary reports it through
/// `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use cadence_core::CadenceError;
///
/// let err = CadenceError::MalformedHunkHeader("@@ -x +1 @@".into());
/// assert!(err.to_string().contains("@@ -x +1 @@"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CadenceError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(cadence::config))]
    Config(String),

    /// A line starting with `@@` did not match the hunk header grammar.
    #[error("malformed hunk header: {0}")]
    #[diagnostic(
        code(cadence::diff::malformed_hunk_header),
        help("hunk headers look like `@@ -OLDSTART[,OLDLINES] +NEWSTART[,NEWLINES] @@`")
    )]
    MalformedHunkHeader(String),

    /// A stored timeline row could not be turned into a typed event.
    #[error("invalid timeline event: {0}")]
    #[diagnostic(code(cadence::event::invalid))]
    InvalidEvent(String),

    /// Parsing the diff of a specific file failed.
    #[error("{path}: {source}")]
    Diff {
        /// Path of the file whose diff was rejected.
        path: String,
        /// Underlying parse failure.
        #[source]
        source: Box<CadenceError>,
    },

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl CadenceError {
    /// Attach the path of the file being processed to an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadence_core::CadenceError;
    ///
    /// let err = CadenceError::MalformedHunkHeader("@@ bad".into()).in_file("src/lib.rs");
    /// assert_eq!(err.to_string(), "src/lib.rs: malformed hunk header: @@ bad");
    /// ```
    pub fn in_file(self, path: impl Into<String>) -> Self {
        CadenceError::Diff {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CadenceError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = CadenceError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = CadenceError::FileNotFound(PathBuf::from("/tmp/missing.json"));
        assert!(err.to_string().contains("/tmp/missing.json"));
    }

    #[test]
    fn diff_error_keeps_source() {
        use std::error::Error;

        let err = CadenceError::MalformedHunkHeader("@@ nope".into()).in_file("a.rs");
        let source = err.source().expect("diff error has a source");
        assert_eq!(source.to_string(), "malformed hunk header: @@ nope");
    }
}
