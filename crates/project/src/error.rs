//! Error types for timeline file operations.

use thiserror::Error;

use cutlist_composition::CompositionError;

/// Errors that can occur while reading or writing timeline files.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// File I/O error (read, write, path resolution).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file was written by a newer format version.
    #[error("Unsupported timeline file version: {version}")]
    UnsupportedVersion { version: u64 },

    /// The file parsed but fails structural validation.
    #[error("Invalid timeline file: {reason}")]
    InvalidTimeline { reason: String },

    /// Rebuilding the composition tree from file data failed.
    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    /// The timeline file path does not exist or is not a file.
    #[error("Timeline file not found: {path}")]
    NotFound { path: String },
}

/// Convenience Result type for timeline file operations.
pub type ProjectResult<T> = Result<T, ProjectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = ProjectError::UnsupportedVersion { version: 99 };
        assert!(err.to_string().contains("99"));

        let err = ProjectError::InvalidTimeline {
            reason: "root is not a composition".into(),
        };
        assert!(err.to_string().contains("root is not a composition"));

        let err = ProjectError::NotFound {
            path: "/tmp/missing.ctl".into(),
        };
        assert!(err.to_string().contains("missing.ctl"));
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let proj_err: ProjectError = io_err.into();
        assert!(matches!(proj_err, ProjectError::Io(_)));
    }

    #[test]
    fn composition_error_conversion() {
        let comp_err = CompositionError::IndexOutOfBounds { index: 4, len: 0 };
        let proj_err: ProjectError = comp_err.into();
        assert!(matches!(proj_err, ProjectError::Composition(_)));
    }
}
