//! Error types for composition tree operations.

use thiserror::Error;

/// Errors that can occur while mutating or querying a composition.
///
/// Lookups that simply find nothing (`index_of_child`, `child_at_time`)
/// are not errors; they return `None` inside `Ok`.
#[derive(Error, Debug)]
pub enum CompositionError {
    /// A position argument fell outside the child sequence.
    #[error("child index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Attempted to insert an element that already belongs to a composition.
    #[error("element '{child}' already belongs to a composition")]
    ChildAlreadyParented { child: String },

    /// A `set_children` list named the same element twice.
    #[error("element '{child}' appears more than once in the child list")]
    DuplicateChild { child: String },

    /// The queried element is not a descendant of this composition.
    #[error("element '{child}' is not a descendant of composition '{parent}'")]
    NotAChild { child: String, parent: String },

    /// Inserting the element would make a composition its own descendant.
    #[error("inserting '{child}' would make a composition its own descendant")]
    WouldFormCycle { child: String },

    /// A caller violated an internal precondition (e.g. bad search bounds).
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

/// Convenience Result type for composition operations.
pub type CompositionResult<T> = Result<T, CompositionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = CompositionError::IndexOutOfBounds { index: 5, len: 3 };
        assert!(err.to_string().contains("5"));
        assert!(err.to_string().contains("3"));

        let err = CompositionError::ChildAlreadyParented {
            child: "clip_a".into(),
        };
        assert!(err.to_string().contains("clip_a"));

        let err = CompositionError::NotAChild {
            child: "clip_b".into(),
            parent: "track_1".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("clip_b") && msg.contains("track_1"));
    }
}
