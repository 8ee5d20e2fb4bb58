//! Error types for Trellis.
//!
//! The hot paths of the core deliberately do not use `Result`: a position
//! that fails to convert is an `Option::None` sentinel and an unhandled
//! command is a `false` return, because both are normal occurrences in a
//! layered stack. `Error` exists for the state snapshot surface, where
//! malformed input genuinely is an error.

/// Result type alias for Trellis operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when loading externally supplied state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A persisted property value could not be parsed.
    #[error("invalid value for property '{key}': {message}")]
    InvalidProperty { key: String, message: String },

    /// A persisted property referenced by name is missing.
    #[error("missing property '{key}'")]
    MissingProperty { key: String },
}

impl Error {
    /// Creates an invalid-property error.
    pub fn invalid_property(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProperty {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a missing-property error.
    pub fn missing_property(key: impl Into<String>) -> Self {
        Self::MissingProperty { key: key.into() }
    }
}
