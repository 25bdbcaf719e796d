//! Error types for the docket store
//!
//! One error enum shared by every crate in the workspace. `thiserror`
//! provides the `Display` and `Error` implementations.

use thiserror::Error;

/// Result type alias for docket operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the docket store
#[derive(Debug, Error)]
pub enum Error {
    /// A root-level value was not a container, or a nested write ran
    /// through a non-container intermediate
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A path specifier could not be parsed
    #[error("invalid path specifier: {0}")]
    PathResolution(String),

    /// The backing store could not be opened or initialized
    #[error("construction failed: {0}")]
    Construction(String),

    /// The backing store reported a failure after open
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored row could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid operation or state
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
