//! Error types for the blobcopy core library.

use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// How an error should be treated by retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Repeating the operation may succeed (timeouts, 5xx, throttling).
    Transient,
    /// Repeating the operation cannot succeed (auth, not-found, bad request).
    Permanent,
    /// The run was cancelled; stop immediately.
    Cancelled,
}

/// Main error type for the blobcopy library.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The run-level cancellation signal fired
    #[error("Operation cancelled")]
    Cancelled,

    /// Post-transfer verification found the destination disagreeing with the source
    #[error("Integrity check failed for {key}: {detail}")]
    Integrity { key: String, detail: String },
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Permission denied or credentials rejected
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The request was malformed or unsupported by the backend
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The backend asked us to slow down
    #[error("Throttled: {0}")]
    Throttled(String),

    /// The operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Storage backend error
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StorageError {
    fn class(&self) -> ErrorClass {
        match self {
            StorageError::NotFound(_)
            | StorageError::PermissionDenied(_)
            | StorageError::InvalidRequest(_) => ErrorClass::Permanent,
            StorageError::Throttled(_) | StorageError::Timeout(_) | StorageError::Backend(_) => {
                ErrorClass::Transient
            }
        }
    }
}

impl Error {
    /// Classify this error for retry purposes.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Cancelled => ErrorClass::Cancelled,
            Error::Config(_) | Error::Serialization(_) => ErrorClass::Permanent,
            // Integrity mismatches get one whole-object redo before the task
            // gives up; see the transfer worker.
            Error::Integrity { .. } => ErrorClass::Transient,
            Error::Io(_) => ErrorClass::Transient,
            Error::Storage(e) => e.class(),
        }
    }

    /// True when the error is a destination-missing stat result.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Storage(StorageError::NotFound(_)))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
