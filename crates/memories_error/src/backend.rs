//! Object store backend error types.

/// Kinds of failures an object store backend reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum BackendErrorKind {
    /// Object does not exist
    #[display("Object not found: {}", _0)]
    NotFound(String),
    /// Create-only write hit an existing object
    #[display("Object already exists: {}", _0)]
    AlreadyExists(String),
    /// Local I/O failure
    #[display("I/O failure: {}", _0)]
    Io(String),
    /// Remote service failure (network, auth, throttling)
    #[display("Backend unavailable: {}", _0)]
    Unavailable(String),
}

/// Backend error with source location.
///
/// # Examples
///
/// ```
/// use memories_error::{BackendError, BackendErrorKind};
///
/// let err = BackendError::new(BackendErrorKind::NotFound("events/e1/a.jpg".into()));
/// assert!(err.is_not_found());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Backend Error: {} at line {} in {}", kind, line, file)]
pub struct BackendError {
    /// The kind of error that occurred
    pub kind: BackendErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl BackendError {
    /// Create a new BackendError at the current location.
    #[track_caller]
    pub fn new(kind: BackendErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether the backend unambiguously reported a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, BackendErrorKind::NotFound(_))
    }
}

/// Result type for object store backends.
pub type BackendResult<T> = std::result::Result<T, BackendError>;
