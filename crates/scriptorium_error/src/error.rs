//! Top-level error wrapper types.

use crate::{BuilderError, CompletionError, ConfigError, JsonError, PipelineError, StoreError};

/// Every error condition a Scriptorium crate can report.
///
/// # Examples
///
/// ```
/// use scriptorium_error::{ScriptoriumError, ConfigError};
///
/// let err: ScriptoriumError = ConfigError::new("bad value").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ScriptoriumErrorKind {
    /// Completion service error
    #[from(CompletionError)]
    Completion(CompletionError),
    /// Pipeline orchestration error
    #[from(PipelineError)]
    Pipeline(PipelineError),
    /// Narrative store error
    #[from(StoreError)]
    Store(StoreError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
}

/// Scriptorium error with kind discrimination.
///
/// # Examples
///
/// ```
/// use scriptorium_error::{ScriptoriumErrorKind, ScriptoriumResult, StoreError, StoreErrorKind};
///
/// fn lookup() -> ScriptoriumResult<()> {
///     Err(StoreError::new(StoreErrorKind::ProjectNotFound("p1".into())))?
/// }
///
/// let err = lookup().unwrap_err();
/// assert!(matches!(err.kind(), ScriptoriumErrorKind::Store(_)));
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Scriptorium Error: {}", _0)]
pub struct ScriptoriumError(Box<ScriptoriumErrorKind>);

impl ScriptoriumError {
    /// Create a new error from a kind.
    pub fn new(kind: ScriptoriumErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ScriptoriumErrorKind {
        &self.0
    }

    /// Returns the completion failure underneath, if this is one.
    pub fn as_completion(&self) -> Option<&CompletionError> {
        match self.kind() {
            ScriptoriumErrorKind::Completion(e) => Some(e),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to ScriptoriumErrorKind
impl<T> From<T> for ScriptoriumError
where
    T: Into<ScriptoriumErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Scriptorium operations.
pub type ScriptoriumResult<T> = std::result::Result<T, ScriptoriumError>;
