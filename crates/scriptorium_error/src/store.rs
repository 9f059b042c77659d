//! Narrative store error types.

/// Specific error conditions raised by a narrative store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum StoreErrorKind {
    /// Project does not exist
    #[display("Project not found: {}", _0)]
    ProjectNotFound(String),
    /// Chapter does not exist in the project
    #[display("Chapter not found: {}", _0)]
    ChapterNotFound(String),
    /// Foreshadowing item does not exist
    #[display("Foreshadowing item not found: {}", _0)]
    ForeshadowingNotFound(String),
    /// Backend failure (I/O, connection, serialization)
    #[display("Store backend error: {}", _0)]
    Backend(String),
}

/// Narrative store error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Store Error: {} at line {} in {}", kind, line, file)]
pub struct StoreError {
    /// The specific error kind
    pub kind: StoreErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// Source file where error occurred
    pub file: &'static str,
}

impl StoreError {
    /// Create a new store error.
    #[track_caller]
    pub fn new(kind: StoreErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
