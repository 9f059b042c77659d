//! Pipeline orchestration error types.

/// Specific error conditions for pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PipelineErrorKind {
    /// The step list is empty
    #[display("Pipeline has no steps")]
    EmptyPlan,
    /// A step depends on itself or on a step that cannot have completed first
    #[display("Step {} depends on step {} which will not have completed before it runs", step, dependency)]
    DependencyViolation {
        /// Index of the offending step
        step: usize,
        /// Declared dependency index
        dependency: usize,
    },
    /// A step names a dependency index outside the plan
    #[display("Step {} depends on unknown step {} (plan has {} steps)", step, dependency, total)]
    UnknownDependency {
        /// Index of the offending step
        step: usize,
        /// Declared dependency index
        dependency: usize,
        /// Number of steps in the plan
        total: usize,
    },
    /// A run is already live for the same project/chapter target
    #[display("A pipeline run is already in progress for {}", _0)]
    AlreadyRunning(String),
    /// No live run is registered under the id
    #[display("Pipeline run '{}' not found", _0)]
    RunNotFound(String),
    /// No agent is configured for a role
    #[display("No agent configured for role '{}'", _0)]
    MissingAgent(String),
    /// A plan file could not be parsed
    #[display("Failed to parse pipeline plan: {}", _0)]
    PlanParse(String),
    /// The run handle was already driven once
    #[display("Pipeline run '{}' was already started", _0)]
    AlreadyStarted(String),
    /// One or more post-step processors failed
    #[display("Processor errors: {}", _0)]
    ProcessorFailed(String),
    /// The task driving a run panicked or was aborted
    #[display("Pipeline task failed: {}", _0)]
    TaskFailed(String),
}

/// Error type for pipeline operations.
///
/// # Examples
///
/// ```
/// use scriptorium_error::{PipelineError, PipelineErrorKind};
///
/// let err = PipelineError::new(PipelineErrorKind::EmptyPlan);
/// assert!(format!("{}", err).contains("no steps"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The specific error condition
    pub kind: PipelineErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new PipelineError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
