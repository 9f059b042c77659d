//! Completion-service error types and retry logic.

/// Failure conditions of the external text-completion service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum CompletionErrorKind {
    /// API key not found in environment
    #[display("API key environment variable '{}' not set", _0)]
    MissingApiKey(String),
    /// Transport-level failure before a status was received
    #[display("Completion request failed: {}", _0)]
    Http(String),
    /// Service answered with a non-success status
    #[display("HTTP {} error: {}", status_code, message)]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// Service reported a rate limit
    #[display("Rate limited: {}", _0)]
    RateLimited(String),
    /// Call did not finish in time
    #[display("Completion timed out after {}ms", _0)]
    Timeout(u64),
    /// Response body could not be decoded
    #[display("Malformed completion response: {}", _0)]
    MalformedResponse(String),
    /// Stream ended abnormally
    #[display("Stream interrupted: {}", _0)]
    StreamInterrupted(String),
}

impl CompletionErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionErrorKind::ApiError { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            CompletionErrorKind::Http(_) => true,
            CompletionErrorKind::RateLimited(_) => true,
            CompletionErrorKind::Timeout(_) => true,
            CompletionErrorKind::StreamInterrupted(_) => true,
            _ => false,
        }
    }

    /// Get retry strategy parameters for this error type.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    pub fn retry_strategy_params(&self) -> (u64, usize, u64) {
        match self {
            CompletionErrorKind::ApiError { status_code, .. } => match *status_code {
                429 => (5000, 3, 40),
                503 => (2000, 5, 60),
                500 | 502 | 504 => (1000, 3, 8),
                408 => (2000, 4, 30),
                _ => (2000, 5, 60),
            },
            CompletionErrorKind::RateLimited(_) => (5000, 3, 40),
            CompletionErrorKind::StreamInterrupted(_) => (1000, 3, 10),
            _ => (2000, 5, 60),
        }
    }
}

/// Completion-service error with source location tracking.
///
/// # Examples
///
/// ```
/// use scriptorium_error::{CompletionError, CompletionErrorKind};
///
/// let err = CompletionError::new(CompletionErrorKind::Timeout(30_000));
/// assert!(format!("{}", err).contains("timed out"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Completion Error: {} at line {} in {}", kind, line, file)]
pub struct CompletionError {
    /// The kind of error that occurred
    pub kind: CompletionErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CompletionError {
    /// Create a new CompletionError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CompletionErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// # Examples
///
/// ```
/// use scriptorium_error::{CompletionError, CompletionErrorKind, RetryableError};
///
/// let err = CompletionError::new(CompletionErrorKind::ApiError {
///     status_code: 503,
///     message: "Service unavailable".to_string(),
/// });
///
/// assert!(err.is_retryable());
/// let (backoff, retries, _max_delay) = err.retry_strategy_params();
/// assert_eq!(backoff, 2000);
/// assert_eq!(retries, 5);
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;

    /// Get retry strategy parameters for this error.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        (2000, 5, 60)
    }
}

impl RetryableError for CompletionError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        self.kind.retry_strategy_params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_errors_are_not_retried() {
        let unauthorized = CompletionErrorKind::ApiError {
            status_code: 401,
            message: "bad key".to_string(),
        };
        assert!(!unauthorized.is_retryable());
        assert!(!CompletionErrorKind::MalformedResponse("x".into()).is_retryable());
        assert!(!CompletionErrorKind::MissingApiKey("KEY".into()).is_retryable());
    }

    #[test]
    fn test_rate_limit_uses_long_backoff() {
        let kind = CompletionErrorKind::ApiError {
            status_code: 429,
            message: "slow down".to_string(),
        };
        assert!(kind.is_retryable());
        assert_eq!(kind.retry_strategy_params(), (5000, 3, 40));
    }
}
