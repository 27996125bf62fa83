use std::fmt;
use std::time::Duration;

/// Per-operation retry settings. The engine never mutates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Bound on each individual attempt, not on the whole operation.
    pub timeout: Duration,
    /// Total attempts including the first; always at least 1.
    pub max_attempts: u32,
    /// Constant pause between consecutive attempts.
    pub retry_delay: Duration,
}

impl FetchConfig {
    pub fn new(timeout: Duration, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            timeout,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), 3, Duration::from_secs(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    ConnectionError,
    HttpStatusError(u16),
    OtherRequestError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "request timed out"),
            FailureKind::ConnectionError => write!(f, "connection error"),
            FailureKind::HttpStatusError(code) => write!(f, "http status {code}"),
            FailureKind::OtherRequestError => write!(f, "request error"),
        }
    }
}

/// Result of a single network attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { body: String, status: u16 },
    Failure { kind: FailureKind, detail: String },
}

impl AttemptOutcome {
    pub(crate) fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            detail: detail.into(),
        }
    }
}

/// Final answer of one fetch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Title(String),
    NoTitle,
    Failed,
    Cancelled,
}
