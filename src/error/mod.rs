use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of a tool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// yt-dlp is missing or cannot be executed
    ToolNotFound,

    /// The URL does not resolve to any content
    TargetNotFound,

    /// Malformed time range, URL or other argument
    InvalidInput,

    /// Transient connectivity failure
    NetworkError,

    /// Sign-in, age or membership verification required
    PermissionDenied,

    /// Requested quality or format is not offered for this video
    FormatUnavailable,

    /// No caption tracks exist for the requested languages
    CaptionsUnavailable,

    /// Cache read/write failure, absorbed by the cache itself
    CacheError,

    /// Anything not matching a known failure pattern
    Unclassified,
}

impl ErrorKind {
    /// Whether failures of this kind are worth retrying by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkError | ErrorKind::FormatUnavailable | ErrorKind::Unclassified
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ToolNotFound => "ToolNotFound",
            ErrorKind::TargetNotFound => "TargetNotFound",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::FormatUnavailable => "FormatUnavailable",
            ErrorKind::CaptionsUnavailable => "CaptionsUnavailable",
            ErrorKind::CacheError => "CacheError",
            ErrorKind::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified tool failure.
///
/// The retry policy only looks at `retryable`; `kind` is kept for callers and
/// for the message shown in a failed [`ToolResponse`](crate::tools::ToolResponse).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

/// yt-dlp stderr fragments (lowercased) and the kind they map to. First match wins.
const STDERR_PATTERNS: &[(&str, ErrorKind)] = &[
    ("requested format is not available", ErrorKind::FormatUnavailable),
    ("there are no subtitles", ErrorKind::CaptionsUnavailable),
    ("no subtitles", ErrorKind::CaptionsUnavailable),
    ("sign in to confirm", ErrorKind::PermissionDenied),
    ("private video", ErrorKind::PermissionDenied),
    ("members-only", ErrorKind::PermissionDenied),
    ("age-restricted", ErrorKind::PermissionDenied),
    ("http error 403", ErrorKind::PermissionDenied),
    ("video unavailable", ErrorKind::TargetNotFound),
    ("this video is unavailable", ErrorKind::TargetNotFound),
    ("does not exist", ErrorKind::TargetNotFound),
    ("http error 404", ErrorKind::TargetNotFound),
    ("unsupported url", ErrorKind::TargetNotFound),
    ("unable to download webpage", ErrorKind::NetworkError),
    ("timed out", ErrorKind::NetworkError),
    ("connection reset", ErrorKind::NetworkError),
    ("connection refused", ErrorKind::NetworkError),
    ("temporary failure in name resolution", ErrorKind::NetworkError),
    ("getaddrinfo failed", ErrorKind::NetworkError),
    ("http error 5", ErrorKind::NetworkError),
];

impl ToolError {
    /// Create an error whose retryability follows its kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn captions_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CaptionsUnavailable, message)
    }

    pub fn unclassified(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unclassified, message)
    }

    /// Terminal failure produced once the retry budget is spent
    pub fn exhausted(attempts: u32, last: &ToolError) -> Self {
        Self {
            kind: ErrorKind::Unclassified,
            message: format!(
                "Operation failed after {} attempt{}: {}",
                attempts,
                if attempts == 1 { "" } else { "s" },
                last.message
            ),
            retryable: false,
        }
    }

    /// Classify a failed yt-dlp run from its stderr output
    pub fn from_stderr(stderr: &str) -> Self {
        let lowered = stderr.to_lowercase();
        let kind = STDERR_PATTERNS
            .iter()
            .find(|(pattern, _)| lowered.contains(pattern))
            .map(|(_, kind)| *kind)
            .unwrap_or(ErrorKind::Unclassified);

        Self::new(kind, summarize_stderr(stderr))
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(error: anyhow::Error) -> Self {
        Self::unclassified(error.to_string())
    }
}

impl From<std::io::Error> for ToolError {
    fn from(error: std::io::Error) -> Self {
        Self::unclassified(error.to_string())
    }
}

/// Keep the `ERROR:` lines of yt-dlp output when present, otherwise the trimmed text
fn summarize_stderr(stderr: &str) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();

    if errors.is_empty() {
        let trimmed = stderr.trim();
        if trimmed.is_empty() {
            "yt-dlp exited with an error and no output".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        errors.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_defaults() {
        assert!(ErrorKind::NetworkError.is_retryable());
        assert!(ErrorKind::FormatUnavailable.is_retryable());
        assert!(ErrorKind::Unclassified.is_retryable());
        assert!(!ErrorKind::ToolNotFound.is_retryable());
        assert!(!ErrorKind::InvalidInput.is_retryable());
        assert!(!ErrorKind::CaptionsUnavailable.is_retryable());
    }

    #[test]
    fn test_classify_stderr() {
        let err = ToolError::from_stderr(
            "WARNING: something odd\nERROR: [youtube] abc: Private video. Sign in if you've been granted access",
        );
        assert_eq!(err.kind, ErrorKind::PermissionDenied);
        assert!(!err.retryable);
        assert_eq!(
            err.message,
            "ERROR: [youtube] abc: Private video. Sign in if you've been granted access"
        );

        let err = ToolError::from_stderr("ERROR: Requested format is not available. Use --list-formats");
        assert_eq!(err.kind, ErrorKind::FormatUnavailable);
        assert!(err.retryable);

        let err = ToolError::from_stderr("ERROR: Unable to download webpage: <urlopen error timed out>");
        assert_eq!(err.kind, ErrorKind::NetworkError);

        let err = ToolError::from_stderr("ERROR: [youtube] xyz: Video unavailable");
        assert_eq!(err.kind, ErrorKind::TargetNotFound);
    }

    #[test]
    fn test_unknown_stderr_is_unclassified() {
        let err = ToolError::from_stderr("something exploded");
        assert_eq!(err.kind, ErrorKind::Unclassified);
        assert!(err.retryable);
        assert_eq!(err.message, "something exploded");

        let err = ToolError::from_stderr("   ");
        assert_eq!(err.message, "yt-dlp exited with an error and no output");
    }

    #[test]
    fn test_exhausted_is_terminal() {
        let last = ToolError::new(ErrorKind::NetworkError, "connection reset");
        let err = ToolError::exhausted(3, &last);
        assert_eq!(err.kind, ErrorKind::Unclassified);
        assert!(!err.retryable);
        assert_eq!(err.message, "Operation failed after 3 attempts: connection reset");
    }
}
