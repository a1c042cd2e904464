//! Error types for build server operations.
//!
//! Errors are categorized so callers can tell a missing package apart from
//! an unreachable server.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for build server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of build server errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Server unreachable or transport failure (transient).
    Network,
    /// The server answered that the resource does not exist.
    NotFound,
    /// The server answered with an unexpected status.
    Server,
    /// Local filesystem problem.
    Filesystem,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Build server unreachable",
            Self::NotFound => "Not published on the build server",
            Self::Server => "Unexpected build server response",
            Self::Filesystem => "Local filesystem error",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check that the build host name is right and reachable",
            Self::NotFound => "Verify the package, domain and stack names",
            Self::Server => "Check the build server logs",
            Self::Filesystem => "Check that the staging directory is writable",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the build server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure (DNS, connect, timeout, reset).
    #[error("build server unavailable at {url}: {message}")]
    RemoteUnavailable {
        /// URL that was requested.
        url: String,
        /// Transport error message.
        message: String,
    },

    /// The server signalled absence (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// URL that was requested.
        url: String,
    },

    /// Any other non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Http {
        /// URL that was requested.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The server published a file name that is not a plain file name.
    #[error("unsafe artifact file name {file_name:?}")]
    UnsafeFileName {
        /// File name as returned by the server.
        file_name: String,
    },

    /// Downloading an artifact failed.
    #[error("failed to fetch {file_name}: {source}")]
    Fetch {
        /// Artifact file name.
        file_name: String,
        /// Underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// IO error during file operations.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The completion callback body could not be encoded.
    #[error("invalid callback payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap an error as an artifact fetch failure.
    pub fn fetch(file_name: impl Into<String>, source: Error) -> Self {
        Self::Fetch {
            file_name: file_name.into(),
            source: Box::new(source),
        }
    }

    /// Translate a ureq error for the given URL.
    pub fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(404) => Self::NotFound {
                url: url.to_string(),
            },
            ureq::Error::StatusCode(status) => Self::Http {
                url: url.to_string(),
                status,
            },
            other => Self::RemoteUnavailable {
                url: url.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::RemoteUnavailable { .. } => ErrorCategory::Network,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Http { .. } | Error::UnsafeFileName { .. } => ErrorCategory::Server,
            Error::Fetch { source, .. } => source.category(),
            Error::Io { .. } => ErrorCategory::Filesystem,
            Error::Payload(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_404_is_not_found() {
        let err = Error::from_ureq("http://b/x", ureq::Error::StatusCode(404));
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_other_status_is_server_error() {
        let err = Error::from_ureq("http://b/x", ureq::Error::StatusCode(500));
        match err {
            Error::Http { status, .. } => assert_eq!(status, 500),
            other => panic!("Expected Error::Http, got {other:?}"),
        }
    }

    #[test]
    fn test_transport_error_is_unavailable() {
        let err = Error::from_ureq("http://b/x", ureq::Error::HostNotFound);
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("http://b/x"));
    }

    #[test]
    fn test_fetch_inherits_category() {
        let err = Error::fetch(
            "pkg1-1.0.0-amd64.deb",
            Error::NotFound {
                url: "http://b/debs/pkg1-1.0.0-amd64.deb".to_string(),
            },
        );
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(err.to_string().contains("pkg1-1.0.0-amd64.deb"));
    }

    #[test]
    fn test_io_category() {
        let err = Error::io("/tmp/x", io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert_eq!(err.category(), ErrorCategory::Filesystem);
        assert!(!ErrorCategory::Filesystem.advice().is_empty());
    }
}
