//! Error types for dpkg operations.
//!
//! Errors carry the exit status reported by the tool so callers can surface it
//! verbatim. Failed batches are reported, never retried.

use std::path::PathBuf;
use thiserror::Error;

/// Categories of dpkg errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The package database could not be read
    Query,
    /// Another process holds the dpkg frontend lock
    Locked,
    /// Dependency or file conflict between packages
    Conflict,
    /// Not running with enough privileges
    Permission,
    /// dpkg is not installed on this host
    DpkgNotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Check if running the same batch again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Locked)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Query => "Package database unreadable",
            Self::Locked => "Package database locked",
            Self::Conflict => "Package conflict",
            Self::Permission => "Permission denied",
            Self::DpkgNotFound => "dpkg not installed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Query => "Check the output of `dpkg-query -W` on the host",
            Self::Locked => "Wait for the other package operation to finish",
            Self::Conflict => "Inspect the dpkg output and fix the package set by hand",
            Self::Permission => "Run the updater as root",
            Self::DpkgNotFound => "This tool only supports Debian-based hosts",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during dpkg operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The local package metadata could not be read
    #[error("cannot read local version of {package}: {message}")]
    Query {
        /// Package whose metadata was requested
        package: String,
        /// Details from dpkg-query
        message: String,
    },

    /// The frontend lock is held by another process
    #[error("dpkg database is locked (exit status {})", display_status(.status))]
    Locked {
        /// Exit status of the tool, if it exited normally
        status: Option<i32>,
    },

    /// Dependency problems or overwrite conflicts
    #[error("conflict (exit status {}): {message}", display_status(.status))]
    Conflict {
        /// Exit status of the tool, if it exited normally
        status: Option<i32>,
        /// Description of the conflict
        message: String,
    },

    /// Superuser privileges are required
    #[error("permission denied (exit status {}): {message}", display_status(.status))]
    Permission {
        /// Exit status of the tool, if it exited normally
        status: Option<i32>,
        /// Details about what was refused
        message: String,
    },

    /// dpkg is not installed or not in PATH
    #[error("dpkg not found")]
    DpkgNotFound,

    /// Command returned a non-zero exit status
    #[error("{message} (exit status {}): {stderr}", display_status(.status))]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Exit status of the tool, if it exited normally
        status: Option<i32>,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// IO error while spawning or reading a command
    #[error("IO error running {path}: {source}")]
    Io {
        /// Executable involved in the error
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

fn display_status(status: &Option<i32>) -> String {
    status.map_or_else(|| "signal".to_string(), |s| s.to_string())
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Query { .. } => ErrorCategory::Query,
            Error::Locked { .. } => ErrorCategory::Locked,
            Error::Conflict { .. } => ErrorCategory::Conflict,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::DpkgNotFound => ErrorCategory::DpkgNotFound,
            Error::CommandFailed { .. } | Error::Io { .. } => ErrorCategory::Other,
        }
    }

    /// Check if running the same batch again later may succeed.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Exit status of the failed tool, when one was observed.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            Error::Locked { status }
            | Error::Conflict { status, .. }
            | Error::Permission { status, .. }
            | Error::CommandFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Create an error from dpkg output.
    ///
    /// Analyzes stderr to categorize the failure.
    pub fn from_dpkg_output(operation: &str, status: Option<i32>, stderr: &str) -> Self {
        let stderr_lower = stderr.to_lowercase();

        if stderr_lower.contains("is locked by another process")
            || stderr_lower.contains("unable to acquire the dpkg frontend lock")
            || stderr_lower.contains("could not get lock")
        {
            return Error::Locked { status };
        }

        if stderr_lower.contains("requires superuser privilege")
            || stderr_lower.contains("permission denied")
            || stderr_lower.contains("operation not permitted")
        {
            return Error::Permission {
                status,
                message: stderr.trim().to_string(),
            };
        }

        if stderr_lower.contains("dependency problems")
            || stderr_lower.contains("trying to overwrite")
            || stderr_lower.contains("conflicting packages")
        {
            return Error::Conflict {
                status,
                message: stderr.trim().to_string(),
            };
        }

        Error::CommandFailed {
            message: format!("dpkg {operation} failed"),
            status,
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for dpkg operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dpkg_output_locked() {
        let err = Error::from_dpkg_output(
            "remove",
            Some(2),
            "dpkg: error: dpkg frontend lock was locked by another process with pid 4242\n\
             dpkg: error: unable to acquire the dpkg frontend lock",
        );
        assert_eq!(err.category(), ErrorCategory::Locked);
        assert_eq!(err.exit_status(), Some(2));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_dpkg_output_permission() {
        let err = Error::from_dpkg_output(
            "install",
            Some(2),
            "dpkg: error: requested operation requires superuser privilege",
        );
        assert_eq!(err.category(), ErrorCategory::Permission);
    }

    #[test]
    fn test_from_dpkg_output_conflict() {
        let err = Error::from_dpkg_output(
            "install",
            Some(1),
            "dpkg: dependency problems prevent configuration of pkg1:",
        );
        assert_eq!(err.category(), ErrorCategory::Conflict);
        assert_eq!(err.exit_status(), Some(1));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_dpkg_output_other_keeps_status() {
        let err = Error::from_dpkg_output("remove", Some(3), "something odd\n");
        assert_eq!(err.category(), ErrorCategory::Other);
        assert_eq!(err.exit_status(), Some(3));
        assert_eq!(
            err.to_string(),
            "dpkg remove failed (exit status 3): something odd"
        );
    }

    #[test]
    fn test_signal_status_display() {
        let err = Error::Locked { status: None };
        assert!(err.to_string().contains("signal"));
        assert!(!ErrorCategory::Locked.advice().is_empty());
    }
}
