//! Error taxonomy for reconciliation.

use std::path::PathBuf;
use thiserror::Error;

/// Which package-manager batch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Batch {
    /// The removal batch
    Remove,
    /// The installation batch
    Install,
}

impl std::fmt::Display for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remove => f.write_str("remove"),
            Self::Install => f.write_str("install"),
        }
    }
}

/// Errors that abort a host's reconciliation.
#[derive(Debug, Error)]
pub enum Error {
    /// The manifest could not be read
    #[error("cannot read manifest {path}: {source}")]
    Manifest {
        /// Manifest location
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Local version lookup failed
    #[error("local version query failed for {package}: {message}")]
    Query {
        /// Package being queried
        package: String,
        /// Details
        message: String,
    },

    /// Build server could not be reached
    #[error("build server unavailable while resolving {package}: {message}")]
    RemoteUnavailable {
        /// Package being resolved
        package: String,
        /// Details
        message: String,
    },

    /// Build server does not know the package, version or stack
    #[error("{package} not found on the build server: {message}")]
    NotFound {
        /// Package being resolved
        package: String,
        /// Details
        message: String,
    },

    /// Artifact download failed
    #[error("failed to fetch {file_name}: {message}")]
    Fetch {
        /// Artifact file name
        file_name: String,
        /// Details
        message: String,
    },

    /// The package manager batch exited non-zero
    #[error("package {batch} failed (exit status {}): {message}", .status.map_or_else(|| "signal".to_string(), |s| s.to_string()))]
    Manager {
        /// Which batch failed
        batch: Batch,
        /// Exit status of the tool, if it exited normally
        status: Option<i32>,
        /// Details
        message: String,
    },

    /// Completion callback failed; never escapes [`crate::Engine::reconcile`]
    #[error("web callback to {url} failed: {message}")]
    Callback {
        /// Callback URL
        url: String,
        /// Details
        message: String,
    },
}

/// Result type for reconciliation.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_error_display() {
        let err = Error::Manager {
            batch: Batch::Remove,
            status: Some(2),
            message: "dpkg said no".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "package remove failed (exit status 2): dpkg said no"
        );

        let err = Error::Manager {
            batch: Batch::Install,
            status: None,
            message: "killed".to_string(),
        };
        assert!(err.to_string().contains("exit status signal"));
    }
}
