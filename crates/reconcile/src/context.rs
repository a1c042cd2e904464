//! Provider traits
//!
//! These traits let the engine run without depending on a particular
//! package tool or build server client. Implementations translate their own
//! errors into [`crate::Error`].

use crate::error::Result;
use crate::types::{StagedArtifact, Target};
use std::path::Path;

/// Source of local and target versions
pub trait VersionSource {
    /// Installed version of `package`
    ///
    /// `Ok(None)` means the package is not installed; unreadable metadata is
    /// an [`crate::Error::Query`].
    fn local_version(&self, package: &str) -> Result<Option<String>>;

    /// Version of `package` pinned by the target stack
    fn remote_version(&self, target: &Target, package: &str) -> Result<String>;
}

/// Resolves and retrieves distributable artifacts
pub trait ArtifactFetcher {
    /// Artifact file name published for `package` at `version`
    fn resolve_artifact_name(&self, target: &Target, package: &str, version: &str)
    -> Result<String>;

    /// Download `file_name` into `staging_dir`, overwriting any previous copy
    ///
    /// Returns the number of bytes written.
    fn download(&self, target: &Target, file_name: &str, staging_dir: &Path) -> Result<u64>;
}

/// Removes and installs packages in batches
pub trait PackageManager {
    /// Remove all `packages` with one command
    fn remove(&self, packages: &[String]) -> Result<()>;

    /// Install all `artifacts` with one command, in overwrite mode
    fn install(&self, artifacts: &[StagedArtifact]) -> Result<()>;
}

/// Receives the list of updated packages once a host is done
pub trait CompletionCallback {
    /// Deliver `packages` to `url`
    ///
    /// Returns `Ok(true)` when the receiver acknowledged with HTTP 200.
    fn notify(&self, url: &str, packages: &[String]) -> Result<bool>;
}

/// Callback that delivers nothing
pub struct NoCallback;

impl CompletionCallback for NoCallback {
    fn notify(&self, url: &str, _packages: &[String]) -> Result<bool> {
        log::debug!("no callback transport configured, not posting to {url}");
        Ok(false)
    }
}
