//! Core types for reconciliation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where target versions are looked up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Build server host (`name[:port]`)
    pub build_host: String,
    /// Namespace under which stacks are published
    pub domain: String,
    /// Stack id, or `latest`
    pub stack: String,
}

impl Target {
    /// Target the `latest` stack of the `default` domain on `build_host`
    pub fn new(build_host: impl Into<String>) -> Self {
        Self {
            build_host: build_host.into(),
            domain: "default".to_string(),
            stack: "latest".to_string(),
        }
    }

    /// Use another domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Use another stack
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }
}

/// Options for one reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Update every manifest package regardless of versions
    pub force: bool,
    /// Report per-package decisions at info level instead of debug
    pub verbose: bool,
    /// Directory downloaded artifacts are staged in
    pub staging_dir: PathBuf,
    /// URL to POST the updated package names to when done
    pub web_callback: Option<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            force: false,
            verbose: false,
            staging_dir: PathBuf::from("/tmp"),
            web_callback: None,
        }
    }
}

impl ReconcileOptions {
    /// Log level for per-package diagnostics
    pub fn diagnostic_level(&self) -> log::Level {
        if self.verbose {
            log::Level::Info
        } else {
            log::Level::Debug
        }
    }
}

/// One package scheduled for replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedUpdate {
    /// Version found locally, `None` when not installed
    pub local_version: Option<String>,
    /// Version pinned by the stack
    pub remote_version: String,
    /// Artifact file name, staged under the staging directory
    pub artifact: String,
}

/// Packages that must change on a host, keyed by package name
///
/// An empty plan means the host already matches the stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdatePlan {
    updates: BTreeMap<String, PlannedUpdate>,
}

impl UpdatePlan {
    /// Create an empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `package`
    pub fn insert(&mut self, package: impl Into<String>, update: PlannedUpdate) {
        self.updates.insert(package.into(), update);
    }

    /// Check if nothing needs to change
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Number of packages to update
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Check if `package` is scheduled
    pub fn contains(&self, package: &str) -> bool {
        self.updates.contains_key(package)
    }

    /// Artifact file name planned for `package`
    pub fn artifact(&self, package: &str) -> Option<&str> {
        self.updates.get(package).map(|u| u.artifact.as_str())
    }

    /// Package names in lexicographic order
    pub fn packages(&self) -> Vec<String> {
        self.updates.keys().cloned().collect()
    }

    /// Iterate entries in package-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlannedUpdate)> {
        self.updates.iter().map(|(name, update)| (name.as_str(), update))
    }

    /// Package name to artifact file name
    pub fn artifacts(&self) -> BTreeMap<String, String> {
        self.updates
            .iter()
            .map(|(name, update)| (name.clone(), update.artifact.clone()))
            .collect()
    }

    /// Staged artifact paths, ordered by package name
    pub fn staged(&self, staging_dir: &Path) -> Vec<StagedArtifact> {
        self.updates
            .iter()
            .map(|(name, update)| StagedArtifact {
                package: name.clone(),
                path: staging_dir.join(&update.artifact),
            })
            .collect()
    }
}

/// A downloaded artifact ready for installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    /// Package the artifact provides
    pub package: String,
    /// Location in the staging directory
    pub path: PathBuf,
}
