//! Core types for build server access.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Domain used when none is given.
pub const DEFAULT_DOMAIN: &str = "default";

/// Stack used when none is given.
pub const DEFAULT_STACK: &str = "latest";

/// Staging directory for downloaded artifacts.
pub const DEFAULT_STAGING_DIR: &str = "/tmp";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Canonical URLs exposed by a build server.
///
/// All endpoints are plain HTTP under `http://{build_host}/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    build_host: String,
}

impl Endpoints {
    /// Endpoints for the given build host (`name[:port]`).
    pub fn new(build_host: impl Into<String>) -> Self {
        Self {
            build_host: build_host.into(),
        }
    }

    /// Version of a package in a stack.
    pub fn version_url(&self, domain: &str, stack: &str, package: &str) -> String {
        format!(
            "http://{}/domains/{domain}/stacks/{stack}/packages/{package}/version",
            self.build_host
        )
    }

    /// Artifact file name for a package version.
    pub fn artifact_name_url(&self, package: &str, version: &str) -> String {
        format!(
            "http://{}/packages/{package}/version/{version}/file",
            self.build_host
        )
    }

    /// Download location of an artifact.
    pub fn download_url(&self, file_name: &str) -> String {
        format!("http://{}/debs/{file_name}", self.build_host)
    }
}

/// Body posted to a completion callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    /// Packages that were updated on the host.
    pub packages: Vec<String>,
}
