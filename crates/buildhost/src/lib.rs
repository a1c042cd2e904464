//! # buildhost
//!
//! Client for the build server that publishes package stacks.
//!
//! This crate provides functionality for:
//! - Resolving the version of a package pinned by a stack
//! - Resolving the artifact file name for a package version
//! - Downloading artifacts into a staging directory
//! - Posting completion callbacks
//!
//! ## Example
//!
//! ```no_run
//! use buildhost::{Client, DEFAULT_DOMAIN, DEFAULT_STACK};
//! use std::path::Path;
//!
//! let client = Client::new();
//! let version = client
//!     .remote_version("buildbot-64", DEFAULT_DOMAIN, DEFAULT_STACK, "nginx")
//!     .unwrap();
//! let file = client.artifact_name("buildbot-64", "nginx", &version).unwrap();
//! client.download("buildbot-64", &file, Path::new("/tmp")).unwrap();
//! ```
//!
//! ## Endpoints
//!
//! | Purpose        | URL                                                             |
//! |----------------|-----------------------------------------------------------------|
//! | Stack version  | `http://{host}/domains/{domain}/stacks/{stack}/packages/{p}/version` |
//! | Artifact name  | `http://{host}/packages/{p}/version/{v}/file`                   |
//! | Download       | `http://{host}/debs/{file}`                                     |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::MockBackend;
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    CallbackPayload, DEFAULT_DOMAIN, DEFAULT_STACK, DEFAULT_STAGING_DIR, DEFAULT_TIMEOUT, Endpoints,
};

use backend::Backend;
use backend::http::HttpBackend;
use std::path::Path;
use std::time::Duration;

/// High-level client for build server operations.
///
/// No caching: every call is a fresh request.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a new Client over HTTP with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: Box::new(HttpBackend::new()),
        }
    }

    /// Create a new Client over HTTP with a custom per-request timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            backend: Box::new(HttpBackend::with_timeout(timeout)),
        }
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Version of `package` pinned by `stack` in `domain`.
    pub fn remote_version(
        &self,
        build_host: &str,
        domain: &str,
        stack: &str,
        package: &str,
    ) -> Result<String> {
        let url = Endpoints::new(build_host).version_url(domain, stack, package);
        let version = trim_body(&self.backend.get_text(&url)?);
        log::debug!("version of {package} for stack {stack} is {version}");
        Ok(version)
    }

    /// Artifact file name published for `package` at `version`.
    pub fn artifact_name(&self, build_host: &str, package: &str, version: &str) -> Result<String> {
        let url = Endpoints::new(build_host).artifact_name_url(package, version);
        let file_name = trim_body(&self.backend.get_text(&url)?);
        log::debug!("file name for {package} in version {version} is {file_name}");
        Ok(file_name)
    }

    /// Download an artifact into `staging_dir` under its own file name.
    ///
    /// Re-downloading overwrites the previous copy. Returns the number of
    /// bytes written. Names that would escape `staging_dir` are refused
    /// before any request is made.
    pub fn download(&self, build_host: &str, file_name: &str, staging_dir: &Path) -> Result<u64> {
        if !is_plain_file_name(file_name) {
            return Err(Error::fetch(
                file_name,
                Error::UnsafeFileName {
                    file_name: file_name.to_string(),
                },
            ));
        }
        let url = Endpoints::new(build_host).download_url(file_name);
        let dest = staging_dir.join(file_name);
        let written = self
            .backend
            .download(&url, &dest)
            .map_err(|e| Error::fetch(file_name, e))?;
        log::debug!("saved {written} bytes in {}", dest.display());
        Ok(written)
    }

    /// POST `{"packages": [...]}` to a completion callback.
    ///
    /// Returns `Ok(true)` only for an HTTP 200 answer.
    pub fn web_callback(&self, url: &str, packages: &[String]) -> Result<bool> {
        let payload = CallbackPayload {
            packages: packages.to_vec(),
        };
        let body = serde_json::to_string(&payload)?;
        let status = self.backend.post_json(url, &body)?;
        Ok(status == 200)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// A single path component: not empty, no separator, not `.` or `..`.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Strip the trailing newline(s) the server appends to plain-text answers.
fn trim_body(body: &str) -> String {
    body.trim_end_matches(['\r', '\n']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(mock: &MockBackend) -> Client {
        Client::with_backend(Box::new(mock.clone()))
    }

    #[test]
    fn test_remote_version_latest() {
        let mock = MockBackend::new().with_text(
            "http://buildhost/domains/default/stacks/latest/packages/test-package/version",
            "1.0.0\n",
        );
        let version = client(&mock)
            .remote_version("buildhost", DEFAULT_DOMAIN, DEFAULT_STACK, "test-package")
            .unwrap();
        assert_eq!(version, "1.0.0");
    }

    #[test]
    fn test_remote_version_specific_stack() {
        let mock = MockBackend::new().with_text(
            "http://buildhost/domains/default/stacks/123/packages/test-package/version",
            "1.0.1",
        );
        let version = client(&mock)
            .remote_version("buildhost", "default", "123", "test-package")
            .unwrap();
        assert_eq!(version, "1.0.1");
    }

    #[test]
    fn test_remote_version_not_found() {
        let mock = MockBackend::new();
        let err = client(&mock)
            .remote_version("buildhost", "default", "latest", "ghost")
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_artifact_name() {
        let mock = MockBackend::new().with_text(
            "http://buildhost/packages/test-package/version/1.2.3/file",
            "test-package-1.0.0-amd64.deb\n",
        );
        let name = client(&mock)
            .artifact_name("buildhost", "test-package", "1.2.3")
            .unwrap();
        assert_eq!(name, "test-package-1.0.0-amd64.deb");
    }

    #[test]
    fn test_download_into_staging() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockBackend::new().with_file(
            "http://buildhost/debs/test-package-1.0.0-amd64.deb",
            vec![0u8; 10],
        );
        let written = client(&mock)
            .download("buildhost", "test-package-1.0.0-amd64.deb", dir.path())
            .unwrap();

        assert_eq!(written, 10);
        assert!(dir.path().join("test-package-1.0.0-amd64.deb").exists());
    }

    #[test]
    fn test_download_failure_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockBackend::new();
        let err = client(&mock)
            .download("buildhost", "missing.deb", dir.path())
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }

    #[test]
    fn test_download_refuses_names_outside_staging() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        std::fs::create_dir(&staging).unwrap();
        let mock = MockBackend::new()
            .with_file("http://buildhost/debs/../outside.deb", vec![0u8; 4])
            .with_file("http://buildhost/debs//etc/x.deb", vec![0u8; 4]);
        let client = client(&mock);

        for name in ["../outside.deb", "/etc/x.deb", "sub/x.deb", "..", ""] {
            let err = client.download("buildhost", name, &staging).unwrap_err();
            match err {
                Error::Fetch { source, .. } => {
                    assert!(matches!(*source, Error::UnsafeFileName { .. }), "{name}");
                }
                other => panic!("Expected Error::Fetch for {name:?}, got {other:?}"),
            }
        }
        assert!(mock.downloads().is_empty());
        assert!(!dir.path().join("outside.deb").exists());
    }

    #[test]
    fn test_web_callback_success_only_on_200() {
        let mock = MockBackend::new()
            .with_post_status("http://hooks/ok", 200)
            .with_post_status("http://hooks/created", 201);
        let client = client(&mock);
        let packages = vec!["pkg1".to_string()];

        assert!(client.web_callback("http://hooks/ok", &packages).unwrap());
        assert!(!client.web_callback("http://hooks/created", &packages).unwrap());
        assert_eq!(
            mock.posts()[0],
            (
                "http://hooks/ok".to_string(),
                r#"{"packages":["pkg1"]}"#.to_string()
            )
        );
    }

    #[test]
    fn test_web_callback_unreachable() {
        let mock = MockBackend::new().unreachable("http://hooks/down");
        let err = client(&mock)
            .web_callback("http://hooks/down", &[])
            .unwrap_err();
        assert!(matches!(err, Error::RemoteUnavailable { .. }));
    }
}
