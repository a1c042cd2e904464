//! # dpkgkit
//!
//! Library for Debian package management through `dpkg`.
//!
//! This crate provides functionality for:
//! - Reading the installed version of a package
//! - Removing a set of packages in a single `dpkg -r` batch
//! - Installing a set of `.deb` archives in a single `dpkg -i` batch
//!
//! ## Example
//!
//! ```no_run
//! use dpkgkit::{Archive, Client};
//!
//! let client = Client::new().expect("dpkg not available");
//!
//! if client.installed_version("nginx").unwrap().as_deref() != Some("1.18.0-6") {
//!     client.remove(&["nginx".to_string()]).unwrap();
//!     client
//!         .install(&[Archive::new("nginx", "/tmp/nginx_1.18.0-6_amd64.deb")])
//!         .unwrap();
//! }
//! ```
//!
//! ## Ordering
//!
//! Batches are always passed to dpkg in lexicographic package-name order, no
//! matter how the caller assembled them, so logged command lines are stable.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::{Invocation, MockBackend};
pub use error::{Error, ErrorCategory, Result};
pub use types::{Archive, InstalledPackage, PackageState};

use backend::{Backend, dpkg::DpkgBackend};

/// High-level client for dpkg operations.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a new Client with the default backend.
    ///
    /// Returns an error if dpkg is not installed.
    pub fn new() -> Result<Self> {
        let backend = DpkgBackend::new()?;
        Ok(Self {
            backend: Box::new(backend),
        })
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Get the installed version of a package.
    ///
    /// A package that is unknown, removed, or only has configuration files
    /// left yields `Ok(None)`. Unreadable metadata is an error.
    pub fn installed_version(&self, package: &str) -> Result<Option<String>> {
        let version = self
            .backend
            .query(package)?
            .and_then(|p| p.installed_version().map(str::to_string));
        log::debug!(
            "local version of {package}: {}",
            version.as_deref().unwrap_or("<none>")
        );
        Ok(version)
    }

    /// Remove packages in one batch, sorted by name.
    ///
    /// An empty batch is a no-op.
    pub fn remove(&self, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let mut sorted = packages.to_vec();
        sorted.sort();
        log::info!("removing packages: {}", sorted.join(" "));
        self.backend.remove(&sorted)
    }

    /// Install archives in one batch, sorted by the package they provide.
    ///
    /// An empty batch is a no-op.
    pub fn install(&self, archives: &[Archive]) -> Result<()> {
        if archives.is_empty() {
            return Ok(());
        }
        let mut sorted = archives.to_vec();
        sorted.sort_by(|a, b| a.package.cmp(&b.package));
        log::info!(
            "installing archives: {}",
            sorted
                .iter()
                .map(|a| a.path.display().to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );
        self.backend.install(&sorted)
    }
}
